//! Typed view-models built from a [`Snapshot`] and an aggregator.
//!
//! Rows here are flat so they serialize cleanly to both CSV and JSON.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use thiserror::Error;

use crate::aggregator::{AttendanceAggregator, AttendanceStatus, ModuleRate, PeriodRate};
use crate::cancellation::{CancellationBook, CancellationLookup, PeriodStatus};
use crate::snapshot::Snapshot;

/// Why a session report could not be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("period {period_id} is not in the timetable")]
    UnknownPeriod { period_id: String },
    #[error("period {period_id} belongs to module {owner}, not {module_code}")]
    ModuleMismatch {
        period_id: String,
        module_code: String,
        owner: String,
    },
}

/// One enrolled student on a session's attendance sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRow {
    pub student_number: String,
    pub full_name: String,
    pub present: bool,
}

/// Everything shown for a single session: the attendance sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub module_code: String,
    pub module_name: String,
    pub period_id: String,
    pub date: NaiveDate,
    pub venue: Option<String>,
    pub period_rate: PeriodRate,
    pub module_rate: ModuleRate,
    /// Empty when the session was cancelled.
    pub roster: Vec<RosterRow>,
}

/// A student's standing in one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStatsRow {
    pub student_number: String,
    pub full_name: String,
    pub module_code: String,
    pub attended: usize,
    pub total_sessions: usize,
    pub rate_percent: f64,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleReport {
    pub module_code: String,
    pub module_name: String,
    pub rate: ModuleRate,
    /// Sorted worst attendance first.
    pub students: Vec<StudentStatsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    pub module_code: String,
    pub module_name: String,
    pub sessions: usize,
    pub actual_attendance: usize,
    pub possible_attendance: usize,
    pub rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableRow {
    pub day: Weekday,
    pub period_id: String,
    pub module_code: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue: Option<String>,
    pub state: &'static str,
    /// The suppressed date for a weekly cancellation.
    pub cancelled_on: Option<NaiveDate>,
}

/// Builds the attendance sheet for `(period_id, date)`.
///
/// `search` keeps only roster rows whose full name or student number contains
/// it, ignoring case. Counts are always over the whole enrolment of the
/// module owning the period; a period of another module is rejected.
pub fn session_report<C>(
    snapshot: &Snapshot,
    aggregator: &AttendanceAggregator<'_, C>,
    module_code: &str,
    period_id: &str,
    date: NaiveDate,
    search: Option<&str>,
) -> Result<SessionReport, ReportError>
where
    C: CancellationLookup + ?Sized,
{
    let period = snapshot
        .period(period_id)
        .ok_or_else(|| ReportError::UnknownPeriod {
            period_id: period_id.to_string(),
        })?;
    if period.module_code != module_code {
        return Err(ReportError::ModuleMismatch {
            period_id: period_id.to_string(),
            module_code: module_code.to_string(),
            owner: period.module_code.clone(),
        });
    }

    let enrolled = snapshot.enrolled_students(module_code);
    let period_rate = aggregator.period_rate(period_id, date, &enrolled, &snapshot.attendance);
    let module_rate =
        aggregator.module_rate(module_code, &snapshot.periods, &snapshot.attendance, &enrolled);

    let roster = if period_rate.is_cancelled() {
        Vec::new()
    } else {
        let needle = search.map(str::to_lowercase).filter(|s| !s.is_empty());
        enrolled
            .iter()
            .filter(|s| match &needle {
                Some(n) => {
                    s.full_name().to_lowercase().contains(n.as_str())
                        || s.student_number.to_lowercase().contains(n.as_str())
                }
                None => true,
            })
            .map(|s| RosterRow {
                student_number: s.student_number.clone(),
                full_name: s.full_name(),
                present: snapshot
                    .attendance
                    .iter()
                    .any(|r| r.student_id == s.student_number && r.is_for(period_id, date)),
            })
            .collect()
    };

    Ok(SessionReport {
        module_code: module_code.to_string(),
        module_name: module_name(snapshot, module_code),
        period_id: period_id.to_string(),
        date,
        venue: period.venue.clone(),
        period_rate,
        module_rate,
        roster,
    })
}

/// One student's stats in `module_code`. Unknown students are reported by id.
pub fn student_row<C>(
    snapshot: &Snapshot,
    aggregator: &AttendanceAggregator<'_, C>,
    student_id: &str,
    module_code: &str,
) -> StudentStatsRow
where
    C: CancellationLookup + ?Sized,
{
    let stats = aggregator.student_module_stats(
        student_id,
        module_code,
        &snapshot.periods,
        &snapshot.attendance,
    );
    let full_name = snapshot
        .student(student_id)
        .map(|s| s.full_name())
        .unwrap_or_else(|| student_id.to_string());

    StudentStatsRow {
        student_number: stats.student_id,
        full_name,
        module_code: stats.module_code,
        attended: stats.attended,
        total_sessions: stats.total_sessions,
        rate_percent: stats.rate_percent,
        status: stats.status,
    }
}

pub fn module_report<C>(
    snapshot: &Snapshot,
    aggregator: &AttendanceAggregator<'_, C>,
    module_code: &str,
) -> ModuleReport
where
    C: CancellationLookup + ?Sized,
{
    let enrolled = snapshot.enrolled_students(module_code);
    let rate =
        aggregator.module_rate(module_code, &snapshot.periods, &snapshot.attendance, &enrolled);

    let mut students: Vec<StudentStatsRow> = enrolled
        .iter()
        .map(|s| student_row(snapshot, aggregator, &s.student_number, module_code))
        .collect();
    students.sort_by(|a, b| {
        a.rate_percent
            .total_cmp(&b.rate_percent)
            .then_with(|| a.student_number.cmp(&b.student_number))
    });

    ModuleReport {
        module_code: module_code.to_string(),
        module_name: module_name(snapshot, module_code),
        rate,
        students,
    }
}

/// Module rate for every module in the snapshot, in listing order.
pub fn overview<C>(
    snapshot: &Snapshot,
    aggregator: &AttendanceAggregator<'_, C>,
) -> Vec<OverviewRow>
where
    C: CancellationLookup + ?Sized,
{
    snapshot
        .modules
        .iter()
        .map(|module| {
            let enrolled = snapshot.enrolled_students(&module.code);
            let rate = aggregator.module_rate(
                &module.code,
                &snapshot.periods,
                &snapshot.attendance,
                &enrolled,
            );
            OverviewRow {
                module_code: rate.module_code,
                module_name: module.name.clone(),
                sessions: rate.sessions,
                actual_attendance: rate.actual_attendance,
                possible_attendance: rate.possible_attendance,
                rate_percent: rate.rate_percent,
            }
        })
        .collect()
}

/// Periods Monday to Sunday, by start time, with their cancellation state.
pub fn timetable(snapshot: &Snapshot, book: &CancellationBook) -> Vec<TimetableRow> {
    let mut rows: Vec<TimetableRow> = snapshot
        .periods
        .iter()
        .map(|p| {
            let (state, cancelled_on) = match book.status(&p.id) {
                PeriodStatus::Active => ("active", None),
                PeriodStatus::CancelledThisWeek { session_date, .. } => {
                    ("cancelled_this_week", Some(session_date))
                }
                PeriodStatus::CancelledPermanently { .. } => ("cancelled_permanently", None),
            };
            TimetableRow {
                day: p.day_of_week,
                period_id: p.id.clone(),
                module_code: p.module_code.clone(),
                start_time: p.start_time,
                end_time: p.end_time,
                venue: p.venue.clone(),
                state,
                cancelled_on,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.day
            .num_days_from_monday()
            .cmp(&b.day.num_days_from_monday())
            .then(a.start_time.cmp(&b.start_time))
            .then_with(|| a.period_id.cmp(&b.period_id))
    });
    rows
}

fn module_name(snapshot: &Snapshot, module_code: &str) -> String {
    snapshot
        .module(module_code)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| module_code.to_string())
}
