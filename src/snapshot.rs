//! Immutable bundle of the four input collections and the loader that
//! fetches them concurrently.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::model::{AttendanceRecord, Module, Period, Scope, Student};
use crate::normalize::{AttendanceEntry, PeriodRef};
use crate::services::source::AttendanceSource;

/// Everything the aggregator needs, captured at one point in time.
///
/// Attendance rows have already been joined to a known period and a known
/// student; rows that point nowhere are left out.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub modules: Vec<Module>,
    pub periods: Vec<Period>,
    pub attendance: Vec<AttendanceRecord>,
}

impl Snapshot {
    /// Joins raw attendance entries to `periods` and `students`.
    pub fn assemble(
        students: Vec<Student>,
        modules: Vec<Module>,
        periods: Vec<Period>,
        entries: Vec<AttendanceEntry>,
    ) -> Self {
        let known_students: HashSet<&str> =
            students.iter().map(|s| s.student_number.as_str()).collect();
        let known_periods: HashSet<&str> = periods.iter().map(|p| p.id.as_str()).collect();

        let mut unknown_student = 0usize;
        let mut unknown_period = 0usize;
        let mut unresolved_slot = 0usize;
        let mut attendance = Vec::with_capacity(entries.len());

        for entry in entries {
            let period_id = match &entry.period {
                PeriodRef::Id(id) if known_periods.contains(id.as_str()) => id.clone(),
                PeriodRef::Id(_) => {
                    unknown_period += 1;
                    continue;
                }
                PeriodRef::Slot { module_code } => {
                    let slot = periods.iter().find(|p| {
                        p.module_code.eq_ignore_ascii_case(module_code)
                            && p.occurs_on(entry.date)
                            && p.covers(entry.timestamp.time())
                    });
                    match slot {
                        Some(p) => p.id.clone(),
                        None => {
                            unresolved_slot += 1;
                            continue;
                        }
                    }
                }
            };

            if !known_students.contains(entry.student_id.as_str()) {
                unknown_student += 1;
                continue;
            }

            attendance.push(AttendanceRecord {
                student_id: entry.student_id,
                period_id,
                date: entry.date,
                timestamp: entry.timestamp,
            });
        }

        if unknown_student > 0 || unresolved_slot > 0 {
            warn!(
                unknown_student,
                unresolved_slot, "Dropped attendance rows with dangling references"
            );
        }
        if unknown_period > 0 {
            // Expected under lecturer scope, where other lecturers' periods are absent.
            debug!(unknown_period, "Dropped attendance rows for periods outside the listing");
        }

        Self {
            students,
            modules,
            periods,
            attendance,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
            && self.modules.is_empty()
            && self.periods.is_empty()
            && self.attendance.is_empty()
    }

    pub fn student(&self, student_number: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| s.student_number == student_number)
    }

    pub fn module(&self, code: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.code == code)
    }

    pub fn period(&self, id: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.id == id)
    }

    pub fn enrolled_students(&self, module_code: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.is_enrolled(module_code))
            .collect()
    }
}

/// A listing that could not be fetched.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub listing: &'static str,
    pub error: String,
}

/// Result of [`load_snapshot`].
///
/// When any listing failed the snapshot is empty: no partial views.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub snapshot: Snapshot,
    pub failures: Vec<FetchFailure>,
}

impl LoadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches the four listings concurrently and joins them into a [`Snapshot`].
///
/// Each listing is bounded by `timeout`. Failures are logged here and
/// reported in [`LoadOutcome::failures`]; they never propagate as errors.
pub async fn load_snapshot<S>(source: &S, scope: Scope, timeout: Duration) -> LoadOutcome
where
    S: AttendanceSource + ?Sized,
{
    let (students, modules, periods, attendance) = tokio::join!(
        bounded("students", timeout, source.list_students()),
        bounded("modules", timeout, source.list_modules()),
        bounded("periods", timeout, source.list_periods(scope)),
        bounded("attendance", timeout, source.list_attendance(scope)),
    );

    let mut failures = Vec::new();
    let students = settle("students", students, &mut failures);
    let modules = settle("modules", modules, &mut failures);
    let periods = settle("periods", periods, &mut failures);
    let entries = settle("attendance", attendance, &mut failures);

    if !failures.is_empty() {
        return LoadOutcome {
            snapshot: Snapshot::default(),
            failures,
        };
    }

    let snapshot = Snapshot::assemble(students, modules, periods, entries);
    info!(
        students = snapshot.students.len(),
        modules = snapshot.modules.len(),
        periods = snapshot.periods.len(),
        attendance = snapshot.attendance.len(),
        "Snapshot loaded"
    );

    LoadOutcome {
        snapshot,
        failures,
    }
}

async fn bounded<T>(
    listing: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| anyhow!("{} timed out after {}s", listing, timeout.as_secs_f64()))?
}

fn settle<T: Default>(
    listing: &'static str,
    result: Result<T>,
    failures: &mut Vec<FetchFailure>,
) -> T {
    match result {
        Ok(items) => items,
        Err(e) => {
            error!(listing, error = %e, "Fetch failed");
            failures.push(FetchFailure {
                listing,
                error: e.to_string(),
            });
            T::default()
        }
    }
}
