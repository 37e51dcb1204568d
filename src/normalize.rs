//! Folds the backend's field-name variants into the canonical schema.
//!
//! Every listing is parsed as generic JSON and only the fields we need are
//! extracted. Items missing a required field are skipped and counted so the
//! caller can log how much was dropped.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

use crate::model::{Module, Period, Student};

/// Where an attendance row points to before periods are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodRef {
    Id(String),
    /// Older captures only carry the module and the check-in time.
    Slot { module_code: String },
}

/// An attendance row in canonical field names, not yet joined to a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub period: PeriodRef,
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
}

/// Result of normalizing one listing.
#[derive(Debug)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Normalized<T> {
    fn collect(values: Vec<Value>, f: impl Fn(&Value) -> Option<T>) -> Self {
        let total = values.len();
        let items: Vec<T> = values.iter().filter_map(f).collect();
        let skipped = total - items.len();
        Self { items, skipped }
    }

    /// Unwraps the items, logging how many rows of `listing` were unusable.
    pub fn logged(self, listing: &str) -> Vec<T> {
        if self.skipped > 0 {
            warn!(
                listing,
                skipped = self.skipped,
                kept = self.items.len(),
                "Skipped malformed rows"
            );
        }
        self.items
    }
}

pub fn students(values: Vec<Value>) -> Normalized<Student> {
    Normalized::collect(values, student)
}

pub fn modules(values: Vec<Value>) -> Normalized<Module> {
    Normalized::collect(values, module)
}

pub fn periods(values: Vec<Value>) -> Normalized<Period> {
    Normalized::collect(values, period)
}

pub fn attendance(values: Vec<Value>) -> Normalized<AttendanceEntry> {
    Normalized::collect(values, attendance_entry)
}

fn student(item: &Value) -> Option<Student> {
    let student_number = text(
        item,
        &["student_number", "studentNumber", "user_id", "student_id", "id"],
    )?;
    let name = text(item, &["name", "student_name"]).unwrap_or_default();
    let surname = text(item, &["surname", "student_surname"]).unwrap_or_default();
    let modules = list(item, &["modules", "module_codes"]);

    Some(Student {
        student_number,
        name,
        surname,
        modules,
    })
}

fn module(item: &Value) -> Option<Module> {
    let code = text(item, &["code", "subject_code", "module_code", "value"])?;
    let name = text(item, &["name", "subject_name", "module_name"]).unwrap_or_else(|| code.clone());
    let lecturer_number = text(item, &["lecturer_number", "lecturer_id"]);

    Some(Module {
        code,
        name,
        lecturer_number,
    })
}

fn period(item: &Value) -> Option<Period> {
    let id = text(item, &["period_id", "id"])?;
    let module_code =
        text(item, &["module_code", "subject_code"]).or_else(|| first(item, "module_codes"))?;

    let start_raw = text(item, &["start_time", "period_start_time", "startTime"])?;
    let end_raw = text(item, &["end_time", "period_end_time", "endTime"])?;
    let start_time = parse_time(&start_raw)?;
    let end_time = parse_time(&end_raw)?;

    let day_of_week = text(item, &["day_of_week", "day"])
        .and_then(|d| d.parse::<Weekday>().ok())
        .or_else(|| parse_datetime(&start_raw).map(|dt| dt.date().weekday()))?;

    let venue = text(item, &["venue", "venue_name"]);

    Some(Period {
        id,
        module_code,
        day_of_week,
        start_time,
        end_time,
        venue,
    })
}

fn attendance_entry(item: &Value) -> Option<AttendanceEntry> {
    let student_id = text(
        item,
        &["student_id", "user_id", "student_number", "studentId"],
    )?;

    let stamp = text(item, &["timestamp", "time"]);
    let timestamp = match (stamp.as_deref().and_then(parse_datetime), text(item, &["date"])) {
        (Some(ts), _) => ts,
        (None, Some(date)) => {
            let date = parse_date(&date)?;
            let time = stamp
                .as_deref()
                .and_then(parse_time)
                .unwrap_or_default();
            date.and_time(time)
        }
        (None, None) => return None,
    };
    let date = text(item, &["date"])
        .and_then(|d| parse_date(&d))
        .unwrap_or_else(|| timestamp.date());

    let period = match text(item, &["period_id", "class_period_id", "module_period_id"]) {
        Some(id) => PeriodRef::Id(id),
        None => PeriodRef::Slot {
            module_code: text(item, &["module_code", "module"])?,
        },
    };

    Some(AttendanceEntry {
        student_id,
        period,
        date,
        timestamp,
    })
}

/// First present key among `keys`, as a string. Numbers are stringified.
fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match &item[*key] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Enrolment-style set from the first array present among `keys`.
fn list(item: &Value, keys: &[&str]) -> BTreeSet<String> {
    keys.iter()
        .find_map(|key| item[*key].as_array())
        .map(|values| values.iter().filter_map(element).collect())
        .unwrap_or_default()
}

/// First usable element of the array at `key`, in array order.
fn first(item: &Value, key: &str) -> Option<String> {
    item[key].as_array()?.iter().find_map(element)
}

fn element(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Accepts `HH:MM`, `HH:MM:SS` or a full datetime (its time part is used).
pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.time()))
}
