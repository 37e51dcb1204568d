//! Canonical schema shared by every layer of the crate.
//!
//! The backend ships several spellings of the same fields; those are folded
//! into these types by [`crate::normalize`] before anything else sees them.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A registered student and the module codes they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_number: String,
    pub name: String,
    pub surname: String,
    pub modules: BTreeSet<String>,
}

impl Student {
    /// A student counts toward a module's denominator only when enrolled in it.
    pub fn is_enrolled(&self, module_code: &str) -> bool {
        self.modules.contains(module_code)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub code: String,
    pub name: String,
    pub lecturer_number: Option<String>,
}

/// A recurring weekly class slot. Not a calendar occurrence; see [`SessionKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    pub module_code: String,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue: Option<String>,
}

impl Period {
    /// Whether `time` falls inside `[start_time, end_time)`.
    pub fn covers(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    /// Whether this period is held on the weekday of `date`.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        date.weekday() == self.day_of_week
    }

    /// The date this period is held in the Monday-based week containing `date`.
    pub fn occurrence_in_week_of(&self, date: NaiveDate) -> NaiveDate {
        let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        monday + Days::new(u64::from(self.day_of_week.num_days_from_monday()))
    }
}

/// One student's presence at one concrete occurrence of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub period_id: String,
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
}

impl AttendanceRecord {
    pub fn session(&self) -> SessionKey {
        SessionKey::new(self.period_id.clone(), self.date)
    }

    pub fn is_for(&self, period_id: &str, date: NaiveDate) -> bool {
        self.period_id == period_id && self.date == date
    }
}

/// A concrete occurrence of a period: `(period_id, date)`.
///
/// Sessions are never stored; they are derived from records or from the
/// period schedule depending on the aggregator's session policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub period_id: String,
    pub date: NaiveDate,
}

impl SessionKey {
    pub fn new(period_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            period_id: period_id.into(),
            date,
        }
    }
}

/// Which slice of the timetable a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    /// Only the periods owned by the currently signed-in lecturer.
    Lecturer,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> Period {
        Period {
            id: "P1".to_string(),
            module_code: "WEBSYS".to_string(),
            day_of_week: Weekday::Fri,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 45, 0).unwrap(),
            venue: Some("Lab 3".to_string()),
        }
    }

    #[test]
    fn test_period_covers_is_half_open() {
        let p = period();
        assert!(p.covers(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert!(p.covers(NaiveTime::from_hms_opt(10, 44, 59).unwrap()));
        assert!(!p.covers(NaiveTime::from_hms_opt(10, 45, 0).unwrap()));
        assert!(!p.covers(NaiveTime::from_hms_opt(8, 59, 0).unwrap()));
    }

    #[test]
    fn test_period_occurs_on_matching_weekday() {
        let p = period();
        // 2025-08-01 was a Friday.
        assert!(p.occurs_on(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()));
        assert!(!p.occurs_on(NaiveDate::from_ymd_opt(2025, 8, 2).unwrap()));
    }

    #[test]
    fn test_occurrence_in_week_uses_monday_weeks() {
        let p = period();
        // Tuesday 2025-07-29 and Sunday 2025-08-03 share the week of Friday 2025-08-01.
        let friday = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(p.occurrence_in_week_of(NaiveDate::from_ymd_opt(2025, 7, 29).unwrap()), friday);
        assert_eq!(p.occurrence_in_week_of(NaiveDate::from_ymd_opt(2025, 8, 3).unwrap()), friday);
        assert_eq!(
            p.occurrence_in_week_of(NaiveDate::from_ymd_opt(2025, 8, 4).unwrap()),
            NaiveDate::from_ymd_opt(2025, 8, 8).unwrap()
        );
    }

    #[test]
    fn test_enrollment_is_by_module_code() {
        let student = Student {
            student_number: "2211445".to_string(),
            name: "Alice".to_string(),
            surname: "Johnson".to_string(),
            modules: ["WEBSYS".to_string()].into_iter().collect(),
        };
        assert!(student.is_enrolled("WEBSYS"));
        assert!(!student.is_enrolled("SFEN301"));
        assert_eq!(student.full_name(), "Alice Johnson");
    }
}
