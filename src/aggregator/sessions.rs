//! Deriving the concrete sessions of a module.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::{BTreeSet, HashSet};

use crate::model::{AttendanceRecord, Period, SessionKey};

/// How the set of sessions a module should have held is worked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// Sessions are the distinct `(period, date)` pairs seen in attendance.
    ///
    /// A session nobody attended leaves no trace and is not counted, which
    /// inflates module rates.
    #[default]
    Observed,
    /// Sessions are every weekly occurrence of the module's periods between
    /// `from` and `to` inclusive, whether or not anyone attended.
    Scheduled { from: NaiveDate, to: NaiveDate },
}

/// Distinct sessions among `records` whose period is in `period_ids`.
pub fn observed_sessions(
    period_ids: &HashSet<&str>,
    records: &[AttendanceRecord],
) -> BTreeSet<SessionKey> {
    records
        .iter()
        .filter(|r| period_ids.contains(r.period_id.as_str()))
        .map(AttendanceRecord::session)
        .collect()
}

/// Every occurrence of `periods` on a date in `from..=to`.
pub fn scheduled_sessions<'a>(
    periods: impl IntoIterator<Item = &'a Period>,
    from: NaiveDate,
    to: NaiveDate,
) -> BTreeSet<SessionKey> {
    let mut sessions = BTreeSet::new();
    if from > to {
        return sessions;
    }

    for period in periods {
        let offset = (7 + period.day_of_week.num_days_from_monday()
            - from.weekday().num_days_from_monday())
            % 7;
        let mut date = from + Days::new(u64::from(offset));
        while date <= to {
            sessions.insert(SessionKey::new(period.id.clone(), date));
            date = date + Days::new(7);
        }
    }

    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn period(id: &str, day: Weekday) -> Period {
        Period {
            id: id.to_string(),
            module_code: "WEBSYS".to_string(),
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            venue: None,
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_scheduled_expands_weekly() {
        // Friday 2025-08-01 through Friday 2025-08-15: three Fridays, two Mondays.
        let periods = [period("FRI", Weekday::Fri), period("MON", Weekday::Mon)];
        let sessions = scheduled_sessions(&periods, date(8, 1), date(8, 15));

        let fridays: Vec<_> = sessions.iter().filter(|s| s.period_id == "FRI").collect();
        let mondays: Vec<_> = sessions.iter().filter(|s| s.period_id == "MON").collect();
        assert_eq!(fridays.len(), 3);
        assert_eq!(mondays.len(), 2);
        assert_eq!(mondays[0].date, date(8, 4));
    }

    #[test]
    fn test_scheduled_empty_for_inverted_range() {
        let periods = [period("FRI", Weekday::Fri)];
        assert!(scheduled_sessions(&periods, date(8, 15), date(8, 1)).is_empty());
    }

    #[test]
    fn test_observed_dedupes_by_period_and_date() {
        let at = |student: &str, period: &str, d: u32| AttendanceRecord {
            student_id: student.to_string(),
            period_id: period.to_string(),
            date: date(8, d),
            timestamp: date(8, d).and_hms_opt(9, 1, 0).unwrap(),
        };
        let records = vec![at("1", "P1", 1), at("2", "P1", 1), at("1", "P1", 8), at("1", "P9", 1)];
        let ids: HashSet<&str> = ["P1"].into_iter().collect();

        let sessions = observed_sessions(&ids, &records);
        assert_eq!(sessions.len(), 2);
    }
}
