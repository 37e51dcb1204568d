use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

use crate::aggregator::sessions::{SessionPolicy, observed_sessions, scheduled_sessions};
use crate::aggregator::status::classify;
use crate::aggregator::types::{ModuleRate, PeriodRate, SessionRate, StudentModuleStats};
use crate::aggregator::utility::rate_percent;
use crate::cancellation::CancellationLookup;
use crate::model::{AttendanceRecord, Period, SessionKey, Student};

/// Computes attendance statistics.
///
/// Holds only configuration: which sessions are cancelled and how module
/// sessions are derived. Every method is a pure function of its arguments.
/// Zero denominators always give 0%, never NaN.
pub struct AttendanceAggregator<'a, C: ?Sized> {
    cancellations: &'a C,
    policy: SessionPolicy,
}

impl<'a, C: CancellationLookup + ?Sized> AttendanceAggregator<'a, C> {
    pub fn new(cancellations: &'a C) -> Self {
        Self {
            cancellations,
            policy: SessionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Head count for the session `(period_id, date)` against the students
    /// enrolled in the period's module.
    pub fn period_rate(
        &self,
        period_id: &str,
        date: NaiveDate,
        enrolled: &[&Student],
        records: &[AttendanceRecord],
    ) -> PeriodRate {
        if self
            .cancellations
            .is_cancelled(&SessionKey::new(period_id, date))
        {
            return PeriodRate::Cancelled;
        }

        let present: HashSet<&str> = records
            .iter()
            .filter(|r| r.is_for(period_id, date))
            .map(|r| r.student_id.as_str())
            .collect();

        PeriodRate::Held(SessionRate::new(present.len(), enrolled.len()))
    }

    /// The module's sessions under the configured policy, cancelled ones removed.
    pub fn module_sessions(
        &self,
        module_code: &str,
        periods: &[Period],
        records: &[AttendanceRecord],
    ) -> BTreeSet<SessionKey> {
        let module_periods: Vec<&Period> = periods
            .iter()
            .filter(|p| p.module_code == module_code)
            .collect();

        let sessions = match self.policy {
            SessionPolicy::Observed => {
                let ids: HashSet<&str> = module_periods.iter().map(|p| p.id.as_str()).collect();
                observed_sessions(&ids, records)
            }
            SessionPolicy::Scheduled { from, to } => {
                scheduled_sessions(module_periods.iter().copied(), from, to)
            }
        };

        sessions
            .into_iter()
            .filter(|s| !self.cancellations.is_cancelled(s))
            .collect()
    }

    /// Share of possible attendances (enrolled × sessions) that happened.
    pub fn module_rate(
        &self,
        module_code: &str,
        periods: &[Period],
        records: &[AttendanceRecord],
        enrolled: &[&Student],
    ) -> ModuleRate {
        let sessions = self.module_sessions(module_code, periods, records);

        let actual: HashSet<(&str, &str, NaiveDate)> = records
            .iter()
            .filter(|r| sessions.contains(&r.session()))
            .map(|r| (r.student_id.as_str(), r.period_id.as_str(), r.date))
            .collect();

        let possible = enrolled.len() * sessions.len();

        ModuleRate {
            module_code: module_code.to_string(),
            sessions: sessions.len(),
            actual_attendance: actual.len(),
            possible_attendance: possible,
            rate_percent: rate_percent(actual.len(), possible),
        }
    }

    /// One student's share of the module's sessions, with a status band.
    pub fn student_module_stats(
        &self,
        student_id: &str,
        module_code: &str,
        periods: &[Period],
        records: &[AttendanceRecord],
    ) -> StudentModuleStats {
        let sessions = self.module_sessions(module_code, periods, records);

        let attended: HashSet<SessionKey> = records
            .iter()
            .filter(|r| r.student_id == student_id)
            .map(AttendanceRecord::session)
            .filter(|s| sessions.contains(s))
            .collect();

        let rate = rate_percent(attended.len(), sessions.len());

        StudentModuleStats {
            student_id: student_id.to_string(),
            module_code: module_code.to_string(),
            attended: attended.len(),
            total_sessions: sessions.len(),
            rate_percent: rate,
            status: classify(rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::status::AttendanceStatus;
    use crate::cancellation::{CancellationBook, NoCancellations};
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    fn open() -> AttendanceAggregator<'static, NoCancellations> {
        AttendanceAggregator::new(&NoCancellations)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn student(number: &str) -> Student {
        Student {
            student_number: number.to_string(),
            name: "Student".to_string(),
            surname: number.to_string(),
            modules: ["WEBSYS".to_string()].into_iter().collect(),
        }
    }

    fn period(id: &str, day: Weekday, hour: u32) -> Period {
        Period {
            id: id.to_string(),
            module_code: "WEBSYS".to_string(),
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 45, 0).unwrap(),
            venue: None,
        }
    }

    fn record(student: &str, period: &str, on: NaiveDate) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student.to_string(),
            period_id: period.to_string(),
            date: on,
            timestamp: on.and_hms_opt(9, 2, 0).unwrap(),
        }
    }

    fn three_students() -> Vec<Student> {
        vec![student("2211445"), student("2211556"), student("2211778")]
    }

    #[test]
    fn test_period_rate_two_of_three_present() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211556", "P1", date(8, 1)),
            // Same student checking in twice counts once.
            record("2211556", "P1", date(8, 1)),
            // Other sessions are ignored.
            record("2211778", "P1", date(8, 8)),
            record("2211778", "P2", date(8, 1)),
        ];

        let rate = open().period_rate("P1", date(8, 1), &enrolled, &records);

        assert_eq!(
            rate,
            PeriodRate::Held(SessionRate {
                present_count: 2,
                total_enrolled: 3,
                rate_percent: 66.67,
            })
        );
    }

    #[test]
    fn test_period_rate_with_no_enrolled_students_is_zero() {
        let records = vec![record("2211445", "P1", date(8, 1))];
        let rate = open().period_rate("P1", date(8, 1), &[], &records);

        let held = rate.held().unwrap();
        assert_eq!(held.total_enrolled, 0);
        assert_eq!(held.rate_percent, 0.0);
    }

    #[test]
    fn test_period_rate_for_cancelled_session_is_sentinel() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let cancelled: BTreeSet<SessionKey> =
            [SessionKey::new("P1", date(8, 1))].into_iter().collect();
        let aggregator = AttendanceAggregator::new(&cancelled);

        let rate = aggregator.period_rate("P1", date(8, 1), &enrolled, &[]);

        assert!(rate.is_cancelled());
        assert!(rate.held().is_none());
    }

    #[test]
    fn test_module_rate_same_student_in_two_sessions() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let periods = vec![period("P1", Weekday::Fri, 9)];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211445", "P1", date(8, 8)),
        ];

        let rate = open().module_rate("WEBSYS", &periods, &records, &enrolled);

        assert_eq!(rate.sessions, 2);
        assert_eq!(rate.actual_attendance, 2);
        assert_eq!(rate.possible_attendance, 6);
        assert_eq!(rate.rate_percent, 33.33);
    }

    #[test]
    fn test_module_rate_without_sessions_is_zero() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let periods = vec![period("P1", Weekday::Fri, 9)];

        let rate = open().module_rate("WEBSYS", &periods, &[], &enrolled);

        assert_eq!(rate.sessions, 0);
        assert_eq!(rate.possible_attendance, 0);
        assert_eq!(rate.rate_percent, 0.0);
    }

    #[test]
    fn test_module_rate_excludes_permanently_cancelled_period() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let periods = vec![period("P1", Weekday::Fri, 9), period("P2", Weekday::Mon, 11)];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211445", "P2", date(8, 4)),
            record("2211556", "P2", date(8, 4)),
        ];

        let uncancelled = open().module_rate("WEBSYS", &periods, &records, &enrolled);
        assert_eq!(uncancelled.possible_attendance, 6);

        let mut book = CancellationBook::default();
        book.cancel_permanently("P2", Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap())
            .unwrap();
        let aggregator = AttendanceAggregator::new(&book);
        let rate = aggregator.module_rate("WEBSYS", &periods, &records, &enrolled);

        assert_eq!(rate.sessions, 1);
        assert_eq!(rate.possible_attendance, 3);
        assert_eq!(rate.actual_attendance, 1);
        assert_eq!(rate.rate_percent, 33.33);
    }

    #[test]
    fn test_module_rate_ignores_other_modules() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let mut other = period("X1", Weekday::Fri, 9);
        other.module_code = "SFEN301".to_string();
        let periods = vec![period("P1", Weekday::Fri, 9), other];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211445", "X1", date(8, 1)),
        ];

        let rate = open().module_rate("WEBSYS", &periods, &records, &enrolled);
        assert_eq!(rate.sessions, 1);
        assert_eq!(rate.actual_attendance, 1);
    }

    #[test]
    fn test_scheduled_policy_counts_empty_sessions() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let periods = vec![period("P1", Weekday::Fri, 9)];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211556", "P1", date(8, 1)),
            record("2211778", "P1", date(8, 1)),
        ];

        let observed = open().module_rate("WEBSYS", &periods, &records, &enrolled);
        assert_eq!(observed.rate_percent, 100.0);

        // 2025-08-01 and 2025-08-08 are both Fridays; nobody came on the 8th.
        let scheduled = AttendanceAggregator::new(&NoCancellations)
            .with_policy(SessionPolicy::Scheduled {
                from: date(7, 28),
                to: date(8, 10),
            })
            .module_rate("WEBSYS", &periods, &records, &enrolled);
        assert_eq!(scheduled.sessions, 2);
        assert_eq!(scheduled.possible_attendance, 6);
        assert_eq!(scheduled.rate_percent, 50.0);
    }

    #[test]
    fn test_student_without_records_is_critical() {
        let periods = vec![period("P1", Weekday::Fri, 9)];
        let records = vec![record("2211445", "P1", date(8, 1))];

        let stats = open().student_module_stats("2211556", "WEBSYS", &periods, &records);

        assert_eq!(stats.attended, 0);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.rate_percent, 0.0);
        assert_eq!(stats.status, AttendanceStatus::Critical);
    }

    #[test]
    fn test_student_with_no_module_sessions_is_zero_not_nan() {
        let stats = open().student_module_stats("2211556", "WEBSYS", &[], &[]);

        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.rate_percent, 0.0);
        assert_eq!(stats.status, AttendanceStatus::Critical);
    }

    #[test]
    fn test_student_status_bands_from_real_counts() {
        let periods = vec![period("P1", Weekday::Fri, 9)];
        // Five Friday sessions, each attended by the anchor student "0".
        let fridays = [date(8, 1), date(8, 8), date(8, 15), date(8, 22), date(8, 29)];
        let mut records: Vec<AttendanceRecord> =
            fridays.iter().map(|d| record("0", "P1", *d)).collect();
        records.extend(fridays[..4].iter().map(|d| record("good", "P1", *d)));
        records.extend(fridays[..3].iter().map(|d| record("warn", "P1", *d)));
        records.extend(fridays[..2].iter().map(|d| record("crit", "P1", *d)));

        let aggregator = AttendanceAggregator::new(&NoCancellations);
        let stats = |id: &str| aggregator.student_module_stats(id, "WEBSYS", &periods, &records);

        assert_eq!(stats("good").rate_percent, 80.0);
        assert_eq!(stats("good").status, AttendanceStatus::Good);
        assert_eq!(stats("warn").rate_percent, 60.0);
        assert_eq!(stats("warn").status, AttendanceStatus::Warning);
        assert_eq!(stats("crit").rate_percent, 40.0);
        assert_eq!(stats("crit").status, AttendanceStatus::Critical);
    }

    #[test]
    fn test_student_stats_skip_cancelled_sessions() {
        let periods = vec![period("P1", Weekday::Fri, 9)];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211556", "P1", date(8, 8)),
        ];
        let mut book = CancellationBook::default();
        book.cancel_session("P1", date(8, 8));

        let aggregator = AttendanceAggregator::new(&book);
        let stats = aggregator.student_module_stats("2211445", "WEBSYS", &periods, &records);

        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.rate_percent, 100.0);
        assert_eq!(stats.status, AttendanceStatus::Good);
    }

    #[test]
    fn test_aggregations_are_idempotent() {
        let students = three_students();
        let enrolled: Vec<&Student> = students.iter().collect();
        let periods = vec![period("P1", Weekday::Fri, 9), period("P2", Weekday::Mon, 11)];
        let records = vec![
            record("2211445", "P1", date(8, 1)),
            record("2211556", "P2", date(8, 4)),
        ];
        let aggregator = AttendanceAggregator::new(&NoCancellations);

        assert_eq!(
            aggregator.period_rate("P1", date(8, 1), &enrolled, &records),
            aggregator.period_rate("P1", date(8, 1), &enrolled, &records)
        );
        assert_eq!(
            aggregator.module_rate("WEBSYS", &periods, &records, &enrolled),
            aggregator.module_rate("WEBSYS", &periods, &records, &enrolled)
        );
        assert_eq!(
            aggregator.student_module_stats("2211445", "WEBSYS", &periods, &records),
            aggregator.student_module_stats("2211445", "WEBSYS", &periods, &records)
        );
    }
}
