use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

use super::CancellationLookup;
use crate::model::{Period, SessionKey};

/// A weekly cancellation lapses once it is older than this many days.
pub const WEEKLY_RESET_AFTER_DAYS: i64 = 7;

/// Cancellation state of one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PeriodStatus {
    Active,
    /// Only the occurrence on `session_date` is suppressed.
    CancelledThisWeek {
        session_date: NaiveDate,
        since: DateTime<Utc>,
    },
    /// Every occurrence is suppressed until the period is reactivated.
    CancelledPermanently { since: DateTime<Utc> },
}

impl PeriodStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, PeriodStatus::Active)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("period {period_id} is already cancelled; reactivate it first")]
    AlreadyCancelled { period_id: String },
    #[error("period {period_id} is not cancelled")]
    NotCancelled { period_id: String },
}

/// Persisted cancellation state.
///
/// `periods` only holds non-active periods. `sessions` is the ledger of
/// individually suppressed sessions; it outlives the weekly reset so that
/// rates for past weeks do not shift once a cancellation lapses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancellationBook {
    #[serde(default)]
    periods: BTreeMap<String, PeriodStatus>,
    #[serde(default)]
    sessions: BTreeSet<SessionKey>,
}

impl CancellationBook {
    pub fn status(&self, period_id: &str) -> PeriodStatus {
        self.periods
            .get(period_id)
            .cloned()
            .unwrap_or(PeriodStatus::Active)
    }

    /// Non-active periods and their state.
    pub fn cancelled_periods(&self) -> impl Iterator<Item = (&str, &PeriodStatus)> {
        self.periods.iter().map(|(id, status)| (id.as_str(), status))
    }

    pub fn cancelled_sessions(&self) -> impl Iterator<Item = &SessionKey> {
        self.sessions.iter()
    }

    /// Suppresses the occurrence of `period` in the week containing `now`.
    pub fn cancel_this_week(
        &mut self,
        period: &Period,
        now: DateTime<Utc>,
    ) -> Result<SessionKey, TransitionError> {
        self.ensure_active(&period.id)?;

        let session_date = period.occurrence_in_week_of(now.date_naive());
        let session = SessionKey::new(period.id.clone(), session_date);
        self.periods.insert(
            period.id.clone(),
            PeriodStatus::CancelledThisWeek {
                session_date,
                since: now,
            },
        );
        self.sessions.insert(session.clone());

        info!(period_id = %period.id, date = %session_date, "Period cancelled for this week");
        Ok(session)
    }

    pub fn cancel_permanently(
        &mut self,
        period_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_active(period_id)?;
        self.periods.insert(
            period_id.to_string(),
            PeriodStatus::CancelledPermanently { since: now },
        );
        info!(period_id, "Period cancelled permanently");
        Ok(())
    }

    /// Returns the period to `Active`. Returns the state it left.
    ///
    /// Reactivating a weekly cancellation also restores that week's session.
    pub fn reactivate(&mut self, period_id: &str) -> Result<PeriodStatus, TransitionError> {
        let previous = self
            .periods
            .remove(period_id)
            .ok_or_else(|| TransitionError::NotCancelled {
                period_id: period_id.to_string(),
            })?;

        if let PeriodStatus::CancelledThisWeek { session_date, .. } = &previous {
            self.sessions
                .remove(&SessionKey::new(period_id, *session_date));
        }

        info!(period_id, "Period reactivated");
        Ok(previous)
    }

    /// Suppresses one specific session without touching the period's state.
    /// Returns `false` if it was already suppressed.
    pub fn cancel_session(&mut self, period_id: &str, date: NaiveDate) -> bool {
        self.sessions.insert(SessionKey::new(period_id, date))
    }

    /// Lifts a session suppressed with [`Self::cancel_session`].
    pub fn restore_session(&mut self, period_id: &str, date: NaiveDate) -> bool {
        self.sessions.remove(&SessionKey::new(period_id, date))
    }

    /// Weekly reset: weekly cancellations older than seven days revert to
    /// `Active`. Permanent cancellations are left alone. Returns the ids reset.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let lapse = Duration::days(WEEKLY_RESET_AFTER_DAYS);
        let expired: Vec<String> = self
            .periods
            .iter()
            .filter_map(|(id, status)| match status {
                PeriodStatus::CancelledThisWeek { since, .. }
                    if now - *since > lapse =>
                {
                    Some(id.clone())
                }
                _ => None,
            })
            .collect();

        for id in &expired {
            self.periods.remove(id);
            info!(period_id = %id, "Weekly cancellation lapsed");
        }

        expired
    }

    fn ensure_active(&self, period_id: &str) -> Result<(), TransitionError> {
        if self.periods.contains_key(period_id) {
            return Err(TransitionError::AlreadyCancelled {
                period_id: period_id.to_string(),
            });
        }
        Ok(())
    }
}

impl CancellationLookup for CancellationBook {
    fn is_cancelled(&self, session: &SessionKey) -> bool {
        matches!(
            self.periods.get(&session.period_id),
            Some(PeriodStatus::CancelledPermanently { .. })
        ) || self.sessions.contains(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};

    fn friday_period() -> Period {
        Period {
            id: "P1".to_string(),
            module_code: "WEBSYS".to_string(),
            day_of_week: Weekday::Fri,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 45, 0).unwrap(),
            venue: None,
        }
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, d, h, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[test]
    fn test_weekly_cancel_targets_this_weeks_occurrence() {
        let mut book = CancellationBook::default();
        // Tuesday 2025-07-29 belongs to the week of Friday 2025-08-01.
        let now = Utc.with_ymd_and_hms(2025, 7, 29, 8, 0, 0).unwrap();

        let session = book.cancel_this_week(&friday_period(), now).unwrap();

        assert_eq!(session, SessionKey::new("P1", date(1)));
        assert!(book.is_cancelled(&session));
        assert!(!book.is_cancelled(&SessionKey::new("P1", date(8))));
        assert!(matches!(book.status("P1"), PeriodStatus::CancelledThisWeek { .. }));
    }

    #[test]
    fn test_permanent_cancel_suppresses_every_session() {
        let mut book = CancellationBook::default();
        book.cancel_permanently("P1", at(1, 8)).unwrap();

        assert!(book.is_cancelled(&SessionKey::new("P1", date(1))));
        let other_year = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(book.is_cancelled(&SessionKey::new("P1", other_year)));
        assert!(!book.is_cancelled(&SessionKey::new("P2", date(1))));
    }

    #[test]
    fn test_cancelled_period_cannot_be_cancelled_again() {
        let mut book = CancellationBook::default();
        book.cancel_this_week(&friday_period(), at(1, 8)).unwrap();

        assert_eq!(
            book.cancel_permanently("P1", at(1, 9)),
            Err(TransitionError::AlreadyCancelled {
                period_id: "P1".to_string()
            })
        );
        assert!(book.cancel_this_week(&friday_period(), at(1, 9)).is_err());
    }

    #[test]
    fn test_reactivate_requires_a_cancellation() {
        let mut book = CancellationBook::default();
        assert_eq!(
            book.reactivate("P1"),
            Err(TransitionError::NotCancelled {
                period_id: "P1".to_string()
            })
        );
    }

    #[test]
    fn test_reactivate_weekly_restores_the_session() {
        let mut book = CancellationBook::default();
        let session = book.cancel_this_week(&friday_period(), at(1, 8)).unwrap();

        let previous = book.reactivate("P1").unwrap();

        assert!(matches!(previous, PeriodStatus::CancelledThisWeek { .. }));
        assert!(book.status("P1").is_active());
        assert!(!book.is_cancelled(&session));
    }

    #[test]
    fn test_reactivate_permanent_returns_to_active() {
        let mut book = CancellationBook::default();
        book.cancel_permanently("P1", at(1, 8)).unwrap();
        book.reactivate("P1").unwrap();

        assert!(book.status("P1").is_active());
        assert!(!book.is_cancelled(&SessionKey::new("P1", date(1))));
        // Active again, so it can be cancelled anew.
        assert!(book.cancel_permanently("P1", at(2, 8)).is_ok());
    }

    #[test]
    fn test_sweep_resets_only_expired_weekly_cancellations() {
        let mut book = CancellationBook::default();
        let session = book.cancel_this_week(&friday_period(), at(1, 8)).unwrap();
        book.cancel_permanently("P2", at(1, 8)).unwrap();

        // Exactly seven days is not yet "more than" seven days.
        assert!(book.sweep(at(8, 8)).is_empty());

        let reset = book.sweep(at(8, 9));
        assert_eq!(reset, vec!["P1".to_string()]);
        assert!(book.status("P1").is_active());
        assert!(matches!(
            book.status("P2"),
            PeriodStatus::CancelledPermanently { .. }
        ));
        // The lapsed week's session stays suppressed.
        assert!(book.is_cancelled(&session));
    }

    #[test]
    fn test_cancel_and_restore_single_session() {
        let mut book = CancellationBook::default();
        assert!(book.cancel_session("P1", date(1)));
        assert!(!book.cancel_session("P1", date(1)));
        assert!(book.status("P1").is_active());
        assert!(book.is_cancelled(&SessionKey::new("P1", date(1))));

        assert!(book.restore_session("P1", date(1)));
        assert!(!book.is_cancelled(&SessionKey::new("P1", date(1))));
    }
}
