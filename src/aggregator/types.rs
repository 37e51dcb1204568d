//! Results handed from the aggregator to the presentation layer.

use serde::Serialize;

use crate::aggregator::status::AttendanceStatus;
use crate::aggregator::utility::rate_percent;

/// Head count for one held session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRate {
    pub present_count: usize,
    pub total_enrolled: usize,
    pub rate_percent: f64,
}

impl SessionRate {
    pub fn new(present_count: usize, total_enrolled: usize) -> Self {
        Self {
            present_count,
            total_enrolled,
            rate_percent: rate_percent(present_count, total_enrolled),
        }
    }
}

/// Outcome of [`crate::aggregator::AttendanceAggregator::period_rate`].
///
/// A cancelled session has no numerator or denominator; it must be shown as
/// cancelled, never as 0%.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeriodRate {
    Held(SessionRate),
    Cancelled,
}

impl PeriodRate {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PeriodRate::Cancelled)
    }

    pub fn held(&self) -> Option<&SessionRate> {
        match self {
            PeriodRate::Held(rate) => Some(rate),
            PeriodRate::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRate {
    pub module_code: String,
    pub sessions: usize,
    pub actual_attendance: usize,
    pub possible_attendance: usize,
    pub rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentModuleStats {
    pub student_id: String,
    pub module_code: String,
    pub attended: usize,
    pub total_sessions: usize,
    pub rate_percent: f64,
    pub status: AttendanceStatus,
}
