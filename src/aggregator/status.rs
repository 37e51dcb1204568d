use serde::{Deserialize, Serialize};
use std::fmt;

/// Rates at or above this are [`AttendanceStatus::Good`].
pub const GOOD_THRESHOLD: f64 = 80.0;
/// Rates at or above this (and below [`GOOD_THRESHOLD`]) are [`AttendanceStatus::Warning`].
pub const WARNING_THRESHOLD: f64 = 60.0;

/// How worrying a student's attendance in a module is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Critical,
    Warning,
    Good,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttendanceStatus::Good => "Good",
            AttendanceStatus::Warning => "Warning",
            AttendanceStatus::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Converts a rate percentage (0–100, two decimals) into a status.
///
/// | Range         | Status   |
/// |---------------|----------|
/// | >= 80         | Good     |
/// | >= 60, < 80   | Warning  |
/// | < 60          | Critical |
pub fn classify(rate_percent: f64) -> AttendanceStatus {
    match rate_percent {
        r if r >= GOOD_THRESHOLD => AttendanceStatus::Good,
        r if r >= WARNING_THRESHOLD => AttendanceStatus::Warning,
        _ => AttendanceStatus::Critical,
    }
}
