//! Attendance-rate aggregation.
//!
//! Pure functions over a [`crate::snapshot::Snapshot`]'s collections: no I/O,
//! no hidden state. Calling any of them twice with the same inputs yields the
//! same output, so aggregations for different modules can run side by side.

pub mod rates;
pub mod sessions;
pub mod status;
pub mod types;
pub mod utility;

pub use rates::AttendanceAggregator;
pub use sessions::SessionPolicy;
pub use status::{AttendanceStatus, classify};
pub use types::{ModuleRate, PeriodRate, SessionRate, StudentModuleStats};
