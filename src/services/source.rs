//! Trait for the collaborator that supplies the four input collections.

use anyhow::Result;

use crate::model::{Module, Period, Scope, Student};
use crate::normalize::AttendanceEntry;

/// Abstraction over where students, modules, periods and attendance come from
/// (the REST backend or a static fixture).
///
/// Implementations return data already folded into the canonical schema.
/// Attendance entries may still reference a period by module slot; the
/// snapshot loader joins them once periods are known.
#[async_trait::async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn list_students(&self) -> Result<Vec<Student>>;

    async fn list_modules(&self) -> Result<Vec<Module>>;

    async fn list_periods(&self, scope: Scope) -> Result<Vec<Period>>;

    async fn list_attendance(&self, scope: Scope) -> Result<Vec<AttendanceEntry>>;
}
