//! Static JSON fixture standing in for the backend.
//!
//! Stored as one JSON object holding the four listings in the same wire
//! shapes the backend serves:
//! ```json
//! {
//!   "lecturer": "L001",
//!   "students": [{ "student_number": "2211445", "name": "Alice", "surname": "Johnson",
//!                  "modules": ["WEBSYS"] }],
//!   "modules": [{ "code": "WEBSYS", "name": "Web Systems", "lecturer_number": "L001" }],
//!   "periods": [{ "id": "P1", "module_code": "WEBSYS", "day_of_week": "Friday",
//!                 "start_time": "09:00", "end_time": "10:45" }],
//!   "attendance": [{ "user_id": "2211445", "period_id": "P1", "time": "2025-08-01 09:02:00" }]
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use crate::model::{Module, Period, Scope, Student};
use crate::normalize::{self, AttendanceEntry};
use crate::services::source::AttendanceSource;

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    /// Lecturer number whose modules make up the `Lecturer` scope.
    #[serde(default)]
    lecturer: Option<String>,
    #[serde(default)]
    students: Vec<Value>,
    #[serde(default)]
    modules: Vec<Value>,
    #[serde(default)]
    periods: Vec<Value>,
    #[serde(default)]
    attendance: Vec<Value>,
}

pub struct FixtureSource {
    data: FixtureFile,
}

impl FixtureSource {
    /// Loads the fixture from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let data: FixtureFile = serde_json::from_str(content)?;
        Ok(Self { data })
    }

    fn lecturer_modules(&self) -> BTreeSet<String> {
        let Some(lecturer) = self.data.lecturer.as_deref() else {
            return BTreeSet::new();
        };
        normalize::modules(self.data.modules.clone())
            .items
            .into_iter()
            .filter(|m| m.lecturer_number.as_deref() == Some(lecturer))
            .map(|m| m.code)
            .collect()
    }
}

#[async_trait]
impl AttendanceSource for FixtureSource {
    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(normalize::students(self.data.students.clone()).logged("students"))
    }

    async fn list_modules(&self) -> Result<Vec<Module>> {
        Ok(normalize::modules(self.data.modules.clone()).logged("modules"))
    }

    async fn list_periods(&self, scope: Scope) -> Result<Vec<Period>> {
        let periods = normalize::periods(self.data.periods.clone()).logged("periods");
        Ok(match scope {
            Scope::All => periods,
            Scope::Lecturer => {
                let owned = self.lecturer_modules();
                periods
                    .into_iter()
                    .filter(|p| owned.contains(&p.module_code))
                    .collect()
            }
        })
    }

    async fn list_attendance(&self, _scope: Scope) -> Result<Vec<AttendanceEntry>> {
        Ok(normalize::attendance(self.data.attendance.clone()).logged("attendance"))
    }
}
