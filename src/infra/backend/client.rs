use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::fetch::{HttpClient, fetch_json_list};
use crate::model::{Module, Period, Scope, Student};
use crate::normalize::{self, AttendanceEntry};
use crate::services::source::AttendanceSource;

/// REST client for the attendance backend.
///
/// Reads `GET {base}/api/students`, `/api/modules`, `/api/periods` (or
/// `/api/lecturer/periods`) and `/api/attendance`.
pub struct BackendClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> BackendClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list(&self, path: &str) -> Result<Vec<serde_json::Value>> {
        let url = self.url(path);
        let items = fetch_json_list(&self.http, &url).await?;
        debug!(url = %url, rows = items.len(), "Listing fetched");
        Ok(items)
    }
}

#[async_trait]
impl<C: HttpClient> AttendanceSource for BackendClient<C> {
    async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = self.list("/api/students").await?;
        Ok(normalize::students(rows).logged("students"))
    }

    async fn list_modules(&self) -> Result<Vec<Module>> {
        let rows = self.list("/api/modules").await?;
        Ok(normalize::modules(rows).logged("modules"))
    }

    async fn list_periods(&self, scope: Scope) -> Result<Vec<Period>> {
        let path = match scope {
            Scope::All => "/api/periods",
            Scope::Lecturer => "/api/lecturer/periods",
        };
        let rows = self.list(path).await?;
        Ok(normalize::periods(rows).logged("periods"))
    }

    // The backend has no lecturer-scoped attendance listing; rows for other
    // lecturers' periods fall away when the snapshot joins them to periods.
    async fn list_attendance(&self, _scope: Scope) -> Result<Vec<AttendanceEntry>> {
        let rows = self.list("/api/attendance").await?;
        Ok(normalize::attendance(rows).logged("attendance"))
    }
}
