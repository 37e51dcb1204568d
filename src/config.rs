//! Runtime settings read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CANCELLATIONS_PATH: &str = "data/cancellations.json";
pub const DEFAULT_LOG_FILE_PATH: &str = "logs/attendance_rater.log";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Backend base URL (`ATTENDANCE_API_URL`).
    pub api_url: Option<String>,
    /// Bearer token forwarded to the backend (`ATTENDANCE_API_TOKEN`).
    pub api_token: Option<String>,
    pub cancellations_path: PathBuf,
    /// Upper bound on each listing fetch (`FETCH_TIMEOUT_SECS`).
    pub fetch_timeout: Duration,
    pub log_file_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            cancellations_path: PathBuf::from(DEFAULT_CANCELLATIONS_PATH),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            log_file_path: PathBuf::from(DEFAULT_LOG_FILE_PATH),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()` first
    /// to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().with_context(|| {
                    format!("FETCH_TIMEOUT_SECS must be whole seconds, got {raw:?}")
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.fetch_timeout,
        };

        Ok(Self {
            api_url: get("ATTENDANCE_API_URL"),
            api_token: get("ATTENDANCE_API_TOKEN"),
            cancellations_path: get("CANCELLATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cancellations_path),
            fetch_timeout,
            log_file_path: get("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file_path),
        })
    }
}
