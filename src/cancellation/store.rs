use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::CancellationBook;

/// Keeps a [`CancellationBook`] as a pretty-printed JSON file.
///
/// ```json
/// {
///   "periods": { "P1": { "state": "cancelled_permanently", "since": "2025-08-01T08:00:00Z" } },
///   "sessions": [ { "period_id": "P2", "date": "2025-08-04" } ]
/// }
/// ```
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the book. A file that does not exist yet is an empty book.
    pub fn load(&self) -> Result<CancellationBook> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No cancellation file yet");
            return Ok(CancellationBook::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let book = serde_json::from_str(&content)
            .with_context(|| format!("invalid cancellation file {}", self.path.display()))?;
        Ok(book)
    }

    /// Writes through a sibling temp file and a rename so a crash never
    /// leaves a half-written book behind.
    pub fn save(&self, book: &CancellationBook) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(book)?;
        std::fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Cancellation book saved");
        Ok(())
    }
}
