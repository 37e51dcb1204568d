//! Output formatting and persistence for reports.
//!
//! Supports pretty-printing, JSON serialization, and CSV export.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(report: &T) {
    debug!("{:#?}", report);
}

/// Logs a report as pretty-printed JSON.
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Appends `rows` to a CSV file.
///
/// Writes the header row first when the file is missing or still empty.
pub fn append_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let needs_header = std::fs::metadata(path).map_or(true, |meta| meta.len() == 0);
    debug!(path = %path.display(), needs_header, rows = rows.len(), "Appending CSV rows");

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
