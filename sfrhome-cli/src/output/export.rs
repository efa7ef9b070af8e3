//! JSON and CSV files.
//!
//! Export failures are reported, never fatal: the device list has already
//! been fetched and the cookie jar saved by the time this runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sfrhome_core::Device;
use tracing::{info, warn};

use super::csv::write_csv;

/// What an export run wrote and what failed.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Files written.
    pub written: Vec<PathBuf>,
    /// Files that could not be written, with the cause.
    pub failed: Vec<(PathBuf, String)>,
}

impl ExportReport {
    fn record(&mut self, path: &Path, result: Result<()>) {
        match result {
            Ok(()) => {
                info!(path = %path.display(), "Export written");
                self.written.push(path.to_path_buf());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Export failed");
                self.failed.push((path.to_path_buf(), format!("{e:#}")));
            }
        }
    }
}

/// Writes the JSON array and the CSV table.
pub async fn export_devices(devices: &[Device], json_path: &Path, csv_path: &Path) -> ExportReport {
    let mut report = ExportReport::default();
    report.record(json_path, write_json_file(json_path, devices).await);
    report.record(csv_path, write_csv_file(csv_path, devices).await);
    report
}

async fn write_json_file(path: &Path, devices: &[Device]) -> Result<()> {
    let json = serde_json::to_vec_pretty(devices)?;
    write_file(path, &json).await
}

async fn write_csv_file(path: &Path, devices: &[Device]) -> Result<()> {
    let mut buf = Vec::new();
    write_csv(&mut buf, devices)?;
    write_file(path, &buf).await
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Cannot write {}", path.display()))
}
