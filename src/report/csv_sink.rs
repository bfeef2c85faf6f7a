use super::{ReportSink, SinkError};
use crate::model::{Report, REPORT_COLUMNS};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Renders the report as CSV: a header row, then one row per disc in pipeline order
pub fn render_csv(report: &Report) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(REPORT_COLUMNS)?;
    for row in report.rows() {
        writer.write_record(row.cells())?;
    }

    writer
        .into_inner()
        .map_err(|e| SinkError::Encode(e.into_error().into()))
}

/// Sibling of `destination` that receives the new content before it is renamed into place
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    destination.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Replaces `destination` with whatever `fill` writes. The previous file stays intact
/// unless the new content was written and synced completely.
fn replace_file<F>(destination: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let staging = staging_path(destination);
    let result = File::create(&staging)
        .and_then(|mut file| {
            fill(&mut file)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&staging, destination));

    if result.is_err() && staging.exists() {
        if let Err(e) = fs::remove_file(&staging) {
            warn!("Failed to remove staging file {}: {}", staging.display(), e);
        }
    }
    result
}

/// Writes reports as comma-separated text files
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportSink;

impl CsvReportSink {
    pub fn new() -> Self {
        Self
    }
}

impl ReportSink for CsvReportSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write(&self, report: &Report, destination: &Path) -> Result<PathBuf, SinkError> {
        if destination.is_dir() {
            return Err(SinkError::DestinationIsDirectory(destination.to_path_buf()));
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating report directory {}", parent.display());
                fs::create_dir_all(parent).map_err(|source| SinkError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let bytes = render_csv(report)?;
        replace_file(destination, |file| file.write_all(&bytes)).map_err(|source| {
            SinkError::Write {
                path: destination.to_path_buf(),
                source,
            }
        })?;

        info!(
            path = %destination.display(),
            rows = report.len(),
            bytes = bytes.len(),
            "Report written"
        );
        Ok(destination.to_path_buf())
    }
}
