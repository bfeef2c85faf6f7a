//! Report persistence

mod csv_sink;
mod error;

pub use csv_sink::{render_csv, CsvReportSink};
pub use error::SinkError;

use crate::model::Report;
use std::path::{Path, PathBuf};

/// Persists a finished report. Writing is a pure serialization of the report;
/// the same report always produces the same artifact.
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &str;

    /// Writes `report` to `destination`, replacing any existing artifact, and
    /// returns the path that was written.
    fn write(&self, report: &Report, destination: &Path) -> Result<PathBuf, SinkError>;
}
