//! Output formatting for run summaries, health checks and configuration
//!
//! Every view can be rendered as JSON, YAML or human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::SpinepipeConfig;
use crate::model::{Grade, ReportRow, VertebraLabel, REPORT_COLUMNS};
use crate::pipeline::RunSummary;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Serializable view of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunView<'a> {
    pub report: String,
    pub discs: usize,
    pub detections: usize,
    pub vertebrae: &'a [VertebraLabel],
    pub volume_shape: [usize; 3],
    pub elapsed_ms: u128,
    pub states: Vec<String>,
    pub grades: &'a [Grade],
}

impl<'a> From<&'a RunSummary> for RunView<'a> {
    fn from(summary: &'a RunSummary) -> Self {
        Self {
            report: summary.destination.display().to_string(),
            discs: summary.discs(),
            detections: summary.detections,
            vertebrae: &summary.vertebrae,
            volume_shape: summary.volume_shape,
            elapsed_ms: summary.elapsed.as_millis(),
            states: summary.states.iter().map(|s| s.to_string()).collect(),
            grades: summary.report.grades(),
        }
    }
}

/// Result of probing the inference service
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub endpoint: String,
    pub available: bool,
    pub message: String,
    pub devices: Vec<String>,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_device: Option<String>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        let view = RunView::from(summary);
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&view)
                .context("Failed to serialize run summary to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&view).context("Failed to serialize run summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_summary_human(&view)),
        }
    }

    pub fn format_health(&self, status: &HealthStatus) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(status)
                .context("Failed to serialize health status to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(status).context("Failed to serialize health status to YAML")
            }
            OutputFormat::Human => Ok(self.format_health_human(status)),
        }
    }

    pub fn format_config(&self, config: &SpinepipeConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(config).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_summary_human(&self, view: &RunView<'_>) -> String {
        let mut output = String::new();

        output.push_str("\u{2713} Disc Grading Report\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        if view.grades.is_empty() {
            output.push_str(&format!(
                "No disc regions ({} vertebra detection(s)); report is empty.\n\n",
                view.detections
            ));
        } else {
            output.push_str(&grade_table(view.grades));
            output.push('\n');
        }

        output.push_str("Summary:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Volume:     {} x {} x {}\n",
            view.volume_shape[0], view.volume_shape[1], view.volume_shape[2]
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Vertebrae:  {}{}\n",
            view.detections,
            vertebra_list(view.vertebrae)
        ));
        output.push_str(&format!("\u{251C}\u{2500} Discs:      {}\n", view.discs));
        output.push_str(&format!("\u{251C}\u{2500} Elapsed:    {} ms\n", view.elapsed_ms));
        output.push_str(&format!("\u{2514}\u{2500} Report:     {}\n", view.report));

        output
    }

    fn format_health_human(&self, status: &HealthStatus) -> String {
        let mut output = String::new();

        output.push_str("Inference Service Health\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        let symbol = if status.available { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!("{} {}\n", symbol, status.endpoint));
        output.push_str(&format!(
            "  Status: {}\n",
            if status.available {
                "Available"
            } else {
                "Unavailable"
            }
        ));
        output.push_str(&format!("  Message: {}\n", status.message));
        if !status.devices.is_empty() {
            output.push_str(&format!("  Devices: {}\n", status.devices.join(", ")));
        }
        if !status.models.is_empty() {
            output.push_str(&format!("  Models: {}\n", status.models.join(", ")));
        }
        if let Some(device) = &status.selected_device {
            output.push_str(&format!("  Selected device: {}\n", device));
        }

        output
    }
}

/// ` [L1, L2, ...]`, or nothing when no vertebra was detected
fn vertebra_list(labels: &[VertebraLabel]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    format!(" [{}]", names.join(", "))
}

/// Fixed-width table with the report's columns
fn grade_table(grades: &[Grade]) -> String {
    let headers: Vec<&str> = REPORT_COLUMNS.to_vec();
    let rows: Vec<[String; 12]> = grades
        .iter()
        .map(|g| ReportRow::from(g).cells())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].len())
                .max()
                .unwrap_or(0)
                .max(h.len())
        })
        .collect();

    let render = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut table = render(headers);
    for row in &rows {
        table.push_str(&render(row.iter().map(String::as_str).collect()));
    }
    table
}
