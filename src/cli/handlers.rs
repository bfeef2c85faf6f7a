//! Subcommand handlers. Each returns the process exit code.

use super::commands::{ConfigArgs, HealthArgs, OutputFormatArg, RunArgs};
use super::output::{HealthStatus, OutputFormatter};
use crate::config::SpinepipeConfig;
use crate::inference::{resolve_device, HttpInferenceClient, InferenceConfig, InferenceService};
use crate::pipeline::{PipelineCoordinator, RunRequest, RunSummary};
use crate::progress::{ConsoleHandler, LoggingHandler, ProgressHandler};
use crate::source::MetadataOverride;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let formatter = OutputFormatter::new(args.format.into());

    match run_pipeline(args, quiet).await {
        Ok(summary) => match formatter.format_summary(&summary) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                error!("Failed to format run summary: {:#}", e);
                1
            }
        },
        Err(e) => {
            error!("Pipeline run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_pipeline(args: &RunArgs, quiet: bool) -> Result<RunSummary> {
    let mut config = SpinepipeConfig::default();
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(device) = &args.device {
        config.device = device.to_lowercase();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    config.validate().context("Configuration error")?;

    let overrides = collect_overrides(args)?;
    if !overrides.is_empty() {
        debug!(fields = overrides.len(), "Metadata overrides supplied");
    }

    let inference = select_device(config.inference_config()?).await?;
    let client = Arc::new(HttpInferenceClient::new(inference)?);

    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| config.report_path_for(&args.scan_dir));

    let mut coordinator = PipelineCoordinator::new(client.clone(), client);
    if !quiet {
        let handler: Arc<dyn ProgressHandler> = if args.format == OutputFormatArg::Human {
            Arc::new(ConsoleHandler::new())
        } else {
            Arc::new(LoggingHandler)
        };
        coordinator = coordinator.with_progress(handler);
    }

    let request = RunRequest::new(&args.scan_dir, destination)
        .require_complete_metadata(args.require_complete_metadata)
        .with_overrides(overrides);

    let summary = coordinator.run(&request).await?;
    Ok(summary)
}

/// File overrides first, then each `--override` entry on top
fn collect_overrides(args: &RunArgs) -> Result<MetadataOverride> {
    let mut overrides = match &args.overrides_file {
        Some(path) => read_overrides_file(path)?,
        None => MetadataOverride::new(),
    };
    overrides.extend(MetadataOverride::from_entries(
        args.overrides.iter().map(String::as_str),
    )?);
    Ok(overrides)
}

fn read_overrides_file(path: &Path) -> Result<MetadataOverride> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read overrides file {}", path.display()))?;
    MetadataOverride::from_json_str(&json)
        .with_context(|| format!("Invalid overrides file {}", path.display()))
}

/// Asks the service which devices it offers and fixes the device for the run
async fn select_device(config: InferenceConfig) -> Result<InferenceConfig> {
    let probe = HttpInferenceClient::new(config.clone())?;
    let health = probe.health_check().await?;
    if !health.healthy {
        bail!(
            "Inference service at {} is not available. Check that it is running or pass --endpoint",
            config.endpoint
        );
    }
    let device = resolve_device(config.device, &health.devices)?;
    info!(device = %device, "Device selected");
    Ok(config.with_device(device))
}

pub async fn handle_health(args: &HealthArgs) -> i32 {
    info!("Checking inference service health");

    let mut config = SpinepipeConfig::default();
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(device) = &args.device {
        config.device = device.to_lowercase();
    }
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return 1;
    }

    let status = match probe_health(&config).await {
        Ok(status) => status,
        Err(e) => HealthStatus {
            endpoint: config.endpoint.clone(),
            available: false,
            message: format!("{:#}", e),
            devices: Vec::new(),
            models: Vec::new(),
            selected_device: None,
        },
    };

    match OutputFormatter::new(args.format.into()).format_health(&status) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to format health status: {:#}", e);
            return 1;
        }
    }

    if status.available {
        0
    } else {
        1
    }
}

async fn probe_health(config: &SpinepipeConfig) -> Result<HealthStatus> {
    let inference = config.inference_config()?;
    let client = HttpInferenceClient::new(inference.clone())?;
    let health = client.health_check().await?;

    let mut status = HealthStatus {
        endpoint: config.endpoint.clone(),
        available: health.healthy,
        message: if health.healthy {
            "Service healthy".to_string()
        } else {
            format!("Cannot reach a healthy service at {}", config.endpoint)
        },
        devices: health.devices.iter().map(|d| d.to_string()).collect(),
        models: health.models.clone(),
        selected_device: None,
    };

    if health.healthy {
        match resolve_device(inference.device, &health.devices) {
            Ok(device) => status.selected_device = Some(device.to_string()),
            Err(e) => {
                status.available = false;
                status.message = e.to_string();
            }
        }
    }
    Ok(status)
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = SpinepipeConfig::default();

    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to format configuration: {:#}", e);
            return 1;
        }
    }

    match config.validate() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            1
        }
    }
}
