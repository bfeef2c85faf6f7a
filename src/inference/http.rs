//! HTTP client for a model-serving inference service
//!
//! The service exposes three JSON endpoints:
//!
//! - `GET  /v1/health` reports status, the devices it can use and loaded models
//! - `POST /v1/detect` takes a volume and returns vertebra detections
//! - `POST /v1/grade`  takes disc crops and returns one grade per crop
//!
//! Voxel data travels as a flat row-major list alongside its shape.

use super::backend::{DiscGrader, InferenceService, ServiceHealth, VertebraDetector};
use super::config::InferenceConfig;
use super::device::Device;
use super::error::InferenceError;
use crate::model::{Grade, IvdRegion, PixelSpacing, VertebraDetection, Volume};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    model: &'a str,
    device: Device,
    shape: [usize; 3],
    pixel_spacing: [f64; 2],
    slice_thickness: f64,
    orientation: [f64; 6],
    voxels: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    detections: Vec<VertebraDetection>,
}

#[derive(Debug, Serialize)]
struct RegionPayload {
    disc: String,
    upper: u32,
    lower: u32,
    shape: [usize; 3],
    voxels: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GradeRequest<'a> {
    model: &'a str,
    device: Device,
    regions: Vec<RegionPayload>,
}

#[derive(Debug, Deserialize)]
struct GradeResponse {
    grades: Vec<Grade>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    devices: Vec<Device>,
    #[serde(default)]
    models: Vec<String>,
}

/// Talks to the inference service described by an [`InferenceConfig`].
///
/// Shareable across tasks behind an `Arc`.
pub struct HttpInferenceClient {
    config: InferenceConfig,
    http_client: Client,
}

impl HttpInferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            error!("Inference request timed out after {:?}", self.config.timeout);
            InferenceError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }
        } else if e.is_connect() {
            error!("Cannot connect to inference service at {}", self.config.endpoint);
            InferenceError::Network {
                message: format!("Connection failed: {}", e),
            }
        } else {
            error!("Inference request error: {}", e);
            InferenceError::Network {
                message: format!("Request failed: {}", e),
            }
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, InferenceError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.config.url(path);
        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Inference service returned error status {}: {}", status, body);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed = response.json::<Resp>().await.map_err(|e| {
            error!("Failed to parse inference response: {}", e);
            InferenceError::InvalidResponse(format!("JSON parse error: {}", e))
        })?;

        debug!(
            url = %url,
            elapsed_ms = start.elapsed().as_millis(),
            "Inference request complete"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl InferenceService for HttpInferenceClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> Result<ServiceHealth, InferenceError> {
        let url = self.config.url("/v1/health");
        debug!("Checking inference service health at {}", url);

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!("Inference service unreachable at {}", self.config.endpoint);
                return Ok(ServiceHealth {
                    healthy: false,
                    devices: Vec::new(),
                    models: Vec::new(),
                });
            }
            Err(e) => return Err(self.map_send_error(e)),
        };

        if !response.status().is_success() {
            warn!("Health check failed with status: {}", response.status());
            return Ok(ServiceHealth {
                healthy: false,
                devices: Vec::new(),
                models: Vec::new(),
            });
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        let healthy = health.status.eq_ignore_ascii_case("ok");
        info!(
            status = %health.status,
            devices = health.devices.len(),
            "Inference service health check complete"
        );
        Ok(ServiceHealth {
            healthy,
            devices: health.devices,
            models: health.models,
        })
    }
}

#[async_trait]
impl VertebraDetector for HttpInferenceClient {
    fn name(&self) -> &str {
        &self.config.detection_model
    }

    async fn detect(
        &self,
        volume: &Volume,
        pixel_spacing: PixelSpacing,
    ) -> Result<Vec<VertebraDetection>, InferenceError> {
        let request = DetectRequest {
            model: &self.config.detection_model,
            device: self.config.device,
            shape: volume.shape(),
            pixel_spacing: [pixel_spacing.row, pixel_spacing.column],
            slice_thickness: volume.slice_thickness(),
            orientation: volume.orientation().cosines(),
            voxels: volume.voxels().iter().copied().collect(),
        };
        debug!(
            model = request.model,
            shape = ?request.shape,
            "Sending detection request"
        );

        let response: DetectResponse = self.post_json("/v1/detect", &request).await?;
        Ok(response.detections)
    }
}

#[async_trait]
impl DiscGrader for HttpInferenceClient {
    fn name(&self) -> &str {
        &self.config.grading_model
    }

    async fn grade(&self, regions: &[IvdRegion]) -> Result<Vec<Grade>, InferenceError> {
        let request = GradeRequest {
            model: &self.config.grading_model,
            device: self.config.device,
            regions: regions
                .iter()
                .map(|region| {
                    let (s, r, c) = region.voxels.dim();
                    RegionPayload {
                        disc: region.disc.to_string(),
                        upper: region.upper,
                        lower: region.lower,
                        shape: [s, r, c],
                        voxels: region.voxels.iter().copied().collect(),
                    }
                })
                .collect(),
        };
        debug!(
            model = request.model,
            regions = request.regions.len(),
            "Sending grading request"
        );

        let response: GradeResponse = self.post_json("/v1/grade", &request).await?;
        Ok(response.grades)
    }
}
