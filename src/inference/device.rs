//! Compute device selection for the inference collaborators

use super::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Device the models run on. `Auto` is resolved once, before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    Auto,
    Cpu,
    Cuda(u32),
}

impl Device {
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Auto => write!(f, "auto"),
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse::<u32>().ok())
                .map(Device::Cuda)
                .ok_or_else(|| {
                    format!(
                        "Invalid device: {}. Valid options: auto, cpu, cuda, cuda:N",
                        s
                    )
                }),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Chooses the device for a run from what the inference service reports.
///
/// `Auto` prefers the first accelerator and falls back to CPU. An explicit
/// accelerator that the service does not offer is an error; CPU is always accepted.
pub fn resolve_device(requested: Device, available: &[Device]) -> Result<Device, InferenceError> {
    let resolved = match requested {
        Device::Auto => available
            .iter()
            .copied()
            .find(Device::is_accelerator)
            .unwrap_or(Device::Cpu),
        Device::Cpu => Device::Cpu,
        Device::Cuda(_) if available.contains(&requested) => requested,
        Device::Cuda(_) => {
            let listed: Vec<String> = available.iter().map(Device::to_string).collect();
            return Err(InferenceError::DeviceUnavailable {
                requested,
                available: if listed.is_empty() {
                    "none reported".to_string()
                } else {
                    listed.join(", ")
                },
            });
        }
    };

    if resolved == Device::Cpu {
        warn!("Running on CPU. Inference will be slower than on an accelerator");
    } else {
        info!(device = %resolved, "Using accelerator");
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        assert_eq!("auto".parse::<Device>().unwrap(), Device::Auto);
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for device in [Device::Auto, Device::Cpu, Device::Cuda(1)] {
            assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
        }
    }

    #[test]
    fn test_auto_prefers_accelerator() {
        let available = [Device::Cpu, Device::Cuda(0), Device::Cuda(1)];
        assert_eq!(
            resolve_device(Device::Auto, &available).unwrap(),
            Device::Cuda(0)
        );
    }

    #[test]
    fn test_auto_falls_back_to_cpu() {
        assert_eq!(
            resolve_device(Device::Auto, &[Device::Cpu]).unwrap(),
            Device::Cpu
        );
        assert_eq!(resolve_device(Device::Auto, &[]).unwrap(), Device::Cpu);
    }

    #[test]
    fn test_explicit_accelerator_must_exist() {
        let err = resolve_device(Device::Cuda(1), &[Device::Cpu, Device::Cuda(0)]).unwrap_err();
        assert!(matches!(err, InferenceError::DeviceUnavailable { .. }));
        assert!(err.to_string().contains("cuda:1"));
    }

    #[test]
    fn test_device_serde() {
        let json = serde_json::to_string(&vec![Device::Cpu, Device::Cuda(0)]).unwrap();
        assert_eq!(json, r#"["cpu","cuda:0"]"#);
        let back: Vec<Device> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Device::Cpu, Device::Cuda(0)]);
    }
}
