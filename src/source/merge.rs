//! Merging parsed source geometry with caller overrides

use super::error::LoadError;
use super::overrides::{numeric_values, GeometryField, MetadataOverride};
use crate::model::volume::validate_thickness;
use crate::model::{Geometry, GeometryError, Orientation, PixelSpacing};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How to treat geometry that neither the source nor the overrides define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataPolicy {
    /// Every field must be defined
    RequireComplete,
    /// Orientation falls back to the canonical sagittal orientation
    AllowDefaults,
}

impl MetadataPolicy {
    pub fn from_require_complete(require_complete_metadata: bool) -> Self {
        if require_complete_metadata {
            MetadataPolicy::RequireComplete
        } else {
            MetadataPolicy::AllowDefaults
        }
    }
}

/// Raw geometry values as parsed from the scan, possibly incomplete or invalid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceGeometry {
    values: BTreeMap<GeometryField, Vec<f64>>,
}

impl SourceGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: GeometryField, values: Vec<f64>) -> Self {
        self.values.insert(field, values);
        self
    }

    pub fn get(&self, field: GeometryField) -> Option<&[f64]> {
        self.values.get(&field).map(Vec::as_slice)
    }

    /// Reads recognized geometry keys from a metadata object. Other keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object".to_string())?;
        let mut geometry = Self::new();
        for (key, raw) in object {
            let Ok(field) = key.parse::<GeometryField>() else {
                debug!(key = %key, "Ignoring non-geometry metadata key");
                continue;
            };
            let values = numeric_values(raw)
                .ok_or_else(|| format!("{} must be a number or a list of numbers", key))?;
            geometry.values.insert(field, values);
        }
        Ok(geometry)
    }
}

/// Resolves the final geometry. Overrides win over source values and are validated
/// before substitution; the result satisfies every geometry invariant.
pub fn merge_geometry(
    source: &SourceGeometry,
    overrides: &MetadataOverride,
    policy: MetadataPolicy,
) -> Result<Geometry, LoadError> {
    let pixel_spacing = resolve(GeometryField::PixelSpacing, source, overrides, policy)?
        .ok_or(LoadError::MissingGeometry(GeometryField::PixelSpacing))
        .and_then(|v| {
            spacing_from(&v).map_err(|e| LoadError::InvalidSourceMetadata {
                field: GeometryField::PixelSpacing,
                source: e,
            })
        })?;

    let slice_thickness = resolve(GeometryField::SliceThickness, source, overrides, policy)?
        .ok_or(LoadError::MissingGeometry(GeometryField::SliceThickness))
        .and_then(|v| {
            thickness_from(&v).map_err(|e| LoadError::InvalidSourceMetadata {
                field: GeometryField::SliceThickness,
                source: e,
            })
        })?;

    let orientation = match resolve(GeometryField::Orientation, source, overrides, policy)? {
        Some(v) => Orientation::from_slice(&v).map_err(|e| LoadError::InvalidSourceMetadata {
            field: GeometryField::Orientation,
            source: e,
        })?,
        None if policy == MetadataPolicy::AllowDefaults => {
            warn!(
                "Orientation missing from scan metadata and overrides, assuming sagittal {}",
                Orientation::sagittal()
            );
            Orientation::sagittal()
        }
        None => return Err(LoadError::MissingGeometry(GeometryField::Orientation)),
    };

    Ok(Geometry::new(pixel_spacing, slice_thickness, orientation)?)
}

/// Picks the override if present (validating it first), else the source value.
/// Source values that fail validation are returned as-is so the caller reports them.
fn resolve(
    field: GeometryField,
    source: &SourceGeometry,
    overrides: &MetadataOverride,
    policy: MetadataPolicy,
) -> Result<Option<Vec<f64>>, LoadError> {
    if let Some(values) = overrides.get(field) {
        validate_field(field, values)
            .map_err(|e| LoadError::InvalidOverride { field, source: e })?;
        if source.get(field).is_some() {
            debug!(field = %field, "Override replaces source metadata");
        }
        return Ok(Some(values.to_vec()));
    }

    match source.get(field) {
        Some(values) => match validate_field(field, values) {
            Ok(()) => Ok(Some(values.to_vec())),
            Err(e) if field == GeometryField::Orientation
                && policy == MetadataPolicy::AllowDefaults =>
            {
                warn!(error = %e, "Discarding inconsistent source orientation");
                Ok(None)
            }
            Err(_) => Ok(Some(values.to_vec())),
        },
        None => Ok(None),
    }
}

fn validate_field(field: GeometryField, values: &[f64]) -> Result<(), GeometryError> {
    match field {
        GeometryField::PixelSpacing => spacing_from(values).map(|_| ()),
        GeometryField::SliceThickness => thickness_from(values).map(|_| ()),
        GeometryField::Orientation => Orientation::from_slice(values).map(|_| ()),
    }
}

fn spacing_from(values: &[f64]) -> Result<PixelSpacing, GeometryError> {
    match values {
        [row, column] => PixelSpacing::new(*row, *column),
        _ => Err(GeometryError::InvalidSpacing {
            row: values.first().copied().unwrap_or(f64::NAN),
            column: values.get(1).copied().unwrap_or(f64::NAN),
        }),
    }
}

fn thickness_from(values: &[f64]) -> Result<f64, GeometryError> {
    match values {
        [thickness] => {
            validate_thickness(*thickness)?;
            Ok(*thickness)
        }
        _ => Err(GeometryError::InvalidThickness(
            values.first().copied().unwrap_or(f64::NAN),
        )),
    }
}
