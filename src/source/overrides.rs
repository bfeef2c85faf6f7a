//! Caller-supplied replacements for scan geometry

use super::error::LoadError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Geometry fields that may be overridden
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryField {
    PixelSpacing,
    SliceThickness,
    Orientation,
}

impl GeometryField {
    pub const ALL: [GeometryField; 3] = [
        GeometryField::PixelSpacing,
        GeometryField::SliceThickness,
        GeometryField::Orientation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeometryField::PixelSpacing => "pixel_spacing",
            GeometryField::SliceThickness => "slice_thickness",
            GeometryField::Orientation => "orientation",
        }
    }

    pub fn dicom_keyword(self) -> &'static str {
        match self {
            GeometryField::PixelSpacing => "PixelSpacing",
            GeometryField::SliceThickness => "SliceThickness",
            GeometryField::Orientation => "ImageOrientationPatient",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            GeometryField::PixelSpacing => 2,
            GeometryField::SliceThickness => 1,
            GeometryField::Orientation => 6,
        }
    }
}

impl fmt::Display for GeometryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryField {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        GeometryField::ALL
            .into_iter()
            .find(|field| key == field.name() || key == field.dicom_keyword())
            .ok_or_else(|| LoadError::UnknownOverrideKey(key.to_string()))
    }
}

/// Override values keyed by field. Values are raw until merged with source metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataOverride {
    values: BTreeMap<GeometryField, Vec<f64>>,
}

impl MetadataOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: GeometryField, values: Vec<f64>) -> Self {
        self.insert(field, values);
        self
    }

    pub fn insert(&mut self, field: GeometryField, values: Vec<f64>) {
        self.values.insert(field, values);
    }

    pub fn get(&self, field: GeometryField) -> Option<&[f64]> {
        self.values.get(&field).map(Vec::as_slice)
    }

    /// Applies `other` on top of this set; its values win for fields present in both
    pub fn extend(&mut self, other: MetadataOverride) {
        self.values.extend(other.values);
    }

    pub fn fields(&self) -> impl Iterator<Item = GeometryField> + '_ {
        self.values.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Parses `KEY=V1,V2,...`, e.g. `SliceThickness=2` or `orientation=0,1,0,0,0,-1`
    pub fn parse_entry(entry: &str) -> Result<(GeometryField, Vec<f64>), LoadError> {
        let (key, raw) = entry
            .split_once('=')
            .ok_or_else(|| LoadError::MalformedOverride {
                entry: entry.to_string(),
                reason: "expected KEY=VALUE".to_string(),
            })?;
        let field: GeometryField = key.parse()?;
        let values = raw
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| LoadError::MalformedOverride {
                        entry: entry.to_string(),
                        reason: format!("'{}' is not a number", v.trim()),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((field, values))
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Self, LoadError> {
        let mut overrides = Self::new();
        for entry in entries {
            let (field, values) = Self::parse_entry(entry)?;
            overrides.insert(field, values);
        }
        Ok(overrides)
    }

    /// Parses a JSON object such as `{"SliceThickness": [2], "PixelSpacing": [0.5, 0.5]}`.
    /// Naming a field twice, under either of its names, is rejected.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(json).map_err(|e| LoadError::MalformedOverride {
            entry: "<json>".to_string(),
            reason: e.to_string(),
        })?;
        let object = value
            .as_object()
            .ok_or_else(|| LoadError::MalformedOverride {
                entry: "<json>".to_string(),
                reason: "expected a JSON object".to_string(),
            })?;

        let mut overrides = Self::new();
        for (key, raw) in object {
            let field: GeometryField = key.parse()?;
            if overrides.get(field).is_some() {
                return Err(LoadError::MalformedOverride {
                    entry: key.clone(),
                    reason: format!("{} is given more than once", field.name()),
                });
            }
            let values = numeric_values(raw).ok_or_else(|| LoadError::MalformedOverride {
                entry: key.clone(),
                reason: "expected a number or a list of numbers".to_string(),
            })?;
            overrides.insert(field, values);
        }
        Ok(overrides)
    }
}

/// Accepts a number or an array of numbers
pub(crate) fn numeric_values(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| vec![v]),
        Value::Array(items) => items.iter().map(Value::as_f64).collect(),
        _ => None,
    }
}
