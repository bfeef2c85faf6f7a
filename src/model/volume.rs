//! Scan volume and its physical geometry

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tolerance for unit-length and orthogonality checks on direction cosines
const ORIENTATION_TOLERANCE: f64 = 1e-3;

/// Canonical sagittal orientation (rows run anterior to posterior, columns run head to feet)
pub const SAGITTAL_ORIENTATION: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, -1.0];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("pixel spacing must be two strictly positive values, got ({row}, {column})")]
    InvalidSpacing { row: f64, column: f64 },

    #[error("slice thickness must be strictly positive, got {0}")]
    InvalidThickness(f64),

    #[error("invalid orientation: {0}")]
    InvalidOrientation(String),

    #[error("volume has an empty axis: shape {0:?}")]
    EmptyAxis([usize; 3]),
}

/// In-plane pixel spacing in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpacing {
    /// Distance between adjacent rows
    pub row: f64,
    /// Distance between adjacent columns
    pub column: f64,
}

impl PixelSpacing {
    pub fn new(row: f64, column: f64) -> Result<Self, GeometryError> {
        let spacing = Self { row, column };
        spacing.validate()?;
        Ok(spacing)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if is_positive(self.row) && is_positive(self.column) {
            Ok(())
        } else {
            Err(GeometryError::InvalidSpacing {
                row: self.row,
                column: self.column,
            })
        }
    }
}

impl fmt::Display for PixelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Axis of the voxel array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeAxis {
    Slice,
    Row,
    Column,
}

impl VolumeAxis {
    pub const ALL: [VolumeAxis; 3] = [VolumeAxis::Slice, VolumeAxis::Row, VolumeAxis::Column];

    pub fn index(self) -> usize {
        match self {
            VolumeAxis::Slice => 0,
            VolumeAxis::Row => 1,
            VolumeAxis::Column => 2,
        }
    }
}

/// Voxel axis running head to feet, and whether increasing index moves towards the feet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CraniocaudalAxis {
    pub axis: VolumeAxis,
    pub caudal_increasing: bool,
}

/// Direction cosines of the first row followed by those of the first column,
/// expressed in the patient frame (x left, y posterior, z superior)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation([f64; 6]);

impl Orientation {
    pub fn new(cosines: [f64; 6]) -> Result<Self, GeometryError> {
        let orientation = Self(cosines);
        orientation.validate()?;
        Ok(orientation)
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, GeometryError> {
        let cosines: [f64; 6] = values.try_into().map_err(|_| {
            GeometryError::InvalidOrientation(format!(
                "expected 6 direction cosines, got {}",
                values.len()
            ))
        })?;
        Self::new(cosines)
    }

    pub fn sagittal() -> Self {
        Self(SAGITTAL_ORIENTATION)
    }

    pub fn cosines(&self) -> [f64; 6] {
        self.0
    }

    /// Direction travelled when the column index increases
    pub fn row_direction(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Direction travelled when the row index increases
    pub fn column_direction(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Direction travelled when the slice index increases
    pub fn normal(&self) -> [f64; 3] {
        let r = self.row_direction();
        let c = self.column_direction();
        [
            r[1] * c[2] - r[2] * c[1],
            r[2] * c[0] - r[0] * c[2],
            r[0] * c[1] - r[1] * c[0],
        ]
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.0.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::InvalidOrientation(
                "direction cosines must be finite".to_string(),
            ));
        }
        let r = self.row_direction();
        let c = self.column_direction();
        for (name, v) in [("row", r), ("column", c)] {
            let norm = dot(v, v).sqrt();
            if (norm - 1.0).abs() > ORIENTATION_TOLERANCE {
                return Err(GeometryError::InvalidOrientation(format!(
                    "{} direction is not unit length (norm {:.4})",
                    name, norm
                )));
            }
        }
        let d = dot(r, c);
        if d.abs() > ORIENTATION_TOLERANCE {
            return Err(GeometryError::InvalidOrientation(format!(
                "row and column directions are not orthogonal (dot {:.4})",
                d
            )));
        }
        Ok(())
    }

    /// Picks the voxel axis most aligned with the patient's head-feet axis.
    /// In-plane axes win ties against the slice normal.
    pub fn craniocaudal_axis(&self) -> CraniocaudalAxis {
        let candidates = [
            (VolumeAxis::Row, self.column_direction()[2]),
            (VolumeAxis::Column, self.row_direction()[2]),
            (VolumeAxis::Slice, self.normal()[2]),
        ];
        let (axis, z) = candidates
            .into_iter()
            .fold(candidates[0], |best, candidate| {
                if candidate.1.abs() > best.1.abs() + ORIENTATION_TOLERANCE {
                    candidate
                } else {
                    best
                }
            });
        CraniocaudalAxis {
            axis,
            // patient +z is superior
            caudal_increasing: z <= 0.0,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Validated physical geometry of a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub pixel_spacing: PixelSpacing,
    pub slice_thickness: f64,
    pub orientation: Orientation,
}

impl Geometry {
    pub fn new(
        pixel_spacing: PixelSpacing,
        slice_thickness: f64,
        orientation: Orientation,
    ) -> Result<Self, GeometryError> {
        let geometry = Self {
            pixel_spacing,
            slice_thickness,
            orientation,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        self.pixel_spacing.validate()?;
        validate_thickness(self.slice_thickness)?;
        self.orientation.validate()
    }
}

pub fn validate_thickness(thickness: f64) -> Result<(), GeometryError> {
    if is_positive(thickness) {
        Ok(())
    } else {
        Err(GeometryError::InvalidThickness(thickness))
    }
}

/// Intensity volume with axes (slice, row, column)
#[derive(Debug, Clone)]
pub struct Volume {
    voxels: Array3<f32>,
    geometry: Geometry,
}

impl Volume {
    pub fn new(voxels: Array3<f32>, geometry: Geometry) -> Result<Self, GeometryError> {
        let shape = shape_of(&voxels);
        if shape.iter().any(|&n| n == 0) {
            return Err(GeometryError::EmptyAxis(shape));
        }
        geometry.validate()?;
        Ok(Self { voxels, geometry })
    }

    pub fn voxels(&self) -> &Array3<f32> {
        &self.voxels
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn pixel_spacing(&self) -> PixelSpacing {
        self.geometry.pixel_spacing
    }

    pub fn slice_thickness(&self) -> f64 {
        self.geometry.slice_thickness
    }

    pub fn orientation(&self) -> Orientation {
        self.geometry.orientation
    }

    pub fn shape(&self) -> [usize; 3] {
        shape_of(&self.voxels)
    }

    pub fn rank(&self) -> usize {
        self.voxels.ndim()
    }
}

fn shape_of(voxels: &Array3<f32>) -> [usize; 3] {
    let (s, r, c) = voxels.dim();
    [s, r, c]
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
