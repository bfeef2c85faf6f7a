use super::overrides::GeometryField;
use crate::model::GeometryError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while acquiring a scan volume
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("scan path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("scan path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("scan directory is empty: {0}")]
    EmptyDirectory(PathBuf),

    #[error("no readable image series in {0}")]
    NoImageSeries(PathBuf),

    #[error("slice {path} is {found:?} (rows, columns), expected {expected:?}")]
    InconsistentSlices {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("failed to assemble volume: {0}")]
    Assembly(String),

    #[error(
        "unknown metadata override '{0}'. Valid keys: pixel_spacing (PixelSpacing), \
         slice_thickness (SliceThickness), orientation (ImageOrientationPatient)"
    )]
    UnknownOverrideKey(String),

    #[error("malformed metadata override '{entry}': {reason}")]
    MalformedOverride { entry: String, reason: String },

    #[error("invalid override for {field}: {source}")]
    InvalidOverride {
        field: GeometryField,
        #[source]
        source: GeometryError,
    },

    #[error("invalid source metadata for {field}: {source}")]
    InvalidSourceMetadata {
        field: GeometryField,
        #[source]
        source: GeometryError,
    },

    #[error("required geometry field {0} is undefined after applying overrides")]
    MissingGeometry(GeometryField),

    #[error("failed to parse series metadata {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }
}
