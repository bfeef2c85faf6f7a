//! Scan acquisition: turning a series directory plus metadata overrides into a validated volume

mod error;
pub mod merge;
pub mod overrides;
pub mod slices;

pub use error::LoadError;
pub use merge::{merge_geometry, MetadataPolicy, SourceGeometry};
pub use overrides::{GeometryField, MetadataOverride};
pub use slices::{SliceDirectorySource, SERIES_METADATA_FILE};

use crate::model::Volume;
use std::path::Path;

/// Produces a validated volume from a scan location.
///
/// Implementations apply `overrides` with precedence over parsed metadata and must
/// return a volume satisfying every geometry invariant, or a [`LoadError`].
pub trait VolumeSource: Send + Sync {
    fn load(
        &self,
        path: &Path,
        require_complete_metadata: bool,
        overrides: &MetadataOverride,
    ) -> Result<Volume, LoadError>;
}
