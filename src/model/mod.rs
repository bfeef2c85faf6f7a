//! Data flowing between pipeline stages: volume, detections, disc regions, grades and report

pub mod detection;
pub mod grade;
pub mod region;
pub mod report;
pub mod volume;

pub use detection::{LabelParseError, SpinalRegion, VertebraDetection, VertebraLabel, VoxelBox};
pub use grade::Grade;
pub use region::{DiscId, DiscIdError, IvdRegion};
pub use report::{Report, ReportRow, REPORT_COLUMNS};
pub use volume::{
    CraniocaudalAxis, Geometry, GeometryError, Orientation, PixelSpacing, Volume, VolumeAxis,
};
