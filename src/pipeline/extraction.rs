//! Disc extraction: turning consecutive vertebra detections into disc crops

use crate::model::{IvdRegion, VertebraDetection, Volume, VolumeAxis, VoxelBox};
use crate::validation::Violation;
use ndarray::s;
use tracing::debug;

/// Derives one disc region per pair of consecutive detections
pub trait DiscExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Returns an empty sequence when fewer than two detections are given.
    fn extract(
        &self,
        detections: &[VertebraDetection],
        volume: &Volume,
    ) -> Result<Vec<IvdRegion>, Violation>;
}

/// Crops the space between two vertebral bodies.
///
/// Along the cranio-caudal axis the crop runs from the centre of the upper body to the
/// centre of the lower one, so the interpolated boundary between the bodies sits at its
/// midpoint. The remaining axes take the union of both bodies. The result is clamped
/// to the volume.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundaryInterpolation;

impl BoundaryInterpolation {
    pub fn new() -> Self {
        Self
    }

    pub fn crop_between(
        upper: &VoxelBox,
        lower: &VoxelBox,
        axis: VolumeAxis,
        shape: [usize; 3],
    ) -> VoxelBox {
        let mut start = [0usize; 3];
        let mut end = [0usize; 3];

        for other in VolumeAxis::ALL {
            let i = other.index();
            let (lo, hi) = if other == axis {
                let a = upper.center(axis);
                let b = lower.center(axis);
                let lo = a.min(b).floor() as usize;
                let hi = (a.max(b).ceil() as usize).max(lo + 1);
                (lo, hi)
            } else {
                (
                    upper.start[i].min(lower.start[i]),
                    upper.end[i].max(lower.end[i]),
                )
            };
            end[i] = hi.min(shape[i]);
            start[i] = lo.min(end[i]);
        }

        VoxelBox::new(start, end)
    }
}

impl DiscExtractor for BoundaryInterpolation {
    fn name(&self) -> &str {
        "boundary-interpolation"
    }

    fn extract(
        &self,
        detections: &[VertebraDetection],
        volume: &Volume,
    ) -> Result<Vec<IvdRegion>, Violation> {
        if detections.len() < 2 {
            debug!(
                detections = detections.len(),
                "Fewer than two detections, no disc regions"
            );
            return Ok(Vec::new());
        }

        let axis = volume.orientation().craniocaudal_axis().axis;
        let shape = volume.shape();
        let voxels = volume.voxels();

        detections
            .windows(2)
            .map(|pair| {
                let (upper, lower) = (&pair[0], &pair[1]);
                let crop = Self::crop_between(&upper.bounds, &lower.bounds, axis, shape);
                let sub = voxels
                    .slice(s![
                        crop.start[0]..crop.end[0],
                        crop.start[1]..crop.end[1],
                        crop.start[2]..crop.end[2]
                    ])
                    .to_owned();
                debug!(
                    upper = %upper.label,
                    lower = %lower.label,
                    crop = %crop,
                    "Extracted disc region"
                );
                IvdRegion::between(upper, lower, crop, sub)
                    .map_err(|e| Violation::new("AdjacentPairs", e.to_string()))
            })
            .collect()
    }
}
