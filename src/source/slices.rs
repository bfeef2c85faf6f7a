//! Volume source reading one image file per slice

use super::error::LoadError;
use super::merge::{merge_geometry, MetadataPolicy, SourceGeometry};
use super::overrides::MetadataOverride;
use super::VolumeSource;
use crate::model::Volume;
use image::ImageReader;
use ndarray::Array3;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the optional geometry sidecar inside a scan directory
pub const SERIES_METADATA_FILE: &str = "series.json";

/// Loads a series stored as per-slice images (PNG, TIFF, ...) in natural filename order,
/// with geometry taken from a `series.json` sidecar and caller overrides.
#[derive(Debug, Clone, Default)]
pub struct SliceDirectorySource;

impl SliceDirectorySource {
    pub fn new() -> Self {
        Self
    }

    fn slice_candidates(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let entries = fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
        let mut seen_any = false;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::io(dir, e))?;
            seen_any = true;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name == SERIES_METADATA_FILE || !path.is_file() {
                continue;
            }
            files.push(path);
        }
        if !seen_any {
            return Err(LoadError::EmptyDirectory(dir.to_path_buf()));
        }
        files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
        Ok(files)
    }

    fn read_source_geometry(dir: &Path) -> Result<SourceGeometry, LoadError> {
        let path = dir.join(SERIES_METADATA_FILE);
        if !path.exists() {
            debug!("No {} sidecar, geometry must come from overrides", SERIES_METADATA_FILE);
            return Ok(SourceGeometry::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| LoadError::io(&path, e))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LoadError::Metadata {
                path: path.clone(),
                message: e.to_string(),
            })?;
        SourceGeometry::from_json(&value).map_err(|message| LoadError::Metadata { path, message })
    }
}

impl VolumeSource for SliceDirectorySource {
    fn load(
        &self,
        path: &Path,
        require_complete_metadata: bool,
        overrides: &MetadataOverride,
    ) -> Result<Volume, LoadError> {
        if !path.exists() {
            return Err(LoadError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(LoadError::NotADirectory(path.to_path_buf()));
        }

        let candidates = Self::slice_candidates(path)?;
        let mut dims: Option<(usize, usize)> = None;
        let mut data: Vec<f32> = Vec::new();
        let mut slices = 0usize;

        for file in &candidates {
            let decoded = match ImageReader::open(file)
                .and_then(|reader| reader.with_guessed_format())
                .map_err(|e| e.to_string())
                .and_then(|reader| reader.decode().map_err(|e| e.to_string()))
            {
                Ok(image) => image,
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };

            let luma = decoded.to_luma16();
            let found = (luma.height() as usize, luma.width() as usize);
            match dims {
                None => dims = Some(found),
                Some(expected) if expected != found => {
                    return Err(LoadError::InconsistentSlices {
                        path: file.clone(),
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            data.extend(luma.as_raw().iter().map(|&v| f32::from(v)));
            slices += 1;
        }

        let (rows, columns) = dims.ok_or_else(|| LoadError::NoImageSeries(path.to_path_buf()))?;
        let voxels = Array3::from_shape_vec((slices, rows, columns), data)
            .map_err(|e| LoadError::Assembly(e.to_string()))?;

        let source_geometry = Self::read_source_geometry(path)?;
        let policy = MetadataPolicy::from_require_complete(require_complete_metadata);
        let geometry = merge_geometry(&source_geometry, overrides, policy)?;
        let volume = Volume::new(voxels, geometry)?;

        info!(
            path = %path.display(),
            shape = ?volume.shape(),
            pixel_spacing = %volume.pixel_spacing(),
            slice_thickness = volume.slice_thickness(),
            "Loaded scan volume"
        );
        Ok(volume)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Orders `slice2.png` before `slice10.png`
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_number(&mut left);
                let rn = take_number(&mut right);
                let ord = ln
                    .trim_start_matches('0')
                    .len()
                    .cmp(&rn.trim_start_matches('0').len())
                    .then_with(|| ln.trim_start_matches('0').cmp(rn.trim_start_matches('0')))
                    .then_with(|| ln.len().cmp(&rn.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}
