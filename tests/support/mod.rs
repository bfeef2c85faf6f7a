//! Shared helpers for integration tests: scan directories on disk and label lists

#![allow(dead_code)]

use image::{ImageBuffer, Luma};
use spinepipe::inference::mock::stacked_detections;
use spinepipe::{VertebraDetection, VertebraLabel};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Slices, rows and columns of the default scan
pub const SCAN_SHAPE: [usize; 3] = [30, 320, 320];

/// Sidecar with every geometry field, sagittal with rows running head to feet
pub const COMPLETE_SIDECAR: &str =
    r#"{"pixel_spacing": [0.5, 0.5], "slice_thickness": 2, "orientation": [0, 1, 0, 0, 0, -1]}"#;

pub fn get_spinepipe_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("spinepipe")
}

/// Writes `shape[0]` PNG slices of `shape[1]` x `shape[2]` into `dir`.
/// Intensities vary by slice and row so crops differ from one disc to the next.
pub fn write_slices(dir: &Path, shape: [usize; 3]) {
    let [slices, rows, columns] = shape;
    for index in 0..slices {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(columns as u32, rows as u32, |_, y| {
                Luma([(index as u16 * 7 + y as u16 / 8) % 512])
            });
        img.save(dir.join(format!("slice{}.png", index + 1)))
            .unwrap();
    }
}

pub fn write_sidecar(dir: &Path, json: &str) {
    fs::write(dir.join("series.json"), json).unwrap();
}

/// A scan directory inside a fresh temp dir, plus a report destination next to it
pub struct ScanFixture {
    pub root: TempDir,
    pub scan_dir: PathBuf,
    pub report: PathBuf,
}

impl ScanFixture {
    pub fn new(shape: [usize; 3], sidecar: Option<&str>) -> Self {
        let root = TempDir::new().unwrap();
        let scan_dir = root.path().join("patient-07");
        fs::create_dir_all(&scan_dir).unwrap();
        write_slices(&scan_dir, shape);
        if let Some(json) = sidecar {
            write_sidecar(&scan_dir, json);
        }
        let report = root.path().join("results").join("patient-07.csv");
        Self {
            root,
            scan_dir,
            report,
        }
    }

    pub fn complete() -> Self {
        Self::new(SCAN_SHAPE, Some(COMPLETE_SIDECAR))
    }

    pub fn report_text(&self) -> String {
        fs::read_to_string(&self.report).unwrap()
    }
}

pub fn labels(names: &[&str]) -> Vec<VertebraLabel> {
    names.iter().map(|n| n.parse().unwrap()).collect()
}

pub fn lumbar_detections() -> Vec<VertebraDetection> {
    stacked_detections(&labels(&["L1", "L2", "L3", "L4", "L5"]), SCAN_SHAPE)
}
