//! Core types and error definitions for mvs_dataset.

use data_contracts::{CameraParams, FormatError};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("scan directory missing: {path}")]
    MissingScan { path: PathBuf },
    #[error("view {view} has {available} source views, {needed} needed")]
    NotEnoughViews {
        view: usize,
        available: usize,
        needed: usize,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("view size mismatch: {path} is {actual:?}, reference is {expected:?}")]
    SizeMismatch {
        path: PathBuf,
        actual: (u32, u32),
        expected: (u32, u32),
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetConfig {
    pub root_dir: PathBuf,
    pub scans: Vec<String>,
    /// Reference view plus `num_view - 1` source views.
    pub num_view: usize,
    /// Depth hypotheses packed into each camera.
    pub num_depth: usize,
    /// Multiplier on the camera file's depth interval.
    pub interval_scale: f32,
}

/// Position of one sample in the test set.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleIndex {
    pub scan: String,
    pub ref_view: usize,
    pub src_views: Vec<usize>,
}

/// One decoded test unit; owned by the data source, read by the harness.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Identifying path; drives output routing.
    pub ref_img_path: PathBuf,
    /// Reference view first, then source views in pair-file order.
    pub images: Vec<RgbImage>,
    /// Aligned with `images`.
    pub cameras: Vec<CameraParams>,
}

impl Sample {
    pub fn reference(&self) -> Option<&RgbImage> {
        self.images.first()
    }
}
