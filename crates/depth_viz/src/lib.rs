//! Offline look at one routed artifact set.
//!
//! Loads a reference image, a PFM depth map and an XYZ point cloud, and writes three
//! figures: the image itself, the depth as a grayscale height field and the cloud as
//! a 3-D scatter coloured by elevation. Inputs are only ever read.

pub mod render;

pub use render::{depth_to_gray, jet, render_cloud, subsample};

use cli_support::VisualizeOpts;
use data_contracts::{read_pfm, read_xyz, FormatError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("plotting failed for {path}: {msg}")]
    Plot { path: PathBuf, msg: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to overwrite input {0}")]
    WouldOverwriteInput(PathBuf),
}

/// Figures written by [`visualize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figures {
    pub image: PathBuf,
    pub depth: PathBuf,
    pub cloud: PathBuf,
}

impl Figures {
    pub fn in_dir(out_dir: &Path, stem: &str) -> Self {
        Self {
            image: out_dir.join(format!("{stem}_image.png")),
            depth: out_dir.join(format!("{stem}_depth.png")),
            cloud: out_dir.join(format!("{stem}_cloud.png")),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.image, &self.depth, &self.cloud]
    }
}

/// Render the three figures for one artifact set into `opts.out_dir`.
pub fn visualize(opts: &VisualizeOpts) -> Result<Figures, VizError> {
    let stem = opts
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    let figures = Figures::in_dir(&opts.out_dir, &stem);
    for out in figures.all() {
        if [&opts.image, &opts.depth, &opts.points]
            .iter()
            .any(|input| same_file(input, out))
        {
            return Err(VizError::WouldOverwriteInput(out.to_path_buf()));
        }
    }

    let reference = image::open(&opts.image).map_err(|source| VizError::Image {
        path: opts.image.clone(),
        source,
    })?;
    let depth = read_pfm(&opts.depth)?;
    let cloud = read_xyz(&opts.points)?;
    tracing::info!(
        depth_w = depth.width,
        depth_h = depth.height,
        points = cloud.len(),
        "loaded artifact set"
    );

    fs::create_dir_all(&opts.out_dir).map_err(|source| VizError::Io {
        path: opts.out_dir.clone(),
        source,
    })?;
    reference
        .to_rgb8()
        .save(&figures.image)
        .map_err(|source| VizError::Image {
            path: figures.image.clone(),
            source,
        })?;
    depth_to_gray(&depth)
        .save(&figures.depth)
        .map_err(|source| VizError::Image {
            path: figures.depth.clone(),
            source,
        })?;
    let points = subsample(&cloud, opts.max_points);
    render_cloud(&points, &figures.cloud)?;

    Ok(figures)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
