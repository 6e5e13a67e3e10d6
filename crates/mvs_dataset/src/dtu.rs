//! DTU evaluation layout.
//!
//! ```text
//! <root>/Cameras/pair.txt
//! <root>/Cameras/{view:08}_cam.txt
//! <root>/Eval/Rectified/<scan>/rect_{view+1:03}_3_r5000.png
//! ```

use crate::types::{DatasetError, DatasetResult, Sample, SampleIndex, TestSetConfig};
use data_contracts::{read_pair_file, CameraParams};
use std::path::{Path, PathBuf};

/// Path rules for one DTU-style root.
#[derive(Debug, Clone)]
pub struct DtuLayout {
    pub root: PathBuf,
}

impl DtuLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pair_file(&self) -> PathBuf {
        self.root.join("Cameras").join("pair.txt")
    }

    pub fn camera_file(&self, view: usize) -> PathBuf {
        self.root.join("Cameras").join(format!("{view:08}_cam.txt"))
    }

    pub fn scan_dir(&self, scan: &str) -> PathBuf {
        self.root.join("Eval").join("Rectified").join(scan)
    }

    pub fn image_file(&self, scan: &str, view: usize) -> PathBuf {
        self.scan_dir(scan)
            .join(format!("rect_{:03}_3_r5000.png", view + 1))
    }
}

pub struct DtuTestSet {
    layout: DtuLayout,
    cfg: TestSetConfig,
    indices: Vec<SampleIndex>,
}

impl DtuTestSet {
    pub fn new(cfg: TestSetConfig) -> DatasetResult<Self> {
        if cfg.num_view < 2 {
            return Err(DatasetError::Other(format!(
                "num_view must be at least 2, got {}",
                cfg.num_view
            )));
        }
        let layout = DtuLayout::new(&cfg.root_dir);
        let pairs = read_pair_file(&layout.pair_file())?;
        let needed = cfg.num_view - 1;

        let mut indices = Vec::with_capacity(cfg.scans.len() * pairs.len());
        for scan in &cfg.scans {
            let dir = layout.scan_dir(scan);
            if !dir.is_dir() {
                return Err(DatasetError::MissingScan { path: dir });
            }
            for pair in &pairs {
                if pair.src_views.len() < needed {
                    return Err(DatasetError::NotEnoughViews {
                        view: pair.ref_view,
                        available: pair.src_views.len(),
                        needed,
                    });
                }
                indices.push(SampleIndex {
                    scan: scan.clone(),
                    ref_view: pair.ref_view,
                    src_views: pair.src_views[..needed].to_vec(),
                });
            }
        }
        Ok(Self {
            layout,
            cfg,
            indices,
        })
    }

    pub fn config(&self) -> &TestSetConfig {
        &self.cfg
    }

    pub fn indices(&self) -> &[SampleIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Decode sample `i`: reference view first, then its source views.
    pub fn get(&self, i: usize) -> DatasetResult<Sample> {
        let idx = self
            .indices
            .get(i)
            .ok_or_else(|| DatasetError::Other(format!("sample index {i} out of range")))?;

        let views = std::iter::once(idx.ref_view).chain(idx.src_views.iter().copied());
        let mut images: Vec<image::RgbImage> = Vec::with_capacity(self.cfg.num_view);
        let mut cameras = Vec::with_capacity(self.cfg.num_view);
        for view in views {
            let path = self.layout.image_file(&idx.scan, view);
            let image = load_rgb(&path)?;
            if let Some(first) = images.first() {
                if image.dimensions() != first.dimensions() {
                    return Err(DatasetError::SizeMismatch {
                        path,
                        actual: image.dimensions(),
                        expected: first.dimensions(),
                    });
                }
            }
            images.push(image);
            cameras.push(CameraParams::read(&self.layout.camera_file(view))?);
        }

        Ok(Sample {
            ref_img_path: self.layout.image_file(&idx.scan, idx.ref_view),
            images,
            cameras,
        })
    }
}

fn load_rgb(path: &Path) -> DatasetResult<image::RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| DatasetError::Image {
            path: path.to_path_buf(),
            source,
        })
}
