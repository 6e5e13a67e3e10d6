use crate::error::{EvalError, EvalResult};
use data_contracts::{write_pfm, write_xyz};
use image::RgbImage;
use models::Prediction;
use std::fs;
use std::path::{Path, PathBuf};

/// Where one sample's artifacts live. A pure function of the scan folder name and
/// the sample path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub dir: PathBuf,
    pub stem: String,
}

impl ArtifactLayout {
    /// `<eval_root>/<scan_folder>/<scene>/`, where `eval_root` drops the sample path's
    /// last three components and `scene` is the sample's parent directory. Paths with
    /// fewer components fall back to their root (`/` or the empty relative path).
    pub fn locate(scan_folder: &str, sample_path: &str) -> EvalResult<Self> {
        let path = Path::new(sample_path);
        let unroutable = |why: &str| EvalError::artifact(path, format!("cannot route sample: {why}"));

        let scene = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .ok_or_else(|| unroutable("no scene directory"))?;
        let eval_root = path
            .ancestors()
            .nth(3)
            .or_else(|| path.ancestors().last())
            .unwrap_or(Path::new(""));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| unroutable("no file name"))?;

        Ok(Self {
            dir: eval_root.join(scan_folder).join(scene),
            stem: view_stem(stem),
        })
    }

    pub fn init_depth(&self) -> PathBuf {
        self.file(&format!("{}_init.pfm", self.stem))
    }

    /// Refinement stage `k`, counted from 1.
    pub fn flow_depth(&self, k: usize) -> PathBuf {
        self.file(&format!("{}_flow{k}.pfm", self.stem))
    }

    pub fn points(&self, tag: &str) -> PathBuf {
        self.file(&format!("{}_{tag}pts.xyz", self.stem))
    }

    pub fn image(&self) -> PathBuf {
        self.file(&format!("{}.jpg", self.stem))
    }

    pub fn camera(&self) -> PathBuf {
        self.file(&format!("{}_cam.txt", self.stem))
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// DTU `rect_NNN_*` images are stored per zero-based view id; other names keep
/// their stem.
fn view_stem(file_stem: &str) -> String {
    let view = file_stem
        .strip_prefix("rect_")
        .and_then(|rest| rest.split('_').next())
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|n| *n > 0);
    match view {
        Some(n) => format!("{:08}", n - 1),
        None => file_stem.to_string(),
    }
}

/// Files written for one prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedArtifact {
    pub layout: ArtifactLayout,
    /// Final depth map (last refinement stage, or the coarse one).
    pub depth: PathBuf,
    pub points: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResultRouter {
    scan_folder: String,
}

impl ResultRouter {
    pub fn new(scan_folder: impl Into<String>) -> Self {
        Self {
            scan_folder: scan_folder.into(),
        }
    }

    /// Router whose scan folder is the output directory's final segment.
    pub fn for_output_dir(output_dir: &Path) -> EvalResult<Self> {
        let folder = output_dir
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                EvalError::config(format!(
                    "output dir {} has no final segment",
                    output_dir.display()
                ))
            })?;
        Ok(Self::new(folder))
    }

    pub fn scan_folder(&self) -> &str {
        &self.scan_folder
    }

    pub fn locate(&self, sample_path: &str) -> EvalResult<ArtifactLayout> {
        ArtifactLayout::locate(&self.scan_folder, sample_path)
    }

    /// Persist every artifact of `pred`, truncating files from earlier runs.
    pub fn write(
        &self,
        pred: &Prediction,
        sample_path: &str,
        reference: Option<&RgbImage>,
    ) -> EvalResult<RoutedArtifact> {
        let layout = self.locate(sample_path)?;
        fs::create_dir_all(&layout.dir).map_err(|e| EvalError::artifact(&layout.dir, e))?;
        let mut files = Vec::with_capacity(pred.refined_depths.len() + 4);

        let init = layout.init_depth();
        write_pfm(&init, &pred.coarse_depth).map_err(|e| EvalError::artifact(&init, e))?;
        files.push(init.clone());

        let mut depth = init;
        for (i, stage) in pred.refined_depths.iter().enumerate() {
            let path = layout.flow_depth(i + 1);
            write_pfm(&path, stage).map_err(|e| EvalError::artifact(&path, e))?;
            files.push(path.clone());
            depth = path;
        }

        let points = layout.points(&pred.final_tag());
        write_xyz(&points, &pred.point_cloud).map_err(|e| EvalError::artifact(&points, e))?;
        files.push(points.clone());

        let camera = layout.camera();
        pred.camera
            .write(&camera)
            .map_err(|e| EvalError::artifact(&camera, e))?;
        files.push(camera);

        if let Some(img) = reference {
            let path = layout.image();
            img.save(&path).map_err(|e| EvalError::artifact(&path, e))?;
            files.push(path);
        }

        Ok(RoutedArtifact {
            layout,
            depth,
            points,
            files,
        })
    }
}
