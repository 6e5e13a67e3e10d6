#![allow(dead_code)]

use burn_ndarray::NdArray;
use cli_support::EvalOpts;
use inference::{CheckpointStore, ResumeState};
use models::{DepthNet, DepthNetConfig};
use mvs_dataset::DtuLayout;
use std::fs;
use std::path::{Path, PathBuf};

pub type Backend = NdArray<f32>;

pub const BASE_CHANNELS: usize = 2;
pub const NUM_DEPTH: usize = 4;

const CAMERA: &str = "extrinsic
1 0 0 0
0 1 0 0
0 0 1 0
0 0 0 1

intrinsic
16 0 8
0 16 4
0 0 1

425 2.5
";

/// Synthetic DTU root with `samples` reference views, each paired with the next view.
pub fn dtu_root(root: &Path, samples: usize) {
    let layout = DtuLayout::new(root);
    fs::create_dir_all(root.join("Cameras")).unwrap();
    fs::create_dir_all(layout.scan_dir("scan1")).unwrap();

    let mut pair = format!("{samples}\n");
    for view in 0..samples {
        pair.push_str(&format!("{view}\n1 {} 100.0\n", view + 1));
    }
    fs::write(layout.pair_file(), pair).unwrap();

    for view in 0..=samples {
        fs::write(layout.camera_file(view), CAMERA).unwrap();
        let img = image::RgbImage::from_fn(16, 8, |x, y| {
            image::Rgb([(x * 15) as u8, (y * 30) as u8, (view * 40) as u8])
        });
        img.save(layout.image_file("scan1", view)).unwrap();
    }
}

/// Write `<tmp>/configs/run.toml` pointing at `data_root`; output resolves to
/// `<tmp>/outputs/run`.
pub fn config_file(tmp: &Path, data_root: &Path) -> PathBuf {
    let dir = tmp.join("configs");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.toml");
    let raw = format!(
        r#"output_dir = "@"

[model]
num_depth = {NUM_DEPTH}
base_channels = {BASE_CHANNELS}

[model.test]
img_scales = [0.25, 0.5]
inter_scales = [0.75]

[data.test]
root_dir = "{}"
scans = ["scan1"]
num_view = 2
"#,
        data_root.display()
    );
    fs::write(&path, raw).unwrap();
    path
}

pub fn opts(config: &Path, overrides: &[&str]) -> EvalOpts {
    EvalOpts::new(
        config,
        true,
        overrides.iter().map(|s| s.to_string()).collect(),
    )
}

pub fn fresh_net() -> DepthNet<Backend> {
    DepthNet::new(
        DepthNetConfig {
            base_channels: BASE_CHANNELS,
            num_depth: NUM_DEPTH,
        },
        &Default::default(),
    )
}

/// Save a freshly initialised net as `<dir>/model_{index:03}.bin`.
pub fn save_weights(dir: &Path, index: usize) -> PathBuf {
    CheckpointStore::new(dir)
        .save::<Backend, _>(
            fresh_net(),
            index,
            ResumeState {
                epoch: index,
                iteration: index * 100,
            },
        )
        .unwrap()
}

pub fn progress_lines(lines: &[String]) -> usize {
    lines.iter().filter(|l| l.contains(" finished. ")).count()
}
