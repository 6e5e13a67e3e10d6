use crate::config::{resolve_output_dir, EvalConfig};
use crate::error::{EvalError, EvalResult};
use cli_support::EvalOpts;
use inference::{CheckpointReference, DeviceMode};
use models::{DepthNetConfig, InferenceOptions};
use mvs_dataset::TestSetConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Frozen description of one evaluation run. Built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    config_file: PathBuf,
    config: EvalConfig,
    output_dir: PathBuf,
    device_mode: DeviceMode,
    image_scales: Vec<f32>,
    inter_scales: Vec<f32>,
    batch_size: usize,
}

impl RunContext {
    /// Resolve the configuration, pick the device mode and create the output
    /// directory. Creating an existing directory is not an error.
    pub fn build(opts: &EvalOpts, accelerators: usize) -> EvalResult<Self> {
        let config = EvalConfig::load(&opts.config_file, &opts.overrides)?;
        let device_mode = DeviceMode::detect(opts.cpu, accelerators).ok_or_else(|| {
            EvalError::config(
                "no accelerator visible; pass --cpu or build with the backend-wgpu feature",
            )
        })?;

        let output_dir = resolve_output_dir(&config.output_dir, &opts.config_file);
        fs::create_dir_all(&output_dir).map_err(|e| {
            EvalError::config(format!(
                "cannot create output dir {}: {e}",
                output_dir.display()
            ))
        })?;

        Ok(Self {
            config_file: opts.config_file.clone(),
            image_scales: config.image_scales(),
            inter_scales: config.inter_scales(),
            batch_size: config.test.batch_size,
            config,
            output_dir,
            device_mode,
        })
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn device_mode(&self) -> DeviceMode {
        self.device_mode
    }

    pub fn image_scales(&self) -> &[f32] {
        &self.image_scales
    }

    pub fn inter_scales(&self) -> &[f32] {
        &self.inter_scales
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn checkpoint_reference(&self) -> CheckpointReference {
        CheckpointReference::from_config(&self.config.test.weight, &self.output_dir)
    }

    /// Fixed evaluation flags: refine on, evaluation mode on.
    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions::evaluation(self.image_scales.clone(), self.inter_scales.clone())
    }

    pub fn model_config(&self) -> DepthNetConfig {
        DepthNetConfig {
            base_channels: self.config.model.base_channels,
            num_depth: self.config.model.num_depth,
        }
    }

    pub fn test_set_config(&self) -> TestSetConfig {
        let data = &self.config.data.test;
        TestSetConfig {
            root_dir: PathBuf::from(&data.root_dir),
            scans: data.scans.clone(),
            num_view: data.num_view,
            num_depth: self.config.model.num_depth,
            interval_scale: data.interval_scale as f32,
        }
    }
}
