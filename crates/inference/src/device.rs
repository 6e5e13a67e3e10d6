use burn::tensor::backend::Backend;
use models::{DepthEstimator, InferenceError, InferenceOptions, MvsBatch, Prediction};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Environment variable listing discrete GPU indices, e.g. `0,1`.
pub const VISIBLE_DEVICES_ENV: &str = "WGPU_VISIBLE_DEVICES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceMode {
    Cpu,
    SingleGpu,
    /// Data-parallel over `count` accelerators.
    MultiGpu { count: usize },
}

impl DeviceMode {
    /// `None` when accelerators were requested but none are visible.
    pub fn detect(cpu_only: bool, accelerators: usize) -> Option<Self> {
        match (cpu_only, accelerators) {
            (true, _) => Some(DeviceMode::Cpu),
            (false, 0) => None,
            (false, 1) => Some(DeviceMode::SingleGpu),
            (false, count) => Some(DeviceMode::MultiGpu { count }),
        }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, DeviceMode::Cpu)
    }

    pub fn device_count(&self) -> usize {
        match self {
            DeviceMode::Cpu | DeviceMode::SingleGpu => 1,
            DeviceMode::MultiGpu { count } => *count,
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Cpu => write!(f, "Using CPU"),
            other => write!(f, "Using {} GPUs", other.device_count()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{mode:?} needs {needed} device(s), {available} provided")]
    DeviceCount {
        mode: DeviceMode,
        needed: usize,
        available: usize,
    },
}

/// Explicit device affinity for the model and every batch.
#[derive(Debug, Clone)]
pub struct DeviceDispatcher<B: Backend> {
    mode: DeviceMode,
    devices: Vec<B::Device>,
}

impl<B: Backend> DeviceDispatcher<B> {
    pub fn new(mode: DeviceMode, devices: Vec<B::Device>) -> Result<Self, DispatchError> {
        let needed = mode.device_count();
        if devices.len() < needed {
            return Err(DispatchError::DeviceCount {
                mode,
                needed,
                available: devices.len(),
            });
        }
        let devices = devices.into_iter().take(needed).collect();
        Ok(Self { mode, devices })
    }

    /// Host-memory dispatcher on the backend's default device.
    pub fn cpu() -> Self {
        Self {
            mode: DeviceMode::Cpu,
            devices: vec![B::Device::default()],
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn devices(&self) -> &[B::Device] {
        &self.devices
    }

    /// Device that receives whole batches and gathers outputs.
    pub fn primary(&self) -> &B::Device {
        &self.devices[0]
    }

    /// Place the model: kept as-is on the CPU, replicated once per accelerator otherwise.
    pub fn prepare<M: DepthEstimator<B>>(&self, model: M) -> DispatchedModel<B, M> {
        let replicas = match self.mode {
            DeviceMode::Cpu => vec![(self.primary().clone(), model)],
            _ => self
                .devices
                .iter()
                .map(|device| (device.clone(), model.clone().replicate_to(device)))
                .collect(),
        };
        DispatchedModel { replicas }
    }

    /// Move a batch's tensors to the primary device. Transfers are queued on the
    /// backend's stream and do not block the host until data is read back.
    pub fn place(&self, batch: MvsBatch<B>) -> MvsBatch<B> {
        match self.mode {
            DeviceMode::Cpu => batch,
            _ => batch.to_device(self.primary()),
        }
    }
}

/// Model ready for dispatch: one replica per device, in device order.
pub struct DispatchedModel<B: Backend, M> {
    replicas: Vec<(B::Device, M)>,
}

impl<B: Backend, M: DepthEstimator<B>> DispatchedModel<B, M> {
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Forward one batch. With several replicas the batch is split along its first
    /// axis, chunks run concurrently, and predictions are gathered in batch order.
    pub fn infer(
        &self,
        batch: MvsBatch<B>,
        opts: &InferenceOptions,
    ) -> Result<Vec<Prediction>, InferenceError> {
        if self.replicas.len() == 1 || batch.batch_size() <= 1 {
            let (_, model) = &self.replicas[0];
            return model.infer(batch, opts);
        }

        let chunks = batch.split(self.replicas.len());
        let results: Vec<Result<Vec<Prediction>, InferenceError>> = std::thread::scope(|s| {
            let handles: Vec<_> = chunks
                .into_iter()
                .zip(&self.replicas)
                .map(|(chunk, (device, model))| {
                    let model = model.clone();
                    let device = device.clone();
                    s.spawn(move || model.infer(chunk.to_device(&device), opts))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(InferenceError::Replica {
                            index,
                            msg: "replica thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        let mut gathered = Vec::new();
        for result in results {
            gathered.extend(result?);
        }
        Ok(gathered)
    }
}

/// Parse a comma-separated device index list; blanks and junk entries are ignored.
pub fn parse_device_list(raw: &str) -> Vec<usize> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .collect()
}

/// Accelerators this build can see.
#[cfg(feature = "backend-wgpu")]
pub fn accelerator_devices() -> Vec<burn_wgpu::WgpuDevice> {
    match std::env::var(VISIBLE_DEVICES_ENV) {
        Ok(raw) => parse_device_list(&raw)
            .into_iter()
            .map(burn_wgpu::WgpuDevice::DiscreteGpu)
            .collect(),
        Err(_) => vec![burn_wgpu::WgpuDevice::default()],
    }
}

#[cfg(feature = "backend-wgpu")]
pub fn accelerator_count() -> usize {
    accelerator_devices().len()
}

#[cfg(not(feature = "backend-wgpu"))]
pub fn accelerator_count() -> usize {
    0
}
