#![recursion_limit = "256"]

pub mod checkpoint;
pub mod device;

/// Host backend; always available.
pub type CpuBackend = burn_ndarray::NdArray<f32>;
/// Accelerator backend, only with `backend-wgpu`.
#[cfg(feature = "backend-wgpu")]
pub type GpuBackend = burn_wgpu::Wgpu<f32>;

pub use checkpoint::{
    resolve_template, CheckpointError, CheckpointReference, CheckpointStore, LoadedCheckpoint,
    ResumeState, TEMPLATE_TOKEN,
};
pub use device::{
    accelerator_count, parse_device_list, DeviceDispatcher, DeviceMode, DispatchError,
    DispatchedModel,
};

pub mod prelude {
    pub use crate::checkpoint::{CheckpointReference, CheckpointStore, ResumeState};
    pub use crate::device::{DeviceDispatcher, DeviceMode, DispatchedModel};
    pub use crate::CpuBackend;
    #[cfg(feature = "backend-wgpu")]
    pub use crate::GpuBackend;
}
