//! Burn depth-estimation models for multi-view-stereo evaluation.
//!
//! This crate defines:
//! - `MvsBatch`: the tensor input contract (views, packed cameras, identifying paths).
//! - `DepthNet`: a cascaded depth regressor (coarse plane-sweep probabilities, then
//!   residual refinement at each finer image scale).
//! - `DepthEstimator`: the seam the evaluation harness calls; anything that can turn a
//!   batch into per-sample `Prediction`s and be replicated onto another device.
//!
//! Models know nothing about checkpoints, devices or output files. The `inference`
//! crate handles placement and weights, the `eval` crate drives the loop.
//!
//! ## Design Note
//! Inference options travel as one named struct (`InferenceOptions`) instead of
//! positional flags, so call sites read as `refine: true, eval_mode: true`.

pub mod batch;
pub mod depth_net;
pub mod error;
pub mod geometry;
pub mod options;
pub mod prediction;

pub use batch::MvsBatch;
pub use depth_net::{DepthNet, DepthNetConfig, DepthOutput};
pub use error::InferenceError;
pub use options::InferenceOptions;
pub use prediction::Prediction;

use burn::tensor::backend::Backend;

/// Model collaborator contract: one forward call per batch, read-only.
pub trait DepthEstimator<B: Backend>: Clone + Send {
    /// Run a forward pass and return one prediction per batch entry, in batch order.
    fn infer(
        &self,
        batch: MvsBatch<B>,
        opts: &InferenceOptions,
    ) -> Result<Vec<Prediction>, InferenceError>;

    /// Copy of this estimator whose parameters live on `device`.
    fn replicate_to(self, device: &B::Device) -> Self;
}

pub mod prelude {
    pub use super::{
        DepthEstimator, DepthNet, DepthNetConfig, DepthOutput, InferenceError, InferenceOptions,
        MvsBatch, Prediction,
    };
}
