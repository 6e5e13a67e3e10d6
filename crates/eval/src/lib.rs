//! Evaluation harness for multi-view-stereo depth models.
//!
//! A run goes: [`RunContext::build`] (config layering, device mode, output dir) →
//! [`runner::restore_model`] (explicit weights or resume) → [`runner::evaluate`]
//! (device placement, one pass over the test set, artifact routing).
//!
//! Components receive a [`LogContext`] and a `DeviceDispatcher` explicitly; there is
//! no process-wide logger or current device.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod runner;

pub use config::{resolve_output_dir, resolve_template, EvalConfig};
pub use context::RunContext;
pub use error::{EvalError, EvalResult};
pub use logging::{install_loggers, LogContext};
pub use metrics::{MetricLogger, SmoothedValue};
pub use router::{ArtifactLayout, ResultRouter, RoutedArtifact};
pub use runner::{announce, evaluate, restore_model, run, test_model, EvalReport};
