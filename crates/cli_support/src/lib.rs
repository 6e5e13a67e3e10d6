pub mod common;

pub use common::{EvalArgs, EvalOpts, VisualizeArgs, VisualizeOpts};
