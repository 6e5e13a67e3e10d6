//! Test-set loading for multi-view-stereo evaluation.
//!
//! This crate provides:
//! - Indexing DTU-style test scans from a pair file
//! - Decoding one sample (reference + source views + cameras) at a time
//! - Collation into the `models::MvsBatch` tensor contract
//!
//! Iteration is sequential and unshuffled; every sample is visited exactly once per
//! pass.

pub mod dtu;
pub mod source;
pub mod types;

pub use dtu::{DtuLayout, DtuTestSet};
pub use source::{collate, DataSource};
pub use types::*;
