use data_contracts::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("invalid input batch: {0}")]
    InvalidBatch(String),
    #[error("invalid inference options: {0}")]
    InvalidOptions(String),
    #[error("failed to read tensor data back to host: {0}")]
    Readback(String),
    #[error("prediction assembly failed: {0}")]
    Assembly(#[from] FormatError),
    #[error("replica {index} failed: {msg}")]
    Replica { index: usize, msg: String },
    #[error("{0}")]
    Other(String),
}
