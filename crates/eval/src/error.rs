use inference::CheckpointError;
use models::InferenceError;
use mvs_dataset::DatasetError;
use std::path::PathBuf;
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Fatal harness failures. Nothing is retried; each aborts the run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(#[source] CheckpointError),
    #[error("checkpoint load failed: {0}")]
    Checkpoint(#[source] CheckpointError),
    #[error("inference failed on {path}: {source}")]
    Inference {
        path: String,
        #[source]
        source: InferenceError,
    },
    #[error("failed to write artifact {path}: {msg}")]
    ArtifactWrite { path: PathBuf, msg: String },
    #[error("data source failed: {0}")]
    Dataset(#[from] DatasetError),
}

impl From<CheckpointError> for EvalError {
    fn from(err: CheckpointError) -> Self {
        match err {
            CheckpointError::NotFound(_) | CheckpointError::NothingToResume(_) => {
                EvalError::CheckpointNotFound(err)
            }
            other => EvalError::Checkpoint(other),
        }
    }
}

impl EvalError {
    pub fn config(msg: impl Into<String>) -> Self {
        EvalError::Configuration(msg.into())
    }

    pub fn artifact(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        EvalError::ArtifactWrite {
            path: path.into(),
            msg: err.to_string(),
        }
    }
}
