use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File inside the save directory naming the most recent checkpoint.
pub const LAST_CHECKPOINT_FILE: &str = "last_checkpoint";
const CHECKPOINT_EXT: &str = "bin";
/// Placeholder in path templates.
pub const TEMPLATE_TOKEN: char = '@';

/// Replace every placeholder in `template` with `value`.
pub fn resolve_template(template: &str, value: &str) -> String {
    template.replace(TEMPLATE_TOKEN, value)
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint not found: {0}")]
    NotFound(PathBuf),
    #[error("no checkpoint in {0}")]
    NothingToResume(PathBuf),
    #[error("recorder failed for {path}: {msg}")]
    Recorder { path: PathBuf, msg: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid resume state at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CheckpointError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Training progress stored next to the weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub epoch: usize,
    pub iteration: usize,
}

/// Which weights to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointReference {
    /// Exact file; resume state is not restored.
    Explicit(PathBuf),
    /// Most recent checkpoint of the save directory.
    Resume,
}

impl CheckpointReference {
    /// Empty weight string means resume. `@` expands to `output_dir`.
    pub fn from_config(weight: &str, output_dir: &Path) -> Self {
        let weight = weight.trim();
        if weight.is_empty() {
            return CheckpointReference::Resume;
        }
        CheckpointReference::Explicit(PathBuf::from(resolve_template(
            weight,
            &output_dir.to_string_lossy(),
        )))
    }
}

#[derive(Debug)]
pub struct LoadedCheckpoint<M> {
    pub model: M,
    pub path: PathBuf,
    pub resume: Option<ResumeState>,
}

/// Checkpoints of one run: `model_NNN.bin`, a `model_NNN.json` sidecar and a
/// `last_checkpoint` pointer.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    save_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn checkpoint_path(&self, index: usize) -> PathBuf {
        self.save_dir
            .join(format!("model_{index:03}"))
            .with_extension(CHECKPOINT_EXT)
    }

    pub fn save<B: Backend, M: Module<B>>(
        &self,
        model: M,
        index: usize,
        state: ResumeState,
    ) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(&self.save_dir).map_err(|e| CheckpointError::io(&self.save_dir, e))?;
        let path = self.checkpoint_path(index);
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model
            .save_file(path.clone(), &recorder)
            .map_err(|e| CheckpointError::Recorder {
                path: path.clone(),
                msg: e.to_string(),
            })?;

        let sidecar = path.with_extension("json");
        let json = serde_json::to_string_pretty(&state).map_err(|source| CheckpointError::Json {
            path: sidecar.clone(),
            source,
        })?;
        fs::write(&sidecar, json).map_err(|e| CheckpointError::io(&sidecar, e))?;

        let pointer = self.save_dir.join(LAST_CHECKPOINT_FILE);
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        fs::write(&pointer, name.unwrap_or_default())
            .map_err(|e| CheckpointError::io(&pointer, e))?;
        Ok(path)
    }

    /// Most recent checkpoint: the `last_checkpoint` pointer when it resolves,
    /// otherwise the highest-numbered `model_*.bin`.
    pub fn latest(&self) -> Option<PathBuf> {
        let pointer = self.save_dir.join(LAST_CHECKPOINT_FILE);
        if let Ok(raw) = fs::read_to_string(&pointer) {
            let named = PathBuf::from(raw.trim());
            let named = if named.is_relative() {
                self.save_dir.join(named)
            } else {
                named
            };
            if named.is_file() {
                return Some(named);
            }
        }

        let entries = fs::read_dir(&self.save_dir).ok()?;
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                let index = stem.strip_prefix("model_")?.parse::<usize>().ok()?;
                let is_bin = path.extension().and_then(|e| e.to_str()) == Some(CHECKPOINT_EXT);
                is_bin.then_some((index, path))
            })
            .max_by_key(|(index, _)| *index)
            .map(|(_, path)| path)
    }

    fn resume_state(&self, checkpoint: &Path) -> Result<Option<ResumeState>, CheckpointError> {
        let sidecar = checkpoint.with_extension("json");
        if !sidecar.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&sidecar).map_err(|e| CheckpointError::io(&sidecar, e))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CheckpointError::Json {
                path: sidecar,
                source,
            })
    }

    /// Load weights into `model`. Model parameters land on `device`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        model: M,
        reference: &CheckpointReference,
        device: &B::Device,
    ) -> Result<LoadedCheckpoint<M>, CheckpointError> {
        let (path, restore_state) = match reference {
            CheckpointReference::Explicit(path) => match path.extension() {
                None => (path.with_extension(CHECKPOINT_EXT), false),
                Some(ext) if ext == CHECKPOINT_EXT => (path.clone(), false),
                Some(_) => return Err(CheckpointError::NotFound(path.clone())),
            },
            CheckpointReference::Resume => (
                self.latest()
                    .ok_or_else(|| CheckpointError::NothingToResume(self.save_dir.clone()))?,
                true,
            ),
        };
        if !path.is_file() {
            return Err(CheckpointError::NotFound(path));
        }

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let model = model
            .load_file(path.clone(), &recorder, device)
            .map_err(|e| CheckpointError::Recorder {
                path: path.clone(),
                msg: e.to_string(),
            })?;
        let resume = if restore_state {
            self.resume_state(&path)?
        } else {
            None
        };
        Ok(LoadedCheckpoint {
            model,
            path,
            resume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_weight_means_resume() {
        let out = Path::new("outputs/run");
        assert_eq!(
            CheckpointReference::from_config("  ", out),
            CheckpointReference::Resume
        );
        assert_eq!(
            CheckpointReference::from_config("@/model_010.bin", out),
            CheckpointReference::Explicit(PathBuf::from("outputs/run/model_010.bin"))
        );
    }

    #[test]
    fn latest_falls_back_to_highest_index() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["model_002.bin", "model_010.bin", "model_007.bin", "model_011.json"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let store = CheckpointStore::new(tmp.path());
        assert_eq!(store.latest(), Some(tmp.path().join("model_010.bin")));

        fs::write(tmp.path().join(LAST_CHECKPOINT_FILE), "model_002.bin\n").unwrap();
        assert_eq!(store.latest(), Some(tmp.path().join("model_002.bin")));
    }
}
