//! Layered run configuration: built-in defaults, then the TOML file, then
//! command-line `dotted.key value` overrides.

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use toml::{Table, Value};

pub use inference::{resolve_template, TEMPLATE_TOKEN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub output_dir: String,
    pub model: ModelSection,
    pub data: DataSection,
    pub test: TestSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    pub num_depth: usize,
    pub base_channels: usize,
    pub test: ModelTestSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelTestSection {
    pub img_scales: Vec<f64>,
    pub inter_scales: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSection {
    pub test: DataTestSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataTestSection {
    pub root_dir: String,
    pub scans: Vec<String>,
    pub num_view: usize,
    pub interval_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestSection {
    /// Explicit weight file; empty resumes the latest checkpoint.
    pub weight: String,
    pub batch_size: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            output_dir: TEMPLATE_TOKEN.to_string(),
            model: ModelSection::default(),
            data: DataSection::default(),
            test: TestSection::default(),
        }
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            num_depth: 48,
            base_channels: 8,
            test: ModelTestSection::default(),
        }
    }
}

impl Default for ModelTestSection {
    fn default() -> Self {
        Self {
            img_scales: vec![0.125, 0.25],
            inter_scales: vec![0.75, 0.375],
        }
    }
}

impl Default for DataTestSection {
    fn default() -> Self {
        Self {
            root_dir: String::new(),
            scans: Vec::new(),
            num_view: 3,
            interval_scale: 1.6,
        }
    }
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            weight: String::new(),
            batch_size: 1,
        }
    }
}

impl EvalConfig {
    /// Resolve defaults, the file at `path` and `overrides`, then validate.
    pub fn load(path: &Path, overrides: &[String]) -> EvalResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EvalError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw, overrides)
    }

    pub fn from_toml_str(raw: &str, overrides: &[String]) -> EvalResult<Self> {
        let mut tree = Value::try_from(EvalConfig::default())
            .map_err(|e| EvalError::config(format!("default config: {e}")))?;
        let file: Table = toml::from_str(raw)
            .map_err(|e| EvalError::config(format!("invalid TOML: {e}")))?;
        merge_table(&mut tree, file, "")?;
        apply_overrides(&mut tree, overrides)?;
        let cfg: EvalConfig = tree
            .try_into()
            .map_err(|e: toml::de::Error| EvalError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EvalResult<()> {
        if self.output_dir.trim().is_empty() {
            return Err(EvalError::config("output_dir is empty"));
        }
        if self.test.batch_size != 1 {
            return Err(EvalError::config(format!(
                "test.batch_size must be 1, got {}",
                self.test.batch_size
            )));
        }
        let scales = &self.model.test;
        if scales.img_scales.is_empty() {
            return Err(EvalError::config("model.test.img_scales is empty"));
        }
        if scales
            .img_scales
            .iter()
            .chain(&scales.inter_scales)
            .any(|s| !(s.is_finite() && *s > 0.0))
        {
            return Err(EvalError::config("scale schedules must be positive"));
        }
        if scales.inter_scales.len() + 1 < scales.img_scales.len() {
            return Err(EvalError::config(format!(
                "{} image scales need at least {} inter scales",
                scales.img_scales.len(),
                scales.img_scales.len() - 1
            )));
        }
        let data = &self.data.test;
        if data.root_dir.trim().is_empty() {
            return Err(EvalError::config("data.test.root_dir is required"));
        }
        if data.scans.is_empty() {
            return Err(EvalError::config("data.test.scans is empty"));
        }
        if data.num_view < 2 {
            return Err(EvalError::config("data.test.num_view must be at least 2"));
        }
        if self.model.num_depth < 2 {
            return Err(EvalError::config("model.num_depth must be at least 2"));
        }
        Ok(())
    }

    /// Render back to TOML for the startup log.
    pub fn render(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|e| format!("<unrenderable config: {e}>"))
    }

    pub fn image_scales(&self) -> Vec<f32> {
        self.model.test.img_scales.iter().map(|s| *s as f32).collect()
    }

    pub fn inter_scales(&self) -> Vec<f32> {
        self.model.test.inter_scales.iter().map(|s| *s as f32).collect()
    }
}

/// Config path without extension, its `configs` segments renamed to `outputs`.
pub fn output_root_for(config_file: &Path) -> PathBuf {
    config_file
        .with_extension("")
        .components()
        .map(|c| match c {
            Component::Normal(seg) if seg == "configs" => Component::Normal(OsStr::new("outputs")),
            other => other,
        })
        .collect()
}

/// Output directory for a run described by `config_file`.
pub fn resolve_output_dir(template: &str, config_file: &Path) -> PathBuf {
    let root = output_root_for(config_file);
    PathBuf::from(resolve_template(template, &root.to_string_lossy()))
}

fn merge_table(dst: &mut Value, src: Table, prefix: &str) -> EvalResult<()> {
    let Value::Table(dst) = dst else {
        return Err(EvalError::config(format!("{prefix} is not a table")));
    };
    for (key, value) in src {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let Some(slot) = dst.get_mut(&key) else {
            return Err(EvalError::config(format!("unknown key {full}")));
        };
        match (slot.is_table(), value) {
            (true, Value::Table(inner)) => merge_table(slot, inner, &full)?,
            (true, _) => return Err(EvalError::config(format!("{full} must be a table"))),
            (false, value) => *slot = value,
        }
    }
    Ok(())
}

fn apply_overrides(tree: &mut Value, overrides: &[String]) -> EvalResult<()> {
    if overrides.len() % 2 != 0 {
        return Err(EvalError::config(format!(
            "overrides must be key/value pairs, got {} items",
            overrides.len()
        )));
    }
    for pair in overrides.chunks_exact(2) {
        let (key, raw) = (&pair[0], &pair[1]);
        let mut slot = &mut *tree;
        for part in key.split('.') {
            slot = match slot {
                Value::Table(table) => table
                    .get_mut(part)
                    .ok_or_else(|| EvalError::config(format!("unknown key {key}")))?,
                _ => return Err(EvalError::config(format!("unknown key {key}"))),
            };
        }
        if slot.is_table() {
            return Err(EvalError::config(format!("{key} is a section, not a value")));
        }
        *slot = parse_literal(raw);
    }
    Ok(())
}

/// TOML literal when it parses as one, plain string otherwise.
fn parse_literal(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[data.test]
root_dir = "/data/dtu"
scans = ["scan1"]
"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = EvalConfig::from_toml_str(MINIMAL, &[]).unwrap();
        assert_eq!(cfg.output_dir, "@");
        assert_eq!(cfg.model.num_depth, 48);
        assert_eq!(cfg.image_scales(), vec![0.125, 0.25]);
        assert_eq!(cfg.data.test.num_view, 3);
        assert!(cfg.test.weight.is_empty());
    }

    #[test]
    fn overrides_win_over_file() {
        let overrides: Vec<String> = ["test.weight", "@/model_010", "model.test.img_scales", "[0.25, 0.5]"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cfg = EvalConfig::from_toml_str(MINIMAL, &overrides).unwrap();
        assert_eq!(cfg.test.weight, "@/model_010");
        assert_eq!(cfg.image_scales(), vec![0.25, 0.5]);
    }

    #[test]
    fn odd_override_list_is_rejected() {
        let err = EvalConfig::from_toml_str(MINIMAL, &["test.weight".to_string()]).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EvalConfig::from_toml_str(MINIMAL, &["test.nope".into(), "1".into()]).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)));

        let raw = format!("{MINIMAL}\n[solver]\nlr = 1.0\n");
        assert!(EvalConfig::from_toml_str(&raw, &[]).is_err());
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let err = EvalConfig::from_toml_str("", &[]).unwrap_err();
        assert!(err.to_string().contains("root_dir"));
    }

    #[test]
    fn template_substitutes_every_token() {
        assert_eq!(resolve_template("@/model_@", "out"), "out/model_out");
        assert_eq!(resolve_template("weights.bin", "out"), "weights.bin");
    }

    #[test]
    fn output_dir_follows_config_identity() {
        let dir = resolve_output_dir("@", Path::new("configs/dtu/fast.toml"));
        assert_eq!(dir, PathBuf::from("outputs/dtu/fast"));
        let dir = resolve_output_dir("@_v2", Path::new("/abs/configs/run.toml"));
        assert_eq!(dir, PathBuf::from("/abs/outputs/run_v2"));
    }

    #[test]
    fn rendered_config_parses_back() {
        let cfg = EvalConfig::from_toml_str(MINIMAL, &[]).unwrap();
        let again = EvalConfig::from_toml_str(&cfg.render(), &[]).unwrap();
        assert_eq!(cfg, again);
    }
}
