use clap::Args;
use std::path::PathBuf;

/// Evaluation run arguments shared by the `eval` binary and its harness tests.
#[derive(Debug, Clone, Args)]
pub struct EvalArgs {
    /// Path to the TOML run configuration.
    #[arg(long = "cfg", value_name = "FILE")]
    pub config_file: PathBuf,
    /// Run on the host even when accelerators are visible.
    #[arg(long, default_value_t = false)]
    pub cpu: bool,
    /// Configuration overrides as alternating `dotted.key value` pairs.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub opts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOpts {
    pub config_file: PathBuf,
    pub cpu: bool,
    pub overrides: Vec<String>,
}

impl EvalOpts {
    pub fn new(config_file: impl Into<PathBuf>, cpu: bool, overrides: Vec<String>) -> Self {
        Self {
            config_file: config_file.into(),
            cpu,
            overrides,
        }
    }
}

impl From<&EvalArgs> for EvalOpts {
    fn from(args: &EvalArgs) -> Self {
        EvalOpts::new(args.config_file.clone(), args.cpu, args.opts.clone())
    }
}

/// Inputs of the depth visualizer: one routed artifact set.
#[derive(Debug, Clone, Args)]
pub struct VisualizeArgs {
    /// Reference image written next to the depth map.
    #[arg(long)]
    pub image: PathBuf,
    /// Depth map (PFM).
    #[arg(long)]
    pub depth: PathBuf,
    /// Point cloud (XYZ text).
    #[arg(long)]
    pub points: PathBuf,
    /// Where rendered figures go (defaults to "<depth dir>/viz").
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    /// Upper bound on scattered points; larger clouds are stride-subsampled.
    #[arg(long, default_value_t = 20_000)]
    pub max_points: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizeOpts {
    pub image: PathBuf,
    pub depth: PathBuf,
    pub points: PathBuf,
    pub out_dir: PathBuf,
    pub max_points: usize,
}

impl VisualizeOpts {
    /// Default figure directory sits beside the artifacts, never on top of them.
    pub fn default_out_dir(depth: &std::path::Path) -> PathBuf {
        depth
            .parent()
            .map(|p| p.join("viz"))
            .unwrap_or_else(|| PathBuf::from("viz"))
    }
}

impl From<&VisualizeArgs> for VisualizeOpts {
    fn from(args: &VisualizeArgs) -> Self {
        VisualizeOpts {
            image: args.image.clone(),
            depth: args.depth.clone(),
            points: args.points.clone(),
            out_dir: args
                .out_dir
                .clone()
                .unwrap_or_else(|| VisualizeOpts::default_out_dir(&args.depth)),
            max_points: args.max_points.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct EvalCli {
        #[command(flatten)]
        args: EvalArgs,
    }

    #[derive(Parser)]
    struct VizCli {
        #[command(flatten)]
        args: VisualizeArgs,
    }

    #[test]
    fn eval_args_collect_trailing_overrides() {
        let cli = EvalCli::parse_from([
            "eval",
            "--cfg",
            "configs/dtu.toml",
            "--cpu",
            "test.weight",
            "@/model_010.bin",
        ]);
        let opts = EvalOpts::from(&cli.args);
        assert!(opts.cpu);
        assert_eq!(opts.config_file, PathBuf::from("configs/dtu.toml"));
        assert_eq!(opts.overrides, vec!["test.weight", "@/model_010.bin"]);
    }

    #[test]
    fn eval_args_require_config() {
        assert!(EvalCli::try_parse_from(["eval", "--cpu"]).is_err());
    }

    #[test]
    fn visualize_defaults_out_dir_beside_depth() {
        let cli = VizCli::parse_from([
            "show_depth",
            "--image",
            "a/00000000.jpg",
            "--depth",
            "a/00000000_init.pfm",
            "--points",
            "a/00000000_flow2pts.xyz",
        ]);
        let opts = VisualizeOpts::from(&cli.args);
        assert_eq!(opts.out_dir, PathBuf::from("a/viz"));
        assert_eq!(opts.max_points, 20_000);
    }
}
