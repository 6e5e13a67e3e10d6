mod common;

use common::{config_file, dtu_root, save_weights};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn eval_bin(config: &Path, overrides: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_eval"))
        .arg("--cfg")
        .arg(config)
        .arg("--cpu")
        .args(overrides)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to spawn eval")
}

#[test]
fn full_pass_exits_cleanly_and_logs_progress_to_file() {
    let tmp = tempfile::tempdir().unwrap();
    let data_root = tmp.path().join("dtu");
    dtu_root(&data_root, 1);
    let cfg = config_file(tmp.path(), &data_root);
    let weight = save_weights(&tmp.path().join("weights"), 0);

    let out = eval_bin(&cfg, &["test.weight", weight.to_str().unwrap()]);
    assert!(
        out.status.success(),
        "eval failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let log = fs::read_to_string(tmp.path().join("outputs/run/test.log")).unwrap();
    assert_eq!(log.lines().filter(|l| l.contains(" finished. ")).count(), 1);
    assert!(log.contains("Using CPU"));
}

#[test]
fn resume_with_empty_output_dir_exits_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let data_root = tmp.path().join("dtu");
    dtu_root(&data_root, 1);
    let cfg = config_file(tmp.path(), &data_root);

    let out = eval_bin(&cfg, &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("checkpoint not found"));
}

#[test]
fn batch_size_above_one_exits_non_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let data_root = tmp.path().join("dtu");
    dtu_root(&data_root, 1);
    let cfg = config_file(tmp.path(), &data_root);

    let out = eval_bin(&cfg, &["test.batch_size", "2"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("test.batch_size"));
    assert!(!tmp.path().join("outputs/run/test.log").exists());
}
