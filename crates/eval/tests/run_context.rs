mod common;

use common::*;
use eval::{restore_model, EvalError, LogContext, RunContext};
use inference::DeviceMode;

#[test]
fn building_twice_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("dtu");
    dtu_root(&data, 1);
    let cfg = config_file(tmp.path(), &data);

    let first = RunContext::build(&opts(&cfg, &[]), 0).unwrap();
    let second = RunContext::build(&opts(&cfg, &[]), 0).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.output_dir(), tmp.path().join("outputs").join("run"));
    assert!(first.output_dir().is_dir());
    assert_eq!(first.image_scales(), &[0.25, 0.5]);
    assert_eq!(first.inter_scales(), &[0.75]);
    assert_eq!(first.batch_size(), 1);
    assert_eq!(first.device_mode(), DeviceMode::Cpu);
}

#[test]
fn batch_size_other_than_one_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config_file(tmp.path(), &tmp.path().join("dtu"));
    for size in ["0", "2", "8"] {
        let err = RunContext::build(&opts(&cfg, &["test.batch_size", size]), 0).unwrap_err();
        assert!(matches!(err, EvalError::Configuration(_)), "{err}");
    }
    assert!(!tmp.path().join("outputs").exists());
}

#[test]
fn accelerator_mode_without_devices_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config_file(tmp.path(), &tmp.path().join("dtu"));
    let mut gpu_opts = opts(&cfg, &[]);
    gpu_opts.cpu = false;

    let err = RunContext::build(&gpu_opts, 0).unwrap_err();
    assert!(matches!(err, EvalError::Configuration(_)));

    let ctx = RunContext::build(&gpu_opts, 2).unwrap();
    assert_eq!(ctx.device_mode(), DeviceMode::MultiGpu { count: 2 });
}

#[test]
fn explicit_weight_wins_over_resumable_checkpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config_file(tmp.path(), &tmp.path().join("dtu"));
    let resumable = tmp.path().join("outputs").join("run");
    save_weights(&resumable, 7);
    let explicit = save_weights(&tmp.path().join("weights"), 1);

    let ctx = RunContext::build(&opts(&cfg, &["test.weight", explicit.to_str().unwrap()]), 0)
        .unwrap();
    let log = LogContext::capturing("run");
    restore_model::<Backend, _>(&ctx, fresh_net(), &Default::default(), &log).unwrap();

    let lines = log.captured();
    assert!(lines
        .iter()
        .any(|l| l == &format!("Loaded checkpoint {}", explicit.display())));
    assert!(!lines.iter().any(|l| l.starts_with("Resumed at")));
}

#[test]
fn weight_template_expands_to_output_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config_file(tmp.path(), &tmp.path().join("dtu"));
    let out = tmp.path().join("outputs").join("run");
    let saved = save_weights(&out, 3);

    let ctx = RunContext::build(&opts(&cfg, &["test.weight", "@/model_003"]), 0).unwrap();
    let log = LogContext::capturing("run");
    restore_model::<Backend, _>(&ctx, fresh_net(), &Default::default(), &log).unwrap();
    assert!(log
        .captured()
        .contains(&format!("Loaded checkpoint {}", saved.display())));
}

#[test]
fn resume_restores_counters() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config_file(tmp.path(), &tmp.path().join("dtu"));
    save_weights(&tmp.path().join("outputs").join("run"), 4);

    let ctx = RunContext::build(&opts(&cfg, &[]), 0).unwrap();
    let log = LogContext::capturing("run");
    restore_model::<Backend, _>(&ctx, fresh_net(), &Default::default(), &log).unwrap();
    assert!(log
        .captured()
        .contains(&"Resumed at epoch 4 iteration 400".to_string()));
}
