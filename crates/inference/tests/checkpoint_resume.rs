use burn::module::Module;
use burn_ndarray::NdArray;
use inference::{CheckpointError, CheckpointReference, CheckpointStore, ResumeState};
use models::{DepthNet, DepthNetConfig};

type Backend = NdArray<f32>;

fn small_net(device: &<Backend as burn::tensor::backend::Backend>::Device) -> DepthNet<Backend> {
    DepthNet::new(
        DepthNetConfig {
            base_channels: 2,
            num_depth: 4,
        },
        device,
    )
}

#[test]
fn resume_loads_latest_with_state() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path());

    store
        .save(small_net(&device), 3, ResumeState { epoch: 3, iteration: 300 })
        .unwrap();
    let newest = store
        .save(small_net(&device), 4, ResumeState { epoch: 4, iteration: 400 })
        .unwrap();

    let loaded = store
        .load(small_net(&device), &CheckpointReference::Resume, &device)
        .unwrap();
    assert_eq!(loaded.path, newest);
    assert_eq!(loaded.resume, Some(ResumeState { epoch: 4, iteration: 400 }));
    assert_eq!(loaded.model.num_depth(), 4);
}

#[test]
fn explicit_weight_skips_resume_state() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path());
    let older = store
        .save(small_net(&device), 1, ResumeState { epoch: 1, iteration: 10 })
        .unwrap();
    store
        .save(small_net(&device), 2, ResumeState { epoch: 2, iteration: 20 })
        .unwrap();

    let reference = CheckpointReference::from_config("@/model_001.bin", tmp.path());
    let loaded = store.load(small_net(&device), &reference, &device).unwrap();
    assert_eq!(loaded.path, older);
    assert!(loaded.resume.is_none());
}

#[test]
fn explicit_missing_weight_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path());
    let reference = CheckpointReference::Explicit(tmp.path().join("nope.bin"));
    let err = store
        .load(small_net(&device), &reference, &device)
        .unwrap_err();
    assert!(matches!(err, CheckpointError::NotFound(_)));
}

#[test]
fn explicit_weight_extension_is_not_rewritten() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path());
    let saved = store
        .save(small_net(&device), 1, ResumeState { epoch: 1, iteration: 10 })
        .unwrap();
    std::fs::copy(&saved, tmp.path().join("best.bin")).unwrap();

    let bare = CheckpointReference::Explicit(tmp.path().join("model_001"));
    let loaded = store.load(small_net(&device), &bare, &device).unwrap();
    assert_eq!(loaded.path, saved);

    let foreign = CheckpointReference::Explicit(tmp.path().join("best.ckpt"));
    let err = store
        .load(small_net(&device), &foreign, &device)
        .unwrap_err();
    assert!(matches!(err, CheckpointError::NotFound(p) if p.ends_with("best.ckpt")));
}

#[test]
fn resume_on_empty_dir_reports_nothing_to_resume() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path().join("never_written"));
    let err = store
        .load(small_net(&device), &CheckpointReference::Resume, &device)
        .unwrap_err();
    assert!(matches!(err, CheckpointError::NothingToResume(_)));
}

#[test]
fn loaded_weights_match_saved_weights() {
    let tmp = tempfile::tempdir().unwrap();
    let device = Default::default();
    let store = CheckpointStore::new(tmp.path());
    let saved = small_net(&device);
    store
        .save(saved.clone(), 0, ResumeState::default())
        .unwrap();

    let loaded = store
        .load(small_net(&device), &CheckpointReference::Resume, &device)
        .unwrap()
        .model;
    assert_eq!(saved.num_params(), loaded.num_params());
}
