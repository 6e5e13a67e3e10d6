use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use data_contracts::{CameraParams, DepthMap, PointCloud};
use inference::{DeviceDispatcher, DeviceMode, DispatchError};
use models::{DepthEstimator, InferenceError, InferenceOptions, MvsBatch, Prediction};

type Backend = NdArray<f32>;

/// Echoes the batch entry's reference path length as a 1x1 depth.
#[derive(Clone)]
struct PathEcho;

impl DepthEstimator<Backend> for PathEcho {
    fn infer(
        &self,
        batch: MvsBatch<Backend>,
        _opts: &InferenceOptions,
    ) -> Result<Vec<Prediction>, InferenceError> {
        let cameras = batch.reference_cameras()?;
        batch
            .ref_img_path
            .iter()
            .zip(cameras)
            .map(|(path, camera)| {
                Ok(Prediction {
                    coarse_depth: DepthMap::new(1, 1, vec![path.len() as f32])?,
                    refined_depths: Vec::new(),
                    point_cloud: PointCloud::default(),
                    camera,
                })
            })
            .collect()
    }

    fn replicate_to(self, _device: &<Backend as burn::tensor::backend::Backend>::Device) -> Self {
        self
    }
}

fn camera() -> CameraParams {
    CameraParams {
        extrinsic: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
        intrinsic: [[4.0, 0.0, 2.0], [0.0, 4.0, 2.0], [0.0, 0.0, 1.0]],
        depth_min: 1.0,
        depth_interval: 0.5,
        depth_num: None,
        depth_max: None,
    }
}

fn batch(paths: &[&str]) -> MvsBatch<Backend> {
    let device = Default::default();
    let (b, v) = (paths.len(), 2);
    let cams: Vec<f32> = (0..b * v).flat_map(|_| camera().pack(4, 1.0)).collect();
    MvsBatch {
        img_list: Tensor::from_data(TensorData::new(vec![0.5f32; b * v * 3 * 4 * 4], [b, v, 3, 4, 4]), &device),
        cam_params_list: Tensor::from_data(TensorData::new(cams, [b, v, 2, 4, 4]), &device),
        ref_img_path: paths.iter().map(|p| p.to_string()).collect(),
    }
}

#[test]
fn multi_replica_gather_keeps_batch_order() {
    let devices = vec![Default::default(), Default::default()];
    let dispatcher =
        DeviceDispatcher::<Backend>::new(DeviceMode::MultiGpu { count: 2 }, devices).unwrap();
    let model = dispatcher.prepare(PathEcho);
    assert_eq!(model.replica_count(), 2);

    let paths = ["a", "bb", "ccc", "dddd"];
    let opts = InferenceOptions::evaluation(vec![0.25], Vec::new());
    let preds = model.infer(dispatcher.place(batch(&paths)), &opts).unwrap();

    let depths: Vec<f32> = preds.iter().map(|p| p.coarse_depth.data[0]).collect();
    assert_eq!(depths, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn cpu_dispatch_runs_single_replica() {
    let dispatcher = DeviceDispatcher::<Backend>::cpu();
    assert!(dispatcher.mode().is_cpu());
    let model = dispatcher.prepare(PathEcho);
    assert_eq!(model.replica_count(), 1);

    let opts = InferenceOptions::evaluation(vec![0.25], Vec::new());
    let preds = model.infer(dispatcher.place(batch(&["xyz"])), &opts).unwrap();
    assert_eq!(preds.len(), 1);
}

#[test]
fn dispatcher_needs_enough_devices() {
    let err = DeviceDispatcher::<Backend>::new(
        DeviceMode::MultiGpu { count: 3 },
        vec![Default::default()],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::DeviceCount {
            needed: 3,
            available: 1,
            ..
        }
    ));
}
