use crate::dtu::DtuTestSet;
use crate::types::{DatasetError, DatasetResult, Sample};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use models::MvsBatch;

/// Finite, ordered, restartable source of single-sample batches.
pub trait DataSource<B: Backend> {
    /// Number of batches one pass yields.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a fresh pass. Batches are collated on the default (host) device.
    fn batches(&self) -> Box<dyn Iterator<Item = DatasetResult<MvsBatch<B>>> + '_>;
}

impl<B: Backend> DataSource<B> for DtuTestSet {
    fn len(&self) -> usize {
        DtuTestSet::len(self)
    }

    fn batches(&self) -> Box<dyn Iterator<Item = DatasetResult<MvsBatch<B>>> + '_> {
        let cfg = self.config();
        let (planes, interval_scale) = (cfg.num_depth, cfg.interval_scale);
        Box::new((0..DtuTestSet::len(self)).map(move |i| {
            let sample = self.get(i)?;
            collate::<B>(&sample, planes, interval_scale)
        }))
    }
}

/// Collate one sample into a batch of size one, pixels scaled to 0..1 in CHW order.
pub fn collate<B: Backend>(
    sample: &Sample,
    num_depth: usize,
    interval_scale: f32,
) -> DatasetResult<MvsBatch<B>> {
    let first = sample
        .reference()
        .ok_or_else(|| DatasetError::Other("sample has no views".to_string()))?;
    if sample.cameras.len() != sample.images.len() {
        return Err(DatasetError::Other(format!(
            "{} cameras for {} views",
            sample.cameras.len(),
            sample.images.len()
        )));
    }
    let (width, height) = first.dimensions();
    let views = sample.images.len();
    let plane = (width * height) as usize;

    let mut image_buf: Vec<f32> = Vec::with_capacity(views * 3 * plane);
    for img in &sample.images {
        let raw = img.as_raw();
        for c in 0..3 {
            image_buf.extend(raw.iter().skip(c).step_by(3).map(|v| *v as f32 / 255.0));
        }
    }
    let cam_buf: Vec<f32> = sample
        .cameras
        .iter()
        .flat_map(|cam| cam.pack(num_depth, interval_scale))
        .collect();

    let device = &B::Device::default();
    let img_list = Tensor::<B, 5>::from_data(
        TensorData::new(
            image_buf,
            [1, views, 3, height as usize, width as usize],
        ),
        device,
    );
    let cam_params_list =
        Tensor::<B, 5>::from_data(TensorData::new(cam_buf, [1, views, 2, 4, 4]), device);

    Ok(MvsBatch {
        img_list,
        cam_params_list,
        ref_img_path: vec![sample.ref_img_path.to_string_lossy().into_owned()],
    })
}
