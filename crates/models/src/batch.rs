use crate::error::InferenceError;
use burn::tensor::{backend::Backend, Tensor};
use data_contracts::CameraParams;

/// Collated network input. Tensor fields follow the device they are moved to;
/// `ref_img_path` is host data and never moves.
#[derive(Debug, Clone)]
pub struct MvsBatch<B: Backend> {
    /// `[batch, views, 3, H, W]`, reference view first, values in 0..1.
    pub img_list: Tensor<B, 5>,
    /// `[batch, views, 2, 4, 4]`, see [`CameraParams::pack`].
    pub cam_params_list: Tensor<B, 5>,
    /// Identifying path of each entry's reference image.
    pub ref_img_path: Vec<String>,
}

impl<B: Backend> MvsBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.img_list.dims()[0]
    }

    pub fn num_views(&self) -> usize {
        self.img_list.dims()[1]
    }

    /// `(width, height)` of the full-resolution views.
    pub fn image_size(&self) -> (usize, usize) {
        let dims = self.img_list.dims();
        (dims[4], dims[3])
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        let [b, v, c, h, w] = self.img_list.dims();
        let cams = self.cam_params_list.dims();
        if b == 0 {
            return Err(InferenceError::InvalidBatch("empty batch".to_string()));
        }
        if c != 3 {
            return Err(InferenceError::InvalidBatch(format!(
                "expected 3-channel views, got {c}"
            )));
        }
        if v < 2 {
            return Err(InferenceError::InvalidBatch(format!(
                "need a reference and at least one source view, got {v} views"
            )));
        }
        if h == 0 || w == 0 {
            return Err(InferenceError::InvalidBatch(format!(
                "degenerate image size {w}x{h}"
            )));
        }
        if cams != [b, v, 2, 4, 4] {
            return Err(InferenceError::InvalidBatch(format!(
                "camera tensor shape {cams:?} does not match {:?}",
                [b, v, 2, 4, 4]
            )));
        }
        if self.ref_img_path.len() != b {
            return Err(InferenceError::InvalidBatch(format!(
                "{} paths for {b} batch entries",
                self.ref_img_path.len()
            )));
        }
        Ok(())
    }

    /// Move every tensor field to `device`; the path list passes through untouched.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            img_list: self.img_list.to_device(device),
            cam_params_list: self.cam_params_list.to_device(device),
            ref_img_path: self.ref_img_path,
        }
    }

    /// Split along the batch axis into at most `parts` contiguous, non-empty chunks.
    pub fn split(self, parts: usize) -> Vec<Self> {
        let total = self.batch_size();
        let parts = parts.clamp(1, total.max(1));
        let base = total / parts;
        let extra = total % parts;
        let mut out = Vec::with_capacity(parts);
        let mut start = 0;
        for i in 0..parts {
            let len = base + usize::from(i < extra);
            if len == 0 {
                continue;
            }
            out.push(Self {
                img_list: self.img_list.clone().narrow(0, start, len),
                cam_params_list: self.cam_params_list.clone().narrow(0, start, len),
                ref_img_path: self.ref_img_path[start..start + len].to_vec(),
            });
            start += len;
        }
        out
    }

    /// Reference-view camera of each batch entry.
    pub fn reference_cameras(&self) -> Result<Vec<CameraParams>, InferenceError> {
        let [b, v, ..] = self.cam_params_list.dims();
        let values = self
            .cam_params_list
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| InferenceError::Readback(format!("{e:?}")))?;
        let stride = v * 32;
        (0..b)
            .map(|i| {
                CameraParams::unpack(&values[i * stride..i * stride + 32])
                    .map_err(InferenceError::from)
            })
            .collect()
    }
}
