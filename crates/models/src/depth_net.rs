use crate::batch::MvsBatch;
use crate::error::InferenceError;
use crate::geometry::{back_project, depth_hypotheses};
use crate::options::InferenceOptions;
use crate::prediction::Prediction;
use crate::DepthEstimator;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::tensor::activation::{relu, softmax, tanh};
use burn::tensor::backend::Backend;
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};
use burn::tensor::{Tensor, TensorData};
use data_contracts::{CameraParams, DepthMap};

#[derive(Debug, Clone)]
pub struct DepthNetConfig {
    pub base_channels: usize,
    /// Number of fronto-parallel depth hypotheses in the coarse sweep.
    pub num_depth: usize,
}

impl Default for DepthNetConfig {
    fn default() -> Self {
        Self {
            base_channels: 8,
            num_depth: 48,
        }
    }
}

/// Coarse-to-fine depth regressor.
///
/// The coarse stage scores every depth hypothesis from the feature variance across
/// views and takes the probability-weighted depth. Each refinement stage upsamples
/// the current estimate to the next image scale and adds a bounded residual of at
/// most `inter_scale * depth_interval`.
#[derive(Debug, Module)]
pub struct DepthNet<B: Backend> {
    feat1: Conv2d<B>,
    feat2: Conv2d<B>,
    cost_head: Conv2d<B>,
    refine1: Conv2d<B>,
    refine2: Conv2d<B>,
    num_depth: usize,
}

/// Raw tensor outputs of [`DepthNet::forward`].
#[derive(Debug, Clone)]
pub struct DepthOutput<B: Backend> {
    /// `[batch, 1, h0, w0]`.
    pub coarse: Tensor<B, 4>,
    /// `[batch, 1, h_k, w_k]` per refinement stage.
    pub refined: Vec<Tensor<B, 4>>,
}

impl<B: Backend> DepthNet<B> {
    pub fn new(cfg: DepthNetConfig, device: &B::Device) -> Self {
        let c = cfg.base_channels.max(1);
        let conv = |input: usize, output: usize| {
            Conv2dConfig::new([input, output], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        Self {
            feat1: conv(3, c),
            feat2: conv(c, c),
            cost_head: conv(c, cfg.num_depth.max(2)),
            refine1: conv(c + 1, c),
            refine2: conv(c, 1),
            num_depth: cfg.num_depth.max(2),
        }
    }

    pub fn num_depth(&self) -> usize {
        self.num_depth
    }

    fn features(&self, image: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.feat1.forward(image));
        relu(self.feat2.forward(x))
    }

    pub fn forward(
        &self,
        batch: &MvsBatch<B>,
        opts: &InferenceOptions,
    ) -> Result<DepthOutput<B>, InferenceError> {
        opts.validate()?;
        batch.validate()?;
        let [b, v, _, h, w] = batch.img_list.dims();
        let device = batch.img_list.device();

        let ranges = depth_ranges(batch)?;
        let planes = self.num_depth;
        let mut hyp = Vec::with_capacity(b * planes);
        let mut lo = Vec::with_capacity(b);
        let mut span = Vec::with_capacity(b);
        let mut step = Vec::with_capacity(b);
        for range in &ranges {
            hyp.extend(depth_hypotheses(range.min, range.max, planes));
            lo.push(range.min);
            span.push((range.max - range.min).max(f32::EPSILON));
            step.push(range.interval);
        }
        let per_entry = |values: Vec<f32>| {
            Tensor::<B, 4>::from_data(TensorData::new(values, [b, 1, 1, 1]), &device)
        };
        let hyp = Tensor::<B, 4>::from_data(TensorData::new(hyp, [b, planes, 1, 1]), &device);
        let (lo, span, step) = (per_entry(lo), per_entry(span), per_entry(step));

        // Coarse sweep: variance of per-view features scores each hypothesis.
        let (ch, cw) = scaled_size(h, w, opts.image_scales[0]);
        let mut sum: Option<Tensor<B, 4>> = None;
        let mut sq_sum: Option<Tensor<B, 4>> = None;
        for view in 0..v {
            let image = batch.img_list.clone().narrow(1, view, 1).reshape([b, 3, h, w]);
            let feat = self.features(resize(image, ch, cw));
            let sq = feat.clone() * feat.clone();
            sum = Some(match sum {
                Some(acc) => acc + feat,
                None => feat,
            });
            sq_sum = Some(match sq_sum {
                Some(acc) => acc + sq,
                None => sq,
            });
        }
        let (sum, sq_sum) = match (sum, sq_sum) {
            (Some(s), Some(q)) => (s, q),
            _ => return Err(InferenceError::InvalidBatch("no views".to_string())),
        };
        let mean = sum.div_scalar(v as f32);
        let variance = sq_sum.div_scalar(v as f32) - mean.clone() * mean;

        let prob = softmax(self.cost_head.forward(variance), 1);
        let coarse = (prob * hyp.expand([b, planes, ch, cw])).sum_dim(1);

        let mut refined = Vec::with_capacity(opts.refine_stages());
        if opts.refine {
            let reference = batch.img_list.clone().narrow(1, 0, 1).reshape([b, 3, h, w]);
            let mut depth = coarse.clone();
            for (stage, scale) in opts.image_scales.iter().enumerate().skip(1) {
                let (sh, sw) = scaled_size(h, w, *scale);
                let up = resize(depth, sh, sw);
                let feat = self.features(resize(reference.clone(), sh, sw));
                let normalized = (up.clone() - lo.clone().expand([b, 1, sh, sw]))
                    / span.clone().expand([b, 1, sh, sw]);
                let x = Tensor::cat(vec![feat, normalized], 1);
                let delta = tanh(self.refine2.forward(relu(self.refine1.forward(x))));
                let limit = step.clone().mul_scalar(opts.inter_scales[stage - 1]);
                depth = up + delta * limit.expand([b, 1, sh, sw]);
                refined.push(depth.clone());
            }
        }

        Ok(DepthOutput { coarse, refined })
    }
}

impl<B: Backend> DepthOutput<B> {
    /// Pull the depth maps back to the host and derive point clouds.
    ///
    /// `cameras` are the full-resolution reference cameras, one per batch entry, and
    /// `image_size` is the full-resolution `(width, height)`.
    pub fn into_predictions(
        self,
        cameras: &[CameraParams],
        image_size: (usize, usize),
    ) -> Result<Vec<Prediction>, InferenceError> {
        let coarse = host_maps(self.coarse)?;
        let refined = self
            .refined
            .into_iter()
            .map(host_maps)
            .collect::<Result<Vec<_>, _>>()?;
        if coarse.len() != cameras.len() {
            return Err(InferenceError::InvalidBatch(format!(
                "{} cameras for {} depth maps",
                cameras.len(),
                coarse.len()
            )));
        }

        let (img_w, img_h) = image_size;
        let mut out = Vec::with_capacity(coarse.len());
        for (i, (coarse_depth, camera)) in coarse.into_iter().zip(cameras).enumerate() {
            let refined_depths: Vec<DepthMap> =
                refined.iter().map(|stage| stage[i].clone()).collect();
            let last = refined_depths.last().unwrap_or(&coarse_depth);
            let camera = camera.scaled(
                last.width as f32 / img_w.max(1) as f32,
                last.height as f32 / img_h.max(1) as f32,
            );
            let point_cloud = back_project(last, &camera);
            out.push(Prediction {
                coarse_depth,
                refined_depths,
                point_cloud,
                camera,
            });
        }
        Ok(out)
    }
}

impl<B: Backend> DepthEstimator<B> for DepthNet<B> {
    fn infer(
        &self,
        batch: MvsBatch<B>,
        opts: &InferenceOptions,
    ) -> Result<Vec<Prediction>, InferenceError> {
        let output = self.forward(&batch, opts)?;
        let cameras = batch.reference_cameras()?;
        output.into_predictions(&cameras, batch.image_size())
    }

    fn replicate_to(self, device: &B::Device) -> Self {
        self.fork(device)
    }
}

struct DepthRange {
    min: f32,
    max: f32,
    interval: f32,
}

fn depth_ranges<B: Backend>(batch: &MvsBatch<B>) -> Result<Vec<DepthRange>, InferenceError> {
    let b = batch.batch_size();
    // Reference view, intrinsic slot, last row: [min, interval, planes, max].
    let values = batch
        .cam_params_list
        .clone()
        .narrow(1, 0, 1)
        .narrow(2, 1, 1)
        .narrow(3, 3, 1)
        .reshape([b, 4])
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| InferenceError::Readback(format!("{e:?}")))?;
    values
        .chunks_exact(4)
        .map(|row| {
            let (min, interval, max) = (row[0], row[1], row[3]);
            if !(min.is_finite() && max.is_finite()) || max <= min {
                return Err(InferenceError::InvalidBatch(format!(
                    "invalid depth range [{min}, {max}]"
                )));
            }
            Ok(DepthRange { min, max, interval })
        })
        .collect()
}

fn host_maps<B: Backend>(depth: Tensor<B, 4>) -> Result<Vec<DepthMap>, InferenceError> {
    let [b, _, h, w] = depth.dims();
    let values = depth
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| InferenceError::Readback(format!("{e:?}")))?;
    values
        .chunks_exact(h * w)
        .take(b)
        .map(|chunk| DepthMap::new(w, h, chunk.to_vec()).map_err(InferenceError::from))
        .collect()
}

fn scaled_size(h: usize, w: usize, scale: f32) -> (usize, usize) {
    let s = |v: usize| ((v as f32 * scale).round() as usize).max(1);
    (s(h), s(w))
}

fn resize<B: Backend>(x: Tensor<B, 4>, h: usize, w: usize) -> Tensor<B, 4> {
    let [_, _, xh, xw] = x.dims();
    if xh == h && xw == w {
        return x;
    }
    interpolate(
        x,
        [h, w],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_size_never_collapses() {
        assert_eq!(scaled_size(128, 160, 0.25), (32, 40));
        assert_eq!(scaled_size(2, 2, 0.125), (1, 1));
    }
}
