//! The evaluation pass: restore weights, place the model, run every sample once,
//! route each prediction to disk.

use crate::context::RunContext;
use crate::error::{EvalError, EvalResult};
use crate::logging::LogContext;
use crate::metrics::MetricLogger;
use crate::router::{ResultRouter, RoutedArtifact};
use burn::module::Module;
use burn::tensor::backend::Backend;
use cli_support::EvalOpts;
use image::{Rgb, RgbImage};
use inference::{CheckpointStore, DeviceDispatcher, DispatchedModel};
use models::{DepthEstimator, DepthNet, InferenceError, InferenceOptions, MvsBatch};
use mvs_dataset::{DataSource, DtuTestSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Sample paths in processing order.
    pub processed: Vec<String>,
    pub artifacts: Vec<RoutedArtifact>,
    pub forward_time: Duration,
}

/// Startup lines: device mode, arguments, configuration source and content.
pub fn announce(ctx: &RunContext, opts: &EvalOpts, log: &LogContext) {
    log.info(ctx.device_mode());
    log.info(format_args!("{opts:?}"));
    log.info(format_args!(
        "Loaded configuration file {}",
        ctx.config_file().display()
    ));
    log.info(format_args!("Running with config:\n{}", ctx.config().render()));
}

/// Load the weights the run context points at: the explicit weight file when set,
/// otherwise the latest checkpoint of the output directory.
pub fn restore_model<B: Backend, M: Module<B>>(
    ctx: &RunContext,
    model: M,
    device: &B::Device,
    log: &LogContext,
) -> EvalResult<M> {
    let store = CheckpointStore::new(ctx.output_dir());
    let loaded = store.load::<B, M>(model, &ctx.checkpoint_reference(), device)?;
    log.info(format_args!("Loaded checkpoint {}", loaded.path.display()));
    if let Some(state) = loaded.resume {
        log.info(format_args!(
            "Resumed at epoch {} iteration {}",
            state.epoch, state.iteration
        ));
    }
    Ok(loaded.model)
}

/// Place a restored estimator and run one full pass over `source`.
pub fn evaluate<B, M, D>(
    ctx: &RunContext,
    model: M,
    dispatcher: &DeviceDispatcher<B>,
    source: &D,
    log: &LogContext,
) -> EvalResult<EvalReport>
where
    B: Backend,
    M: DepthEstimator<B>,
    D: DataSource<B>,
{
    let model = dispatcher.prepare(model);
    let router = ResultRouter::for_output_dir(ctx.output_dir())?;
    let opts = ctx.inference_options();

    let start = Instant::now();
    let mut report = test_model(&model, dispatcher, source, &opts, &router, log)?;
    report.forward_time = start.elapsed();
    log.info(format_args!(
        "Test forward time: {:.2}s",
        report.forward_time.as_secs_f64()
    ));
    Ok(report)
}

/// Whole run with the bundled `DepthNet` and the DTU test set.
pub fn run<B: Backend>(
    ctx: &RunContext,
    devices: Vec<B::Device>,
    log: &LogContext,
) -> EvalResult<EvalReport> {
    let dispatcher = DeviceDispatcher::<B>::new(ctx.device_mode(), devices)
        .map_err(|e| EvalError::config(e.to_string()))?;
    let model = DepthNet::<B>::new(ctx.model_config(), dispatcher.primary());
    let model = restore_model(ctx, model, dispatcher.primary(), log)?;

    let test_set = DtuTestSet::new(ctx.test_set_config())?;
    log.info(format_args!("Test set: {} samples", test_set.len()));
    evaluate(ctx, model, &dispatcher, &test_set, log)
}

/// Single read-only pass: data time, placement, forward, timing, progress line,
/// routing. The first failure aborts the pass.
pub fn test_model<B, M, D>(
    model: &DispatchedModel<B, M>,
    dispatcher: &DeviceDispatcher<B>,
    source: &D,
    opts: &InferenceOptions,
    router: &ResultRouter,
    log: &LogContext,
) -> EvalResult<EvalReport>
where
    B: Backend,
    M: DepthEstimator<B>,
    D: DataSource<B>,
{
    let mut meters = MetricLogger::default();
    let mut processed = Vec::with_capacity(source.len());
    let mut artifacts = Vec::with_capacity(source.len());
    let mut end = Instant::now();

    for batch in source.batches() {
        let batch = batch?;
        let data_time = end.elapsed();

        let path = batch
            .ref_img_path
            .first()
            .cloned()
            .ok_or_else(|| EvalError::config("batch carries no reference path"))?;
        processed.push(path.clone());
        let inference_failed = |source: InferenceError| EvalError::Inference {
            path: path.clone(),
            source,
        };

        let reference = reference_image(&batch).map_err(inference_failed)?;
        let batch = dispatcher.place(batch);
        let pred = model
            .infer(batch, opts)
            .map_err(inference_failed)?
            .into_iter()
            .next()
            .ok_or_else(|| inference_failed(InferenceError::Other("empty prediction".into())))?;

        let batch_time = end.elapsed();
        end = Instant::now();
        meters.update(&[
            ("time", batch_time.as_secs_f64()),
            ("data", data_time.as_secs_f64()),
        ]);
        log.info(format_args!("{path} finished. {meters}"));

        artifacts.push(router.write(&pred, &path, Some(&reference))?);
    }

    Ok(EvalReport {
        processed,
        artifacts,
        forward_time: Duration::ZERO,
    })
}

/// Reference view of the first batch entry, back to 8-bit RGB.
fn reference_image<B: Backend>(batch: &MvsBatch<B>) -> Result<RgbImage, InferenceError> {
    let [_, _, _, h, w] = batch.img_list.dims();
    let values = batch
        .img_list
        .clone()
        .narrow(0, 0, 1)
        .narrow(1, 0, 1)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| InferenceError::Readback(format!("{e:?}")))?;
    let plane = h * w;
    if values.len() < 3 * plane {
        return Err(InferenceError::Readback(format!(
            "reference view has {} values, expected {}",
            values.len(),
            3 * plane
        )));
    }
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Ok(RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let i = y as usize * w + x as usize;
        Rgb([
            to_u8(values[i]),
            to_u8(values[plane + i]),
            to_u8(values[2 * plane + i]),
        ])
    }))
}
