use clap::Parser;
use cli_support::{EvalArgs, EvalOpts};
use eval::{announce, install_loggers, run, EvalReport, EvalResult, LogContext, RunContext};
use inference::CpuBackend;

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    about = "Evaluate an MVS depth model over a test set and write per-sample depth artifacts"
)]
struct Args {
    #[command(flatten)]
    eval: EvalArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let opts = EvalOpts::from(&args.eval);
    let ctx = RunContext::build(&opts, inference::accelerator_count())?;

    install_loggers(ctx.output_dir(), "test");
    let run_name = ctx
        .output_dir()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "eval".to_string());
    let log = LogContext::new(&run_name);
    announce(&ctx, &opts, &log);

    match dispatch(&ctx, &log) {
        Ok(report) => {
            log.info(format_args!(
                "Wrote artifacts for {} samples",
                report.artifacts.len()
            ));
            Ok(())
        }
        Err(err) => {
            log.error(&err);
            Err(err.into())
        }
    }
}

#[cfg(feature = "backend-wgpu")]
fn dispatch(ctx: &RunContext, log: &LogContext) -> EvalResult<EvalReport> {
    use inference::GpuBackend;
    if ctx.device_mode().is_cpu() {
        run::<CpuBackend>(ctx, vec![Default::default()], log)
    } else {
        run::<GpuBackend>(ctx, inference::device::accelerator_devices(), log)
    }
}

#[cfg(not(feature = "backend-wgpu"))]
fn dispatch(ctx: &RunContext, log: &LogContext) -> EvalResult<EvalReport> {
    run::<CpuBackend>(ctx, vec![Default::default()], log)
}
