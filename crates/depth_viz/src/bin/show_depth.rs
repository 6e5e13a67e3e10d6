use clap::Parser;
use cli_support::{VisualizeArgs, VisualizeOpts};
use depth_viz::visualize;

#[derive(Parser, Debug)]
#[command(
    name = "show_depth",
    about = "Render a reference image, its depth map and point cloud to PNG figures"
)]
struct Args {
    #[command(flatten)]
    viz: VisualizeArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let opts = VisualizeOpts::from(&args.viz);
    let figures = visualize(&opts)?;
    tracing::info!(
        image = %figures.image.display(),
        depth = %figures.depth.display(),
        cloud = %figures.cloud.display(),
        "figures written"
    );
    Ok(())
}
