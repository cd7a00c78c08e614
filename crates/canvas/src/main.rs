//! canvas-composite - drive the layer compositor with a synthetic painting session.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use canvas::{load_settings, RunConfig, Workload};

/// Paint random strokes onto a layer stack and composite every frame
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Canvas width
    #[arg(long, default_value = "256")]
    width: u32,

    /// Canvas height
    #[arg(long, default_value = "256")]
    height: u32,

    /// Number of layers
    #[arg(long, default_value = "3")]
    layers: usize,

    /// Number of frames to paint
    #[arg(long, default_value = "120")]
    frames: u32,

    /// Edge length of each stroke
    #[arg(long, default_value = "12")]
    stroke_size: u32,

    /// JSON file with compositor settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Always recompute the whole canvas
    #[arg(long)]
    no_incremental: bool,

    /// Disable per-layer raster payloads
    #[arg(long)]
    no_layer_caching: bool,

    /// Canvas area above which background compositing is used
    #[arg(long)]
    background_threshold: Option<u64>,

    /// Pixels per background batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Composite through the async path
    #[arg(long = "async")]
    use_async: bool,

    /// Seed for stroke placement
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)?,
            None => Default::default(),
        };

        if self.no_incremental {
            settings.enable_incremental_compositing = false;
        }
        if self.no_layer_caching {
            settings.enable_layer_caching = false;
        }
        if let Some(threshold) = self.background_threshold {
            settings.background_composite_threshold = threshold;
        }
        if let Some(batch) = self.batch_size {
            settings.background_batch_size = batch;
        }

        let mut config = RunConfig::new()
            .with_canvas(self.width, self.height)
            .with_layers(self.layers)
            .with_frames(self.frames)
            .with_settings(settings);
        config.stroke_size = self.stroke_size;
        config.use_async = self.use_async;
        config.seed = self.seed;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("canvas-composite v{}", canvas::VERSION);

    let config = args.run_config()?;
    info!(
        width = config.width,
        height = config.height,
        layers = config.layers,
        frames = config.frames,
        "starting session"
    );

    let use_async = config.use_async;
    let mut workload = Workload::new(config)?;
    let summary = if use_async {
        workload.run_async().await
    } else {
        workload.run()
    };

    info!(
        full = summary.full,
        incremental = summary.incremental,
        background = summary.background,
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
