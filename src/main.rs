//! Bootstrap uncertainty of interpolated water table altitude

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use watertable_bootstrap::config::RunConfig;
use watertable_bootstrap::estimators::inverse_distance::InverseDistanceNearestNeighbor;
use watertable_bootstrap::pipeline;
use watertable_bootstrap::raster::GeoTiffWriter;
use watertable_bootstrap::reprojection::Reprojector;
use watertable_bootstrap::simulation::CancellationToken;

#[derive(Parser)]
#[command(name = "watertable-bootstrap")]
#[command(author, version, about = "Bootstrap uncertainty of interpolated water table altitude", long_about = None)]
struct Cli {
    /// JSON run configuration, defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV of measurement points
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of bootstrap realizations
    #[arg(long)]
    nsims: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the output rasters
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Keep rasters in the source coordinate system
    #[arg(long)]
    no_reproject: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(nsims) = self.nsims {
            config.bootstrap.nsims = nsims;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if self.no_reproject {
            config.output.target_epsg = None;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = cli.run_config()?;
    let start = Instant::now();

    let dataset = pipeline::load_dataset(&config.input).with_context(|| {
        format!("Failed to read points from {}", config.input.path.display())
    })?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let outputs = pipeline::run(
        &config,
        &dataset,
        InverseDistanceNearestNeighbor,
        &GeoTiffWriter,
        &Reprojector::gdalwarp(),
        &mut rng,
        &CancellationToken::new(),
    )
    .context("Bootstrap run failed")?;

    for path in outputs.written.iter().chain(&outputs.reprojected) {
        info!("Saved: {}", path.display());
    }
    info!("Processing time: {:.2?}", start.elapsed());
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}
