//! Biodiversity heatmap generator.
//!
//! Reads projected occurrence points from GeoJSON, computes per-cell
//! Shannon diversity and writes a smoothed heatmap GeoTIFF with overviews.

mod config;
mod input;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use diversity_heatmap::HeatmapPipeline;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{resolve_config, Overrides};
use input::{read_occurrences, DEFAULT_TAXON_PROPERTY};

#[derive(Parser, Debug)]
#[command(name = "heatmapper")]
#[command(about = "Species diversity heatmaps from occurrence points")]
struct Args {
    /// GeoJSON FeatureCollection of occurrence points
    #[arg(short, long)]
    input: String,

    /// Output GeoTIFF path
    #[arg(short, long)]
    output: String,

    /// CRS of the input coordinates and output raster
    #[arg(long, default_value = "EPSG:3067")]
    crs: String,

    /// YAML configuration file (default: HEATMAP_* environment variables)
    #[arg(short, long)]
    config: Option<String>,

    /// Aggregation cell size in map units
    #[arg(long)]
    cell_size: Option<f64>,

    /// Gaussian smoothing bandwidth in bins
    #[arg(long)]
    smoothing: Option<f64>,

    /// Histogram bins as NXxNY
    #[arg(long)]
    bins: Option<String>,

    /// Histogram weight: shannon_diversity, occurrence_count, taxon_richness or unweighted
    #[arg(long)]
    weight: Option<String>,

    /// Feature property holding the taxon identifier
    #[arg(long, default_value = DEFAULT_TAXON_PROPERTY)]
    taxon_property: String,

    /// Write raster metadata as JSON to this path
    #[arg(long)]
    metadata_out: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(input = %args.input, output = %args.output, crs = %args.crs, "Starting heatmapper");

    let overrides = Overrides {
        cell_size: args.cell_size,
        smoothing: args.smoothing,
        bins: args.bins.clone(),
        weight: args.weight.clone(),
    };
    let config = resolve_config(args.config.as_deref(), &overrides)?;
    info!(
        cell_size = config.cell_size,
        smoothing = config.smoothing_bandwidth,
        weight = %config.weight,
        "Loaded configuration"
    );

    let occurrences = read_occurrences(&args.input, &args.taxon_property)?;

    let pipeline = HeatmapPipeline::new(config)?;
    let (run, written) = pipeline
        .run(&occurrences, &args.crs, &args.output)
        .with_context(|| format!("Failed to generate heatmap {}", args.output))?;

    let bbox = run.extent.bbox();
    info!(
        min_x = bbox.min_x,
        min_y = bbox.min_y,
        max_x = bbox.max_x,
        max_y = bbox.max_y,
        cell_size = run.extent.cell_size(),
        "Occurrence extent"
    );

    if let Some(metadata_path) = &args.metadata_out {
        let json = serde_json::to_string_pretty(&written.metadata)?;
        fs::write(metadata_path, json)
            .with_context(|| format!("Failed to write metadata to {}", metadata_path))?;
        info!(path = %metadata_path, "Wrote raster metadata");
    }

    info!(
        occurrences = occurrences.len(),
        cells = run.points.len(),
        width = written.metadata.shape.0,
        height = written.metadata.shape.1,
        valid_pixels = written.metadata.valid_pixels,
        bytes = written.bytes_written,
        "Heatmap complete"
    );

    Ok(())
}
