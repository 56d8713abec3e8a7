//! Configuration for heatmap generation.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::downsample::Resampling;
use crate::error::{HeatmapError, Result};
use crate::heatmap::grid_cell_count;
use crate::rasterize::{WeightSelection, DEFAULT_SPARSIFY_THRESHOLD};
use crate::smoothing::kernel_radius;

/// Configuration for the heatmap pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Grid cell size for diversity aggregation, in map units (e.g. metres).
    pub cell_size: f64,

    /// Gaussian smoothing bandwidth in histogram bins; 0 disables smoothing.
    pub smoothing_bandwidth: f64,

    /// Histogram bin counts `(nx, ny)`. When unset, the number of whole
    /// cells that fit the occurrence extent is used.
    pub bins: Option<(usize, usize)>,

    /// Attribute accumulated into the histogram.
    pub weight: WeightSelection,

    /// Normalized values below this become no-data.
    pub sparsify_threshold: f64,

    /// Log a warning when fewer occurrences than this are supplied.
    pub min_occurrences_warning: usize,

    /// Overview generation for the exported raster.
    pub overviews: OverviewConfig,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            smoothing_bandwidth: 1.0,
            bins: None,
            weight: WeightSelection::ShannonDiversity,
            sparsify_threshold: DEFAULT_SPARSIFY_THRESHOLD,
            min_occurrences_warning: 1000,
            overviews: OverviewConfig::default(),
        }
    }
}

impl HeatmapConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(size) = env_value("HEATMAP_CELL_SIZE", |v| v.parse::<f64>().ok()) {
            config.cell_size = size;
        }

        if let Some(sigma) = env_value("HEATMAP_SMOOTHING", |v| v.parse::<f64>().ok()) {
            config.smoothing_bandwidth = sigma;
        }

        if let Some(bins) = env_value("HEATMAP_BINS", parse_bins) {
            config.bins = Some(bins);
        }

        if let Some(weight) = env_value("HEATMAP_WEIGHT", |v| WeightSelection::from_name(v).ok()) {
            config.weight = weight;
        }

        if let Some(threshold) = env_value("HEATMAP_SPARSIFY_THRESHOLD", |v| v.parse::<f64>().ok()) {
            config.sparsify_threshold = threshold;
        }

        if let Some(count) = env_value("HEATMAP_MIN_OCCURRENCES_WARNING", |v| v.parse::<usize>().ok()) {
            config.min_occurrences_warning = count;
        }

        config.overviews = OverviewConfig::from_env();
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(HeatmapError::invalid_config("cell_size must be > 0"));
        }

        if !self.smoothing_bandwidth.is_finite() || self.smoothing_bandwidth < 0.0 {
            return Err(HeatmapError::invalid_config("smoothing_bandwidth must be >= 0"));
        }
        kernel_radius(self.smoothing_bandwidth)
            .map_err(|e| HeatmapError::invalid_config(format!("smoothing_bandwidth: {}", e)))?;

        if let Some((nx, ny)) = self.bins {
            grid_cell_count(nx, ny).map_err(|e| HeatmapError::invalid_config(format!("bins: {}", e)))?;
        }

        if !(0.0..=1.0).contains(&self.sparsify_threshold) {
            return Err(HeatmapError::invalid_config("sparsify_threshold must be within 0-1"));
        }

        self.overviews.validate()
    }
}

/// Overview (pyramid) configuration for the exported raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Reduction factors, each relative to full resolution.
    pub factors: Vec<usize>,

    /// Block reduction used for every level.
    pub resampling: Resampling,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            factors: vec![2, 4, 8, 16],
            resampling: Resampling::Average,
        }
    }
}

impl OverviewConfig {
    /// Load overview configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(factors) = env_value("HEATMAP_OVERVIEW_FACTORS", parse_factors) {
            config.factors = factors;
        }

        if let Some(method) = env_value("HEATMAP_OVERVIEW_RESAMPLING", |v| Resampling::from_name(v).ok()) {
            config.resampling = method;
        }

        config
    }

    /// Validate the overview configuration.
    pub fn validate(&self) -> Result<()> {
        if self.factors.iter().any(|&f| f < 2) {
            return Err(HeatmapError::invalid_config("overview factors must be >= 2"));
        }
        Ok(())
    }
}

/// Read and parse an environment variable, warning when it is set but
/// cannot be parsed.
fn env_value<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let val = std::env::var(name).ok()?;
    let parsed = parse(val.trim());
    if parsed.is_none() {
        warn!(variable = name, value = %val, "Ignoring malformed environment variable");
    }
    parsed
}

/// Parse `"NXxNY"` (e.g. `"120x80"`).
pub fn parse_bins(s: &str) -> Option<(usize, usize)> {
    let lower = s.trim().to_lowercase();
    let (nx, ny) = lower.split_once('x')?;
    Some((nx.trim().parse().ok()?, ny.trim().parse().ok()?))
}

/// Parse a comma-separated factor list (e.g. `"2,4,8,16"`). An empty
/// string disables overviews.
pub fn parse_factors(s: &str) -> Option<Vec<usize>> {
    if s.trim().is_empty() {
        return Some(Vec::new());
    }
    s.split(',').map(|f| f.trim().parse().ok()).collect()
}
