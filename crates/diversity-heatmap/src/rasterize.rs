//! Density rasterization of diversity points into a normalized heatmap.
//!
//! Stages, each feeding the next:
//!
//! 1. weighted 2D histogram over the points' own extent
//! 2. `ln(v + 1)` compression
//! 3. Gaussian smoothing ("nearest" edges)
//! 4. min-max normalization to `[0, 1]`
//! 5. sparsification of faint cells to no-data

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HeatmapError, Result};
use crate::heatmap::{grid_cell_count, HeatmapGrid, NormalizationOutcome};
use crate::indexer::digitize;
use crate::smoothing::{gaussian_filter, kernel_radius};
use crate::types::{BoundingBox, DiversityPoint};

/// Default cut-off below which normalized cells become no-data.
pub const DEFAULT_SPARSIFY_THRESHOLD: f64 = 0.01;

/// Value accumulated per point in the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSelection {
    /// Every point counts 1 (point density).
    Unweighted,
    /// Shannon diversity of the cell.
    #[default]
    ShannonDiversity,
    /// Occurrences in the cell.
    OccurrenceCount,
    /// Distinct taxa in the cell.
    TaxonRichness,
}

impl WeightSelection {
    /// Parse an attribute name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "none" | "unweighted" | "count" | "density" => Ok(Self::Unweighted),
            "shannon_diversity" | "shannon" | "diversity" => Ok(Self::ShannonDiversity),
            "occurrence_count" | "occurrences" => Ok(Self::OccurrenceCount),
            "taxon_richness" | "richness" => Ok(Self::TaxonRichness),
            other => Err(HeatmapError::invalid_config(format!(
                "unknown weight attribute '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unweighted => "unweighted",
            Self::ShannonDiversity => "shannon_diversity",
            Self::OccurrenceCount => "occurrence_count",
            Self::TaxonRichness => "taxon_richness",
        }
    }

    /// Weight contributed by one point.
    pub fn weight_of(&self, point: &DiversityPoint) -> f64 {
        match self {
            Self::Unweighted => 1.0,
            Self::ShannonDiversity => point.shannon_diversity,
            Self::OccurrenceCount => point.occurrence_count as f64,
            Self::TaxonRichness => point.taxon_richness as f64,
        }
    }
}

impl std::fmt::Display for WeightSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for [`rasterize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterizeParams {
    /// Histogram bins `(nx, ny)`.
    pub bins: (usize, usize),
    /// Gaussian bandwidth in bins; 0 disables smoothing.
    pub smoothing: f64,
    pub weight: WeightSelection,
    pub sparsify_threshold: f64,
}

impl RasterizeParams {
    pub fn new(bins: (usize, usize), smoothing: f64, weight: WeightSelection) -> Self {
        Self {
            bins,
            smoothing,
            weight,
            sparsify_threshold: DEFAULT_SPARSIFY_THRESHOLD,
        }
    }

    fn validate(&self) -> Result<()> {
        grid_cell_count(self.bins.0, self.bins.1)?;
        kernel_radius(self.smoothing)?;
        if !self.sparsify_threshold.is_finite() {
            return Err(HeatmapError::invalid_input("sparsify threshold must be finite"));
        }
        Ok(())
    }
}

/// Weighted 2D histogram, x-major (`ix * ny + iy`).
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2d {
    pub counts: Vec<f64>,
    pub nx: usize,
    pub ny: usize,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
}

/// `n + 1` evenly spaced edges from `min` to `max`, widening a
/// zero-width range to `[min - 0.5, max + 0.5]`.
fn histogram_edges(min: f64, max: f64, n: usize) -> Vec<f64> {
    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let step = (hi - lo) / n as f64;
    let mut edges: Vec<f64> = (0..=n).map(|i| lo + i as f64 * step).collect();
    edges[n] = hi;
    edges
}

/// Zero-based bin of `value`; the closing edge belongs to the last bin.
fn bin_index(value: f64, edges: &[f64]) -> usize {
    let n = edges.len() - 1;
    digitize(value, edges).saturating_sub(1).min(n - 1)
}

/// Accumulate weighted point counts over the points' bounding extent.
pub fn histogram2d(
    points: &[DiversityPoint],
    bins: (usize, usize),
    weight: WeightSelection,
) -> Result<Histogram2d> {
    let (nx, ny) = bins;
    let cells = grid_cell_count(nx, ny)?;

    let bbox = BoundingBox::from_coords(points.iter().map(|p| (p.x, p.y)))?;
    let x_edges = histogram_edges(bbox.min_x, bbox.max_x, nx);
    let y_edges = histogram_edges(bbox.min_y, bbox.max_y, ny);

    let mut counts = vec![0.0; cells];
    for point in points {
        let w = weight.weight_of(point);
        if !w.is_finite() {
            return Err(HeatmapError::invalid_input(format!(
                "non-finite {} weight for cell {:?}",
                weight, point.cell
            )));
        }
        let ix = bin_index(point.x, &x_edges);
        let iy = bin_index(point.y, &y_edges);
        counts[ix * ny + iy] += w;
    }

    Ok(Histogram2d {
        counts,
        nx,
        ny,
        x_edges,
        y_edges,
    })
}

/// Replace each value with `ln(v + 1)`, clamping non-finite results to 0.
pub fn log_compress(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let logged = (v + 1.0).ln();
            if logged.is_finite() {
                logged
            } else {
                0.0
            }
        })
        .collect()
}

/// Min-max rescale to `[0, 1]`; a grid with no contrast is returned as-is.
pub fn normalize(values: &[f64]) -> (Vec<f64>, NormalizationOutcome) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if max > min {
        let range = max - min;
        let rescaled = values.iter().map(|&v| (v - min) / range).collect();
        (rescaled, NormalizationOutcome::Rescaled { min, max })
    } else {
        (values.to_vec(), NormalizationOutcome::Uniform { value: min })
    }
}

/// Mark values below `threshold` as no-data.
pub fn sparsify(values: &[f64], threshold: f64) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&v| if v < threshold { None } else { Some(v) })
        .collect()
}

/// Turn diversity points into a smoothed, normalized heatmap.
pub fn rasterize(points: &[DiversityPoint], params: &RasterizeParams) -> Result<HeatmapGrid> {
    params.validate()?;
    if points.is_empty() {
        return Err(HeatmapError::empty_input("no diversity points to rasterize"));
    }

    let histogram = histogram2d(points, params.bins, params.weight)?;
    let (nx, ny) = (histogram.nx, histogram.ny);
    debug!(nx, ny, weight = %params.weight, points = points.len(), "Built weighted histogram");

    let logged = log_compress(&histogram.counts);
    let smoothed = gaussian_filter(&logged, nx, ny, params.smoothing)?;
    let (normalized, outcome) = normalize(&smoothed);

    if let NormalizationOutcome::Uniform { value } = outcome {
        warn!(value, "Heatmap has no contrast; skipping normalization");
    }

    let values = sparsify(&normalized, params.sparsify_threshold);
    let grid = HeatmapGrid::new(values, histogram.x_edges, histogram.y_edges, outcome)?;

    debug!(
        valid_cells = grid.valid_count(),
        total_cells = nx * ny,
        "Rasterized heatmap"
    );

    Ok(grid)
}
