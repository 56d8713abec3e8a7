//! End-to-end heatmap pipeline.
//!
//! Runs the stages strictly in order on in-memory data:
//!
//! ```text
//! occurrences ──► GridExtent (edges) ──► aggregate (Shannon per cell)
//!                                             │
//!            GeoTIFF ◄── GeoTiffWriter ◄── rasterize (hist, ln, blur, norm)
//! ```

use std::path::Path;

use tracing::{info, warn};

use crate::config::HeatmapConfig;
use crate::diversity::aggregate;
use crate::error::{HeatmapError, Result};
use crate::heatmap::HeatmapGrid;
use crate::indexer::GridExtent;
use crate::rasterize::{rasterize, RasterizeParams};
use crate::types::{DiversityPoint, Occurrence};
use crate::writer::{GeoTiffWriter, RasterWriteResult};

/// Intermediate products of one pipeline run.
#[derive(Debug, Clone)]
pub struct HeatmapRun {
    pub extent: GridExtent,
    pub points: Vec<DiversityPoint>,
    pub bins: (usize, usize),
    pub grid: HeatmapGrid,
}

/// Builds diversity heatmaps from occurrence collections.
#[derive(Debug)]
pub struct HeatmapPipeline {
    config: HeatmapConfig,
}

impl HeatmapPipeline {
    /// Create a pipeline after validating the configuration.
    pub fn new(config: HeatmapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    /// Aggregate and rasterize, without writing anything.
    pub fn build(&self, occurrences: &[Occurrence]) -> Result<HeatmapRun> {
        if occurrences.is_empty() {
            return Err(HeatmapError::empty_input("no occurrences supplied"));
        }
        if occurrences.len() < self.config.min_occurrences_warning {
            warn!(
                occurrences = occurrences.len(),
                "Heatmap will be generated from few occurrences"
            );
        }

        let extent = GridExtent::from_occurrences(occurrences, self.config.cell_size)?;
        let points = aggregate(occurrences, &extent)?;

        // Bin counts follow the occurrence extent; the histogram itself spans
        // the centroids' extent.
        let bins = self.config.bins.unwrap_or_else(|| extent.bin_counts());
        let params = RasterizeParams {
            bins,
            smoothing: self.config.smoothing_bandwidth,
            weight: self.config.weight,
            sparsify_threshold: self.config.sparsify_threshold,
        };
        let grid = rasterize(&points, &params)?;

        info!(
            occurrences = occurrences.len(),
            cells = points.len(),
            nx = bins.0,
            ny = bins.1,
            "Built diversity heatmap"
        );

        Ok(HeatmapRun {
            extent,
            points,
            bins,
            grid,
        })
    }

    /// Write a previously built grid as a GeoTIFF.
    pub fn export<P: AsRef<Path>>(&self, grid: &HeatmapGrid, crs: &str, path: P) -> Result<RasterWriteResult> {
        GeoTiffWriter::new(self.config.overviews.clone()).write(grid, crs, path)
    }

    /// Build the heatmap and write it to `path`.
    pub fn run<P: AsRef<Path>>(
        &self,
        occurrences: &[Occurrence],
        crs: &str,
        path: P,
    ) -> Result<(HeatmapRun, RasterWriteResult)> {
        let run = self.build(occurrences)?;
        let written = self.export(&run.grid, crs, path)?;
        Ok((run, written))
    }
}
