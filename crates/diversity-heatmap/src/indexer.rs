//! Grid indexing: edge generation and digitize-style binning.
//!
//! A [`GridExtent`] lays a regular grid of `cell_size` squares over the total
//! bounds of the occurrences. Edges start at the minimum coordinate and step
//! by `cell_size` while staying below the maximum, so the last cell along
//! each axis may be partial. A coordinate's 1-based index is the number of
//! edges less than or equal to it:
//!
//! ```text
//! edges:   0        10        20        (max = 27)
//!          |---1----|----2----|---3---|
//! x = 0  -> 1, x = 10 -> 2, x = 27 -> 3
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};
use crate::heatmap::MAX_GRID_CELLS;
use crate::types::{BoundingBox, GridCell, Occurrence};

/// Number of edges less than or equal to `value`.
///
/// Equivalent to the right-biased insertion position that keeps `edges`
/// sorted. Values below the first edge return 0, values at or beyond the
/// last edge return `edges.len()`.
pub fn digitize(value: f64, edges: &[f64]) -> usize {
    edges.partition_point(|&edge| edge <= value)
}

/// Regularly spaced values `start, start + step, ...` strictly below `stop`.
///
/// Always yields at least `start`, so a zero-width axis keeps one edge.
/// More than [`MAX_GRID_CELLS`] edges is rejected.
fn arange(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    let count = ((stop - start) / step).ceil().max(1.0);
    if count.is_nan() || count > MAX_GRID_CELLS as f64 {
        return Err(HeatmapError::invalid_input(format!(
            "cell size {} over a span of {} needs {} edges, limit is {}",
            step,
            stop - start,
            count,
            MAX_GRID_CELLS
        )));
    }
    let count = count as usize;
    Ok((0..count).map(|i| start + i as f64 * step).collect())
}

/// Bounding extent of the occurrences plus the cell size used to bin them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridExtent {
    bbox: BoundingBox,
    cell_size: f64,
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
}

impl GridExtent {
    /// Create a grid extent, computing the edge sequences once.
    pub fn new(bbox: BoundingBox, cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(HeatmapError::invalid_input(format!(
                "cell size must be positive and finite, got {}",
                cell_size
            )));
        }
        if bbox.width() < 0.0 || bbox.height() < 0.0 {
            return Err(HeatmapError::invalid_input(format!(
                "inverted bounding box {:?}",
                bbox
            )));
        }

        let x_edges = arange(bbox.min_x, bbox.max_x, cell_size)?;
        let y_edges = arange(bbox.min_y, bbox.max_y, cell_size)?;

        Ok(Self {
            bbox,
            cell_size,
            x_edges,
            y_edges,
        })
    }

    /// Grid over the total bounds of the occurrences.
    pub fn from_occurrences(occurrences: &[Occurrence], cell_size: f64) -> Result<Self> {
        let bbox = BoundingBox::from_occurrences(occurrences)?;
        Self::new(bbox, cell_size)
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    /// Cell containing the given coordinate.
    pub fn cell_at(&self, x: f64, y: f64) -> GridCell {
        GridCell::new(digitize(x, &self.x_edges), digitize(y, &self.y_edges))
    }

    /// Cell an occurrence is routed to.
    pub fn cell_of(&self, occurrence: &Occurrence) -> GridCell {
        self.cell_at(occurrence.x, occurrence.y)
    }

    /// Center of a cell: lower edge plus half a cell on each axis.
    pub fn centroid(&self, cell: GridCell) -> Result<(f64, f64)> {
        let half = self.cell_size / 2.0;
        let x = cell
            .gx
            .checked_sub(1)
            .and_then(|i| self.x_edges.get(i))
            .ok_or_else(|| HeatmapError::invalid_input(format!("no x edge for cell {:?}", cell)))?;
        let y = cell
            .gy
            .checked_sub(1)
            .and_then(|i| self.y_edges.get(i))
            .ok_or_else(|| HeatmapError::invalid_input(format!("no y edge for cell {:?}", cell)))?;
        Ok((x + half, y + half))
    }

    /// Default rasterization bin counts: whole cells that fit the extent.
    ///
    /// Each axis is clamped to at least one bin.
    pub fn bin_counts(&self) -> (usize, usize) {
        let nx = (self.bbox.width() / self.cell_size).floor() as usize;
        let ny = (self.bbox.height() / self.cell_size).floor() as usize;
        (nx.max(1), ny.max(1))
    }
}
