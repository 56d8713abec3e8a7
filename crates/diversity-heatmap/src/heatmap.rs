//! Dense normalized heatmap grid with explicit no-data cells.

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};

/// Largest number of cells a heatmap (or an axis of grid edges) may hold.
pub const MAX_GRID_CELLS: usize = 1 << 28;

/// Cell count of an `nx × ny` grid, rejecting empty or oversized shapes.
pub fn grid_cell_count(nx: usize, ny: usize) -> Result<usize> {
    if nx == 0 || ny == 0 {
        return Err(HeatmapError::invalid_input(format!(
            "grid shape must be positive, got {}x{}",
            nx, ny
        )));
    }
    nx.checked_mul(ny)
        .filter(|&cells| cells <= MAX_GRID_CELLS)
        .ok_or_else(|| {
            HeatmapError::invalid_input(format!(
                "grid of {}x{} cells exceeds the limit of {} cells",
                nx, ny, MAX_GRID_CELLS
            ))
        })
}

/// Result of the min-max normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NormalizationOutcome {
    /// Values were rescaled from `[min, max]` to `[0, 1]`.
    Rescaled { min: f64, max: f64 },
    /// The grid had no contrast and was left unchanged.
    Uniform { value: f64 },
}

impl NormalizationOutcome {
    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform { .. })
    }
}

/// Heatmap in histogram orientation.
///
/// Cell `(ix, iy)` spans `[x_edges[ix], x_edges[ix + 1])` by
/// `[y_edges[iy], y_edges[iy + 1])`; `iy = 0` is the southernmost row.
/// Storage is x-major: `(ix, iy)` lives at `ix * ny + iy`. `None` marks a
/// cell too faint to display.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    values: Vec<Option<f64>>,
    nx: usize,
    ny: usize,
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    normalization: NormalizationOutcome,
}

impl HeatmapGrid {
    /// Create a grid, checking that the edge sequences match the value shape.
    pub fn new(
        values: Vec<Option<f64>>,
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        normalization: NormalizationOutcome,
    ) -> Result<Self> {
        if x_edges.len() < 2 || y_edges.len() < 2 {
            return Err(HeatmapError::invalid_input(
                "heatmap needs at least two edges per axis",
            ));
        }
        let nx = x_edges.len() - 1;
        let ny = y_edges.len() - 1;
        if values.len() != grid_cell_count(nx, ny)? {
            return Err(HeatmapError::invalid_input(format!(
                "heatmap has {} values but edges describe a {}x{} grid",
                values.len(),
                nx,
                ny
            )));
        }

        Ok(Self {
            values,
            nx,
            ny,
            x_edges,
            y_edges,
            normalization,
        })
    }

    /// Grid shape as `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    pub fn normalization(&self) -> NormalizationOutcome {
        self.normalization
    }

    /// Value at `(ix, iy)`; `None` for no-data or out of range.
    pub fn get(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.nx || iy >= self.ny {
            return None;
        }
        self.values[ix * self.ny + iy]
    }

    /// All cells in storage order.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Number of cells holding a value.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Raster rows, north first: row `r`, column `c` holds cell
    /// `(c, ny - 1 - r)`.
    pub fn to_north_up_rows(&self) -> Vec<Option<f64>> {
        let mut rows = Vec::with_capacity(self.values.len());
        for iy in (0..self.ny).rev() {
            for ix in 0..self.nx {
                rows.push(self.values[ix * self.ny + iy]);
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeatmapGrid {
        // nx = 3, ny = 2, value = 10 * ix + iy
        let values = (0..3)
            .flat_map(|ix| (0..2).map(move |iy| Some((10 * ix + iy) as f64)))
            .collect();
        HeatmapGrid::new(
            values,
            vec![0.0, 10.0, 20.0, 30.0],
            vec![0.0, 10.0, 20.0],
            NormalizationOutcome::Rescaled { min: 0.0, max: 21.0 },
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_get() {
        let grid = sample();
        assert_eq!(grid.shape(), (3, 2));
        assert_eq!(grid.get(2, 1), Some(21.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.valid_count(), 6);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = HeatmapGrid::new(
            vec![Some(1.0); 5],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0],
            NormalizationOutcome::Uniform { value: 1.0 },
        )
        .unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_grid_cell_count_limits() {
        assert_eq!(grid_cell_count(3, 2).unwrap(), 6);
        assert_eq!(grid_cell_count(MAX_GRID_CELLS, 1).unwrap(), MAX_GRID_CELLS);
        assert!(grid_cell_count(0, 4).unwrap_err().is_input_error());
        assert!(grid_cell_count(usize::MAX / 2, 4).unwrap_err().is_input_error());
        assert!(grid_cell_count(MAX_GRID_CELLS, 2).unwrap_err().is_input_error());
    }

    #[test]
    fn test_north_up_rows() {
        let rows = sample().to_north_up_rows();
        // Top row is iy = 1, then iy = 0.
        let expected: Vec<Option<f64>> = [1.0, 11.0, 21.0, 0.0, 10.0, 20.0]
            .into_iter()
            .map(Some)
            .collect();
        assert_eq!(rows, expected);
    }
}
