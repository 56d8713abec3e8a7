//! Affine geotransform for north-up rasters.

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};

/// Affine mapping from pixel (col, row) to map coordinates (x, y):
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// North-up transform from a west/north corner and positive pixel sizes.
    pub fn from_origin(west: f64, north: f64, x_size: f64, y_size: f64) -> Self {
        Self::new(west, north, x_size, -y_size)
    }

    /// Transform for a grid described by ascending bin edges.
    ///
    /// The top-left corner is `(x_edges[0], y_edges[last])`; pixel sizes come
    /// from the first pair of edges on each axis.
    pub fn from_edges(x_edges: &[f64], y_edges: &[f64]) -> Result<Self> {
        if x_edges.len() < 2 || y_edges.len() < 2 {
            return Err(HeatmapError::invalid_input(
                "geotransform needs at least two edges per axis",
            ));
        }
        let x_size = x_edges[1] - x_edges[0];
        let y_size = y_edges[1] - y_edges[0];
        if !(x_size > 0.0 && y_size > 0.0) {
            return Err(HeatmapError::invalid_input(format!(
                "edges must be strictly increasing (pixel size {} x {})",
                x_size, y_size
            )));
        }

        Ok(Self::from_origin(x_edges[0], y_edges[y_edges.len() - 1], x_size, y_size))
    }

    /// Positive pixel size `(width, height)`.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    /// Transform for an overview reduced by `factor` on both axes.
    ///
    /// Each overview pixel covers `factor × factor` full-resolution pixels
    /// from the same top-left corner.
    pub fn scaled(&self, factor: usize) -> Self {
        let f = factor as f64;
        Self::new(self.origin_x, self.origin_y, self.pixel_width * f, self.pixel_height * f)
    }
}
