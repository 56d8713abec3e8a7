//! Core types shared by the heatmap pipeline stages.

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};

/// A single species observation in a projected coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub x: f64,
    pub y: f64,
    pub taxon_id: String,
}

impl Occurrence {
    /// Create a new occurrence.
    pub fn new(x: f64, y: f64, taxon_id: impl Into<String>) -> Self {
        Self {
            x,
            y,
            taxon_id: taxon_id.into(),
        }
    }
}

/// An axis-aligned bounding box in projected map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Total bounds of a set of coordinates.
    ///
    /// Fails on an empty iterator or on any non-finite coordinate.
    pub fn from_coords<I>(coords: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bbox: Option<Self> = None;

        for (x, y) in coords {
            if !x.is_finite() || !y.is_finite() {
                return Err(HeatmapError::invalid_input(format!(
                    "non-finite coordinate ({}, {})",
                    x, y
                )));
            }
            bbox = Some(match bbox {
                None => Self::new(x, y, x, y),
                Some(b) => Self::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            });
        }

        bbox.ok_or_else(|| HeatmapError::empty_input("no coordinates to bound"))
    }

    /// Total bounds of a set of occurrences.
    pub fn from_occurrences(occurrences: &[Occurrence]) -> Result<Self> {
        Self::from_coords(occurrences.iter().map(|o| (o.x, o.y)))
    }

    /// Get the width in map units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height in map units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A grid cell identified by 1-based digitize indices.
///
/// Index 0 on either axis means the coordinate fell below the first edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub gx: usize,
    pub gy: usize,
}

impl GridCell {
    pub fn new(gx: usize, gy: usize) -> Self {
        Self { gx, gy }
    }
}

/// Synthetic point produced for each occupied grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityPoint {
    /// Cell the point summarizes.
    pub cell: GridCell,
    /// Cell centroid x.
    pub x: f64,
    /// Cell centroid y.
    pub y: f64,
    /// Shannon diversity index of the taxa in the cell.
    pub shannon_diversity: f64,
    /// Number of occurrences routed to the cell.
    pub occurrence_count: usize,
    /// Number of distinct taxa in the cell.
    pub taxon_richness: usize,
}
