//! Downsampling for raster overview (pyramid) levels.
//!
//! Each overview is computed directly from the full-resolution raster by
//! reducing `factor × factor` pixel blocks. Blocks at the right and bottom
//! edges may be partial, so an overview of a `w × h` raster measures
//! `ceil(w / factor) × ceil(h / factor)`.

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};

/// Method used to reduce a block of pixels to one overview pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Mean of the valid pixels in the block
    #[default]
    Average,
    /// Maximum of the valid pixels in the block
    Max,
    /// Top-left pixel of the block
    Nearest,
}

impl Resampling {
    /// Parse from string (case-insensitive).
    pub fn from_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "average" | "mean" => Ok(Self::Average),
            "max" => Ok(Self::Max),
            "nearest" => Ok(Self::Nearest),
            other => Err(HeatmapError::invalid_config(format!(
                "unknown overview resampling '{}'",
                other
            ))),
        }
    }

    /// Name recorded in the raster's overview metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Max => "max",
            Self::Nearest => "nearest",
        }
    }
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reduced-resolution level.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewLevel {
    /// Row-major pixels, `None` for no-data
    pub data: Vec<Option<f64>>,
    pub width: usize,
    pub height: usize,
    /// Reduction factor relative to full resolution (2, 4, 8, ...)
    pub factor: usize,
}

/// Reduce a row-major raster by `factor` on both axes.
///
/// No-data pixels are ignored; a block with no valid pixel stays no-data.
pub fn downsample(
    data: &[Option<f64>],
    width: usize,
    height: usize,
    factor: usize,
    method: Resampling,
) -> OverviewLevel {
    let factor = factor.max(1);
    let new_width = width.div_ceil(factor);
    let new_height = height.div_ceil(factor);

    let mut output = vec![None; new_width * new_height];

    for out_y in 0..new_height {
        for out_x in 0..new_width {
            let y0 = out_y * factor;
            let x0 = out_x * factor;
            let y1 = y0.saturating_add(factor).min(height);
            let x1 = x0.saturating_add(factor).min(width);

            let block = (y0..y1).flat_map(|y| (x0..x1).map(move |x| y * width + x));

            output[out_y * new_width + out_x] = match method {
                Resampling::Average => mean_of_block(block.filter_map(|i| data[i])),
                Resampling::Max => max_of_block(block.filter_map(|i| data[i])),
                Resampling::Nearest => data[y0 * width + x0],
            };
        }
    }

    OverviewLevel {
        data: output,
        width: new_width,
        height: new_height,
        factor,
    }
}

#[inline]
fn mean_of_block(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[inline]
fn max_of_block(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}

/// Build one overview per reduction factor, in the order given.
pub fn build_overviews(
    data: &[Option<f64>],
    width: usize,
    height: usize,
    factors: &[usize],
    method: Resampling,
) -> Vec<OverviewLevel> {
    factors
        .iter()
        .map(|&factor| downsample(data, width, height, factor, method))
        .collect()
}
