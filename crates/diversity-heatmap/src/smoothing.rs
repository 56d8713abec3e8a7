//! Separable Gaussian smoothing with nearest-edge boundary handling.
//!
//! Boundary samples replicate the closest in-bounds value (`aaaa|abcd|dddd`),
//! so the filter neither wraps nor fades towards zero at the grid edge.

use crate::error::{HeatmapError, Result};
use crate::heatmap::MAX_GRID_CELLS;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Bandwidths at or below this are treated as "no smoothing".
const MIN_SIGMA: f64 = 1e-15;

/// Kernel radius `floor(4σ + 0.5)`, rejecting bandwidths whose kernel
/// would exceed [`MAX_GRID_CELLS`] taps.
pub fn kernel_radius(sigma: f64) -> Result<usize> {
    let radius = (TRUNCATE * sigma + 0.5).floor();
    if !sigma.is_finite() || sigma < 0.0 || radius > (MAX_GRID_CELLS / 2) as f64 {
        return Err(HeatmapError::invalid_input(format!(
            "smoothing bandwidth {} is out of range",
            sigma
        )));
    }
    Ok(radius as usize)
}

/// Build a normalized 1D Gaussian kernel of radius `floor(4σ + 0.5)`.
pub fn gaussian_kernel(sigma: f64) -> Result<Vec<f64>> {
    let radius = kernel_radius(sigma)?;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / denom).exp()
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    Ok(kernel)
}

/// Return a smoothed copy of an x-major `nx × ny` grid.
///
/// Element `(ix, iy)` lives at `ix * ny + iy`. A bandwidth of zero returns
/// the input unchanged.
pub fn gaussian_filter(data: &[f64], nx: usize, ny: usize, sigma: f64) -> Result<Vec<f64>> {
    debug_assert_eq!(data.len(), nx * ny);

    if sigma <= MIN_SIGMA || data.is_empty() {
        return Ok(data.to_vec());
    }

    let kernel = gaussian_kernel(sigma)?;
    let radius = kernel.len() / 2;

    // Pass along x (stride ny), then along y (stride 1).
    let along_x = convolve_axis(data, nx, ny, &kernel, radius, Axis::X);
    Ok(convolve_axis(&along_x, nx, ny, &kernel, radius, Axis::Y))
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn convolve_axis(
    data: &[f64],
    nx: usize,
    ny: usize,
    kernel: &[f64],
    radius: usize,
    axis: Axis,
) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];

    for ix in 0..nx {
        for iy in 0..ny {
            let (pos, len) = match axis {
                Axis::X => (ix, nx),
                Axis::Y => (iy, ny),
            };

            let mut sum = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = pos as isize + k as isize - radius as isize;
                let clamped = offset.clamp(0, len as isize - 1) as usize;
                let idx = match axis {
                    Axis::X => clamped * ny + iy,
                    Axis::Y => ix * ny + clamped,
                };
                sum += w * data[idx];
            }
            out[ix * ny + iy] = sum;
        }
    }

    out
}
