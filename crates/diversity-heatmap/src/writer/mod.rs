//! GeoTIFF writer for exporting heatmap grids.
//!
//! This module is the last pipeline stage: it persists the normalized grid
//! as a georeferenced raster with multi-resolution overviews.

mod geotiff_writer;

pub use geotiff_writer::{GeoTiffWriter, OverviewInfo, RasterMetadata, RasterWriteResult, NODATA};
