//! Biodiversity Heatmap Engine
//!
//! Turns projected species occurrences into a smoothed, normalized raster of
//! local Shannon diversity and exports it as a GeoTIFF with overviews.
//!
//! # Architecture
//!
//! ```text
//! Occurrences (x, y, taxon)
//!      │
//!      ▼
//! GridExtent ── digitize each point into a (gx, gy) cell
//!      │
//!      ▼
//! aggregate() ── TaxonTally per cell ─► Shannon H ─► DiversityPoint at centroid
//!      │
//!      ▼
//! rasterize() ── weighted histogram ─► ln(v+1) ─► Gaussian ─► [0,1] ─► no-data
//!      │
//!      ▼
//! GeoTiffWriter ── transpose/flip, affine transform, CRS, overviews 2/4/8/16
//! ```
//!
//! # Example
//!
//! ```no_run
//! use diversity_heatmap::{HeatmapConfig, HeatmapPipeline, Occurrence};
//!
//! let occurrences = vec![
//!     Occurrence::new(385_000.0, 6_672_000.0, "MX.46549"),
//!     Occurrence::new(385_040.0, 6_672_030.0, "MX.47169"),
//! ];
//!
//! let pipeline = HeatmapPipeline::new(HeatmapConfig::default())?;
//! let (run, written) = pipeline.run(&occurrences, "EPSG:3067", "heatmap.tif")?;
//! println!("{} cells -> {} bytes", run.points.len(), written.bytes_written);
//! # Ok::<(), diversity_heatmap::HeatmapError>(())
//! ```

pub mod config;
pub mod crs;
pub mod diversity;
pub mod downsample;
pub mod error;
pub mod geotransform;
pub mod heatmap;
pub mod indexer;
pub mod pipeline;
pub mod rasterize;
pub mod smoothing;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{HeatmapConfig, OverviewConfig};
pub use crs::Crs;
pub use diversity::{aggregate, group_by_cell, TaxonTally};
pub use downsample::{build_overviews, downsample, OverviewLevel, Resampling};
pub use error::{HeatmapError, Result};
pub use geotransform::GeoTransform;
pub use heatmap::{HeatmapGrid, NormalizationOutcome};
pub use indexer::{digitize, GridExtent};
pub use pipeline::{HeatmapPipeline, HeatmapRun};
pub use rasterize::{rasterize, RasterizeParams, WeightSelection};
pub use types::{BoundingBox, DiversityPoint, GridCell, Occurrence};
pub use writer::{GeoTiffWriter, RasterMetadata, RasterWriteResult};
