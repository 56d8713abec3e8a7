//! GeoTIFF writer for normalized heatmaps.
//!
//! Produces a single-band 64-bit float GeoTIFF, north-up, with the affine
//! transform in ModelPixelScale/ModelTiepoint tags, the CRS in the
//! GeoKeyDirectory and reduced-resolution overviews as additional IFDs.

use std::fs;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::config::OverviewConfig;
use crate::crs::Crs;
use crate::downsample::{build_overviews, OverviewLevel};
use crate::error::{HeatmapError, Result};
use crate::geotransform::GeoTransform;
use crate::heatmap::{HeatmapGrid, NormalizationOutcome};

const TAG_NEW_SUBFILE_TYPE: u16 = 254;
const TAG_DATE_TIME: u16 = 306;
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

/// NewSubfileType bit for a reduced-resolution copy of the main image.
const SUBFILE_REDUCED_RESOLUTION: u32 = 1;

/// Nodata value as recorded in the GDAL_NODATA tag.
pub const NODATA: &str = "nan";

/// Shape and georeferencing of one overview level.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverviewInfo {
    pub factor: usize,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

/// Description of a written heatmap raster.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RasterMetadata {
    /// Raster dimensions (width, height) in pixels.
    pub shape: (usize, usize),
    pub transform: GeoTransform,
    pub crs: String,
    pub dtype: String,
    pub nodata: String,
    pub overviews: Vec<OverviewInfo>,
    /// Overview resampling method.
    pub resampling: String,
    pub normalization: NormalizationOutcome,
    /// Pixels holding a value (not nodata).
    pub valid_pixels: usize,
    pub created_at: DateTime<Utc>,
}

impl RasterMetadata {
    /// Serialize to JSON for a sidecar file.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Deserialize from JSON.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| HeatmapError::invalid_input(format!("raster metadata: {}", e)))
    }
}

/// Result of writing a heatmap raster.
#[derive(Debug)]
pub struct RasterWriteResult {
    pub metadata: RasterMetadata,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Writer for heatmap GeoTIFFs with internal overviews.
pub struct GeoTiffWriter {
    config: OverviewConfig,
}

impl GeoTiffWriter {
    /// Create a new GeoTiffWriter with the given overview configuration.
    pub fn new(config: OverviewConfig) -> Self {
        Self { config }
    }

    /// Write `grid` to `path`.
    ///
    /// The raster is encoded into a temporary file beside `path` and moved
    /// into place only once complete, so a failed write leaves nothing at
    /// `path`.
    pub fn write<P: AsRef<Path>>(&self, grid: &HeatmapGrid, crs: &str, path: P) -> Result<RasterWriteResult> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        let metadata = {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let metadata = self.encode(grid, crs, &mut writer)?;
            writer.flush()?;
            metadata
        };
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| HeatmapError::Io(e.error))?;

        let bytes_written = fs::metadata(path)?.len();

        info!(
            path = %path.display(),
            width = metadata.shape.0,
            height = metadata.shape.1,
            overviews = metadata.overviews.len(),
            bytes = bytes_written,
            "Wrote heatmap GeoTIFF"
        );

        Ok(RasterWriteResult {
            metadata,
            path: path.to_path_buf(),
            bytes_written,
        })
    }

    /// Encode `grid` as a GeoTIFF into any seekable sink.
    pub fn encode<W: Write + Seek>(&self, grid: &HeatmapGrid, crs: &str, writer: W) -> Result<RasterMetadata> {
        self.config.validate()?;
        let crs = Crs::parse(crs)?;
        let transform = GeoTransform::from_edges(grid.x_edges(), grid.y_edges())?;

        // Histogram orientation -> raster orientation (transpose + flip).
        let (width, height) = grid.shape();
        let pixels = grid.to_north_up_rows();
        let overviews = build_overviews(
            &pixels,
            width,
            height,
            &self.config.factors,
            self.config.resampling,
        );
        let created_at = Utc::now();

        let mut encoder = TiffEncoder::new(writer)?;

        let mut image = encoder.new_image::<Gray64Float>(width as u32, height as u32)?;
        {
            let dir = image.encoder();
            let (x_size, y_size) = transform.pixel_size();
            dir.write_tag(tag(TAG_MODEL_PIXEL_SCALE), &[x_size, y_size, 0.0][..])?;
            dir.write_tag(
                tag(TAG_MODEL_TIEPOINT),
                &[0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0][..],
            )?;
            dir.write_tag(tag(TAG_GEO_KEY_DIRECTORY), crs.geo_key_directory().as_slice())?;
            dir.write_tag(
                tag(TAG_DATE_TIME),
                created_at.format("%Y:%m:%d %H:%M:%S").to_string().as_str(),
            )?;
            dir.write_tag(
                tag(TAG_GDAL_METADATA),
                gdal_metadata(self.config.resampling.as_str()).as_str(),
            )?;
            dir.write_tag(tag(TAG_GDAL_NODATA), NODATA)?;
        }
        image.write_data(&to_samples(&pixels))?;

        for level in &overviews {
            write_overview(&mut encoder, level)?;
        }

        debug!(
            crs = %crs,
            factors = ?self.config.factors,
            resampling = %self.config.resampling,
            "Encoded GeoTIFF with overviews"
        );

        Ok(RasterMetadata {
            shape: (width, height),
            transform,
            crs: crs.to_string(),
            dtype: "float64".to_string(),
            nodata: NODATA.to_string(),
            overviews: overviews
                .iter()
                .map(|l| OverviewInfo {
                    factor: l.factor,
                    width: l.width,
                    height: l.height,
                    transform: transform.scaled(l.factor),
                })
                .collect(),
            resampling: self.config.resampling.as_str().to_string(),
            normalization: grid.normalization(),
            valid_pixels: grid.valid_count(),
            created_at,
        })
    }
}

fn write_overview<W: Write + Seek>(encoder: &mut TiffEncoder<W>, level: &OverviewLevel) -> Result<()> {
    let mut image = encoder.new_image::<Gray64Float>(level.width as u32, level.height as u32)?;
    image
        .encoder()
        .write_tag(tag(TAG_NEW_SUBFILE_TYPE), SUBFILE_REDUCED_RESOLUTION)?;
    image.encoder().write_tag(tag(TAG_GDAL_NODATA), NODATA)?;
    image.write_data(&to_samples(&level.data))?;
    Ok(())
}

/// Tag for a numeric code, using the named variant where the tiff crate has one.
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Nodata cells become NaN on disk.
fn to_samples(pixels: &[Option<f64>]) -> Vec<f64> {
    pixels.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// GDAL metadata XML recording the overview resampling method.
fn gdal_metadata(resampling: &str) -> String {
    format!(
        "<GDALMetadata>\n  <Item name=\"resampling\" domain=\"rio_overview\">{}</Item>\n</GDALMetadata>",
        resampling
    )
}
