//! Coordinate reference system identifiers for GeoTIFF export.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HeatmapError, Result};

/// Geographic (lat/lon) EPSG codes recognised when choosing GeoKeys.
/// Every other code is written as a projected CRS.
const GEOGRAPHIC_EPSG_CODES: &[u16] = &[4326, 4258, 4269, 4283, 4617, 4619, 4674, 4755];

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// Wrap an EPSG code. GeoTIFF stores codes as 16-bit values.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match u16::try_from(code) {
            Ok(epsg) if epsg > 0 => Ok(Self { epsg }),
            _ => Err(HeatmapError::InvalidCrs(format!(
                "EPSG code {} cannot be stored in a GeoTIFF key",
                code
            ))),
        }
    }

    /// Parse identifiers like "EPSG:3067", "epsg:4326" or "CRS:84".
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" {
            return Self::from_epsg(4326);
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| HeatmapError::InvalidCrs(format!("unsupported CRS identifier '{}'", s)))?;

        Self::from_epsg(code)
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        GEOGRAPHIC_EPSG_CODES.contains(&self.epsg)
    }

    /// Entries for the GeoKeyDirectoryTag (34735).
    ///
    /// Header (version 1.1.0, key count) followed by sorted keys:
    /// GTModelType, GTRasterType (PixelIsArea) and the CRS code key.
    pub fn geo_key_directory(&self) -> Vec<u16> {
        const GT_MODEL_TYPE: u16 = 1024;
        const GT_RASTER_TYPE: u16 = 1025;
        const GEOGRAPHIC_TYPE: u16 = 2048;
        const PROJECTED_CS_TYPE: u16 = 3072;
        const MODEL_TYPE_PROJECTED: u16 = 1;
        const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
        const RASTER_PIXEL_IS_AREA: u16 = 1;

        let (model_type, crs_key) = if self.is_geographic() {
            (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
        } else {
            (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
        };

        vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE, 0, 1, model_type,
            GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
            crs_key, 0, 1, self.epsg,
        ]
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl std::str::FromStr for Crs {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
