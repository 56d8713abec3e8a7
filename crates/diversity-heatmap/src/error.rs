//! Error types for heatmap generation.

use thiserror::Error;

/// Errors that can occur while building or exporting a diversity heatmap.
#[derive(Error, Debug)]
pub enum HeatmapError {
    /// A collection that must not be empty was empty.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Input violates a shape or value requirement.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The coordinate reference system identifier could not be encoded.
    #[error("invalid CRS: {0}")]
    InvalidCrs(String),

    /// The raster could not be written.
    #[error("raster export failed: {0}")]
    ExportFailed(String),

    /// Filesystem error during export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeatmapError {
    /// Create an EmptyInput error.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an ExportFailed error.
    pub fn export_failed(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// True for errors caused by the data or parameters handed to the pipeline.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_) | Self::InvalidInput(_) | Self::InvalidConfig(_)
        )
    }

    /// True for errors raised while persisting the raster.
    pub fn is_export_error(&self) -> bool {
        matches!(self, Self::InvalidCrs(_) | Self::ExportFailed(_) | Self::Io(_))
    }
}

impl From<tiff::TiffError> for HeatmapError {
    fn from(err: tiff::TiffError) -> Self {
        Self::ExportFailed(err.to_string())
    }
}

/// Result type for heatmap operations.
pub type Result<T> = std::result::Result<T, HeatmapError>;
