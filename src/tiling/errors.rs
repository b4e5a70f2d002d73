//! Error types for tiling, annotation and stitching

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::tiff::errors::TiffError;

/// Errors raised by the tiling engine
#[derive(Debug)]
pub enum TilingError {
    /// Input raster or tile directory does not exist
    SourceNotFound(PathBuf),
    /// Tile, stride or box dimensions that cannot produce a valid grid
    InvalidGeometry(String),
    /// Tile file whose name does not follow `<prefix>_<row>_<col>.<ext>`
    MalformedTileName(String),
    /// Tile directory without any file matching the tile pattern
    NoTilesFound(PathBuf),
    /// Tile band count differs from the mosaic under the strict policy
    BandCountMismatch { tile: String, expected: u16, found: u16 },
    /// Tile that cannot be pasted into the mosaic (datatype)
    IncompatibleTile(String),
    /// Option values or configuration file contents that make no sense
    InvalidConfiguration(String),
    /// Raster file format error
    Tiff(TiffError),
    /// I/O error
    Io(io::Error),
    /// JSON, CSV or TOML (de)serialization error
    Serialization(String),
}

impl fmt::Display for TilingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilingError::SourceNotFound(path) => write!(f, "Source not found: {}", path.display()),
            TilingError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            TilingError::MalformedTileName(name) => write!(
                f,
                "Malformed tile name: {} (expected <prefix>_<row>_<col>.<ext>)",
                name
            ),
            TilingError::NoTilesFound(dir) => write!(f, "No tiles found in {}", dir.display()),
            TilingError::BandCountMismatch { tile, expected, found } => write!(
                f,
                "Band count mismatch in {}: expected {} band(s), found {}",
                tile, expected, found
            ),
            TilingError::IncompatibleTile(msg) => write!(f, "Incompatible tile: {}", msg),
            TilingError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            TilingError::Tiff(e) => write!(f, "{}", e),
            TilingError::Io(e) => write!(f, "I/O error: {}", e),
            TilingError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for TilingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TilingError::Tiff(e) => Some(e),
            TilingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TiffError> for TilingError {
    fn from(error: TiffError) -> Self {
        match error {
            TiffError::IoError(e) => TilingError::Io(e),
            other => TilingError::Tiff(other),
        }
    }
}

impl From<io::Error> for TilingError {
    fn from(error: io::Error) -> Self {
        TilingError::Io(error)
    }
}

impl From<serde_json::Error> for TilingError {
    fn from(error: serde_json::Error) -> Self {
        TilingError::Serialization(format!("JSON: {}", error))
    }
}

impl From<csv::Error> for TilingError {
    fn from(error: csv::Error) -> Self {
        TilingError::Serialization(format!("CSV: {}", error))
    }
}

impl From<toml::de::Error> for TilingError {
    fn from(error: toml::de::Error) -> Self {
        TilingError::Serialization(format!("TOML: {}", error))
    }
}

impl From<image::ImageError> for TilingError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::IoError(e) => TilingError::Io(e),
            other => TilingError::Tiff(TiffError::GenericError(format!("image codec: {}", other))),
        }
    }
}

/// Result type for tiling operations
pub type TilingResult<T> = Result<T, TilingError>;
