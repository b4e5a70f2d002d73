//! Raster access
//!
//! Format-independent rasters and windows, plus the format strategies that
//! read and write them. Pixels are exchanged as `Raster` values; file
//! formats only appear behind `RasterSource` and `RasterSink`.

pub mod data_type;
pub mod georef;
pub mod geotiff_sink;
pub mod geotiff_source;
pub mod png;
#[allow(clippy::module_inception)]
pub mod raster;
pub mod source;
pub mod transform;
pub mod window;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::tiff::constants::compression;
use crate::tiling::errors::{TilingError, TilingResult};

pub use data_type::DataType;
pub use georef::GeoReference;
pub use geotiff_sink::GeoTiffSink;
pub use geotiff_source::GeoTiffSource;
pub use png::{PngSink, PngSource};
pub use raster::{Raster, RasterInfo, StorageLayout};
pub use source::{RasterSink, RasterSource};
pub use transform::GeoTransform;
pub use window::Window;

/// Codec for written GeoTIFF strips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Deflate,
    Zstd,
}

impl Compression {
    /// TIFF Compression tag value
    pub fn code(&self) -> u64 {
        match self {
            Compression::None => compression::NONE as u64,
            Compression::Deflate => compression::DEFLATE as u64,
            Compression::Zstd => compression::ZSTD as u64,
        }
    }
}

impl FromStr for Compression {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Compression::None),
            "deflate" | "zip" => Ok(Compression::Deflate),
            "zstd" => Ok(Compression::Zstd),
            other => Err(TilingError::InvalidConfiguration(format!(
                "unknown compression '{}', expected none, deflate or zstd", other
            ))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "none",
            Compression::Deflate => "deflate",
            Compression::Zstd => "zstd",
        };
        write!(f, "{}", name)
    }
}

/// Options for writing rasters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Strip codec (GeoTIFF only)
    pub compression: Compression,
    /// Write BigTIFF even when classic offsets would do
    pub big_tiff: bool,
}

impl WriteOptions {
    pub fn with_compression(compression: Compression) -> Self {
        WriteOptions { compression, ..Self::default() }
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[serde(alias = "tif", alias = "tiff")]
    GeoTiff,
    Png,
}

impl RasterFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "tif" | "tiff" => Some(RasterFormat::GeoTiff),
            "png" => Some(RasterFormat::Png),
            _ => None,
        }
    }

    /// Format of a path, judged by its extension
    pub fn from_path(path: &Path) -> TilingResult<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| TilingError::InvalidConfiguration(format!(
                "unsupported raster format for {}, expected .tif, .tiff or .png", path.display()
            )))
    }

    /// Extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::GeoTiff => "tif",
            RasterFormat::Png => "png",
        }
    }
}

impl FromStr for RasterFormat {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| TilingError::InvalidConfiguration(format!(
            "unknown raster format '{}', expected tif or png", s
        )))
    }
}

/// Picks the format strategy for a file
pub struct RasterFormatFactory;

impl RasterFormatFactory {
    /// Open a raster for reading
    pub fn open(path: &Path) -> TilingResult<Box<dyn RasterSource>> {
        if !path.is_file() {
            return Err(TilingError::SourceNotFound(path.to_path_buf()));
        }

        let format = RasterFormat::from_path(path)?;
        debug!("Opening {} as {:?}", path.display(), format);
        match format {
            RasterFormat::GeoTiff => Ok(Box::new(GeoTiffSource::open(path)?)),
            RasterFormat::Png => Ok(Box::new(PngSource::open(path)?)),
        }
    }

    /// Writer for a format
    pub fn sink(format: RasterFormat) -> Box<dyn RasterSink> {
        match format {
            RasterFormat::GeoTiff => Box::new(GeoTiffSink),
            RasterFormat::Png => Box::new(PngSink),
        }
    }
}

/// Open a raster, choosing the reader from the file extension
pub fn open_raster(path: &Path) -> TilingResult<Box<dyn RasterSource>> {
    RasterFormatFactory::open(path)
}

/// Write a raster, choosing the writer from the file extension
pub fn write_raster(raster: &Raster, path: &Path, options: &WriteOptions) -> TilingResult<u64> {
    let format = RasterFormat::from_path(path)?;
    RasterFormatFactory::sink(format).write(raster, path, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RasterFormat::from_path(Path::new("a/b.TIF")).unwrap(), RasterFormat::GeoTiff);
        assert_eq!(RasterFormat::from_path(Path::new("b.png")).unwrap(), RasterFormat::Png);
        assert!(RasterFormat::from_path(Path::new("b.jpg")).is_err());
        assert!(RasterFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let result = open_raster(Path::new("/definitely/not/here.tif"));
        assert!(matches!(result, Err(TilingError::SourceNotFound(_))));
    }

    #[test]
    fn test_compression_parsing() {
        assert_eq!("ZSTD".parse::<Compression>().unwrap(), Compression::Zstd);
        assert_eq!("deflate".parse::<Compression>().unwrap().code(), 8);
        assert!("lzw".parse::<Compression>().is_err());
    }
}
