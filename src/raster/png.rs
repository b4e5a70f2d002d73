//! PNG tiles through the `image` crate
//!
//! PNG has no georeferencing, so PNG rasters always carry the identity
//! transform and no CRS. Tiles written as PNG are meant for viewing and
//! annotation tools rather than for georeferenced stitching.

use std::fs;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat};
use log::{debug, info};

use crate::tiling::errors::{TilingError, TilingResult};

use super::data_type::DataType;
use super::raster::{Raster, RasterInfo, StorageLayout};
use super::source::{RasterSink, RasterSource};
use super::window::Window;
use super::WriteOptions;

/// Reads PNG files
///
/// PNG decoding is all-or-nothing, so the image is decoded once on open and
/// windows are cut from memory.
pub struct PngSource {
    info: RasterInfo,
    raster: Raster,
}

impl PngSource {
    /// Decode a PNG file
    pub fn open(path: &Path) -> TilingResult<Self> {
        debug!("Decoding PNG {}", path.display());
        let decoded = image::open(path)?;
        let (width, height) = (decoded.width(), decoded.height());

        let (bands, data_type, interleaved) = match decoded {
            DynamicImage::ImageLuma8(buf) => (1, DataType::U8, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, DataType::U8, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, DataType::U8, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, DataType::U8, buf.into_raw()),
            DynamicImage::ImageLuma16(buf) => (1, DataType::U16, le_bytes(buf.into_raw())),
            DynamicImage::ImageLumaA16(buf) => (2, DataType::U16, le_bytes(buf.into_raw())),
            DynamicImage::ImageRgb16(buf) => (3, DataType::U16, le_bytes(buf.into_raw())),
            DynamicImage::ImageRgba16(buf) => (4, DataType::U16, le_bytes(buf.into_raw())),
            other => (4, DataType::U8, other.to_rgba8().into_raw()),
        };

        let raster = Raster::from_interleaved(width, height, bands, data_type, &interleaved)?;
        let info = RasterInfo {
            width,
            height,
            bands,
            data_type,
            transform: *raster.transform(),
            georef: raster.georef().clone(),
            layout: StorageLayout::Image,
            planar: false,
            compression: "PNG",
        };
        info!("Opened {}: {}x{}x{} {}", path.display(), width, height, bands, data_type);

        Ok(PngSource { info, raster })
    }
}

fn le_bytes(values: Vec<u16>) -> Vec<u8> {
    values.into_iter().flat_map(u16::to_le_bytes).collect()
}

impl RasterSource for PngSource {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&mut self, window: Window) -> TilingResult<Raster> {
        Ok(self.raster.window(window))
    }
}

/// Writes PNG files (8 or 16 bit, 1 to 4 bands)
pub struct PngSink;

impl PngSink {
    fn to_image(raster: &Raster) -> TilingResult<DynamicImage> {
        let (w, h) = (raster.width(), raster.height());
        let interleaved = raster.to_interleaved();

        let image = match (raster.data_type(), raster.bands()) {
            (DataType::U8, 1) => ImageBuffer::from_raw(w, h, interleaved).map(DynamicImage::ImageLuma8),
            (DataType::U8, 2) => ImageBuffer::from_raw(w, h, interleaved).map(DynamicImage::ImageLumaA8),
            (DataType::U8, 3) => ImageBuffer::from_raw(w, h, interleaved).map(DynamicImage::ImageRgb8),
            (DataType::U8, 4) => ImageBuffer::from_raw(w, h, interleaved).map(DynamicImage::ImageRgba8),
            (DataType::U16, bands @ 1..=4) => {
                let samples: Vec<u16> = interleaved
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                match bands {
                    1 => ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageLuma16),
                    2 => ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageLumaA16),
                    3 => ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageRgb16),
                    _ => ImageBuffer::from_raw(w, h, samples).map(DynamicImage::ImageRgba16),
                }
            }
            (data_type, bands) => {
                return Err(TilingError::InvalidConfiguration(format!(
                    "PNG cannot hold {} band(s) of {}, use GeoTIFF output", bands, data_type
                )))
            }
        };

        image.ok_or_else(|| TilingError::InvalidGeometry(format!("pixel buffer does not match {}x{}", w, h)))
    }
}

impl RasterSink for PngSink {
    fn write(&self, raster: &Raster, path: &Path, _options: &WriteOptions) -> TilingResult<u64> {
        if !raster.transform().is_identity() {
            debug!("PNG output drops the transform of {}", path.display());
        }
        Self::to_image(raster)?.save_with_format(path, ImageFormat::Png)?;
        let size = fs::metadata(path)?.len();
        info!("Wrote {} ({} bytes)", path.display(), size);
        Ok(size)
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_rasters_are_rejected() {
        let raster = Raster::new(4, 4, 1, DataType::F32);
        assert!(matches!(PngSink::to_image(&raster), Err(TilingError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let data: Vec<u8> = (0..6 * 4 * 3).map(|i| (i * 7 % 256) as u8).collect();
        let raster = Raster::from_data(6, 4, 3, DataType::U8, data).unwrap();

        PngSink.write(&raster, &path, &WriteOptions::default()).unwrap();
        let mut source = PngSource::open(&path).unwrap();
        assert_eq!(source.info().bands, 3);
        assert_eq!(source.read_all().unwrap().data(), raster.data());
    }
}
