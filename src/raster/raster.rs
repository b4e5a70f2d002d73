//! In-memory raster buffers
//!
//! Pixel data is held band-sequential (bands x height x width). Every sample
//! is stored little-endian at its native width, so rasters of any datatype
//! share one byte-level representation and can be copied, padded and pasted
//! without decoding.

use std::fmt;

use crate::tiff::errors::{TiffError, TiffResult};

use super::data_type::DataType;
use super::georef::GeoReference;
use super::transform::GeoTransform;
use super::window::Window;

/// How the pixels of a source file are organised on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    /// TIFF strips of `rows_per_strip` rows
    Strips { rows_per_strip: u32 },
    /// TIFF tiles
    Tiles { tile_width: u32, tile_height: u32 },
    /// A single encoded image (PNG)
    Image,
}

/// Header-level description of a raster file
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    pub data_type: DataType,
    pub transform: GeoTransform,
    pub georef: GeoReference,
    pub layout: StorageLayout,
    /// Whether bands are stored in separate planes
    pub planar: bool,
    /// Name of the compression codec
    pub compression: &'static str,
}

impl RasterInfo {
    /// False for rasters with the identity transform and no CRS, as PNG files are
    pub fn is_georeferenced(&self) -> bool {
        !self.transform.is_identity() || !self.georef.is_empty()
    }
}

impl fmt::Display for RasterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Size: {}x{} pixels, {} band(s) of {}", self.width, self.height, self.bands, self.data_type)?;
        let layout = match self.layout {
            StorageLayout::Strips { rows_per_strip } => format!("strips of {} rows", rows_per_strip),
            StorageLayout::Tiles { tile_width, tile_height } => format!("{}x{} tiles", tile_width, tile_height),
            StorageLayout::Image => "single image".to_string(),
        };
        writeln!(f, "Layout: {}, {}, compression {}", layout,
                 if self.planar { "planar" } else { "interleaved" }, self.compression)?;
        writeln!(f, "Transform: {:?}", self.transform.to_gdal())?;
        write!(f, "CRS: {}", self.georef)
    }
}

/// Pixel data plus the georeferencing needed to place it on a map
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    bands: u16,
    data_type: DataType,
    transform: GeoTransform,
    georef: GeoReference,
    data: Vec<u8>,
}

impl Raster {
    /// Allocate a zero-filled raster with an identity transform and no CRS
    pub fn new(width: u32, height: u32, bands: u16, data_type: DataType) -> Self {
        let len = width as usize * height as usize * bands as usize * data_type.size();
        Raster {
            width,
            height,
            bands,
            data_type,
            transform: GeoTransform::identity(),
            georef: GeoReference::none(),
            data: vec![0u8; len],
        }
    }

    /// Wrap an existing band-sequential buffer
    pub fn from_data(width: u32, height: u32, bands: u16, data_type: DataType, data: Vec<u8>) -> TiffResult<Self> {
        let expected = width as usize * height as usize * bands as usize * data_type.size();
        if data.len() != expected {
            return Err(TiffError::GenericError(format!(
                "Buffer of {} bytes does not match {}x{}x{} {} raster ({} bytes)",
                data.len(), bands, height, width, data_type, expected
            )));
        }
        Ok(Raster {
            width,
            height,
            bands,
            data_type,
            transform: GeoTransform::identity(),
            georef: GeoReference::none(),
            data,
        })
    }

    /// Build from pixel-interleaved data (RGBRGB...), as decoded images are laid out
    pub fn from_interleaved(width: u32, height: u32, bands: u16, data_type: DataType, interleaved: &[u8]) -> TiffResult<Self> {
        let mut raster = Raster::new(width, height, bands, data_type);
        if interleaved.len() != raster.data.len() {
            return Err(TiffError::GenericError(format!(
                "Interleaved buffer of {} bytes does not match raster of {} bytes",
                interleaved.len(), raster.data.len()
            )));
        }
        let ss = data_type.size();
        let pixel_size = ss * bands as usize;
        let band_len = raster.band_len();
        for (pixel, chunk) in interleaved.chunks_exact(pixel_size).enumerate() {
            for band in 0..bands as usize {
                let dst = band * band_len + pixel * ss;
                raster.data[dst..dst + ss].copy_from_slice(&chunk[band * ss..(band + 1) * ss]);
            }
        }
        Ok(raster)
    }

    /// Set the affine transform
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the coordinate reference
    pub fn with_georef(mut self, georef: GeoReference) -> Self {
        self.georef = georef;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bands(&self) -> u16 {
        self.bands
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn georef(&self) -> &GeoReference {
        &self.georef
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn set_georef(&mut self, georef: GeoReference) {
        self.georef = georef;
    }

    /// Raw band-sequential sample bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes in one band
    pub fn band_len(&self) -> usize {
        self.width as usize * self.height as usize * self.data_type.size()
    }

    /// Bytes in one row of one band
    pub fn row_len(&self) -> usize {
        self.width as usize * self.data_type.size()
    }

    /// One band's samples
    pub fn band(&self, band: u16) -> &[u8] {
        let len = self.band_len();
        let start = band as usize * len;
        &self.data[start..start + len]
    }

    /// One row of one band
    pub fn row(&self, band: u16, row: u32) -> &[u8] {
        let start = self.row_offset(band, row);
        &self.data[start..start + self.row_len()]
    }

    /// Mutable row of one band
    pub fn row_mut(&mut self, band: u16, row: u32) -> &mut [u8] {
        let start = self.row_offset(band, row);
        let len = self.row_len();
        &mut self.data[start..start + len]
    }

    fn row_offset(&self, band: u16, row: u32) -> usize {
        band as usize * self.band_len() + row as usize * self.row_len()
    }

    /// Sample bytes at (band, row, col)
    pub fn sample(&self, band: u16, row: u32, col: u32) -> &[u8] {
        let ss = self.data_type.size();
        let start = self.row_offset(band, row) + col as usize * ss;
        &self.data[start..start + ss]
    }

    /// Overwrite the sample at (band, row, col); `value` must be one sample wide
    pub fn set_sample(&mut self, band: u16, row: u32, col: u32, value: &[u8]) {
        let ss = self.data_type.size();
        let start = self.row_offset(band, row) + col as usize * ss;
        self.data[start..start + ss].copy_from_slice(value);
    }

    /// Convert to pixel-interleaved order (RGBRGB...), the chunky TIFF layout
    pub fn to_interleaved(&self) -> Vec<u8> {
        let ss = self.data_type.size();
        let bands = self.bands as usize;
        let band_len = self.band_len();
        let pixels = self.width as usize * self.height as usize;
        let mut out = vec![0u8; self.data.len()];
        for pixel in 0..pixels {
            for band in 0..bands {
                let src = band * band_len + pixel * ss;
                let dst = (pixel * bands + band) * ss;
                out[dst..dst + ss].copy_from_slice(&self.data[src..src + ss]);
            }
        }
        out
    }

    /// The same raster with exactly `bands` bands
    ///
    /// Trailing extra bands are dropped, missing trailing bands are zero.
    pub fn with_band_count(self, bands: u16) -> Raster {
        if bands == self.bands {
            return self;
        }
        let band_len = self.band_len();
        let mut data = self.data;
        data.resize(band_len * bands as usize, 0);
        Raster {
            bands,
            data,
            ..self
        }
    }

    /// Copy `src` into this raster with its top-left pixel at (row_off, col_off)
    ///
    /// The parts of `src` outside this raster are clipped. Both rasters must
    /// share datatype and band count.
    pub fn paste(&mut self, src: &Raster, row_off: i64, col_off: i64) -> TiffResult<()> {
        if src.data_type != self.data_type || src.bands != self.bands {
            return Err(TiffError::GenericError(format!(
                "Cannot paste {} band(s) of {} into {} band(s) of {}",
                src.bands, src.data_type, self.bands, self.data_type
            )));
        }

        let target = Window::new(col_off, row_off, src.width, src.height);
        let overlap = match target.overlap(self.width, self.height) {
            Some(overlap) => overlap,
            None => return Ok(()),
        };

        // The window is `src` placed over this raster: its inside (`dst_*`)
        // indexes `src`, its raster side (`src_*`) indexes `self`
        let ss = self.data_type.size();
        let len = overlap.width as usize * ss;
        let tile_start = overlap.dst_col as usize * ss;
        let mosaic_start = overlap.src_col as usize * ss;
        for band in 0..self.bands {
            for r in 0..overlap.height {
                let tile_row = src.row(band, overlap.dst_row + r);
                let mosaic_row = self.row_mut(band, overlap.src_row + r);
                mosaic_row[mosaic_start..mosaic_start + len].copy_from_slice(&tile_row[tile_start..tile_start + len]);
            }
        }
        Ok(())
    }

    /// Copy a window out of this raster, zero-filling outside the bounds
    ///
    /// The result's transform is this raster's transform translated to the
    /// window origin.
    pub fn window(&self, window: Window) -> Raster {
        let mut out = Raster::new(window.width, window.height, self.bands, self.data_type)
            .with_transform(self.transform.translate(window.col_off as f64, window.row_off as f64))
            .with_georef(self.georef.clone());

        if let Some(overlap) = window.overlap(self.width, self.height) {
            let ss = self.data_type.size();
            let len = overlap.width as usize * ss;
            for band in 0..self.bands {
                for r in 0..overlap.height {
                    let src_start = overlap.src_col as usize * ss;
                    let dst_start = overlap.dst_col as usize * ss;
                    let src_row = self.row(band, overlap.src_row + r);
                    let chunk = &src_row[src_start..src_start + len];
                    out.row_mut(band, overlap.dst_row + r)[dst_start..dst_start + len].copy_from_slice(chunk);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32, bands: u16) -> Raster {
        let len = width as usize * height as usize * bands as usize;
        let data = (0..len).map(|i| (i % 251) as u8).collect();
        Raster::from_data(width, height, bands, DataType::U8, data).unwrap()
    }

    #[test]
    fn test_interleave_round_trip() {
        let raster = ramp(7, 5, 3);
        let interleaved = raster.to_interleaved();
        let rebuilt = Raster::from_interleaved(7, 5, 3, DataType::U8, &interleaved).unwrap();
        assert_eq!(rebuilt, raster);
        // First pixel holds the first sample of each band
        assert_eq!(&interleaved[..3], &[raster.band(0)[0], raster.band(1)[0], raster.band(2)[0]]);
    }

    #[test]
    fn test_from_data_rejects_wrong_length() {
        assert!(Raster::from_data(4, 4, 1, DataType::U16, vec![0; 16]).is_err());
    }

    #[test]
    fn test_band_count_reconciliation() {
        let raster = ramp(4, 3, 4);
        let dropped = raster.clone().with_band_count(3);
        assert_eq!(dropped.bands(), 3);
        assert_eq!(dropped.band(2), raster.band(2));

        let padded = ramp(4, 3, 2).with_band_count(3);
        assert_eq!(padded.bands(), 3);
        assert!(padded.band(2).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_window_then_paste_restores_pixels() {
        let raster = ramp(10, 8, 2);
        let mut mosaic = Raster::new(10, 8, 2, DataType::U8);
        for &(row, col) in &[(0i64, 0i64), (0, 5), (4, 0), (4, 5)] {
            let tile = raster.window(Window::new(col, row, 5, 4));
            mosaic.paste(&tile, row, col).unwrap();
        }
        assert_eq!(mosaic.data(), raster.data());
    }

    #[test]
    fn test_window_outside_is_zero() {
        let raster = ramp(4, 4, 1);
        let window = raster.window(Window::new(-2, -2, 4, 4));
        assert_eq!(window.sample(0, 0, 0), &[0]);
        assert_eq!(window.sample(0, 2, 2), raster.sample(0, 0, 0));
    }

    #[test]
    fn test_paste_clips_and_checks_layout() {
        let mut mosaic = Raster::new(4, 4, 1, DataType::U8);
        let tile = ramp(3, 3, 1);
        mosaic.paste(&tile, 2, 2).unwrap();
        assert_eq!(mosaic.sample(0, 3, 3), tile.sample(0, 1, 1));

        let wrong = ramp(3, 3, 2);
        assert!(mosaic.paste(&wrong, 0, 0).is_err());
    }
}
