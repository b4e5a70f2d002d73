//! GeoTIFF writer
//!
//! Writes rasters as chunky, stripped GeoTIFFs through `TiffBuilder`.

use std::path::Path;

use log::{debug, info};

use crate::compression::CompressionFactory;
use crate::tiff::builder::TiffBuilder;
use crate::tiff::ifd::IFD;
use crate::tiling::errors::{TilingError, TilingResult};

use super::raster::Raster;
use super::source::RasterSink;
use super::WriteOptions;

/// Uncompressed bytes per strip the writer aims for
const TARGET_STRIP_BYTES: usize = 64 * 1024;

/// Room left for IFDs and tag data when deciding on BigTIFF
const HEADER_ALLOWANCE: u64 = 1024 * 1024;

/// Writes GeoTIFF files
pub struct GeoTiffSink;

impl GeoTiffSink {
    /// Rows per strip keeping strips near 64 KiB, never less than one row
    pub fn rows_per_strip(row_bytes: usize, height: u32) -> u32 {
        let rows = (TARGET_STRIP_BYTES / row_bytes.max(1)).max(1) as u32;
        rows.min(height.max(1))
    }
}

impl RasterSink for GeoTiffSink {
    fn write(&self, raster: &Raster, path: &Path, options: &WriteOptions) -> TilingResult<u64> {
        if raster.width() == 0 || raster.height() == 0 || raster.bands() == 0 {
            return Err(TilingError::InvalidGeometry(format!(
                "cannot write an empty {}x{}x{} raster", raster.width(), raster.height(), raster.bands()
            )));
        }

        let handler = CompressionFactory::create_handler(options.compression.code())?;
        let row_bytes = raster.width() as usize * raster.bands() as usize * raster.data_type().size();
        let rows_per_strip = Self::rows_per_strip(row_bytes, raster.height());

        let interleaved = raster.to_interleaved();
        let strips = interleaved
            .chunks(rows_per_strip as usize * row_bytes)
            .map(|strip| handler.compress(strip))
            .collect::<Result<Vec<_>, _>>()?;

        let payload: u64 = strips.iter().map(|s| s.len() as u64).sum();
        let is_big_tiff = options.big_tiff || payload + HEADER_ALLOWANCE > u32::MAX as u64;
        debug!("{} strip(s) of {} rows, {} bytes compressed with {}", strips.len(), rows_per_strip, payload, handler.name());

        let mut builder = TiffBuilder::new(is_big_tiff);
        let ifd_index = builder.add_ifd(IFD::new(0, 0));
        builder.add_image_structure(
            ifd_index,
            raster.width(),
            raster.height(),
            raster.bands(),
            raster.data_type(),
            handler.code() as u16,
        )?;
        builder.setup_strips(ifd_index, strips, rows_per_strip)?;
        builder.add_transform(ifd_index, raster.transform())?;
        builder.add_georeference(ifd_index, raster.georef())?;
        builder.add_software_tag(ifd_index, concat!("rastertile ", env!("CARGO_PKG_VERSION")))?;

        let size = builder.write(path)?;
        info!("Wrote {} ({}x{}x{} {}, {} bytes)", path.display(), raster.width(), raster.height(),
              raster.bands(), raster.data_type(), size);
        Ok(size)
    }

    fn extension(&self) -> &'static str {
        "tif"
    }
}
