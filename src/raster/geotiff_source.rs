//! GeoTIFF reader
//!
//! Reads windows out of stripped or tiled TIFF/BigTIFF files. Only the
//! blocks that intersect a window are read and decompressed. Strips are
//! treated as blocks spanning the full image width, so one code path
//! handles both layouts.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info, trace};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiling::errors::TilingResult;
use crate::utils::image_extraction_utils;

use super::data_type::DataType;
use super::raster::{Raster, RasterInfo, StorageLayout};
use super::source::RasterSource;
use super::window::Window;

/// Strip or tile organisation of the pixel data
struct BlockLayout {
    tiled: bool,
    block_width: u32,
    block_height: u32,
    blocks_across: u32,
    blocks_down: u32,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    planar: bool,
    predictor: u16,
    compression: Box<dyn CompressionHandler>,
    byte_order: ByteOrder,
}

impl BlockLayout {
    fn read(tiff_reader: &TiffReader, reader: &mut BufReader<File>, ifd: &IFD, width: u32, height: u32) -> TiffResult<Self> {
        let (block_width, block_height, offsets_tag, counts_tag) = if ifd.is_tiled() {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).ok_or(TiffError::TagNotFound(tags::TILE_WIDTH))? as u32;
            let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).ok_or(TiffError::TagNotFound(tags::TILE_LENGTH))? as u32;
            (tile_width, tile_height, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
                .map(|v| (v as u32).min(height))
                .unwrap_or(height);
            (width, rows_per_strip, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        if block_width == 0 || block_height == 0 {
            return Err(TiffError::GenericError(format!("Invalid block size {}x{}", block_width, block_height)));
        }

        let offsets = tiff_reader.read_tag_values(reader, ifd, offsets_tag)?;
        let byte_counts = tiff_reader.read_tag_values(reader, ifd, counts_tag)?;
        let code = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);

        Ok(BlockLayout {
            tiled: ifd.is_tiled(),
            block_width,
            block_height,
            blocks_across: width.div_ceil(block_width),
            blocks_down: height.div_ceil(block_height),
            offsets,
            byte_counts,
            planar: ifd.get_tag_value(tags::PLANAR_CONFIGURATION) == Some(planar_config::PLANAR as u64),
            predictor: ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16,
            compression: CompressionFactory::create_handler(code)?,
            byte_order: tiff_reader.byte_order()?,
        })
    }

    fn storage(&self) -> StorageLayout {
        if self.tiled {
            StorageLayout::Tiles { tile_width: self.block_width, tile_height: self.block_height }
        } else {
            StorageLayout::Strips { rows_per_strip: self.block_height }
        }
    }

    /// Index into the offset arrays; planar files store one block set per band
    fn block_index(&self, block_row: u32, block_col: u32, plane: u16) -> usize {
        let per_plane = (self.blocks_across * self.blocks_down) as usize;
        plane as usize * per_plane + (block_row * self.blocks_across + block_col) as usize
    }
}

/// Reads windows from a GeoTIFF file
pub struct GeoTiffSource {
    path: PathBuf,
    reader: BufReader<File>,
    info: RasterInfo,
    layout: BlockLayout,
}

impl GeoTiffSource {
    /// Open a GeoTIFF and read its header and georeferencing
    pub fn open(path: &Path) -> TilingResult<Self> {
        debug!("Opening GeoTIFF {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut reader)?;
        let ifd = tiff.require_main_ifd()?;

        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let (width, height) = (width as u32, height as u32);
        let bands = ifd.get_samples_per_pixel() as u16;
        let data_type = Self::read_data_type(&tiff_reader, &mut reader, ifd, bands)?;

        let layout = BlockLayout::read(&tiff_reader, &mut reader, ifd, width, height)?;
        // Index of the first block past the last plane
        let expected_blocks = layout.block_index(0, 0, if layout.planar { bands } else { 1 });
        if layout.offsets.len() < expected_blocks || layout.byte_counts.len() < expected_blocks {
            return Err(TiffError::GenericError(format!(
                "{} declares {} blocks, layout needs {}", path.display(), layout.offsets.len(), expected_blocks
            )).into());
        }

        let transform = GeoKeyParser::read_transform(&tiff_reader, &mut reader, ifd)?;
        let georef = GeoKeyParser::read_georeference(&tiff_reader, &mut reader, ifd)?;

        let info = RasterInfo {
            width,
            height,
            bands,
            data_type,
            transform,
            georef,
            layout: layout.storage(),
            planar: layout.planar,
            compression: layout.compression.name(),
        };
        info!("Opened {}: {}x{}x{} {} ({}, {})", path.display(), width, height, bands, data_type,
              info.compression, if tiff.is_big_tiff { "BigTIFF" } else { "TIFF" });

        Ok(GeoTiffSource {
            path: path.to_path_buf(),
            reader,
            info,
            layout,
        })
    }

    /// Resolve the datatype, requiring every band to share it
    fn read_data_type(tiff_reader: &TiffReader, reader: &mut BufReader<File>, ifd: &IFD, bands: u16) -> TiffResult<DataType> {
        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?
        } else {
            vec![1]
        };
        let formats = if ifd.has_tag(tags::SAMPLE_FORMAT) {
            tiff_reader.read_tag_values(reader, ifd, tags::SAMPLE_FORMAT)?
        } else {
            vec![sample_format::UNSIGNED as u64]
        };

        let uniform = |values: &[u64]| values.windows(2).all(|w| w[0] == w[1]);
        if !uniform(&bits) || !uniform(&formats) {
            return Err(TiffError::UnsupportedSampleLayout(format!(
                "mixed band layouts across {} bands (bits {:?}, formats {:?})", bands, bits, formats
            )));
        }

        let format = formats.first().copied().unwrap_or(sample_format::UNSIGNED as u64);
        let bits = bits.first().copied().unwrap_or(1);
        DataType::from_tiff(format as u16, bits as u16)
    }

    /// Path of the opened file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, decompress and decode one block
    fn read_block(&mut self, index: usize, rows: u32, samples_per_pixel: usize) -> TiffResult<Vec<u8>> {
        let offset = self.layout.offsets[index];
        let byte_count = self.layout.byte_counts[index] as usize;
        let sample_size = self.info.data_type.size();
        let expected = rows as usize * self.layout.block_width as usize * samples_per_pixel * sample_size;

        trace!("Reading block {} at offset {} ({} bytes)", index, offset, byte_count);
        let mut compressed = vec![0u8; byte_count];
        self.reader.seek(SeekFrom::Start(offset))?;
        self.reader.read_exact(&mut compressed)?;

        let mut data = self.layout.compression.decompress(&compressed)?;
        if data.len() < expected {
            return Err(TiffError::TruncatedImageData { block: index, expected, found: data.len() });
        }
        data.truncate(expected);

        self.layout.byte_order.normalize_samples(&mut data, sample_size);

        match self.layout.predictor {
            p if p == predictor::NONE => {}
            p if p == predictor::HORIZONTAL_DIFFERENCING && !matches!(self.info.data_type, DataType::F32 | DataType::F64) => {
                image_extraction_utils::undo_horizontal_predictor(
                    &mut data, self.layout.block_width as usize, samples_per_pixel, sample_size)?;
            }
            other => {
                return Err(TiffError::UnsupportedSampleLayout(format!(
                    "predictor {} on {} samples", other, self.info.data_type
                )))
            }
        }

        Ok(data)
    }
}

impl RasterSource for GeoTiffSource {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&mut self, window: Window) -> TilingResult<Raster> {
        let info = &self.info;
        let mut out = Raster::new(window.width, window.height, info.bands, info.data_type)
            .with_transform(info.transform.translate(window.col_off as f64, window.row_off as f64))
            .with_georef(info.georef.clone());

        let overlap = match window.overlap(info.width, info.height) {
            Some(overlap) => overlap,
            None => {
                debug!("Window {:?} lies outside the raster, returning zeros", window);
                return Ok(out);
            }
        };

        let (height, bands) = (info.height, info.bands);
        let sample_size = info.data_type.size();
        let (bw, bh) = (self.layout.block_width, self.layout.block_height);
        let planes = if self.layout.planar { bands } else { 1 };
        let samples_per_pixel = if self.layout.planar { 1 } else { bands as usize };

        let first_block_row = overlap.src_row / bh;
        let last_block_row = (overlap.src_row + overlap.height - 1) / bh;
        let first_block_col = overlap.src_col / bw;
        let last_block_col = (overlap.src_col + overlap.width - 1) / bw;

        for plane in 0..planes {
            for block_row in first_block_row..=last_block_row {
                for block_col in first_block_col..=last_block_col {
                    let block_y = block_row * bh;
                    let block_x = block_col * bw;
                    // Strips may end early; tiles are always full size on disk
                    let rows = if self.layout.tiled { bh } else { bh.min(height - block_y) };

                    let index = self.layout.block_index(block_row, block_col, plane);
                    let block = self.read_block(index, rows, samples_per_pixel)?;

                    let row_start = block_y.max(overlap.src_row);
                    let row_end = (block_y + rows).min(overlap.src_row + overlap.height);
                    let col_start = block_x.max(overlap.src_col);
                    let col_end = (block_x + bw).min(overlap.src_col + overlap.width);
                    if row_start >= row_end || col_start >= col_end {
                        continue;
                    }

                    let run = (col_end - col_start) as usize;
                    let pixel_size = samples_per_pixel * sample_size;
                    let block_row_bytes = bw as usize * pixel_size;
                    let dst_col = (col_start as i64 - window.col_off) as usize * sample_size;

                    for y in row_start..row_end {
                        let src_start = (y - block_y) as usize * block_row_bytes + (col_start - block_x) as usize * pixel_size;
                        let src = &block[src_start..src_start + run * pixel_size];
                        let dst_row = (y as i64 - window.row_off) as u32;

                        if self.layout.planar {
                            out.row_mut(plane, dst_row)[dst_col..dst_col + run * sample_size].copy_from_slice(src);
                        } else {
                            for band in 0..bands {
                                let dst = &mut out.row_mut(band, dst_row)[dst_col..dst_col + run * sample_size];
                                image_extraction_utils::deinterleave_row(src, dst, band as usize, samples_per_pixel, sample_size);
                            }
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}
