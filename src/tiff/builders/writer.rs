//! TIFF writing strategies
//!
//! Lays out a file as header, IFDs, external tag data and strips, each
//! block word-aligned, then writes it front to back. Offsets are known
//! before the first byte is written, so strip offsets can be filled into
//! their tag data during layout.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::tiff::constants::{header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::{self, ExternalData};
use crate::utils::write_utils;

use super::basic_tags::StripData;

/// Where every block of the file goes
struct Layout {
    ifd_offsets: Vec<u64>,
    tag_data_offsets: BTreeMap<(usize, u16), u64>,
    strip_offsets: BTreeMap<usize, Vec<u64>>,
    end: u64,
}

/// Handles writing TIFF files to disk
pub struct WriterBuilder;

impl WriterBuilder {
    /// Write a complete TIFF file to disk
    ///
    /// Returns the size of the written file in bytes. A classic TIFF whose
    /// layout would need offsets beyond 32 bits is refused; the caller should
    /// have chosen BigTIFF.
    pub fn write(
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &StripData,
        external_data: &ExternalData,
        output_path: &Path,
    ) -> TiffResult<u64> {
        debug!("Writing {} to {}", if is_big_tiff { "BigTIFF" } else { "TIFF" }, output_path.display());

        let mut sorted_ifds = Self::prepare_sorted_ifds(ifds);
        let header_size = if is_big_tiff { 16 } else { 8 };
        let layout = Self::calculate_offsets(&sorted_ifds, external_data, image_data, header_size, is_big_tiff);

        if !is_big_tiff && layout.end > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "File of {} bytes does not fit classic TIFF offsets, BigTIFF required", layout.end
            )));
        }

        let external_data = Self::resolve_strip_offsets(&mut sorted_ifds, external_data, &layout, is_big_tiff);

        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);

        let first_ifd_offset = layout.ifd_offsets.first().copied().unwrap_or(0);
        Self::write_header(&mut writer, first_ifd_offset, is_big_tiff)?;
        Self::write_ifds(&mut writer, &sorted_ifds, &layout, is_big_tiff)?;
        Self::write_external_data(&mut writer, &external_data)?;
        Self::write_image_data(&mut writer, image_data)?;

        writer.flush()?;
        debug!("Wrote {} bytes", layout.end);
        Ok(layout.end)
    }

    /// Prepare sorted IFDs with unique tags
    fn prepare_sorted_ifds(ifds: &[IFD]) -> Vec<IFD> {
        ifds.iter().map(|ifd| {
            let mut sorted_ifd = ifd.clone();
            sorted_ifd.entries = write_utils::get_unique_sorted_entries(&ifd.entries);
            sorted_ifd
        }).collect()
    }

    /// Calculate offsets for IFDs, external data and strips
    ///
    /// Must visit blocks in the same order the write functions emit them.
    fn calculate_offsets(
        sorted_ifds: &[IFD],
        external_data: &ExternalData,
        image_data: &StripData,
        header_size: u64,
        is_big_tiff: bool,
    ) -> Layout {
        let mut current_offset = header_size;
        let mut ifd_offsets = Vec::with_capacity(sorted_ifds.len());

        for ifd in sorted_ifds {
            ifd_offsets.push(current_offset);
            current_offset = write_utils::align_to_4_bytes(current_offset + Self::calculate_ifd_size(ifd, is_big_tiff));
        }

        let mut tag_data_offsets = BTreeMap::new();
        for (key, data) in external_data {
            tag_data_offsets.insert(*key, current_offset);
            current_offset = write_utils::align_to_4_bytes(current_offset + data.len() as u64);
        }

        let mut strip_offsets = BTreeMap::new();
        for (ifd_index, strips) in image_data {
            let mut offsets = Vec::with_capacity(strips.len());
            for strip in strips {
                offsets.push(current_offset);
                current_offset = write_utils::align_to_4_bytes(current_offset + strip.len() as u64);
            }
            strip_offsets.insert(*ifd_index, offsets);
        }

        Layout {
            ifd_offsets,
            tag_data_offsets,
            strip_offsets,
            end: current_offset,
        }
    }

    /// Fill the StripOffsets values now that the strips have a place
    ///
    /// Offsets stored externally replace their reserved block, a single
    /// offset is packed into the entry itself.
    fn resolve_strip_offsets(
        sorted_ifds: &mut [IFD],
        external_data: &ExternalData,
        layout: &Layout,
        is_big_tiff: bool,
    ) -> ExternalData {
        let mut resolved = external_data.clone();

        for (ifd_index, offsets) in &layout.strip_offsets {
            let encoded = tiff_utils::encode_offsets(offsets, is_big_tiff);
            let key = (*ifd_index, tags::STRIP_OFFSETS);

            if let Some(block) = resolved.get_mut(&key) {
                *block = encoded;
                continue;
            }

            let entry = sorted_ifds.get_mut(*ifd_index)
                .and_then(|ifd| ifd.entries.iter_mut().find(|e| e.tag == tags::STRIP_OFFSETS));
            if let Some(entry) = entry {
                entry.raw_value = [0u8; 8];
                entry.raw_value[..encoded.len()].copy_from_slice(&encoded);
                entry.value_offset = offsets.first().copied().unwrap_or(0);
            }
        }

        resolved
    }

    /// Write the TIFF header
    ///
    /// Always little-endian (II), version 42 or 43 for BigTIFF.
    fn write_header(writer: &mut impl Write, first_ifd_offset: u64, is_big_tiff: bool) -> TiffResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&first_ifd_offset.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(first_ifd_offset as u32).to_le_bytes())?;
        }

        Ok(())
    }

    /// Size of an IFD on disk
    fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries_count = ifd.entries.len() as u64;

        match is_big_tiff {
            // count, 20 bytes per entry, next offset
            true => 8 + (20 * entries_count) + 8,
            // count, 12 bytes per entry, next offset
            false => 2 + (12 * entries_count) + 4,
        }
    }

    /// Write all IFDs to the file
    fn write_ifds(
        writer: &mut impl Write,
        sorted_ifds: &[IFD],
        layout: &Layout,
        is_big_tiff: bool,
    ) -> TiffResult<()> {
        for (i, ifd) in sorted_ifds.iter().enumerate() {
            let next_ifd_offset = layout.ifd_offsets.get(i + 1).copied().unwrap_or(0);
            let written = Self::write_ifd(writer, ifd, next_ifd_offset, &layout.tag_data_offsets, i, is_big_tiff)?;
            write_utils::write_padding(writer, written)?;
        }

        Ok(())
    }

    /// Write all external tag data
    fn write_external_data(writer: &mut impl Write, external_data: &ExternalData) -> TiffResult<()> {
        for data in external_data.values() {
            writer.write_all(data)?;
            write_utils::write_padding(writer, data.len())?;
        }

        Ok(())
    }

    /// Write all strips
    fn write_image_data(writer: &mut impl Write, image_data: &StripData) -> TiffResult<()> {
        for strips in image_data.values() {
            for strip in strips {
                writer.write_all(strip)?;
                write_utils::write_padding(writer, strip.len())?;
            }
        }

        Ok(())
    }

    /// Write an IFD (Image File Directory), returning the bytes written
    fn write_ifd(
        writer: &mut impl Write,
        ifd: &IFD,
        next_offset: u64,
        tag_offsets: &BTreeMap<(usize, u16), u64>,
        ifd_index: usize,
        is_big_tiff: bool,
    ) -> TiffResult<usize> {
        match is_big_tiff {
            true => writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?,
            false => writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?,
        }

        let field_len = tiff_utils::inline_capacity(is_big_tiff);
        for entry in &ifd.entries {
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;

            match is_big_tiff {
                true => writer.write_all(&entry.count.to_le_bytes())?,
                false => writer.write_all(&(entry.count as u32).to_le_bytes())?,
            }

            match (tag_offsets.get(&(ifd_index, entry.tag)), is_big_tiff) {
                (Some(offset), true) => writer.write_all(&offset.to_le_bytes())?,
                (Some(offset), false) => writer.write_all(&(*offset as u32).to_le_bytes())?,
                (None, _) => writer.write_all(&entry.raw_value[..field_len])?,
            }
        }

        match is_big_tiff {
            true => writer.write_all(&next_offset.to_le_bytes())?,
            false => writer.write_all(&(next_offset as u32).to_le_bytes())?,
        }

        Ok(Self::calculate_ifd_size(ifd, is_big_tiff) as usize)
    }
}
