//! Basic TIFF tag strategies
//!
//! Image structure tags (dimensions, sample layout, photometric model) and
//! the strip layout of the pixel data.

use std::collections::BTreeMap;

use log::debug;

use crate::raster::data_type::DataType;
use crate::tiff::constants::{extra_samples, field_types, photometric, planar_config, tags};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::utils::tiff_utils::{self, ExternalData};

/// Strip data per IFD
pub type StripData = BTreeMap<usize, Vec<Vec<u8>>>;

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Add the tags describing the image structure
    ///
    /// Three-band byte images are written as RGB, everything else as
    /// BlackIsZero. Bands beyond the photometric model are declared as
    /// unspecified extra samples.
    #[allow(clippy::too_many_arguments)]
    pub fn add_image_structure(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        width: u32,
        height: u32,
        bands: u16,
        data_type: DataType,
        compression: u16,
        is_big_tiff: bool,
    ) {
        debug!("Adding image structure tags for {}x{} image, {} band(s) of {}",
              width, height, bands, data_type);

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, height as u64));

        let bits = vec![data_type.bits(); bands as usize];
        tiff_utils::add_short_tag(ifd, external_data, ifd_index, tags::BITS_PER_SAMPLE, &bits, is_big_tiff);

        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64));

        let (model, model_samples) = if bands == 3 && data_type == DataType::U8 {
            (photometric::RGB, 3)
        } else {
            (photometric::BLACK_IS_ZERO, 1)
        };
        ifd.add_entry(IFDEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1, model as u64));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, bands as u64));
        ifd.add_entry(IFDEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, 1, planar_config::CHUNKY as u64));

        if bands > model_samples {
            let extra = vec![extra_samples::UNSPECIFIED; (bands - model_samples) as usize];
            debug!("Declaring {} extra sample(s)", extra.len());
            tiff_utils::add_short_tag(ifd, external_data, ifd_index, tags::EXTRA_SAMPLES, &extra, is_big_tiff);
        }

        let formats = vec![data_type.sample_format(); bands as usize];
        tiff_utils::add_short_tag(ifd, external_data, ifd_index, tags::SAMPLE_FORMAT, &formats, is_big_tiff);
    }

    /// Set up the strip layout for already-encoded strips
    ///
    /// StripOffsets is a placeholder until the writer has placed the strips;
    /// when the offsets do not fit the entry an external array of the right
    /// size is reserved and filled in at write time.
    pub fn setup_strips(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        image_data: &mut StripData,
        ifd_index: usize,
        strips: Vec<Vec<u8>>,
        rows_per_strip: u32,
        is_big_tiff: bool,
    ) {
        let total: usize = strips.iter().map(Vec::len).sum();
        debug!("Setting up {} strip(s) of {} rows, {} bytes", strips.len(), rows_per_strip, total);

        let field_type = tiff_utils::offset_field_type(is_big_tiff);
        let count = strips.len() as u64;

        let placeholder = tiff_utils::encode_offsets(&vec![0; strips.len()], is_big_tiff);
        tiff_utils::add_array_tag(ifd, external_data, ifd_index, tags::STRIP_OFFSETS,
                                  field_type, count, placeholder, is_big_tiff);

        let byte_counts: Vec<u64> = strips.iter().map(|s| s.len() as u64).collect();
        tiff_utils::add_array_tag(ifd, external_data, ifd_index, tags::STRIP_BYTE_COUNTS,
                                  field_type, count, tiff_utils::encode_offsets(&byte_counts, is_big_tiff), is_big_tiff);

        ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, rows_per_strip as u64));

        image_data.insert(ifd_index, strips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_structure() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        BasicTagsBuilder::add_image_structure(&mut ifd, &mut external, 0, 10, 5, 3, DataType::U8, 1, false);

        assert_eq!(ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION), Some(photometric::RGB as u64));
        assert!(!ifd.has_tag(tags::EXTRA_SAMPLES));
        assert_eq!(ifd.get_samples_per_pixel(), 3);
    }

    #[test]
    fn test_multiband_float_structure() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        BasicTagsBuilder::add_image_structure(&mut ifd, &mut external, 0, 10, 5, 4, DataType::F32, 1, false);

        assert_eq!(ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION), Some(photometric::BLACK_IS_ZERO as u64));
        assert_eq!(ifd.get_entry(tags::EXTRA_SAMPLES).map(|e| e.count), Some(3));
        // Four SHORTs do not fit the entry, so the values live out of line
        assert_eq!(ifd.get_entry(tags::BITS_PER_SAMPLE).map(|e| e.count), Some(4));
        assert_eq!(external.get(&(0, tags::BITS_PER_SAMPLE)), Some(&vec![32, 0, 32, 0, 32, 0, 32, 0]));
    }

    #[test]
    fn test_multi_strip_offsets_reserved_externally() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        let mut strips = StripData::new();
        BasicTagsBuilder::setup_strips(&mut ifd, &mut external, &mut strips, 0,
                                       vec![vec![1; 8], vec![2; 8], vec![3; 4]], 2, false);

        assert_eq!(external.get(&(0, tags::STRIP_OFFSETS)).map(Vec::len), Some(12));
        assert_eq!(external.get(&(0, tags::STRIP_BYTE_COUNTS)),
                   Some(&vec![8, 0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 0]));
        assert_eq!(strips.get(&0).map(Vec::len), Some(3));
    }
}
