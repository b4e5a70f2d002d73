//! TIFF tag construction helpers
//!
//! Shared by the tag builders: encoding value arrays and deciding whether
//! they live inside the IFD entry or in the external data area.

use std::collections::BTreeMap;

use crate::tiff::constants::field_types;
use crate::tiff::ifd::{IFD, IFDEntry};
use log::trace;

/// External tag data keyed by (IFD index, tag)
pub type ExternalData = BTreeMap<(usize, u16), Vec<u8>>;

/// Bytes available for an inline value
pub fn inline_capacity(is_big_tiff: bool) -> usize {
    if is_big_tiff { 8 } else { 4 }
}

/// Field type used for offsets and byte counts
pub fn offset_field_type(is_big_tiff: bool) -> u16 {
    if is_big_tiff { field_types::LONG8 } else { field_types::LONG }
}

/// Update an IFD tag, replacing it if it already exists
pub fn update_ifd_tag(ifd: &mut IFD, entry: IFDEntry) {
    ifd.remove_entry(entry.tag);
    ifd.add_entry(entry);
}

/// Add a tag from already-encoded little-endian values
///
/// Values that fit the entry's value field are packed into it, anything
/// larger is stored in `external_data` and the writer patches in its offset.
#[allow(clippy::too_many_arguments)]
pub fn add_array_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    field_type: u16,
    count: u64,
    data: Vec<u8>,
    is_big_tiff: bool,
) {
    external_data.remove(&(ifd_index, tag));

    if data.len() <= inline_capacity(is_big_tiff) {
        let mut raw_value = [0u8; 8];
        raw_value[..data.len()].copy_from_slice(&data);
        let first = first_value(&data, field_type);
        trace!("Tag {} stored inline ({} bytes)", tag, data.len());
        update_ifd_tag(ifd, IFDEntry::with_raw_value(tag, field_type, count, first, raw_value));
    } else {
        trace!("Tag {} stored externally ({} bytes)", tag, data.len());
        update_ifd_tag(ifd, IFDEntry::new(tag, field_type, count, 0));
        external_data.insert((ifd_index, tag), data);
    }
}

/// Add a SHORT array tag
pub fn add_short_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    values: &[u16],
    is_big_tiff: bool,
) {
    let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    add_array_tag(ifd, external_data, ifd_index, tag, field_types::SHORT, values.len() as u64, data, is_big_tiff);
}

/// Add a DOUBLE array tag
pub fn add_double_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    values: &[f64],
    is_big_tiff: bool,
) {
    let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    add_array_tag(ifd, external_data, ifd_index, tag, field_types::DOUBLE, values.len() as u64, data, is_big_tiff);
}

/// Add a NUL-terminated ASCII tag
pub fn add_ascii_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    text: &str,
    is_big_tiff: bool,
) {
    let mut data = text.as_bytes().to_vec();
    data.push(0);
    let count = data.len() as u64;
    add_array_tag(ifd, external_data, ifd_index, tag, field_types::ASCII, count, data, is_big_tiff);
}

/// Encode offsets or byte counts with the width the file format uses
pub fn encode_offsets(values: &[u64], is_big_tiff: bool) -> Vec<u8> {
    if is_big_tiff {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    } else {
        values.iter().flat_map(|&v| (v as u32).to_le_bytes()).collect()
    }
}

/// First value of an encoded array, for `IFDEntry::value_offset` lookups
fn first_value(data: &[u8], field_type: u16) -> u64 {
    let mut buf = [0u8; 8];
    let width = match field_type {
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 | field_types::DOUBLE => 8,
        _ => 1,
    };
    let width = width.min(data.len());
    buf[..width].copy_from_slice(&data[..width]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::tags;

    #[test]
    fn test_two_shorts_stay_inline() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        add_short_tag(&mut ifd, &mut external, 0, tags::BITS_PER_SAMPLE, &[16, 16], false);

        let entry = ifd.get_entry(tags::BITS_PER_SAMPLE).unwrap();
        assert!(external.is_empty());
        assert_eq!(entry.count, 2);
        assert_eq!(&entry.raw_value[..4], &[16, 0, 16, 0]);
        assert_eq!(entry.value_offset, 16);
    }

    #[test]
    fn test_large_array_goes_external() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        add_short_tag(&mut ifd, &mut external, 0, tags::BITS_PER_SAMPLE, &[8, 8, 8], false);
        assert_eq!(external.get(&(0, tags::BITS_PER_SAMPLE)).map(Vec::len), Some(6));

        // The same three shorts fit a BigTIFF entry
        let mut big = IFD::new(0, 0);
        let mut big_external = ExternalData::new();
        add_short_tag(&mut big, &mut big_external, 0, tags::BITS_PER_SAMPLE, &[8, 8, 8], true);
        assert!(big_external.is_empty());
    }

    #[test]
    fn test_replacing_tag_drops_stale_external_data() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        add_double_tag(&mut ifd, &mut external, 0, tags::MODEL_PIXEL_SCALE_TAG, &[1.0, 1.0, 0.0], false);
        add_short_tag(&mut ifd, &mut external, 0, tags::MODEL_PIXEL_SCALE_TAG, &[1], false);
        assert!(external.is_empty());
        assert_eq!(ifd.entries.len(), 1);
    }
}
