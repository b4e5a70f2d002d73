//! TIFF writing utilities
//!
//! Alignment and entry ordering helpers for the file writer.

use std::collections::BTreeMap;
use std::io::Write;

use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFDEntry;

/// Next word-aligned offset at or after `offset`
pub fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Write the zero bytes that word-align a block of `data_len` bytes
pub fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = (4 - (data_len % 4)) % 4;
    if padding > 0 {
        writer.write_all(&[0u8; 3][..padding])?;
    }
    Ok(())
}

/// Entries sorted by tag with one entry per tag
///
/// IFD entries must be written in ascending tag order. When a tag was
/// added more than once, the last entry wins.
pub fn get_unique_sorted_entries(entries: &[IFDEntry]) -> Vec<IFDEntry> {
    let mut by_tag = BTreeMap::new();
    for entry in entries {
        by_tag.insert(entry.tag, entry.clone());
    }
    by_tag.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(align_to_4_bytes(0), 0);
        assert_eq!(align_to_4_bytes(5), 8);
        assert_eq!(align_to_4_bytes(8), 8);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let entries = vec![
            IFDEntry::new(259, 3, 1, 1),
            IFDEntry::new(256, 4, 1, 10),
            IFDEntry::new(259, 3, 1, 8),
        ];
        let sorted = get_unique_sorted_entries(&entries);
        assert_eq!(sorted.iter().map(|e| e.tag).collect::<Vec<_>>(), vec![256, 259]);
        assert_eq!(sorted[1].value_offset, 8);
    }
}
