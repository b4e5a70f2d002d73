//! Tests for the TIFF types module

use crate::tiff::errors::TiffError;
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(false);
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 0);
    assert!(tiff.main_ifd().is_none());
    assert!(matches!(tiff.require_main_ifd(), Err(TiffError::GenericError(_))));
}

#[test]
fn test_main_ifd_is_first() {
    let mut tiff = TIFF::new(true);

    let mut main_ifd = IFD::new(0, 16);
    main_ifd.add_entry(IFDEntry::new(256, 4, 1, 1824));
    main_ifd.add_entry(IFDEntry::new(257, 4, 1, 1026));
    main_ifd.add_entry(IFDEntry::new(277, 3, 1, 3));
    tiff.ifds.push(main_ifd);

    // A second directory, e.g. a mask, must not shadow the first
    let mut mask_ifd = IFD::new(1, 100);
    mask_ifd.add_entry(IFDEntry::new(254, 4, 1, 4));
    mask_ifd.add_entry(IFDEntry::new(256, 4, 1, 10));
    mask_ifd.add_entry(IFDEntry::new(257, 4, 1, 10));
    tiff.ifds.push(mask_ifd);

    assert!(tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 2);

    let main = tiff.require_main_ifd().unwrap();
    assert_eq!(main.get_dimensions(), Some((1824, 1026)));
    assert_eq!(main.get_samples_per_pixel(), 3);
    assert!(!main.is_tiled());
}

#[test]
fn test_entry_replacement() {
    let mut ifd = IFD::new(0, 8);
    ifd.add_entry(IFDEntry::new(256, 4, 1, 100));
    ifd.add_entry(IFDEntry::new(256, 4, 1, 200));
    assert_eq!(ifd.get_tag_value(256), Some(200));

    ifd.remove_entry(256);
    assert!(!ifd.has_tag(256));
    // Samples per pixel defaults to one when the tag is absent
    assert_eq!(ifd.get_samples_per_pixel(), 1);
}
