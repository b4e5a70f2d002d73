//! Hand-built TIFF headers for reader tests
//!
//! Each buffer holds a header and one IFD with ImageWidth and ImageLength
//! as LONG values.

use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian, WriteBytesExt};

fn classic<B: byteorder::ByteOrder>(marker: [u8; 2], width: u32, height: u32) -> Cursor<Vec<u8>> {
    let mut buffer = marker.to_vec();
    buffer.write_u16::<B>(42).unwrap();
    buffer.write_u32::<B>(8).unwrap();

    buffer.write_u16::<B>(2).unwrap();
    for (tag, value) in [(256u16, width), (257, height)] {
        buffer.write_u16::<B>(tag).unwrap();
        buffer.write_u16::<B>(4).unwrap();
        buffer.write_u32::<B>(1).unwrap();
        buffer.write_u32::<B>(value).unwrap();
    }
    buffer.write_u32::<B>(0).unwrap();
    Cursor::new(buffer)
}

/// Little-endian classic TIFF, 800x600
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    classic::<LittleEndian>(*b"II", 800, 600)
}

/// Big-endian classic TIFF, 1824x1026
pub fn create_test_big_endian_buffer() -> Cursor<Vec<u8>> {
    classic::<BigEndian>(*b"MM", 1824, 1026)
}

/// Little-endian BigTIFF, 1024x768
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = b"II".to_vec();
    buffer.write_u16::<LittleEndian>(43).unwrap();
    buffer.write_u16::<LittleEndian>(8).unwrap();
    buffer.write_u16::<LittleEndian>(0).unwrap();
    buffer.write_u64::<LittleEndian>(16).unwrap();

    buffer.write_u64::<LittleEndian>(2).unwrap();
    for (tag, value) in [(256u16, 1024u64), (257, 768)] {
        buffer.write_u16::<LittleEndian>(tag).unwrap();
        buffer.write_u16::<LittleEndian>(4).unwrap();
        buffer.write_u64::<LittleEndian>(1).unwrap();
        // LONG values sit in the low four bytes of the eight byte field
        let mut field = [0u8; 8];
        LittleEndian::write_u32(&mut field[..4], value as u32);
        buffer.extend_from_slice(&field);
    }
    buffer.write_u64::<LittleEndian>(0).unwrap();
    Cursor::new(buffer)
}
