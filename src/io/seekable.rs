//! Readers the TIFF layer can parse from

use std::io::{Read, Seek};

/// Anything that can be read and repositioned: buffered files in normal
/// use, `Cursor<Vec<u8>>` in tests
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
