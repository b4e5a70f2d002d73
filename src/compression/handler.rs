//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for one strip/tile codec
pub trait CompressionHandler: Send + Sync {
    /// Decode one block
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Encode one block
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Display name of the codec
    fn name(&self) -> &'static str;

    /// Value written to the Compression tag
    fn code(&self) -> u64;
}
