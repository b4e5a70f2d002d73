//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given compression code
    ///
    /// The pre-standard Deflate code 32946 decodes like Adobe Deflate.
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match code {
            c if c == compression::NONE as u64 => Ok(Box::new(UncompressedHandler)),
            c if c == compression::DEFLATE as u64 || c == compression::DEFLATE_OLD as u64 => {
                Ok(Box::new(AdobeDeflateHandler))
            }
            c if c == compression::ZSTD as u64 => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(code)),
        }
    }
}
