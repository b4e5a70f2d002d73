//! Utility modules for common functionality
//!
//! Run logging, progress reporting and the low-level helpers shared by the
//! TIFF reader and writer.

pub mod logger;
pub mod progress;
pub(crate) mod tiff_utils;
pub(crate) mod write_utils;
pub(crate) mod ifd_utils;
pub(crate) mod format_utils;
pub(crate) mod tag_utils;
pub(crate) mod image_extraction_utils;
