//! Low-level reading for the TIFF layer
//!
//! `seekable` abstracts over files and in-memory buffers, `byte_order`
//! decodes integers and floats in the file's endianness.

pub mod seekable;
pub mod byte_order;
