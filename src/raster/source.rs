//! Raster format strategy traits
//!
//! Each file format implements `RasterSource` for reading and `RasterSink`
//! for writing; `RasterFormatFactory` picks the implementation from the
//! file extension.

use std::path::Path;

use crate::tiling::errors::TilingResult;

use super::raster::{Raster, RasterInfo};
use super::window::Window;
use super::WriteOptions;

/// Readable raster file
pub trait RasterSource {
    /// Header-level description, available without reading pixels
    fn info(&self) -> &RasterInfo;

    /// Read a window of all bands
    ///
    /// Pixels of the window outside the raster read as zero. The returned
    /// raster carries the source transform translated to the window origin.
    fn read_window(&mut self, window: Window) -> TilingResult<Raster>;

    /// Read the whole raster
    fn read_all(&mut self) -> TilingResult<Raster> {
        let info = self.info();
        let window = Window::full(info.width, info.height);
        self.read_window(window)
    }
}

/// Writable raster format
pub trait RasterSink {
    /// Write `raster` to `path`, returning the size of the file in bytes
    fn write(&self, raster: &Raster, path: &Path, options: &WriteOptions) -> TilingResult<u64>;

    /// File extension used for this format
    fn extension(&self) -> &'static str;
}
