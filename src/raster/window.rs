//! Rectangular pixel windows
//!
//! A window is addressed by its top-left corner and size in pixels, with
//! (0,0) the top-left corner of the raster. Offsets are signed so a window
//! may start left of or above the raster, which is how padded tiles are read.

/// Rectangular pixel window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Column of the top-left corner (may be negative)
    pub col_off: i64,
    /// Row of the top-left corner (may be negative)
    pub row_off: i64,
    /// Width of the window in pixels
    pub width: u32,
    /// Height of the window in pixels
    pub height: u32,
}

/// Overlap between a window and the raster bounds
///
/// `dst_*` is the position inside the window, `src_*` the position in the
/// raster; both describe the same `width` x `height` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOverlap {
    pub src_col: u32,
    pub src_row: u32,
    pub dst_col: u32,
    pub dst_row: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    /// Create a new window
    pub fn new(col_off: i64, row_off: i64, width: u32, height: u32) -> Self {
        Window { col_off, row_off, width, height }
    }

    /// The whole raster as a window
    pub fn full(width: u32, height: u32) -> Self {
        Window::new(0, 0, width, height)
    }

    /// Column immediately right of the window (exclusive)
    pub fn end_col(&self) -> i64 {
        self.col_off + self.width as i64
    }

    /// Row immediately below the window (exclusive)
    pub fn end_row(&self) -> i64 {
        self.row_off + self.height as i64
    }

    /// Part of the window that lies inside a `raster_width` x `raster_height` raster
    ///
    /// Returns `None` when the window lies entirely outside.
    pub fn overlap(&self, raster_width: u32, raster_height: u32) -> Option<WindowOverlap> {
        let start_col = self.col_off.max(0);
        let start_row = self.row_off.max(0);
        let end_col = self.end_col().min(raster_width as i64);
        let end_row = self.end_row().min(raster_height as i64);

        if start_col >= end_col || start_row >= end_row {
            return None;
        }

        Some(WindowOverlap {
            src_col: start_col as u32,
            src_row: start_row as u32,
            dst_col: (start_col - self.col_off) as u32,
            dst_row: (start_row - self.row_off) as u32,
            width: (end_col - start_col) as u32,
            height: (end_row - start_row) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_inside_raster() {
        let overlap = Window::new(10, 20, 5, 5).overlap(100, 100).unwrap();
        assert_eq!((overlap.src_col, overlap.src_row), (10, 20));
        assert_eq!((overlap.dst_col, overlap.dst_row), (0, 0));
        assert_eq!((overlap.width, overlap.height), (5, 5));
    }

    #[test]
    fn test_window_hanging_off_top_left() {
        let overlap = Window::new(-3, -2, 10, 10).overlap(100, 100).unwrap();
        assert_eq!((overlap.src_col, overlap.src_row), (0, 0));
        assert_eq!((overlap.dst_col, overlap.dst_row), (3, 2));
        assert_eq!((overlap.width, overlap.height), (7, 8));
    }

    #[test]
    fn test_window_hanging_off_bottom_right() {
        let overlap = Window::new(95, 98, 10, 10).overlap(100, 100).unwrap();
        assert_eq!((overlap.width, overlap.height), (5, 2));
    }

    #[test]
    fn test_window_outside_raster() {
        assert!(Window::new(100, 0, 10, 10).overlap(100, 100).is_none());
        assert!(Window::new(-10, 0, 10, 10).overlap(100, 100).is_none());
    }
}
