//! Pixel and map bounding boxes

use serde::{Deserialize, Serialize};

use crate::raster::GeoTransform;
use crate::tiling::errors::{TilingError, TilingResult};

/// A point in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    pub fn new(x: f64, y: f64) -> Self {
        MapPoint { x, y }
    }
}

/// Axis-aligned box in tile pixel coordinates
///
/// `x2` and `y2` are exclusive, so a box covering a whole `w` x `h` tile
/// is `(0, 0, w, h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    /// Create a box, requiring `x1 < x2 <= tile_width` and `y1 < y2 <= tile_height`
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32, tile_width: u32, tile_height: u32) -> TilingResult<Self> {
        if x1 >= x2 || y1 >= y2 || x2 > tile_width || y2 > tile_height {
            return Err(TilingError::InvalidGeometry(format!(
                "box ({}, {}, {}, {}) is empty or outside a {}x{} tile",
                x1, y1, x2, y2, tile_width, tile_height
            )));
        }
        Ok(PixelBox { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// As `[x1, y1, x2, y2]`
    pub fn to_array(&self) -> [u32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// A pixel box together with its map footprint
///
/// The map corners are always derived from the pixel box and the tile
/// transform. Only the two corners are transformed: for transforms with
/// rotation or shear they do not bound the rotated footprint of the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pixel: PixelBox,
    top_left: MapPoint,
    bottom_right: MapPoint,
}

impl BoundingBox {
    /// Map a pixel box through a tile transform
    pub fn from_pixel(pixel: PixelBox, transform: &GeoTransform) -> Self {
        let (x1, y1) = transform.apply(pixel.x1 as f64, pixel.y1 as f64);
        let (x2, y2) = transform.apply(pixel.x2 as f64, pixel.y2 as f64);
        BoundingBox {
            pixel,
            top_left: MapPoint::new(x1, y1),
            bottom_right: MapPoint::new(x2, y2),
        }
    }

    pub fn pixel(&self) -> &PixelBox {
        &self.pixel
    }

    pub fn top_left(&self) -> MapPoint {
        self.top_left
    }

    pub fn bottom_right(&self) -> MapPoint {
        self.bottom_right
    }
}
