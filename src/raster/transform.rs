//! Affine pixel to map transform
//!
//! Coefficients follow the GDAL ordering
//! `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`:
//!
//! ```text
//! x = origin_x + col * pixel_width + row * row_rotation
//! y = origin_y + col * col_rotation + row * pixel_height
//! ```

use serde::{Deserialize, Serialize};

/// Tolerance below which rotation terms count as zero
const ROTATION_EPSILON: f64 = 1e-12;

/// Affine transformation mapping pixel (col, row) to map (x, y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// X shift per row (usually 0)
    pub row_rotation: f64,
    /// Y coordinate of the upper-left corner of pixel (0, 0)
    pub origin_y: f64,
    /// Y shift per column (usually 0)
    pub col_rotation: f64,
    /// Pixel height (cell size in Y direction, negative for north-up)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a north-up transform without rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Pixel coordinates as map coordinates, used for rasters without georeferencing
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Create from GDAL-style array
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map coordinates of the pixel-grid point (col, row)
    ///
    /// Integer inputs address pixel corners, so `apply(0.0, 0.0)` is the
    /// upper-left corner of the raster.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Transform of a window whose top-left pixel is (col_off, row_off) in this raster
    ///
    /// Offsets may be negative for windows that start in padding.
    pub fn translate(&self, col_off: f64, row_off: f64) -> Self {
        let (origin_x, origin_y) = self.apply(col_off, row_off);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Whether rotation or shear terms are present
    pub fn has_rotation(&self) -> bool {
        self.row_rotation.abs() > ROTATION_EPSILON || self.col_rotation.abs() > ROTATION_EPSILON
    }

    /// Whether this is the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Build from GeoTIFF ModelTiepoint and ModelPixelScale values
    ///
    /// Only the first tiepoint is used. The tiepoint may anchor any raster
    /// position (I, J), not just the corner.
    pub fn from_tiepoint_and_scale(tiepoint: &[f64], pixel_scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || pixel_scale.len() < 2 {
            return None;
        }
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (x, y) = (tiepoint[3], tiepoint[4]);
        let (scale_x, scale_y) = (pixel_scale[0], pixel_scale[1]);

        Some(Self::new(x - i * scale_x, y + j * scale_y, scale_x, -scale_y))
    }

    /// Build from the 16 values of a GeoTIFF ModelTransformation matrix
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 16 {
            return None;
        }
        Some(Self {
            origin_x: matrix[3],
            pixel_width: matrix[0],
            row_rotation: matrix[1],
            origin_y: matrix[7],
            col_rotation: matrix[4],
            pixel_height: matrix[5],
        })
    }

    /// ModelTransformation matrix (row-major 4x4) for this transform
    pub fn to_model_transformation(&self) -> [f64; 16] {
        [
            self.pixel_width, self.row_rotation, 0.0, self.origin_x,
            self.col_rotation, self.pixel_height, 0.0, self.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    /// Whether tiepoint + pixel scale can express this transform exactly
    ///
    /// GeoTIFF pixel scales are positive by convention, so only north-up
    /// transforms without rotation qualify.
    pub fn is_tiepoint_expressible(&self) -> bool {
        !self.has_rotation() && self.pixel_height < 0.0 && self.pixel_width > 0.0
    }

    /// Tiepoint anchoring raster (0, 0) to the origin
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// ModelPixelScale values (positive y scale)
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width, -self.pixel_height, 0.0]
    }

    /// Coefficient-wise comparison within `tolerance`
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_translate_matches_parent_apply() {
        let parent = GeoTransform::new(500_000.0, 4_200_000.0, 0.5, -0.5);
        for &(col, row) in &[(0.0, 0.0), (1724.0, 926.0), (13.0, 2000.0)] {
            let tile = parent.translate(col, row);
            let (tx, ty) = tile.apply(0.0, 0.0);
            let (px, py) = parent.apply(col, row);
            assert!((tx - px).abs() < EPS);
            assert!((ty - py).abs() < EPS);
        }
    }

    #[test]
    fn test_translate_with_rotation() {
        let parent = GeoTransform::from_gdal([10.0, 2.0, 0.25, 50.0, -0.125, -2.0]);
        let tile = parent.translate(7.0, 3.0);
        assert_eq!(tile.pixel_width, parent.pixel_width);
        assert_eq!(tile.row_rotation, parent.row_rotation);
        let (tx, ty) = tile.apply(2.0, 5.0);
        let (px, py) = parent.apply(9.0, 8.0);
        assert!((tx - px).abs() < EPS);
        assert!((ty - py).abs() < EPS);
    }

    #[test]
    fn test_negative_offsets_move_origin_back() {
        let parent = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let padded = parent.translate(-3.0, -2.0);
        assert!((padded.origin_x - 70.0).abs() < EPS);
        assert!((padded.origin_y - 220.0).abs() < EPS);
    }

    #[test]
    fn test_tiepoint_round_trip() {
        let gt = GeoTransform::new(300.0, 900.0, 30.0, -30.0);
        assert!(gt.is_tiepoint_expressible());
        let rebuilt = GeoTransform::from_tiepoint_and_scale(&gt.tiepoint(), &gt.pixel_scale()).unwrap();
        assert!(rebuilt.approx_eq(&gt, EPS));
    }

    #[test]
    fn test_tiepoint_off_corner() {
        // Tiepoint anchors pixel (10, 20) rather than the corner
        let tiepoint = [10.0, 20.0, 0.0, 1000.0, 2000.0, 0.0];
        let scale = [2.0, 4.0, 0.0];
        let gt = GeoTransform::from_tiepoint_and_scale(&tiepoint, &scale).unwrap();
        let (x, y) = gt.apply(10.0, 20.0);
        assert!((x - 1000.0).abs() < EPS);
        assert!((y - 2000.0).abs() < EPS);
    }

    #[test]
    fn test_model_transformation_round_trip() {
        let gt = GeoTransform::from_gdal([1.0, 0.5, 0.1, 2.0, 0.2, -0.5]);
        assert!(gt.has_rotation());
        assert!(!gt.is_tiepoint_expressible());
        let rebuilt = GeoTransform::from_model_transformation(&gt.to_model_transformation()).unwrap();
        assert_eq!(rebuilt, gt);
    }
}
