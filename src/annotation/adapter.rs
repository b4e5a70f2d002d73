//! Detector boundary
//!
//! A detector looks at one tile and returns pixel boxes. The engine only
//! cares about the boxes; what produced them is behind `AnnotationAdapter`.
//! `SyntheticDetector` is a stand-in that scatters random boxes and is
//! meant to be replaced by a real model.

use log::debug;

use crate::raster::Raster;
use crate::tiling::errors::{TilingError, TilingResult};

use super::bbox::PixelBox;

/// Produces pixel boxes for a tile
pub trait AnnotationAdapter {
    /// Boxes found in `tile`, in the tile's pixel coordinates
    fn annotate(&mut self, tile: &Raster) -> TilingResult<Vec<PixelBox>>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Random boxes for exercising the pipeline
pub struct SyntheticDetector {
    rng: fastrand::Rng,
    count: usize,
    min_size: u32,
    max_size: u32,
}

impl SyntheticDetector {
    pub const DEFAULT_COUNT: usize = 5;
    pub const DEFAULT_MIN_SIZE: u32 = 20;
    pub const DEFAULT_MAX_SIZE: u32 = 50;

    /// Detector with default settings; a seed makes the boxes reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        SyntheticDetector {
            rng,
            count: Self::DEFAULT_COUNT,
            min_size: Self::DEFAULT_MIN_SIZE,
            max_size: Self::DEFAULT_MAX_SIZE,
        }
    }

    /// Boxes per tile
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Range of box side lengths, inclusive
    pub fn with_size_range(mut self, min_size: u32, max_size: u32) -> TilingResult<Self> {
        if min_size == 0 || min_size > max_size {
            return Err(TilingError::InvalidConfiguration(format!(
                "box size range {}..={} must be positive and non-empty", min_size, max_size
            )));
        }
        self.min_size = min_size;
        self.max_size = max_size;
        Ok(self)
    }
}

impl AnnotationAdapter for SyntheticDetector {
    fn annotate(&mut self, tile: &Raster) -> TilingResult<Vec<PixelBox>> {
        let (w, h) = (tile.width(), tile.height());
        if w < self.min_size || h < self.min_size {
            debug!("Tile {}x{} is smaller than the minimum box size {}", w, h, self.min_size);
            return Ok(Vec::new());
        }

        let mut boxes = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let box_w = self.rng.u32(self.min_size..=self.max_size.min(w));
            let box_h = self.rng.u32(self.min_size..=self.max_size.min(h));
            let x1 = self.rng.u32(0..=w - box_w);
            let y1 = self.rng.u32(0..=h - box_h);
            boxes.push(PixelBox::new(x1, y1, x1 + box_w, y1 + box_h, w, h)?);
        }
        Ok(boxes)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Outline drawn around burned boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outline {
    pub thickness: u32,
}

impl Default for Outline {
    fn default() -> Self {
        Outline { thickness: 3 }
    }
}

/// Draw box outlines into the tile pixels
///
/// Rasters with three or more bands get red outlines (datatype maximum in
/// band 0, zero in bands 1 and 2, further bands untouched). Other rasters
/// get the datatype maximum in every band. Outlines grow inwards from the
/// box edges.
pub fn burn_boxes(raster: &mut Raster, boxes: &[PixelBox], outline: Outline) {
    let max = raster.data_type().max_value_le();
    let zero = vec![0u8; max.len()];
    let colors: Vec<(u16, &[u8])> = if raster.bands() >= 3 {
        vec![(0, &max[..]), (1, &zero[..]), (2, &zero[..])]
    } else {
        (0..raster.bands()).map(|b| (b, &max[..])).collect()
    };

    let (w, h) = (raster.width(), raster.height());
    for pixel_box in boxes {
        let x2 = pixel_box.x2.min(w);
        let y2 = pixel_box.y2.min(h);
        let t = outline.thickness.max(1);

        for row in pixel_box.y1..y2 {
            let edge_row = row < pixel_box.y1 + t || row + t >= y2;
            for col in pixel_box.x1..x2 {
                if edge_row || col < pixel_box.x1 + t || col + t >= x2 {
                    for &(band, value) in &colors {
                        raster.set_sample(band, row, col, value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn test_synthetic_boxes_fit_the_tile() {
        let tile = Raster::new(120, 80, 3, DataType::U8);
        let mut detector = SyntheticDetector::new(Some(7));
        for _ in 0..50 {
            let boxes = detector.annotate(&tile).unwrap();
            assert_eq!(boxes.len(), 5);
            for b in boxes {
                assert!(b.x2 <= 120 && b.y2 <= 80);
                assert!((20..=50).contains(&b.width()) && (20..=50).contains(&b.height()));
            }
        }
    }

    #[test]
    fn test_seeded_detector_is_reproducible() {
        let tile = Raster::new(64, 64, 1, DataType::U8);
        let a = SyntheticDetector::new(Some(42)).annotate(&tile).unwrap();
        let b = SyntheticDetector::new(Some(42)).annotate(&tile).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_tiles_get_no_boxes() {
        let tile = Raster::new(10, 100, 1, DataType::U8);
        assert!(SyntheticDetector::new(Some(1)).annotate(&tile).unwrap().is_empty());

        // A tile exactly the minimum size can only hold full-size boxes
        let tile = Raster::new(20, 20, 1, DataType::U8);
        let boxes = SyntheticDetector::new(Some(1)).annotate(&tile).unwrap();
        assert!(boxes.iter().all(|b| b.to_array() == [0, 0, 20, 20]));
    }

    #[test]
    fn test_size_range_validation() {
        assert!(SyntheticDetector::new(None).with_size_range(0, 5).is_err());
        assert!(SyntheticDetector::new(None).with_size_range(10, 5).is_err());
        assert!(SyntheticDetector::new(None).with_size_range(4, 4).is_ok());
    }

    #[test]
    fn test_burn_red_outline() {
        let mut tile = Raster::new(20, 20, 3, DataType::U8);
        tile.data_mut().fill(100);
        let b = PixelBox::new(2, 2, 12, 12, 20, 20).unwrap();
        burn_boxes(&mut tile, &[b], Outline::default());

        assert_eq!(tile.sample(0, 2, 2), &[255]);
        assert_eq!(tile.sample(1, 2, 2), &[0]);
        assert_eq!(tile.sample(0, 4, 7), &[255]);
        assert_eq!(tile.sample(0, 11, 11), &[255]);
        assert_eq!(tile.sample(0, 9, 9), &[255]);
        // Inside the outline and outside the box stay untouched
        assert_eq!(tile.sample(0, 7, 7), &[100]);
        assert_eq!(tile.sample(0, 12, 12), &[100]);
    }

    #[test]
    fn test_burn_single_band_uses_max() {
        let mut tile = Raster::new(10, 10, 1, DataType::U16);
        let b = PixelBox::new(0, 0, 10, 10, 10, 10).unwrap();
        burn_boxes(&mut tile, &[b], Outline { thickness: 1 });
        assert_eq!(tile.sample(0, 0, 5), &[255, 255]);
        assert_eq!(tile.sample(0, 9, 9), &[255, 255]);
        assert_eq!(tile.sample(0, 5, 5), &[0, 0]);
    }
}
