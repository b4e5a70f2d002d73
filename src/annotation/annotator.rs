//! Annotation of a tile directory

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::raster::{open_raster, write_raster, WriteOptions};
use crate::tiling::errors::TilingResult;
use crate::tiling::manifest::TileManifest;
use crate::tiling::naming::TileNamePattern;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

use super::adapter::{burn_boxes, AnnotationAdapter, Outline};
use super::bbox::{BoundingBox, PixelBox};
use super::export::AnnotationRecord;

/// Annotation settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateOptions {
    /// Draw boxes into tile copies written to the output directory
    pub burn: bool,
    pub outline: Outline,
    pub write: WriteOptions,
    pub show_progress: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        AnnotateOptions {
            burn: true,
            outline: Outline::default(),
            write: WriteOptions::default(),
            show_progress: false,
        }
    }
}

/// Runs a detector over every tile of a set
pub struct Annotator<'a> {
    options: AnnotateOptions,
    logger: Option<&'a Logger>,
}

impl<'a> Annotator<'a> {
    pub fn new(options: AnnotateOptions) -> Self {
        Annotator { options, logger: None }
    }

    pub fn with_logger(mut self, logger: &'a Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Annotate the tiles of `pattern` in `tile_dir`
    ///
    /// # Arguments
    /// * `tile_dir` - Directory holding the tiles
    /// * `pattern` - Tile names to pick up
    /// * `output_dir` - Where burned copies go, under their original names;
    ///   nothing is written when `None` or when burning is off
    /// * `adapter` - Detector producing the boxes
    ///
    /// # Returns
    /// One record per box, in tile order
    pub fn annotate_directory(
        &self,
        tile_dir: &Path,
        pattern: &TileNamePattern,
        output_dir: Option<&Path>,
        adapter: &mut dyn AnnotationAdapter,
    ) -> TilingResult<Vec<AnnotationRecord>> {
        let tiles = pattern.discover(tile_dir)?;
        let manifest = TileManifest::load_if_present(&tile_dir.join(pattern.manifest_name()))?;
        let burn_dir = output_dir.filter(|_| self.options.burn);
        if let Some(dir) = burn_dir {
            fs::create_dir_all(dir)?;
            self.copy_manifest(tile_dir, dir, pattern)?;
        }

        info!("Annotating {} tile(s) in {} with the {} detector", tiles.len(), tile_dir.display(), adapter.name());
        let progress = ProgressTracker::with_visibility(tiles.len() as u64, "Annotating", self.options.show_progress);
        let mut rotation_reported = false;
        let mut records = Vec::new();

        for tile in &tiles {
            let mut raster = open_raster(&tile.path)?.read_all()?;
            let mut transform = *raster.transform();
            if transform.is_identity() && raster.georef().is_empty() {
                if let Some(recorded) = manifest.as_ref().and_then(|m| m.tile_transform(&tile.file_name)) {
                    transform = recorded;
                }
            }
            if transform.has_rotation() && !rotation_reported {
                warn!("{} has a rotated transform, map boxes only cover the transformed corners", tile.file_name);
                rotation_reported = true;
            }

            // Detectors may build boxes without `PixelBox::new`
            let boxes = adapter
                .annotate(&raster)?
                .into_iter()
                .map(|b| PixelBox::new(b.x1, b.y1, b.x2, b.y2, raster.width(), raster.height()))
                .collect::<TilingResult<Vec<_>>>()?;
            debug!("{}: {} box(es)", tile.file_name, boxes.len());
            records.extend(boxes.iter().map(|pixel| {
                AnnotationRecord::new(tile.file_name.clone(), &BoundingBox::from_pixel(*pixel, &transform))
            }));

            if let Some(dir) = burn_dir {
                burn_boxes(&mut raster, &boxes, self.options.outline);
                let path = dir.join(&tile.file_name);
                write_raster(&raster, &path, &self.options.write)?;
                if let Some(logger) = self.logger {
                    logger.log(&format!("Annotated {} ({} boxes)", path.display(), boxes.len()))?;
                }
            }
            progress.increment(1);
        }
        progress.finish();

        info!("Found {} box(es) in {} tile(s)", records.len(), tiles.len());
        Ok(records)
    }

    /// Keep the manifest with the burned tiles so they stitch the same way
    fn copy_manifest(&self, tile_dir: &Path, output_dir: &Path, pattern: &TileNamePattern) -> TilingResult<()> {
        let name = pattern.manifest_name();
        let source = tile_dir.join(&name);
        let target = output_dir.join(&name);
        if source.is_file() && source != target {
            fs::copy(&source, &target)?;
            debug!("Copied {} to {}", source.display(), target.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::adapter::SyntheticDetector;
    use crate::raster::{DataType, GeoTransform, Raster};
    use crate::tiling::errors::TilingError;

    fn write_tiles(dir: &Path) {
        for (row, col) in [(0u32, 0u32), (0, 64), (64, 0)] {
            let raster = Raster::new(64, 64, 3, DataType::U8)
                .with_transform(GeoTransform::new(col as f64, -(row as f64), 1.0, -1.0));
            write_raster(&raster, &dir.join(format!("tile_{}_{}.tif", row, col)), &WriteOptions::default()).unwrap();
        }
    }

    #[test]
    fn test_annotate_directory_burns_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("annotated");
        write_tiles(dir.path());

        let pattern = TileNamePattern::new("tile", "tif");
        let mut detector = SyntheticDetector::new(Some(3)).with_count(2);
        let records = Annotator::new(AnnotateOptions::default())
            .annotate_directory(dir.path(), &pattern, Some(out.as_path()), &mut detector)
            .unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(records[0].image, "tile_0_0.tif");
        assert_eq!(records[5].image, "tile_64_0.tif");
        for record in &records {
            let [x1, y1, ..] = record.pixel_bbox;
            let (row, col) = pattern.parse(&record.image).unwrap();
            assert_eq!(record.gps_bbox.top_left, [(col + x1) as f64, -((row + y1) as f64)]);
        }

        let burned = open_raster(&out.join("tile_0_0.tif")).unwrap().read_all().unwrap();
        let [x1, y1, ..] = records[0].pixel_bbox;
        assert_eq!(burned.sample(0, y1, x1), &[255]);
        assert_eq!(pattern.discover(&out).unwrap().len(), 3);
    }

    struct OversizedDetector;

    impl AnnotationAdapter for OversizedDetector {
        fn annotate(&mut self, tile: &Raster) -> TilingResult<Vec<PixelBox>> {
            Ok(vec![PixelBox { x1: 0, y1: 0, x2: tile.width() + 1, y2: 1 }])
        }

        fn name(&self) -> &str {
            "oversized"
        }
    }

    #[test]
    fn test_boxes_outside_the_tile_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_tiles(dir.path());

        let result = Annotator::new(AnnotateOptions::default())
            .annotate_directory(dir.path(), &TileNamePattern::new("tile", "tif"), None, &mut OversizedDetector);
        assert!(matches!(result, Err(TilingError::InvalidGeometry(_))));
    }

    #[test]
    fn test_unreferenced_tiles_use_manifest_transforms() {
        use crate::tiling::tiler::{TileOptions, Tiler};
        use crate::raster::RasterFormat;

        let dir = tempfile::tempdir().unwrap();
        let source = Raster::new(64, 64, 1, DataType::U8)
            .with_transform(GeoTransform::new(600000.0, 5000000.0, 10.0, -10.0));
        let input = dir.path().join("scene.tif");
        write_raster(&source, &input, &WriteOptions::default()).unwrap();

        let tiles = dir.path().join("tiles");
        let options = TileOptions { format: RasterFormat::Png, ..TileOptions::square(32) };
        Tiler::new(options).unwrap().tile_file(&input, &tiles).unwrap();

        let mut detector = SyntheticDetector::new(Some(5)).with_count(1);
        let records = Annotator::new(AnnotateOptions::default())
            .annotate_directory(&tiles, &TileNamePattern::new("tile", "png"), None, &mut detector)
            .unwrap();
        assert_eq!(records.len(), 4);
        for record in &records {
            let [x1, y1, ..] = record.pixel_bbox;
            let (row, col) = TileNamePattern::new("tile", "png").parse(&record.image).unwrap();
            let expected = [600000.0 + 10.0 * (col + x1) as f64, 5000000.0 - 10.0 * (row + y1) as f64];
            assert_eq!(record.gps_bbox.top_left, expected);
        }
    }

    #[test]
    fn test_no_burn_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("annotated");
        write_tiles(dir.path());

        let options = AnnotateOptions { burn: false, ..AnnotateOptions::default() };
        let records = Annotator::new(options)
            .annotate_directory(dir.path(), &TileNamePattern::new("tile", "tif"), Some(out.as_path()), &mut SyntheticDetector::new(Some(1)))
            .unwrap();
        assert_eq!(records.len(), 15);
        assert!(!out.exists());
    }
}
