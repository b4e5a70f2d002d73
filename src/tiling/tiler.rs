//! Tile materialization
//!
//! The tiler walks a `GridPlanner` plan, reads each tile window from the
//! source raster and writes it to its own file with a translated transform.
//! Only one tile is held in memory at a time.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::raster::{open_raster, RasterFormat, RasterFormatFactory, RasterSource, WriteOptions};
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

use super::errors::TilingResult;
use super::grid::{GridPlanner, TilingStrategy};
use super::manifest::{TileManifest, TileRecord};
use super::naming::{validate_prefix, TileNamePattern};

/// Tile geometry and output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileOptions {
    pub tile_height: u32,
    pub tile_width: u32,
    /// Vertical step between tile origins, tile height when unset
    pub stride_h: Option<u32>,
    /// Horizontal step between tile origins, tile width when unset
    pub stride_w: Option<u32>,
    pub strategy: TilingStrategy,
    pub prefix: String,
    pub format: RasterFormat,
    #[serde(skip)]
    pub write: WriteOptions,
    #[serde(skip)]
    pub show_progress: bool,
}

impl Default for TileOptions {
    fn default() -> Self {
        TileOptions {
            tile_height: 512,
            tile_width: 512,
            stride_h: None,
            stride_w: None,
            strategy: TilingStrategy::default(),
            prefix: "tile".to_string(),
            format: RasterFormat::GeoTiff,
            write: WriteOptions::default(),
            show_progress: false,
        }
    }
}

impl TileOptions {
    /// Square tiles of `size` pixels, default everything else
    pub fn square(size: u32) -> Self {
        TileOptions {
            tile_height: size,
            tile_width: size,
            ..Self::default()
        }
    }

    /// Names of the tiles this configuration writes
    pub fn pattern(&self) -> TileNamePattern {
        TileNamePattern::new(self.prefix.clone(), self.format.extension())
    }
}

/// Writes the tiles of a raster to a directory
pub struct Tiler<'a> {
    options: TileOptions,
    logger: Option<&'a Logger>,
}

impl<'a> Tiler<'a> {
    /// Create a tiler, rejecting prefixes that would break tile names
    pub fn new(options: TileOptions) -> TilingResult<Self> {
        validate_prefix(&options.prefix)?;
        Ok(Tiler { options, logger: None })
    }

    /// Record every written tile in a run log
    pub fn with_logger(mut self, logger: &'a Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn options(&self) -> &TileOptions {
        &self.options
    }

    /// Grid for a raster of the given size
    pub fn planner(&self, raster_height: u32, raster_width: u32) -> TilingResult<GridPlanner> {
        let o = &self.options;
        GridPlanner::new(
            raster_height,
            raster_width,
            o.tile_height,
            o.tile_width,
            o.stride_h,
            o.stride_w,
            o.strategy,
        )
    }

    /// Write one file per planned tile into `output_dir`
    ///
    /// # Arguments
    /// * `source` - Raster to cut; read one window at a time
    /// * `planner` - Grid to cut along
    /// * `output_dir` - Target directory, created if missing
    ///
    /// # Returns
    /// The written tiles in plan order
    pub fn slice(&self, source: &mut dyn RasterSource, planner: &GridPlanner, output_dir: &Path) -> TilingResult<Vec<TileRecord>> {
        fs::create_dir_all(output_dir)?;

        let pattern = self.options.pattern();
        let sink = RasterFormatFactory::sink(self.options.format);
        let parent = source.info().transform;
        let progress = ProgressTracker::with_visibility(planner.tile_count() as u64, "Tiling", self.options.show_progress);

        let mut records = Vec::with_capacity(planner.tile_count());
        for tile in planner.plan() {
            let transform = planner.tile_transform(&parent, &tile);
            let mut raster = source.read_window(planner.window(&tile))?;
            raster.set_transform(transform);

            let file_name = pattern.format(tile.origin_row, tile.origin_col);
            let path = output_dir.join(&file_name);
            let size = sink.write(&raster, &path, &self.options.write)?;
            debug!("Tile {:?} -> {}", tile, path.display());
            if let Some(logger) = self.logger {
                logger.log(&format!("Wrote tile {} ({}x{} at row {}, col {}, {} bytes)",
                                    path.display(), tile.width, tile.height, tile.origin_row, tile.origin_col, size))?;
            }

            records.push(TileRecord { file_name, descriptor: tile, transform });
            progress.increment(1);
        }
        progress.finish();

        Ok(records)
    }

    /// Tile a raster file and write the manifest next to the tiles
    pub fn tile_file(&self, input: &Path, output_dir: &Path) -> TilingResult<TileManifest> {
        let mut source = open_raster(input)?;
        let info = source.info().clone();
        let planner = self.planner(info.height, info.width)?;
        info!("Tiling {} ({}x{}) into {} {} tile(s) of {}x{}",
              input.display(), info.width, info.height, planner.tile_count(), planner.strategy(),
              self.options.tile_height, self.options.tile_width);

        let tiles = self.slice(source.as_mut(), &planner, output_dir)?;

        let (stride_h, stride_w) = planner.stride();
        let manifest = TileManifest {
            source: input.to_path_buf(),
            source_width: info.width,
            source_height: info.height,
            strategy: planner.strategy(),
            tile_size: [self.options.tile_height, self.options.tile_width],
            stride: [stride_h, stride_w],
            padding: planner.padding(),
            bands: info.bands,
            data_type: info.data_type,
            transform: info.transform,
            epsg: info.georef.epsg(),
            tiles,
        };
        let manifest_path = self.manifest_path(output_dir);
        manifest.save(&manifest_path)?;
        info!("Wrote {} tile(s) and {}", manifest.tiles.len(), manifest_path.display());

        Ok(manifest)
    }

    /// Where the manifest of this tile set is written
    pub fn manifest_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.options.pattern().manifest_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{write_raster, DataType, GeoReference, GeoTransform, Raster};
    use crate::tiling::errors::TilingError;

    fn write_source(dir: &Path, width: u32, height: u32, bands: u16) -> PathBuf {
        let len = width as usize * height as usize * bands as usize;
        let data = (0..len).map(|i| (i % 253) as u8).collect();
        let raster = Raster::from_data(width, height, bands, DataType::U8, data)
            .unwrap()
            .with_transform(GeoTransform::new(300000.0, 5000000.0, 10.0, -10.0))
            .with_georef(GeoReference::from_epsg(32632));
        let path = dir.join("source.tif");
        write_raster(&raster, &path, &WriteOptions::default()).unwrap();
        path
    }

    #[test]
    fn test_tile_file_writes_tiles_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_source(dir.path(), 50, 30, 2);
        let out = dir.path().join("tiles");

        let tiler = Tiler::new(TileOptions::square(20)).unwrap();
        let manifest = tiler.tile_file(&input, &out).unwrap();

        let names: Vec<_> = manifest.tiles.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["tile_0_0.tif", "tile_0_20.tif", "tile_0_40.tif",
                               "tile_20_0.tif", "tile_20_20.tif", "tile_20_40.tif"]);
        assert!(names.iter().all(|n| out.join(n).is_file()));
        assert_eq!(manifest.epsg, Some(32632));

        let last = manifest.tiles.last().unwrap();
        assert_eq!((last.descriptor.height, last.descriptor.width), (10, 10));
        let (x, y) = last.transform.apply(0.0, 0.0);
        assert_eq!((x, y), (300400.0, 4999800.0));

        let loaded = TileManifest::load(&tiler.manifest_path(&out)).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_tile_carries_window_pixels_and_crs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_source(dir.path(), 16, 16, 1);
        let out = dir.path().join("tiles");

        Tiler::new(TileOptions::square(8)).unwrap().tile_file(&input, &out).unwrap();

        let mut tile = open_raster(&out.join("tile_8_8.tif")).unwrap();
        assert_eq!(tile.info().georef.epsg(), Some(32632));
        let pixels = tile.read_all().unwrap();
        let source = open_raster(&input).unwrap().read_all().unwrap();
        assert_eq!(pixels.sample(0, 0, 0), source.sample(0, 8, 8));
        assert_eq!(pixels.sample(0, 7, 7), source.sample(0, 15, 15));
    }

    #[test]
    fn test_bad_prefix_and_missing_source() {
        let options = TileOptions { prefix: "a/b".to_string(), ..TileOptions::default() };
        assert!(matches!(Tiler::new(options), Err(TilingError::InvalidConfiguration(_))));

        let dir = tempfile::tempdir().unwrap();
        let tiler = Tiler::new(TileOptions::square(8)).unwrap();
        let result = tiler.tile_file(&dir.path().join("missing.tif"), dir.path());
        assert!(matches!(result, Err(TilingError::SourceNotFound(_))));
    }

    #[test]
    fn test_tile_larger_than_raster() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_source(dir.path(), 10, 10, 1);
        let tiler = Tiler::new(TileOptions::square(11)).unwrap();
        let result = tiler.tile_file(&input, &dir.path().join("tiles"));
        assert!(matches!(result, Err(TilingError::InvalidGeometry(_))));
    }
}
