//! Mosaic reassembly
//!
//! The stitcher finds the tiles of a set by name, reads their headers to
//! size the mosaic, then pastes them one at a time in (row, col) order.
//!
//! Two policies are lossy and therefore named options:
//!
//! * `BandPolicy::Permissive` drops extra trailing bands and zero-fills
//!   missing ones; `BandPolicy::Strict` fails instead.
//! * Overlapping tiles are resolved last-writer-wins in sort order.
//!
//! The mosaic transform is the first tile's transform unless
//! `MosaicTransform::GridOrigin` asks for the grid origin instead. The two
//! only differ when the first tile does not sit at (0, 0). Tiles written
//! without georeferencing (PNG) take their transform and CRS from the tile
//! manifest when one sits next to them.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::raster::{open_raster, write_raster, DataType, GeoReference, GeoTransform, Raster, RasterInfo, Window, WriteOptions};
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;

use super::errors::{TilingError, TilingResult};
use super::manifest::TileManifest;
use super::naming::{TileFile, TileNamePattern};

/// What to do with tiles whose band count differs from the mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPolicy {
    /// Drop extra trailing bands, zero-fill missing ones
    #[default]
    Permissive,
    /// Fail with `BandCountMismatch`
    Strict,
}

impl FromStr for BandPolicy {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(BandPolicy::Permissive),
            "strict" => Ok(BandPolicy::Strict),
            other => Err(TilingError::InvalidConfiguration(format!(
                "unknown band policy '{}', expected permissive or strict", other
            ))),
        }
    }
}

impl fmt::Display for BandPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandPolicy::Permissive => write!(f, "permissive"),
            BandPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Where the mosaic transform comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MosaicTransform {
    /// Coefficients of the first tile in sort order, verbatim
    #[default]
    FirstTile,
    /// First tile's transform moved back to grid position (0, 0)
    GridOrigin,
}

impl FromStr for MosaicTransform {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "first-tile" | "first" => Ok(MosaicTransform::FirstTile),
            "grid-origin" | "origin" => Ok(MosaicTransform::GridOrigin),
            other => Err(TilingError::InvalidConfiguration(format!(
                "unknown mosaic transform '{}', expected first-tile or grid-origin", other
            ))),
        }
    }
}

impl fmt::Display for MosaicTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MosaicTransform::FirstTile => write!(f, "first-tile"),
            MosaicTransform::GridOrigin => write!(f, "grid-origin"),
        }
    }
}

/// Stitching settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchOptions {
    pub band_policy: BandPolicy,
    /// Mosaic band count; the first tile's band count when unset
    pub expected_bands: Option<u16>,
    pub transform: MosaicTransform,
    /// Crop the padding recorded in the tile manifest, if there is one
    pub crop_padding: bool,
    pub write: WriteOptions,
    pub show_progress: bool,
}

/// A tile whose bands were adjusted to fit the mosaic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledTile {
    pub file_name: String,
    pub from_bands: u16,
    pub to_bands: u16,
}

/// Result of a stitch
#[derive(Debug)]
pub struct StitchedRaster {
    pub raster: Raster,
    pub tile_count: usize,
    pub reconciled: Vec<ReconciledTile>,
    /// True when manifest padding was cropped off
    pub cropped: bool,
}

/// A tile with its header, ready to paste
struct PlannedTile {
    entry: TileFile,
    info: RasterInfo,
}

/// Reassembles tiles into one raster
pub struct Stitcher<'a> {
    options: StitchOptions,
    logger: Option<&'a Logger>,
}

impl<'a> Stitcher<'a> {
    pub fn new(options: StitchOptions) -> Self {
        Stitcher { options, logger: None }
    }

    /// Record reconciled tiles and the written mosaic in a run log
    pub fn with_logger(mut self, logger: &'a Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    /// Stitch the tiles of `pattern` found in `tile_dir`
    pub fn stitch(&self, tile_dir: &Path, pattern: &TileNamePattern) -> TilingResult<StitchedRaster> {
        let entries = pattern.discover(tile_dir)?;
        let tiles = self.read_headers(entries)?;
        let first = &tiles[0];
        let manifest_path = tile_dir.join(pattern.manifest_name());
        let manifest = TileManifest::load_if_present(&manifest_path)?;

        let bands = self.options.expected_bands.unwrap_or(first.info.bands);
        if bands == 0 {
            return Err(TilingError::InvalidConfiguration("mosaic band count must be positive".to_string()));
        }
        let data_type = first.info.data_type;
        self.check_tiles(&tiles, bands, data_type)?;

        let (height, width) = mosaic_extent(&tiles)?;
        info!("Stitching {} tile(s) into {}x{}x{} {} mosaic", tiles.len(), width, height, bands, data_type);
        let mut mosaic = Raster::new(width, height, bands, data_type);

        let progress = ProgressTracker::with_visibility(tiles.len() as u64, "Stitching", self.options.show_progress);
        let mut reconciled = Vec::new();
        for tile in &tiles {
            let mut pixels = open_raster(&tile.entry.path)?.read_all()?;
            if pixels.bands() != bands {
                let fix = ReconciledTile {
                    file_name: tile.entry.file_name.clone(),
                    from_bands: pixels.bands(),
                    to_bands: bands,
                };
                warn!("Reconciling {} from {} to {} band(s)", fix.file_name, fix.from_bands, fix.to_bands);
                self.audit(&format!("Reconciled {} from {} to {} band(s)", fix.file_name, fix.from_bands, fix.to_bands))?;
                pixels = pixels.with_band_count(bands);
                reconciled.push(fix);
            }

            // Later tiles overwrite earlier ones where they overlap
            mosaic.paste(&pixels, tile.entry.row as i64, tile.entry.col as i64)?;
            debug!("Pasted {} at row {}, col {}", tile.entry.file_name, tile.entry.row, tile.entry.col);
            progress.increment(1);
        }
        progress.finish();

        let (first_transform, georef) = first_reference(first, manifest.as_ref());
        mosaic.set_transform(self.mosaic_transform(first, first_transform));
        mosaic.set_georef(georef);
        warn_if_crs_differs(&tiles, &first.info.georef);

        let (raster, cropped) = if self.options.crop_padding {
            match &manifest {
                Some(manifest) => crop_to_source(mosaic, manifest),
                None => {
                    warn!("No manifest at {}, mosaic is not cropped", manifest_path.display());
                    (mosaic, false)
                }
            }
        } else {
            (mosaic, false)
        };

        Ok(StitchedRaster {
            raster,
            tile_count: tiles.len(),
            reconciled,
            cropped,
        })
    }

    /// Stitch and write the mosaic, choosing the format from `output`'s extension
    pub fn stitch_to_file(&self, tile_dir: &Path, pattern: &TileNamePattern, output: &Path) -> TilingResult<StitchedRaster> {
        let stitched = self.stitch(tile_dir, pattern)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let size = write_raster(&stitched.raster, output, &self.options.write)?;
        self.audit(&format!("Wrote mosaic {} ({} tiles, {} bytes)", output.display(), stitched.tile_count, size))?;
        info!("Stitched {} tile(s) into {}", stitched.tile_count, output.display());
        Ok(stitched)
    }

    fn read_headers(&self, entries: Vec<TileFile>) -> TilingResult<Vec<PlannedTile>> {
        entries
            .into_iter()
            .map(|entry| {
                let info = open_raster(&entry.path)?.info().clone();
                Ok(PlannedTile { entry, info })
            })
            .collect()
    }

    /// Datatype and, under the strict policy, band checks before any pixel is read
    fn check_tiles(&self, tiles: &[PlannedTile], bands: u16, data_type: DataType) -> TilingResult<()> {
        for tile in tiles {
            if tile.info.data_type != data_type {
                return Err(TilingError::IncompatibleTile(format!(
                    "{} holds {} samples, mosaic holds {}", tile.entry.file_name, tile.info.data_type, data_type
                )));
            }
            if self.options.band_policy == BandPolicy::Strict && tile.info.bands != bands {
                return Err(TilingError::BandCountMismatch {
                    tile: tile.entry.file_name.clone(),
                    expected: bands,
                    found: tile.info.bands,
                });
            }
        }
        Ok(())
    }

    fn mosaic_transform(&self, first: &PlannedTile, transform: GeoTransform) -> GeoTransform {
        match self.options.transform {
            MosaicTransform::FirstTile => {
                if first.entry.row != 0 || first.entry.col != 0 {
                    warn!("First tile {} is not at the grid origin, the mosaic transform is offset by ({}, {}) pixels",
                          first.entry.file_name, first.entry.col, first.entry.row);
                }
                transform
            }
            MosaicTransform::GridOrigin => {
                transform.translate(-(first.entry.col as f64), -(first.entry.row as f64))
            }
        }
    }

    fn audit(&self, message: &str) -> TilingResult<()> {
        if let Some(logger) = self.logger {
            logger.log(message)?;
        }
        Ok(())
    }
}

/// Cut manifest padding off the mosaic
fn crop_to_source(mosaic: Raster, manifest: &TileManifest) -> (Raster, bool) {
    if manifest.padding.is_none() {
        debug!("Manifest records no padding, nothing to crop");
        return (mosaic, false);
    }

    let pad = manifest.padding;
    let window = Window::new(pad.left as i64, pad.top as i64, manifest.source_width, manifest.source_height);
    info!("Cropping padding {:?} to {}x{}", pad, manifest.source_width, manifest.source_height);
    (mosaic.window(window), true)
}

/// Transform and CRS of the first tile, from the manifest when the file carries none
fn first_reference(first: &PlannedTile, manifest: Option<&TileManifest>) -> (GeoTransform, GeoReference) {
    if first.info.is_georeferenced() {
        return (first.info.transform, first.info.georef.clone());
    }
    let recorded = manifest.and_then(|m| m.tile_transform(&first.entry.file_name).map(|t| (t, m.georef())));
    match recorded {
        Some((transform, georef)) => {
            debug!("{} carries no georeferencing, using the manifest record", first.entry.file_name);
            (transform, georef)
        }
        None => {
            warn!("{} carries no georeferencing and no manifest records it, the mosaic is unreferenced",
                  first.entry.file_name);
            (first.info.transform, first.info.georef.clone())
        }
    }
}

/// Mosaic size as (height, width): the furthest tile edge on each axis
fn mosaic_extent(tiles: &[PlannedTile]) -> TilingResult<(u32, u32)> {
    let mut height = 0u32;
    let mut width = 0u32;
    for tile in tiles {
        let end_row = tile.entry.row.checked_add(tile.info.height);
        let end_col = tile.entry.col.checked_add(tile.info.width);
        match (end_row, end_col) {
            (Some(r), Some(c)) => {
                height = height.max(r);
                width = width.max(c);
            }
            _ => {
                return Err(TilingError::InvalidGeometry(format!(
                    "tile {} extends past the addressable mosaic size", tile.entry.file_name
                )))
            }
        }
    }
    Ok((height, width))
}

fn warn_if_crs_differs(tiles: &[PlannedTile], reference: &GeoReference) {
    if let Some(tile) = tiles.iter().find(|t| &t.info.georef != reference) {
        warn!("{} has CRS {}, mosaic keeps {}", tile.entry.file_name, tile.info.georef, reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn solid(width: u32, height: u32, bands: u16, value: u8) -> Raster {
        let data = vec![value; width as usize * height as usize * bands as usize];
        Raster::from_data(width, height, bands, DataType::U8, data).unwrap()
    }

    fn write_tile(dir: &Path, name: &str, raster: &Raster) {
        write_raster(raster, &dir.join(name), &WriteOptions::default()).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let stitcher = Stitcher::new(StitchOptions::default());
        let result = stitcher.stitch(Path::new("/no/such/tiles"), &TileNamePattern::new("tile", "tif"));
        assert!(matches!(result, Err(TilingError::SourceNotFound(_))));
    }

    #[test]
    fn test_no_tiles_found() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("tile_manifest.json")).unwrap();
        File::create(dir.path().join("other_0_0.tif")).unwrap();

        let stitcher = Stitcher::new(StitchOptions::default());
        let result = stitcher.stitch(dir.path(), &TileNamePattern::new("tile", "tif"));
        assert!(matches!(result, Err(TilingError::NoTilesFound(_))));
    }

    #[test]
    fn test_malformed_name_is_reported_not_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "tile_0_0.tif", &solid(4, 4, 1, 1));
        File::create(dir.path().join("tile_0_x.tif")).unwrap();

        let stitcher = Stitcher::new(StitchOptions::default());
        match stitcher.stitch(dir.path(), &TileNamePattern::new("tile", "tif")) {
            Err(TilingError::MalformedTileName(name)) => assert_eq!(name, "tile_0_x.tif"),
            other => panic!("unexpected {:?}", other.map(|s| s.tile_count)),
        }
    }

    #[test]
    fn test_extent_and_zero_fill() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "tile_0_0.tif", &solid(4, 4, 1, 7));
        write_tile(dir.path(), "tile_6_8.tif", &solid(3, 2, 1, 9));

        let stitched = Stitcher::new(StitchOptions::default())
            .stitch(dir.path(), &TileNamePattern::new("tile", "tif"))
            .unwrap();
        let mosaic = &stitched.raster;
        assert_eq!((mosaic.width(), mosaic.height()), (11, 8));
        assert_eq!(mosaic.sample(0, 0, 0), &[7]);
        assert_eq!(mosaic.sample(0, 5, 5), &[0]);
        assert_eq!(mosaic.sample(0, 7, 10), &[9]);
    }

    #[test]
    fn test_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "tile_0_0.tif", &solid(4, 4, 1, 1));
        write_tile(dir.path(), "tile_0_2.tif", &solid(4, 4, 1, 2));
        write_tile(dir.path(), "tile_2_0.tif", &solid(4, 4, 1, 3));

        let stitched = Stitcher::new(StitchOptions::default())
            .stitch(dir.path(), &TileNamePattern::new("tile", "tif"))
            .unwrap();
        let mosaic = &stitched.raster;
        assert_eq!(mosaic.sample(0, 0, 3), &[2]);
        assert_eq!(mosaic.sample(0, 3, 1), &[3]);
        assert_eq!(mosaic.sample(0, 3, 5), &[2]);
        assert_eq!(mosaic.sample(0, 0, 0), &[1]);
    }

    #[test]
    fn test_band_reconciliation() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "tile_0_0.tif", &solid(2, 2, 4, 5));
        write_tile(dir.path(), "tile_0_2.tif", &solid(2, 2, 2, 6));

        let options = StitchOptions { expected_bands: Some(3), ..StitchOptions::default() };
        let stitched = Stitcher::new(options)
            .stitch(dir.path(), &TileNamePattern::new("tile", "tif"))
            .unwrap();
        let mosaic = &stitched.raster;
        assert_eq!(mosaic.bands(), 3);
        assert_eq!(mosaic.sample(2, 0, 0), &[5]);
        assert_eq!(mosaic.sample(1, 0, 2), &[6]);
        assert_eq!(mosaic.sample(2, 0, 2), &[0]);
        assert_eq!(stitched.reconciled.len(), 2);
        assert_eq!(stitched.reconciled[0], ReconciledTile {
            file_name: "tile_0_0.tif".to_string(), from_bands: 4, to_bands: 3,
        });

        let strict = StitchOptions { expected_bands: Some(3), band_policy: BandPolicy::Strict, ..StitchOptions::default() };
        match Stitcher::new(strict).stitch(dir.path(), &TileNamePattern::new("tile", "tif")) {
            Err(TilingError::BandCountMismatch { tile, expected, found }) => {
                assert_eq!((tile.as_str(), expected, found), ("tile_0_0.tif", 3, 4));
            }
            other => panic!("unexpected {:?}", other.map(|s| s.tile_count)),
        }
    }

    #[test]
    fn test_mixed_datatypes_are_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "tile_0_0.tif", &solid(2, 2, 1, 1));
        write_tile(dir.path(), "tile_0_2.tif", &Raster::new(2, 2, 1, DataType::U16));

        let result = Stitcher::new(StitchOptions::default()).stitch(dir.path(), &TileNamePattern::new("tile", "tif"));
        assert!(matches!(result, Err(TilingError::IncompatibleTile(_))));
    }

    #[test]
    fn test_mosaic_transform_choice() {
        let dir = tempfile::tempdir().unwrap();
        let parent = GeoTransform::new(1000.0, 2000.0, 2.0, -2.0);
        let tile = solid(4, 4, 1, 1).with_transform(parent.translate(4.0, 8.0));
        write_tile(dir.path(), "tile_8_4.tif", &tile);
        let pattern = TileNamePattern::new("tile", "tif");

        let first = Stitcher::new(StitchOptions::default()).stitch(dir.path(), &pattern).unwrap();
        assert_eq!(*first.raster.transform(), parent.translate(4.0, 8.0));

        let options = StitchOptions { transform: MosaicTransform::GridOrigin, ..StitchOptions::default() };
        let origin = Stitcher::new(options).stitch(dir.path(), &pattern).unwrap();
        assert!(origin.raster.transform().approx_eq(&parent, 1e-9));
    }

    #[test]
    fn test_unreferenced_tiles_take_manifest_georeferencing() {
        use crate::tiling::grid::{Padding, TileDescriptor, TilingStrategy};
        use crate::tiling::manifest::TileRecord;

        let dir = tempfile::tempdir().unwrap();
        let parent = GeoTransform::new(1000.0, 2000.0, 2.0, -2.0);
        write_tile(dir.path(), "tile_0_4.png", &solid(4, 4, 1, 1));
        write_tile(dir.path(), "tile_4_4.png", &solid(4, 4, 1, 2));
        let pattern = TileNamePattern::new("tile", "png");

        let record = |row: u32, col: u32| TileRecord {
            file_name: format!("tile_{}_{}.png", row, col),
            descriptor: TileDescriptor::new(row, col, 4, 4),
            transform: parent.translate(col as f64, row as f64),
        };
        TileManifest {
            source: "scene.tif".into(),
            source_width: 8,
            source_height: 8,
            strategy: TilingStrategy::RaggedClamp,
            tile_size: [4, 4],
            stride: [4, 4],
            padding: Padding::default(),
            bands: 1,
            data_type: DataType::U8,
            transform: parent,
            epsg: Some(32631),
            tiles: vec![record(0, 4), record(4, 4)],
        }
        .save(&dir.path().join(pattern.manifest_name()))
        .unwrap();

        let first = Stitcher::new(StitchOptions::default()).stitch(dir.path(), &pattern).unwrap();
        assert!(first.raster.transform().approx_eq(&parent.translate(4.0, 0.0), 1e-9));
        assert_eq!(first.raster.georef().epsg(), Some(32631));

        let options = StitchOptions { transform: MosaicTransform::GridOrigin, ..StitchOptions::default() };
        let origin = Stitcher::new(options).stitch(dir.path(), &pattern).unwrap();
        assert!(origin.raster.transform().approx_eq(&parent, 1e-9));

        fs::remove_file(dir.path().join(pattern.manifest_name())).unwrap();
        let bare = Stitcher::new(StitchOptions::default()).stitch(dir.path(), &pattern).unwrap();
        assert!(bare.raster.transform().is_identity());
        assert_eq!(bare.raster.georef().epsg(), None);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("STRICT".parse::<BandPolicy>().unwrap(), BandPolicy::Strict);
        assert!("lenient".parse::<BandPolicy>().is_err());
        assert_eq!("grid-origin".parse::<MosaicTransform>().unwrap(), MosaicTransform::GridOrigin);
        assert_eq!(MosaicTransform::default().to_string(), "first-tile");
    }
}
