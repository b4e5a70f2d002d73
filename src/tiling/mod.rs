//! Tiling and stitching engine
//!
//! `GridPlanner` decides the tile grid, `Tiler` writes one file per tile and
//! `Stitcher` puts them back together. Tile positions travel in file names
//! (`<prefix>_<row>_<col>.<ext>`) and in the JSON manifest written next to
//! the tiles.

pub mod errors;
pub mod grid;
pub mod manifest;
pub mod naming;
pub mod stitcher;
pub mod tiler;

pub use errors::{TilingError, TilingResult};
pub use grid::{GridPlanner, Padding, TileDescriptor, TilePlan, TilingStrategy};
pub use manifest::{TileManifest, TileRecord};
pub use naming::{TileFile, TileName, TileNamePattern};
pub use stitcher::{BandPolicy, MosaicTransform, ReconciledTile, StitchOptions, StitchedRaster, Stitcher};
pub use tiler::{TileOptions, Tiler};
