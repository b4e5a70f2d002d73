//! Tile manifest
//!
//! A JSON file written next to the tiles, `<prefix>_manifest.json`, that
//! lists every tile with its descriptor and transform together with the
//! grid that produced it. Stitching works from file names alone; the
//! manifest adds what names cannot carry, such as the padding to crop and
//! the georeferencing of tiles written in formats that cannot hold it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::raster::{DataType, GeoReference, GeoTransform};

use super::errors::TilingResult;
use super::grid::{Padding, TileDescriptor, TilingStrategy};

/// One tile file of a set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub file_name: String,
    pub descriptor: TileDescriptor,
    pub transform: GeoTransform,
}

/// Everything known about a tile set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileManifest {
    pub source: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub strategy: TilingStrategy,
    /// Nominal tile size as [height, width]
    pub tile_size: [u32; 2],
    /// Stride as [height, width]
    pub stride: [u32; 2],
    pub padding: Padding,
    pub bands: u16,
    pub data_type: DataType,
    pub transform: GeoTransform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u32>,
    pub tiles: Vec<TileRecord>,
}

impl TileManifest {
    /// Write the manifest as pretty-printed JSON
    pub fn save(&self, path: &Path) -> TilingResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        debug!("Wrote manifest {} ({} tiles)", path.display(), self.tiles.len());
        Ok(())
    }

    pub fn load(path: &Path) -> TilingResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Transform recorded for a tile file
    pub fn tile_transform(&self, file_name: &str) -> Option<GeoTransform> {
        self.tiles.iter().find(|t| t.file_name == file_name).map(|t| t.transform)
    }

    /// CRS of the source raster, empty when it had no EPSG code
    pub fn georef(&self) -> GeoReference {
        self.epsg
            .and_then(|code| u16::try_from(code).ok())
            .map(GeoReference::from_epsg)
            .unwrap_or_default()
    }

    /// Load the manifest from `path` if the file exists
    pub fn load_if_present(path: &Path) -> TilingResult<Option<Self>> {
        if path.is_file() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }
}
