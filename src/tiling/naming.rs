//! Tile file naming
//!
//! Tiles are written as `<prefix>_<row>_<col>.<ext>`, where row and column
//! are the tile origin in pixels. The name is the only link between a tile
//! file and its position that external tools see, so formatting and parsing
//! must round-trip exactly.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use super::errors::{TilingError, TilingResult};

lazy_static! {
    /// Prefix, row, column and extension of a tile file name
    static ref TILE_NAME: Regex = Regex::new(r"^(.+)_([0-9]+)_([0-9]+)\.([A-Za-z0-9]+)$")
        .expect("tile name pattern is valid");
}

/// Formatting and parsing of tile file names
pub struct TileName;

impl TileName {
    /// File name of the tile at (row, col)
    pub fn format(prefix: &str, row: u32, col: u32, extension: &str) -> String {
        format!("{}_{}_{}.{}", prefix, row, col, extension)
    }

    /// Parse (row, col) out of a tile file name
    ///
    /// The prefix must match exactly and the extension case-insensitively.
    /// Rows and columns must be decimal integers that fit a `u32`.
    pub fn parse(file_name: &str, prefix: &str, extension: &str) -> TilingResult<(u32, u32)> {
        let malformed = || TilingError::MalformedTileName(file_name.to_string());

        let captures = TILE_NAME.captures(file_name).ok_or_else(malformed)?;
        if &captures[1] != prefix || !captures[4].eq_ignore_ascii_case(extension) {
            return Err(malformed());
        }

        let row = captures[2].parse::<u32>().map_err(|_| malformed())?;
        let col = captures[3].parse::<u32>().map_err(|_| malformed())?;
        Ok((row, col))
    }
}

/// Which files in a directory are tiles of one set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileNamePattern {
    pub prefix: String,
    pub extension: String,
}

impl TileNamePattern {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        TileNamePattern {
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// True for names that claim to be tiles of this set
    ///
    /// Candidates still have to parse; a candidate that does not is an
    /// error, never a file to skip.
    pub fn matches_candidate(&self, file_name: &str) -> bool {
        let suffix = format!(".{}", self.extension.to_lowercase());
        file_name.starts_with(&format!("{}_", self.prefix))
            && file_name.to_lowercase().ends_with(&suffix)
    }

    pub fn parse(&self, file_name: &str) -> TilingResult<(u32, u32)> {
        TileName::parse(file_name, &self.prefix, &self.extension)
    }

    pub fn format(&self, row: u32, col: u32) -> String {
        TileName::format(&self.prefix, row, col, &self.extension)
    }

    /// Name of the manifest written next to the tiles
    pub fn manifest_name(&self) -> String {
        format!("{}_manifest.json", self.prefix)
    }
}

/// A tile file found on disk with its grid position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFile {
    pub file_name: String,
    pub path: PathBuf,
    pub row: u32,
    pub col: u32,
}

impl TileNamePattern {
    /// List the tiles of this set in `dir`, sorted by (row, col)
    ///
    /// Every candidate must parse; one that does not fails the whole
    /// listing with `MalformedTileName`.
    pub fn discover(&self, dir: &Path) -> TilingResult<Vec<TileFile>> {
        if !dir.is_dir() {
            return Err(TilingError::SourceNotFound(dir.to_path_buf()));
        }

        let mut tiles = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !self.matches_candidate(&file_name) {
                continue;
            }
            let (row, col) = self.parse(&file_name)?;
            tiles.push(TileFile { file_name, path: entry.path(), row, col });
        }

        if tiles.is_empty() {
            return Err(TilingError::NoTilesFound(dir.to_path_buf()));
        }

        // Names break ties so "tile_01_2" and "tile_1_2" always come in the same order
        tiles.sort_by(|a, b| (a.row, a.col, &a.file_name).cmp(&(b.row, b.col, &b.file_name)));
        debug!("Found {} tile(s) in {}", tiles.len(), dir.display());
        Ok(tiles)
    }
}

/// Check that a prefix produces parseable names
pub fn validate_prefix(prefix: &str) -> TilingResult<()> {
    if prefix.is_empty() || prefix.contains(['/', '\\']) {
        return Err(TilingError::InvalidConfiguration(format!(
            "tile prefix '{}' must be non-empty and free of path separators", prefix
        )));
    }
    Ok(())
}
