//! Pipeline configuration
//!
//! Settings come from an optional TOML file with `[tiling]`, `[annotation]`,
//! `[stitching]` and `[output]` tables. Every key has a default, so an empty
//! file is a valid configuration. Values are only checked when the planner,
//! tiler and detector are built from them.
//!
//! ```toml
//! [tiling]
//! tile_size = [1026, 1824]
//! stride = [926, 1724]
//! strategy = "ragged"
//!
//! [stitching]
//! band_policy = "strict"
//! ```

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotateOptions, Outline, SyntheticDetector};
use crate::raster::{Compression, RasterFormat, WriteOptions};
use crate::tiling::errors::{TilingError, TilingResult};
use crate::tiling::{BandPolicy, MosaicTransform, StitchOptions, TileOptions, TilingStrategy};

/// `[tiling]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Tile size as [height, width]
    pub tile_size: [u32; 2],
    /// Stride as [height, width]; the tile size when absent
    pub stride: Option<[u32; 2]>,
    pub strategy: TilingStrategy,
    pub prefix: String,
    pub format: RasterFormat,
}

impl Default for TilingConfig {
    fn default() -> Self {
        TilingConfig {
            tile_size: [512, 512],
            stride: None,
            strategy: TilingStrategy::default(),
            prefix: "tile".to_string(),
            format: RasterFormat::GeoTiff,
        }
    }
}

/// `[annotation]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Boxes per tile
    pub boxes: usize,
    pub min_size: u32,
    pub max_size: u32,
    pub seed: Option<u64>,
    pub burn: bool,
    pub thickness: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            boxes: SyntheticDetector::DEFAULT_COUNT,
            min_size: SyntheticDetector::DEFAULT_MIN_SIZE,
            max_size: SyntheticDetector::DEFAULT_MAX_SIZE,
            seed: None,
            burn: true,
            thickness: Outline::default().thickness,
        }
    }
}

/// `[stitching]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchingConfig {
    pub band_policy: BandPolicy,
    pub expected_bands: Option<u16>,
    pub transform: MosaicTransform,
    pub crop_padding: bool,
}

/// `[output]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub compression: Compression,
    pub big_tiff: bool,
    pub show_progress: bool,
}

/// Complete configuration of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tiling: TilingConfig,
    pub annotation: AnnotationConfig,
    pub stitching: StitchingConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Read a TOML configuration file
    pub fn load(path: &Path) -> TilingResult<Self> {
        if !path.is_file() {
            return Err(TilingError::SourceNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> TilingResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            compression: self.output.compression,
            big_tiff: self.output.big_tiff,
        }
    }

    pub fn tile_options(&self) -> TileOptions {
        let t = &self.tiling;
        TileOptions {
            tile_height: t.tile_size[0],
            tile_width: t.tile_size[1],
            stride_h: t.stride.map(|s| s[0]),
            stride_w: t.stride.map(|s| s[1]),
            strategy: t.strategy,
            prefix: t.prefix.clone(),
            format: t.format,
            write: self.write_options(),
            show_progress: self.output.show_progress,
        }
    }

    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            burn: self.annotation.burn,
            outline: Outline { thickness: self.annotation.thickness },
            write: self.write_options(),
            show_progress: self.output.show_progress,
        }
    }

    pub fn stitch_options(&self) -> StitchOptions {
        let s = &self.stitching;
        StitchOptions {
            band_policy: s.band_policy,
            expected_bands: s.expected_bands,
            transform: s.transform,
            crop_padding: s.crop_padding,
            write: self.write_options(),
            show_progress: self.output.show_progress,
        }
    }

    /// Synthetic detector configured from `[annotation]`
    pub fn detector(&self) -> TilingResult<SyntheticDetector> {
        let a = &self.annotation;
        SyntheticDetector::new(a.seed)
            .with_count(a.boxes)
            .with_size_range(a.min_size, a.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.tiling.tile_size, [512, 512]);
        assert_eq!(config.tiling.strategy, TilingStrategy::RaggedClamp);
        assert_eq!(config.stitching.band_policy, BandPolicy::Permissive);
        assert_eq!(config.stitching.transform, MosaicTransform::FirstTile);
        assert!(config.annotation.burn);
        assert_eq!(config.annotation.boxes, 5);
    }

    #[test]
    fn test_partial_config() {
        let config = PipelineConfig::from_toml_str(r#"
            [tiling]
            tile_size = [1026, 1824]
            stride = [926, 1724]
            strategy = "padded"
            format = "png"

            [stitching]
            band_policy = "strict"
            expected_bands = 3
            transform = "grid-origin"

            [output]
            compression = "zstd"
        "#).unwrap();

        let tile = config.tile_options();
        assert_eq!((tile.tile_height, tile.tile_width), (1026, 1824));
        assert_eq!((tile.stride_h, tile.stride_w), (Some(926), Some(1724)));
        assert_eq!(tile.strategy, TilingStrategy::PaddedEven);
        assert_eq!(tile.format, RasterFormat::Png);
        assert_eq!(tile.prefix, "tile");
        assert_eq!(tile.write.compression, Compression::Zstd);

        let stitch = config.stitch_options();
        assert_eq!(stitch.band_policy, BandPolicy::Strict);
        assert_eq!(stitch.expected_bands, Some(3));
        assert_eq!(stitch.transform, MosaicTransform::GridOrigin);
        assert!(!stitch.crop_padding);
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[tiling]\nstrategy = \"diagonal\""),
            Err(TilingError::Serialization(_))
        ));

        let config = PipelineConfig::from_toml_str("[annotation]\nmin_size = 60\nmax_size = 10").unwrap();
        assert!(matches!(config.detector(), Err(TilingError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = PipelineConfig::load(Path::new("/no/such/rastertile.toml"));
        assert!(matches!(result, Err(TilingError::SourceNotFound(_))));
    }
}
