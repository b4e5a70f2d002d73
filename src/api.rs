use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::annotation::{write_csv, write_json, AnnotateOptions, AnnotationAdapter, AnnotationRecord, Annotator};
use crate::config::PipelineConfig;
use crate::raster::{open_raster, RasterInfo};
use crate::tiling::errors::{TilingError, TilingResult};
use crate::tiling::{StitchOptions, StitchedRaster, Stitcher, TileManifest, TileNamePattern, TileOptions, Tiler};
use crate::utils::logger::Logger;

/// Outcome of an end-to-end run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Number of tiles written
    pub tiles: usize,
    /// Number of boxes found across all tiles
    pub annotations: usize,
    /// Stitched mosaic
    pub output: PathBuf,
    pub annotations_json: PathBuf,
    pub annotations_csv: PathBuf,
}

/// Main interface to the rastertile library
pub struct RasterTile {
    logger: Logger,
}

impl RasterTile {
    /// Create a new RasterTile instance
    ///
    /// # Arguments
    /// * `log_file` - Optional path to the run log, defaults to "rastertile.log"
    ///
    /// # Returns
    /// A RasterTile instance or an error if the log cannot be created
    pub fn new(log_file: Option<&str>) -> TilingResult<Self> {
        let log_path = log_file.unwrap_or("rastertile.log");
        let logger = Logger::new(log_path)?;
        Ok(RasterTile { logger })
    }

    /// Use an existing run log
    pub fn with_logger(logger: Logger) -> Self {
        RasterTile { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Header summary of a raster
    pub fn info(&self, input: &Path) -> TilingResult<RasterInfo> {
        Ok(open_raster(input)?.info().clone())
    }

    /// Cut a raster into tiles
    ///
    /// # Arguments
    /// * `input` - Raster to tile
    /// * `output_dir` - Directory for the tiles and the manifest
    /// * `options` - Grid and output settings
    ///
    /// # Returns
    /// The manifest describing the written tiles
    pub fn tile(&self, input: &Path, output_dir: &Path, options: TileOptions) -> TilingResult<TileManifest> {
        Tiler::new(options)?
            .with_logger(&self.logger)
            .tile_file(input, output_dir)
    }

    /// Run a detector over a tile set
    pub fn annotate(
        &self,
        tile_dir: &Path,
        pattern: &TileNamePattern,
        output_dir: Option<&Path>,
        options: AnnotateOptions,
        adapter: &mut dyn AnnotationAdapter,
    ) -> TilingResult<Vec<AnnotationRecord>> {
        Annotator::new(options)
            .with_logger(&self.logger)
            .annotate_directory(tile_dir, pattern, output_dir, adapter)
    }

    /// Stitch a tile set into `output`
    pub fn stitch(&self, tile_dir: &Path, pattern: &TileNamePattern, output: &Path, options: StitchOptions) -> TilingResult<StitchedRaster> {
        Stitcher::new(options)
            .with_logger(&self.logger)
            .stitch_to_file(tile_dir, pattern, output)
    }

    /// Tile, annotate and stitch in one go, see [`run_pipeline`]
    pub fn run_pipeline(
        &self,
        input: &Path,
        work_dir: &Path,
        config: &PipelineConfig,
        adapter: &mut dyn AnnotationAdapter,
    ) -> TilingResult<PipelineReport> {
        run_pipeline(input, work_dir, config, adapter, &self.logger)
    }
}

/// Tile, annotate and stitch in one go
///
/// Layout under `work_dir`:
/// * `tiles/` - tiles cut from `input` plus their manifest
/// * `annotated/` - tiles with burned boxes (when burning is on)
/// * `annotations.json`, `annotations.csv` - exported boxes
/// * `<input stem>_stitched.tif` - the mosaic
pub fn run_pipeline(
    input: &Path,
    work_dir: &Path,
    config: &PipelineConfig,
    adapter: &mut dyn AnnotationAdapter,
    logger: &Logger,
) -> TilingResult<PipelineReport> {
    if !input.is_file() {
        return Err(TilingError::SourceNotFound(input.to_path_buf()));
    }
    fs::create_dir_all(work_dir)?;

    let tile_options = config.tile_options();
    let pattern = tile_options.pattern();
    let tile_dir = work_dir.join("tiles");
    let manifest = Tiler::new(tile_options)?
        .with_logger(logger)
        .tile_file(input, &tile_dir)?;

    let annotate_options = config.annotate_options();
    let burn = annotate_options.burn;
    let annotated_dir = work_dir.join("annotated");
    let records = Annotator::new(annotate_options)
        .with_logger(logger)
        .annotate_directory(&tile_dir, &pattern, Some(annotated_dir.as_path()), adapter)?;

    let annotations_json = work_dir.join("annotations.json");
    let annotations_csv = work_dir.join("annotations.csv");
    write_json(&records, &annotations_json)?;
    write_csv(&records, &annotations_csv)?;

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("mosaic");
    let output = work_dir.join(format!("{}_stitched.tif", stem));
    let stitch_dir = if burn { &annotated_dir } else { &tile_dir };
    Stitcher::new(config.stitch_options())
        .with_logger(logger)
        .stitch_to_file(stitch_dir, &pattern, &output)?;

    logger.log(&format!("Pipeline {} -> {}: {} tiles, {} annotations",
                        input.display(), output.display(), manifest.tiles.len(), records.len()))?;
    info!("Pipeline finished: {} tile(s), {} annotation(s), mosaic {}",
          manifest.tiles.len(), records.len(), output.display());

    Ok(PipelineReport {
        tiles: manifest.tiles.len(),
        annotations: records.len(),
        output,
        annotations_json,
        annotations_csv,
    })
}
