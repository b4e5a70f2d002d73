//! Stitching command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::{apply_overrides, opt_string, required_path};
use crate::config::PipelineConfig;
use crate::tiling::errors::TilingResult;
use crate::tiling::{StitchOptions, Stitcher, TileNamePattern};
use crate::utils::logger::Logger;

/// Reassembles a tile directory into one raster
pub struct StitchCommand<'a> {
    tile_dir: PathBuf,
    output: PathBuf,
    pattern: TileNamePattern,
    options: StitchOptions,
    logger: &'a Logger,
}

impl<'a> StitchCommand<'a> {
    pub fn new(args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Self> {
        let mut config = config.clone();
        apply_overrides(&mut config, args)?;
        let extension = opt_string(args, "ext").unwrap_or_else(|| config.tiling.format.extension().to_string());

        Ok(StitchCommand {
            tile_dir: required_path(args, "tile_dir")?,
            output: required_path(args, "output")?,
            pattern: TileNamePattern::new(config.tiling.prefix.clone(), extension),
            options: config.stitch_options(),
            logger,
        })
    }
}

impl<'a> Command for StitchCommand<'a> {
    fn execute(&self) -> TilingResult<()> {
        let stitched = Stitcher::new(self.options.clone())
            .with_logger(self.logger)
            .stitch_to_file(&self.tile_dir, &self.pattern, &self.output)?;

        let raster = &stitched.raster;
        info!("Mosaic {}x{}x{} {}", raster.width(), raster.height(), raster.bands(), raster.data_type());
        if !stitched.reconciled.is_empty() {
            info!("{} tile(s) had their band count reconciled", stitched.reconciled.len());
        }
        if stitched.cropped {
            info!("Padding cropped to the source extent");
        }
        Ok(())
    }
}
