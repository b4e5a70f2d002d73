//! Tiling command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::{apply_overrides, required_path};
use crate::config::PipelineConfig;
use crate::tiling::errors::TilingResult;
use crate::tiling::{TileOptions, Tiler};
use crate::utils::logger::Logger;

/// Cuts a raster into tiles
pub struct TileCommand<'a> {
    input: PathBuf,
    output_dir: PathBuf,
    options: TileOptions,
    logger: &'a Logger,
}

impl<'a> TileCommand<'a> {
    pub fn new(args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Self> {
        let mut config = config.clone();
        apply_overrides(&mut config, args)?;

        Ok(TileCommand {
            input: required_path(args, "input")?,
            output_dir: required_path(args, "output_dir")?,
            options: config.tile_options(),
            logger,
        })
    }
}

impl<'a> Command for TileCommand<'a> {
    fn execute(&self) -> TilingResult<()> {
        let manifest = Tiler::new(self.options.clone())?
            .with_logger(self.logger)
            .tile_file(&self.input, &self.output_dir)?;

        let p = manifest.padding;
        if !p.is_none() {
            info!("Padding: top {}, bottom {}, left {}, right {}", p.top, p.bottom, p.left, p.right);
        }
        info!("{} tile(s) written to {}", manifest.tiles.len(), self.output_dir.display());
        Ok(())
    }
}
