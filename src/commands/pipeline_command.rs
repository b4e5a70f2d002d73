//! End-to-end pipeline command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::run_pipeline;
use crate::commands::command_traits::Command;
use crate::commands::{apply_overrides, required_path};
use crate::config::PipelineConfig;
use crate::tiling::errors::TilingResult;
use crate::utils::logger::Logger;

/// Tiles, annotates and stitches a raster
pub struct PipelineCommand<'a> {
    input: PathBuf,
    work_dir: PathBuf,
    config: PipelineConfig,
    logger: &'a Logger,
}

impl<'a> PipelineCommand<'a> {
    pub fn new(args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Self> {
        let mut config = config.clone();
        apply_overrides(&mut config, args)?;

        Ok(PipelineCommand {
            input: required_path(args, "input")?,
            work_dir: required_path(args, "work_dir")?,
            config,
            logger,
        })
    }
}

impl<'a> Command for PipelineCommand<'a> {
    fn execute(&self) -> TilingResult<()> {
        let mut detector = self.config.detector()?;
        let report = run_pipeline(&self.input, &self.work_dir, &self.config, &mut detector, self.logger)?;

        info!("Tiles: {}", report.tiles);
        info!("Annotations: {} ({}, {})", report.annotations,
              report.annotations_json.display(), report.annotations_csv.display());
        info!("Mosaic: {}", report.output.display());
        Ok(())
    }
}
