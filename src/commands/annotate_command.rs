//! Annotation command

use std::path::PathBuf;

use clap::ArgMatches;

use crate::annotation::{write_csv, write_json, AnnotateOptions, Annotator, SyntheticDetector};
use crate::commands::command_traits::Command;
use crate::commands::{apply_overrides, opt_string, required_path};
use crate::config::PipelineConfig;
use crate::tiling::errors::TilingResult;
use crate::tiling::TileNamePattern;
use crate::utils::logger::Logger;

/// Runs the synthetic detector over a tile directory
pub struct AnnotateCommand<'a> {
    tile_dir: PathBuf,
    output_dir: PathBuf,
    pattern: TileNamePattern,
    options: AnnotateOptions,
    config: PipelineConfig,
    json: PathBuf,
    csv: PathBuf,
    logger: &'a Logger,
}

impl<'a> AnnotateCommand<'a> {
    pub fn new(args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Self> {
        let mut config = config.clone();
        apply_overrides(&mut config, args)?;

        let output_dir = required_path(args, "output_dir")?;
        let extension = opt_string(args, "ext").unwrap_or_else(|| config.tiling.format.extension().to_string());
        let json = opt_string(args, "json").map(PathBuf::from).unwrap_or_else(|| output_dir.join("annotations.json"));
        let csv = opt_string(args, "csv").map(PathBuf::from).unwrap_or_else(|| output_dir.join("annotations.csv"));

        Ok(AnnotateCommand {
            tile_dir: required_path(args, "tile_dir")?,
            output_dir,
            pattern: TileNamePattern::new(config.tiling.prefix.clone(), extension),
            options: config.annotate_options(),
            config,
            json,
            csv,
            logger,
        })
    }
}

impl<'a> Command for AnnotateCommand<'a> {
    fn execute(&self) -> TilingResult<()> {
        let mut detector: SyntheticDetector = self.config.detector()?;
        std::fs::create_dir_all(&self.output_dir)?;

        let records = Annotator::new(self.options.clone())
            .with_logger(self.logger)
            .annotate_directory(&self.tile_dir, &self.pattern, Some(self.output_dir.as_path()), &mut detector)?;

        write_json(&records, &self.json)?;
        write_csv(&records, &self.csv)?;
        Ok(())
    }
}
