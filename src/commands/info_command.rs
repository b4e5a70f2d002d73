//! Raster inspection command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_path;
use crate::raster::open_raster;
use crate::tiling::errors::TilingResult;

/// Logs the header summary of a raster
pub struct InfoCommand {
    input: PathBuf,
}

impl InfoCommand {
    pub fn new(args: &ArgMatches) -> TilingResult<Self> {
        Ok(InfoCommand {
            input: required_path(args, "input")?,
        })
    }
}

impl Command for InfoCommand {
    fn execute(&self) -> TilingResult<()> {
        let source = open_raster(&self.input)?;
        let info = source.info();
        info!("{}", self.input.display());
        for line in info.to_string().lines() {
            info!("  {}", line);
        }
        if info.transform.has_rotation() {
            info!("  Transform has rotation terms");
        }
        Ok(())
    }
}
