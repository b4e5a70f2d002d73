//! Command and factory traits for the CLI

use clap::ArgMatches;

use crate::config::PipelineConfig;
use crate::tiling::errors::TilingResult;
use crate::utils::logger::Logger;

/// One parsed subcommand, ready to run
pub trait Command {
    fn execute(&self) -> TilingResult<()>;
}

/// Turns parsed arguments into a command
///
/// `config` is the configuration file as loaded; each command applies its
/// own flags on top. Commands borrow the run log for their whole lifetime.
pub trait CommandFactory<'a> {
    fn create_command(&self, args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Box<dyn Command + 'a>>;
}
