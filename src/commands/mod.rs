//! CLI command implementations
//!
//! One command per subcommand. Each command starts from the configuration
//! file and applies the subcommand's flags on top.

pub mod command_traits;
pub mod info_command;
pub mod tile_command;
pub mod annotate_command;
pub mod stitch_command;
pub mod pipeline_command;

pub use command_traits::{Command, CommandFactory};
pub use info_command::InfoCommand;
pub use tile_command::TileCommand;
pub use annotate_command::AnnotateCommand;
pub use stitch_command::StitchCommand;
pub use pipeline_command::PipelineCommand;

use std::path::PathBuf;

use clap::ArgMatches;

use crate::config::PipelineConfig;
use crate::tiling::errors::{TilingError, TilingResult};
use crate::utils::logger::Logger;

/// Factory for creating command instances based on the subcommand
pub struct RastertileCommandFactory;

impl RastertileCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        RastertileCommandFactory
    }
}

impl Default for RastertileCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for RastertileCommandFactory {
    fn create_command(&self, args: &ArgMatches, config: &PipelineConfig, logger: &'a Logger) -> TilingResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("info", sub)) => Ok(Box::new(InfoCommand::new(sub)?)),
            Some(("tile", sub)) => Ok(Box::new(TileCommand::new(sub, config, logger)?)),
            Some(("annotate", sub)) => Ok(Box::new(AnnotateCommand::new(sub, config, logger)?)),
            Some(("stitch", sub)) => Ok(Box::new(StitchCommand::new(sub, config, logger)?)),
            Some(("pipeline", sub)) => Ok(Box::new(PipelineCommand::new(sub, config, logger)?)),
            Some((other, _)) => Err(TilingError::InvalidConfiguration(format!("unknown command '{}'", other))),
            None => Err(TilingError::InvalidConfiguration("no command given".to_string())),
        }
    }
}

/// String value of an option, `None` when absent or not defined for this subcommand
pub(crate) fn opt_string(args: &ArgMatches, id: &str) -> Option<String> {
    args.try_get_one::<String>(id).ok().flatten().cloned()
}

/// Boolean flag, false when not defined for this subcommand
pub(crate) fn flag(args: &ArgMatches, id: &str) -> bool {
    args.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false)
}

/// Required positional path
pub(crate) fn required_path(args: &ArgMatches, id: &str) -> TilingResult<PathBuf> {
    opt_string(args, id)
        .map(PathBuf::from)
        .ok_or_else(|| TilingError::InvalidConfiguration(format!("missing argument <{}>", id)))
}

/// Parse an option value with `FromStr`
pub(crate) fn parse_opt<T>(args: &ArgMatches, id: &str) -> TilingResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match opt_string(args, id) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| TilingError::InvalidConfiguration(format!("--{} {}: {}", id, value, e))),
        None => Ok(None),
    }
}

/// Parse "H,W" (or a single "N" for both) into [height, width]
pub fn parse_pair(value: &str) -> TilingResult<[u32; 2]> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let parse = |s: &str| s.parse::<u32>().map_err(|_| {
        TilingError::InvalidConfiguration(format!("'{}' is not a size, expected H,W or N", value))
    });
    match parts.as_slice() {
        [n] => {
            let n = parse(n)?;
            Ok([n, n])
        }
        [h, w] => Ok([parse(h)?, parse(w)?]),
        _ => Err(TilingError::InvalidConfiguration(format!("'{}' is not a size, expected H,W or N", value))),
    }
}

/// Apply whichever of the shared flags this subcommand defines
pub(crate) fn apply_overrides(config: &mut PipelineConfig, args: &ArgMatches) -> TilingResult<()> {
    if let Some(size) = opt_string(args, "tile-size") {
        config.tiling.tile_size = parse_pair(&size)?;
    }
    if let Some(stride) = opt_string(args, "stride") {
        config.tiling.stride = Some(parse_pair(&stride)?);
    }
    if let Some(strategy) = parse_opt(args, "strategy")? {
        config.tiling.strategy = strategy;
    }
    if let Some(prefix) = opt_string(args, "prefix") {
        config.tiling.prefix = prefix;
    }
    if let Some(format) = parse_opt(args, "format")? {
        config.tiling.format = format;
    }
    if let Some(compression) = parse_opt(args, "compression")? {
        config.output.compression = compression;
    }
    if let Some(boxes) = parse_opt(args, "boxes")? {
        config.annotation.boxes = boxes;
    }
    if let Some(seed) = parse_opt(args, "seed")? {
        config.annotation.seed = Some(seed);
    }
    if flag(args, "no-burn") {
        config.annotation.burn = false;
    }
    if let Some(policy) = parse_opt(args, "band-policy")? {
        config.stitching.band_policy = policy;
    }
    if let Some(bands) = parse_opt(args, "bands")? {
        config.stitching.expected_bands = Some(bands);
    }
    if let Some(transform) = parse_opt(args, "transform")? {
        config.stitching.transform = transform;
    }
    if flag(args, "crop-padding") {
        config.stitching.crop_padding = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("1026,1824").unwrap(), [1026, 1824]);
        assert_eq!(parse_pair(" 256 ").unwrap(), [256, 256]);
        assert!(parse_pair("1,2,3").is_err());
        assert!(parse_pair("a,b").is_err());
    }

    fn stitch_args(argv: &[&str]) -> ArgMatches {
        clap::Command::new("stitch")
            .arg(clap::Arg::new("band-policy").long("band-policy"))
            .arg(clap::Arg::new("bands").long("bands"))
            .arg(clap::Arg::new("crop-padding").long("crop-padding").action(clap::ArgAction::SetTrue))
            .get_matches_from(argv)
    }

    #[test]
    fn test_overrides_only_touch_given_flags() {
        let mut config = PipelineConfig::default();
        let args = stitch_args(&["stitch", "--band-policy", "strict", "--bands", "3", "--crop-padding"]);
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.stitching.band_policy, crate::tiling::BandPolicy::Strict);
        assert_eq!(config.stitching.expected_bands, Some(3));
        assert!(config.stitching.crop_padding);
        // Flags this subcommand does not define keep the file values
        assert!(config.annotation.burn);
        assert_eq!(config.tiling, PipelineConfig::default().tiling);
    }

    #[test]
    fn test_bad_override_value() {
        let mut config = PipelineConfig::default();
        let args = stitch_args(&["stitch", "--band-policy", "lenient"]);
        assert!(matches!(apply_overrides(&mut config, &args), Err(TilingError::InvalidConfiguration(_))));
    }
}
