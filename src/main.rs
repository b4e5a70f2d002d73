use clap::{Arg, Command as ClapCommand, ArgAction};
use std::path::Path;
use std::process;
use log::{debug, error};

use rastertile::config::PipelineConfig;
use rastertile::utils::logger::Logger;
use rastertile::commands::{CommandFactory, RastertileCommandFactory};

fn prefix_arg() -> Arg {
    Arg::new("prefix")
        .long("prefix")
        .help("Tile file name prefix (<prefix>_<row>_<col>.<ext>)")
        .value_name("PREFIX")
}

fn ext_arg() -> Arg {
    Arg::new("ext")
        .long("ext")
        .help("Tile file extension (tif or png)")
        .value_name("EXT")
}

fn compression_arg() -> Arg {
    Arg::new("compression")
        .long("compression")
        .help("Compression of written GeoTIFFs (none, deflate, zstd)")
        .value_name("NAME")
}

fn tile_size_arg() -> Arg {
    Arg::new("tile-size")
        .long("tile-size")
        .help("Tile size as H,W or N")
        .value_name("H,W")
}

fn stride_arg() -> Arg {
    Arg::new("stride")
        .long("stride")
        .help("Step between tile origins as H,W or N (defaults to the tile size)")
        .value_name("H,W")
}

fn strategy_arg() -> Arg {
    Arg::new("strategy")
        .long("strategy")
        .help("Edge handling: stride-drop, padded or ragged")
        .value_name("STRATEGY")
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .help("Seed for reproducible synthetic boxes")
        .value_name("SEED")
}

fn band_policy_arg() -> Arg {
    Arg::new("band-policy")
        .long("band-policy")
        .help("Tiles with a different band count: permissive (drop/zero-fill) or strict (fail)")
        .value_name("POLICY")
}

fn crop_padding_arg() -> Arg {
    Arg::new("crop-padding")
        .long("crop-padding")
        .help("Crop padding recorded in the tile manifest")
        .action(ArgAction::SetTrue)
}

fn positional(id: &'static str, help: &'static str, index: usize) -> Arg {
    Arg::new(id).help(help).required(true).index(index)
}

fn main() {
    let matches = ClapCommand::new("rastertile")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Cut GeoTIFFs into tiles, annotate them and stitch them back together")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Run log listing written files")
                .value_name("FILE")
                .default_value("rastertile.log")
                .global(true),
        )
        .arg(
            Arg::new("log-to-file")
                .long("log-to-file")
                .help("Send log output to rastertile-global.log instead of stderr")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            ClapCommand::new("info")
                .about("Show raster dimensions, bands, datatype, transform and CRS")
                .arg(positional("input", "Input raster", 1)),
        )
        .subcommand(
            ClapCommand::new("tile")
                .about("Cut a raster into tiles")
                .arg(positional("input", "Input raster", 1))
                .arg(positional("output_dir", "Directory for the tiles", 2))
                .arg(tile_size_arg())
                .arg(stride_arg())
                .arg(strategy_arg())
                .arg(prefix_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help("Tile format (tif or png)")
                        .value_name("FORMAT"),
                )
                .arg(compression_arg()),
        )
        .subcommand(
            ClapCommand::new("annotate")
                .about("Inject synthetic detections into tiles")
                .arg(positional("tile_dir", "Directory holding the tiles", 1))
                .arg(positional("output_dir", "Directory for annotated tiles and exports", 2))
                .arg(prefix_arg())
                .arg(ext_arg())
                .arg(
                    Arg::new("boxes")
                        .long("boxes")
                        .help("Boxes per tile")
                        .value_name("N"),
                )
                .arg(seed_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("JSON export path (default <output_dir>/annotations.json)")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .help("CSV export path (default <output_dir>/annotations.csv)")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("no-burn")
                        .long("no-burn")
                        .help("Only export boxes, do not draw them into tile copies")
                        .action(ArgAction::SetTrue),
                )
                .arg(compression_arg()),
        )
        .subcommand(
            ClapCommand::new("stitch")
                .about("Stitch tiles back into one raster")
                .arg(positional("tile_dir", "Directory holding the tiles", 1))
                .arg(positional("output", "Output raster", 2))
                .arg(prefix_arg())
                .arg(ext_arg())
                .arg(band_policy_arg())
                .arg(
                    Arg::new("bands")
                        .long("bands")
                        .help("Band count of the mosaic (defaults to the first tile's)")
                        .value_name("N"),
                )
                .arg(
                    Arg::new("transform")
                        .long("transform")
                        .help("Mosaic transform: first-tile or grid-origin")
                        .value_name("SOURCE"),
                )
                .arg(crop_padding_arg())
                .arg(compression_arg()),
        )
        .subcommand(
            ClapCommand::new("pipeline")
                .about("Tile, annotate and stitch in one run")
                .arg(positional("input", "Input raster", 1))
                .arg(positional("work_dir", "Working directory", 2))
                .arg(tile_size_arg())
                .arg(stride_arg())
                .arg(strategy_arg())
                .arg(seed_arg())
                .arg(band_policy_arg())
                .arg(crop_padding_arg())
                .arg(compression_arg()),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    if matches.get_flag("log-to-file") {
        if let Err(e) = Logger::init_global_logger("rastertile-global.log") {
            eprintln!("Error setting up global logger: {}", e);
            process::exit(1);
        }
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }

    let log_file = matches.get_one::<String>("log-file").map(String::as_str).unwrap_or("rastertile.log");
    let logger = match Logger::new(log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => match PipelineConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };
    config.output.show_progress = true;
    debug!("Configuration: {:?}", config);

    let factory = RastertileCommandFactory::new();

    let command_result = factory.create_command(&matches, &config, &logger);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
