//! Tilescan CLI - Command-line interface
//!
//! Surveys orthomosaic tiles for road damage and grades what the detector
//! finds. Settings come from `~/.tilescan/config.ini`; flags override them.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilescan::detection::DEFAULT_CONFIDENCE;
use tilescan::resolution::STANDARD_TILE_SIZE_PX;

use commands::grade::GradeArgs;
use commands::gsd::GsdArgs;
use commands::plan::PlanArgs;
use commands::run::RunArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilescan")]
#[command(version = tilescan::VERSION)]
#[command(about = "Locate orthomosaic tiles over survey areas and grade detected road damage", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.tilescan/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Survey a project: download its tiles, detect, grade and upload the result
    Run {
        /// Project id, as used in storage keys
        #[arg(long)]
        project: String,

        /// Object store base URL (overrides bucket and config)
        #[arg(long)]
        endpoint: Option<String>,

        /// S3 bucket name (overrides config)
        #[arg(long)]
        bucket: Option<String>,

        /// Bucket region, also used to sign requests (overrides config)
        #[arg(long)]
        region: Option<String>,

        /// Access key for signed requests (overrides config)
        #[arg(long, requires = "secret_key")]
        access_key: Option<String>,

        /// Secret key for signed requests (overrides config)
        #[arg(long, requires = "access_key")]
        secret_key: Option<String>,

        /// Read and write objects in a local directory instead of over HTTP
        #[arg(long, conflicts_with_all = ["endpoint", "bucket", "region", "access_key", "secret_key"])]
        store_dir: Option<PathBuf>,

        /// Directory tiles are downloaded into (overrides config)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Grade existing YOLO labels from this directory instead of running the detector
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Keep downloaded tiles after the survey
        #[arg(long)]
        keep_tiles: bool,
    },

    /// List the tiles a request document covers
    Plan {
        /// Request document (request.json)
        #[arg(long)]
        request: PathBuf,

        /// Project id used in the tile root
        #[arg(long)]
        project: String,

        /// Print JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Print the ground sample distance at a latitude and zoom
    Gsd {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Zoom level (0-30)
        #[arg(long)]
        zoom: u8,

        /// Tile size in pixels
        #[arg(long, default_value_t = STANDARD_TILE_SIZE_PX)]
        tile_size: u32,
    },

    /// Grade a directory of YOLO label files and print the result document
    Grade {
        /// Directory of {lng}_{lat}.txt label files
        #[arg(long)]
        labels: PathBuf,

        /// Latitude of the survey in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Zoom level of the imagery
        #[arg(long)]
        zoom: u8,

        /// Detector input size in pixels
        #[arg(long, default_value_t = STANDARD_TILE_SIZE_PX)]
        tile_size: u32,

        /// Minimum detection confidence
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Create the configuration file with default values
    Init,

    /// Show the configuration file path
    ConfigPath,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result: Result<(), CliError> = match cli.command {
        Commands::Run {
            project,
            endpoint,
            bucket,
            region,
            access_key,
            secret_key,
            store_dir,
            work_dir,
            labels,
            keep_tiles,
        } => CliRunner::new(config_path, cli.verbose, false).and_then(|runner| {
            runner.log_startup("run", config_path);
            commands::run::run(
                runner,
                RunArgs {
                    project,
                    endpoint,
                    bucket,
                    region,
                    access_key,
                    secret_key,
                    store_dir,
                    work_dir,
                    labels,
                    keep_tiles,
                },
            )
        }),

        Commands::Plan {
            request,
            project,
            json,
        } => CliRunner::new(config_path, cli.verbose, false).and_then(|runner| {
            runner.log_startup("plan", config_path);
            commands::plan::run(
                PlanArgs {
                    request,
                    project,
                    json,
                },
                runner.config(),
            )
        }),

        Commands::Gsd {
            lat,
            zoom,
            tile_size,
        } => commands::gsd::run(GsdArgs {
            lat,
            zoom,
            tile_size,
        }),

        Commands::Grade {
            labels,
            lat,
            zoom,
            tile_size,
            confidence,
            pretty,
        } => commands::grade::run(GradeArgs {
            labels,
            lat,
            zoom,
            tile_size,
            confidence,
            pretty,
        }),

        Commands::Init => commands::init::run(config_path),

        Commands::ConfigPath => commands::config::run_path(),
    };

    if let Err(e) = result {
        e.exit();
    }
}
