//! tilescape CLI - Command-line interface
//!
//! Quadkey arithmetic, map data fetching, controller replays and
//! configuration over the tilescape library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilescape")]
#[command(version = tilescape::VERSION)]
#[command(about = "Quadkey tile streaming and map data tools", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.tilescape/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the quadkey containing a coordinate
    Quadkey {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Level of detail (1-23)
        #[arg(long, default_value = "16")]
        lod: u8,
    },

    /// Show the bounding box of a quadkey digit string
    Bbox {
        /// Quadkey, e.g. 120210233
        quadkey: String,
    },

    /// Download map data for one tile into the cache
    Fetch {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Level of detail (defaults to tile.level_of_detail)
        #[arg(long)]
        lod: Option<u8>,
    },

    /// Replay a straight path through the tile controller
    Track {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        from_lon: f64,

        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,

        /// Number of position updates along the path
        #[arg(long, default_value = "100")]
        steps: u32,

        /// Level of detail (defaults to tile.level_of_detail)
        #[arg(long)]
        lod: Option<u8>,

        /// Observer altitude in metres, picks the level of detail when --lod is unset
        #[arg(long, conflicts_with = "lod")]
        altitude: Option<f64>,
    },

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Quadkey { lat, lon, lod } => commands::quadkey::run_quadkey(lat, lon, lod),
        Commands::Bbox { quadkey } => commands::quadkey::run_bbox(&quadkey),
        Commands::Fetch { lat, lon, lod } => commands::fetch::run(config_path, lat, lon, lod),
        Commands::Track {
            from_lat,
            from_lon,
            to_lat,
            to_lon,
            steps,
            lod,
            altitude,
        } => commands::track::run(
            config_path,
            commands::track::TrackArgs {
                from: (from_lat, from_lon),
                to: (to_lat, to_lon),
                steps,
                lod,
                altitude,
            },
        ),
        Commands::Config(command) => commands::config::run(config_path, command),
    }
}
