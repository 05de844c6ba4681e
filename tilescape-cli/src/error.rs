//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes.

use std::process;

use thiserror::Error;
use tilescape::config::ConfigFileError;
use tilescape::coord::CoordError;
use tilescape::pipeline::PipelineError;

/// Exit status for usage and configuration problems.
const EXIT_USAGE: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    ConfigFile(#[from] ConfigFileError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid coordinate: {0}")]
    Coord(#[from] CoordError),

    #[error("Failed to fetch map data: {0}")]
    Fetch(#[from] PipelineError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_)
            | CliError::ConfigFile(_)
            | CliError::InvalidArgument(_)
            | CliError::Coord(_) => EXIT_USAGE,
            _ => 1,
        }
    }

    /// Prints the error with any hints and exits the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Fetch(PipelineError::Network { .. }) => {
                eprintln!();
                eprintln!("Check that the data server is reachable and that");
                eprintln!("data.osm_url / data.mapzen_url point at it:");
                eprintln!("  tilescape config get data.osm_url");
            }
            CliError::Fetch(PipelineError::NoProvider(lod)) => {
                eprintln!();
                eprintln!("No provider covers level of detail {}. Adjust the ranges:", lod);
                eprintln!("  tilescape config set data.osm_lod_range 16-23");
            }
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Configuration file: {}", tilescape::config::config_file_path().display());
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidArgument("lod".into()).exit_code(), 2);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 2);
        assert_eq!(CliError::Fetch(PipelineError::Cancelled).exit_code(), 1);
        assert_eq!(CliError::LoggingInit("busy".into()).exit_code(), 1);
    }

    #[test]
    fn test_messages() {
        let err = CliError::Fetch(PipelineError::NoProvider(3));
        assert!(err.to_string().starts_with("Failed to fetch map data:"));
        assert_eq!(
            CliError::InvalidArgument("steps must be positive".into()).to_string(),
            "Invalid argument: steps must be positive"
        );
    }
}
