//! Common setup for commands that do real work.
//!
//! Loads configuration, initializes logging and installs the panic hook.

use std::path::Path;

use tilescape::config::ConfigFile;
use tilescape::logging::{init_logging_at, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Keeps logging alive for the duration of a command.
pub struct CliRunner {
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads `config_path` (or the default file) and starts logging to
    /// `logging.file`.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let logging_guard = init_logging_at(&config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;
        tilescape::panic::init();

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!("tilescape v{}", tilescape::VERSION);
        info!("tilescape CLI: {} command", command);
    }
}

/// Loads and validates configuration without touching logging.
pub fn load_config(config_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    config.validate()?;
    Ok(config)
}
