//! Configuration file handling for ~/.tilescape/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use super::settings::*;

use super::keys::{ConfigKey, ConfigKeyError};
use crate::pipeline::ElevationDataType;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Required value is unset or empty
    #[error("Missing required configuration value: {key}")]
    MissingValue { key: String },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilescape/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilescape/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Checks the values the pipeline cannot start without.
    ///
    /// A missing directory here is a startup failure, not something to
    /// recover from per tile.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        require_path("cache.directory", &self.cache.directory)?;
        require_path("index.string_path", &self.index.string_path)?;
        require_path("index.spatial_path", &self.index.spatial_path)?;

        match self.elevation.elevation_type {
            ElevationDataType::Flat => {}
            ElevationDataType::Srtm => {
                require_path("elevation.directory", &self.elevation.directory)?;
                if self.elevation.srtm_url.trim().is_empty() {
                    return Err(missing("elevation.srtm_url"));
                }
            }
            ElevationDataType::Grid => {
                require_path("elevation.directory", &self.elevation.directory)?;
                if self.elevation.grid_url.is_none() {
                    return Err(missing("elevation.grid_url"));
                }
            }
        }
        Ok(())
    }

    /// Value of a `section.key` path as it would be written to the file.
    pub fn get(&self, key: &str) -> Result<String, ConfigKeyError> {
        Ok(key.parse::<ConfigKey>()?.get(self))
    }

    /// Validates and sets a `section.key` path.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigKeyError> {
        key.parse::<ConfigKey>()?.set(self, value)
    }
}

fn require_path(key: &str, path: &Path) -> Result<(), ConfigFileError> {
    if path.as_os_str().is_empty() {
        Err(missing(key))
    } else {
        Ok(())
    }
}

fn missing(key: &str) -> ConfigFileError {
    ConfigFileError::MissingValue {
        key: key.to_string(),
    }
}

/// Get the path to the config directory (~/.tilescape).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilescape")
}

/// Get the path to the config file (~/.tilescape/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.tile.move_sensitivity, DEFAULT_MOVE_SENSITIVITY);
        assert_eq!(config.tile.offset_ratio, DEFAULT_OFFSET_RATIO_PERCENT);
        assert_eq!(config.tile.max_distance, DEFAULT_MAX_TILE_DISTANCE);
        assert_eq!(config.elevation.elevation_type, ElevationDataType::Flat);
        assert!(config.data.mapzen_api_key.is_none());
        assert!(config.cache.directory.ends_with(".tilescape/cache"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        let default = ConfigFile::default();

        assert_eq!(config.data.osm_url, default.data.osm_url);
        assert_eq!(config.network.timeout_secs, default.network.timeout_secs);
    }

    #[test]
    fn test_validate_reports_missing_directory() {
        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::new();

        match config.validate() {
            Err(ConfigFileError::MissingValue { key }) => assert_eq!(key, "cache.directory"),
            other => panic!("expected MissingValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_grid_requires_template() {
        let mut config = ConfigFile::default();
        config.elevation.elevation_type = ElevationDataType::Grid;
        assert!(config.validate().is_err());

        config.elevation.grid_url = Some("http://localhost/{quadkey}.ele".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_and_set_by_key_path() {
        let mut config = ConfigFile::default();
        config.set("tile.level_of_detail", "14").unwrap();
        assert_eq!(config.tile.level_of_detail, 14);
        assert_eq!(config.get("tile.level_of_detail").unwrap(), "14");

        assert!(matches!(
            config.get("tile.unknown"),
            Err(ConfigKeyError::UnknownKey(_))
        ));
        assert!(config.set("tile.level_of_detail", "40").is_err());
        assert_eq!(config.tile.level_of_detail, 14);
    }
}
