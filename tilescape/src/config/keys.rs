//! Configuration key access and validation.
//!
//! This module provides a type-safe interface for getting and setting
//! configuration values by key name (`"section.key"`), with validation via the
//! Specification Pattern.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use super::file::ConfigFile;
use crate::coord::MAX_LEVEL_OF_DETAIL;
use crate::range::Range;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a specific field in [`ConfigFile`] and knows how to
/// get and set its value with proper validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    // Tile settings
    TileMoveSensitivity,
    TileOffsetRatio,
    TileMaxDistance,
    TileLevelOfDetail,

    // Data settings
    DataOsmUrl,
    DataOsmLodRange,
    DataMapzenUrl,
    DataMapzenApiKey,
    DataMapzenLodRange,

    // Cache settings
    CacheDirectory,

    // Elevation settings
    ElevationType,
    ElevationDirectory,
    ElevationSrtmUrl,
    ElevationGridUrl,

    // Index settings
    IndexStringPath,
    IndexSpatialPath,

    // Style settings
    StylePath,

    // Network settings
    NetworkTimeoutSecs,

    // Logging settings
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .find(|key| key.name() == lower)
            .copied()
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the canonical key name (e.g., "tile.move_sensitivity").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::TileMoveSensitivity => "tile.move_sensitivity",
            ConfigKey::TileOffsetRatio => "tile.offset_ratio",
            ConfigKey::TileMaxDistance => "tile.max_distance",
            ConfigKey::TileLevelOfDetail => "tile.level_of_detail",
            ConfigKey::DataOsmUrl => "data.osm_url",
            ConfigKey::DataOsmLodRange => "data.osm_lod_range",
            ConfigKey::DataMapzenUrl => "data.mapzen_url",
            ConfigKey::DataMapzenApiKey => "data.mapzen_api_key",
            ConfigKey::DataMapzenLodRange => "data.mapzen_lod_range",
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::ElevationType => "elevation.type",
            ConfigKey::ElevationDirectory => "elevation.directory",
            ConfigKey::ElevationSrtmUrl => "elevation.srtm_url",
            ConfigKey::ElevationGridUrl => "elevation.grid_url",
            ConfigKey::IndexStringPath => "index.string_path",
            ConfigKey::IndexSpatialPath => "index.spatial_path",
            ConfigKey::StylePath => "style.path",
            ConfigKey::NetworkTimeoutSecs => "network.timeout_secs",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Get the section name (e.g., "tile").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "move_sensitivity").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::TileMoveSensitivity => config.tile.move_sensitivity.to_string(),
            ConfigKey::TileOffsetRatio => config.tile.offset_ratio.to_string(),
            ConfigKey::TileMaxDistance => config.tile.max_distance.to_string(),
            ConfigKey::TileLevelOfDetail => config.tile.level_of_detail.to_string(),
            ConfigKey::DataOsmUrl => config.data.osm_url.clone(),
            ConfigKey::DataOsmLodRange => config.data.osm_lod_range.to_string(),
            ConfigKey::DataMapzenUrl => config.data.mapzen_url.clone(),
            ConfigKey::DataMapzenApiKey => config.data.mapzen_api_key.clone().unwrap_or_default(),
            ConfigKey::DataMapzenLodRange => config.data.mapzen_lod_range.to_string(),
            ConfigKey::CacheDirectory => path_to_display(&config.cache.directory),
            ConfigKey::ElevationType => config.elevation.elevation_type.to_string(),
            ConfigKey::ElevationDirectory => path_to_display(&config.elevation.directory),
            ConfigKey::ElevationSrtmUrl => config.elevation.srtm_url.clone(),
            ConfigKey::ElevationGridUrl => config.elevation.grid_url.clone().unwrap_or_default(),
            ConfigKey::IndexStringPath => path_to_display(&config.index.string_path),
            ConfigKey::IndexSpatialPath => path_to_display(&config.index.spatial_path),
            ConfigKey::StylePath => path_to_display(&config.style.path),
            ConfigKey::NetworkTimeoutSecs => config.network.timeout_secs.to_string(),
            ConfigKey::LoggingFile => path_to_display(&config.logging.file),
        }
    }

    /// Set the value in a config file.
    ///
    /// Validates the value according to the key's specification before
    /// setting; on failure the config is left unchanged.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        self.validate(value)?;
        let failed = |reason: &str| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: reason.to_string(),
        };
        let value = value.trim();

        match self {
            ConfigKey::TileMoveSensitivity => {
                config.tile.move_sensitivity = value.parse().map_err(|_| failed("not a number"))?;
            }
            ConfigKey::TileOffsetRatio => {
                config.tile.offset_ratio = value.parse().map_err(|_| failed("not a number"))?;
            }
            ConfigKey::TileMaxDistance => {
                config.tile.max_distance = value.parse().map_err(|_| failed("not an integer"))?;
            }
            ConfigKey::TileLevelOfDetail => {
                config.tile.level_of_detail =
                    value.parse().map_err(|_| failed("not an integer"))?;
            }
            ConfigKey::DataOsmUrl => config.data.osm_url = value.to_string(),
            ConfigKey::DataOsmLodRange => {
                config.data.osm_lod_range = value.parse().map_err(|_| failed("not a range"))?;
            }
            ConfigKey::DataMapzenUrl => config.data.mapzen_url = value.to_string(),
            ConfigKey::DataMapzenApiKey => config.data.mapzen_api_key = optional_string(value),
            ConfigKey::DataMapzenLodRange => {
                config.data.mapzen_lod_range = value.parse().map_err(|_| failed("not a range"))?;
            }
            ConfigKey::CacheDirectory => config.cache.directory = expand_tilde(value),
            ConfigKey::ElevationType => {
                config.elevation.elevation_type =
                    value.parse().map_err(|_| failed("unknown elevation type"))?;
            }
            ConfigKey::ElevationDirectory => config.elevation.directory = expand_tilde(value),
            ConfigKey::ElevationSrtmUrl => config.elevation.srtm_url = value.to_string(),
            ConfigKey::ElevationGridUrl => config.elevation.grid_url = optional_string(value),
            ConfigKey::IndexStringPath => config.index.string_path = expand_tilde(value),
            ConfigKey::IndexSpatialPath => config.index.spatial_path = expand_tilde(value),
            ConfigKey::StylePath => config.style.path = expand_tilde(value),
            ConfigKey::NetworkTimeoutSecs => {
                config.network.timeout_secs =
                    value.parse().map_err(|_| failed("not an integer"))?;
            }
            ConfigKey::LoggingFile => config.logging.file = expand_tilde(value),
        }
        Ok(())
    }

    /// Validate a value according to this key's specification.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.specification()
            .is_satisfied_by(value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    /// Get the validation specification for this key.
    fn specification(&self) -> Box<dyn ValueSpecification> {
        match self {
            ConfigKey::TileMoveSensitivity => Box::new(PositiveNumberSpec),
            ConfigKey::TileOffsetRatio => Box::new(PercentSpec),
            ConfigKey::TileMaxDistance => Box::new(PositiveIntegerSpec),
            ConfigKey::TileLevelOfDetail => Box::new(LevelOfDetailSpec),
            ConfigKey::DataOsmUrl => Box::new(UrlTemplateSpec),
            ConfigKey::DataOsmLodRange => Box::new(LodRangeSpec),
            ConfigKey::DataMapzenUrl => Box::new(UrlTemplateSpec),
            ConfigKey::DataMapzenApiKey => Box::new(AnyStringSpec),
            ConfigKey::DataMapzenLodRange => Box::new(LodRangeSpec),
            ConfigKey::CacheDirectory => Box::new(PathSpec),
            ConfigKey::ElevationType => Box::new(OneOfSpec::new(&["flat", "srtm", "grid"])),
            ConfigKey::ElevationDirectory => Box::new(PathSpec),
            ConfigKey::ElevationSrtmUrl => Box::new(UrlTemplateSpec),
            ConfigKey::ElevationGridUrl => Box::new(OptionalUrlSpec),
            ConfigKey::IndexStringPath => Box::new(PathSpec),
            ConfigKey::IndexSpatialPath => Box::new(PathSpec),
            ConfigKey::StylePath => Box::new(PathSpec),
            ConfigKey::NetworkTimeoutSecs => Box::new(PositiveIntegerSpec),
            ConfigKey::LoggingFile => Box::new(PathSpec),
        }
    }

    /// Get all supported configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::TileMoveSensitivity,
            ConfigKey::TileOffsetRatio,
            ConfigKey::TileMaxDistance,
            ConfigKey::TileLevelOfDetail,
            ConfigKey::DataOsmUrl,
            ConfigKey::DataOsmLodRange,
            ConfigKey::DataMapzenUrl,
            ConfigKey::DataMapzenApiKey,
            ConfigKey::DataMapzenLodRange,
            ConfigKey::CacheDirectory,
            ConfigKey::ElevationType,
            ConfigKey::ElevationDirectory,
            ConfigKey::ElevationSrtmUrl,
            ConfigKey::ElevationGridUrl,
            ConfigKey::IndexStringPath,
            ConfigKey::IndexSpatialPath,
            ConfigKey::StylePath,
            ConfigKey::NetworkTimeoutSecs,
            ConfigKey::LoggingFile,
        ]
    }
}

// ============================================================================
// Value Specifications (Specification Pattern)
// ============================================================================

/// Trait for value validation specifications.
trait ValueSpecification {
    /// Returns Ok(()) if valid, Err(reason) if invalid.
    fn is_satisfied_by(&self, value: &str) -> Result<(), String>;
}

/// Specification that accepts any string value.
struct AnyStringSpec;

impl ValueSpecification for AnyStringSpec {
    fn is_satisfied_by(&self, _value: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Specification that requires the value to be one of a set of options.
struct OneOfSpec {
    options: &'static [&'static str],
}

impl OneOfSpec {
    fn new(options: &'static [&'static str]) -> Self {
        Self { options }
    }
}

impl ValueSpecification for OneOfSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let lower = value.to_lowercase();
        if self.options.iter().any(|opt| *opt == lower) {
            Ok(())
        } else {
            Err(format!("must be one of: {}", self.options.join(", ")))
        }
    }
}

/// Specification for positive integer values.
struct PositiveIntegerSpec;

impl ValueSpecification for PositiveIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        value
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| "must be a positive integer".to_string())
    }
}

/// Specification for positive floating-point number values.
struct PositiveNumberSpec;

impl ValueSpecification for PositiveNumberSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 0.0 => Ok(()),
            _ => Err("must be a positive number".to_string()),
        }
    }
}

/// Specification for a percentage between 0 and 50.
///
/// Past 50 the shrunk preload rectangle is empty.
struct PercentSpec;

impl ValueSpecification for PercentSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<f64>() {
            Ok(n) if (0.0..=50.0).contains(&n) => Ok(()),
            _ => Err("must be a percentage between 0 and 50".to_string()),
        }
    }
}

/// Specification for a level of detail (1-23).
struct LevelOfDetailSpec;

impl ValueSpecification for LevelOfDetailSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<u8>() {
            Ok(lod) if (1..=MAX_LEVEL_OF_DETAIL).contains(&lod) => Ok(()),
            _ => Err(format!("must be between 1 and {}", MAX_LEVEL_OF_DETAIL)),
        }
    }
}

/// Specification for a `min-max` level of detail range.
struct LodRangeSpec;

impl ValueSpecification for LodRangeSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let reason = || format!("must be a range like '16-23' within 1-{}", MAX_LEVEL_OF_DETAIL);
        let range: Range<u8> = value.parse().map_err(|_| reason())?;
        if range.is_valid() && range.min >= 1 && range.max <= MAX_LEVEL_OF_DETAIL {
            Ok(())
        } else {
            Err(reason())
        }
    }
}

/// Specification for path values (non-empty).
struct PathSpec;

impl ValueSpecification for PathSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must be a valid path".to_string())
        } else {
            Ok(())
        }
    }
}

/// Specification for URL templates.
struct UrlTemplateSpec;

impl ValueSpecification for UrlTemplateSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        } else {
            Err("must be a URL starting with 'http://' or 'https://'".to_string())
        }
    }
}

/// Specification for optional URL values.
struct OptionalUrlSpec;

impl ValueSpecification for OptionalUrlSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Ok(());
        }
        UrlTemplateSpec.is_satisfied_by(value)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn expand_tilde(path: &str) -> PathBuf {
    super::parser::expand_tilde(path)
}

/// Convert path to display string, collapsing home dir to ~.
fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

/// Convert empty string to None, non-empty to Some.
fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
