//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::pipeline::ElevationDataType;
use crate::range::Range;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Tile controller tuning
    pub tile: TileSettings,
    /// Remote map data sources
    pub data: DataSettings,
    /// Map data cache
    pub cache: CacheSettings,
    /// Elevation data
    pub elevation: ElevationSettings,
    /// Spatial engine index locations
    pub index: IndexSettings,
    /// Stylesheet
    pub style: StyleSettings,
    /// HTTP client
    pub network: NetworkSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Tile controller configuration.
#[derive(Debug, Clone)]
pub struct TileSettings {
    /// World units the observer must move before the controller re-evaluates.
    pub move_sensitivity: f64,
    /// Preload border as a percentage of the tile width.
    pub offset_ratio: f64,
    /// Manhattan distance (in tiles) beyond which loaded tiles are unloaded.
    pub max_distance: u32,
    /// Level of detail used when none is given explicitly.
    pub level_of_detail: u8,
}

/// Remote map data providers.
///
/// URL templates understand `{quadkey}`, `{x}`, `{y}`, `{lod}`, `{bbox}`
/// and `{api_key}`.
#[derive(Debug, Clone)]
pub struct DataSettings {
    /// OpenStreetMap query template
    pub osm_url: String,
    /// Levels of detail served from OpenStreetMap
    pub osm_lod_range: Range<u8>,
    /// Mapzen vector tile template
    pub mapzen_url: String,
    /// Mapzen API key (substituted for `{api_key}`)
    pub mapzen_api_key: Option<String>,
    /// Levels of detail served from Mapzen
    pub mapzen_lod_range: Range<u8>,
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Directory holding one `<quadkey>.<ext>` file per downloaded tile.
    pub directory: PathBuf,
}

/// Elevation configuration.
#[derive(Debug, Clone)]
pub struct ElevationSettings {
    pub elevation_type: ElevationDataType,
    pub directory: PathBuf,
    /// SRTM cell template, `{cell}` is replaced by names like `N52E013`.
    pub srtm_url: String,
    /// Grid elevation template, keyed by `{quadkey}`.
    pub grid_url: Option<String>,
}

/// Spatial engine index locations.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub string_path: PathBuf,
    pub spatial_path: PathBuf,
}

/// Stylesheet configuration.
#[derive(Debug, Clone)]
pub struct StyleSettings {
    pub path: PathBuf,
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    /// Timeout in seconds for HTTP requests.
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
