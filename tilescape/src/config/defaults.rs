//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;
use crate::pipeline::ElevationDataType;
use crate::range::Range;

// =============================================================================
// Tile controller defaults
// =============================================================================

/// Default debounce distance in world units.
pub const DEFAULT_MOVE_SENSITIVITY: f64 = 30.0;

/// Default preload border, percent of tile width.
pub const DEFAULT_OFFSET_RATIO_PERCENT: f64 = 10.0;

/// Default Manhattan distance beyond which tiles are unloaded.
pub const DEFAULT_MAX_TILE_DISTANCE: u32 = 2;

/// Default level of detail for position updates.
pub const DEFAULT_LEVEL_OF_DETAIL: u8 = 16;

// =============================================================================
// Data provider defaults
// =============================================================================

/// OpenStreetMap map query. `{bbox}` expands to `minLon,minLat,maxLon,maxLat`.
pub const DEFAULT_OSM_URL: &str = "https://overpass-api.de/api/map?bbox={bbox}";

pub const DEFAULT_OSM_LOD_RANGE: Range<u8> = Range::new(16, 23);

pub const DEFAULT_MAPZEN_URL: &str =
    "https://tile.mapzen.com/mapzen/vector/v1/all/{lod}/{x}/{y}.json?api_key={api_key}";

pub const DEFAULT_MAPZEN_LOD_RANGE: Range<u8> = Range::new(1, 15);

// =============================================================================
// Elevation defaults
// =============================================================================

/// SRTM3 cell archive. `{cell}` expands to names like `N52E013`.
pub const DEFAULT_SRTM_URL: &str = "https://dds.cr.usgs.gov/srtm/version2_1/SRTM3/{cell}.hgt";

// =============================================================================
// Network defaults
// =============================================================================

/// Default HTTP timeout in seconds.
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Style defaults
// =============================================================================

pub const DEFAULT_STYLE_PATH: &str = "default.mapcss";

// =============================================================================
// ConfigFile Default impl
// =============================================================================

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            tile: TileSettings {
                move_sensitivity: DEFAULT_MOVE_SENSITIVITY,
                offset_ratio: DEFAULT_OFFSET_RATIO_PERCENT,
                max_distance: DEFAULT_MAX_TILE_DISTANCE,
                level_of_detail: DEFAULT_LEVEL_OF_DETAIL,
            },
            data: DataSettings {
                osm_url: DEFAULT_OSM_URL.to_string(),
                osm_lod_range: DEFAULT_OSM_LOD_RANGE,
                mapzen_url: DEFAULT_MAPZEN_URL.to_string(),
                mapzen_api_key: None,
                mapzen_lod_range: DEFAULT_MAPZEN_LOD_RANGE,
            },
            cache: CacheSettings {
                directory: config_dir.join("cache"),
            },
            elevation: ElevationSettings {
                elevation_type: ElevationDataType::Flat,
                directory: config_dir.join("elevation"),
                srtm_url: DEFAULT_SRTM_URL.to_string(),
                grid_url: None,
            },
            index: IndexSettings {
                string_path: config_dir.join("index").join("strings"),
                spatial_path: config_dir.join("index").join("data"),
            },
            style: StyleSettings {
                path: DEFAULT_STYLE_PATH.into(),
            },
            network: NetworkSettings {
                timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: config_dir.join("tilescape.log"),
            },
        }
    }
}
