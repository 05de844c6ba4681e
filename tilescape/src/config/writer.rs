//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let mapzen_api_key = config.data.mapzen_api_key.as_deref().unwrap_or("");
    let grid_url = config.elevation.grid_url.as_deref().unwrap_or("");

    format!(
        r#"[tile]
; World units the observer must move before tiles are re-evaluated
move_sensitivity = {}
; Preload border as a percentage of the tile width
offset_ratio = {}
; Tiles further than this (Manhattan distance, in tiles) are unloaded
max_distance = {}
; Level of detail used by the CLI when none is given (1-23)
level_of_detail = {}

[data]
; Remote data templates understand {{quadkey}}, {{x}}, {{y}}, {{lod}}, {{bbox}}, {{api_key}}
; {{bbox}} expands to minLon,minLat,maxLon,maxLat
osm_url = {}
; Levels of detail served from OpenStreetMap (min-max)
osm_lod_range = {}
mapzen_url = {}
mapzen_api_key = {}
mapzen_lod_range = {}

[cache]
; One <quadkey>.<ext> file per downloaded tile
directory = {}

[elevation]
; Elevation source:
;   flat - no elevation data
;   srtm - 1 degree SRTM cells (N52E013.hgt)
;   grid - per-quadkey elevation grid (<quadkey>.ele)
type = {}
directory = {}
; {{cell}} expands to names like N52E013
srtm_url = {}
; {{quadkey}} template, required when type = grid
grid_url = {}

[index]
; Spatial engine index directories (created on first run)
string_path = {}
spatial_path = {}

[style]
path = {}

[network]
; HTTP request timeout in seconds
timeout_secs = {}

[logging]
file = {}
"#,
        config.tile.move_sensitivity,
        config.tile.offset_ratio,
        config.tile.max_distance,
        config.tile.level_of_detail,
        config.data.osm_url,
        config.data.osm_lod_range,
        config.data.mapzen_url,
        mapzen_api_key,
        config.data.mapzen_lod_range,
        path_to_string(&config.cache.directory),
        config.elevation.elevation_type,
        path_to_string(&config.elevation.directory),
        config.elevation.srtm_url,
        grid_url,
        path_to_string(&config.index.string_path),
        path_to_string(&config.index.spatial_path),
        path_to_string(&config.style.path),
        config.network.timeout_secs,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ElevationDataType;
    use crate::range::Range;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.tile.move_sensitivity = 45.0;
        config.data.osm_lod_range = Range::new(15, 20);
        config.data.mapzen_api_key = Some("key-123".to_string());
        config.elevation.elevation_type = ElevationDataType::Grid;
        config.elevation.grid_url = Some("http://localhost/{quadkey}.ele".to_string());
        config.cache.directory = temp_dir.path().join("cache");
        config.save_to(&path).unwrap();

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded.tile.move_sensitivity, 45.0);
        assert_eq!(reloaded.data.osm_lod_range, Range::new(15, 20));
        assert_eq!(reloaded.data.mapzen_api_key.as_deref(), Some("key-123"));
        assert_eq!(reloaded.elevation.elevation_type, ElevationDataType::Grid);
        assert_eq!(
            reloaded.elevation.grid_url.as_deref(),
            Some("http://localhost/{quadkey}.ele")
        );
        assert_eq!(reloaded.cache.directory, temp_dir.path().join("cache"));
        assert_eq!(reloaded.data.osm_url, config.data.osm_url);
    }

    #[test]
    fn test_placeholders_survive_formatting() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("osm_url = https://overpass-api.de/api/map?bbox={bbox}"));
        assert!(text.contains("; {cell} expands"));
    }
}
