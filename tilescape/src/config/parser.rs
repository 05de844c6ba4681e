//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::range::Range;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// Required directories given as an empty value are stored empty so that
/// [`ConfigFile::validate`] can report them.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tile] section
    if let Some(section) = ini.section(Some("tile")) {
        if let Some(v) = section.get("move_sensitivity") {
            config.tile.move_sensitivity =
                parse_value("tile", "move_sensitivity", v, "must be a number (world units)")?;
        }
        if let Some(v) = section.get("offset_ratio") {
            config.tile.offset_ratio =
                parse_value("tile", "offset_ratio", v, "must be a number (percent)")?;
        }
        if let Some(v) = section.get("max_distance") {
            config.tile.max_distance =
                parse_value("tile", "max_distance", v, "must be a positive integer (tiles)")?;
        }
        if let Some(v) = section.get("level_of_detail") {
            let lod: u8 = parse_value("tile", "level_of_detail", v, "must be between 1 and 23")?;
            if !(1..=crate::coord::MAX_LEVEL_OF_DETAIL).contains(&lod) {
                return Err(invalid("tile", "level_of_detail", v, "must be between 1 and 23"));
            }
            config.tile.level_of_detail = lod;
        }
    }

    // [data] section
    if let Some(section) = ini.section(Some("data")) {
        if let Some(v) = section.get("osm_url") {
            let v = v.trim();
            if !v.is_empty() {
                config.data.osm_url = v.to_string();
            }
        }
        if let Some(v) = section.get("osm_lod_range") {
            config.data.osm_lod_range = parse_lod_range("osm_lod_range", v)?;
        }
        if let Some(v) = section.get("mapzen_url") {
            let v = v.trim();
            if !v.is_empty() {
                config.data.mapzen_url = v.to_string();
            }
        }
        if let Some(v) = section.get("mapzen_api_key") {
            let v = v.trim();
            if !v.is_empty() {
                config.data.mapzen_api_key = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("mapzen_lod_range") {
            config.data.mapzen_lod_range = parse_lod_range("mapzen_lod_range", v)?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            config.cache.directory = expand_tilde(v.trim());
        }
    }

    // [elevation] section
    if let Some(section) = ini.section(Some("elevation")) {
        if let Some(v) = section.get("type") {
            config.elevation.elevation_type = parse_value(
                "elevation",
                "type",
                v,
                "must be one of: flat, srtm, grid",
            )?;
        }
        if let Some(v) = section.get("directory") {
            config.elevation.directory = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("srtm_url") {
            let v = v.trim();
            if !v.is_empty() {
                config.elevation.srtm_url = v.to_string();
            }
        }
        if let Some(v) = section.get("grid_url") {
            let v = v.trim();
            if !v.is_empty() {
                config.elevation.grid_url = Some(v.to_string());
            }
        }
    }

    // [index] section
    if let Some(section) = ini.section(Some("index")) {
        if let Some(v) = section.get("string_path") {
            config.index.string_path = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("spatial_path") {
            config.index.spatial_path = expand_tilde(v.trim());
        }
    }

    // [style] section
    if let Some(section) = ini.section(Some("style")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.style.path = expand_tilde(v);
            }
        }
    }

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = section.get("timeout_secs") {
            config.network.timeout_secs = parse_value(
                "network",
                "timeout_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_lod_range(key: &str, value: &str) -> Result<Range<u8>, ConfigFileError> {
    let reason = "expected 'min-max' with 1 <= min <= max <= 23";
    let range: Range<u8> = parse_value("data", key, value, reason)?;
    if !range.is_valid() || range.min == 0 || range.max > crate::coord::MAX_LEVEL_OF_DETAIL {
        return Err(invalid("data", key, value, reason));
    }
    Ok(range)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::pipeline::ElevationDataType;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[tile]
move_sensitivity = 12.5
max_distance = 3
"#,
        )
        .unwrap();

        assert_eq!(config.tile.move_sensitivity, 12.5);
        assert_eq!(config.tile.max_distance, 3);
        // Untouched keys keep their defaults
        assert_eq!(config.tile.offset_ratio, DEFAULT_OFFSET_RATIO_PERCENT);
        assert_eq!(config.data.osm_lod_range, DEFAULT_OSM_LOD_RANGE);
        assert_eq!(config.network.timeout_secs, DEFAULT_NETWORK_TIMEOUT_SECS);
    }

    #[test]
    fn test_data_and_elevation_sections() {
        let config = load(
            r#"
[data]
osm_url = http://localhost:8080/map?bbox={bbox}
osm_lod_range = 14-23
mapzen_api_key = secret
mapzen_lod_range = 1-13

[elevation]
type = srtm
directory = /srv/elevation
"#,
        )
        .unwrap();

        assert_eq!(config.data.osm_url, "http://localhost:8080/map?bbox={bbox}");
        assert_eq!(config.data.osm_lod_range, Range::new(14, 23));
        assert_eq!(config.data.mapzen_api_key.as_deref(), Some("secret"));
        assert_eq!(config.data.mapzen_lod_range, Range::new(1, 13));
        assert_eq!(config.elevation.elevation_type, ElevationDataType::Srtm);
        assert_eq!(config.elevation.directory, PathBuf::from("/srv/elevation"));
    }

    #[test]
    fn test_invalid_elevation_type() {
        let err = load("[elevation]\ntype = lidar\n").unwrap_err();
        assert!(err.to_string().contains("elevation.type"));
        assert!(err.to_string().contains("flat, srtm, grid"));
    }

    #[test]
    fn test_invalid_lod_range() {
        assert!(load("[data]\nosm_lod_range = 20-10\n").is_err());
        assert!(load("[data]\nosm_lod_range = 0-10\n").is_err());
        assert!(load("[data]\nosm_lod_range = 16-30\n").is_err());
        assert!(load("[data]\nosm_lod_range = sixteen\n").is_err());
    }

    #[test]
    fn test_invalid_number() {
        let err = load("[tile]\nmove_sensitivity = fast\n").unwrap_err();
        assert!(err.to_string().contains("move_sensitivity"));

        assert!(load("[tile]\nlevel_of_detail = 0\n").is_err());
        assert!(load("[tile]\nlevel_of_detail = 24\n").is_err());
    }

    #[test]
    fn test_empty_required_directory_is_kept_empty() {
        let config = load("[index]\nstring_path =\n").unwrap();
        assert!(config.index.string_path.as_os_str().is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
