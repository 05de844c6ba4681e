//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list` and `config path` for
//! viewing and modifying settings from the command line.

use std::path::Path;

use clap::Subcommand;
use tilescape::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., tile.max_distance)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., tile.max_distance)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against `config_path` or the default file.
pub fn run(config_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Get { key } => {
            println!("{}", display_value(&get_value(&path, &key)?));
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let name = set_value(&path, &key, &value)?;
            println!("Set {} = {}", name, value);
            Ok(())
        }
        ConfigCommands::List => {
            print!("{}", render_list(&ConfigFile::load_from(&path)?));
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'tilescape config list' to see available keys.",
            key
        ))
    })
}

fn get_value(path: &Path, key: &str) -> Result<String, CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load_from(path)?;
    Ok(config_key.get(&config))
}

/// Validates and writes one value, returning the canonical key name.
fn set_value(path: &Path, key: &str, value: &str) -> Result<&'static str, CliError> {
    let config_key = parse_key(key)?;
    let mut config = ConfigFile::load_from(path)?;
    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.save_to(path)?;
    Ok(config_key.name())
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

fn render_list(config: &ConfigFile) -> String {
    let mut out = String::from("Configuration Settings\n======================\n");
    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            out.push_str(&format!("\n[{}]\n", section));
            current_section = section;
        }
        out.push_str(&format!(
            "  {} = {}\n",
            key.key_name(),
            display_value(&key.get(config))
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        assert_eq!(get_value(&path, "tile.max_distance").unwrap(), "2");
        assert_eq!(
            set_value(&path, "tile.max_distance", "3").unwrap(),
            "tile.max_distance"
        );
        assert_eq!(get_value(&path, "tile.max_distance").unwrap(), "3");
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        assert!(matches!(
            set_value(&path, "tile.offset_ratio", "250"),
            Err(CliError::Config(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_key() {
        let dir = TempDir::new().unwrap();
        let err = get_value(&dir.path().join("config.ini"), "tile.nope").unwrap_err();
        assert!(err.to_string().contains("tile.nope"));
    }

    #[test]
    fn test_list_groups_sections() {
        let text = render_list(&ConfigFile::default());
        assert!(text.contains("[tile]\n"));
        assert!(text.contains("  max_distance = 2\n"));
        assert!(text.contains("[data]\n"));
    }
}
