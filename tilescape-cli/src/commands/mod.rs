//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`quadkey`] - Quadkey and bounding box arithmetic
//! - [`fetch`] - Single tile map data download
//! - [`track`] - Controller replay along a path
//! - [`config`] - Configuration management (get, set, list, path)

pub mod config;
pub mod fetch;
pub mod quadkey;
pub mod track;

use tilescape::coord::MAX_LEVEL_OF_DETAIL;

use crate::error::CliError;

/// Checks a user-supplied level of detail.
pub fn validate_lod(lod: u8) -> Result<u8, CliError> {
    if (1..=MAX_LEVEL_OF_DETAIL).contains(&lod) {
        Ok(lod)
    } else {
        Err(CliError::InvalidArgument(format!(
            "level of detail must be between 1 and {}, got {}",
            MAX_LEVEL_OF_DETAIL, lod
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lod() {
        assert_eq!(validate_lod(1).unwrap(), 1);
        assert_eq!(validate_lod(23).unwrap(), 23);
        assert!(validate_lod(0).is_err());
        assert!(validate_lod(24).is_err());
    }
}
