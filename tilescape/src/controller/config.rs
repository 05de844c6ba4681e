//! Controller tuning.

use crate::config::{
    ConfigFile, DEFAULT_MAX_TILE_DISTANCE, DEFAULT_MOVE_SENSITIVITY, DEFAULT_OFFSET_RATIO_PERCENT,
};

/// Parameters of the position-update algorithm.
///
/// Values are taken as given. A non-positive sensitivity simply disables
/// debouncing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Minimum ground movement in world units before a position is
    /// re-evaluated.
    pub move_sensitivity: f64,
    /// Preload margin as a percentage of the tile width.
    pub offset_ratio_percent: f64,
    /// Tiles further than this (Manhattan, tile units) from the current one
    /// are unloaded.
    pub max_tile_distance: u32,
}

impl ControllerConfig {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            move_sensitivity: config.tile.move_sensitivity,
            offset_ratio_percent: config.tile.offset_ratio,
            max_tile_distance: config.tile.max_distance,
        }
    }

    /// Preload margin in world units for a tile `width` wide.
    pub fn preload_offset(&self, width: f64) -> f64 {
        width * self.offset_ratio_percent / 100.0
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            move_sensitivity: DEFAULT_MOVE_SENSITIVITY,
            offset_ratio_percent: DEFAULT_OFFSET_RATIO_PERCENT,
            max_tile_distance: DEFAULT_MAX_TILE_DISTANCE,
        }
    }
}
