//! Configuration for tilescape.
//!
//! Configuration lives in `~/.tilescape/config.ini`. A missing file yields the
//! defaults; values present in the file overlay them section by section.
//!
//! ```ini
//! [tile]
//! move_sensitivity = 30
//! offset_ratio = 10
//! max_distance = 2
//!
//! [data]
//! osm_lod_range = 16-23
//! mapzen_lod_range = 1-15
//! ```
//!
//! Individual values can be read and written by flat key path through
//! [`ConfigKey`], which is what `tilescape config get/set` uses.

mod defaults;
mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    CacheSettings, ConfigFile, DataSettings, ElevationSettings, IndexSettings, LoggingSettings,
    NetworkSettings, StyleSettings, TileSettings,
};
