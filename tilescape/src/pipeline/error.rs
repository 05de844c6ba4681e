//! Error types for the map data pipeline.
//!
//! Every variant is terminal for the tile being loaded. None of them is
//! retried automatically; the controller drops the failed tile so a later
//! position update loads it again.

use thiserror::Error;

use crate::coord::QuadKey;
use crate::range::Range;

/// Errors that can occur while resolving, storing or loading a tile.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required setting missing or unusable; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// The spatial engine rejected an add-to-store call
    #[error("data store rejected {quadkey}: {message}")]
    Store { quadkey: QuadKey, message: String },

    /// The spatial engine rejected a bulk import
    #[error("data store rejected import for levels {range}: {message}")]
    Import { range: Range<u8>, message: String },

    /// The spatial engine reported an error while loading
    #[error("engine error loading {quadkey}: {message}")]
    Engine { quadkey: QuadKey, message: String },

    /// HTTP request failed
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No provider is registered for the level of detail
    #[error("no map data provider for level of detail {0}")]
    NoProvider(u8),

    /// The spatial engine was configured twice
    #[error("map data library is already configured")]
    AlreadyConfigured,

    /// A data operation ran before the engine was configured
    #[error("map data library is not configured")]
    NotConfigured,

    /// The tile was unloaded while its data was in flight
    #[error("tile load cancelled")]
    Cancelled,

    /// Task panicked during spawn_blocking
    #[error("task panicked: {0}")]
    TaskPanicked(String),
}

impl PipelineError {
    /// True for failures caused by the tile being unloaded rather than by
    /// the data itself.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
