//! Controller state and event types.

use std::fmt;
use std::sync::Arc;

use crate::coord::QuadKey;
use crate::tile::Tile;

/// Where the observer stands relative to the loaded set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// No position evaluated yet.
    #[default]
    Idle,
    /// The current quadkey was already loaded.
    Settled,
    /// The current quadkey had to be loaded.
    Loading,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Settled => write!(f, "Settled"),
            Self::Loading => write!(f, "Loading"),
        }
    }
}

/// Tile lifecycle event.
#[derive(Debug, Clone)]
pub enum TileEvent {
    Loaded(Arc<Tile>),
    Unloaded(Arc<Tile>),
}

impl TileEvent {
    pub fn tile(&self) -> &Arc<Tile> {
        match self {
            Self::Loaded(tile) | Self::Unloaded(tile) => tile,
        }
    }

    pub fn quadkey(&self) -> QuadKey {
        *self.tile().quadkey()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// What a position update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionUpdate {
    /// True when the update was debounced and nothing was evaluated.
    pub skipped: bool,
    pub current: Option<QuadKey>,
    pub loaded: Vec<QuadKey>,
    pub unloaded: Vec<QuadKey>,
}

impl PositionUpdate {
    pub(super) fn skipped(current: Option<QuadKey>) -> Self {
        Self {
            skipped: true,
            current,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty()
    }
}
