//! Tile spatial controller.
//!
//! Tracks the observer, decides which quadkeys are loaded, preloaded and
//! unloaded, and owns the [`ElementRegistry`](crate::tile::ElementRegistry)
//! shared by its tiles.
//!
//! # Push and pull
//!
//! - Pull: [`TileController::loaded_quadkeys`], [`TileController::state`] and
//!   friends answer from the current loaded set.
//! - Push: [`TileController::subscribe`] yields a [`TileEvent`] for every
//!   load and unload.
//!
//! The position-update algorithm is synchronous. Data loading happens
//! elsewhere, driven by the events.

mod config;
mod lod;
mod model;
mod tracker;

pub use config::ControllerConfig;
pub use lod::{LodSelector, DEFAULT_ALTITUDE_BUCKETS};
pub use model::{ControllerState, PositionUpdate, TileEvent};
pub use tracker::TileController;
