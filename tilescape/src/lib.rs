//! tilescape - quadkey tile streaming around a moving observer
//!
//! The library decides which map tiles are loaded as an observer moves,
//! resolves each tile's map data (store, disk cache, remote) and adapts the
//! spatial engine's output into typed meshes and elements.
//!
//! # High-Level API
//!
//! ```ignore
//! use tilescape::controller::{ControllerConfig, TileController};
//! use tilescape::service::{drain_into, TileStreamer};
//!
//! let controller = Arc::new(TileController::new(config, projection, stylesheet));
//! let (streamer, mut commands) = TileStreamer::start(controller.clone(), loader);
//!
//! controller.on_geo_position(position, 16)?;
//! drain_into(&mut commands, &mut render_sink);
//! ```
//!
//! The spatial engine, the renderer, and the network and file system are
//! reached only through traits ([`pipeline::SpatialEngine`],
//! [`service::RenderSink`], [`pipeline::NetworkService`],
//! [`pipeline::FileSystem`]).

pub mod config;
pub mod controller;
pub mod coord;
pub mod logging;
pub mod panic;
pub mod pipeline;
pub mod projection;
pub mod range;
pub mod service;
pub mod tile;
pub mod world;

/// Version of the tilescape library and CLI.
///
/// Shared across the workspace through `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_coord_module_exists() {
        use crate::coord::{create_quadkey, GeoCoordinate};
        let quadkey = create_quadkey(GeoCoordinate::new(40.7128, -74.0060), 16);
        assert_eq!(quadkey.level_of_detail, 16);
    }
}
