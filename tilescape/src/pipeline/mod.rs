//! Map data pipeline.
//!
//! Turns a [`Tile`](crate::tile::Tile) into a stream of renderable
//! [`MapData`]:
//!
//! ```text
//! Tile → ElevationSource ─┐
//!      → ProviderChain ───┴→ MapDataLibrary (store, load) → MapDataAdapter → MapData
//! ```
//!
//! # Key Components
//!
//! - [`SpatialEngine`] - Port to the external engine that owns the indices
//! - [`MapDataLibrary`] - One-time configured facade over the engine
//! - [`ProviderChain`] - Picks a [`MapDataProvider`] by level of detail
//! - [`ElevationSource`] - Makes elevation files available
//! - [`MapDataAdapter`] - Raw engine output to typed meshes and elements
//! - [`MapDataLoader`] - Runs the whole sequence for one tile
//!
//! Network and file access go through the [`NetworkService`] and
//! [`FileSystem`] ports so that tests run without either.

mod adapter;
mod elevation;
mod engine;
mod error;
mod filesystem;
mod library;
mod loader;
mod network;
mod provider;

pub use adapter::{mesh_id, Color, Element, MapData, MapDataAdapter, Mesh};
pub use elevation::{
    elevation_from_config, srtm_cell_name, srtm_cells, ElevationProvider, ElevationSource,
    FlatElevation,
};
pub use engine::{
    ElevationDataType, EngineCallbacks, EngineError, RawElement, RawMesh, SpatialEngine,
    StorageKind, StoreTarget,
};
pub use error::PipelineError;
pub use filesystem::{FileSystem, PathResolver, RootPathResolver, TokioFileSystem};
pub use library::MapDataLibrary;
pub use loader::{LoadSummary, MapDataLoader};
pub use network::{NetworkService, ReqwestNetworkService};
pub use provider::{expand_url, MapDataProvider, ProviderChain, RemoteDataProvider};
