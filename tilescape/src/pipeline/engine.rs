//! Port to the external spatial engine.
//!
//! The engine owns the string and spatial indices, evaluates stylesheets and
//! tessellates geometry. The pipeline only ever talks to it through
//! [`SpatialEngine`]. Results come back as flat arrays in [`RawMesh`] and
//! [`RawElement`], which the adapter turns into typed data.
//!
//! All engine calls are blocking; the loader runs them on the blocking pool.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::coord::QuadKey;
use crate::range::Range;

/// Where the engine keeps imported data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Lost when the process exits.
    InMemory,
    /// Written to the spatial index on disk.
    Persistent,
}

/// Elevation model the engine applies while building meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElevationDataType {
    #[default]
    Flat,
    Srtm,
    Grid,
}

impl fmt::Display for ElevationDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElevationDataType::Flat => "flat",
            ElevationDataType::Srtm => "srtm",
            ElevationDataType::Grid => "grid",
        };
        f.write_str(name)
    }
}

impl FromStr for ElevationDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(ElevationDataType::Flat),
            "srtm" => Ok(ElevationDataType::Srtm),
            "grid" => Ok(ElevationDataType::Grid),
            other => Err(format!("unknown elevation type '{}'", other)),
        }
    }
}

/// Scope of an add-to-store import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTarget {
    /// Bulk import covering every level of detail in the range.
    LodRange(Range<u8>),
    /// Incremental import for a single tile.
    QuadKey(QuadKey),
}

/// A mesh as produced by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    pub name: String,
    /// Flat `(longitude, latitude, height)` triples.
    pub vertices: Vec<f64>,
    /// Vertex indices, three per triangle.
    pub triangles: Vec<u32>,
    /// One packed RGBA colour per vertex.
    pub colors: Vec<u32>,
    /// Flat `(u, v)` pairs, may be empty.
    pub uvs: Vec<f64>,
}

/// A map element as produced by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawElement {
    pub id: u64,
    /// Flat `(longitude, latitude)` pairs.
    pub vertices: Vec<f64>,
    /// Per-vertex heights, may be empty.
    pub heights: Vec<f64>,
    /// Flat `key, value, key, value, ...` array.
    pub tags: Vec<String>,
    /// Flat `key, value, key, value, ...` array.
    pub styles: Vec<String>,
}

/// Receiver for the results of [`SpatialEngine::load_quadkey`].
///
/// The engine may call `on_mesh` and `on_element` any number of times. An
/// `on_error` call ends the load; later calls may still arrive and are the
/// receiver's to ignore.
pub trait EngineCallbacks {
    fn on_mesh(&mut self, mesh: RawMesh);
    fn on_element(&mut self, element: RawElement);
    fn on_error(&mut self, message: String);
}

/// Error message returned by a failed engine call. Empty means success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

/// The external spatial engine.
pub trait SpatialEngine: Send + Sync {
    /// One-time setup of the index locations.
    fn configure(&self, string_index_path: &Path, spatial_index_path: &Path)
        -> Result<(), EngineError>;

    /// True if the store already holds data for `quadkey`.
    fn has_data(&self, quadkey: &QuadKey) -> bool;

    /// Imports `data_path`, styled with `style_path`, into the store.
    fn add_to_store(
        &self,
        storage: StorageKind,
        style_path: &Path,
        data_path: &Path,
        target: StoreTarget,
    ) -> Result<(), EngineError>;

    /// Builds the tile and streams the results into `callbacks`.
    fn load_quadkey(
        &self,
        style_path: &Path,
        quadkey: &QuadKey,
        elevation: ElevationDataType,
        callbacks: &mut dyn EngineCallbacks,
    );
}
