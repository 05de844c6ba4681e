//! Translation of raw engine output into typed map data.
//!
//! Coordinates arrive as flat `(longitude, latitude[, height])` arrays and
//! leave in world space through the tile's projection. Two mesh rules apply:
//!
//! - **Terrain** (`name` contains `terrain`): every triangle corner becomes
//!   its own vertex so shading stays flat. Colours follow the corner's
//!   original vertex.
//! - **Identified meshes** (`building:<id>`, `barrier:<id>`): emitted once per
//!   id across all tiles sharing a registry. Geometry straddling a tile
//!   border is reported by both tiles and must not be drawn twice.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, trace, warn};

use super::engine::{RawElement, RawMesh};
use super::error::PipelineError;
use crate::coord::GeoCoordinate;
use crate::tile::Tile;
use crate::world::{Vector2, Vector3};

/// RGBA colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpacks `0xRRGGBBAA`.
    pub const fn from_rgba(packed: u32) -> Self {
        Self {
            r: (packed >> 24) as u8,
            g: (packed >> 16) as u8,
            b: (packed >> 8) as u8,
            a: packed as u8,
        }
    }

    pub const fn to_rgba(self) -> u32 {
        (self.r as u32) << 24 | (self.g as u32) << 16 | (self.b as u32) << 8 | self.a as u32
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.to_rgba())
    }
}

/// A map element with geographic geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: u64,
    pub geometry: Vec<GeoCoordinate>,
    /// Per-vertex heights, empty when the engine supplied none.
    pub heights: Vec<f64>,
    pub tags: HashMap<String, String>,
    pub styles: HashMap<String, String>,
}

/// A renderable mesh in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vector3>,
    pub triangles: Vec<u32>,
    pub colors: Vec<Color>,
    pub uvs: Vec<Vector2>,
}

/// One unit of adapted output for the render collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum MapData {
    Element(Element),
    Mesh(Mesh),
}

fn identified_mesh_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:building|barrier):(\d+)").unwrap())
}

/// Id carried by a `building:<id>` or `barrier:<id>` mesh name.
pub fn mesh_id(name: &str) -> Option<u64> {
    identified_mesh_pattern()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Converts engine callbacks into [`MapData`].
///
/// Stateless apart from the dedup bookkeeping, which lives on the tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapDataAdapter;

impl MapDataAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Adapts a mesh, or returns `None` when it must not be emitted:
    /// an identified mesh already registered, or malformed geometry.
    pub fn adapt_mesh(&self, tile: &Tile, raw: RawMesh) -> Option<Mesh> {
        let world: Vec<Vector3> = raw
            .vertices
            .chunks_exact(3)
            .map(|v| tile.projection().project(GeoCoordinate::new(v[1], v[0]), v[2]))
            .collect();

        if let Some(&bad) = raw.triangles.iter().find(|&&i| i as usize >= world.len()) {
            warn!(
                quadkey = %tile.quadkey(),
                mesh = %raw.name,
                index = bad,
                vertices = world.len(),
                "Mesh triangle index out of range, skipping"
            );
            return None;
        }

        let uvs: Vec<Vector2> = raw
            .uvs
            .chunks_exact(2)
            .map(|uv| Vector2::new(uv[0], uv[1]))
            .collect();
        let color_at = |i: usize| raw.colors.get(i).map_or(Color::WHITE, |&c| Color::from_rgba(c));

        if raw.name.contains("terrain") {
            let corners: Vec<usize> = raw.triangles.iter().map(|&i| i as usize).collect();
            let mesh = Mesh {
                vertices: corners.iter().map(|&i| world[i]).collect(),
                triangles: (0..corners.len() as u32).collect(),
                colors: corners.iter().map(|&i| color_at(i)).collect(),
                uvs: corners.iter().filter_map(|&i| uvs.get(i).copied()).collect(),
                name: raw.name,
            };
            return Some(mesh);
        }

        if let Some(id) = mesh_id(&raw.name) {
            if !tile.try_register(id) {
                trace!(quadkey = %tile.quadkey(), mesh = %raw.name, "Duplicate mesh skipped");
                return None;
            }
        }

        let colors = (0..world.len()).map(color_at).collect();
        Some(Mesh {
            name: raw.name,
            vertices: world,
            triangles: raw.triangles,
            colors,
            uvs,
        })
    }

    pub fn adapt_element(&self, _tile: &Tile, raw: RawElement) -> Element {
        Element {
            id: raw.id,
            geometry: raw
                .vertices
                .chunks_exact(2)
                .map(|p| GeoCoordinate::new(p[1], p[0]))
                .collect(),
            heights: raw.heights,
            tags: pair_up(raw.tags),
            styles: pair_up(raw.styles),
        }
    }

    /// Wraps an engine error message for `tile` and logs it.
    pub fn adapt_error(&self, tile: &Tile, message: &str) -> PipelineError {
        error!(quadkey = %tile.quadkey(), error = message, "Engine failed to load tile");
        PipelineError::Engine {
            quadkey: *tile.quadkey(),
            message: message.to_string(),
        }
    }
}

/// Pairs a flat `key, value, ...` array into a map. A trailing key without
/// a value is dropped.
fn pair_up(flat: Vec<String>) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        map.insert(key, value);
    }
    map
}
