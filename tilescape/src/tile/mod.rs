//! Tile entity and cross-tile element deduplication.
//!
//! A [`Tile`] is the unit of loading: one quadkey, the stylesheet used to
//! render it, and the projection that places it in world space. Tiles that
//! are loaded side by side share one [`ElementRegistry`] so that geometry
//! straddling a tile border is emitted only once.
//!
//! # Ownership
//!
//! ```text
//! TileController ──owns──► HashMap<QuadKey, Arc<Tile>>
//!        │                          │
//!        └──owns──► Arc<ElementRegistry> ◄──shared── every Tile
//! ```
//!
//! Disposing a tile removes exactly the ids that tile registered; the
//! registry itself lives as long as its controller.

mod entity;
mod registry;

pub use entity::{RenderHandle, Stylesheet, Tile};
pub use registry::ElementRegistry;
