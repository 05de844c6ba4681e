//! The tile entity.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::registry::ElementRegistry;
use crate::coord::{quadkey_to_bounding_box, BoundingBox, QuadKey};
use crate::projection::Projection;
use crate::world::{Rectangle, Vector3};

/// Opaque scene-side state owned by the render collaborator.
pub type RenderHandle = Box<dyn Any + Send + Sync>;

/// Reference to the styling rules consumed by the spatial engine.
///
/// The core never parses it; it only hands the resolved path along.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stylesheet {
    path: PathBuf,
}

impl Stylesheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One loaded quadkey.
///
/// Geometry (bounding box, world rectangle) is fixed at construction. The
/// only mutable parts are the set of element ids this tile registered, the
/// disposal flag and the render handle.
pub struct Tile {
    quadkey: QuadKey,
    stylesheet: Stylesheet,
    projection: Arc<dyn Projection>,
    bounding_box: BoundingBox,
    rectangle: Rectangle,
    registry: Arc<ElementRegistry>,
    local_ids: Mutex<HashSet<u64>>,
    disposed: AtomicBool,
    cancellation: CancellationToken,
    render_handle: Mutex<Option<RenderHandle>>,
}

impl Tile {
    pub fn new(
        quadkey: QuadKey,
        stylesheet: Stylesheet,
        projection: Arc<dyn Projection>,
        registry: Arc<ElementRegistry>,
    ) -> Self {
        let bounding_box = quadkey_to_bounding_box(&quadkey);
        let south_west = projection.project(bounding_box.min_point, 0.0);
        let north_east = projection.project(bounding_box.max_point, 0.0);
        let rectangle = Rectangle::from_corners(south_west.ground(), north_east.ground());

        Self {
            quadkey,
            stylesheet,
            projection,
            bounding_box,
            rectangle,
            registry,
            local_ids: Mutex::new(HashSet::new()),
            disposed: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
            render_handle: Mutex::new(None),
        }
    }

    pub fn quadkey(&self) -> &QuadKey {
        &self.quadkey
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// World-space extent on the ground plane.
    pub fn rectangle(&self) -> &Rectangle {
        &self.rectangle
    }

    /// True if `id` was registered by any tile sharing this registry.
    pub fn has(&self, id: u64) -> bool {
        self.registry.contains(id)
    }

    /// Registers `id` for this tile and in the shared registry.
    ///
    /// Same as [`try_register`](Self::try_register) without the result: an
    /// id already held by another tile is not added to this tile, and
    /// [`Tile::has`] stays true only through the registry. Ignored once
    /// the tile is disposed, so late pipeline callbacks cannot leak ids
    /// into the shared registry.
    pub fn register(&self, id: u64) {
        self.try_register(id);
    }

    /// Registers `id` only if no tile has it yet.
    ///
    /// Returns `true` if this call claimed the id. The check and insert are
    /// one atomic step on the shared registry, which makes concurrent loads
    /// of neighbouring tiles emit a shared element exactly once.
    pub fn try_register(&self, id: u64) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut local = self.local_ids();
        if !self.registry.insert(id) {
            return false;
        }
        local.insert(id);
        true
    }

    /// Number of ids this tile registered.
    pub fn registered_count(&self) -> usize {
        self.local_ids().len()
    }

    /// Releases this tile's ids from the shared registry and cancels any
    /// in-flight work for it. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cancellation.cancel();

        let mut local = self.local_ids();
        self.registry.remove_all(local.iter());
        trace!(quadkey = %self.quadkey, ids = local.len(), "Tile ids released");
        local.clear();
    }

    fn local_ids(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.local_ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Token cancelled when the tile is disposed.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True if `position` lies strictly inside the tile rectangle shrunk by
    /// `offset` on every side.
    pub fn contains(&self, position: Vector3, offset: f64) -> bool {
        let rect = &self.rectangle;
        position.x > rect.left + offset
            && position.x < rect.right() - offset
            && position.z > rect.bottom + offset
            && position.z < rect.top() - offset
    }

    pub fn set_render_handle(&self, handle: RenderHandle) {
        if let Ok(mut slot) = self.render_handle.lock() {
            *slot = Some(handle);
        }
    }

    pub fn take_render_handle(&self) -> Option<RenderHandle> {
        self.render_handle.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn has_render_handle(&self) -> bool {
        self.render_handle
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("quadkey", &self.quadkey)
            .field("stylesheet", &self.stylesheet)
            .field("rectangle", &self.rectangle)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({},{} @{})",
            self.quadkey,
            self.quadkey.tile_x,
            self.quadkey.tile_y,
            self.quadkey.level_of_detail
        )
    }
}
