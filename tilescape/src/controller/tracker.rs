//! The tile controller.
//!
//! Each position update runs as one step under the controller lock:
//!
//! 1. **Debounce**: movement below `move_sensitivity` at an unchanged level
//!    of detail is ignored.
//! 2. **Unload**: tiles further than `max_tile_distance` from the current
//!    quadkey are disposed. This runs first so memory is bounded before the
//!    loaded set grows.
//! 3. **Preload** when the current tile is already loaded and the observer
//!    has left its inner rectangle: the neighbour on the crossed side is
//!    loaded. The side is picked by testing the four triangles formed by the
//!    rectangle's corners and centre. A point on a dividing line belongs to
//!    none of them and triggers nothing this cycle.
//! 4. **Load** the current tile otherwise.
//!
//! Lifecycle events are broadcast from inside the locked section, so
//! subscribers see them in decision order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use super::config::ControllerConfig;
use super::model::{ControllerState, PositionUpdate, TileEvent};
use crate::coord::{
    check_level_of_detail, create_quadkey, quadkeys_in_bounding_box, BoundingBox, CoordError,
    Direction, GeoCoordinate, QuadKey,
};
use crate::projection::Projection;
use crate::tile::{ElementRegistry, Stylesheet, Tile};
use crate::world::{is_point_in_triangle, Rectangle, Vector2, Vector3};

/// Capacity of the lifecycle broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct ControllerInner {
    config: ControllerConfig,
    loaded: HashMap<QuadKey, Arc<Tile>>,
    last_position: Option<Vector2>,
    last_lod: Option<u8>,
    current: Option<QuadKey>,
    state: ControllerState,
}

/// Decides which tiles are loaded around a moving observer.
pub struct TileController {
    inner: Mutex<ControllerInner>,
    projection: Arc<dyn Projection>,
    stylesheet: Stylesheet,
    registry: Arc<ElementRegistry>,
    events: broadcast::Sender<TileEvent>,
}

impl TileController {
    pub fn new(
        config: ControllerConfig,
        projection: Arc<dyn Projection>,
        stylesheet: Stylesheet,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(ControllerInner {
                config,
                loaded: HashMap::new(),
                last_position: None,
                last_lod: None,
                current: None,
                state: ControllerState::Idle,
            }),
            projection,
            stylesheet,
            registry: Arc::new(ElementRegistry::new()),
            events,
        }
    }

    /// Subscribes to tile lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.events.subscribe()
    }

    /// Evaluates a world-space observer position.
    ///
    /// Fails without touching any state if `level_of_detail` is above
    /// [`MAX_LEVEL_OF_DETAIL`](crate::coord::MAX_LEVEL_OF_DETAIL).
    pub fn on_position(
        &self,
        position: Vector3,
        level_of_detail: u8,
    ) -> Result<PositionUpdate, CoordError> {
        let lod = check_level_of_detail(level_of_detail)?;
        let coordinate = self.projection.unproject(position);
        Ok(self.evaluate(coordinate, position.ground(), lod))
    }

    /// Evaluates a geographic observer position.
    pub fn on_geo_position(
        &self,
        coordinate: GeoCoordinate,
        level_of_detail: u8,
    ) -> Result<PositionUpdate, CoordError> {
        let lod = check_level_of_detail(level_of_detail)?;
        let position = self.projection.project(coordinate, 0.0);
        Ok(self.evaluate(coordinate, position.ground(), lod))
    }

    fn evaluate(&self, coordinate: GeoCoordinate, position: Vector2, lod: u8) -> PositionUpdate {
        let mut inner = self.lock();

        if let (Some(last), Some(last_lod)) = (inner.last_position, inner.last_lod) {
            if last_lod == lod && last.distance(&position) < inner.config.move_sensitivity {
                trace!(lod, "Position update debounced");
                return PositionUpdate::skipped(inner.current);
            }
        }

        let quadkey = create_quadkey(coordinate, lod);
        inner.last_position = Some(position);
        inner.last_lod = Some(lod);
        inner.current = Some(quadkey);

        let mut update = PositionUpdate {
            current: Some(quadkey),
            ..Default::default()
        };

        let max_distance = inner.config.max_tile_distance;
        let stale: Vec<QuadKey> = inner
            .loaded
            .keys()
            .filter(|loaded| loaded.manhattan_distance(&quadkey) > max_distance)
            .copied()
            .collect();
        for stale_key in stale {
            if self.unload(&mut inner, &stale_key) {
                update.unloaded.push(stale_key);
            }
        }

        if let Some(tile) = inner.loaded.get(&quadkey).cloned() {
            inner.state = ControllerState::Settled;
            let offset = inner.config.preload_offset(tile.rectangle().width);
            let inside = tile.contains(Vector3::new(position.x, 0.0, position.y), offset);
            if !inside {
                if let Some(neighbor) = crossed_direction(tile.rectangle(), position)
                    .and_then(|direction| quadkey.neighbor(direction))
                {
                    if self.load(&mut inner, neighbor) {
                        debug!(current = %quadkey, neighbor = %neighbor, "Preloading neighbour tile");
                        update.loaded.push(neighbor);
                    }
                }
            }
        } else {
            inner.state = ControllerState::Loading;
            if self.load(&mut inner, quadkey) {
                update.loaded.push(quadkey);
            }
        }

        update
    }

    /// Loads every tile overlapping `bbox` at `lod`. Never unloads.
    ///
    /// Returns the keys that were not loaded before.
    pub fn on_region(
        &self,
        bbox: &BoundingBox,
        level_of_detail: u8,
    ) -> Result<Vec<QuadKey>, CoordError> {
        let lod = check_level_of_detail(level_of_detail)?;
        Ok(self.on_quadkeys(&quadkeys_in_bounding_box(bbox, lod)))
    }

    /// [`on_region`](Self::on_region) for a world-space rectangle.
    pub fn on_rectangle(
        &self,
        rectangle: &Rectangle,
        level_of_detail: u8,
    ) -> Result<Vec<QuadKey>, CoordError> {
        let corner = |p: Vector2| self.projection.unproject(Vector3::new(p.x, 0.0, p.y));
        let mut bbox = BoundingBox::empty();
        bbox.extend(&corner(rectangle.bottom_left()));
        bbox.extend(&corner(rectangle.top_right()));
        self.on_region(&bbox, level_of_detail)
    }

    /// Loads each of `quadkeys` not already loaded. Keys outside the tile
    /// grid are skipped.
    pub fn on_quadkeys(&self, quadkeys: &[QuadKey]) -> Vec<QuadKey> {
        let mut inner = self.lock();
        let loaded: Vec<QuadKey> = quadkeys
            .iter()
            .copied()
            .filter(|quadkey| {
                if !quadkey.is_valid() {
                    warn!(
                        x = quadkey.tile_x,
                        y = quadkey.tile_y,
                        lod = quadkey.level_of_detail,
                        "Ignoring quadkey outside the tile grid"
                    );
                    return false;
                }
                self.load(&mut inner, *quadkey)
            })
            .collect();
        if !loaded.is_empty() {
            debug!(count = loaded.len(), "Region loaded");
        }
        loaded
    }

    pub fn configure(&self, move_sensitivity: f64, offset_ratio_percent: f64, max_tile_distance: u32) {
        let mut inner = self.lock();
        inner.config = ControllerConfig {
            move_sensitivity,
            offset_ratio_percent,
            max_tile_distance,
        };
        info!(
            move_sensitivity,
            offset_ratio_percent, max_tile_distance, "Tile controller configured"
        );
    }

    pub fn config(&self) -> ControllerConfig {
        self.lock().config
    }

    /// Drops a tile whose load failed, so the next update that resolves to
    /// its quadkey loads it afresh.
    ///
    /// Only `tile` itself is dropped. If its quadkey has since been unloaded
    /// and loaded again, the newer tile stays and this returns false.
    pub fn on_load_failed(&self, tile: &Arc<Tile>) -> bool {
        let mut inner = self.lock();
        let quadkey = *tile.quadkey();
        let current = inner
            .loaded
            .get(&quadkey)
            .is_some_and(|loaded| Arc::ptr_eq(loaded, tile));
        if !current {
            trace!(quadkey = %quadkey, "Failed tile already replaced");
            return false;
        }
        self.unload(&mut inner, &quadkey);
        debug!(quadkey = %quadkey, "Tile dropped after failed load");
        true
    }

    /// Disposes every loaded tile and forgets the observer position.
    pub fn unload_all(&self) -> Vec<QuadKey> {
        let mut inner = self.lock();
        let keys: Vec<QuadKey> = inner.loaded.keys().copied().collect();
        for quadkey in &keys {
            self.unload(&mut inner, quadkey);
        }
        inner.last_position = None;
        inner.last_lod = None;
        inner.current = None;
        inner.state = ControllerState::Idle;
        info!(count = keys.len(), "All tiles unloaded");
        keys
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn current_quadkey(&self) -> Option<QuadKey> {
        self.lock().current
    }

    pub fn is_loaded(&self, quadkey: &QuadKey) -> bool {
        self.lock().loaded.contains_key(quadkey)
    }

    pub fn tile(&self, quadkey: &QuadKey) -> Option<Arc<Tile>> {
        self.lock().loaded.get(quadkey).cloned()
    }

    /// Loaded keys in ascending order.
    pub fn loaded_quadkeys(&self) -> Vec<QuadKey> {
        let mut keys: Vec<QuadKey> = self.lock().loaded.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn loaded_tiles(&self) -> Vec<Arc<Tile>> {
        self.lock().loaded.values().cloned().collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.lock().loaded.len()
    }

    /// Loaded count and current quadkey, or `None` if the controller is busy.
    ///
    /// Never blocks, so it is safe to call from a panic hook that may run
    /// while this thread holds the lock.
    pub fn try_snapshot(&self) -> Option<(usize, Option<QuadKey>)> {
        let inner = match self.inner.try_lock() {
            Ok(inner) => inner,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some((inner.loaded.len(), inner.current))
    }

    pub fn registry(&self) -> &Arc<ElementRegistry> {
        &self.registry
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        // Every mutation leaves the map consistent, so a poisoned lock is usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self, inner: &mut ControllerInner, quadkey: QuadKey) -> bool {
        if inner.loaded.contains_key(&quadkey) {
            return false;
        }

        let tile = Arc::new(Tile::new(
            quadkey,
            self.stylesheet.clone(),
            Arc::clone(&self.projection),
            Arc::clone(&self.registry),
        ));
        inner.loaded.insert(quadkey, Arc::clone(&tile));
        debug!(quadkey = %quadkey, loaded = inner.loaded.len(), "Tile loaded");

        // No subscribers is fine
        let _ = self.events.send(TileEvent::Loaded(tile));
        true
    }

    fn unload(&self, inner: &mut ControllerInner, quadkey: &QuadKey) -> bool {
        let Some(tile) = inner.loaded.remove(quadkey) else {
            return false;
        };

        tile.dispose();
        debug!(quadkey = %quadkey, loaded = inner.loaded.len(), "Tile unloaded");
        let _ = self.events.send(TileEvent::Unloaded(tile));
        true
    }
}

/// Side of `rect` the point is heading out of, by the corner/centre
/// triangles.
fn crossed_direction(rect: &Rectangle, point: Vector2) -> Option<Direction> {
    let center = rect.center();
    let sides = [
        (rect.top_left(), rect.top_right(), Direction::North),
        (rect.top_left(), rect.bottom_left(), Direction::West),
        (rect.top_right(), rect.bottom_right(), Direction::East),
        (rect.bottom_left(), rect.bottom_right(), Direction::South),
    ];
    sides
        .into_iter()
        .find(|(a, b, _)| is_point_in_triangle(*a, *b, center, point))
        .map(|(_, _, direction)| direction)
}
