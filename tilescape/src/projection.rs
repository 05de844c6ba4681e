//! Projection between geographic and world coordinates.

use crate::coord::geo::{to_geo_coordinate, to_map_coordinate};
use crate::coord::GeoCoordinate;
use crate::world::{Vector2, Vector3};

/// Converts between geographic coordinates and world space.
///
/// Implementations must be cheap to call; the controller projects on every
/// position update and the adapter projects every mesh vertex.
pub trait Projection: Send + Sync {
    /// Projects a geographic coordinate and height (metres) into world space.
    fn project(&self, coordinate: GeoCoordinate, height: f64) -> Vector3;

    /// Projects a world-space point back to a geographic coordinate. Height
    /// is discarded.
    fn unproject(&self, position: Vector3) -> GeoCoordinate;
}

/// Flat projection around a fixed world zero point.
///
/// World `x` is metres east of the zero point, `z` metres north, `y` the
/// height. Accurate close to the zero point only.
#[derive(Debug, Clone, Copy)]
pub struct CartesianProjection {
    world_zero_point: GeoCoordinate,
}

impl CartesianProjection {
    pub fn new(world_zero_point: GeoCoordinate) -> Self {
        Self { world_zero_point }
    }

    pub fn world_zero_point(&self) -> GeoCoordinate {
        self.world_zero_point
    }
}

impl Projection for CartesianProjection {
    fn project(&self, coordinate: GeoCoordinate, height: f64) -> Vector3 {
        let point = to_map_coordinate(self.world_zero_point, coordinate);
        Vector3::new(point.x, height, point.y)
    }

    fn unproject(&self, position: Vector3) -> GeoCoordinate {
        to_geo_coordinate(
            self.world_zero_point,
            Vector2::new(position.x, position.z),
        )
    }
}
