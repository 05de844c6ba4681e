//! Local planar approximation and ellipsoid helpers.
//!
//! Map coordinates are metres relative to a reference point: x east, y north.
//! The conversion scales longitude by the circumference of the latitude
//! circle at the reference point and latitude by the meridian circumference.
//! Error grows with distance from the reference point.

use super::types::{BoundingBox, GeoCoordinate};
use crate::world::Vector2;

/// Equatorial circumference in metres.
pub const LATITUDE_EQUATOR: f64 = 40_075_160.0;

/// Meridian circumference in metres.
pub const DISTANCE_MERIDIAN: f64 = 40_009_000.0;

/// WGS-84 semi-major axis in metres.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 semi-minor axis in metres.
pub const WGS84_B: f64 = 6_356_752.3;

/// Decimal digits kept in map coordinates.
const PRECISION: i32 = 6;

#[inline]
fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Converts `coordinate` into metres relative to `origin`.
pub fn to_map_coordinate(origin: GeoCoordinate, coordinate: GeoCoordinate) -> Vector2 {
    let delta_lat = coordinate.latitude - origin.latitude;
    let delta_lon = coordinate.longitude - origin.longitude;
    let latitude_circumference = LATITUDE_EQUATOR * origin.latitude.to_radians().cos();

    let x = delta_lon * latitude_circumference / 360.0;
    let y = delta_lat * DISTANCE_MERIDIAN / 360.0;

    Vector2::new(round_to(x, PRECISION), round_to(y, PRECISION))
}

/// Inverse of [`to_map_coordinate`].
pub fn to_geo_coordinate(origin: GeoCoordinate, point: Vector2) -> GeoCoordinate {
    let latitude_circumference = LATITUDE_EQUATOR * origin.latitude.to_radians().cos();

    let delta_lon = point.x * 360.0 / latitude_circumference;
    let delta_lat = point.y * 360.0 / DISTANCE_MERIDIAN;

    GeoCoordinate::new(origin.latitude + delta_lat, origin.longitude + delta_lon)
}

/// Earth radius in metres at the given latitude (radians) on the WGS-84
/// ellipsoid.
pub fn wgs84_earth_radius(lat_rad: f64) -> f64 {
    let an = WGS84_A * WGS84_A * lat_rad.cos();
    let bn = WGS84_B * WGS84_B * lat_rad.sin();
    let ad = WGS84_A * lat_rad.cos();
    let bd = WGS84_B * lat_rad.sin();
    ((an * an + bn * bn) / (ad * ad + bd * bd)).sqrt()
}

/// Great-circle distance in metres (haversine), using the local WGS-84
/// radius at the mean latitude.
pub fn distance(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    wgs84_earth_radius((lat1 + lat2) / 2.0) * c
}

impl BoundingBox {
    /// Square box centred on `center` with half side `half_side_m` metres.
    pub fn from_radius(center: GeoCoordinate, half_side_m: f64) -> BoundingBox {
        let lat = center.latitude.to_radians();
        let lon = center.longitude.to_radians();

        let radius = wgs84_earth_radius(lat);
        let parallel_radius = radius * lat.cos();

        let lat_min = lat - half_side_m / radius;
        let lat_max = lat + half_side_m / radius;
        let lon_min = lon - half_side_m / parallel_radius;
        let lon_max = lon + half_side_m / parallel_radius;

        BoundingBox::new(
            GeoCoordinate::new(lat_min.to_degrees(), lon_min.to_degrees()),
            GeoCoordinate::new(lat_max.to_degrees(), lon_max.to_degrees()),
        )
    }
}
