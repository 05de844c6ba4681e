//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! quadkeys and geographic bounding boxes in the Web Mercator tiling scheme.
//! Local planar ("map") coordinates live in [`geo`].

pub mod geo;
mod types;

pub use types::{
    BoundingBox, CoordError, Direction, GeoCoordinate, QuadKey, MAX_LATITUDE,
    MAX_LEVEL_OF_DETAIL, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE,
};

use std::f64::consts::PI;

/// Computes the quadkey containing `coordinate` at `level_of_detail`.
///
/// The coordinate is clamped into the Mercator range and the level of
/// detail to [`MAX_LEVEL_OF_DETAIL`] first, so this never fails for finite
/// input.
#[inline]
pub fn create_quadkey(coordinate: GeoCoordinate, level_of_detail: u8) -> QuadKey {
    let level_of_detail = level_of_detail.min(MAX_LEVEL_OF_DETAIL);
    let lat = coordinate.latitude.clamp(MIN_LATITUDE, MAX_LATITUDE);
    let lon = coordinate.longitude.clamp(MIN_LONGITUDE, MAX_LONGITUDE);

    let n = (1u64 << level_of_detail) as f64;
    let max_index = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    QuadKey::new(
        x.clamp(0.0, max_index) as u32,
        y.clamp(0.0, max_index) as u32,
        level_of_detail,
    )
}

/// Like [`create_quadkey`] but rejects out-of-range input instead of clamping.
pub fn try_create_quadkey(
    coordinate: GeoCoordinate,
    level_of_detail: u8,
) -> Result<QuadKey, CoordError> {
    if !(-90.0..=90.0).contains(&coordinate.latitude) {
        return Err(CoordError::InvalidLatitude(coordinate.latitude));
    }
    if !(-180.0..=180.0).contains(&coordinate.longitude) {
        return Err(CoordError::InvalidLongitude(coordinate.longitude));
    }
    let level_of_detail = check_level_of_detail(level_of_detail)?;
    Ok(create_quadkey(coordinate, level_of_detail))
}

/// Returns `level_of_detail` unchanged if it is at most [`MAX_LEVEL_OF_DETAIL`].
#[inline]
pub fn check_level_of_detail(level_of_detail: u8) -> Result<u8, CoordError> {
    if level_of_detail > MAX_LEVEL_OF_DETAIL {
        Err(CoordError::InvalidLevelOfDetail(level_of_detail))
    } else {
        Ok(level_of_detail)
    }
}

/// Geographic extent of a quadkey. Tile Y grows southward, so the tile's
/// top edge is its maximum latitude.
pub fn quadkey_to_bounding_box(quadkey: &QuadKey) -> BoundingBox {
    let n = quadkey.tiles_per_axis() as f64;
    let x = quadkey.tile_x as f64;
    let y = quadkey.tile_y as f64;

    let min_lon = x / n * 360.0 - 180.0;
    let max_lon = (x + 1.0) / n * 360.0 - 180.0;
    let max_lat = tile_y_to_latitude(y, n);
    let min_lat = tile_y_to_latitude(y + 1.0, n);

    BoundingBox::new(
        GeoCoordinate::new(min_lat, min_lon),
        GeoCoordinate::new(max_lat, max_lon),
    )
}

#[inline]
fn tile_y_to_latitude(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Every quadkey at `level_of_detail` overlapping `bbox`, row by row from
/// the north-west corner.
///
/// Levels above [`MAX_LEVEL_OF_DETAIL`] are clamped as in [`create_quadkey`].
pub fn quadkeys_in_bounding_box(bbox: &BoundingBox, level_of_detail: u8) -> Vec<QuadKey> {
    if bbox.is_empty() {
        return Vec::new();
    }
    let level_of_detail = level_of_detail.min(MAX_LEVEL_OF_DETAIL);

    let north_west = create_quadkey(
        GeoCoordinate::new(bbox.max_point.latitude, bbox.min_point.longitude),
        level_of_detail,
    );
    let south_east = create_quadkey(
        GeoCoordinate::new(bbox.min_point.latitude, bbox.max_point.longitude),
        level_of_detail,
    );

    let mut keys = Vec::new();
    for y in north_west.tile_y..=south_east.tile_y {
        for x in north_west.tile_x..=south_east.tile_x {
            keys.push(QuadKey::new(x, y, level_of_detail));
        }
    }
    keys
}
