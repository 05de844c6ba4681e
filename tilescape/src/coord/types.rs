//! Coordinate type definitions

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// Web Mercator latitude limit used when deriving a quadkey.
pub const MAX_LATITUDE: f64 = 85.05112877;
pub const MIN_LATITUDE: f64 = -MAX_LATITUDE;

/// Longitude limit used when deriving a quadkey.
pub const MAX_LONGITUDE: f64 = 179.9999999;
pub const MIN_LONGITUDE: f64 = -MAX_LONGITUDE;

/// Deepest level of detail addressable by a quadkey.
pub const MAX_LEVEL_OF_DETAIL: u8 = 23;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7},{:.7}", self.latitude, self.longitude)
    }
}

/// Cardinal direction between neighbouring tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

/// Tile address in the Bing/OSM quadtree tiling scheme.
///
/// `tile_y` grows southward, `tile_x` eastward. Equality and hashing are
/// structural over all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadKey {
    pub tile_x: u32,
    pub tile_y: u32,
    pub level_of_detail: u8,
}

impl QuadKey {
    pub const fn new(tile_x: u32, tile_y: u32, level_of_detail: u8) -> Self {
        Self {
            tile_x,
            tile_y,
            level_of_detail,
        }
    }

    /// Number of tiles along one axis at this level of detail.
    #[inline]
    pub fn tiles_per_axis(&self) -> u64 {
        1u64.checked_shl(u32::from(self.level_of_detail)).unwrap_or(u64::MAX)
    }

    /// Whether the level is at most [`MAX_LEVEL_OF_DETAIL`] and both tile
    /// indices fall inside the grid.
    pub fn is_valid(&self) -> bool {
        self.level_of_detail <= MAX_LEVEL_OF_DETAIL
            && u64::from(self.tile_x) < self.tiles_per_axis()
            && u64::from(self.tile_y) < self.tiles_per_axis()
    }

    /// The four children at `level_of_detail + 1`, ordered by digit (0..=3).
    pub fn children(&self) -> [QuadKey; 4] {
        let x = self.tile_x * 2;
        let y = self.tile_y * 2;
        let lod = self.level_of_detail + 1;
        [
            QuadKey::new(x, y, lod),
            QuadKey::new(x + 1, y, lod),
            QuadKey::new(x, y + 1, lod),
            QuadKey::new(x + 1, y + 1, lod),
        ]
    }

    /// The enclosing tile, or `None` for the level-0 root.
    pub fn parent(&self) -> Option<QuadKey> {
        if self.level_of_detail == 0 {
            return None;
        }
        Some(QuadKey::new(
            self.tile_x / 2,
            self.tile_y / 2,
            self.level_of_detail - 1,
        ))
    }

    /// Manhattan distance in tile-grid units.
    ///
    /// Keys at different levels of detail are infinitely far apart.
    pub fn manhattan_distance(&self, other: &QuadKey) -> u32 {
        if self.level_of_detail != other.level_of_detail {
            return u32::MAX;
        }
        self.tile_x.abs_diff(other.tile_x) + self.tile_y.abs_diff(other.tile_y)
    }

    /// The adjacent tile in the given direction, without wrapping at the
    /// edges of the world.
    pub fn neighbor(&self, direction: Direction) -> Option<QuadKey> {
        let max = (self.tiles_per_axis() - 1) as u32;
        let (x, y) = match direction {
            Direction::North => (self.tile_x, self.tile_y.checked_sub(1)?),
            Direction::South if self.tile_y < max => (self.tile_x, self.tile_y + 1),
            Direction::West => (self.tile_x.checked_sub(1)?, self.tile_y),
            Direction::East if self.tile_x < max => (self.tile_x + 1, self.tile_y),
            _ => return None,
        };
        Some(QuadKey::new(x, y, self.level_of_detail))
    }
}

impl fmt::Display for QuadKey {
    /// Formats as a base-4 digit string, most significant digit first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (1..=self.level_of_detail).rev() {
            // Digits above bit 31 are always zero
            let mask = 1u32.checked_shl(u32::from(i - 1)).unwrap_or(0);
            let mut digit = b'0';
            if self.tile_x & mask != 0 {
                digit += 1;
            }
            if self.tile_y & mask != 0 {
                digit += 2;
            }
            write!(f, "{}", digit as char)?;
        }
        Ok(())
    }
}

impl FromStr for QuadKey {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_LEVEL_OF_DETAIL as usize {
            return Err(CoordError::InvalidQuadkey(s.to_string()));
        }

        let level_of_detail = s.len() as u8;
        let mut tile_x = 0u32;
        let mut tile_y = 0u32;

        for (i, c) in s.chars().enumerate() {
            let mask = 1u32 << (level_of_detail as usize - i - 1);
            match c {
                '0' => {}
                '1' => tile_x |= mask,
                '2' => tile_y |= mask,
                '3' => {
                    tile_x |= mask;
                    tile_y |= mask;
                }
                _ => return Err(CoordError::InvalidQuadkey(s.to_string())),
            }
        }

        Ok(QuadKey::new(tile_x, tile_y, level_of_detail))
    }
}

/// Geographic bounding box.
///
/// A box with `min_point > max_point` is the empty sentinel produced by
/// [`BoundingBox::empty`]; extend it before using it in geometry tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_point: GeoCoordinate,
    pub max_point: GeoCoordinate,
}

impl BoundingBox {
    pub const fn new(min_point: GeoCoordinate, max_point: GeoCoordinate) -> Self {
        Self {
            min_point,
            max_point,
        }
    }

    pub const fn empty() -> Self {
        Self {
            min_point: GeoCoordinate::new(f64::MAX, f64::MAX),
            max_point: GeoCoordinate::new(f64::MIN, f64::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_point.latitude > self.max_point.latitude
            || self.min_point.longitude > self.max_point.longitude
    }

    /// Grows the box to include `point`.
    pub fn extend(&mut self, point: &GeoCoordinate) {
        self.min_point.latitude = self.min_point.latitude.min(point.latitude);
        self.min_point.longitude = self.min_point.longitude.min(point.longitude);
        self.max_point.latitude = self.max_point.latitude.max(point.latitude);
        self.max_point.longitude = self.max_point.longitude.max(point.longitude);
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut result = *self;
        if !other.is_empty() {
            result.extend(&other.min_point);
            result.extend(&other.max_point);
        }
        result
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &GeoCoordinate) -> bool {
        point.latitude >= self.min_point.latitude
            && point.latitude <= self.max_point.latitude
            && point.longitude >= self.min_point.longitude
            && point.longitude <= self.max_point.longitude
    }

    /// True if the boxes share any point (touching edges count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min_point.latitude <= other.max_point.latitude
            && other.min_point.latitude <= self.max_point.latitude
            && self.min_point.longitude <= other.max_point.longitude
            && other.min_point.longitude <= self.max_point.longitude
    }

    pub fn center(&self) -> GeoCoordinate {
        GeoCoordinate::new(
            (self.min_point.latitude + self.max_point.latitude) / 2.0,
            (self.min_point.longitude + self.max_point.longitude) / 2.0,
        )
    }

    /// Query string form `min_lon,min_lat,max_lon,max_lat` used by remote
    /// map data servers.
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_point.longitude,
            self.min_point.latitude,
            self.max_point.longitude,
            self.max_point.latitude
        )
    }
}

impl Add for BoundingBox {
    type Output = BoundingBox;

    fn add(self, rhs: BoundingBox) -> BoundingBox {
        self.union(&rhs)
    }
}

impl Add<GeoCoordinate> for BoundingBox {
    type Output = BoundingBox;

    fn add(mut self, rhs: GeoCoordinate) -> BoundingBox {
        self.extend(&rhs);
        self
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside the Web Mercator range
    InvalidLatitude(f64),
    /// Longitude is outside the valid range
    InvalidLongitude(f64),
    /// Level of detail beyond what a quadkey can address
    InvalidLevelOfDetail(u8),
    /// Quadkey contains invalid characters or is too long
    InvalidQuadkey(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => write!(
                f,
                "Invalid latitude: {} (must be between {} and {})",
                lat, MIN_LATITUDE, MAX_LATITUDE
            ),
            CoordError::InvalidLongitude(lon) => write!(
                f,
                "Invalid longitude: {} (must be between {} and {})",
                lon, MIN_LONGITUDE, MAX_LONGITUDE
            ),
            CoordError::InvalidLevelOfDetail(lod) => write!(
                f,
                "Invalid level of detail: {} (must be at most {})",
                lod, MAX_LEVEL_OF_DETAIL
            ),
            CoordError::InvalidQuadkey(quadkey) => write!(
                f,
                "Invalid quadkey: '{}' (must contain only digits 0-3 and length <= {})",
                quadkey, MAX_LEVEL_OF_DETAIL
            ),
        }
    }
}

impl std::error::Error for CoordError {}
