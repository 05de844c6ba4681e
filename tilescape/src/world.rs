//! World-space primitives.
//!
//! World space follows the scene convention used by the render collaborator:
//! the ground plane is `x`/`z` (x grows east, z grows north) and `y` carries
//! height. Tile rectangles live on the ground plane, so 2D helpers take the
//! `x`/`z` components of a [`Vector3`].

use std::fmt;

/// A point or direction on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Vector2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance in world units.
    pub fn distance(&self, other: &Vector3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Projection onto the ground plane (`x`, `z`).
    #[inline]
    pub fn ground(&self) -> Vector2 {
        Vector2::new(self.x, self.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Axis-aligned rectangle on the ground plane.
///
/// `bottom` is the southern edge, `top()` the northern one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(left: f64, bottom: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    /// Builds the smallest rectangle spanning both points.
    pub fn from_corners(a: Vector2, b: Vector2) -> Self {
        let left = a.x.min(b.x);
        let bottom = a.y.min(b.y);
        Self {
            left,
            bottom,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(
            self.left + self.width / 2.0,
            self.bottom + self.height / 2.0,
        )
    }

    pub fn top_left(&self) -> Vector2 {
        Vector2::new(self.left, self.top())
    }

    pub fn top_right(&self) -> Vector2 {
        Vector2::new(self.right(), self.top())
    }

    pub fn bottom_left(&self) -> Vector2 {
        Vector2::new(self.left, self.bottom)
    }

    pub fn bottom_right(&self) -> Vector2 {
        Vector2::new(self.right(), self.bottom)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vector2) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.bottom
            && point.y <= self.top()
    }
}

/// Barycentric point-in-triangle test.
///
/// All three weights must be strictly positive, so a point lying exactly on
/// an edge (or a vertex) is reported as outside.
pub fn is_point_in_triangle(p0: Vector2, p1: Vector2, p2: Vector2, p: Vector2) -> bool {
    let area = (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y);
    if area == 0.0 {
        return false;
    }

    let w1 = ((p.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p.y - p0.y)) / area;
    let w2 = ((p1.x - p0.x) * (p.y - p0.y) - (p.x - p0.x) * (p1.y - p0.y)) / area;
    let w0 = 1.0 - w1 - w2;

    w0 > 0.0 && w1 > 0.0 && w2 > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector3_distance() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(3.0, 0.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_rectangle_edges() {
        let rect = Rectangle::new(-10.0, -20.0, 20.0, 40.0);
        assert_eq!(rect.right(), 10.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.center(), Vector2::new(0.0, 0.0));
        assert_eq!(rect.top_left(), Vector2::new(-10.0, 20.0));
        assert_eq!(rect.bottom_right(), Vector2::new(10.0, -20.0));
    }

    #[test]
    fn test_rectangle_from_corners_any_order() {
        let a = Rectangle::from_corners(Vector2::new(5.0, 8.0), Vector2::new(-5.0, -2.0));
        let b = Rectangle::from_corners(Vector2::new(-5.0, -2.0), Vector2::new(5.0, 8.0));
        assert_eq!(a, b);
        assert_eq!(a.width, 10.0);
        assert_eq!(a.height, 10.0);
    }

    #[test]
    fn test_point_in_triangle_inside() {
        let p0 = Vector2::new(0.0, 0.0);
        let p1 = Vector2::new(10.0, 0.0);
        let p2 = Vector2::new(0.0, 10.0);
        assert!(is_point_in_triangle(p0, p1, p2, Vector2::new(2.0, 2.0)));
        // Winding order does not matter
        assert!(is_point_in_triangle(p2, p1, p0, Vector2::new(2.0, 2.0)));
    }

    #[test]
    fn test_point_in_triangle_outside() {
        let p0 = Vector2::new(0.0, 0.0);
        let p1 = Vector2::new(10.0, 0.0);
        let p2 = Vector2::new(0.0, 10.0);
        assert!(!is_point_in_triangle(p0, p1, p2, Vector2::new(8.0, 8.0)));
        assert!(!is_point_in_triangle(p0, p1, p2, Vector2::new(-1.0, 1.0)));
    }

    #[test]
    fn test_point_on_edge_is_outside() {
        let p0 = Vector2::new(0.0, 0.0);
        let p1 = Vector2::new(10.0, 0.0);
        let p2 = Vector2::new(0.0, 10.0);
        assert!(!is_point_in_triangle(p0, p1, p2, Vector2::new(5.0, 0.0)));
        assert!(!is_point_in_triangle(p0, p1, p2, Vector2::new(5.0, 5.0)));
        assert!(!is_point_in_triangle(p0, p1, p2, p0));
    }

    #[test]
    fn test_degenerate_triangle() {
        let p = Vector2::new(1.0, 1.0);
        assert!(!is_point_in_triangle(p, p, p, p));
    }
}
