//! Basic geometric types and utilities.

use std::ops::{Add, Sub, Mul, Div};

/// A 2D point/vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Length of the vector.
    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Normalized vector.
    #[inline]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 1e-10 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::ZERO
        }
    }

    /// Right-hand perpendicular in screen orientation (y down): traveling
    /// along `self`, this points to the right of travel.
    #[inline]
    pub fn right_perp(&self) -> Self {
        Self { x: -self.y, y: self.x }
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross).
    #[inline]
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Linear interpolation.
    #[inline]
    pub fn lerp(&self, other: &Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Midpoint between two points.
    #[inline]
    pub fn midpoint(&self, other: &Point) -> Self {
        self.lerp(other, 0.5)
    }

    /// Lexicographic comparison (x first, then y). Total because border
    /// geometry never produces NaN coordinates.
    #[inline]
    pub fn lex_cmp(&self, other: &Point) -> std::cmp::Ordering {
        self.x
            .partial_cmp(&other.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                self.y
                    .partial_cmp(&other.y)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

impl Div<f64> for Point {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        Self { x: self.x / rhs, y: self.y / rhs }
    }
}

impl From<delaunator::Point> for Point {
    fn from(p: delaunator::Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Point> for delaunator::Point {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Cross product of (b - a) and (c - b).
///
/// Map coordinates are screen-oriented (y grows downward), so a positive
/// value means the turn a->b->c is clockwise as drawn.
#[inline]
pub fn cross_at(a: &Point, b: &Point, c: &Point) -> f64 {
    (*b - *a).cross(&(*c - *b))
}

/// Side of the directed line a->b that `p` falls on, in screen orientation:
/// positive is right of travel, negative is left.
#[inline]
pub fn side_of(a: &Point, b: &Point, p: &Point) -> f64 {
    (*b - *a).cross(&(*p - *a))
}

/// Compute the circumcenter of a triangle.
/// The circumcenter is equidistant from all three vertices.
///
/// Returns the centroid and `true` for the degenerate (collinear) case so
/// the caller can log the fallback.
pub fn circumcenter(a: &Point, b: &Point, c: &Point) -> (Point, bool) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let ex = c.x - a.x;
    let ey = c.y - a.y;

    let bl = dx * dx + dy * dy;
    let cl = ex * ex + ey * ey;
    let d = dx * ey - dy * ex;

    if d.abs() < 1e-10 {
        // Degenerate triangle, return centroid instead
        return (centroid(a, b, c), true);
    }

    let d = 0.5 / d;
    let x = a.x + (ey * bl - dy * cl) * d;
    let y = a.y + (dx * cl - ex * bl) * d;

    (Point::new(x, y), false)
}

/// Centroid of a triangle.
#[inline]
pub fn centroid(a: &Point, b: &Point, c: &Point) -> Point {
    Point::new(
        (a.x + b.x + c.x) / 3.0,
        (a.y + b.y + c.y) / 3.0,
    )
}

/// Nearest point to `p` on the infinite line through `a` and `b`.
/// Falls back to `a` when the line is degenerate.
pub fn nearest_point_on_line(a: &Point, b: &Point, p: &Point) -> Point {
    let ab = *b - *a;
    let len_sq = ab.dot(&ab);
    if len_sq < 1e-20 {
        return *a;
    }
    let t = (*p - *a).dot(&ab) / len_sq;
    *a + ab * t
}

/// Nearest point to `p` on the segment from `a` to `b`.
pub fn nearest_point_on_segment(a: &Point, b: &Point, p: &Point) -> Point {
    let ab = *b - *a;
    let len_sq = ab.dot(&ab);
    if len_sq < 1e-20 {
        return *a;
    }
    let t = ((*p - *a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    *a + ab * t
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
#[inline]
pub fn distance_to_line(a: &Point, b: &Point, p: &Point) -> f64 {
    p.distance(&nearest_point_on_line(a, b, p))
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y
    }
}
