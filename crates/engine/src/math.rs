use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise product.
    pub fn multiply(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x * other.x, self.y * other.y)
    }

    pub fn scale(self, scalar: f32) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }

    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction. The zero vector normalizes to zero.
    pub fn normalize(self) -> Vector2 {
        let magnitude = self.magnitude();
        if magnitude <= f32::EPSILON {
            return Vector2::ZERO;
        }
        Vector2::new(self.x / magnitude, self.y / magnitude)
    }

    pub fn dot(self, other: Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Vector2) -> f32 {
        (self - other).magnitude()
    }

    pub fn approx_eq(self, other: Vector2, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, scalar: f32) -> Vector2 {
        self.scale(scalar)
    }
}

impl Div<f32> for Vector2 {
    type Output = Vector2;

    fn div(self, scalar: f32) -> Vector2 {
        Vector2::new(self.x / scalar, self.y / scalar)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn at(position: Vector2, width: f32, height: f32) -> Self {
        Self::new(position.x, position.y, width, height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Corners in winding order: top-left, top-right, bottom-right, bottom-left.
    pub fn points(&self) -> Hitbox {
        [
            Vector2::new(self.x, self.y),
            Vector2::new(self.x + self.width, self.y),
            Vector2::new(self.x + self.width, self.y + self.height),
            Vector2::new(self.x, self.y + self.height),
        ]
    }

    /// Strict open-interval containment; points on an edge are outside.
    pub fn contains_strict(&self, point: Vector2) -> bool {
        point.x > self.left()
            && point.x < self.right()
            && point.y > self.top()
            && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        overlaps(&self.points(), &other.points())
    }
}

pub type Hitbox = [Vector2; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector2,
    pub max: Vector2,
}

/// Axis-aligned extent of a point list. `None` for an empty list.
pub fn bounds_of(points: &[Vector2]) -> Option<Bounds> {
    let first = *points.first()?;
    let mut bounds = Bounds {
        min: first,
        max: first,
    };
    for point in &points[1..] {
        bounds.min.x = bounds.min.x.min(point.x);
        bounds.min.y = bounds.min.y.min(point.y);
        bounds.max.x = bounds.max.x.max(point.x);
        bounds.max.y = bounds.max.y.max(point.y);
    }
    Some(bounds)
}

/// Overlap test between two polygons, approximated by their axis-aligned
/// bounding boxes. Rotated or non-rectangular polygons are treated as their
/// full extent, so two rotated boxes can report overlap while their actual
/// outlines are apart. Touching edges do not overlap.
pub fn overlaps(a: &[Vector2], b: &[Vector2]) -> bool {
    let (Some(a), Some(b)) = (bounds_of(a), bounds_of(b)) else {
        return false;
    };
    a.min.x < b.max.x && a.max.x > b.min.x && a.min.y < b.max.y && a.max.y > b.min.y
}

/// Any pair across the two polygon sets overlaps.
pub fn any_overlap(a: &[Vec<Vector2>], b: &[Vec<Vector2>]) -> bool {
    a.iter()
        .any(|left| b.iter().any(|right| overlaps(left, right)))
}

pub fn rotate_points(points: &[Vector2], degrees: f32, origin: Vector2) -> Vec<Vector2> {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    points
        .iter()
        .map(|point| {
            let x = point.x - origin.x;
            let y = point.y - origin.y;
            Vector2::new(x * cos - y * sin + origin.x, x * sin + y * cos + origin.y)
        })
        .collect()
}

pub fn degrees_to_vector(degrees: f32) -> Vector2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vector2::new(cos, sin)
}
