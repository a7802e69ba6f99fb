//! Geometry kernel: vectors, colors and axis-aligned bounding boxes.
//!
//! All types here are plain `Copy` values. Nothing in this module can fail.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

// ───────────────────────────────────────────────────────────────────
// Vec2
// ───────────────────────────────────────────────────────────────────

/// 2D vector, also used to hold points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotate counter-clockwise about the origin by `angle` radians.
    pub fn rotated(self, angle: f32) -> Vec2 {
        let (s, c) = angle.sin_cos();
        Vec2 {
            x: self.x * c - self.y * s,
            y: self.x * s + self.y * c,
        }
    }

    /// Rotate counter-clockwise about `pivot` by `angle` radians.
    pub fn rotated_about(self, pivot: Vec2, angle: f32) -> Vec2 {
        (self - pivot).rotated(angle) + pivot
    }

    /// `pivot + ratio * (self - pivot)`.
    pub fn scaled_about(self, pivot: Vec2, ratio: f32) -> Vec2 {
        pivot + ratio * (self - pivot)
    }

    /// Mirror image of this point across the line through `axis_point`
    /// with direction `axis_dir`.
    ///
    /// The foot of the perpendicular is found by projection, then the point
    /// is pushed twice that distance. A zero `axis_dir` yields NaN
    /// coordinates; callers must not pass one.
    pub fn reflected_across(self, axis_point: Vec2, axis_dir: Vec2) -> Vec2 {
        let w = self - axis_point;
        let b = dot(w, axis_dir) / dot(axis_dir, axis_dir);
        let foot = axis_point + b * axis_dir;
        self + 2.0 * (foot - self)
    }

    /// Reflect a free vector (direction) across an axis direction.
    pub fn mirrored_along(self, axis_dir: Vec2) -> Vec2 {
        let b = dot(self, axis_dir) / dot(axis_dir, axis_dir);
        2.0 * (b * axis_dir) - self
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self * rhs.x, self * rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        rhs * self
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dot product.
pub fn dot(a: Vec2, b: Vec2) -> f32 {
    a.x * b.x + a.y * b.y
}

/// Euclidean norm, `sqrt(a · a)`.
pub fn norm(a: Vec2) -> f32 {
    dot(a, a).sqrt()
}

// ───────────────────────────────────────────────────────────────────
// Color
// ───────────────────────────────────────────────────────────────────

/// RGB triplet. Components are not clamped to `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b }
    }

    /// `r·256² + g·256 + b`, the key used for ordering.
    pub fn packed(&self) -> i64 {
        (self.r as i64 * 256 + self.g as i64) * 256 + self.b as i64
    }
}

impl Ord for Color {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unranged components can pack to the same value; fall back to the
        // triplet so that Ord stays consistent with Eq.
        self.packed()
            .cmp(&other.packed())
            .then_with(|| (self.r, self.g, self.b).cmp(&(other.r, other.g, other.b)))
    }
}

impl PartialOrd for Color {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

// ───────────────────────────────────────────────────────────────────
// BoundingBox
// ───────────────────────────────────────────────────────────────────

/// Axis-aligned extent.
///
/// The default box is empty: minima sit at `f32::MAX` and maxima at
/// `f32::MIN`, so the first point folded in initializes all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox {
        x_min: f32::MAX,
        x_max: f32::MIN,
        y_min: f32::MAX,
        y_max: f32::MIN,
    };

    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Box of `center ± half_extent`.
    pub fn around(center: Vec2, half_extent: Vec2) -> Self {
        Self::new(
            center.x - half_extent.x,
            center.x + half_extent.x,
            center.y - half_extent.y,
            center.y + half_extent.y,
        )
    }

    /// Smallest box containing every point. Empty for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bb, p| {
            bb.include_point(*p);
            bb
        })
    }

    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    pub fn include_point(&mut self, p: Vec2) {
        self.x_min = self.x_min.min(p.x);
        self.x_max = self.x_max.max(p.x);
        self.y_min = self.y_min.min(p.y);
        self.y_max = self.y_max.max(p.y);
    }

    /// Grow to cover `other`. Empty boxes are ignored.
    pub fn union(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.x_min = self.x_min.min(other.x_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_min = self.y_min.min(other.y_min);
        self.y_max = self.y_max.max(other.y_max);
    }

    pub fn width(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.x_max - self.x_min
        }
    }

    pub fn height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.y_max - self.y_min
        }
    }

    /// Center point; the origin for an empty box.
    pub fn center(&self) -> Vec2 {
        if self.is_empty() {
            Vec2::ZERO
        } else {
            Vec2::new(
                (self.x_min + self.x_max) / 2.0,
                (self.y_min + self.y_max) / 2.0,
            )
        }
    }
}
