//! The closed shape family and the capability set every member supports.
//!
//! ```text
//!                 Shape
//!   ┌──────┬───────┼───────┬─────────┐
//! Circle Ellipse  Line  Polygon   Image ──► Vec<Shape>
//! ```
//!
//! Every variant implements [`Transformable`]. [`Shape`] dispatches to the
//! variant with a `match`, and an [`Image`] forwards to its components, so
//! images nest.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

use crate::codec::{self, keyword};
use crate::geometry::{norm, BoundingBox, Color, Vec2};
use crate::image::Image;
use crate::render::Surface;

/// Variant tag. Also the key of the per-variant statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Polygon,
    Line,
    Ellipse,
    Image,
}

impl ShapeKind {
    /// Leading token of the variant on the wire. Images have none of their
    /// own: they serialize as their components followed by an annotation.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            ShapeKind::Circle => Some(keyword::CIRCLE),
            ShapeKind::Polygon => Some(keyword::POLYGON),
            ShapeKind::Line => Some(keyword::LINE),
            ShapeKind::Ellipse => Some(keyword::ELLIPSE),
            ShapeKind::Image => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShapeKind::Circle => "Circle",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::Line => "Line",
            ShapeKind::Ellipse => "Ellipse",
            ShapeKind::Image => "Image",
        };
        f.write_str(label)
    }
}

// ───────────────────────────────────────────────────────────────────
// Capability set
// ───────────────────────────────────────────────────────────────────

/// Measurements, affine transforms, serialization and drawing.
///
/// Angles are radians, counter-clockwise for positive values. Homothety
/// ratios are expected to be positive; zero and negative ratios are applied
/// as-is.
pub trait Transformable {
    fn area(&self) -> f32;
    fn perimeter(&self) -> f32;
    fn translate(&mut self, t: Vec2);
    /// Scale about the shape's own center.
    fn homothety(&mut self, ratio: f32);
    /// Scale about `pivot`: `new = pivot + ratio · (old − pivot)`.
    fn homothety_about(&mut self, pivot: Vec2, ratio: f32);
    /// Rotate about the shape's own center.
    fn rotate(&mut self, angle: f32);
    fn rotate_about(&mut self, pivot: Vec2, angle: f32);
    /// Point reflection through `center`.
    fn central_sym(&mut self, center: Vec2);
    /// Reflection across the line through `axis_point` along `axis_dir`.
    /// `axis_dir` must not be the zero vector.
    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2);
    fn bounding_box(&self) -> BoundingBox;
    /// Append this shape's tokens to `out`.
    fn write_tokens(&self, out: &mut String);
    /// Draw onto `surface` with every coordinate multiplied by `scale`.
    fn display(&self, surface: &mut dyn Surface, scale: f32);
}

// ───────────────────────────────────────────────────────────────────
// Circle
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub origin: Vec2,
    pub radius: f32,
    pub color: Color,
}

impl Circle {
    pub fn new(origin: Vec2, radius: f32, color: Color) -> Self {
        Self {
            origin,
            radius,
            color,
        }
    }
}

impl Transformable for Circle {
    fn area(&self) -> f32 {
        PI * self.radius * self.radius
    }

    fn perimeter(&self) -> f32 {
        2.0 * PI * self.radius
    }

    fn translate(&mut self, t: Vec2) {
        self.origin += t;
    }

    fn homothety(&mut self, ratio: f32) {
        self.radius *= ratio;
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        self.origin = self.origin.scaled_about(pivot, ratio);
        self.radius *= ratio;
    }

    // Invariant under rotation about its own center.
    fn rotate(&mut self, _angle: f32) {}

    fn rotate_about(&mut self, pivot: Vec2, angle: f32) {
        self.origin = self.origin.rotated_about(pivot, angle);
    }

    fn central_sym(&mut self, center: Vec2) {
        self.translate(2.0 * (center - self.origin));
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        self.origin = self.origin.reflected_across(axis_point, axis_dir);
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.origin, Vec2::new(self.radius, self.radius))
    }

    fn write_tokens(&self, out: &mut String) {
        codec::push_keyword(out, keyword::CIRCLE);
        codec::push_float(out, self.origin.x);
        codec::push_float(out, self.origin.y);
        codec::push_float(out, self.radius);
        codec::push_color(out, self.color);
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        surface.fill_circle(self.origin * scale, self.radius * scale, self.color);
    }
}

// ───────────────────────────────────────────────────────────────────
// Ellipse
// ───────────────────────────────────────────────────────────────────

/// Axis-aligned ellipse. The representation has no tilt, so rotation is
/// not supported and both rotate operations leave it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub origin: Vec2,
    pub radius: Vec2,
    pub color: Color,
}

impl Ellipse {
    pub fn new(origin: Vec2, radius: Vec2, color: Color) -> Self {
        Self {
            origin,
            radius,
            color,
        }
    }
}

impl Transformable for Ellipse {
    fn area(&self) -> f32 {
        PI * self.radius.x * self.radius.y
    }

    /// Ramanujan's second approximation.
    fn perimeter(&self) -> f32 {
        let (a, b) = (self.radius.x, self.radius.y);
        if a + b == 0.0 {
            return 0.0;
        }
        let h = ((a - b) * (a - b)) / ((a + b) * (a + b));
        PI * (a + b) * (1.0 + (3.0 * h) / (10.0 + (4.0 - 3.0 * h).sqrt()))
    }

    fn translate(&mut self, t: Vec2) {
        self.origin += t;
    }

    fn homothety(&mut self, ratio: f32) {
        self.radius = ratio * self.radius;
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        self.origin = self.origin.scaled_about(pivot, ratio);
        self.radius = ratio * self.radius;
    }

    fn rotate(&mut self, _angle: f32) {}

    fn rotate_about(&mut self, _pivot: Vec2, _angle: f32) {}

    fn central_sym(&mut self, center: Vec2) {
        self.translate(2.0 * (center - self.origin));
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        self.origin = self.origin.reflected_across(axis_point, axis_dir);
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.origin, self.radius)
    }

    fn write_tokens(&self, out: &mut String) {
        codec::push_keyword(out, keyword::ELLIPSE);
        codec::push_float(out, self.origin.x);
        codec::push_float(out, self.origin.y);
        codec::push_float(out, self.radius.x);
        codec::push_float(out, self.radius.y);
        codec::push_color(out, self.color);
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        surface.fill_ellipse(self.origin * scale, self.radius * scale, self.color);
    }
}

// ───────────────────────────────────────────────────────────────────
// Line
// ───────────────────────────────────────────────────────────────────

/// Unbounded line through `point` along `direction`.
///
/// Area and perimeter are undefined for it; both report the sentinel `1.0`.
/// The bounding box collapses onto `point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub point: Vec2,
    pub direction: Vec2,
    pub color: Color,
}

impl Line {
    pub fn new(point: Vec2, direction: Vec2, color: Color) -> Self {
        Self {
            point,
            direction,
            color,
        }
    }
}

impl Transformable for Line {
    fn area(&self) -> f32 {
        1.0
    }

    fn perimeter(&self) -> f32 {
        1.0
    }

    fn translate(&mut self, t: Vec2) {
        self.point += t;
    }

    fn homothety(&mut self, ratio: f32) {
        self.direction = ratio * self.direction;
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        self.point = self.point.scaled_about(pivot, ratio);
        self.direction = ratio * self.direction;
    }

    fn rotate(&mut self, angle: f32) {
        self.direction = self.direction.rotated(angle);
    }

    fn rotate_about(&mut self, pivot: Vec2, angle: f32) {
        self.point = self.point.rotated_about(pivot, angle);
        self.direction = self.direction.rotated(angle);
    }

    fn central_sym(&mut self, center: Vec2) {
        self.translate(2.0 * (center - self.point));
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        self.point = self.point.reflected_across(axis_point, axis_dir);
        self.direction = self.direction.mirrored_along(axis_dir);
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.point, Vec2::ZERO)
    }

    fn write_tokens(&self, out: &mut String) {
        codec::push_keyword(out, keyword::LINE);
        codec::push_float(out, self.point.x);
        codec::push_float(out, self.point.y);
        codec::push_float(out, self.direction.x);
        codec::push_float(out, self.direction.y);
        codec::push_color(out, self.color);
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        surface.draw_line(
            self.point * scale,
            (self.point + self.direction) * scale,
            self.color,
        );
    }
}

// ───────────────────────────────────────────────────────────────────
// Polygon
// ───────────────────────────────────────────────────────────────────

/// Closed polygon. Expected to hold at least three points; this is not
/// enforced. Equality compares the point sequence in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Vec2>,
    pub color: Color,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>, color: Color) -> Self {
        Self { points, color }
    }

    fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
        0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs()
    }
}

impl Transformable for Polygon {
    /// Fan triangulation from the first vertex. Exact for convex polygons
    /// and polygons star-shaped from vertex 0; overestimates otherwise.
    fn area(&self) -> f32 {
        let Some((&first, rest)) = self.points.split_first() else {
            return 0.0;
        };
        rest.windows(2)
            .map(|pair| Self::triangle_area(first, pair[0], pair[1]))
            .sum()
    }

    fn perimeter(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let n = self.points.len();
        (0..n)
            .map(|i| norm(self.points[(i + 1) % n] - self.points[i]))
            .sum()
    }

    fn translate(&mut self, t: Vec2) {
        for p in &mut self.points {
            *p += t;
        }
    }

    fn homothety(&mut self, ratio: f32) {
        let center = self.bounding_box().center();
        self.homothety_about(center, ratio);
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        for p in &mut self.points {
            *p = p.scaled_about(pivot, ratio);
        }
    }

    fn rotate(&mut self, angle: f32) {
        let center = self.bounding_box().center();
        self.rotate_about(center, angle);
    }

    fn rotate_about(&mut self, pivot: Vec2, angle: f32) {
        for p in &mut self.points {
            *p = p.rotated_about(pivot, angle);
        }
    }

    fn central_sym(&mut self, center: Vec2) {
        for p in &mut self.points {
            *p += 2.0 * (center - *p);
        }
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        for p in &mut self.points {
            *p = p.reflected_across(axis_point, axis_dir);
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    fn write_tokens(&self, out: &mut String) {
        codec::push_keyword(out, keyword::POLYGON);
        codec::push_int(out, self.points.len() as i64);
        for p in &self.points {
            codec::push_float(out, p.x);
            codec::push_float(out, p.y);
        }
        codec::push_color(out, self.color);
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        let scaled: Vec<Vec2> = self.points.iter().map(|p| *p * scale).collect();
        surface.fill_polygon(&scaled, self.color);
    }
}

// ───────────────────────────────────────────────────────────────────
// Shape
// ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle(Circle),
    Ellipse(Ellipse),
    Line(Line),
    Polygon(Polygon),
    Image(Image),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Shape::Circle($s) => $body,
            Shape::Ellipse($s) => $body,
            Shape::Line($s) => $body,
            Shape::Polygon($s) => $body,
            Shape::Image($s) => $body,
        }
    };
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Line(_) => ShapeKind::Line,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Image(_) => ShapeKind::Image,
        }
    }

    /// Fill color. Images have no color of their own and report black.
    pub fn color(&self) -> Color {
        match self {
            Shape::Circle(c) => c.color,
            Shape::Ellipse(e) => e.color,
            Shape::Line(l) => l.color,
            Shape::Polygon(p) => p.color,
            Shape::Image(_) => Color::BLACK,
        }
    }

    /// Pivot used by `homothety` and `rotate` on this shape.
    pub fn center(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.origin,
            Shape::Ellipse(e) => e.origin,
            Shape::Line(l) => l.point,
            Shape::Polygon(p) => p.bounding_box().center(),
            Shape::Image(i) => i.bounding_box().center(),
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Shape::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl Transformable for Shape {
    fn area(&self) -> f32 {
        dispatch!(self, s => s.area())
    }

    fn perimeter(&self) -> f32 {
        dispatch!(self, s => s.perimeter())
    }

    fn translate(&mut self, t: Vec2) {
        dispatch!(self, s => s.translate(t))
    }

    fn homothety(&mut self, ratio: f32) {
        dispatch!(self, s => s.homothety(ratio))
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        dispatch!(self, s => s.homothety_about(pivot, ratio))
    }

    fn rotate(&mut self, angle: f32) {
        dispatch!(self, s => s.rotate(angle))
    }

    fn rotate_about(&mut self, pivot: Vec2, angle: f32) {
        dispatch!(self, s => s.rotate_about(pivot, angle))
    }

    fn central_sym(&mut self, center: Vec2) {
        dispatch!(self, s => s.central_sym(center))
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        dispatch!(self, s => s.axial_sym(axis_point, axis_dir))
    }

    fn bounding_box(&self) -> BoundingBox {
        dispatch!(self, s => s.bounding_box())
    }

    fn write_tokens(&self, out: &mut String) {
        let before = out.len();
        dispatch!(self, s => s.write_tokens(out));
        debug_assert!(
            self.kind()
                .keyword()
                .map_or(true, |kw| out[before..].trim_start().starts_with(kw)),
            "serialized tokens do not match variant tag {:?}",
            self.kind()
        );
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        dispatch!(self, s => s.display(surface, scale))
    }
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

impl From<Ellipse> for Shape {
    fn from(e: Ellipse) -> Self {
        Shape::Ellipse(e)
    }
}

impl From<Line> for Shape {
    fn from(l: Line) -> Self {
        Shape::Line(l)
    }
}

impl From<Polygon> for Shape {
    fn from(p: Polygon) -> Self {
        Shape::Polygon(p)
    }
}

impl From<Image> for Shape {
    fn from(i: Image) -> Self {
        Shape::Image(i)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Circle(c) => write!(f, "Circle {} r={} {}", c.origin, c.radius, c.color),
            Shape::Ellipse(e) => write!(f, "Ellipse {} r={} {}", e.origin, e.radius, e.color),
            Shape::Line(l) => write!(f, "Line {} dir={} {}", l.point, l.direction, l.color),
            Shape::Polygon(p) => {
                write!(f, "Polygon [")?;
                for (i, point) in p.points.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{point}")?;
                }
                write!(f, "] {}", p.color)
            }
            Shape::Image(i) => write!(f, "Image ({} components) \"{}\"", i.len(), i.annotation()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4 * a.abs().max(b.abs()).max(1.0)
    }

    fn unit_square() -> Polygon {
        Polygon::new(
            vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ],
            Color::new(10, 20, 30),
        )
    }

    #[test]
    fn test_circle_scenario() {
        let mut c = Circle::new(Vec2::new(50.0, 50.0), 35.0, Color::new(255, 125, 0));
        assert!(approx(c.area(), PI * 35.0 * 35.0));
        assert!(approx(c.perimeter(), 2.0 * PI * 35.0));

        c.translate(Vec2::new(10.0, 10.0));
        assert_eq!(c.origin, Vec2::new(60.0, 60.0));

        c.central_sym(Vec2::ZERO);
        assert_eq!(c.origin, Vec2::new(-60.0, -60.0));

        c.homothety(2.5);
        assert_eq!(c.radius, 87.5);

        c.axial_sym(Vec2::ZERO, Vec2::new(0.0, 1.0));
        assert_eq!(c.origin, Vec2::new(60.0, -60.0));
    }

    #[test]
    fn test_circle_central_sym_about_own_origin_is_identity() {
        let c = Circle::new(Vec2::new(-60.0, -60.0), 35.0, Color::new(255, 125, 0));
        let mut c2 = c.clone();
        c2.central_sym(c2.origin);
        assert_eq!(c, c2);
    }

    #[test]
    fn test_circle_homothety_about_own_origin() {
        let mut c = Circle::new(Vec2::new(3.0, 4.0), 2.0, Color::BLACK);
        c.homothety_about(Vec2::new(3.0, 4.0), 3.0);
        assert_eq!(c.origin, Vec2::new(3.0, 4.0));
        assert_eq!(c.radius, 6.0);

        c.homothety_about(Vec2::ZERO, 0.5);
        assert_eq!(c.origin, Vec2::new(1.5, 2.0));
        assert_eq!(c.radius, 3.0);
    }

    #[test]
    fn test_circle_rotate_about_own_center_is_noop() {
        let mut c = Circle::new(Vec2::new(0.0, 1.0), 10.0, Color::BLACK);
        c.rotate(std::f32::consts::FRAC_PI_2);
        assert_eq!(c.origin, Vec2::new(0.0, 1.0));

        c.rotate_about(Vec2::ZERO, std::f32::consts::FRAC_PI_2);
        assert!(approx(c.origin.x, -1.0));
        assert!(c.origin.y.abs() < 1e-6);
    }

    #[test]
    fn test_circle_write_tokens() {
        let c = Circle::new(Vec2::new(0.0, 1.0), 10.0, Color::BLACK);
        let mut s = String::new();
        c.write_tokens(&mut s);
        assert_eq!(s, "circle 0.00 1.00 10.00 0 0 0");
    }

    #[test]
    fn test_polygon_area_perimeter() {
        let p = unit_square();
        assert_eq!(p.area(), 1.0);
        assert_eq!(p.perimeter(), 4.0);
    }

    #[test]
    fn test_polygon_degenerate_sizes() {
        let empty = Polygon::new(Vec::new(), Color::BLACK);
        assert_eq!(empty.area(), 0.0);
        assert_eq!(empty.perimeter(), 0.0);
        assert!(empty.bounding_box().is_empty());

        let segment = Polygon::new(vec![Vec2::ZERO, Vec2::new(3.0, 4.0)], Color::BLACK);
        assert_eq!(segment.area(), 0.0);
        assert_eq!(segment.perimeter(), 10.0);
    }

    #[test]
    fn test_polygon_translate_round_trip() {
        let p = unit_square();
        let mut p2 = p.clone();
        p2.translate(Vec2::new(10.0, 15.0));
        assert_ne!(p, p2);
        p2.translate(Vec2::new(-10.0, -15.0));
        assert_eq!(p, p2);
    }

    #[test]
    fn test_polygon_central_sym_involution() {
        let p = unit_square();
        let mut p2 = p.clone();
        p2.central_sym(Vec2::new(7.0, -3.0));
        assert_ne!(p, p2);
        p2.central_sym(Vec2::new(7.0, -3.0));
        assert_eq!(p, p2);
    }

    #[test]
    fn test_polygon_equality_is_order_sensitive() {
        let p = unit_square();
        let mut reversed = p.clone();
        reversed.points.reverse();
        assert_ne!(p, reversed);
    }

    #[test]
    fn test_polygon_homothety_about_bbox_center() {
        let mut p = unit_square();
        p.homothety(2.0);
        assert_eq!(p.bounding_box(), BoundingBox::new(-0.5, 1.5, -0.5, 1.5));
        assert_eq!(p.area(), 4.0);
    }

    #[test]
    fn test_polygon_rotate_keeps_center() {
        let mut p = unit_square();
        p.rotate(std::f32::consts::PI);
        let c = p.bounding_box().center();
        assert!(approx(c.x, 0.5));
        assert!(approx(c.y, 0.5));
        assert!(approx(p.area(), 1.0));
    }

    #[test]
    fn test_polygon_write_tokens() {
        let mut s = String::new();
        unit_square().write_tokens(&mut s);
        assert_eq!(
            s,
            "polygon 4 0.00 1.00 1.00 1.00 1.00 0.00 0.00 0.00 10 20 30"
        );
    }

    #[test]
    fn test_ellipse_perimeter_matches_circle() {
        let e = Ellipse::new(Vec2::ZERO, Vec2::new(5.0, 5.0), Color::BLACK);
        assert!(approx(e.perimeter(), 2.0 * PI * 5.0));
        assert!(approx(e.area(), PI * 25.0));

        let flat = Ellipse::new(Vec2::ZERO, Vec2::new(10.0, 3.0), Color::BLACK);
        assert!(flat.perimeter() > 2.0 * 10.0 * 2.0);
        assert!(flat.perimeter() < 2.0 * PI * 10.0);
    }

    #[test]
    fn test_ellipse_rotation_unsupported() {
        let e = Ellipse::new(Vec2::new(4.0, 2.0), Vec2::new(10.0, 3.0), Color::BLACK);
        let mut rotated = e.clone();
        rotated.rotate(1.0);
        rotated.rotate_about(Vec2::new(-3.0, 9.0), 2.0);
        assert_eq!(e, rotated);
    }

    #[test]
    fn test_ellipse_homothety_and_bbox() {
        let mut e = Ellipse::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0), Color::BLACK);
        e.homothety(2.0);
        assert_eq!(e.radius, Vec2::new(4.0, 2.0));
        assert_eq!(e.bounding_box(), BoundingBox::new(-3.0, 5.0, -1.0, 3.0));
    }

    #[test]
    fn test_line_sentinels_and_bbox() {
        let l = Line::new(Vec2::new(2.0, 3.0), Vec2::new(1.0, 1.0), Color::BLACK);
        assert_eq!(l.area(), 1.0);
        assert_eq!(l.perimeter(), 1.0);
        assert_eq!(l.bounding_box(), BoundingBox::new(2.0, 2.0, 3.0, 3.0));
    }

    #[test]
    fn test_line_axial_sym() {
        let mut l = Line::new(Vec2::new(2.0, 3.0), Vec2::new(1.0, 1.0), Color::BLACK);
        l.axial_sym(Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert_eq!(l.point, Vec2::new(2.0, -3.0));
        assert_eq!(l.direction, Vec2::new(1.0, -1.0));
    }

    fn approx_vec(a: Vec2, b: Vec2) -> bool {
        approx(a.x, b.x) && approx(a.y, b.y)
    }

    #[test]
    fn test_line_rotate_turns_direction_only() {
        let mut l = Line::new(Vec2::new(2.0, 3.0), Vec2::new(1.0, 0.0), Color::BLACK);
        l.rotate(PI / 2.0);
        assert_eq!(l.point, Vec2::new(2.0, 3.0));
        assert!(approx_vec(l.direction, Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn test_line_rotate_about_pivot() {
        let mut l = Line::new(Vec2::new(2.0, 0.0), Vec2::new(1.0, 0.0), Color::BLACK);
        l.rotate_about(Vec2::new(1.0, 0.0), PI);
        assert!(approx_vec(l.point, Vec2::new(0.0, 0.0)));
        assert!(approx_vec(l.direction, Vec2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_line_homothety_about_pivot() {
        let mut l = Line::new(Vec2::new(3.0, 1.0), Vec2::new(0.5, -1.0), Color::BLACK);
        l.homothety_about(Vec2::new(1.0, 1.0), 2.0);
        assert_eq!(l.point, Vec2::new(5.0, 1.0));
        assert_eq!(l.direction, Vec2::new(1.0, -2.0));
    }

    #[test]
    fn test_polygon_axial_sym() {
        let mut p = unit_square();
        p.axial_sym(Vec2::new(2.0, 0.0), Vec2::new(0.0, 1.0));
        let expected = [
            Vec2::new(4.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(4.0, 0.0),
        ];
        assert_eq!(p.points.len(), expected.len());
        for (got, want) in p.points.iter().zip(&expected) {
            assert!(approx_vec(*got, *want), "{got} != {want}");
        }
        assert_eq!(p.bounding_box(), BoundingBox::new(3.0, 4.0, 0.0, 1.0));
        assert!(approx(p.area(), 1.0));
    }

    #[test]
    fn test_shape_translate_inverse_for_every_variant() {
        let shapes: Vec<Shape> = vec![
            Circle::new(Vec2::new(1.0, 2.0), 3.0, Color::new(1, 2, 3)).into(),
            Ellipse::new(Vec2::new(4.0, 5.0), Vec2::new(6.0, 7.0), Color::new(4, 5, 6)).into(),
            Line::new(Vec2::new(8.0, 9.0), Vec2::new(1.0, 0.0), Color::new(7, 8, 9)).into(),
            unit_square().into(),
        ];
        let t = Vec2::new(12.5, -4.25);
        for shape in shapes {
            let mut moved = shape.clone();
            moved.translate(t);
            moved.translate(-t);
            assert_eq!(moved, shape);
        }
    }

    #[test]
    fn test_shape_kind_and_keyword() {
        let s: Shape = unit_square().into();
        assert_eq!(s.kind(), ShapeKind::Polygon);
        assert_eq!(s.kind().keyword(), Some("polygon"));
        assert_eq!(s.color(), Color::new(10, 20, 30));
        assert_eq!(ShapeKind::Image.keyword(), None);
        assert_eq!(ShapeKind::Ellipse.to_string(), "Ellipse");
    }

    #[test]
    fn test_shape_display_listing() {
        let s: Shape = Circle::new(Vec2::new(1.0, 2.0), 3.0, Color::new(4, 5, 6)).into();
        assert_eq!(s.to_string(), "Circle (1, 2) r=3 (4, 5, 6)");
    }
}
