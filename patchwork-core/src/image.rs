//! Image aggregate: an ordered list of shapes, an annotation and a
//! placement origin.
//!
//! Components are stored in absolute coordinates. `add_component` shifts an
//! incoming shape by the current origin, so a shape built around `(0, 0)`
//! lands at the origin. Insertion order is kept; it is the drawing order and
//! the token order on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, keyword, DecodeError};
use crate::geometry::{BoundingBox, Vec2};
use crate::render::Surface;
use crate::shape::{Shape, Transformable};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("component index {index} out of range ({len} components)")]
    ComponentOutOfRange { index: usize, len: usize },
    #[error("image lock poisoned")]
    Poisoned,
    #[error("payload rejected: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
    components: Vec<Shape>,
    annotation: String,
    origin: Vec2,
}

impl Image {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `shape`, translated by this image's origin.
    pub fn add_component(&mut self, shape: impl Into<Shape>) {
        let mut shape = shape.into();
        if self.origin != Vec2::ZERO {
            shape.translate(self.origin);
        }
        self.components.push(shape);
    }

    pub fn components(&self) -> &[Shape] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Result<&Shape, ImageError> {
        let len = self.components.len();
        self.components
            .get(index)
            .ok_or(ImageError::ComponentOutOfRange { index, len })
    }

    pub fn component_mut(&mut self, index: usize) -> Result<&mut Shape, ImageError> {
        let len = self.components.len();
        self.components
            .get_mut(index)
            .ok_or(ImageError::ComponentOutOfRange { index, len })
    }

    /// Remove and return the component at `index`, shifting later ones down.
    pub fn remove_component(&mut self, index: usize) -> Result<Shape, ImageError> {
        let len = self.components.len();
        if index >= len {
            return Err(ImageError::ComponentOutOfRange { index, len });
        }
        Ok(self.components.remove(index))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    pub fn annotate(&mut self, text: impl Into<String>) {
        self.annotation = text.into();
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Move the placement origin to `new_origin`.
    ///
    /// Every component is retranslated by `old − new` before the origin is
    /// stored.
    pub fn set_origin(&mut self, new_origin: Vec2) {
        let shift = self.origin - new_origin;
        for c in &mut self.components {
            c.translate(shift);
        }
        self.origin = new_origin;
    }

    /// The full wire payload for this image.
    pub fn to_payload(&self) -> String {
        let mut out = String::new();
        self.write_tokens(&mut out);
        out
    }

    /// Replace every component and the annotation with the contents of
    /// `payload`.
    ///
    /// Not transactional: on a decode error the components parsed before the
    /// failing token are kept and the rest is dropped. Returns the number of
    /// shapes decoded.
    pub fn deserialize(&mut self, payload: &str) -> Result<usize, DecodeError> {
        self.components.clear();
        self.annotation.clear();
        codec::decode_into(self, payload)
    }

    /// Push a decoded shape as-is. Decoded coordinates are already absolute.
    pub(crate) fn push_decoded(&mut self, shape: Shape) {
        self.components.push(shape);
    }
}

impl Transformable for Image {
    /// Area of the union bounding box.
    fn area(&self) -> f32 {
        let bb = self.bounding_box();
        bb.width() * bb.height()
    }

    /// Perimeter of the union bounding box.
    fn perimeter(&self) -> f32 {
        let bb = self.bounding_box();
        2.0 * (bb.width() + bb.height())
    }

    fn translate(&mut self, t: Vec2) {
        for c in &mut self.components {
            c.translate(t);
        }
    }

    fn homothety(&mut self, ratio: f32) {
        for c in &mut self.components {
            c.homothety(ratio);
        }
    }

    fn homothety_about(&mut self, pivot: Vec2, ratio: f32) {
        for c in &mut self.components {
            c.homothety_about(pivot, ratio);
        }
    }

    fn rotate(&mut self, angle: f32) {
        for c in &mut self.components {
            c.rotate(angle);
        }
    }

    fn rotate_about(&mut self, pivot: Vec2, angle: f32) {
        for c in &mut self.components {
            c.rotate_about(pivot, angle);
        }
    }

    fn central_sym(&mut self, center: Vec2) {
        for c in &mut self.components {
            c.central_sym(center);
        }
    }

    fn axial_sym(&mut self, axis_point: Vec2, axis_dir: Vec2) {
        for c in &mut self.components {
            c.axial_sym(axis_point, axis_dir);
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        self.components
            .iter()
            .fold(BoundingBox::EMPTY, |mut bb, c| {
                bb.union(&c.bounding_box());
                bb
            })
    }

    /// Components' tokens, then `annotation <byte length> <text>`.
    fn write_tokens(&self, out: &mut String) {
        for c in &self.components {
            c.write_tokens(out);
        }
        codec::push_keyword(out, keyword::ANNOTATION);
        codec::push_int(out, self.annotation.len() as i64);
        out.push(' ');
        out.push_str(&self.annotation);
    }

    fn display(&self, surface: &mut dyn Surface, scale: f32) {
        for c in &self.components {
            c.display(surface, scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;
    use crate::shape::{Circle, Line, Polygon};

    fn circle(x: f32, y: f32, r: f32) -> Circle {
        Circle::new(Vec2::new(x, y), r, Color::new(255, 0, 0))
    }

    #[test]
    fn test_add_component_keeps_order() {
        let mut img = Image::new();
        img.add_component(circle(0.0, 0.0, 1.0));
        img.add_component(Line::new(Vec2::ZERO, Vec2::new(1.0, 0.0), Color::BLACK));
        assert_eq!(img.len(), 2);
        assert!(matches!(img.components()[0], Shape::Circle(_)));
        assert!(matches!(img.components()[1], Shape::Line(_)));
    }

    #[test]
    fn test_add_component_applies_origin() {
        let mut img = Image::new();
        img.set_origin(Vec2::new(10.0, 5.0));
        img.add_component(circle(1.0, 1.0, 1.0));
        match img.component(0).unwrap() {
            Shape::Circle(c) => assert_eq!(c.origin, Vec2::new(11.0, 6.0)),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_set_origin_retranslates_children() {
        let mut img = Image::new();
        img.add_component(circle(20.0, 20.0, 1.0));
        img.set_origin(Vec2::new(5.0, 0.0));
        assert_eq!(img.origin(), Vec2::new(5.0, 0.0));
        match img.component(0).unwrap() {
            Shape::Circle(c) => assert_eq!(c.origin, Vec2::new(15.0, 20.0)),
            other => panic!("expected circle, got {other:?}"),
        }

        img.set_origin(Vec2::ZERO);
        match img.component(0).unwrap() {
            Shape::Circle(c) => assert_eq!(c.origin, Vec2::new(20.0, 20.0)),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_bounding_box_union_and_measures() {
        let mut img = Image::new();
        assert!(img.bounding_box().is_empty());
        assert_eq!(img.area(), 0.0);

        img.add_component(circle(0.0, 0.0, 1.0));
        img.add_component(circle(4.0, 2.0, 1.0));
        assert_eq!(img.bounding_box(), BoundingBox::new(-1.0, 5.0, -1.0, 3.0));
        assert_eq!(img.area(), 24.0);
        assert_eq!(img.perimeter(), 20.0);
    }

    #[test]
    fn test_transforms_forward_to_components() {
        let mut img = Image::new();
        img.add_component(circle(1.0, 1.0, 1.0));
        img.add_component(Polygon::new(
            vec![Vec2::ZERO, Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0)],
            Color::BLACK,
        ));
        let original = img.clone();

        img.translate(Vec2::new(3.0, 3.0));
        assert_eq!(img.bounding_box(), BoundingBox::new(3.0, 5.0, 3.0, 5.0));

        img.translate(Vec2::new(-3.0, -3.0));
        assert_eq!(img, original);

        img.central_sym(Vec2::ZERO);
        img.central_sym(Vec2::ZERO);
        assert_eq!(img, original);
    }

    #[test]
    fn test_remove_component_out_of_range() {
        let mut img = Image::new();
        img.add_component(circle(0.0, 0.0, 1.0));
        img.add_component(circle(1.0, 0.0, 1.0));

        let err = img.remove_component(5).unwrap_err();
        assert_eq!(err, ImageError::ComponentOutOfRange { index: 5, len: 2 });
        assert_eq!(img.len(), 2);

        let removed = img.remove_component(1).unwrap();
        assert_eq!(removed, Shape::Circle(circle(1.0, 0.0, 1.0)));
        assert_eq!(img.len(), 1);
    }

    #[test]
    fn test_serialize_appends_annotation() {
        let mut img = Image::new();
        img.add_component(Circle::new(Vec2::new(0.0, 1.0), 10.0, Color::BLACK));
        img.annotate("nice drawing");
        assert_eq!(
            img.to_payload(),
            "circle 0.00 1.00 10.00 0 0 0 annotation 12 nice drawing"
        );
    }

    #[test]
    fn test_empty_image_payload() {
        assert_eq!(Image::new().to_payload(), "annotation 0 ");
    }

    #[test]
    fn test_nested_image_forwards() {
        let mut inner = Image::new();
        inner.add_component(circle(0.0, 0.0, 2.0));

        let mut outer = Image::new();
        outer.add_component(inner);
        outer.add_component(circle(10.0, 0.0, 1.0));

        assert_eq!(outer.bounding_box(), BoundingBox::new(-2.0, 11.0, -2.0, 2.0));
        outer.homothety(2.0);
        match outer.component(0).unwrap() {
            Shape::Image(i) => {
                assert_eq!(i.bounding_box(), BoundingBox::new(-4.0, 4.0, -4.0, 4.0))
            }
            other => panic!("expected image, got {other:?}"),
        }
    }
}
