//! Shape frequency tables over one or more images.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::Color;
use crate::image::Image;
use crate::shape::{Shape, ShapeKind};

/// Per-kind and per-color counts.
///
/// A nested image counts once under [`ShapeKind::Image`]; its direct
/// children are counted like top-level shapes. Deeper nesting is not
/// unwrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeTally {
    pub kinds: BTreeMap<ShapeKind, usize>,
    #[serde(serialize_with = "serialize_colors")]
    pub colors: BTreeMap<Color, usize>,
}

impl ShapeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_image(image: &Image) -> Self {
        let mut tally = Self::new();
        tally.record_image(image);
        tally
    }

    pub fn record_image(&mut self, image: &Image) {
        for shape in image.components() {
            self.record_shape(shape);
            if let Shape::Image(nested) = shape {
                for child in nested.components() {
                    self.record_shape(child);
                }
            }
        }
    }

    fn record_shape(&mut self, shape: &Shape) {
        *self.kinds.entry(shape.kind()).or_default() += 1;
        if shape.kind() != ShapeKind::Image {
            *self.colors.entry(shape.color()).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: &ShapeTally) {
        for (kind, n) in &other.kinds {
            *self.kinds.entry(*kind).or_default() += n;
        }
        for (color, n) in &other.colors {
            *self.colors.entry(*color).or_default() += n;
        }
    }

    pub fn total_shapes(&self) -> usize {
        self.kinds.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

// JSON object keys must be strings.
fn serialize_colors<S>(colors: &BTreeMap<Color, usize>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(colors.len()))?;
    for (color, n) in colors {
        map.serialize_entry(&color.to_string(), n)?;
    }
    map.end()
}

impl fmt::Display for ShapeTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, n) in &self.kinds {
            writeln!(f, "{kind}: {n}")?;
        }
        for (color, n) in &self.colors {
            writeln!(f, "{color}: {n}")?;
        }
        Ok(())
    }
}
