//! Drawing surface abstraction.
//!
//! Shapes draw themselves through [`Surface`], so the core carries no
//! graphics backend. The CLI ships a character-grid surface; tests record
//! draw calls.

use crate::geometry::{Color, Vec2};

/// Raster target for filled primitives. Coordinates arrive already scaled.
pub trait Surface {
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, color: Color);
    fn fill_polygon(&mut self, points: &[Vec2], color: Color);
    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color);
}

/// A single draw call, as captured by [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Circle { center: Vec2, radius: f32, color: Color },
    Ellipse { center: Vec2, radii: Vec2, color: Color },
    Polygon { points: Vec<Vec2>, color: Color },
    Line { from: Vec2, to: Vec2, color: Color },
}

/// Surface that records every call in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<DrawCall>,
}

impl Surface for Recorder {
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            color,
        });
    }

    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, color: Color) {
        self.calls.push(DrawCall::Ellipse {
            center,
            radii,
            color,
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.calls.push(DrawCall::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        self.calls.push(DrawCall::Line { from, to, color });
    }
}
