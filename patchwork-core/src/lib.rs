//! Shape model for the patchwork drawing exchange.
//!
//! ```text
//!  geometry ──► shape ──► image ──► codec ──► payload text
//!                 │          │
//!                 └─ render ◄┘      shared (lock + command surface)
//! ```
//!
//! An [`Image`] is an ordered list of [`Shape`]s plus an annotation. Its
//! serialized form is the body of every image frame on the wire, so the
//! transform algebra and the codec are kept together in this crate.

pub mod codec;
pub mod geometry;
pub mod image;
pub mod render;
pub mod shape;
pub mod shared;
pub mod stats;

pub use codec::{decode, encode, DecodeError, PartialDecode};
pub use geometry::{dot, norm, BoundingBox, Color, Vec2};
pub use image::{Image, ImageError};
pub use render::Surface;
pub use shape::{Circle, Ellipse, Line, Polygon, Shape, ShapeKind, Transformable};
pub use shared::{SharedImage, Transform};
pub use stats::ShapeTally;
