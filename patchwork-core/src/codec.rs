//! Text wire codec between an [`Image`] and its payload.
//!
//! Grammar, one entry per shape, whitespace separated:
//! ```text
//! circle     <x> <y> <radius> <r> <g> <b>
//! ellipse    <x> <y> <radiusX> <radiusY> <r> <g> <b>
//! line       <x> <y> <dirX> <dirY> <r> <g> <b>
//! polygon    <n> <x1> <y1> ... <xn> <yn> <r> <g> <b>
//! annotation <byteLength> <text>
//! ```
//! Floats are written with exactly two decimals, integers in decimal.
//!
//! Decoding dispatches on the leading keyword. Unknown keywords are skipped
//! without producing a shape or an error, so newer peers can add variants.
//! A malformed number inside a known entry stops decoding at that entry:
//! shapes already decoded are kept and the error is returned.

use std::fmt::Write as _;
use thiserror::Error;

use crate::geometry::{Color, Vec2};
use crate::image::Image;
use crate::shape::{Circle, Ellipse, Line, Polygon, Shape};

pub mod keyword {
    pub const CIRCLE: &str = "circle";
    pub const ELLIPSE: &str = "ellipse";
    pub const LINE: &str = "line";
    pub const POLYGON: &str = "polygon";
    pub const ANNOTATION: &str = "annotation";
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("payload ended inside a {keyword} entry")]
    UnexpectedEnd { keyword: &'static str },
    #[error("invalid number {token:?} in a {keyword} entry")]
    InvalidNumber { keyword: &'static str, token: String },
    #[error("annotation declares {declared} bytes but only {available} are usable")]
    InvalidAnnotation { declared: usize, available: usize },
}

/// Decode failure together with whatever was decoded before it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("decode stopped after {} shapes: {error}", .image.len())]
pub struct PartialDecode {
    pub image: Image,
    #[source]
    pub error: DecodeError,
}

// ───────────────────────────────────────────────────────────────────
// Encoding
// ───────────────────────────────────────────────────────────────────

fn separate(out: &mut String) {
    if !out.is_empty() {
        out.push(' ');
    }
}

pub(crate) fn push_keyword(out: &mut String, kw: &str) {
    separate(out);
    out.push_str(kw);
}

pub(crate) fn push_float(out: &mut String, value: f32) {
    separate(out);
    // Writing into a String cannot fail.
    let _ = write!(out, "{value:.2}");
}

pub(crate) fn push_int(out: &mut String, value: i64) {
    separate(out);
    let _ = write!(out, "{value}");
}

pub(crate) fn push_color(out: &mut String, color: Color) {
    push_int(out, color.r as i64);
    push_int(out, color.g as i64);
    push_int(out, color.b as i64);
}

/// Serialize `image` to its wire payload.
pub fn encode(image: &Image) -> String {
    image.to_payload()
}

// ───────────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────────

/// Decode a payload into a fresh image.
pub fn decode(payload: &str) -> Result<Image, PartialDecode> {
    let mut image = Image::new();
    match decode_into(&mut image, payload) {
        Ok(_) => Ok(image),
        Err(error) => Err(PartialDecode { image, error }),
    }
}

/// Append every entry of `payload` to `image`. Returns the shape count.
pub(crate) fn decode_into(image: &mut Image, payload: &str) -> Result<usize, DecodeError> {
    let mut tokens = Tokens::new(payload);
    let mut decoded = 0;

    while let Some(word) = tokens.next_token() {
        let shape = match word {
            keyword::CIRCLE => decode_circle(&mut tokens)?,
            keyword::ELLIPSE => decode_ellipse(&mut tokens)?,
            keyword::LINE => decode_line(&mut tokens)?,
            keyword::POLYGON => decode_polygon(&mut tokens)?,
            keyword::ANNOTATION => {
                let len: usize = tokens.number(keyword::ANNOTATION)?;
                let text = tokens.take_bytes(len)?;
                image.annotate(text);
                continue;
            }
            other => {
                log::trace!("skipping unknown token {other:?}");
                continue;
            }
        };
        image.push_decoded(shape);
        decoded += 1;
    }

    Ok(decoded)
}

fn decode_circle(tokens: &mut Tokens<'_>) -> Result<Shape, DecodeError> {
    const KW: &str = keyword::CIRCLE;
    let origin = tokens.vec2(KW)?;
    let radius = tokens.number(KW)?;
    let color = tokens.color(KW)?;
    Ok(Circle::new(origin, radius, color).into())
}

fn decode_ellipse(tokens: &mut Tokens<'_>) -> Result<Shape, DecodeError> {
    const KW: &str = keyword::ELLIPSE;
    let origin = tokens.vec2(KW)?;
    let radius = tokens.vec2(KW)?;
    let color = tokens.color(KW)?;
    Ok(Ellipse::new(origin, radius, color).into())
}

fn decode_line(tokens: &mut Tokens<'_>) -> Result<Shape, DecodeError> {
    const KW: &str = keyword::LINE;
    let point = tokens.vec2(KW)?;
    let direction = tokens.vec2(KW)?;
    let color = tokens.color(KW)?;
    Ok(Line::new(point, direction, color).into())
}

fn decode_polygon(tokens: &mut Tokens<'_>) -> Result<Shape, DecodeError> {
    const KW: &str = keyword::POLYGON;
    let count: usize = tokens.number(KW)?;
    // The count is untrusted; let the vector grow as points actually parse.
    let mut points = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        points.push(tokens.vec2(KW)?);
    }
    let color = tokens.color(KW)?;
    Ok(Polygon::new(points, color).into())
}

/// Whitespace tokenizer that can also hand out raw byte runs.
struct Tokens<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos == bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && !bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        Some(&self.src[start..self.pos])
    }

    fn number<T: std::str::FromStr>(&mut self, keyword: &'static str) -> Result<T, DecodeError> {
        let token = self
            .next_token()
            .ok_or(DecodeError::UnexpectedEnd { keyword })?;
        token.parse().map_err(|_| DecodeError::InvalidNumber {
            keyword,
            token: token.to_string(),
        })
    }

    fn vec2(&mut self, keyword: &'static str) -> Result<Vec2, DecodeError> {
        let x = self.number(keyword)?;
        let y = self.number(keyword)?;
        Ok(Vec2::new(x, y))
    }

    fn color(&mut self, keyword: &'static str) -> Result<Color, DecodeError> {
        let r = self.number(keyword)?;
        let g = self.number(keyword)?;
        let b = self.number(keyword)?;
        Ok(Color::new(r, g, b))
    }

    /// Skip the single separator after the current token, then return the
    /// next `len` bytes verbatim.
    fn take_bytes(&mut self, len: usize) -> Result<&'a str, DecodeError> {
        let bytes = self.src.as_bytes();
        if self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let available = bytes.len() - self.pos;
        if len > available || !self.src.is_char_boundary(self.pos + len) {
            return Err(DecodeError::InvalidAnnotation {
                declared: len,
                available,
            });
        }
        let end = self.pos + len;
        let text = &self.src[self.pos..end];
        self.pos = end;
        Ok(text)
    }
}
