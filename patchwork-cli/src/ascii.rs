//! Character-grid surface for showing images in a terminal.

use patchwork_core::{dot, norm, Color, Image, Surface, Transformable, Vec2};

pub const DEFAULT_WIDTH: usize = 72;
pub const DEFAULT_HEIGHT: usize = 24;

const CIRCLE: char = 'o';
const ELLIPSE: char = 'e';
const POLYGON: char = '#';
const LINE: char = '*';

/// Grid of `width × height` cells, y axis pointing up.
pub struct AsciiCanvas {
    width: usize,
    height: usize,
    cells: Vec<char>,
    /// Subtracted from every incoming (already scaled) coordinate.
    offset: Vec2,
}

impl AsciiCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; width * height],
            offset: Vec2::ZERO,
        }
    }

    /// Draw `image` scaled to fit the grid.
    pub fn render(image: &Image, width: usize, height: usize) -> String {
        let mut canvas = Self::new(width.max(1), height.max(1));
        let bb = image.bounding_box();
        if !bb.is_empty() {
            let sx = (canvas.width - 1).max(1) as f32 / bb.width().max(1.0);
            let sy = (canvas.height - 1).max(1) as f32 / bb.height().max(1.0);
            let scale = sx.min(sy);
            canvas.offset = Vec2::new(bb.x_min * scale, bb.y_min * scale);
            image.display(&mut canvas, scale);
        }
        canvas.to_text()
    }

    fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.cells.chunks(self.width) {
            let line: String = row.iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    fn cell(&self, p: Vec2) -> Option<usize> {
        let x = (p.x - self.offset.x).round();
        let y = (p.y - self.offset.y).round();
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return None;
        }
        let row = self.height - 1 - y as usize;
        Some(row * self.width + x as usize)
    }

    fn plot(&mut self, p: Vec2, glyph: char) {
        if let Some(i) = self.cell(p) {
            self.cells[i] = glyph;
        }
    }

    /// The part of segment `from → to` between the outermost cell centers
    /// (Liang-Barsky), or `None` when it misses the grid entirely.
    fn clip(&self, from: Vec2, to: Vec2) -> Option<(Vec2, Vec2)> {
        if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
            return None;
        }
        let a = from - self.offset;
        let d = to - from;
        let (x_max, y_max) = ((self.width - 1) as f32, (self.height - 1) as f32);
        let (mut t0, mut t1) = (0.0f32, 1.0f32);
        for (p, q) in [(-d.x, a.x), (d.x, x_max - a.x), (-d.y, a.y), (d.y, y_max - a.y)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((from + t0 * d, from + t1 * d))
    }

    /// Visit the world position of every cell center inside `[min, max]`.
    fn for_each_cell_in(&mut self, min: Vec2, max: Vec2, mut f: impl FnMut(Vec2) -> Option<char>) {
        let x0 = (min.x - self.offset.x).floor().max(0.0) as usize;
        let y0 = (min.y - self.offset.y).floor().max(0.0) as usize;
        let x1 = ((max.x - self.offset.x).ceil().max(0.0) as usize).min(self.width - 1);
        let y1 = ((max.y - self.offset.y).ceil().max(0.0) as usize).min(self.height - 1);
        for gy in y0..=y1 {
            for gx in x0..=x1 {
                let world = Vec2::new(gx as f32 + self.offset.x, gy as f32 + self.offset.y);
                if let Some(glyph) = f(world) {
                    self.plot(world, glyph);
                }
            }
        }
    }
}

impl Surface for AsciiCanvas {
    fn fill_circle(&mut self, center: Vec2, radius: f32, _color: Color) {
        let r = radius.abs().max(0.5);
        let half = Vec2::new(r, r);
        self.for_each_cell_in(center - half, center + half, |p| {
            let d = p - center;
            (d.x * d.x + d.y * d.y <= r * r).then_some(CIRCLE)
        });
    }

    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, _color: Color) {
        let rx = radii.x.abs().max(0.5);
        let ry = radii.y.abs().max(0.5);
        let half = Vec2::new(rx, ry);
        self.for_each_cell_in(center - half, center + half, |p| {
            let d = p - center;
            ((d.x / rx).powi(2) + (d.y / ry).powi(2) <= 1.0).then_some(ELLIPSE)
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], _color: Color) {
        if points.len() < 3 {
            for p in points {
                self.plot(*p, POLYGON);
            }
            return;
        }
        let (min, max) = points.iter().fold(
            (Vec2::new(f32::MAX, f32::MAX), Vec2::new(f32::MIN, f32::MIN)),
            |(lo, hi), p| {
                (
                    Vec2::new(lo.x.min(p.x), lo.y.min(p.y)),
                    Vec2::new(hi.x.max(p.x), hi.y.max(p.y)),
                )
            },
        );
        self.for_each_cell_in(min, max, |p| covers(points, p).then_some(POLYGON));
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, _color: Color) {
        let Some((from, to)) = self.clip(from, to) else {
            return;
        };
        let d = to - from;
        let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.plot(from + t * d, LINE);
        }
    }
}

/// A cell is covered when its center is inside the polygon or within half a
/// cell of one of its edges, so that outlines always show.
fn covers(points: &[Vec2], p: Vec2) -> bool {
    contains(points, p) || edges(points).any(|(a, b)| distance_to_segment(p, a, b) <= 0.5)
}

fn edges(points: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = dot(ab, ab);
    let t = if len2 > 0.0 {
        (dot(p - a, ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    norm(p - (a + t * ab))
}

/// Even-odd point-in-polygon test.
fn contains(points: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}
