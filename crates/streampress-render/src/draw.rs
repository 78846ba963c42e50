// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Abstract 2D drawing model consumed by the rendering backend.
//
// Coordinates are in points with the origin at the top-left of the page
// and y increasing downward; the backend flips to the output format's
// bottom-left origin at emission time.

use streampress_core::error::Result;

use crate::raster::RasterImage;

/// A point in drawing-model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One segment of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic curve: control point, then endpoint.
    QuadTo(Point, Point),
    /// Cubic curve: two control points, then endpoint.
    CubicTo(Point, Point, Point),
    Close,
}

/// An arbitrary path of line and curve segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(Segment::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(Segment::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) -> &mut Self {
        self.segments
            .push(Segment::QuadTo(Point::new(cx, cy), Point::new(x, y)));
        self
    }

    pub fn cubic_to(
        &mut self,
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    ) -> &mut Self {
        self.segments.push(Segment::CubicTo(
            Point::new(c1x, c1y),
            Point::new(c2x, c2y),
            Point::new(x, y),
        ));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(Segment::Close);
        self
    }

    /// Axis-aligned rectangle as a closed path.
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        let mut p = Self::new();
        p.move_to(x, y)
            .line_to(x + w, y)
            .line_to(x + w, y + h)
            .line_to(x, y + h)
            .close();
        p
    }
}

/// Elevate a quadratic curve to the equivalent cubic.
///
/// For a quadratic with control `q` between endpoints `p0` and `p1`,
/// the cubic controls are `c1 = p0 + 2/3 (q - p0)` and
/// `c2 = p1 + 2/3 (q - p1)`. The elevation is exact: the cubic traces
/// the same curve.
pub fn elevate_quadratic(p0: Point, q: Point, p1: Point) -> (Point, Point) {
    const TWO_THIRDS: f64 = 2.0 / 3.0;
    let c1 = Point::new(p0.x + TWO_THIRDS * (q.x - p0.x), p0.y + TWO_THIRDS * (q.y - p0.y));
    let c2 = Point::new(p1.x + TWO_THIRDS * (q.x - p1.x), p1.y + TWO_THIRDS * (q.y - p1.y));
    (c1, c2)
}

/// Stroke/fill colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Logical font request: family name, style bits, size.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    pub size_pts: f64,
}

impl FontSpec {
    pub fn plain(family: impl Into<String>, size_pts: f64) -> Self {
        Self {
            family: family.into(),
            bold: false,
            italic: false,
            size_pts,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::plain("dialog", 12.0)
    }
}

/// A positioned text run with its measured natural width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Pen origin (baseline left) in drawing-model space.
    pub x: f64,
    pub y: f64,
    /// Natural advance width of the whole run as measured by the
    /// caller's layout. The backend scales horizontal advance to match.
    pub width: f64,
}

/// One drawing operation.
#[derive(Debug)]
pub enum DrawOp {
    SetColor(Color),
    SetFont(FontSpec),
    /// Compose the six affine coefficients with the current transform.
    SetTransform([f64; 6]),
    SetClip(Path),
    /// Non-uniform user scale, composed with the coordinate flip.
    Scale { sx: f64, sy: f64 },
    Line(Point, Point),
    Rect { x: f64, y: f64, w: f64, h: f64, fill: bool },
    Polyline(Vec<Point>),
    Polygon { points: Vec<Point>, fill: bool },
    Oval { x: f64, y: f64, w: f64, h: f64, fill: bool },
    Arc {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        start_deg: f64,
        extent_deg: f64,
        fill: bool,
    },
    RoundRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        arc_w: f64,
        arc_h: f64,
        fill: bool,
    },
    Shape { path: Path, fill: bool },
    Text(TextRun),
    Image {
        image: RasterImage,
        x: f64,
        y: f64,
        dst_w: f64,
        dst_h: f64,
    },
}

/// Source of paintable pages for vector rendering.
///
/// The backend pulls pages one at a time; `None` ends the document.
pub trait PageSource: Send {
    fn next_page(&mut self) -> Result<Option<Vec<DrawOp>>>;
}

/// A fixed, pre-built sequence of pages.
pub struct StaticPages {
    pages: std::vec::IntoIter<Vec<DrawOp>>,
}

impl StaticPages {
    pub fn new(pages: Vec<Vec<DrawOp>>) -> Self {
        Self {
            pages: pages.into_iter(),
        }
    }
}

impl PageSource for StaticPages {
    fn next_page(&mut self) -> Result<Option<Vec<DrawOp>>> {
        Ok(self.pages.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_elevation_is_exact() {
        let (c1, c2) = elevate_quadratic(
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(2.0, 0.0),
        );
        assert!((c1.x - 0.667).abs() < 1e-3);
        assert!((c1.y - 1.333).abs() < 1e-3);
        assert!((c2.x - 1.333).abs() < 1e-3);
        assert!((c2.y - 1.333).abs() < 1e-3);
    }

    #[test]
    fn elevation_preserves_endpoints_at_parameter_extremes() {
        // The elevated cubic starts at p0 and ends at p1 by construction;
        // check the controls collapse correctly for a degenerate quad.
        let p = Point::new(4.0, 4.0);
        let (c1, c2) = elevate_quadratic(p, p, p);
        assert_eq!(c1, p);
        assert_eq!(c2, p);
    }

    #[test]
    fn rect_path_has_five_segments() {
        let p = Path::rect(0.0, 0.0, 10.0, 5.0);
        assert_eq!(p.segments.len(), 5);
        assert!(matches!(p.segments[4], Segment::Close));
    }
}
