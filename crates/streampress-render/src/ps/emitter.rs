// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PostScript emitter: turns the abstract drawing model into literal
// page-description text, one page at a time.
//
// The drawing model's origin is top-left with y increasing downward;
// PostScript's is bottom-left with y increasing upward. Every emitted
// y-coordinate goes through `out_y`, and `y_scale` accumulates the
// inverse of user vertical scales so repeated scaling composes with
// the flip.

use std::io::Write;

use chrono::Utc;
use tracing::{debug, instrument};

use streampress_core::error::Result;

use crate::draw::{
    Color, DrawOp, FontSpec, PageSource, Path, Point, Segment, TextRun, elevate_quadratic,
};
use crate::geometry::PageGeometry;
use crate::raster::RasterImage;

use super::fonts::{OutlineFont, ps_font_name};
use super::ops::{PsOp, num};

/// Hex image rows wrap after this many RGB triplets.
const HEX_TRIPLETS_PER_LINE: usize = 30;

/// Default point size installed at the start of every page.
const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Mutable rendering state, reset at the start of every page.
#[derive(Debug, Clone)]
struct GraphicsState {
    color: Color,
    font: FontSpec,
    y_scale: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            font: FontSpec::default(),
            y_scale: 1.0,
        }
    }
}

/// The rendering backend. Owns the output sink for the duration of one
/// rendering session.
pub struct PsRenderer<W: Write> {
    sink: W,
    geometry: PageGeometry,
    outline_font: Option<OutlineFont>,
    state: GraphicsState,
}

impl<W: Write> PsRenderer<W> {
    pub fn new(sink: W, geometry: PageGeometry) -> Self {
        Self {
            sink,
            geometry,
            outline_font: None,
            state: GraphicsState::default(),
        }
    }

    /// Attach a face used to outline characters outside the 8-bit text
    /// path. Without one, such runs fall back to the show operator.
    pub fn with_outline_font(mut self, font: OutlineFont) -> Self {
        self.outline_font = Some(font);
        self
    }

    /// Flip a drawing-model y-coordinate into output space.
    fn out_y(&self, y: f64) -> f64 {
        self.geometry.height_pts * self.state.y_scale - y
    }

    // -- Page lifecycle -------------------------------------------------------

    /// Emit the fixed prolog: header comments plus the three helper
    /// procedures (width-scaled show, RGB set, font select-and-scale).
    pub fn open(&mut self) -> Result<()> {
        writeln!(self.sink, "%!PS-Adobe-3.0")?;
        writeln!(
            self.sink,
            "%%Creator: streampress {}",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(
            self.sink,
            "%%CreationDate: {}",
            Utc::now().format("%a %b %e %H:%M:%S %Y")
        )?;
        writeln!(self.sink, "%%EndComments")?;
        writeln!(self.sink, "%%BeginProlog")?;
        writeln!(self.sink, "/C {{setrgbcolor}} def")?;
        writeln!(self.sink, "/F {{exch findfont exch scalefont setfont}} def")?;
        writeln!(
            self.sink,
            "/S {{moveto 1 index stringwidth pop div gsave 1 scale show grestore}} def"
        )?;
        writeln!(self.sink, "%%EndProlog")?;
        Ok(())
    }

    /// Emit a page-boundary marker and install the default graphics
    /// state: identity transform, imageable-area clip, black, default
    /// font.
    pub fn start_page(&mut self, n: u32) -> Result<()> {
        self.state = GraphicsState::default();
        writeln!(self.sink, "%%Page: {n} {n}")?;
        writeln!(self.sink, "{}", PsOp::Gsave.token())?;

        let g = self.geometry;
        let clip = Path::rect(g.imageable_x, g.imageable_y, g.imageable_w, g.imageable_h);
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_path(&clip)?;
        writeln!(self.sink, "{}", PsOp::Clip.token())?;
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;

        self.emit_color(Color::BLACK)?;
        let font = FontSpec::default();
        writeln!(
            self.sink,
            "/{} {} {}",
            ps_font_name(&font),
            num(DEFAULT_FONT_SIZE),
            PsOp::SelectFont.token()
        )?;
        Ok(())
    }

    /// Flush the page to the device and close its boundary marker.
    pub fn end_page(&mut self, n: u32) -> Result<()> {
        writeln!(self.sink, "{}", PsOp::Grestore.token())?;
        writeln!(self.sink, "{}", PsOp::Showpage.token())?;
        writeln!(self.sink, "%%EndPage: {n} {n}")?;
        Ok(())
    }

    /// Emit the fixed epilog and flush the sink.
    pub fn close(&mut self) -> Result<()> {
        writeln!(self.sink, "%%Trailer")?;
        writeln!(self.sink, "%%EOF")?;
        self.sink.flush()?;
        Ok(())
    }

    /// Render a whole document: prolog, every page the source yields,
    /// epilog. The epilog is emitted on the error path too, so the
    /// output stream is always terminated.
    #[instrument(skip_all)]
    pub fn render_document(&mut self, source: &mut dyn PageSource) -> Result<()> {
        self.open()?;
        let outcome = self.render_pages(source);
        self.close()?;
        outcome
    }

    fn render_pages(&mut self, source: &mut dyn PageSource) -> Result<()> {
        let mut n = 1u32;
        while let Some(ops) = source.next_page()? {
            debug!(page = n, ops = ops.len(), "rendering page");
            self.start_page(n)?;
            for op in ops {
                self.apply(op)?;
            }
            self.end_page(n)?;
            n += 1;
        }
        Ok(())
    }

    // -- Operation dispatch ---------------------------------------------------

    /// Apply one drawing operation.
    pub fn apply(&mut self, op: DrawOp) -> Result<()> {
        match op {
            DrawOp::SetColor(c) => self.emit_color(c),
            DrawOp::SetFont(f) => self.emit_font(f),
            DrawOp::SetTransform(m) => self.emit_concat(m),
            DrawOp::SetClip(path) => self.emit_clip(&path),
            DrawOp::Scale { sx, sy } => self.emit_scale(sx, sy),
            DrawOp::Line(a, b) => self.draw_line(a, b),
            DrawOp::Rect { x, y, w, h, fill } => self.draw_rect(x, y, w, h, fill),
            DrawOp::Polyline(pts) => self.draw_poly(&pts, false, false),
            DrawOp::Polygon { points, fill } => self.draw_poly(&points, true, fill),
            DrawOp::Oval { x, y, w, h, fill } => self.draw_oval(x, y, w, h, fill),
            DrawOp::Arc {
                x,
                y,
                w,
                h,
                start_deg,
                extent_deg,
                fill,
            } => self.draw_arc(x, y, w, h, start_deg, extent_deg, fill),
            DrawOp::RoundRect {
                x,
                y,
                w,
                h,
                arc_w,
                arc_h,
                fill,
            } => self.draw_round_rect(x, y, w, h, arc_w, arc_h, fill),
            DrawOp::Shape { path, fill } => self.draw_shape(&path, fill),
            DrawOp::Text(run) => self.draw_text(&run),
            DrawOp::Image {
                image,
                x,
                y,
                dst_w,
                dst_h,
            } => self.draw_image(&image, x, y, dst_w, dst_h),
        }
    }

    // -- State ----------------------------------------------------------------

    fn emit_color(&mut self, c: Color) -> Result<()> {
        writeln!(
            self.sink,
            "{} {} {} {}",
            num(f64::from(c.r) / 255.0),
            num(f64::from(c.g) / 255.0),
            num(f64::from(c.b) / 255.0),
            PsOp::SetRgb.token()
        )?;
        self.state.color = c;
        Ok(())
    }

    fn emit_font(&mut self, f: FontSpec) -> Result<()> {
        writeln!(
            self.sink,
            "/{} {} {}",
            ps_font_name(&f),
            num(f.size_pts),
            PsOp::SelectFont.token()
        )?;
        self.state.font = f;
        Ok(())
    }

    /// Compose the six affine coefficients with the ambient transform.
    fn emit_concat(&mut self, m: [f64; 6]) -> Result<()> {
        writeln!(
            self.sink,
            "[{} {} {} {} {} {}] {}",
            num(m[0]),
            num(m[1]),
            num(m[2]),
            num(m[3]),
            num(m[4]),
            num(m[5]),
            PsOp::Concat.token()
        )?;
        Ok(())
    }

    /// User scale. `y_scale` accumulates the inverse of the vertical
    /// factor so the coordinate flip stays correct after composition.
    fn emit_scale(&mut self, sx: f64, sy: f64) -> Result<()> {
        writeln!(
            self.sink,
            "{} {} {}",
            num(sx),
            num(sy),
            PsOp::Scale.token()
        )?;
        if sy != 0.0 {
            self.state.y_scale /= sy;
        }
        Ok(())
    }

    fn emit_clip(&mut self, path: &Path) -> Result<()> {
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_path(path)?;
        writeln!(self.sink, "{}", PsOp::Clip.token())?;
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        Ok(())
    }

    // -- Path construction ----------------------------------------------------

    /// Emit a path's construction sequence. Quadratic segments are
    /// elevated to cubics exactly, not approximated by subdivision.
    fn emit_path(&mut self, path: &Path) -> Result<()> {
        // Current point in model space, needed as the quadratic start.
        let mut current = Point::new(0.0, 0.0);
        let mut start = current;
        for seg in &path.segments {
            match *seg {
                Segment::MoveTo(p) => {
                    self.emit_moveto(p)?;
                    current = p;
                    start = p;
                }
                Segment::LineTo(p) => {
                    self.emit_lineto(p)?;
                    current = p;
                }
                Segment::QuadTo(q, p1) => {
                    let (c1, c2) = elevate_quadratic(current, q, p1);
                    self.emit_curveto(c1, c2, p1)?;
                    current = p1;
                }
                Segment::CubicTo(c1, c2, p1) => {
                    self.emit_curveto(c1, c2, p1)?;
                    current = p1;
                }
                Segment::Close => {
                    writeln!(self.sink, "{}", PsOp::Closepath.token())?;
                    current = start;
                }
            }
        }
        Ok(())
    }

    fn emit_moveto(&mut self, p: Point) -> Result<()> {
        writeln!(
            self.sink,
            "{} {} {}",
            num(p.x),
            num(self.out_y(p.y)),
            PsOp::Moveto.token()
        )?;
        Ok(())
    }

    fn emit_lineto(&mut self, p: Point) -> Result<()> {
        writeln!(
            self.sink,
            "{} {} {}",
            num(p.x),
            num(self.out_y(p.y)),
            PsOp::Lineto.token()
        )?;
        Ok(())
    }

    fn emit_curveto(&mut self, c1: Point, c2: Point, p: Point) -> Result<()> {
        writeln!(
            self.sink,
            "{} {} {} {} {} {} {}",
            num(c1.x),
            num(self.out_y(c1.y)),
            num(c2.x),
            num(self.out_y(c2.y)),
            num(p.x),
            num(self.out_y(p.y)),
            PsOp::Curveto.token()
        )?;
        Ok(())
    }

    fn paint(&mut self, fill: bool) -> Result<()> {
        let op = if fill { PsOp::Fill } else { PsOp::Stroke };
        writeln!(self.sink, "{}", op.token())?;
        Ok(())
    }

    // -- Primitives -----------------------------------------------------------

    fn draw_line(&mut self, a: Point, b: Point) -> Result<()> {
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_moveto(a)?;
        self.emit_lineto(b)?;
        self.paint(false)
    }

    /// Rectangles are 4-point polylines.
    fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: bool) -> Result<()> {
        let points = vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ];
        self.draw_poly(&points, true, fill)
    }

    /// Polylines and polygons: move, a run of line segments, optional
    /// close, then stroke or fill.
    fn draw_poly(&mut self, points: &[Point], closed: bool, fill: bool) -> Result<()> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_moveto(*first)?;
        for p in rest {
            self.emit_lineto(*p)?;
        }
        if closed {
            writeln!(self.sink, "{}", PsOp::Closepath.token())?;
        }
        self.paint(fill)
    }

    fn draw_oval(&mut self, x: f64, y: f64, w: f64, h: f64, fill: bool) -> Result<()> {
        let (rx, ry) = (w / 2.0, h / 2.0);
        let (cx, cy) = (x + rx, y + ry);
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.scaled_arc(cx, cy, rx, ry, 0.0, 360.0)?;
        writeln!(self.sink, "{}", PsOp::Closepath.token())?;
        self.paint(fill)
    }

    fn draw_arc(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        start_deg: f64,
        extent_deg: f64,
        fill: bool,
    ) -> Result<()> {
        let (rx, ry) = (w / 2.0, h / 2.0);
        let (cx, cy) = (x + rx, y + ry);
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        if fill {
            // Pie wedge: start the subpath at the centre.
            self.emit_moveto(Point::new(cx, cy))?;
        }
        self.scaled_arc(cx, cy, rx, ry, start_deg, start_deg + extent_deg)?;
        if fill {
            writeln!(self.sink, "{}", PsOp::Closepath.token())?;
        }
        self.paint(fill)
    }

    fn draw_round_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        arc_w: f64,
        arc_h: f64,
        fill: bool,
    ) -> Result<()> {
        let rx = (arc_w / 2.0).min(w / 2.0);
        let ry = (arc_h / 2.0).min(h / 2.0);
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_moveto(Point::new(x + rx, y))?;
        self.emit_lineto(Point::new(x + w - rx, y))?;
        self.scaled_arc(x + w - rx, y + ry, rx, ry, -90.0, 0.0)?;
        self.emit_lineto(Point::new(x + w, y + h - ry))?;
        self.scaled_arc(x + w - rx, y + h - ry, rx, ry, 0.0, 90.0)?;
        self.emit_lineto(Point::new(x + rx, y + h))?;
        self.scaled_arc(x + rx, y + h - ry, rx, ry, 90.0, 180.0)?;
        self.emit_lineto(Point::new(x, y + ry))?;
        self.scaled_arc(x + rx, y + ry, rx, ry, 180.0, 270.0)?;
        writeln!(self.sink, "{}", PsOp::Closepath.token())?;
        self.paint(fill)
    }

    /// Append an elliptical arc via the scale trick: scale the
    /// coordinate system by the radius ratio, draw a circular arc with
    /// the smaller radius, then re-apply the inverse scale so the
    /// ambient transform is untouched.
    ///
    /// Model angles are measured from the +x axis with y downward;
    /// a growing model angle is a shrinking output angle, hence `arcn`
    /// for positive sweeps.
    fn scaled_arc(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, a0: f64, a1: f64) -> Result<()> {
        let ty = self.out_y(cy);
        let (arc_op, o0, o1) = if a1 >= a0 {
            (PsOp::Arcn, -a0, -a1)
        } else {
            (PsOp::Arc, -a0, -a1)
        };

        let eps = 1e-9;
        if (rx - ry).abs() < eps {
            writeln!(
                self.sink,
                "{} {} {} {} {} {}",
                num(cx),
                num(ty),
                num(rx),
                num(o0),
                num(o1),
                arc_op.token()
            )?;
            return Ok(());
        }

        // Scale the longer axis down to the shorter radius.
        let (sx, sy, acx, acy, r) = if rx > ry {
            let s = rx / ry;
            (s, 1.0, cx / s, ty, ry)
        } else {
            let s = ry / rx;
            (1.0, s, cx, ty / s, rx)
        };
        writeln!(self.sink, "{} {} {}", num(sx), num(sy), PsOp::Scale.token())?;
        writeln!(
            self.sink,
            "{} {} {} {} {} {}",
            num(acx),
            num(acy),
            num(r),
            num(o0),
            num(o1),
            arc_op.token()
        )?;
        writeln!(
            self.sink,
            "{} {} {}",
            num(1.0 / sx),
            num(1.0 / sy),
            PsOp::Scale.token()
        )?;
        Ok(())
    }

    fn draw_shape(&mut self, path: &Path, fill: bool) -> Result<()> {
        writeln!(self.sink, "{}", PsOp::Newpath.token())?;
        self.emit_path(path)?;
        self.paint(fill)
    }

    // -- Text -----------------------------------------------------------------

    /// Draw a text run. Characters representable in 8 bits travel
    /// through the width-scaled show operator; wider characters are
    /// filled as glyph outlines. Mixed runs concatenate left-to-right.
    fn draw_text(&mut self, run: &TextRun) -> Result<()> {
        let has_wide = run.text.chars().any(|c| c as u32 > 0xFF);
        if !has_wide || self.outline_font.is_none() {
            // No outline face for the wide run: placement stays correct
            // through the show operator even though glyph shapes may
            // substitute. Deliberate soft path, see DESIGN notes.
            return self.emit_show(&run.text, run.width, run.x, run.y);
        }

        let size = self.state.font.size_pts;
        let chunks = partition_run(&run.text);

        // Apportion the measured run width: wide glyphs take their
        // face-measured advance, narrow chunks share the remainder in
        // proportion to character count.
        let mut wide_sum = 0.0;
        let mut narrow_chars = 0usize;
        for (wide, text) in &chunks {
            if *wide {
                for ch in text.chars() {
                    wide_sum += self.wide_advance(ch, size);
                }
            } else {
                narrow_chars += text.chars().count();
            }
        }
        let narrow_total = (run.width - wide_sum).max(0.0);

        let mut pen_x = run.x;
        for (wide, text) in &chunks {
            if *wide {
                for ch in text.chars() {
                    pen_x += self.fill_glyph(ch, size, pen_x, run.y)?;
                }
            } else {
                let count = text.chars().count();
                let width = if narrow_chars == 0 {
                    0.0
                } else {
                    narrow_total * count as f64 / narrow_chars as f64
                };
                self.emit_show(text, width, pen_x, run.y)?;
                pen_x += width;
            }
        }
        Ok(())
    }

    fn wide_advance(&self, ch: char, size: f64) -> f64 {
        self.outline_font
            .as_ref()
            .and_then(|f| f.advance(ch, size))
            .unwrap_or(size / 2.0)
    }

    /// Fill one glyph outline at the pen position; returns the advance.
    fn fill_glyph(&mut self, ch: char, size: f64, pen_x: f64, pen_y: f64) -> Result<f64> {
        let outlined = self
            .outline_font
            .as_ref()
            .and_then(|f| f.outline(ch, size, pen_x, pen_y));
        match outlined {
            Some((path, advance)) => {
                if !path.segments.is_empty() {
                    writeln!(self.sink, "{}", PsOp::Newpath.token())?;
                    self.emit_path(&path)?;
                    self.paint(true)?;
                }
                Ok(advance)
            }
            None => Ok(size / 2.0),
        }
    }

    fn emit_show(&mut self, text: &str, width: f64, x: f64, y: f64) -> Result<()> {
        writeln!(
            self.sink,
            "({}) {} {} {} {}",
            escape_ps_string(text),
            num(width),
            num(x),
            num(self.out_y(y)),
            PsOp::Show.token()
        )?;
        Ok(())
    }

    // -- Images ---------------------------------------------------------------

    /// Emit a raster as inline ASCII-hex RGB triplets. When the
    /// destination size differs from the source, the block is wrapped
    /// in a scale whose inverse is re-applied afterward so the ambient
    /// transform is not corrupted.
    fn draw_image(
        &mut self,
        image: &RasterImage,
        x: f64,
        y: f64,
        dst_w: f64,
        dst_h: f64,
    ) -> Result<()> {
        let (sw, sh) = (f64::from(image.width), f64::from(image.height));
        if sw == 0.0 || sh == 0.0 {
            return Ok(());
        }
        let (sx, sy) = (dst_w / sw, dst_h / sh);
        let scaled = (sx - 1.0).abs() > 1e-9 || (sy - 1.0).abs() > 1e-9;
        let ty = self.out_y(y);

        writeln!(
            self.sink,
            "{} {} {}",
            num(x),
            num(ty),
            PsOp::Translate.token()
        )?;
        if scaled {
            writeln!(self.sink, "{} {} {}", num(sx), num(sy), PsOp::Scale.token())?;
        }

        writeln!(self.sink, "/imgstr {} string def", image.width as usize * 3)?;
        writeln!(
            self.sink,
            "{} {} 8 [1 0 0 -1 0 1]",
            image.width, image.height
        )?;
        writeln!(self.sink, "{{currentfile imgstr readhexstring pop}}")?;
        writeln!(self.sink, "false 3 colorimage")?;
        self.sink.write_all(encode_hex(image).as_bytes())?;

        if scaled {
            writeln!(
                self.sink,
                "{} {} {}",
                num(1.0 / sx),
                num(1.0 / sy),
                PsOp::Scale.token()
            )?;
        }
        writeln!(
            self.sink,
            "{} {} {}",
            num(-x),
            num(-ty),
            PsOp::Translate.token()
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Encode a raster's pixels as uppercase hex RGB triplets, wrapping to
/// a new line after every 30 accumulated triplets regardless of row
/// boundaries.
pub fn encode_hex(image: &RasterImage) -> String {
    let mut out = String::with_capacity(hex_capacity(image.width, image.height));
    let mut triplets = 0usize;
    for y in 0..image.height {
        for x in 0..image.width {
            let (r, g, b) = image.rgb_at(x, y);
            out.push_str(&format!("{r:02X}{g:02X}{b:02X}"));
            triplets += 1;
            if triplets % HEX_TRIPLETS_PER_LINE == 0 {
                out.push('\n');
            }
        }
    }
    if triplets % HEX_TRIPLETS_PER_LINE != 0 {
        out.push('\n');
    }
    out
}

/// Hex output size for a raster, computed in usize so dimensions whose
/// pixel-count product exceeds `u32` do not overflow.
fn hex_capacity(width: u32, height: u32) -> usize {
    width as usize * height as usize * 6 + 16
}

/// Split a run into maximal chunks of narrow (8-bit representable) and
/// wide characters, in order.
fn partition_run(text: &str) -> Vec<(bool, String)> {
    let mut chunks: Vec<(bool, String)> = Vec::new();
    for ch in text.chars() {
        let wide = ch as u32 > 0xFF;
        match chunks.last_mut() {
            Some((w, chunk)) if *w == wide => chunk.push(ch),
            _ => chunks.push((wide, ch.to_string())),
        }
    }
    chunks
}

/// Escape a string for a PostScript literal. Parentheses and the
/// backslash get escaped; characters outside the printable ASCII range
/// are emitted as octal escapes of their 8-bit value.
pub fn escape_ps_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        match ch {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            _ if (0x20..0x7F).contains(&code) => out.push(ch),
            _ => out.push_str(&format!("\\{:03o}", code & 0xFF)),
        }
    }
    out
}
