// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font name mapping and glyph outlining.
//
// Logical font families resolve to canonical PostScript font names
// through an ordered list of lookup strategies; the last strategy is a
// hardcoded default, so resolution never fails. Characters outside the
// 8-bit text path are converted to filled outlines via ttf-parser.

use streampress_core::error::{Result, StreampressError};

use crate::draw::{FontSpec, Path};

/// Default base font used when no mapping matches at all.
pub const DEFAULT_PS_FONT: &str = "Helvetica";

/// Direct (family, bold, italic) → PostScript name entries. Consulted
/// before the family table so distributions can pin exact variants.
const DIRECT_TABLE: &[(&str, bool, bool, &str)] = &[
    ("lucida bright", false, false, "LucidaBright"),
    ("lucida bright", true, false, "LucidaBright-Demi"),
    ("lucida bright", false, true, "LucidaBright-Italic"),
    ("lucida bright", true, true, "LucidaBright-DemiItalic"),
    ("zapf dingbats", false, false, "ZapfDingbats"),
];

/// Logical family → output-format base family.
const FAMILY_TABLE: &[(&str, &str)] = &[
    ("serif", "Times"),
    ("timesroman", "Times"),
    ("sansserif", "Helvetica"),
    ("dialog", "Helvetica"),
    ("dialoginput", "Courier"),
    ("monospaced", "Courier"),
    ("courier", "Courier"),
    ("symbol", "Symbol"),
];

/// The twelve canonical style variants, keyed (base, bold, italic).
/// Symbol carries no style variants and maps through unchanged.
const VARIANT_TABLE: &[(&str, bool, bool, &str)] = &[
    ("Helvetica", false, false, "Helvetica"),
    ("Helvetica", true, false, "Helvetica-Bold"),
    ("Helvetica", false, true, "Helvetica-Oblique"),
    ("Helvetica", true, true, "Helvetica-BoldOblique"),
    ("Times", false, false, "Times-Roman"),
    ("Times", true, false, "Times-Bold"),
    ("Times", false, true, "Times-Italic"),
    ("Times", true, true, "Times-BoldItalic"),
    ("Courier", false, false, "Courier"),
    ("Courier", true, false, "Courier-Bold"),
    ("Courier", false, true, "Courier-Oblique"),
    ("Courier", true, true, "Courier-BoldOblique"),
];

/// Resolve a logical font request to a PostScript font name.
///
/// Strategies run in order; the first match wins. The final strategy
/// always produces the default base font, so some name is always
/// returned.
pub fn ps_font_name(spec: &FontSpec) -> String {
    let strategies: [fn(&FontSpec) -> Option<String>; 3] =
        [lookup_direct, lookup_family_style, lookup_default];
    strategies
        .iter()
        .find_map(|s| s(spec))
        .unwrap_or_else(|| DEFAULT_PS_FONT.to_string())
}

fn lookup_direct(spec: &FontSpec) -> Option<String> {
    let family = spec.family.to_ascii_lowercase();
    DIRECT_TABLE
        .iter()
        .find(|(f, b, i, _)| *f == family && *b == spec.bold && *i == spec.italic)
        .map(|(_, _, _, name)| (*name).to_string())
}

fn lookup_family_style(spec: &FontSpec) -> Option<String> {
    let family = spec.family.to_ascii_lowercase();
    let base = FAMILY_TABLE
        .iter()
        .find(|(f, _)| *f == family)
        .map(|(_, base)| *base)?;
    if base == "Symbol" {
        return Some("Symbol".to_string());
    }
    VARIANT_TABLE
        .iter()
        .find(|(b, bold, italic, _)| *b == base && *bold == spec.bold && *italic == spec.italic)
        .map(|(_, _, _, name)| (*name).to_string())
}

fn lookup_default(_spec: &FontSpec) -> Option<String> {
    Some(DEFAULT_PS_FONT.to_string())
}

// ---------------------------------------------------------------------------
// Glyph outlining
// ---------------------------------------------------------------------------

/// A loaded TrueType/OpenType face used to outline characters that
/// cannot travel through the 8-bit string path.
pub struct OutlineFont {
    data: Vec<u8>,
}

impl OutlineFont {
    /// Load and validate a font file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    /// Wrap raw font bytes, validating that they parse.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        ttf_parser::Face::parse(&data, 0)
            .map_err(|e| StreampressError::Render(format!("invalid outline font: {e}")))?;
        Ok(Self { data })
    }

    /// Outline `ch` at `size_pts`, positioned with the pen at
    /// (`pen_x`, `pen_y`) in drawing-model coordinates, and return the
    /// filled path plus the advance width in points.
    ///
    /// Returns `None` when the face has no glyph for the character.
    pub fn outline(&self, ch: char, size_pts: f64, pen_x: f64, pen_y: f64) -> Option<(Path, f64)> {
        // Validated in from_bytes; parsing is cheap enough to redo here
        // rather than holding a self-referential Face.
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        let glyph = face.glyph_index(ch)?;
        let scale = size_pts / f64::from(face.units_per_em());

        let mut builder = PathBuilder {
            path: Path::new(),
            scale,
            pen_x,
            pen_y,
        };
        // A glyph with no outline (e.g. space) still advances the pen.
        let _ = face.outline_glyph(glyph, &mut builder);

        let advance = face
            .glyph_hor_advance(glyph)
            .unwrap_or(face.units_per_em() / 2);
        Some((builder.path, f64::from(advance) * scale))
    }

    /// Advance width of `ch` at `size_pts`, without building the path.
    pub fn advance(&self, ch: char, size_pts: f64) -> Option<f64> {
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        let glyph = face.glyph_index(ch)?;
        let scale = size_pts / f64::from(face.units_per_em());
        let advance = face
            .glyph_hor_advance(glyph)
            .unwrap_or(face.units_per_em() / 2);
        Some(f64::from(advance) * scale)
    }
}

/// Builds a drawing-model path from font-unit outlines. Font space is
/// y-up; the drawing model is y-down, so y is negated about the
/// baseline.
struct PathBuilder {
    path: Path,
    scale: f64,
    pen_x: f64,
    pen_y: f64,
}

impl PathBuilder {
    fn map(&self, x: f32, y: f32) -> (f64, f64) {
        (
            self.pen_x + f64::from(x) * self.scale,
            self.pen_y - f64::from(y) * self.scale,
        )
    }
}

impl ttf_parser::OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (cx, cy) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.path.quad_to(cx, cy, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.map(x1, y1);
        let (c2x, c2y) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.path.cubic_to(c1x, c1y, c2x, c2y, x, y);
    }

    fn close(&mut self) {
        self.path.close();
    }
}
