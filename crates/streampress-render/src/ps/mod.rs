// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PostScript emission: operator vocabulary, font mapping, and the
// page emitter.

pub mod emitter;
pub mod fonts;
pub mod ops;

pub use emitter::PsRenderer;
pub use fonts::{OutlineFont, ps_font_name};
