// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The fixed PostScript operator vocabulary the emitter speaks.
//
// Every instruction the backend writes goes through this table so the
// operator spelling lives in exactly one place. `C`, `F`, and `S` are
// the helper procedures defined in the prolog.

/// A PostScript operator or prolog helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsOp {
    Newpath,
    Moveto,
    Lineto,
    Curveto,
    Closepath,
    Fill,
    Stroke,
    Clip,
    Gsave,
    Grestore,
    Showpage,
    Concat,
    Translate,
    Scale,
    Arc,
    Arcn,
    /// RGB colour set helper: `r g b C`.
    SetRgb,
    /// Font select-and-scale helper: `/Name size F`.
    SelectFont,
    /// Width-scaled string show helper: `(str) width x y S`.
    Show,
}

impl PsOp {
    /// Token text as it appears in the output stream.
    pub fn token(self) -> &'static str {
        match self {
            Self::Newpath => "newpath",
            Self::Moveto => "moveto",
            Self::Lineto => "lineto",
            Self::Curveto => "curveto",
            Self::Closepath => "closepath",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::Clip => "clip",
            Self::Gsave => "gsave",
            Self::Grestore => "grestore",
            Self::Showpage => "showpage",
            Self::Concat => "concat",
            Self::Translate => "translate",
            Self::Scale => "scale",
            Self::Arc => "arc",
            Self::Arcn => "arcn",
            Self::SetRgb => "C",
            Self::SelectFont => "F",
            Self::Show => "S",
        }
    }
}

/// Format a coordinate or matrix coefficient for the output stream:
/// up to four decimals, trailing zeros trimmed.
pub fn num(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" || s == "-0" {
        "0".into()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_tokens_match_prolog_names() {
        assert_eq!(PsOp::SetRgb.token(), "C");
        assert_eq!(PsOp::SelectFont.token(), "F");
        assert_eq!(PsOp::Show.token(), "S");
    }

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(-0.0), "0");
        assert_eq!(num(1.23456), "1.2346");
    }
}
