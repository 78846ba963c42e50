// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry: paper extent and imageable area in PostScript points.

use streampress_core::{Orientation, PaperSize};

/// Default imageable margin on each edge (half an inch).
const DEFAULT_MARGIN_PTS: f64 = 36.0;

/// Paper size, orientation, and imageable area for one job.
///
/// Derived once per job from the requested media attributes and
/// immutable for the job's duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pts: f64,
    pub height_pts: f64,
    pub imageable_x: f64,
    pub imageable_y: f64,
    pub imageable_w: f64,
    pub imageable_h: f64,
}

impl PageGeometry {
    /// Derive geometry from a paper size and orientation with the
    /// default margins. Landscape swaps the paper axes.
    pub fn from_media(paper: PaperSize, orientation: Orientation) -> Self {
        let (pw, ph) = paper.dimensions_pts();
        let (width_pts, height_pts) = match orientation {
            Orientation::Portrait => (pw, ph),
            Orientation::Landscape => (ph, pw),
        };
        Self {
            width_pts,
            height_pts,
            imageable_x: DEFAULT_MARGIN_PTS,
            imageable_y: DEFAULT_MARGIN_PTS,
            imageable_w: width_pts - 2.0 * DEFAULT_MARGIN_PTS,
            imageable_h: height_pts - 2.0 * DEFAULT_MARGIN_PTS,
        }
    }

    /// Geometry with explicit imageable bounds.
    pub fn with_imageable(mut self, x: f64, y: f64, w: f64, h: f64) -> Self {
        self.imageable_x = x;
        self.imageable_y = y;
        self.imageable_w = w;
        self.imageable_h = h;
        self
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::from_media(PaperSize::A4, Orientation::Portrait)
    }
}
