// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory ARGB raster, the decoded form every image takes before
// rendering.

use image::DynamicImage;

/// A decoded raster image. Immutable once decode completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major ARGB pixels, one `u32` per pixel.
    pub argb: Vec<u32>,
}

impl RasterImage {
    /// Build from raw ARGB pixels. Panics in debug builds if the buffer
    /// length does not match the dimensions.
    pub fn from_argb(width: u32, height: u32, argb: Vec<u32>) -> Self {
        debug_assert_eq!(argb.len(), (width * height) as usize);
        Self {
            width,
            height,
            argb,
        }
    }

    /// Convert a decoded `DynamicImage` into packed ARGB.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let argb = rgba
            .pixels()
            .map(|p| {
                let image::Rgba([r, g, b, a]) = *p;
                (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect();
        Self {
            width,
            height,
            argb,
        }
    }

    /// RGB triplet at (x, y). Alpha is dropped at the output stage.
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let px = self.argb[(y * self.width + x) as usize];
        ((px >> 16) as u8, (px >> 8) as u8, px as u8)
    }
}
