// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// streampress-render — Rendering backend for the Streampress print
// service.
//
// Translates an abstract 2D drawing model (paths, text, images,
// transforms, clipping) into page-description output text, and turns
// incoming byte streams into decoded rasters for image jobs.

pub mod draw;
pub mod geometry;
pub mod ingest;
pub mod ps;
pub mod raster;

pub use draw::{DrawOp, PageSource, Path, StaticPages};
pub use geometry::PageGeometry;
pub use ingest::{ByteFeed, ImageIngest, ReaderFeed};
pub use ps::{OutlineFont, PsRenderer};
pub use raster::RasterImage;
