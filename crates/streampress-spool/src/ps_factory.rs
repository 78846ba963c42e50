// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The built-in bridging factory: converts paintable page sequences and
// common raster formats into PostScript.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::debug;

use streampress_core::error::{Result, StreampressError};
use streampress_core::{Attribute, AttributeCategory, DataRepr, DocFlavor, SpoolConfig};
use streampress_render::ps::OutlineFont;
use streampress_render::{
    DrawOp, ImageIngest, PageGeometry, PsRenderer, RasterImage, ReaderFeed, StaticPages,
};

use crate::registry::{ConverterFactory, StreamConverter};
use crate::request::{DocData, DocumentRequest};

pub const POSTSCRIPT_MIME: &str = "application/postscript";

/// Produces PostScript converters for page-sequence and raster inputs.
pub struct PsConverterFactory {
    config: SpoolConfig,
    interrupt: Arc<AtomicBool>,
}

impl PsConverterFactory {
    pub fn new(config: SpoolConfig) -> Self {
        Self {
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle used to interrupt in-flight image decodes. An interrupted
    /// decode produces a well-formed zero-page document, not an error.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }
}

impl ConverterFactory for PsConverterFactory {
    fn input_flavors(&self) -> Vec<DocFlavor> {
        let mut flavors = vec![DocFlavor::new("application/x-pages", DataRepr::Pages)];
        for mime in ["image/png", "image/jpeg", "image/gif"] {
            flavors.push(DocFlavor::new(mime, DataRepr::Bytes));
            flavors.push(DocFlavor::new(mime, DataRepr::Stream));
        }
        flavors
    }

    fn output_mime(&self) -> String {
        POSTSCRIPT_MIME.to_string()
    }

    fn make_converter(&self, sink: Box<dyn Write + Send>) -> Result<Box<dyn StreamConverter>> {
        Ok(Box::new(PsStreamConverter {
            sink: Some(sink),
            config: self.config.clone(),
            interrupt: Arc::clone(&self.interrupt),
        }))
    }
}

/// One-shot converter bound to a sink.
struct PsStreamConverter {
    sink: Option<Box<dyn Write + Send>>,
    config: SpoolConfig,
    interrupt: Arc<AtomicBool>,
}

impl StreamConverter for PsStreamConverter {
    fn run(&mut self, request: DocumentRequest) -> Result<()> {
        let sink = self.sink.take().ok_or_else(|| {
            StreampressError::ConversionIo("converter already consumed".to_string())
        })?;

        let geometry = page_geometry(&self.config, &request);
        let mut renderer = PsRenderer::new(sink, geometry);
        if let Some(path) = &self.config.outline_font_path {
            renderer = renderer.with_outline_font(OutlineFont::load(path)?);
        }

        match request.data {
            DocData::Pages(mut source) => renderer.render_document(source.as_mut()),
            DocData::Bytes(bytes) => {
                let raster = ImageIngest::new(&self.config).decode(bytes, &self.interrupt)?;
                render_raster(&mut renderer, geometry, raster)
            }
            DocData::Stream(reader) => {
                let mut feed = ReaderFeed(reader);
                let raster =
                    ImageIngest::new(&self.config).ingest(&mut feed, &self.interrupt)?;
                render_raster(&mut renderer, geometry, raster)
            }
        }
    }
}

/// Page geometry from the request's attributes, falling back to the
/// configured default paper size.
fn page_geometry(config: &SpoolConfig, request: &DocumentRequest) -> PageGeometry {
    let paper = match request.attributes.get(AttributeCategory::MediaSize) {
        Some(Attribute::MediaSize(p)) => *p,
        _ => config.default_paper_size,
    };
    PageGeometry::from_media(paper, request.attributes.orientation())
}

/// One page carrying the raster, fitted into the imageable area without
/// upscaling. A missing raster (interrupted decode) still yields a
/// well-formed document with zero pages.
fn render_raster<W: Write>(
    renderer: &mut PsRenderer<W>,
    geometry: PageGeometry,
    raster: Option<RasterImage>,
) -> Result<()> {
    let Some(raster) = raster else {
        return renderer.render_document(&mut StaticPages::new(Vec::new()));
    };
    let (w, h) = (f64::from(raster.width), f64::from(raster.height));
    if w == 0.0 || h == 0.0 {
        return renderer.render_document(&mut StaticPages::new(Vec::new()));
    }
    let fit = (geometry.imageable_w / w)
        .min(geometry.imageable_h / h)
        .min(1.0);
    debug!(width = raster.width, height = raster.height, fit, "placing raster");
    let op = DrawOp::Image {
        image: raster,
        x: geometry.imageable_x,
        y: geometry.imageable_y,
        dst_w: w * fit,
        dst_h: h * fit,
    };
    renderer.render_document(&mut StaticPages::new(vec![vec![op]]))
}
