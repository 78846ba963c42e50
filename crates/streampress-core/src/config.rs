// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the spooler and rendering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Default paper size when a job carries no media-size attribute.
    pub default_paper_size: crate::PaperSize,
    /// Window of the bounded pipe between the converter task and the
    /// output client, in bytes. Small enough to force the two sides to
    /// run concurrently.
    pub pipe_window_bytes: usize,
    /// Read chunk size used by image ingest.
    pub ingest_chunk_bytes: usize,
    /// Interval between decode-completion polls, in milliseconds.
    pub decode_poll_interval_ms: u64,
    /// Optional TrueType/OpenType font file used to outline characters
    /// that fall outside the 8-bit text path.
    pub outline_font_path: Option<std::path::PathBuf>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            default_paper_size: crate::PaperSize::A4,
            pipe_window_bytes: 4096,
            ingest_chunk_bytes: 4096,
            decode_poll_interval_ms: 10,
            outline_font_path: None,
        }
    }
}
