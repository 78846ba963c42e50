// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Streampress.

use thiserror::Error;

/// Top-level error type for all Streampress operations.
#[derive(Debug, Error)]
pub enum StreampressError {
    // -- Negotiation errors --
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("no converter available from {from} to any client-native format")]
    NoConverterAvailable { from: String },

    // -- Job errors --
    #[error("a print operation is already active on this job")]
    JobAlreadyActive,

    #[error("conversion I/O failure: {0}")]
    ConversionIo(String),

    // -- Rendering / document errors --
    #[error("malformed image data: {0}")]
    MalformedImageData(String),

    #[error("rendering failed: {0}")]
    Render(String),

    // -- Ambient --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StreampressError>;
