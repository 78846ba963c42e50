// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// streampress-spool — Job orchestration for the Streampress print
// service.
//
// Negotiates converter chains between submitted document formats and
// the formats an output client accepts natively, answers capability
// queries through that bridge, and runs print jobs, pipelining
// conversion and delivery through a bounded pipe when bridging is
// needed.

pub mod capability;
pub mod client;
pub mod job;
pub mod pipe;
pub mod ps_factory;
pub mod registry;
pub mod request;

pub use capability::CapabilityFacade;
pub use client::{ClientJob, OutputClient};
pub use job::SpoolJob;
pub use pipe::{PipeReader, PipeWriter, pipe};
pub use ps_factory::{POSTSCRIPT_MIME, PsConverterFactory};
pub use registry::{
    ConverterChain, ConverterFactory, ConverterRegistry, FactoryLookup, StaticFactoryLookup,
    StreamConverter,
};
pub use request::{DocData, DocumentRequest};
