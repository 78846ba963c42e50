// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Streampress print service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a document's data is represented in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRepr {
    /// A fully materialised byte buffer.
    Bytes,
    /// An incrementally readable byte stream.
    Stream,
    /// A structured sequence of paintable pages.
    Pages,
}

/// Document format descriptor: MIME type plus representation kind.
///
/// Two flavors are equal when both the MIME type and the representation
/// match. The MIME comparison is case-insensitive, as MIME types are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocFlavor {
    pub mime: String,
    pub repr: DataRepr,
}

impl DocFlavor {
    pub fn new(mime: impl Into<String>, repr: DataRepr) -> Self {
        Self {
            mime: mime.into(),
            repr,
        }
    }

    /// Whether this flavor is marked internal-only and must be hidden
    /// from capability listings. Matched case-insensitively on the
    /// `internal` token anywhere in the MIME string.
    pub fn is_internal(&self) -> bool {
        self.mime.to_ascii_lowercase().contains("internal")
    }
}

impl PartialEq for DocFlavor {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr && self.mime.eq_ignore_ascii_case(&other.mime)
    }
}

impl Eq for DocFlavor {}

impl std::fmt::Display for DocFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.mime, self.repr)
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_pts: f64, height_pts: f64 },
}

impl PaperSize {
    /// Dimensions in PostScript points (width, height), portrait.
    pub fn dimensions_pts(&self) -> (f64, f64) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::A3 => (842.0, 1191.0),
            Self::A5 => (420.0, 595.0),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Tabloid => (792.0, 1224.0),
            Self::Custom {
                width_pts,
                height_pts,
            } => (*width_pts, *height_pts),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Categories a presentation attribute can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeCategory {
    Copies,
    MediaSize,
    Orientation,
    Chromaticity,
    JobName,
}

/// A single presentation attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Copies(u32),
    MediaSize(PaperSize),
    Orientation(Orientation),
    /// `true` = colour, `false` = monochrome.
    Chromaticity(bool),
    JobName(String),
}

impl Attribute {
    pub fn category(&self) -> AttributeCategory {
        match self {
            Self::Copies(_) => AttributeCategory::Copies,
            Self::MediaSize(_) => AttributeCategory::MediaSize,
            Self::Orientation(_) => AttributeCategory::Orientation,
            Self::Chromaticity(_) => AttributeCategory::Chromaticity,
            Self::JobName(_) => AttributeCategory::JobName,
        }
    }
}

/// An ordered set of presentation attributes.
///
/// Order is the caller's submission order. At most one attribute per
/// category: the first one set wins and later additions of the same
/// category are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintAttributes {
    entries: Vec<Attribute>,
}

impl PrintAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute. Ignored if its category is already present.
    pub fn add(&mut self, attr: Attribute) -> &mut Self {
        if self.get(attr.category()).is_none() {
            self.entries.push(attr);
        }
        self
    }

    pub fn get(&self, category: AttributeCategory) -> Option<&Attribute> {
        self.entries.iter().find(|a| a.category() == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requested paper size, defaulting to A4.
    pub fn media_size(&self) -> PaperSize {
        match self.get(AttributeCategory::MediaSize) {
            Some(Attribute::MediaSize(p)) => *p,
            _ => PaperSize::A4,
        }
    }

    /// Requested orientation, defaulting to portrait.
    pub fn orientation(&self) -> Orientation {
        match self.get(AttributeCategory::Orientation) {
            Some(Attribute::Orientation(o)) => *o,
            _ => Orientation::Portrait,
        }
    }
}

/// Lifecycle states of a job. A job instance runs at most one print
/// operation; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Busy,
    Done,
    Failed,
}

/// Completion record for one print submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTicket {
    pub id: JobId,
    pub document_name: String,
    /// SHA-256 hash of the document bytes, when the data was byte-backed.
    pub document_hash: Option<String>,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error_message: Option<String>,
}
