// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The document submission surface: data, format descriptor, and
// presentation attributes. Immutable once a job starts.

use std::io::Read;

use sha2::{Digest, Sha256};

use streampress_core::{Attribute, AttributeCategory, DocFlavor, PrintAttributes};
use streampress_render::PageSource;

/// The payload of a document request.
pub enum DocData {
    /// Fully materialised bytes.
    Bytes(Vec<u8>),
    /// An incrementally readable stream.
    Stream(Box<dyn Read + Send>),
    /// A structured sequence of paintable pages.
    Pages(Box<dyn PageSource + Send>),
}

impl std::fmt::Debug for DocData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Pages(_) => f.write_str("Pages(..)"),
        }
    }
}

/// One document to be printed, with its format and attributes.
#[derive(Debug)]
pub struct DocumentRequest {
    pub data: DocData,
    pub flavor: DocFlavor,
    pub attributes: PrintAttributes,
}

impl DocumentRequest {
    pub fn new(data: DocData, flavor: DocFlavor, attributes: PrintAttributes) -> Self {
        Self {
            data,
            flavor,
            attributes,
        }
    }

    /// Job name from the attribute set, or a fixed placeholder.
    pub fn document_name(&self) -> String {
        match self.attributes.get(AttributeCategory::JobName) {
            Some(Attribute::JobName(name)) => name.clone(),
            _ => "untitled".to_string(),
        }
    }

    /// SHA-256 of the payload, when the data is byte-backed. Streams
    /// and page sources are not consumed to compute a hash.
    pub fn document_hash(&self) -> Option<String> {
        match &self.data {
            DocData::Bytes(bytes) => {
                let digest = Sha256::digest(bytes);
                Some(hex::encode(digest))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streampress_core::DataRepr;

    #[test]
    fn byte_backed_requests_hash() {
        let request = DocumentRequest::new(
            DocData::Bytes(b"abc".to_vec()),
            DocFlavor::new("application/octet-stream", DataRepr::Bytes),
            PrintAttributes::new(),
        );
        assert_eq!(
            request.document_hash().as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn stream_requests_do_not_hash() {
        let request = DocumentRequest::new(
            DocData::Stream(Box::new(std::io::empty())),
            DocFlavor::new("application/octet-stream", DataRepr::Stream),
            PrintAttributes::new(),
        );
        assert!(request.document_hash().is_none());
    }

    #[test]
    fn document_name_from_attributes() {
        let mut attrs = PrintAttributes::new();
        attrs.add(Attribute::JobName("report.ps".into()));
        let request = DocumentRequest::new(
            DocData::Bytes(Vec::new()),
            DocFlavor::new("application/postscript", DataRepr::Bytes),
            attrs,
        );
        assert_eq!(request.document_name(), "report.ps");
    }
}
