// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The output client: the ultimate consumer of rendered output,
// together with its declared natively-accepted formats and attribute
// capabilities. External collaborator; the core only queries it.

use streampress_core::error::Result;
use streampress_core::{Attribute, AttributeCategory, DocFlavor, PrintAttributes};

use crate::request::DocumentRequest;

/// One delivery to the client. Obtained per submission via
/// `OutputClient::create_job`.
pub trait ClientJob: Send {
    /// Consume the request and deliver it to the device or sink.
    fn print(&mut self, request: &mut DocumentRequest) -> Result<()>;
}

/// The output client's capability and submission surface.
pub trait OutputClient: Send + Sync {
    /// Natively accepted formats, in declared preference order.
    fn supported_flavors(&self) -> Vec<DocFlavor>;

    fn is_flavor_supported(&self, flavor: &DocFlavor) -> bool {
        self.supported_flavors().iter().any(|f| f == flavor)
    }

    fn supported_attribute_categories(&self) -> Vec<AttributeCategory>;

    fn default_attribute_value(&self, category: AttributeCategory) -> Option<Attribute>;

    /// Attribute values the client supports for `category`, in the
    /// context of a flavor and the attributes already chosen.
    fn supported_attribute_values(
        &self,
        category: AttributeCategory,
        flavor: Option<&DocFlavor>,
        attrs: &PrintAttributes,
    ) -> Vec<Attribute>;

    fn is_attribute_value_supported(
        &self,
        value: &Attribute,
        flavor: Option<&DocFlavor>,
        attrs: &PrintAttributes,
    ) -> bool {
        self.supported_attribute_values(value.category(), flavor, attrs)
            .iter()
            .any(|v| v == value)
    }

    /// Create a job bound to this client for one print operation.
    fn create_job(&self) -> Box<dyn ClientJob>;
}
