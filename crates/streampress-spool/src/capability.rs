// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability facade: answers "is format X supported", "what formats
// are supported", and attribute-capability queries by combining the
// output client's native answers with converter-registry bridges.

use std::sync::Arc;

use tracing::debug;

use streampress_core::error::{Result, StreampressError};
use streampress_core::{Attribute, AttributeCategory, DocFlavor, PrintAttributes};

use crate::client::OutputClient;
use crate::registry::{ConverterChain, ConverterRegistry};

pub struct CapabilityFacade {
    client: Arc<dyn OutputClient>,
    registry: ConverterRegistry,
}

impl CapabilityFacade {
    pub fn new(client: Arc<dyn OutputClient>, registry: ConverterRegistry) -> Self {
        Self { client, registry }
    }

    /// True when the client accepts the flavor natively or some
    /// bridging factory converts it to a client-native flavor.
    pub fn is_flavor_supported(&self, flavor: &DocFlavor) -> bool {
        if self.client.is_flavor_supported(flavor) {
            return true;
        }
        let natives = self.client.supported_flavors();
        self.registry.first_chain(flavor, &natives).is_some()
    }

    /// Union of client-native flavors (internal-only entries hidden)
    /// and every flavor reachable through a bridging factory. On
    /// overlap the client-native entry wins; no duplicates.
    pub fn supported_flavors(&self) -> Vec<DocFlavor> {
        let natives = self.client.supported_flavors();
        let mut out: Vec<DocFlavor> = natives
            .iter()
            .filter(|f| !f.is_internal())
            .cloned()
            .collect();

        for chain in self.bridged_inputs(&natives) {
            if !out.contains(&chain) {
                out.push(chain);
            }
        }
        debug!(count = out.len(), "supported flavors");
        out
    }

    /// Every input flavor some factory can bridge toward a
    /// client-native target, in declared-order then discovery-order.
    fn bridged_inputs(&self, natives: &[DocFlavor]) -> Vec<DocFlavor> {
        let mut inputs = Vec::new();
        for target in natives {
            for factory in self.registry.factories_toward(&target.mime) {
                for input in factory.input_flavors() {
                    if !inputs.contains(&input) {
                        inputs.push(input);
                    }
                }
            }
        }
        inputs
    }

    /// Attribute values supported for `category` when printing
    /// documents of `flavor`. Native flavors delegate directly; bridged
    /// flavors delegate using the bridge target as the flavor context,
    /// because capability values are defined by the client's acceptance
    /// format, not the bridging format.
    pub fn supported_attribute_values(
        &self,
        category: AttributeCategory,
        flavor: Option<&DocFlavor>,
        attrs: &PrintAttributes,
    ) -> Result<Vec<Attribute>> {
        match self.bridge_context(flavor)? {
            None => Ok(self.client.supported_attribute_values(category, flavor, attrs)),
            Some(target) => Ok(self
                .client
                .supported_attribute_values(category, Some(&target), attrs)),
        }
    }

    pub fn is_attribute_value_supported(
        &self,
        value: &Attribute,
        flavor: Option<&DocFlavor>,
        attrs: &PrintAttributes,
    ) -> Result<bool> {
        match self.bridge_context(flavor)? {
            None => Ok(self.client.is_attribute_value_supported(value, flavor, attrs)),
            Some(target) => Ok(self
                .client
                .is_attribute_value_supported(value, Some(&target), attrs)),
        }
    }

    pub fn default_attribute_value(&self, category: AttributeCategory) -> Option<Attribute> {
        self.client.default_attribute_value(category)
    }

    /// Resolve the flavor context for an attribute query.
    ///
    /// `Ok(None)` — delegate with the caller's flavor unchanged (no
    /// flavor given, or the client accepts it natively). `Ok(Some(t))`
    /// — delegate with the bridge target `t`. The chosen factory is
    /// instantiated against a throwaway sink purely to confirm it is
    /// constructible, then discarded.
    fn bridge_context(&self, flavor: Option<&DocFlavor>) -> Result<Option<DocFlavor>> {
        let Some(flavor) = flavor else {
            return Ok(None);
        };
        if self.client.is_flavor_supported(flavor) {
            return Ok(None);
        }
        let natives = self.client.supported_flavors();
        let Some(ConverterChain { factory, target }) = self.registry.first_chain(flavor, &natives)
        else {
            return Err(StreampressError::UnsupportedFormat(flavor.to_string()));
        };
        let probe = factory.make_converter(Box::new(std::io::sink()))?;
        drop(probe);
        Ok(Some(target))
    }
}
