// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Converter discovery: match a document format against chains of
// available format converters bridging to a client-native format.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use streampress_core::DocFlavor;
use streampress_core::error::Result;

use crate::request::DocumentRequest;

/// A converter bound to a byte sink. Runs one conversion to
/// completion, writing its output to the sink it was constructed with.
pub trait StreamConverter: Send {
    fn run(&mut self, request: DocumentRequest) -> Result<()>;
}

/// A bridging factory: declares the input formats it accepts and the
/// single output MIME type it produces, and constructs converters
/// bound to a sink.
pub trait ConverterFactory: Send + Sync {
    fn input_flavors(&self) -> Vec<DocFlavor>;

    fn output_mime(&self) -> String;

    fn accepts(&self, flavor: &DocFlavor) -> bool {
        self.input_flavors().iter().any(|f| f == flavor)
    }

    fn make_converter(&self, sink: Box<dyn Write + Send>) -> Result<Box<dyn StreamConverter>>;
}

/// Factory lookup collaborator: yields zero or more factories able to
/// convert `input` into `output_mime`, in discovery order. A `None`
/// input matches factories regardless of their accepted inputs.
pub trait FactoryLookup: Send + Sync {
    fn lookup(&self, input: Option<&DocFlavor>, output_mime: &str)
    -> Vec<Arc<dyn ConverterFactory>>;
}

/// A fixed set of registered factories.
pub struct StaticFactoryLookup {
    factories: Vec<Arc<dyn ConverterFactory>>,
}

impl StaticFactoryLookup {
    pub fn new(factories: Vec<Arc<dyn ConverterFactory>>) -> Self {
        Self { factories }
    }
}

impl FactoryLookup for StaticFactoryLookup {
    fn lookup(
        &self,
        input: Option<&DocFlavor>,
        output_mime: &str,
    ) -> Vec<Arc<dyn ConverterFactory>> {
        self.factories
            .iter()
            .filter(|f| {
                f.output_mime().eq_ignore_ascii_case(output_mime)
                    && input.is_none_or(|i| f.accepts(i))
            })
            .cloned()
            .collect()
    }
}

/// One discovered bridge: the factory plus the client-native flavor it
/// converts toward. Discovered fresh per negotiation, never cached.
pub struct ConverterChain {
    pub factory: Arc<dyn ConverterFactory>,
    pub target: DocFlavor,
}

/// Finds converter chains between a desired input format and the
/// formats an output client natively accepts.
#[derive(Clone)]
pub struct ConverterRegistry {
    lookup: Arc<dyn FactoryLookup>,
}

impl ConverterRegistry {
    pub fn new(lookup: Arc<dyn FactoryLookup>) -> Self {
        Self { lookup }
    }

    /// Every chain bridging `input` to some flavor in
    /// `client_flavors`, ordered by the client's declared flavor order
    /// and, within one target, by factory discovery order.
    pub fn chains_for(&self, input: &DocFlavor, client_flavors: &[DocFlavor]) -> Vec<ConverterChain> {
        let mut chains = Vec::new();
        for target in client_flavors {
            for factory in self.lookup.lookup(Some(input), &target.mime) {
                chains.push(ConverterChain {
                    factory,
                    target: target.clone(),
                });
            }
        }
        debug!(input = %input, chains = chains.len(), "converter negotiation");
        chains
    }

    /// Every factory producing `output_mime`, regardless of input.
    pub fn factories_toward(&self, output_mime: &str) -> Vec<Arc<dyn ConverterFactory>> {
        self.lookup.lookup(None, output_mime)
    }

    /// First usable chain. The tie-break (declared order, then
    /// discovery order, first success) is a convention of this
    /// implementation, not a contract callers may rely on beyond
    /// determinism.
    pub fn first_chain(
        &self,
        input: &DocFlavor,
        client_flavors: &[DocFlavor],
    ) -> Option<ConverterChain> {
        self.chains_for(input, client_flavors).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streampress_core::DataRepr;

    struct NamedFactory {
        name: &'static str,
        input: DocFlavor,
        output: &'static str,
    }

    impl ConverterFactory for NamedFactory {
        fn input_flavors(&self) -> Vec<DocFlavor> {
            vec![self.input.clone()]
        }

        fn output_mime(&self) -> String {
            self.output.to_string()
        }

        fn make_converter(
            &self,
            _sink: Box<dyn Write + Send>,
        ) -> Result<Box<dyn StreamConverter>> {
            struct Noop;
            impl StreamConverter for Noop {
                fn run(&mut self, _request: DocumentRequest) -> Result<()> {
                    Ok(())
                }
            }
            let _ = self.name;
            Ok(Box::new(Noop))
        }
    }

    fn pages_flavor() -> DocFlavor {
        DocFlavor::new("application/x-pages", DataRepr::Pages)
    }

    #[test]
    fn declared_order_wins_over_discovery_order() {
        let input = pages_flavor();
        let lookup = StaticFactoryLookup::new(vec![
            Arc::new(NamedFactory {
                name: "to-pcl",
                input: input.clone(),
                output: "application/vnd.hp-pcl",
            }),
            Arc::new(NamedFactory {
                name: "to-ps",
                input: input.clone(),
                output: "application/postscript",
            }),
        ]);
        let registry = ConverterRegistry::new(Arc::new(lookup));

        let client_flavors = vec![
            DocFlavor::new("application/postscript", DataRepr::Stream),
            DocFlavor::new("application/vnd.hp-pcl", DataRepr::Stream),
        ];
        let chain = registry.first_chain(&input, &client_flavors).expect("chain");
        // PostScript is declared first by the client, so it wins even
        // though the PCL factory was registered first.
        assert_eq!(chain.target.mime, "application/postscript");
    }

    #[test]
    fn no_factory_means_no_chain() {
        let registry = ConverterRegistry::new(Arc::new(StaticFactoryLookup::new(Vec::new())));
        let client_flavors = vec![DocFlavor::new("application/postscript", DataRepr::Stream)];
        assert!(registry.first_chain(&pages_flavor(), &client_flavors).is_none());
    }
}
