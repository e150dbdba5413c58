//! Registry assembler
//!
//! One registry per input module carrying a marker's attribute. Bindings are
//! computed here, once, from assignability between the produced and accepted
//! types; the patchers only replay them.

use crate::{AcceptorParser, ComponentDiscoverer, MetadataIndex, ProducerParser};
use registrar_bytecode::ModuleFile;
use registrar_core::{
    AcceptorDescriptor, Binding, Component, ErrorReporter, Marker, ProducerDescriptor,
    RegistrarError, RegistrarResult, Registry,
};
use std::sync::Arc;

/// Builds registries from markers and discovered components.
#[derive(Debug)]
pub struct RegistryAssembler<'a> {
    index: &'a MetadataIndex,
    discoverer: &'a ComponentDiscoverer<'a>,
    reporter: &'a ErrorReporter,
    producers: ProducerParser,
    acceptors: AcceptorParser,
}

impl<'a> RegistryAssembler<'a> {
    pub fn new(
        index: &'a MetadataIndex,
        discoverer: &'a ComponentDiscoverer<'a>,
        reporter: &'a ErrorReporter,
    ) -> Self {
        Self {
            index,
            discoverer,
            reporter,
            producers: ProducerParser,
            acceptors: AcceptorParser,
        }
    }

    /// Registries for every marker, grouped by marker, carriers in scan order.
    pub fn assemble(&self, markers: &[Arc<Marker>]) -> Vec<Registry> {
        let mut registries = Vec::new();
        for marker in markers {
            let carriers = self
                .index
                .carriers_of(marker.attribute.as_str())
                .filter(|name| self.index.is_input(name.as_str()))
                .filter_map(|name| self.index.module(name.as_str()));
            for carrier in carriers {
                if let Some(registry) = self.reporter.capture(self.registry(marker, carrier)) {
                    registries.push(registry);
                }
            }
        }
        tracing::info!(registries = registries.len(), "Registries assembled");
        registries
    }

    fn registry(&self, marker: &Arc<Marker>, module: &ModuleFile) -> RegistrarResult<Registry> {
        let dispatch = self.acceptors.parse_dispatch(module, &marker.attribute)?;
        let supply = self.producers.parse_supply(module, &marker.attribute)?;
        if dispatch.is_none() && supply.is_none() {
            return Err(RegistrarError::metadata(
                &module.name,
                format!("carries {} but declares no dispatch or supply entry point", marker.attribute),
            ));
        }

        let components = self.discoverer.discover(marker);
        let mut bindings = Vec::with_capacity(components.len());
        for (i, component) in components.iter().enumerate() {
            let binding = self.bind(i, component, dispatch.as_ref(), supply.as_ref());
            if binding.produce || binding.accept {
                bindings.push(binding);
            } else {
                tracing::warn!(
                    registry = %module.name,
                    component = %component.module,
                    reason = %incompatibility(component, dispatch.as_ref(), supply.as_ref()),
                    "Component not wired"
                );
            }
        }

        tracing::debug!(
            registry = %module.name,
            marker = %marker.attribute,
            components = components.len(),
            wired = bindings.len(),
            "Registry assembled"
        );
        Ok(Registry {
            module: module.name.clone(),
            marker: Arc::clone(marker),
            components,
            dispatch,
            supply,
            bindings,
        })
    }

    fn bind(
        &self,
        index: usize,
        component: &Component,
        dispatch: Option<&AcceptorDescriptor>,
        supply: Option<&ProducerDescriptor>,
    ) -> Binding {
        let produce = match (&component.producer, dispatch) {
            (Some(producer), Some(dispatch)) => {
                self.index.is_assignable(&producer.produces(), &dispatch.accepts)
            }
            _ => false,
        };
        let accept = match (&component.acceptor, supply) {
            (Some(acceptor), Some(supply)) => {
                self.index.is_assignable(&supply.produces(), &acceptor.accepts)
            }
            _ => false,
        };
        Binding {
            component: index,
            produce,
            accept,
        }
    }
}

fn incompatibility(
    component: &Component,
    dispatch: Option<&AcceptorDescriptor>,
    supply: Option<&ProducerDescriptor>,
) -> String {
    let mut reasons = Vec::new();
    match (&component.producer, dispatch) {
        (Some(p), Some(d)) => reasons.push(format!(
            "produces {} which is not assignable to {}",
            p.produces(),
            d.accepts
        )),
        (Some(_), None) => reasons.push("produces but the registry has no dispatch entry point".to_string()),
        _ => {}
    }
    match (&component.acceptor, supply) {
        (Some(a), Some(s)) => reasons.push(format!(
            "accepts {} but the registry supplies {}",
            a.accepts,
            s.produces()
        )),
        (Some(_), None) => reasons.push("accepts but the registry has no supply entry point".to_string()),
        _ => {}
    }
    reasons.join("; ")
}
