//! Component discoverer
//!
//! Discovery results are memoized per [`DiscoveryKey`]. The map lock is held
//! only long enough to fetch or insert the key's cell; the discovery itself
//! runs inside `OnceCell::get_or_init`, so each key is computed exactly once
//! even when several threads ask for it at the same time.

use crate::{AcceptorParser, MetadataIndex, ProducerParser};
use once_cell::sync::OnceCell;
use registrar_bytecode::ModuleFile;
use registrar_core::{
    AcceptorStrategy, Component, ErrorReporter, Marker, ProducerStrategy, RegistrarError,
    RegistrarResult, Selector, TypeName,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Memo key: the selector plus the capability strategies used to parse what
/// it matches. Markers with the default strategies share one entry per
/// selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryKey {
    pub selector: Selector,
    pub produce: ProducerStrategy,
    pub accept: AcceptorStrategy,
}

impl From<&Marker> for DiscoveryKey {
    fn from(marker: &Marker) -> Self {
        Self {
            selector: marker.selector.clone(),
            produce: marker.produce,
            accept: marker.accept,
        }
    }
}

type Slot = Arc<OnceCell<Arc<[Component]>>>;

/// Resolves selectors to component collections.
#[derive(Debug)]
pub struct ComponentDiscoverer<'a> {
    index: &'a MetadataIndex,
    reporter: &'a ErrorReporter,
    producers: ProducerParser,
    acceptors: AcceptorParser,
    memo: Mutex<HashMap<DiscoveryKey, Slot>>,
    executions: AtomicUsize,
}

impl<'a> ComponentDiscoverer<'a> {
    pub fn new(index: &'a MetadataIndex, reporter: &'a ErrorReporter) -> Self {
        Self {
            index,
            reporter,
            producers: ProducerParser,
            acceptors: AcceptorParser,
            memo: Mutex::new(HashMap::new()),
            executions: AtomicUsize::new(0),
        }
    }

    /// Components for a marker's selector, in scan order.
    pub fn discover(&self, marker: &Marker) -> Arc<[Component]> {
        self.discover_key(DiscoveryKey::from(marker))
    }

    pub fn discover_key(&self, key: DiscoveryKey) -> Arc<[Component]> {
        let slot = {
            let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(memo.entry(key.clone()).or_default())
        };
        Arc::clone(slot.get_or_init(|| self.run(&key)))
    }

    /// How many discoveries actually ran.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn run(&self, key: &DiscoveryKey) -> Arc<[Component]> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let candidates = self.candidates(&key.selector);
        let components: Vec<Component> = candidates
            .iter()
            .filter_map(|name| self.index.module(name.as_str()))
            .filter_map(|module| self.reporter.capture(self.component(module, key)))
            .collect();
        tracing::info!(
            selector = %key.selector,
            candidates = candidates.len(),
            components = components.len(),
            "Components discovered"
        );
        components.into()
    }

    /// Input modules matched by a selector, in scan order.
    fn candidates(&self, selector: &Selector) -> Vec<TypeName> {
        match selector {
            Selector::ByAttribute(attribute) => self
                .index
                .carriers_of(attribute.as_str())
                .filter(|name| self.index.is_input(name.as_str()))
                .cloned()
                .collect(),
            Selector::BySuperType(ancestor) => self
                .index
                .subtypes_of(ancestor)
                .into_iter()
                .filter(|name| self.index.is_input(name.as_str()))
                .filter(|name| {
                    self.index
                        .module(name.as_str())
                        .is_some_and(|m| !m.is_abstract() && !m.is_interface())
                })
                .collect(),
        }
    }

    fn component(&self, module: &ModuleFile, key: &DiscoveryKey) -> RegistrarResult<Component> {
        let producer = self.producers.parse(module, key.produce);
        let acceptor = self.acceptors.parse(module, key.accept);
        let (producer, acceptor) = match (producer, acceptor) {
            (Ok(p), Ok(a)) => (p, a),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
            (Err(producer_err), Err(acceptor_err)) => {
                self.reporter.report(producer_err);
                return Err(acceptor_err);
            }
        };
        if producer.is_none() && acceptor.is_none() {
            return Err(RegistrarError::MissingCapability {
                module: module.name.to_string(),
            });
        }
        tracing::debug!(
            module = %module.name,
            producer = producer.is_some(),
            acceptor = acceptor.is_some(),
            "Component parsed"
        );
        Ok(Component {
            module: module.name.clone(),
            producer,
            acceptor,
        })
    }
}
