//! Metadata index
//!
//! Built in a single pass over every scanned module. Each module's attribute
//! table is visited exactly once; the result is read-only.

use indexmap::{IndexMap, IndexSet};
use registrar_bytecode::ModuleFile;
use registrar_core::{names, AnnotatedType, TypeName};
use std::collections::{HashSet, VecDeque};

/// Where a scanned module came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// An input root; eligible to become a registry or component.
    Input,
    /// A classpath or bootpath root; visible for markers and hierarchy only.
    Reference,
}

#[derive(Debug, Clone)]
struct IndexedModule {
    module: ModuleFile,
    origin: Origin,
}

/// Attribute carriers and type hierarchy of all scanned modules.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    modules: IndexMap<TypeName, IndexedModule>,
    carriers: IndexMap<TypeName, IndexSet<TypeName>>,
}

impl MetadataIndex {
    /// Index modules in scan order. The first module seen for a type name
    /// wins, so inputs shadow classpath and bootpath entries of the same name.
    pub fn build(modules: impl IntoIterator<Item = (ModuleFile, Origin)>) -> Self {
        let mut index = Self::default();
        for (module, origin) in modules {
            index.insert(module, origin);
        }
        tracing::info!(
            modules = index.modules.len(),
            attributes = index.carriers.len(),
            "Metadata index built"
        );
        index
    }

    fn insert(&mut self, module: ModuleFile, origin: Origin) {
        if self.modules.contains_key(&module.name) {
            tracing::debug!(module = %module.name, ?origin, "Shadowed duplicate module");
            return;
        }
        for annotation in &module.annotations {
            self.carriers
                .entry(annotation.type_name.clone())
                .or_default()
                .insert(module.name.clone());
        }
        self.modules
            .insert(module.name.clone(), IndexedModule { module, origin });
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleFile> {
        self.modules.get(name).map(|m| &m.module)
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.modules.get(name).map(|m| m.origin)
    }

    pub fn is_input(&self, name: &str) -> bool {
        self.origin(name) == Some(Origin::Input)
    }

    /// Modules in scan order.
    pub fn modules(&self) -> impl Iterator<Item = (&ModuleFile, Origin)> {
        self.modules.values().map(|m| (&m.module, m.origin))
    }

    /// Modules carrying `attribute`, in scan order. Empty if none.
    pub fn carriers_of(&self, attribute: &str) -> impl Iterator<Item = &TypeName> {
        self.carriers
            .get(attribute)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Every (owner, attribute) fact, grouped by attribute in first-seen order.
    pub fn annotated_types(&self) -> impl Iterator<Item = AnnotatedType> + '_ {
        self.carriers.iter().flat_map(|(attribute, owners)| {
            owners.iter().map(move |owner| AnnotatedType {
                owner: owner.clone(),
                attribute: attribute.clone(),
            })
        })
    }

    /// Reference assignability: identity, anything to `lang/Object`, or a
    /// path through the supertype closure of scanned modules. Unscanned
    /// supertypes end the walk.
    pub fn is_assignable(&self, from: &TypeName, to: &TypeName) -> bool {
        if from == to || to.as_str() == names::OBJECT {
            return true;
        }
        let mut seen: HashSet<&TypeName> = HashSet::new();
        let mut queue: VecDeque<&TypeName> = VecDeque::new();
        if let Some(entry) = self.modules.get(from) {
            queue.extend(entry.module.supertypes());
        }
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(entry) = self.modules.get(current) {
                queue.extend(entry.module.supertypes());
            }
        }
        false
    }

    /// Proper subtypes of `ancestor` among all scanned modules, in scan order.
    pub fn subtypes_of(&self, ancestor: &TypeName) -> Vec<TypeName> {
        self.modules
            .keys()
            .filter(|name| *name != ancestor && self.is_assignable(name, ancestor))
            .cloned()
            .collect()
    }
}
