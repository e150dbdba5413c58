//! Patch plan and per-module pipeline

use crate::{ComponentPatcher, RegistryPatcher, Transform};
use indexmap::{IndexMap, IndexSet};
use registrar_bytecode::{write_module, ModuleFile};
use registrar_core::{RegistrarError, RegistrarResult, Registry, TypeName};

/// Which transforms each module receives, derived once from the assembled
/// registries.
#[derive(Debug, Clone, Default)]
pub struct PatchPlan<'a> {
    registries: IndexMap<TypeName, Vec<&'a Registry>>,
    components: IndexSet<TypeName>,
}

impl<'a> PatchPlan<'a> {
    pub fn new(registries: &'a [Registry]) -> Self {
        let mut plan = Self::default();
        for registry in registries {
            plan.registries
                .entry(registry.module.clone())
                .or_default()
                .push(registry);
            for component in registry.components.iter() {
                plan.components.insert(component.module.clone());
            }
        }
        plan
    }

    /// Modules that receive at least one registry transform.
    pub fn registry_modules(&self) -> impl Iterator<Item = &TypeName> {
        self.registries.keys()
    }

    /// Modules that belong to at least one registry.
    pub fn component_modules(&self) -> impl Iterator<Item = &TypeName> {
        self.components.iter()
    }

    pub fn touches(&self, module: &str) -> bool {
        self.registries.contains_key(module) || self.components.contains(module)
    }

    /// Ordered transforms for one module: its registries in assembly order,
    /// then component marking.
    pub fn pipeline(&self, module: &str) -> PatchPipeline<'a> {
        let mut transforms: Vec<Box<dyn Transform + 'a>> = Vec::new();
        if let Some(registries) = self.registries.get(module) {
            for registry in registries.iter().copied() {
                transforms.push(Box::new(RegistryPatcher::new(registry)));
            }
        }
        if self.components.contains(module) {
            transforms.push(Box::new(ComponentPatcher));
        }
        PatchPipeline { transforms }
    }
}

/// An explicit sequence of transforms applied to one module.
pub struct PatchPipeline<'a> {
    transforms: Vec<Box<dyn Transform + 'a>>,
}

impl<'a> PatchPipeline<'a> {
    pub fn new(transforms: Vec<Box<dyn Transform + 'a>>) -> Self {
        Self { transforms }
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transform names in application order.
    pub fn stages(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn apply(&self, module: &mut ModuleFile) -> RegistrarResult<()> {
        for transform in &self.transforms {
            transform.apply(module)?;
        }
        Ok(())
    }

    /// Apply every transform and serialize the result.
    pub fn rewrite(&self, mut module: ModuleFile) -> RegistrarResult<Vec<u8>> {
        self.apply(&mut module)?;
        write_module(&module).map_err(|e| RegistrarError::rewrite(&module.name, e.to_string()))
    }
}

impl std::fmt::Debug for PatchPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchPipeline")
            .field("stages", &self.stages())
            .finish()
    }
}
