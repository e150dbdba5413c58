//! Component marking

use crate::Transform;
use registrar_bytecode::{Annotation, ModuleFile};
use registrar_core::{names, RegistrarResult};

/// Adds `registrar/Retained` to a component module. Applying it twice leaves
/// a single marking.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentPatcher;

impl Transform for ComponentPatcher {
    fn name(&self) -> &'static str {
        "component"
    }

    fn apply(&self, module: &mut ModuleFile) -> RegistrarResult<()> {
        if !module.has_annotation(names::RETAINED) {
            module.annotations.push(Annotation::new(names::RETAINED));
        }
        Ok(())
    }
}
