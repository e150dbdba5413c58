//! REGISTRAR Patch - Module Transforms
//!
//! Rewrites parsed modules so registration runs without reflection:
//! - [`RegistryPatcher`] injects the wiring sequence into a registry's static
//!   initializer
//! - [`ComponentPatcher`] marks component modules as retained
//!
//! Transforms run as an explicit, ordered [`PatchPipeline`]: every registry
//! transform targeting a module first, component marking last.

pub mod component;
pub mod pipeline;
pub mod registry;

pub use component::ComponentPatcher;
pub use pipeline::{PatchPipeline, PatchPlan};
pub use registry::RegistryPatcher;

use registrar_bytecode::ModuleFile;
use registrar_core::RegistrarResult;

/// One in-place rewrite of a parsed module.
pub trait Transform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn apply(&self, module: &mut ModuleFile) -> RegistrarResult<()>;
}
