//! REGISTRAR Core - Shared Types
//!
//! Data structures shared by every stage of the registrar pipeline: type names,
//! the resolved registration graph (markers, components, registries), the
//! recorded error kinds with their reporter, and the run configuration.
//!
//! This crate contains no scanning or rewriting logic.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub mod config;
pub mod error;
pub mod model;
pub mod report;

pub use config::*;
pub use error::*;
pub use model::*;
pub use report::*;

// ============================================================================
// TYPE NAMES
// ============================================================================

/// Internal name of a module type, e.g. `app/net/HttpPlugin`.
///
/// Segments are separated by `/`. Names are compared byte-wise; no
/// normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Descriptor form of this type, `L<name>;`.
    pub fn descriptor(&self) -> String {
        format!("L{};", self.0)
    }

    /// Last path segment, used in log output.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// WELL-KNOWN NAMES
// ============================================================================

/// Attribute and member names the registration pattern is built from.
pub mod names {
    /// Meta-attribute declaring an attribute type as a marker.
    pub const MARKER: &str = "registrar/Marker";
    /// Selector: components carry the attribute given in `value`.
    pub const SELECT_BY_ATTRIBUTE: &str = "registrar/SelectByAttribute";
    /// Selector: components are concrete subtypes of the type given in `value`.
    pub const SELECT_BY_SUPER_TYPE: &str = "registrar/SelectBySuperType";
    /// Producer strategy for a marker (`callback`, `constructor`, `type`, `none`).
    pub const PRODUCE_VIA: &str = "registrar/ProduceVia";
    /// Acceptor strategy for a marker (`callback`, `none`).
    pub const ACCEPT_VIA: &str = "registrar/AcceptVia";

    /// Component member producing an instance.
    pub const ON_PRODUCE: &str = "registrar/OnProduce";
    /// Component member accepting an instance.
    pub const ON_ACCEPT: &str = "registrar/OnAccept";
    /// Registry member receiving produced instances; `marker` names the marker.
    pub const ON_DISPATCH: &str = "registrar/OnDispatch";
    /// Registry member supplying instances to acceptors; `marker` names the marker.
    pub const ON_SUPPLY: &str = "registrar/OnSupply";

    /// Marking added to every component module.
    pub const RETAINED: &str = "registrar/Retained";

    /// Root of the reference type hierarchy.
    pub const OBJECT: &str = "lang/Object";
    /// Type of a type token loaded with `ldc`.
    pub const TYPE_TOKEN: &str = "lang/Type";

    pub const STATIC_INIT: &str = "<clinit>";
    pub const CONSTRUCTOR: &str = "<init>";
    pub const VOID_SIGNATURE: &str = "()V";

    /// Element name holding a single attribute argument.
    pub const VALUE: &str = "value";
    /// Element name linking a registry entry point to its marker.
    pub const MARKER_ELEMENT: &str = "marker";
}
