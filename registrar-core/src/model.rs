//! Registration graph types
//!
//! Everything here is created once per run and never mutated afterwards.

use crate::{names, TypeName};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// SCAN FACTS
// ============================================================================

/// One attribute instance found on a module during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotatedType {
    pub owner: TypeName,
    pub attribute: TypeName,
}

// ============================================================================
// SELECTORS AND MARKERS
// ============================================================================

/// How candidate component modules are found.
///
/// Selectors are value types: two selectors describe the same discovery iff
/// they are equal, which makes them usable as memo keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    /// Modules carrying the given attribute type.
    ByAttribute(TypeName),
    /// Concrete modules whose supertype closure contains the given type.
    BySuperType(TypeName),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::ByAttribute(t) => write!(f, "by-attribute({})", t),
            Selector::BySuperType(t) => write!(f, "by-super-type({})", t),
        }
    }
}

/// How a component produces the instance handed to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProducerStrategy {
    /// A static member tagged `registrar/OnProduce`.
    #[default]
    Callback,
    /// The public no-argument constructor.
    Constructor,
    /// The component's own type token.
    TypeToken,
    /// Components never produce.
    None,
}

impl ProducerStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "callback" => Some(Self::Callback),
            "constructor" => Some(Self::Constructor),
            "type" => Some(Self::TypeToken),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// How a component accepts an instance supplied by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AcceptorStrategy {
    /// A static member tagged `registrar/OnAccept`.
    #[default]
    Callback,
    /// Components never accept.
    None,
}

impl AcceptorStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "callback" => Some(Self::Callback),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// One kind of registry declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    /// The marker attribute type placed on registry modules.
    pub attribute: TypeName,
    pub selector: Selector,
    pub produce: ProducerStrategy,
    pub accept: AcceptorStrategy,
}

// ============================================================================
// CAPABILITY DESCRIPTORS
// ============================================================================

/// Enough of a member to emit an invocation without re-resolving overloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberDescriptor {
    pub name: String,
    pub signature: String,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

/// A way to obtain an instance from a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProducerDescriptor {
    /// Static factory member. When `takes_registry` is set the member receives
    /// the registry's type token as its only argument.
    Callback {
        member: MemberDescriptor,
        produces: TypeName,
        takes_registry: bool,
    },
    /// `new` + no-argument constructor of the owning module.
    Constructor { produces: TypeName },
    /// Type token of the owning module.
    TypeToken,
}

impl ProducerDescriptor {
    /// Static type of the produced value.
    pub fn produces(&self) -> TypeName {
        match self {
            ProducerDescriptor::Callback { produces, .. } => produces.clone(),
            ProducerDescriptor::Constructor { produces } => produces.clone(),
            ProducerDescriptor::TypeToken => TypeName::from(names::TYPE_TOKEN),
        }
    }
}

/// A static member receiving one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcceptorDescriptor {
    pub member: MemberDescriptor,
    /// Declared parameter type.
    pub accepts: TypeName,
}

// ============================================================================
// COMPONENTS AND REGISTRIES
// ============================================================================

/// A module discovered through a selector.
///
/// At least one of `producer` and `acceptor` is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    pub module: TypeName,
    pub producer: Option<ProducerDescriptor>,
    pub acceptor: Option<AcceptorDescriptor>,
}

/// Which directions a component is wired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Index into [`Registry::components`].
    pub component: usize,
    /// Component produces, registry dispatch receives.
    pub produce: bool,
    /// Registry supplies, component accepts.
    pub accept: bool,
}

/// A module designated by a marker attribute, bound to its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub module: TypeName,
    pub marker: Arc<Marker>,
    /// Exactly the selector result at discovery time, in scan order.
    pub components: Arc<[Component]>,
    /// Entry point receiving produced instances.
    pub dispatch: Option<AcceptorDescriptor>,
    /// Entry point supplying instances to component acceptors.
    pub supply: Option<ProducerDescriptor>,
    /// One binding per wired component, in component order.
    pub bindings: Vec<Binding>,
}

impl Registry {
    /// Components paired with their bindings, in emission order.
    pub fn wired(&self) -> impl Iterator<Item = (&Component, &Binding)> {
        self.bindings
            .iter()
            .filter_map(move |b| self.components.get(b.component).map(|c| (c, b)))
    }
}
