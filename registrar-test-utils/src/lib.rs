//! REGISTRAR Test Utilities
//!
//! Centralized test infrastructure for the REGISTRAR workspace:
//! - `ModuleBuilder` for assembling modules that follow the registration pattern
//! - Marker and scenario fixtures
//! - Proptest generators for component graphs

pub use registrar_bytecode::{
    read_module, write_module, AccessFlags, Annotation, Code, ElementValue, Insn, Label, Loadable,
    Member, MemberRef, ModuleFile,
};
pub use registrar_core::{
    names, AcceptorStrategy, ProducerStrategy, RegistrarError, Selector, TypeName,
};

// ============================================================================
// MODULE BUILDER
// ============================================================================

/// Fluent builder for test modules.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    module: ModuleFile,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            module: ModuleFile::new(name),
        }
    }

    /// An attribute type: abstract interface flagged as attribute.
    pub fn attribute_type(mut self) -> Self {
        self.module.access |= AccessFlags::ATTRIBUTE | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        self
    }

    pub fn interface(mut self) -> Self {
        self.module.access |= AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.module.access |= AccessFlags::ABSTRACT;
        self
    }

    pub fn extends(mut self, super_name: impl Into<TypeName>) -> Self {
        self.module.super_name = Some(super_name.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.module.interfaces.push(interface.into());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.module.annotations.push(annotation);
        self
    }

    /// Carry an argument-less attribute.
    pub fn carries(self, attribute: impl Into<TypeName>) -> Self {
        self.annotate(Annotation::new(attribute))
    }

    pub fn member(mut self, member: Member) -> Self {
        self.module.members.push(member);
        self
    }

    /// Public static method with a stub body matching its return type.
    pub fn static_method(
        self,
        name: &str,
        descriptor: &str,
        annotations: Vec<Annotation>,
    ) -> Self {
        let mut member = Member::new(AccessFlags::PUBLIC | AccessFlags::STATIC, name, descriptor);
        member.annotations = annotations;
        member.code = Some(stub_body(descriptor));
        self.member(member)
    }

    /// `@OnProduce static T name()`.
    pub fn producer(self, name: &str, produces: &str) -> Self {
        let descriptor = format!("(){}", TypeName::from(produces).descriptor());
        self.static_method(name, &descriptor, vec![Annotation::new(names::ON_PRODUCE)])
    }

    /// `@OnProduce static T name(Type registry)`.
    pub fn registry_arg_producer(self, name: &str, produces: &str) -> Self {
        let descriptor = format!(
            "({}){}",
            TypeName::from(names::TYPE_TOKEN).descriptor(),
            TypeName::from(produces).descriptor()
        );
        self.static_method(name, &descriptor, vec![Annotation::new(names::ON_PRODUCE)])
    }

    /// `@OnAccept static void name(T value)`.
    pub fn acceptor(self, name: &str, accepts: &str) -> Self {
        let descriptor = format!("({})V", TypeName::from(accepts).descriptor());
        self.static_method(name, &descriptor, vec![Annotation::new(names::ON_ACCEPT)])
    }

    /// `@OnDispatch(marker) static void name(T value)`.
    pub fn dispatch(self, marker: &str, name: &str, accepts: &str) -> Self {
        let descriptor = format!("({})V", TypeName::from(accepts).descriptor());
        self.static_method(name, &descriptor, vec![entry_point(names::ON_DISPATCH, marker)])
    }

    /// `@OnSupply(marker) static T name()`.
    pub fn supply(self, marker: &str, name: &str, produces: &str) -> Self {
        let descriptor = format!("(){}", TypeName::from(produces).descriptor());
        self.static_method(name, &descriptor, vec![entry_point(names::ON_SUPPLY, marker)])
    }

    /// Public no-argument constructor.
    pub fn constructor(self) -> Self {
        let mut member = Member::new(AccessFlags::PUBLIC, names::CONSTRUCTOR, names::VOID_SIGNATURE);
        member.code = Some(Code::new(vec![Insn::Return]));
        self.member(member)
    }

    /// Static initializer with the given body.
    pub fn static_init(self, instructions: Vec<Insn>) -> Self {
        let mut member = Member::new(AccessFlags::STATIC, names::STATIC_INIT, names::VOID_SIGNATURE);
        member.code = Some(Code::new(instructions));
        self.member(member)
    }

    pub fn build(self) -> ModuleFile {
        self.module
    }

    /// Serialized module.
    pub fn bytes(self) -> Vec<u8> {
        write_module(&self.module).expect("fixture module must serialize")
    }
}

fn entry_point(kind: &str, marker: &str) -> Annotation {
    Annotation::new(kind).with(names::MARKER_ELEMENT, ElementValue::Type(marker.into()))
}

fn stub_body(descriptor: &str) -> Code {
    if descriptor.ends_with('V') {
        Code::new(vec![Insn::Return])
    } else if descriptor.ends_with(';') {
        Code::new(vec![Insn::AconstNull, Insn::Areturn])
    } else {
        // Primitive returns are not part of the instruction set; throw instead.
        Code::new(vec![Insn::AconstNull, Insn::Athrow])
    }
}

// ============================================================================
// MARKER FIXTURES
// ============================================================================

/// Attribute type declared as a marker with the given selector.
pub fn marker_module(attribute: &str, selector: &Selector) -> ModuleBuilder {
    let select = match selector {
        Selector::ByAttribute(t) => {
            Annotation::new(names::SELECT_BY_ATTRIBUTE).with(names::VALUE, ElementValue::Type(t.clone()))
        }
        Selector::BySuperType(t) => {
            Annotation::new(names::SELECT_BY_SUPER_TYPE).with(names::VALUE, ElementValue::Type(t.clone()))
        }
    };
    ModuleBuilder::new(attribute)
        .attribute_type()
        .carries(names::MARKER)
        .annotate(select)
}

/// Marker with explicit strategy strings.
pub fn marker_with_strategies(
    attribute: &str,
    selector: &Selector,
    produce: &str,
    accept: &str,
) -> ModuleBuilder {
    marker_module(attribute, selector)
        .annotate(Annotation::new(names::PRODUCE_VIA).with(names::VALUE, ElementValue::Str(produce.into())))
        .annotate(Annotation::new(names::ACCEPT_VIA).with(names::VALUE, ElementValue::Str(accept.into())))
}

// ============================================================================
// SCENARIO FIXTURE
// ============================================================================

/// Type names of the reference scenario.
pub mod scenario {
    /// Plain module, copied unchanged.
    pub const PLAIN: &str = "app/A";
    /// Marker attribute type selecting carriers of [`COMPONENT_ATTRIBUTE`].
    pub const MARKER: &str = "app/B";
    /// Registry module carrying [`MARKER`].
    pub const REGISTRY: &str = "app/C";
    /// Component with a producer.
    pub const PRODUCING: &str = "app/D";
    /// Component with an acceptor.
    pub const ACCEPTING: &str = "app/E";
    /// Attribute carried by components.
    pub const COMPONENT_ATTRIBUTE: &str = "app/Y";
}

/// Modules A..E of the reference scenario, in scan order.
pub fn scenario_modules() -> Vec<ModuleFile> {
    use scenario::*;
    vec![
        ModuleBuilder::new(PLAIN).constructor().build(),
        marker_module(MARKER, &Selector::ByAttribute(COMPONENT_ATTRIBUTE.into())).build(),
        ModuleBuilder::new(REGISTRY)
            .carries(MARKER)
            .dispatch(MARKER, "register", names::OBJECT)
            .supply(MARKER, "lookup", names::OBJECT)
            .static_init(vec![Insn::Return])
            .build(),
        ModuleBuilder::new(PRODUCING)
            .carries(COMPONENT_ATTRIBUTE)
            .producer("create", PRODUCING)
            .build(),
        ModuleBuilder::new(ACCEPTING)
            .carries(COMPONENT_ATTRIBUTE)
            .acceptor("accept", names::OBJECT)
            .build(),
    ]
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Which capabilities a generated component exposes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Shape {
        Producer,
        Acceptor,
        Both,
    }

    pub fn arb_shape() -> impl Strategy<Value = Shape> {
        prop_oneof![Just(Shape::Producer), Just(Shape::Acceptor), Just(Shape::Both)]
    }

    /// Component module `app/C<i>` carrying `attribute`.
    pub fn component(index: usize, attribute: &str, shape: Shape) -> ModuleFile {
        let name = format!("app/C{index}");
        let builder = ModuleBuilder::new(name.as_str()).carries(attribute);
        let builder = match shape {
            Shape::Producer => builder.producer("create", &name),
            Shape::Acceptor => builder.acceptor("accept", names::OBJECT),
            Shape::Both => builder
                .producer("create", &name)
                .acceptor("accept", names::OBJECT),
        };
        builder.build()
    }

    /// A marker, one registry per marker, and the component modules, shuffled
    /// into a scan order.
    ///
    /// Markers `app/M<k>` all select carriers of `app/Plugin`, so they share
    /// one selector.
    pub fn arb_graph() -> impl Strategy<Value = (usize, Vec<Shape>, Vec<ModuleFile>)> {
        (1usize..4, prop::collection::vec(arb_shape(), 0..8))
            .prop_flat_map(|(markers, shapes)| {
                let mut modules = Vec::new();
                for k in 0..markers {
                    let marker = format!("app/M{k}");
                    modules.push(
                        marker_module(&marker, &Selector::ByAttribute("app/Plugin".into())).build(),
                    );
                    modules.push(
                        ModuleBuilder::new(format!("app/R{k}").as_str())
                            .carries(marker.as_str())
                            .dispatch(&marker, "register", names::OBJECT)
                            .supply(&marker, "lookup", names::OBJECT)
                            .build(),
                    );
                }
                for (i, shape) in shapes.iter().enumerate() {
                    modules.push(component(i, "app/Plugin", *shape));
                }
                (Just(markers), Just(shapes), Just(modules).prop_shuffle())
            })
    }
}
