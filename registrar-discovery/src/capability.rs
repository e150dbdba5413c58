//! Capability parsers
//!
//! Pure functions over a module's members. A member tagged with a capability
//! attribute must have the matching shape; a mis-shaped member is a metadata
//! error rather than being silently skipped.

use registrar_bytecode::{FieldType, Member, MethodDescriptor, ModuleFile};
use registrar_core::{
    names, AcceptorDescriptor, AcceptorStrategy, Capability, MemberDescriptor, ProducerDescriptor,
    ProducerStrategy, RegistrarError, RegistrarResult, TypeName,
};

// ============================================================================
// PRODUCER PARSER
// ============================================================================

/// Detects how a module produces an instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProducerParser;

impl ProducerParser {
    /// Component producer for the marker's strategy, if any.
    pub fn parse(
        &self,
        module: &ModuleFile,
        strategy: ProducerStrategy,
    ) -> RegistrarResult<Option<ProducerDescriptor>> {
        match strategy {
            ProducerStrategy::Callback => {
                let tagged: Vec<&Member> = module
                    .members
                    .iter()
                    .filter(|m| m.annotation(names::ON_PRODUCE).is_some())
                    .collect();
                let found = tagged
                    .into_iter()
                    .map(|m| producer_shape(module, m, names::ON_PRODUCE, true))
                    .collect::<RegistrarResult<Vec<_>>>()?;
                single(module, Capability::Producer, found)
            }
            ProducerStrategy::Constructor => Ok(constructor(module)),
            ProducerStrategy::TypeToken => Ok(Some(ProducerDescriptor::TypeToken)),
            ProducerStrategy::None => Ok(None),
        }
    }

    /// Registry supply entry point for `marker`: a zero-argument producer
    /// tagged `registrar/OnSupply(marker = ...)`.
    pub fn parse_supply(
        &self,
        module: &ModuleFile,
        marker: &TypeName,
    ) -> RegistrarResult<Option<ProducerDescriptor>> {
        let found = entry_points(module, names::ON_SUPPLY, marker)?
            .into_iter()
            .map(|m| producer_shape(module, m, names::ON_SUPPLY, false))
            .collect::<RegistrarResult<Vec<_>>>()?;
        single(module, Capability::Supply, found)
    }
}

fn producer_shape(
    module: &ModuleFile,
    member: &Member,
    tag: &str,
    allow_registry_arg: bool,
) -> RegistrarResult<ProducerDescriptor> {
    let desc = callable(module, member, tag)?;
    let takes_registry = match desc.params.as_slice() {
        [] => false,
        [FieldType::Object(t)] if allow_registry_arg && t.as_str() == names::TYPE_TOKEN => true,
        _ => {
            let expected = if allow_registry_arg {
                "no parameters or a single lang/Type parameter"
            } else {
                "no parameters"
            };
            return Err(shape_error(module, member, tag, expected));
        }
    };
    let produces = match &desc.ret {
        Some(FieldType::Object(t)) => t.clone(),
        _ => return Err(shape_error(module, member, tag, "an object return type")),
    };
    Ok(ProducerDescriptor::Callback {
        member: MemberDescriptor::new(&member.name, &member.descriptor),
        produces,
        takes_registry,
    })
}

fn constructor(module: &ModuleFile) -> Option<ProducerDescriptor> {
    if module.is_abstract() || module.is_interface() {
        return None;
    }
    module
        .member(names::CONSTRUCTOR, names::VOID_SIGNATURE)
        .filter(|m| !m.is_private() && !m.is_static())
        .map(|_| ProducerDescriptor::Constructor {
            produces: module.name.clone(),
        })
}

// ============================================================================
// ACCEPTOR PARSER
// ============================================================================

/// Detects how a module accepts an instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptorParser;

impl AcceptorParser {
    /// Component acceptor for the marker's strategy, if any.
    pub fn parse(
        &self,
        module: &ModuleFile,
        strategy: AcceptorStrategy,
    ) -> RegistrarResult<Option<AcceptorDescriptor>> {
        match strategy {
            AcceptorStrategy::Callback => {
                let found = module
                    .members
                    .iter()
                    .filter(|m| m.annotation(names::ON_ACCEPT).is_some())
                    .map(|m| acceptor_shape(module, m, names::ON_ACCEPT))
                    .collect::<RegistrarResult<Vec<_>>>()?;
                single(module, Capability::Acceptor, found)
            }
            AcceptorStrategy::None => Ok(None),
        }
    }

    /// Registry dispatch entry point for `marker`, tagged
    /// `registrar/OnDispatch(marker = ...)`.
    pub fn parse_dispatch(
        &self,
        module: &ModuleFile,
        marker: &TypeName,
    ) -> RegistrarResult<Option<AcceptorDescriptor>> {
        let found = entry_points(module, names::ON_DISPATCH, marker)?
            .into_iter()
            .map(|m| acceptor_shape(module, m, names::ON_DISPATCH))
            .collect::<RegistrarResult<Vec<_>>>()?;
        single(module, Capability::Dispatch, found)
    }
}

fn acceptor_shape(module: &ModuleFile, member: &Member, tag: &str) -> RegistrarResult<AcceptorDescriptor> {
    let desc = callable(module, member, tag)?;
    match desc.params.as_slice() {
        [FieldType::Object(t)] => Ok(AcceptorDescriptor {
            member: MemberDescriptor::new(&member.name, &member.descriptor),
            accepts: t.clone(),
        }),
        _ => Err(shape_error(module, member, tag, "exactly one object parameter")),
    }
}

// ============================================================================
// SHARED
// ============================================================================

/// Static, non-private method with a well-formed descriptor.
fn callable(module: &ModuleFile, member: &Member, tag: &str) -> RegistrarResult<MethodDescriptor> {
    if !member.is_method() || !member.is_static() || member.is_private() {
        return Err(shape_error(module, member, tag, "a static, non-private method"));
    }
    MethodDescriptor::parse(&member.descriptor)
        .map_err(|e| RegistrarError::metadata(&module.name, format!("{}: {}", member.signature(), e)))
}

/// Members tagged `tag` whose `marker` element names `marker`.
fn entry_points<'m>(module: &'m ModuleFile, tag: &str, marker: &TypeName) -> RegistrarResult<Vec<&'m Member>> {
    let mut matched = Vec::new();
    for member in &module.members {
        let Some(annotation) = member.annotation(tag) else {
            continue;
        };
        match annotation.type_element(names::MARKER_ELEMENT) {
            Some(target) if target == marker => matched.push(member),
            Some(_) => {}
            None => {
                return Err(RegistrarError::metadata(
                    &module.name,
                    format!("{} on {} has no type-valued `marker` element", tag, member.signature()),
                ))
            }
        }
    }
    Ok(matched)
}

fn single<T>(module: &ModuleFile, capability: Capability, found: Vec<T>) -> RegistrarResult<Option<T>>
where
    T: Describe,
{
    if found.len() > 1 {
        return Err(RegistrarError::AmbiguousCapability {
            module: module.name.to_string(),
            capability,
            candidates: found.iter().map(Describe::describe).collect(),
        });
    }
    Ok(found.into_iter().next())
}

fn shape_error(module: &ModuleFile, member: &Member, tag: &str, expected: &str) -> RegistrarError {
    RegistrarError::metadata(
        &module.name,
        format!("{} tagged {} must be {}", member.signature(), tag, expected),
    )
}

/// Member text used in ambiguity messages.
trait Describe {
    fn describe(&self) -> String;
}

impl Describe for ProducerDescriptor {
    fn describe(&self) -> String {
        match self {
            ProducerDescriptor::Callback { member, .. } => member.to_string(),
            ProducerDescriptor::Constructor { .. } => names::CONSTRUCTOR.to_string(),
            ProducerDescriptor::TypeToken => names::TYPE_TOKEN.to_string(),
        }
    }
}

impl Describe for AcceptorDescriptor {
    fn describe(&self) -> String {
        self.member.to_string()
    }
}
