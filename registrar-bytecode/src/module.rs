//! Structural module model
//!
//! All constant pool references are resolved into owned values; the model can
//! be freely mutated and handed to the writer.

use crate::Code;
use bitflags::bitflags;
use registrar_core::TypeName;

bitflags! {
    /// Access and property flags of modules and members.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        /// The module declares an attribute type.
        const ATTRIBUTE = 0x2000;
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

/// Element value of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementValue {
    Str(String),
    Int(i32),
    Bool(bool),
    Type(TypeName),
    Array(Vec<ElementValue>),
}

/// One attribute instance attached to a module or member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub type_name: TypeName,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn type_element(&self, name: &str) -> Option<&TypeName> {
        match self.element(name) {
            Some(ElementValue::Type(t)) => Some(t),
            _ => None,
        }
    }

    pub fn str_element(&self, name: &str) -> Option<&str> {
        match self.element(name) {
            Some(ElementValue::Str(s)) => Some(s),
            _ => None,
        }
    }
}

/// Attribute this codec does not interpret; written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawAttribute {
    pub name: String,
    pub data: Vec<u8>,
}

// ============================================================================
// MEMBERS AND MODULES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
    pub code: Option<Code>,
    pub attributes: Vec<RawAttribute>,
}

impl Member {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            annotations: Vec::new(),
            code: None,
            attributes: Vec::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    pub fn is_private(&self) -> bool {
        self.access.contains(AccessFlags::PRIVATE)
    }

    /// Field members carry a field descriptor; methods start with `(`.
    pub fn is_method(&self) -> bool {
        self.descriptor.starts_with('(')
    }

    pub fn annotation(&self, type_name: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.type_name.as_str() == type_name)
    }

    /// `name` + `descriptor`, e.g. `create()Lapp/A;`.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

/// A fully parsed binary module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: AccessFlags,
    pub name: TypeName,
    pub super_name: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub members: Vec<Member>,
    pub annotations: Vec<Annotation>,
    pub attributes: Vec<RawAttribute>,
}

impl ModuleFile {
    /// An empty public module of the current format version.
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            minor_version: 0,
            major_version: crate::MAJOR_VERSION,
            access: AccessFlags::PUBLIC,
            name: name.into(),
            super_name: Some(TypeName::from(registrar_core::names::OBJECT)),
            interfaces: Vec::new(),
            members: Vec::new(),
            annotations: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn is_attribute_type(&self) -> bool {
        self.access.contains(AccessFlags::ATTRIBUTE)
    }

    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(AccessFlags::ABSTRACT)
    }

    pub fn annotation(&self, type_name: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.type_name.as_str() == type_name)
    }

    pub fn has_annotation(&self, type_name: &str) -> bool {
        self.annotation(type_name).is_some()
    }

    pub fn member(&self, name: &str, descriptor: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn member_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Direct supertypes: the super module followed by interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &TypeName> {
        self.super_name.iter().chain(self.interfaces.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_lookup() {
        let ann = Annotation::new("registrar/SelectByAttribute")
            .with("value", ElementValue::Type("app/Plugin".into()))
            .with("note", ElementValue::Str("x".into()));
        assert_eq!(ann.type_element("value").unwrap().as_str(), "app/Plugin");
        assert_eq!(ann.str_element("note"), Some("x"));
        assert!(ann.type_element("note").is_none());
        assert!(ann.element("missing").is_none());
    }

    #[test]
    fn test_supertypes_order() {
        let mut module = ModuleFile::new("app/A");
        module.interfaces.push("app/I".into());
        let supers: Vec<_> = module.supertypes().map(TypeName::as_str).collect();
        assert_eq!(supers, vec!["lang/Object", "app/I"]);
    }

    #[test]
    fn test_member_flags() {
        let member = Member::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "make", "()Lapp/A;");
        assert!(member.is_static());
        assert!(member.is_method());
        assert!(!member.is_private());
        assert_eq!(member.signature(), "make()Lapp/A;");
    }
}
