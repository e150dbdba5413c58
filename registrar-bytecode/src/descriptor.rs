//! Type and member descriptors
//!
//! Grammar:
//! ```text
//! field  := 'I' | 'Z' | 'L' name ';' | '[' field
//! method := '(' field* ')' (field | 'V')
//! ```

use crate::{FormatError, FormatResult, MAX_NESTING};
use registrar_core::TypeName;
use std::fmt;

/// Type of a value, parameter or static field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Bool,
    Object(TypeName),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> FormatResult<Self> {
        let (ty, rest) = parse_field(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(invalid(descriptor, "trailing characters"));
        }
        Ok(ty)
    }

    /// Named type of an object value; `None` for primitives and arrays.
    pub fn object_name(&self) -> Option<&TypeName> {
        match self {
            FieldType::Object(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => f.write_str("I"),
            FieldType::Bool => f.write_str("Z"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(inner) => write!(f, "[{}", inner),
        }
    }
}

/// Parameters and return type of a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `V`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> FormatResult<Self> {
        let body = descriptor
            .strip_prefix('(')
            .ok_or_else(|| invalid(descriptor, "expected '('"))?;
        let mut rest = body;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(invalid(descriptor, "unterminated parameter list"));
            }
            let (param, after) = parse_field(rest, descriptor)?;
            params.push(param);
            rest = after;
        }
        let ret = if rest == "V" {
            None
        } else {
            Some(FieldType::parse(rest).map_err(|_| invalid(descriptor, "bad return type"))?)
        };
        Ok(Self { params, ret })
    }

    pub fn is_void(&self) -> bool {
        self.ret.is_none()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{}", ret),
            None => f.write_str("V"),
        }
    }
}

fn parse_field<'a>(input: &'a str, whole: &str) -> FormatResult<(FieldType, &'a str)> {
    let element = input.trim_start_matches('[');
    let dimensions = input.len() - element.len();
    if dimensions > MAX_NESTING {
        return Err(FormatError::NestingTooDeep {
            what: "array descriptor",
            limit: MAX_NESTING,
        });
    }

    let mut chars = element.chars();
    let (mut ty, rest) = match chars.next() {
        Some('I') => (FieldType::Int, chars.as_str()),
        Some('Z') => (FieldType::Bool, chars.as_str()),
        Some('L') => {
            let rest = chars.as_str();
            let end = rest
                .find(';')
                .ok_or_else(|| invalid(whole, "unterminated object type"))?;
            let name = &rest[..end];
            if name.is_empty() || name.contains(['(', ')', '[', ';']) {
                return Err(invalid(whole, "bad object type name"));
            }
            (FieldType::Object(TypeName::new(name)), &rest[end + 1..])
        }
        Some(other) => return Err(invalid(whole, &format!("unexpected '{}'", other))),
        None => return Err(invalid(whole, "unexpected end")),
    };
    for _ in 0..dimensions {
        ty = FieldType::Array(Box::new(ty));
    }
    Ok((ty, rest))
}

fn invalid(descriptor: &str, reason: &str) -> FormatError {
    FormatError::InvalidDescriptor {
        descriptor: descriptor.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_with_object_params() {
        let desc = MethodDescriptor::parse("(Lapp/A;I[Lapp/B;)Z").unwrap();
        assert_eq!(desc.params.len(), 3);
        assert_eq!(desc.params[0].object_name().unwrap().as_str(), "app/A");
        assert_eq!(
            desc.params[2],
            FieldType::Array(Box::new(FieldType::Object("app/B".into())))
        );
        assert_eq!(desc.ret, Some(FieldType::Bool));
    }

    #[test]
    fn test_parse_void_no_args() {
        let desc = MethodDescriptor::parse("()V").unwrap();
        assert!(desc.params.is_empty());
        assert!(desc.is_void());
        assert_eq!(desc.to_string(), "()V");
    }

    #[test]
    fn test_display_round_trips() {
        let text = "(Llang/Type;)Lapp/Plugin;";
        assert_eq!(MethodDescriptor::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "V", "(", "(Lapp/A)V", "()", "()X", "(I)VV", "(L;)V"] {
            assert!(MethodDescriptor::parse(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_array_dimensions_bounded() {
        let deepest = format!("{}I", "[".repeat(MAX_NESTING));
        assert!(FieldType::parse(&deepest).is_ok());

        let too_deep = format!("({}Lapp/A;)V", "[".repeat(MAX_NESTING + 1));
        assert!(matches!(
            MethodDescriptor::parse(&too_deep),
            Err(FormatError::NestingTooDeep { what: "array descriptor", .. })
        ));
        // Well past any stack limit if parsed recursively.
        let huge = format!("{}I", "[".repeat(60_000));
        assert!(FieldType::parse(&huge).is_err());
    }

    #[test]
    fn test_field_rejects_void() {
        assert!(FieldType::parse("V").is_err());
        assert!(FieldType::parse("Lapp/A;x").is_err());
    }
}
