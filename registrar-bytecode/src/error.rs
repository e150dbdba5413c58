//! Codec errors

use thiserror::Error;

/// Errors raised while reading or writing a binary module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of input at offset {offset}: {needed} more bytes needed")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("bad magic 0x{found:08x}")]
    BadMagic { found: u32 },

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("unknown constant tag {tag} at offset {offset}")]
    UnknownConstantTag { tag: u8, offset: usize },

    #[error("invalid UTF-8 in constant at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("invalid constant pool index {index}")]
    BadPoolIndex { index: u16 },

    #[error("constant {index} is {found}, expected {expected}")]
    PoolTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },

    #[error("attribute {name}: declared {declared} bytes, consumed {consumed}")]
    AttributeLength {
        name: String,
        declared: usize,
        consumed: usize,
    },

    #[error("unknown element value tag '{tag}'")]
    UnknownElementTag { tag: char },

    #[error("unsupported code attribute {name} in {member}")]
    UnsupportedCodeAttribute { member: String, name: String },

    #[error("unknown opcode 0x{opcode:02x} at code offset {offset} in {member}")]
    UnknownOpcode {
        member: String,
        opcode: u8,
        offset: usize,
    },

    #[error("branch at code offset {offset} in {member} targets {target}, not an instruction boundary")]
    BadBranchTarget {
        member: String,
        offset: usize,
        target: i64,
    },

    #[error("label {label} in {member} is out of range")]
    BadLabel { member: String, label: usize },

    #[error("branch at instruction {at} in {member} is out of range")]
    BranchOutOfRange { member: String, at: usize },

    #[error("invalid descriptor {descriptor:?}: {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    #[error("stack underflow at instruction {at} in {member}")]
    StackUnderflow { member: String, at: usize },

    #[error("inconsistent stack depth at instruction {at} in {member}: {first} vs {second}")]
    StackMismatch {
        member: String,
        at: usize,
        first: u16,
        second: u16,
    },

    #[error("code of {member} falls off the end")]
    FallsOffEnd { member: String },

    #[error("{what} exceeds the format limit ({count} > {limit})")]
    LimitExceeded {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("{what} nests deeper than {limit} levels")]
    NestingTooDeep { what: &'static str, limit: usize },

    #[error("{count} trailing bytes after module end")]
    TrailingBytes { count: usize },
}

pub type FormatResult<T> = Result<T, FormatError>;
