//! Constant pool
//!
//! The reader resolves every reference through [`ConstantPool`]; the writer
//! rebuilds a fresh pool with [`PoolBuilder`], deduplicated and ordered by
//! first use, so the pool is never carried over from the input.

use crate::{FormatError, FormatResult, Loadable, MemberRef};
use registrar_core::TypeName;
use std::collections::HashMap;

pub mod tags {
    pub const UTF8: u8 = 1;
    pub const INT: u8 = 3;
    pub const TYPE: u8 = 7;
    pub const STR: u8 = 8;
    pub const MEMBER_REF: u8 = 10;
}

/// A pool entry as stored: references are pool indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawConstant {
    Utf8(String),
    Int(i32),
    Type(u16),
    Str(u16),
    MemberRef { owner: u16, name: u16, descriptor: u16 },
}

impl RawConstant {
    pub fn tag(&self) -> u8 {
        match self {
            RawConstant::Utf8(_) => tags::UTF8,
            RawConstant::Int(_) => tags::INT,
            RawConstant::Type(_) => tags::TYPE,
            RawConstant::Str(_) => tags::STR,
            RawConstant::MemberRef { .. } => tags::MEMBER_REF,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RawConstant::Utf8(_) => "Utf8",
            RawConstant::Int(_) => "Int",
            RawConstant::Type(_) => "Type",
            RawConstant::Str(_) => "Str",
            RawConstant::MemberRef { .. } => "MemberRef",
        }
    }
}

// ============================================================================
// READ SIDE
// ============================================================================

/// Pool of a module being read. Index 0 is never valid.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<RawConstant>,
}

impl ConstantPool {
    pub fn new(entries: Vec<RawConstant>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> FormatResult<&RawConstant> {
        if index == 0 {
            return Err(FormatError::BadPoolIndex { index });
        }
        self.entries
            .get(usize::from(index) - 1)
            .ok_or(FormatError::BadPoolIndex { index })
    }

    pub fn utf8(&self, index: u16) -> FormatResult<&str> {
        match self.get(index)? {
            RawConstant::Utf8(s) => Ok(s),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub fn int(&self, index: u16) -> FormatResult<i32> {
        match self.get(index)? {
            RawConstant::Int(v) => Ok(*v),
            other => Err(mismatch(index, "Int", other)),
        }
    }

    pub fn type_name(&self, index: u16) -> FormatResult<TypeName> {
        match self.get(index)? {
            RawConstant::Type(name) => Ok(TypeName::new(self.utf8(*name)?)),
            other => Err(mismatch(index, "Type", other)),
        }
    }

    /// `0` means absent.
    pub fn optional_type_name(&self, index: u16) -> FormatResult<Option<TypeName>> {
        if index == 0 {
            return Ok(None);
        }
        self.type_name(index).map(Some)
    }

    pub fn member_ref(&self, index: u16) -> FormatResult<MemberRef> {
        match self.get(index)? {
            RawConstant::MemberRef {
                owner,
                name,
                descriptor,
            } => Ok(MemberRef {
                owner: self.type_name(*owner)?,
                name: self.utf8(*name)?.to_string(),
                descriptor: self.utf8(*descriptor)?.to_string(),
            }),
            other => Err(mismatch(index, "MemberRef", other)),
        }
    }

    pub fn loadable(&self, index: u16) -> FormatResult<Loadable> {
        match self.get(index)? {
            RawConstant::Int(v) => Ok(Loadable::Int(*v)),
            RawConstant::Str(s) => Ok(Loadable::Str(self.utf8(*s)?.to_string())),
            RawConstant::Type(_) => Ok(Loadable::Type(self.type_name(index)?)),
            other => Err(mismatch(index, "loadable constant", other)),
        }
    }
}

fn mismatch(index: u16, expected: &'static str, found: &RawConstant) -> FormatError {
    FormatError::PoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

// ============================================================================
// WRITE SIDE
// ============================================================================

/// Deduplicating pool under construction.
#[derive(Debug, Default)]
pub struct PoolBuilder {
    entries: Vec<RawConstant>,
    index: HashMap<RawConstant, u16>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[RawConstant] {
        &self.entries
    }

    fn intern(&mut self, constant: RawConstant) -> FormatResult<u16> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }
        let next = self.entries.len() + 1;
        let idx = u16::try_from(next).map_err(|_| FormatError::LimitExceeded {
            what: "constant pool",
            count: next,
            limit: u16::MAX as usize,
        })?;
        self.entries.push(constant.clone());
        self.index.insert(constant, idx);
        Ok(idx)
    }

    pub fn utf8(&mut self, value: &str) -> FormatResult<u16> {
        if value.len() > u16::MAX as usize {
            return Err(FormatError::LimitExceeded {
                what: "UTF-8 constant length",
                count: value.len(),
                limit: u16::MAX as usize,
            });
        }
        self.intern(RawConstant::Utf8(value.to_string()))
    }

    pub fn int(&mut self, value: i32) -> FormatResult<u16> {
        self.intern(RawConstant::Int(value))
    }

    pub fn type_name(&mut self, name: &TypeName) -> FormatResult<u16> {
        let utf8 = self.utf8(name.as_str())?;
        self.intern(RawConstant::Type(utf8))
    }

    pub fn string(&mut self, value: &str) -> FormatResult<u16> {
        let utf8 = self.utf8(value)?;
        self.intern(RawConstant::Str(utf8))
    }

    pub fn member_ref(&mut self, member: &MemberRef) -> FormatResult<u16> {
        let owner = self.type_name(&member.owner)?;
        let name = self.utf8(&member.name)?;
        let descriptor = self.utf8(&member.descriptor)?;
        self.intern(RawConstant::MemberRef {
            owner,
            name,
            descriptor,
        })
    }

    pub fn loadable(&mut self, value: &Loadable) -> FormatResult<u16> {
        match value {
            Loadable::Int(v) => self.int(*v),
            Loadable::Str(s) => self.string(s),
            Loadable::Type(t) => self.type_name(t),
        }
    }
}
