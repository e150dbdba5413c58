//! Module writer
//!
//! The body is serialized first while the constant pool is built on the side;
//! the header and pool are prepended once every constant is known. Branch
//! offsets, code lengths, line tables and stack sizes are always recomputed.

use crate::attribute_names::{ANNOTATIONS, CODE, LINE_NUMBERS};
use crate::code::parameter_slots;
use crate::pool::{PoolBuilder, RawConstant};
use crate::{
    Annotation, Code, ElementValue, FormatError, FormatResult, Insn, Member, ModuleFile,
    RawAttribute, MAGIC,
};

/// Serialize a module.
pub fn write_module(module: &ModuleFile) -> FormatResult<Vec<u8>> {
    ModuleWriter::new().write(module)
}

#[derive(Debug, Default)]
pub struct ModuleWriter {
    pool: PoolBuilder,
}

impl ModuleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, module: &ModuleFile) -> FormatResult<Vec<u8>> {
        let mut body = Vec::new();
        put_u16(&mut body, module.access.bits());
        put_u16(&mut body, self.pool.type_name(&module.name)?);
        let super_idx = match &module.super_name {
            Some(name) => self.pool.type_name(name)?,
            None => 0,
        };
        put_u16(&mut body, super_idx);

        put_u16(&mut body, count("interfaces", module.interfaces.len())?);
        for interface in &module.interfaces {
            put_u16(&mut body, self.pool.type_name(interface)?);
        }

        put_u16(&mut body, count("members", module.members.len())?);
        for member in &module.members {
            self.write_member(&mut body, member)?;
        }

        let mut attributes = Vec::new();
        if !module.annotations.is_empty() {
            attributes.push((ANNOTATIONS.to_string(), self.annotations(&module.annotations)?));
        }
        for raw in &module.attributes {
            attributes.push((raw.name.clone(), raw.data.clone()));
        }
        self.write_attributes(&mut body, attributes)?;

        let mut out = Vec::with_capacity(body.len() + 64);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u16(&mut out, module.minor_version);
        put_u16(&mut out, module.major_version);
        write_pool(&mut out, self.pool.entries())?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn write_member(&mut self, out: &mut Vec<u8>, member: &Member) -> FormatResult<()> {
        put_u16(out, member.access.bits());
        put_u16(out, self.pool.utf8(&member.name)?);
        put_u16(out, self.pool.utf8(&member.descriptor)?);

        let mut attributes = Vec::new();
        if let Some(code) = &member.code {
            attributes.push((CODE.to_string(), self.code(member, code)?));
        }
        if !member.annotations.is_empty() {
            attributes.push((ANNOTATIONS.to_string(), self.annotations(&member.annotations)?));
        }
        for RawAttribute { name, data } in &member.attributes {
            attributes.push((name.clone(), data.clone()));
        }
        self.write_attributes(out, attributes)
    }

    fn write_attributes(&mut self, out: &mut Vec<u8>, attributes: Vec<(String, Vec<u8>)>) -> FormatResult<()> {
        put_u16(out, count("attributes", attributes.len())?);
        for (name, data) in attributes {
            put_u16(out, self.pool.utf8(&name)?);
            let len = u32::try_from(data.len()).map_err(|_| FormatError::LimitExceeded {
                what: "attribute length",
                count: data.len(),
                limit: u32::MAX as usize,
            })?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&data);
        }
        Ok(())
    }

    fn annotations(&mut self, annotations: &[Annotation]) -> FormatResult<Vec<u8>> {
        let mut out = Vec::new();
        put_u16(&mut out, count("annotations", annotations.len())?);
        for annotation in annotations {
            put_u16(&mut out, self.pool.utf8(annotation.type_name.as_str())?);
            put_u16(&mut out, count("annotation elements", annotation.elements.len())?);
            for (name, value) in &annotation.elements {
                put_u16(&mut out, self.pool.utf8(name)?);
                self.element_value(&mut out, value)?;
            }
        }
        Ok(out)
    }

    fn element_value(&mut self, out: &mut Vec<u8>, value: &ElementValue) -> FormatResult<()> {
        match value {
            ElementValue::Str(s) => {
                out.push(b's');
                put_u16(out, self.pool.utf8(s)?);
            }
            ElementValue::Int(v) => {
                out.push(b'I');
                put_u16(out, self.pool.int(*v)?);
            }
            ElementValue::Bool(v) => {
                out.push(b'Z');
                put_u16(out, self.pool.int(i32::from(*v))?);
            }
            ElementValue::Type(t) => {
                out.push(b'c');
                put_u16(out, self.pool.utf8(t.as_str())?);
            }
            ElementValue::Array(values) => {
                out.push(b'[');
                put_u16(out, count("array elements", values.len())?);
                for v in values {
                    self.element_value(out, v)?;
                }
            }
        }
        Ok(())
    }

    fn code(&mut self, member: &Member, code: &Code) -> FormatResult<Vec<u8>> {
        let max_stack = code.compute_max_stack(&member.name)?;
        let max_locals = code
            .max_locals
            .max(code.used_locals())
            .max(parameter_slots(&member.descriptor, member.is_static())?);

        // Offsets are fixed by instruction sizes, so they are known up front.
        let mut offsets = Vec::with_capacity(code.instructions.len() + 1);
        let mut pc = 0usize;
        for insn in &code.instructions {
            offsets.push(pc);
            pc += insn.size();
        }
        offsets.push(pc);
        let code_len = u32::try_from(pc).map_err(|_| FormatError::LimitExceeded {
            what: "code length",
            count: pc,
            limit: u32::MAX as usize,
        })?;

        let mut bytes = Vec::with_capacity(pc);
        for (at, insn) in code.instructions.iter().enumerate() {
            bytes.push(insn.opcode());
            match insn {
                Insn::Ldc(value) => put_u16(&mut bytes, self.pool.loadable(value)?),
                Insn::Aload(slot) | Insn::Astore(slot) => bytes.push(*slot),
                Insn::Goto(label) | Insn::IfNull(label) | Insn::IfNonNull(label) => {
                    let target = offsets.get(label.0).filter(|_| label.0 < code.instructions.len()).ok_or_else(|| {
                        FormatError::BadLabel {
                            member: member.name.clone(),
                            label: label.0,
                        }
                    })?;
                    let delta = *target as i64 - offsets[at] as i64;
                    let delta = i16::try_from(delta).map_err(|_| FormatError::BranchOutOfRange {
                        member: member.name.clone(),
                        at,
                    })?;
                    bytes.extend_from_slice(&delta.to_be_bytes());
                }
                Insn::GetStatic(m)
                | Insn::PutStatic(m)
                | Insn::InvokeVirtual(m)
                | Insn::InvokeSpecial(m)
                | Insn::InvokeStatic(m) => put_u16(&mut bytes, self.pool.member_ref(m)?),
                Insn::New(t) => put_u16(&mut bytes, self.pool.type_name(t)?),
                _ => {}
            }
        }

        let mut out = Vec::with_capacity(bytes.len() + 16);
        put_u16(&mut out, max_stack);
        put_u16(&mut out, max_locals);
        out.extend_from_slice(&code_len.to_be_bytes());
        out.extend_from_slice(&bytes);

        let mut nested = Vec::new();
        if !code.lines.is_empty() {
            let mut table = Vec::new();
            put_u16(&mut table, count("line entries", code.lines.len())?);
            for entry in &code.lines {
                let pc = offsets
                    .get(entry.insn)
                    .filter(|_| entry.insn < code.instructions.len())
                    .ok_or_else(|| FormatError::BadLabel {
                        member: member.name.clone(),
                        label: entry.insn,
                    })?;
                let pc = u16::try_from(*pc).map_err(|_| FormatError::LimitExceeded {
                    what: "line table offset",
                    count: *pc,
                    limit: u16::MAX as usize,
                })?;
                put_u16(&mut table, pc);
                put_u16(&mut table, entry.line);
            }
            nested.push((LINE_NUMBERS.to_string(), table));
        }
        self.write_attributes(&mut out, nested)?;
        Ok(out)
    }
}

fn write_pool(out: &mut Vec<u8>, entries: &[RawConstant]) -> FormatResult<()> {
    put_u16(out, count("constant pool", entries.len())?);
    for entry in entries {
        out.push(entry.tag());
        match entry {
            RawConstant::Utf8(s) => {
                put_u16(out, count("UTF-8 constant length", s.len())?);
                out.extend_from_slice(s.as_bytes());
            }
            RawConstant::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            RawConstant::Type(idx) | RawConstant::Str(idx) => put_u16(out, *idx),
            RawConstant::MemberRef {
                owner,
                name,
                descriptor,
            } => {
                put_u16(out, *owner);
                put_u16(out, *name);
                put_u16(out, *descriptor);
            }
        }
    }
    Ok(())
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn count(what: &'static str, n: usize) -> FormatResult<u16> {
    u16::try_from(n).map_err(|_| FormatError::LimitExceeded {
        what,
        count: n,
        limit: u16::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{read_module, AccessFlags, Label, LineEntry, MemberRef};

    fn sample() -> ModuleFile {
        let mut module = ModuleFile::new("app/Host");
        module.interfaces.push("app/Registry".into());
        module
            .annotations
            .push(Annotation::new("app/Plugins").with("value", ElementValue::Int(3)));
        let mut init = Member::new(AccessFlags::STATIC, "<clinit>", "()V");
        let mut code = Code::new(vec![
            Insn::GetStatic(MemberRef::new("app/Host", "cache", "Lapp/Cache;")),
            Insn::IfNonNull(Label(3)),
            Insn::Nop,
            Insn::Return,
        ]);
        code.lines.push(LineEntry { insn: 3, line: 12 });
        init.code = Some(code);
        module.members.push(init);
        module
    }

    #[test]
    fn test_write_then_read_recomputes_stack() {
        let bytes = write_module(&sample()).unwrap();
        let read = read_module(&bytes).unwrap();
        let code = read.members[0].code.as_ref().unwrap();
        assert_eq!(code.max_stack, 1);
        assert_eq!(code.instructions[1], Insn::IfNonNull(Label(3)));
        assert_eq!(code.lines, vec![LineEntry { insn: 3, line: 12 }]);
        assert_eq!(read.annotations, sample().annotations);
    }

    #[test]
    fn test_output_is_a_fixed_point() {
        let first = write_module(&sample()).unwrap();
        let second = write_module(&read_module(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_label_rejected() {
        let mut module = sample();
        module.members[0].code = Some(Code::new(vec![Insn::Goto(Label(7)), Insn::Return]));
        assert!(matches!(
            write_module(&module),
            Err(FormatError::BadLabel { label: 7, .. })
        ));
    }

    #[test]
    fn test_max_locals_covers_parameters() {
        let mut module = ModuleFile::new("app/A");
        let mut member = Member::new(AccessFlags::STATIC, "accept", "(Lapp/B;Lapp/C;)V");
        member.code = Some(Code::new(vec![Insn::Return]));
        module.members.push(member);
        let read = read_module(&write_module(&module).unwrap()).unwrap();
        assert_eq!(read.members[0].code.as_ref().unwrap().max_locals, 2);
    }
}
