//! Module reader
//!
//! Single forward pass over the bytes. The constant pool is read first and
//! every later reference is resolved through it immediately.

use crate::attribute_names::{ANNOTATIONS, CODE, LINE_NUMBERS};
use crate::code::opcodes::*;
use crate::pool::{tags, ConstantPool, RawConstant};
use crate::{
    AccessFlags, Annotation, Code, ElementValue, FormatError, FormatResult, Insn, Label,
    LineEntry, Member, ModuleFile, RawAttribute, MAGIC, MAJOR_VERSION, MAX_NESTING,
};

/// Parse a complete module.
pub fn read_module(bytes: &[u8]) -> FormatResult<ModuleFile> {
    ModuleReader::new(bytes).read()
}

/// Cursor over module bytes.
pub struct ModuleReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ModuleReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read the whole module, rejecting trailing bytes.
    pub fn read(mut self) -> FormatResult<ModuleFile> {
        let magic = self.u32()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic });
        }
        let minor_version = self.u16()?;
        let major_version = self.u16()?;
        if major_version != MAJOR_VERSION {
            return Err(FormatError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let pool = self.read_pool()?;

        let access = AccessFlags::from_bits_retain(self.u16()?);
        let name = pool.type_name(self.u16()?)?;
        let super_name = pool.optional_type_name(self.u16()?)?;

        let interface_count = self.u16()?;
        let mut interfaces = Vec::with_capacity(usize::from(interface_count));
        for _ in 0..interface_count {
            interfaces.push(pool.type_name(self.u16()?)?);
        }

        let member_count = self.u16()?;
        let mut members = Vec::with_capacity(usize::from(member_count));
        for _ in 0..member_count {
            members.push(self.read_member(&pool)?);
        }

        let mut annotations = Vec::new();
        let mut attributes = Vec::new();
        let attr_count = self.u16()?;
        for _ in 0..attr_count {
            let (attr_name, data) = self.read_attribute(&pool)?;
            if attr_name == ANNOTATIONS {
                annotations = read_annotations(&attr_name, data, &pool)?;
            } else {
                attributes.push(RawAttribute {
                    name: attr_name,
                    data: data.to_vec(),
                });
            }
        }

        if self.pos != self.data.len() {
            return Err(FormatError::TrailingBytes {
                count: self.data.len() - self.pos,
            });
        }

        Ok(ModuleFile {
            minor_version,
            major_version,
            access,
            name,
            super_name,
            interfaces,
            members,
            annotations,
            attributes,
        })
    }

    fn read_pool(&mut self) -> FormatResult<ConstantPool> {
        let count = self.u16()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let offset = self.pos;
            let tag = self.u8()?;
            let entry = match tag {
                tags::UTF8 => {
                    let len = usize::from(self.u16()?);
                    let bytes = self.bytes(len)?;
                    let text = std::str::from_utf8(bytes)
                        .map_err(|_| FormatError::InvalidUtf8 { offset })?;
                    RawConstant::Utf8(text.to_string())
                }
                tags::INT => RawConstant::Int(self.i32()?),
                tags::TYPE => RawConstant::Type(self.u16()?),
                tags::STR => RawConstant::Str(self.u16()?),
                tags::MEMBER_REF => RawConstant::MemberRef {
                    owner: self.u16()?,
                    name: self.u16()?,
                    descriptor: self.u16()?,
                },
                _ => return Err(FormatError::UnknownConstantTag { tag, offset }),
            };
            entries.push(entry);
        }
        Ok(ConstantPool::new(entries))
    }

    fn read_member(&mut self, pool: &ConstantPool) -> FormatResult<Member> {
        let access = AccessFlags::from_bits_retain(self.u16()?);
        let name = pool.utf8(self.u16()?)?.to_string();
        let descriptor = pool.utf8(self.u16()?)?.to_string();
        let mut member = Member::new(access, name, descriptor);

        let attr_count = self.u16()?;
        for _ in 0..attr_count {
            let (attr_name, data) = self.read_attribute(pool)?;
            match attr_name.as_str() {
                ANNOTATIONS => member.annotations = read_annotations(&attr_name, data, pool)?,
                CODE => member.code = Some(read_code(&member.name, data, pool)?),
                _ => member.attributes.push(RawAttribute {
                    name: attr_name,
                    data: data.to_vec(),
                }),
            }
        }
        Ok(member)
    }

    fn read_attribute(&mut self, pool: &ConstantPool) -> FormatResult<(String, &'a [u8])> {
        let name = pool.utf8(self.u16()?)?.to_string();
        let len = self.u32()? as usize;
        let data = self.bytes(len)?;
        Ok((name, data))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn bytes(&mut self, n: usize) -> FormatResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(FormatError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> FormatResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> FormatResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> FormatResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn i16(&mut self) -> FormatResult<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> FormatResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> FormatResult<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn finish_attribute(&self, name: &str) -> FormatResult<()> {
        if self.pos != self.data.len() {
            return Err(FormatError::AttributeLength {
                name: name.to_string(),
                declared: self.data.len(),
                consumed: self.pos,
            });
        }
        Ok(())
    }
}

// ============================================================================
// ATTRIBUTE PAYLOADS
// ============================================================================

fn read_annotations(name: &str, data: &[u8], pool: &ConstantPool) -> FormatResult<Vec<Annotation>> {
    let mut r = ModuleReader::new(data);
    let count = r.u16()?;
    let mut annotations = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let type_name = pool.utf8(r.u16()?)?.into();
        let pair_count = r.u16()?;
        let mut elements = Vec::with_capacity(usize::from(pair_count));
        for _ in 0..pair_count {
            let element_name = pool.utf8(r.u16()?)?.to_string();
            let value = read_element_value(&mut r, pool, 0)?;
            elements.push((element_name, value));
        }
        annotations.push(Annotation {
            type_name,
            elements,
        });
    }
    r.finish_attribute(name)?;
    Ok(annotations)
}

/// `depth` counts the arrays enclosing this value.
fn read_element_value(
    r: &mut ModuleReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> FormatResult<ElementValue> {
    let tag = r.u8()? as char;
    let value = match tag {
        's' => ElementValue::Str(pool.utf8(r.u16()?)?.to_string()),
        'I' => ElementValue::Int(pool.int(r.u16()?)?),
        'Z' => ElementValue::Bool(pool.int(r.u16()?)? != 0),
        'c' => ElementValue::Type(pool.utf8(r.u16()?)?.into()),
        '[' => {
            if depth == MAX_NESTING {
                return Err(FormatError::NestingTooDeep {
                    what: "element value",
                    limit: MAX_NESTING,
                });
            }
            let count = r.u16()?;
            let mut values = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                values.push(read_element_value(r, pool, depth + 1)?);
            }
            ElementValue::Array(values)
        }
        _ => return Err(FormatError::UnknownElementTag { tag }),
    };
    Ok(value)
}

/// Decoded instruction whose branch operand is still a byte offset.
enum Pending {
    Ready(Insn),
    Branch { opcode: u8, offset: usize, target: i64 },
}

fn read_code(member: &str, data: &[u8], pool: &ConstantPool) -> FormatResult<Code> {
    let mut r = ModuleReader::new(data);
    let max_stack = r.u16()?;
    let max_locals = r.u16()?;
    let code_len = r.u32()? as usize;
    let bytes = r.bytes(code_len)?;

    // First pass: decode and remember where each instruction starts.
    let mut starts: Vec<Option<usize>> = vec![None; code_len + 1];
    let mut pending = Vec::new();
    let mut c = ModuleReader::new(bytes);
    while c.remaining() > 0 {
        let offset = c.pos;
        starts[offset] = Some(pending.len());
        let opcode = c.u8()?;
        let insn = match opcode {
            NOP => Insn::Nop,
            ACONST_NULL => Insn::AconstNull,
            LDC => Insn::Ldc(pool.loadable(c.u16()?)?),
            ALOAD => Insn::Aload(c.u8()?),
            ASTORE => Insn::Astore(c.u8()?),
            POP => Insn::Pop,
            DUP => Insn::Dup,
            ARETURN => Insn::Areturn,
            RETURN => Insn::Return,
            ATHROW => Insn::Athrow,
            GETSTATIC => Insn::GetStatic(pool.member_ref(c.u16()?)?),
            PUTSTATIC => Insn::PutStatic(pool.member_ref(c.u16()?)?),
            INVOKEVIRTUAL => Insn::InvokeVirtual(pool.member_ref(c.u16()?)?),
            INVOKESPECIAL => Insn::InvokeSpecial(pool.member_ref(c.u16()?)?),
            INVOKESTATIC => Insn::InvokeStatic(pool.member_ref(c.u16()?)?),
            NEW => Insn::New(pool.type_name(c.u16()?)?),
            GOTO | IFNULL | IFNONNULL => {
                let delta = c.i16()?;
                pending.push(Pending::Branch {
                    opcode,
                    offset,
                    target: offset as i64 + i64::from(delta),
                });
                continue;
            }
            _ => {
                return Err(FormatError::UnknownOpcode {
                    member: member.to_string(),
                    opcode,
                    offset,
                })
            }
        };
        pending.push(Pending::Ready(insn));
    }

    // Second pass: byte offsets become instruction indices.
    let resolve = |offset: usize, target: i64| -> FormatResult<Label> {
        usize::try_from(target)
            .ok()
            .filter(|t| *t < code_len)
            .and_then(|t| starts[t])
            .map(Label)
            .ok_or_else(|| FormatError::BadBranchTarget {
                member: member.to_string(),
                offset,
                target,
            })
    };
    let mut instructions = Vec::with_capacity(pending.len());
    for p in pending {
        let insn = match p {
            Pending::Ready(insn) => insn,
            Pending::Branch {
                opcode,
                offset,
                target,
            } => {
                let label = resolve(offset, target)?;
                match opcode {
                    GOTO => Insn::Goto(label),
                    IFNULL => Insn::IfNull(label),
                    _ => Insn::IfNonNull(label),
                }
            }
        };
        instructions.push(insn);
    }

    let mut lines = Vec::new();
    let attr_count = r.u16()?;
    for _ in 0..attr_count {
        let (attr_name, payload) = r.read_attribute(pool)?;
        if attr_name != LINE_NUMBERS {
            return Err(FormatError::UnsupportedCodeAttribute {
                member: member.to_string(),
                name: attr_name,
            });
        }
        let mut l = ModuleReader::new(payload);
        let count = l.u16()?;
        for _ in 0..count {
            let pc = usize::from(l.u16()?);
            let line = l.u16()?;
            let insn = starts
                .get(pc)
                .copied()
                .flatten()
                .ok_or_else(|| FormatError::BadBranchTarget {
                    member: member.to_string(),
                    offset: pc,
                    target: pc as i64,
                })?;
            lines.push(LineEntry { insn, line });
        }
        l.finish_attribute(LINE_NUMBERS)?;
    }
    r.finish_attribute(CODE)?;

    Ok(Code {
        max_stack,
        max_locals,
        instructions,
        lines,
    })
}
