//! Instructions and code bodies
//!
//! Branches refer to instruction indices ([`Label`]), never to byte offsets,
//! so instructions can be inserted without touching any offset table.

use crate::{FieldType, FormatError, FormatResult, MethodDescriptor};
use registrar_core::TypeName;
use std::fmt;

/// Opcode bytes of the supported instruction set.
pub mod opcodes {
    pub const NOP: u8 = 0x00;
    pub const ACONST_NULL: u8 = 0x01;
    pub const LDC: u8 = 0x12;
    pub const ALOAD: u8 = 0x19;
    pub const ASTORE: u8 = 0x3a;
    pub const POP: u8 = 0x57;
    pub const DUP: u8 = 0x59;
    pub const GOTO: u8 = 0xa7;
    pub const ARETURN: u8 = 0xb0;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const NEW: u8 = 0xbb;
    pub const ATHROW: u8 = 0xbf;
    pub const IFNULL: u8 = 0xc6;
    pub const IFNONNULL: u8 = 0xc7;
}

/// Index of the instruction a branch jumps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub usize);

/// Symbolic reference to a member of some module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: TypeName,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(owner: impl Into<TypeName>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Constant pushed by `ldc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Loadable {
    Int(i32),
    Str(String),
    Type(TypeName),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Insn {
    Nop,
    AconstNull,
    Ldc(Loadable),
    Aload(u8),
    Astore(u8),
    Pop,
    Dup,
    Goto(Label),
    IfNull(Label),
    IfNonNull(Label),
    Areturn,
    Return,
    Athrow,
    GetStatic(MemberRef),
    PutStatic(MemberRef),
    InvokeVirtual(MemberRef),
    InvokeSpecial(MemberRef),
    InvokeStatic(MemberRef),
    New(TypeName),
}

impl Insn {
    pub fn opcode(&self) -> u8 {
        use opcodes::*;
        match self {
            Insn::Nop => NOP,
            Insn::AconstNull => ACONST_NULL,
            Insn::Ldc(_) => LDC,
            Insn::Aload(_) => ALOAD,
            Insn::Astore(_) => ASTORE,
            Insn::Pop => POP,
            Insn::Dup => DUP,
            Insn::Goto(_) => GOTO,
            Insn::IfNull(_) => IFNULL,
            Insn::IfNonNull(_) => IFNONNULL,
            Insn::Areturn => ARETURN,
            Insn::Return => RETURN,
            Insn::Athrow => ATHROW,
            Insn::GetStatic(_) => GETSTATIC,
            Insn::PutStatic(_) => PUTSTATIC,
            Insn::InvokeVirtual(_) => INVOKEVIRTUAL,
            Insn::InvokeSpecial(_) => INVOKESPECIAL,
            Insn::InvokeStatic(_) => INVOKESTATIC,
            Insn::New(_) => NEW,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Insn::Aload(_) | Insn::Astore(_) => 2,
            Insn::Ldc(_)
            | Insn::Goto(_)
            | Insn::IfNull(_)
            | Insn::IfNonNull(_)
            | Insn::GetStatic(_)
            | Insn::PutStatic(_)
            | Insn::InvokeVirtual(_)
            | Insn::InvokeSpecial(_)
            | Insn::InvokeStatic(_)
            | Insn::New(_) => 3,
            _ => 1,
        }
    }

    pub fn branch_target(&self) -> Option<Label> {
        match self {
            Insn::Goto(l) | Insn::IfNull(l) | Insn::IfNonNull(l) => Some(*l),
            _ => None,
        }
    }

    fn branch_target_mut(&mut self) -> Option<&mut Label> {
        match self {
            Insn::Goto(l) | Insn::IfNull(l) | Insn::IfNonNull(l) => Some(l),
            _ => None,
        }
    }

    /// Control never reaches the next instruction.
    pub fn ends_flow(&self) -> bool {
        matches!(self, Insn::Goto(_) | Insn::Areturn | Insn::Return | Insn::Athrow)
    }

    /// Values popped and pushed.
    fn stack_effect(&self) -> FormatResult<(u16, u16)> {
        let effect = match self {
            Insn::Nop | Insn::Goto(_) | Insn::Return => (0, 0),
            Insn::AconstNull | Insn::Ldc(_) | Insn::Aload(_) | Insn::New(_) => (0, 1),
            Insn::Astore(_) | Insn::Pop | Insn::IfNull(_) | Insn::IfNonNull(_) => (1, 0),
            Insn::Areturn | Insn::Athrow => (1, 0),
            Insn::Dup => (1, 2),
            Insn::GetStatic(field) => {
                FieldType::parse(&field.descriptor)?;
                (0, 1)
            }
            Insn::PutStatic(field) => {
                FieldType::parse(&field.descriptor)?;
                (1, 0)
            }
            Insn::InvokeStatic(m) => invoke_effect(m, false)?,
            Insn::InvokeVirtual(m) | Insn::InvokeSpecial(m) => invoke_effect(m, true)?,
        };
        Ok(effect)
    }
}

fn invoke_effect(member: &MemberRef, has_receiver: bool) -> FormatResult<(u16, u16)> {
    let desc = MethodDescriptor::parse(&member.descriptor)?;
    let pops = desc.params.len() + usize::from(has_receiver);
    let pops = u16::try_from(pops).map_err(|_| FormatError::LimitExceeded {
        what: "parameter count",
        count: pops,
        limit: u16::MAX as usize,
    })?;
    Ok((pops, u16::from(!desc.is_void())))
}

/// Source line of the instruction at `insn` and of those following it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineEntry {
    pub insn: usize,
    pub line: u16,
}

/// Body of a method member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Insn>,
    pub lines: Vec<LineEntry>,
}

impl Code {
    pub fn new(instructions: Vec<Insn>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    /// Insert `insns` before the instruction at `at`.
    ///
    /// Branches that targeted `at` now reach the inserted block; later targets
    /// shift by the inserted length. Labels inside `insns` are taken as final.
    pub fn insert(&mut self, at: usize, insns: Vec<Insn>) {
        let n = insns.len();
        if n == 0 {
            return;
        }
        for insn in &mut self.instructions {
            if let Some(label) = insn.branch_target_mut() {
                if label.0 > at {
                    label.0 += n;
                }
            }
        }
        for entry in &mut self.lines {
            if entry.insn >= at {
                entry.insn += n;
            }
        }
        let tail = self.instructions.split_off(at.min(self.instructions.len()));
        self.instructions.extend(insns);
        self.instructions.extend(tail);
    }

    /// Indices of every `return` instruction.
    pub fn return_sites(&self) -> Vec<usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter(|(_, insn)| matches!(insn, Insn::Return))
            .map(|(i, _)| i)
            .collect()
    }

    /// Maximum operand stack depth over every reachable path.
    ///
    /// Fails on underflow, inconsistent depths where paths merge, branches to
    /// missing instructions, and control falling past the last instruction.
    pub fn compute_max_stack(&self, member: &str) -> FormatResult<u16> {
        let len = self.instructions.len();
        if len == 0 {
            return Err(FormatError::FallsOffEnd {
                member: member.to_string(),
            });
        }
        let mut depths: Vec<Option<u16>> = vec![None; len];
        let mut worklist = vec![0usize];
        depths[0] = Some(0);
        let mut max = 0u16;

        while let Some(at) = worklist.pop() {
            let insn = &self.instructions[at];
            let depth = depths[at].unwrap_or(0);
            let (pops, pushes) = insn.stack_effect()?;
            if depth < pops {
                return Err(FormatError::StackUnderflow {
                    member: member.to_string(),
                    at,
                });
            }
            let next = (depth - pops).checked_add(pushes).ok_or(FormatError::LimitExceeded {
                what: "operand stack",
                count: usize::from(depth - pops) + usize::from(pushes),
                limit: u16::MAX as usize,
            })?;
            max = max.max(next).max(depth);

            let mut successors = Vec::with_capacity(2);
            if let Some(Label(target)) = insn.branch_target() {
                if target >= len {
                    return Err(FormatError::BadLabel {
                        member: member.to_string(),
                        label: target,
                    });
                }
                successors.push(target);
            }
            if !insn.ends_flow() {
                if at + 1 >= len {
                    return Err(FormatError::FallsOffEnd {
                        member: member.to_string(),
                    });
                }
                successors.push(at + 1);
            }
            for succ in successors {
                match depths[succ] {
                    Some(existing) if existing != next => {
                        return Err(FormatError::StackMismatch {
                            member: member.to_string(),
                            at: succ,
                            first: existing,
                            second: next,
                        });
                    }
                    Some(_) => {}
                    None => {
                        depths[succ] = Some(next);
                        worklist.push(succ);
                    }
                }
            }
        }
        Ok(max)
    }

    /// Local slots touched by `aload`/`astore`.
    pub fn used_locals(&self) -> u16 {
        self.instructions
            .iter()
            .filter_map(|insn| match insn {
                Insn::Aload(i) | Insn::Astore(i) => Some(u16::from(*i) + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Local slots occupied by parameters (plus the receiver of instance members).
pub fn parameter_slots(descriptor: &str, is_static: bool) -> FormatResult<u16> {
    let desc = MethodDescriptor::parse(descriptor)?;
    let slots = desc.params.len() + usize::from(!is_static);
    u16::try_from(slots).map_err(|_| FormatError::LimitExceeded {
        what: "parameter count",
        count: slots,
        limit: u16::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(owner: &str, name: &str, desc: &str) -> Insn {
        Insn::InvokeStatic(MemberRef::new(owner, name, desc))
    }

    #[test]
    fn test_max_stack_of_call_chain() {
        let code = Code::new(vec![
            invoke("app/D", "create", "()Lapp/D;"),
            invoke("app/C", "register", "(Lapp/D;)V"),
            Insn::New("app/E".into()),
            Insn::Dup,
            Insn::InvokeSpecial(MemberRef::new("app/E", "<init>", "()V")),
            Insn::Pop,
            Insn::Return,
        ]);
        assert_eq!(code.compute_max_stack("<clinit>").unwrap(), 2);
    }

    #[test]
    fn test_underflow_detected() {
        let code = Code::new(vec![Insn::Pop, Insn::Return]);
        assert!(matches!(
            code.compute_max_stack("m"),
            Err(FormatError::StackUnderflow { at: 0, .. })
        ));
    }

    #[test]
    fn test_stack_overflow_is_limit_error() {
        let mut insns = vec![Insn::AconstNull; usize::from(u16::MAX) + 1];
        insns.push(Insn::Return);
        let code = Code::new(insns);
        assert!(matches!(
            code.compute_max_stack("m"),
            Err(FormatError::LimitExceeded { what: "operand stack", .. })
        ));
    }

    #[test]
    fn test_falls_off_end() {
        let code = Code::new(vec![Insn::Nop]);
        assert!(matches!(
            code.compute_max_stack("m"),
            Err(FormatError::FallsOffEnd { .. })
        ));
    }

    #[test]
    fn test_merge_mismatch() {
        // ifnull jumps to index 3 with depth 0, fallthrough reaches it with 1.
        let code = Code::new(vec![
            Insn::AconstNull,
            Insn::IfNull(Label(3)),
            Insn::AconstNull,
            Insn::Return,
        ]);
        assert!(matches!(
            code.compute_max_stack("m"),
            Err(FormatError::StackMismatch { at: 3, .. })
        ));
    }

    #[test]
    fn test_insert_retargets_branches() {
        let mut code = Code::new(vec![
            Insn::AconstNull,
            Insn::IfNull(Label(3)),
            Insn::Goto(Label(4)),
            Insn::Return,
            Insn::Return,
        ]);
        code.lines = vec![LineEntry { insn: 0, line: 1 }, LineEntry { insn: 3, line: 9 }];
        code.insert(3, vec![Insn::Nop, Insn::Nop]);

        assert_eq!(code.instructions[1], Insn::IfNull(Label(3)));
        assert_eq!(code.instructions[2], Insn::Goto(Label(6)));
        assert_eq!(code.instructions[3], Insn::Nop);
        assert_eq!(code.instructions[5], Insn::Return);
        assert_eq!(code.lines[1], LineEntry { insn: 5, line: 9 });
        assert!(code.compute_max_stack("m").is_ok());
    }

    #[test]
    fn test_return_sites_and_locals() {
        let code = Code::new(vec![
            Insn::Aload(2),
            Insn::IfNonNull(Label(2)),
            Insn::Return,
            Insn::Astore(0),
            Insn::Return,
        ]);
        assert_eq!(code.return_sites(), vec![2, 4]);
        assert_eq!(code.used_locals(), 3);
    }

    #[test]
    fn test_parameter_slots() {
        assert_eq!(parameter_slots("(Lapp/A;I)V", true).unwrap(), 2);
        assert_eq!(parameter_slots("()V", false).unwrap(), 1);
    }
}
