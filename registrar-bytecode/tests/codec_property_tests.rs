//! Property-Based Tests for the Module Codec
//!
//! Property: for any well-formed module, writing it, reading it back and
//! writing again SHALL produce identical bytes, and the read model SHALL equal
//! the original apart from recomputed stack and local sizes.
//!
//! Property: the reader SHALL reject, never panic on, arbitrary input.

use proptest::prelude::*;
use registrar_bytecode::*;

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_type_name() -> impl Strategy<Value = registrar_core::TypeName> {
    ("[a-z]{1,6}", "[A-Z][a-zA-Z0-9]{0,8}").prop_map(|(pkg, name)| format!("{pkg}/{name}").into())
}

fn arb_element_value() -> impl Strategy<Value = ElementValue> {
    let leaf = prop_oneof![
        "[ -~]{0,12}".prop_map(ElementValue::Str),
        any::<i32>().prop_map(ElementValue::Int),
        any::<bool>().prop_map(ElementValue::Bool),
        arb_type_name().prop_map(ElementValue::Type),
    ];
    leaf.prop_recursive(2, 8, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(ElementValue::Array)
    })
}

fn arb_annotation() -> impl Strategy<Value = Annotation> {
    (
        arb_type_name(),
        prop::collection::vec(("[a-z]{1,8}", arb_element_value()), 0..3),
    )
        .prop_map(|(type_name, elements)| Annotation {
            type_name,
            elements,
        })
}

/// Straight-line code that keeps the stack balanced: each unit pushes one
/// value and pops it again.
fn arb_code() -> impl Strategy<Value = Code> {
    let unit = prop_oneof![
        Just(vec![Insn::Nop]),
        arb_type_name().prop_map(|t| vec![Insn::Ldc(Loadable::Type(t)), Insn::Pop]),
        any::<i32>().prop_map(|v| vec![Insn::Ldc(Loadable::Int(v)), Insn::Pop]),
        "[a-z ]{0,10}".prop_map(|s| vec![Insn::Ldc(Loadable::Str(s)), Insn::Pop]),
        arb_type_name().prop_map(|t| vec![
            Insn::New(t.clone()),
            Insn::Dup,
            Insn::InvokeSpecial(MemberRef::new(t, "<init>", "()V")),
            Insn::Pop,
        ]),
        (arb_type_name(), arb_type_name()).prop_map(|(owner, ret)| vec![
            Insn::InvokeStatic(MemberRef::new(owner, "make", format!("(){}", ret.descriptor()))),
            Insn::Pop,
        ]),
    ];
    prop::collection::vec(unit, 0..6).prop_map(|units| {
        let mut instructions: Vec<Insn> = units.into_iter().flatten().collect();
        instructions.push(Insn::Return);
        Code::new(instructions)
    })
}

fn arb_member() -> impl Strategy<Value = Member> {
    (
        any::<bool>(),
        "[a-z]{1,8}",
        prop::collection::vec(arb_annotation(), 0..2),
        prop::option::of(arb_code()),
    )
        .prop_map(|(is_static, name, annotations, code)| {
            let access = if is_static {
                AccessFlags::PUBLIC | AccessFlags::STATIC
            } else {
                AccessFlags::PUBLIC
            };
            let mut member = Member::new(access, name, "()V");
            member.annotations = annotations;
            member.code = code;
            member
        })
}

fn arb_module() -> impl Strategy<Value = ModuleFile> {
    (
        arb_type_name(),
        prop::option::of(arb_type_name()),
        prop::collection::vec(arb_type_name(), 0..3),
        prop::collection::vec(arb_member(), 0..4),
        prop::collection::vec(arb_annotation(), 0..3),
        prop::collection::vec(
            ("[A-Z][a-z]{2,8}", prop::collection::vec(any::<u8>(), 0..16)),
            0..2,
        ),
    )
        .prop_map(|(name, super_name, interfaces, members, annotations, raw)| {
            let mut module = ModuleFile::new(name);
            module.super_name = super_name;
            module.interfaces = interfaces;
            module.members = members;
            module.annotations = annotations;
            module.attributes = raw
                .into_iter()
                .filter(|(n, _)| n != attribute_names::ANNOTATIONS && n != attribute_names::CODE)
                .map(|(name, data)| RawAttribute { name, data })
                .collect();
            module
        })
}

/// Clear the sizes the writer recomputes.
fn without_sizes(mut module: ModuleFile) -> ModuleFile {
    for member in &mut module.members {
        if let Some(code) = &mut member.code {
            code.max_stack = 0;
            code.max_locals = 0;
        }
    }
    module
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_writer_output_is_fixed_point(module in arb_module()) {
        let first = write_module(&module).expect("write");
        let read = read_module(&first).expect("read");
        let second = write_module(&read).expect("rewrite");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(without_sizes(read), without_sizes(module));
    }

    #[test]
    fn prop_reader_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = read_module(&bytes);
    }

    #[test]
    fn prop_truncation_is_rejected(module in arb_module(), cut in 1usize..64) {
        let bytes = write_module(&module).expect("write");
        let keep = bytes.len().saturating_sub(cut);
        prop_assert!(read_module(&bytes[..keep]).is_err());
    }
}

#[test]
fn test_inserting_before_return_keeps_module_valid() {
    let mut module = ModuleFile::new("app/Host");
    let mut init = Member::new(AccessFlags::STATIC, "<clinit>", "()V");
    init.code = Some(Code::new(vec![
        Insn::AconstNull,
        Insn::IfNull(Label(3)),
        Insn::Return,
        Insn::Return,
    ]));
    module.members.push(init);

    let code = module.members[0].code.as_mut().unwrap();
    for at in code.return_sites().into_iter().rev() {
        code.insert(
            at,
            vec![
                Insn::InvokeStatic(MemberRef::new("app/D", "create", "()Lapp/D;")),
                Insn::InvokeStatic(MemberRef::new("app/Host", "register", "(Lapp/D;)V")),
            ],
        );
    }

    let bytes = write_module(&module).expect("write");
    let read = read_module(&bytes).expect("read");
    let code = read.members[0].code.as_ref().unwrap();
    assert_eq!(code.instructions.len(), 8);
    assert_eq!(code.instructions[1], Insn::IfNull(Label(5)));
    assert_eq!(code.max_stack, 1);
}
