//! Patch Output Tests
//!
//! Stable emission order, dual-role ordering and idempotent marking, checked
//! on serialized output.

use registrar_bytecode::{read_module, write_module, Insn, Loadable, MemberRef, ModuleFile};
use registrar_core::{names, ErrorReporter, Registry};
use registrar_discovery::{discover_markers, ComponentDiscoverer, MetadataIndex, Origin, RegistryAssembler};
use registrar_patch::{ComponentPatcher, PatchPlan, Transform};
use registrar_test_utils::{marker_with_strategies, scenario, scenario_modules, ModuleBuilder, Selector};

fn resolve(modules: &[ModuleFile]) -> Vec<Registry> {
    let index = MetadataIndex::build(modules.iter().cloned().map(|m| (m, Origin::Input)));
    let reporter = ErrorReporter::new();
    let markers = discover_markers(&index, &reporter);
    let discoverer = ComponentDiscoverer::new(&index, &reporter);
    let registries = RegistryAssembler::new(&index, &discoverer, &reporter).assemble(&markers);
    assert!(reporter.is_empty(), "{:?}", reporter.errors());
    registries
}

fn patched(modules: &[ModuleFile], name: &str) -> Vec<u8> {
    let registries = resolve(modules);
    let plan = PatchPlan::new(&registries);
    let module = modules
        .iter()
        .find(|m| m.name.as_str() == name)
        .cloned()
        .expect("module present");
    let bytes = plan.pipeline(name).rewrite(module).expect("rewrite");
    bytes
}

#[test]
fn test_scenario_registry_emission() {
    let modules = scenario_modules();
    let bytes = patched(&modules, scenario::REGISTRY);
    let registry = read_module(&bytes).unwrap();
    let init = registry.member(names::STATIC_INIT, names::VOID_SIGNATURE).unwrap();
    assert_eq!(
        init.code.as_ref().unwrap().instructions,
        vec![
            Insn::InvokeStatic(MemberRef::new(scenario::PRODUCING, "create", "()Lapp/D;")),
            Insn::InvokeStatic(MemberRef::new(scenario::REGISTRY, "register", "(Llang/Object;)V")),
            Insn::InvokeStatic(MemberRef::new(scenario::REGISTRY, "lookup", "()Llang/Object;")),
            Insn::InvokeStatic(MemberRef::new(scenario::ACCEPTING, "accept", "(Llang/Object;)V")),
            Insn::Return,
        ]
    );
    assert!(!registry.has_annotation(names::RETAINED));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let modules = scenario_modules();
    for name in [scenario::REGISTRY, scenario::PRODUCING, scenario::ACCEPTING] {
        assert_eq!(patched(&modules, name), patched(&modules, name));
    }
}

#[test]
fn test_constructor_strategy_emits_new_dup_init() {
    let modules = vec![
        marker_with_strategies("app/Services", &Selector::BySuperType("app/Service".into()), "constructor", "none")
            .build(),
        ModuleBuilder::new("app/Service").interface().build(),
        ModuleBuilder::new("app/Host")
            .carries("app/Services")
            .dispatch("app/Services", "add", "app/Service")
            .build(),
        ModuleBuilder::new("app/Impl").implements("app/Service").constructor().build(),
    ];
    let host = read_module(&patched(&modules, "app/Host")).unwrap();
    let code = host
        .member(names::STATIC_INIT, names::VOID_SIGNATURE)
        .unwrap()
        .code
        .as_ref()
        .unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Insn::New("app/Impl".into()),
            Insn::Dup,
            Insn::InvokeSpecial(MemberRef::new("app/Impl", "<init>", "()V")),
            Insn::InvokeStatic(MemberRef::new("app/Host", "add", "(Lapp/Service;)V")),
            Insn::Return,
        ]
    );
    assert_eq!(code.max_stack, 2);
}

#[test]
fn test_type_token_strategy_loads_component_type() {
    let modules = vec![
        marker_with_strategies("app/Types", &Selector::ByAttribute("app/Y".into()), "type", "none").build(),
        ModuleBuilder::new("app/Host")
            .carries("app/Types")
            .dispatch("app/Types", "add", names::TYPE_TOKEN)
            .build(),
        ModuleBuilder::new("app/T").carries("app/Y").build(),
    ];
    let host = read_module(&patched(&modules, "app/Host")).unwrap();
    let code = host.member(names::STATIC_INIT, names::VOID_SIGNATURE).unwrap().code.as_ref().unwrap();
    assert_eq!(code.instructions[0], Insn::Ldc(Loadable::Type("app/T".into())));
}

#[test]
fn test_marking_twice_is_byte_identical() {
    let mut module = ModuleBuilder::new("app/D").carries("app/Y").build();
    ComponentPatcher.apply(&mut module).unwrap();
    let once = write_module(&module).unwrap();
    let mut again = read_module(&once).unwrap();
    ComponentPatcher.apply(&mut again).unwrap();
    assert_eq!(write_module(&again).unwrap(), once);
}
