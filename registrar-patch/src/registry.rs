//! Registry static-initializer injection
//!
//! For each binding, in component order, the emitted sequence is:
//!
//! ```text
//! produce:  <instantiate component>          ; callback / new+dup+<init> / ldc type
//!           invokestatic <dispatch entry>    ; pop if non-void
//! accept:   invokestatic <supply entry>
//!           invokestatic <component acceptor>; pop if non-void
//! ```
//!
//! The whole sequence is inserted before every `return` of `<clinit>()V`.

use crate::Transform;
use registrar_bytecode::{AccessFlags, Code, Insn, Loadable, Member, MemberRef, MethodDescriptor, ModuleFile};
use registrar_core::{
    names, AcceptorDescriptor, MemberDescriptor, ProducerDescriptor, RegistrarError,
    RegistrarResult, Registry, TypeName,
};

/// Injects one registry's wiring into its module.
#[derive(Debug, Clone, Copy)]
pub struct RegistryPatcher<'a> {
    registry: &'a Registry,
}

impl<'a> RegistryPatcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// The instruction block inserted before each `return`.
    pub fn emission(&self) -> RegistrarResult<Vec<Insn>> {
        let registry = self.registry;
        let mut out = Vec::new();
        for (component, binding) in registry.wired() {
            if binding.produce {
                let producer = component.producer.as_ref().ok_or_else(|| {
                    self.error(format!("{} is bound to produce but has no producer", component.module))
                })?;
                let dispatch = registry
                    .dispatch
                    .as_ref()
                    .ok_or_else(|| self.error("produce binding without a dispatch entry point"))?;
                self.instantiate(&mut out, &component.module, producer);
                self.invoke(&mut out, &registry.module, &dispatch.member)?;
            }
            if binding.accept {
                let acceptor: &AcceptorDescriptor = component.acceptor.as_ref().ok_or_else(|| {
                    self.error(format!("{} is bound to accept but has no acceptor", component.module))
                })?;
                let supply = registry
                    .supply
                    .as_ref()
                    .ok_or_else(|| self.error("accept binding without a supply entry point"))?;
                self.instantiate(&mut out, &registry.module, supply);
                self.invoke(&mut out, &component.module, &acceptor.member)?;
            }
        }
        Ok(out)
    }

    /// Push one instance obtained through `producer` declared on `owner`.
    fn instantiate(&self, out: &mut Vec<Insn>, owner: &TypeName, producer: &ProducerDescriptor) {
        match producer {
            ProducerDescriptor::Callback {
                member,
                takes_registry,
                ..
            } => {
                if *takes_registry {
                    out.push(Insn::Ldc(Loadable::Type(self.registry.module.clone())));
                }
                out.push(Insn::InvokeStatic(MemberRef::new(
                    owner.clone(),
                    &member.name,
                    &member.signature,
                )));
            }
            ProducerDescriptor::Constructor { produces } => {
                out.push(Insn::New(produces.clone()));
                out.push(Insn::Dup);
                out.push(Insn::InvokeSpecial(MemberRef::new(
                    produces.clone(),
                    names::CONSTRUCTOR,
                    names::VOID_SIGNATURE,
                )));
            }
            ProducerDescriptor::TypeToken => {
                out.push(Insn::Ldc(Loadable::Type(owner.clone())));
            }
        }
    }

    /// Static call consuming the value on top of the stack.
    fn invoke(&self, out: &mut Vec<Insn>, owner: &TypeName, member: &MemberDescriptor) -> RegistrarResult<()> {
        let desc = MethodDescriptor::parse(&member.signature)
            .map_err(|e| self.error(format!("{}: {}", member, e)))?;
        out.push(Insn::InvokeStatic(MemberRef::new(
            owner.clone(),
            &member.name,
            &member.signature,
        )));
        if !desc.is_void() {
            out.push(Insn::Pop);
        }
        Ok(())
    }

    fn error(&self, reason: impl Into<String>) -> RegistrarError {
        RegistrarError::rewrite(&self.registry.module, reason)
    }
}

impl Transform for RegistryPatcher<'_> {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn apply(&self, module: &mut ModuleFile) -> RegistrarResult<()> {
        if module.name != self.registry.module {
            return Err(self.error(format!("transform applied to {}", module.name)));
        }
        let block = self.emission()?;
        if block.is_empty() {
            return Ok(());
        }

        if module.member(names::STATIC_INIT, names::VOID_SIGNATURE).is_none() {
            let mut init = Member::new(AccessFlags::STATIC, names::STATIC_INIT, names::VOID_SIGNATURE);
            init.code = Some(Code::new(vec![Insn::Return]));
            module.members.push(init);
            tracing::debug!(module = %module.name, "Synthesized static initializer");
        }
        let registry_name = self.registry.module.clone();
        let code = module
            .member_mut(names::STATIC_INIT, names::VOID_SIGNATURE)
            .and_then(|m| m.code.as_mut())
            .ok_or_else(|| RegistrarError::rewrite(&registry_name, "static initializer has no code"))?;

        let sites = code.return_sites();
        for &at in sites.iter().rev() {
            code.insert(at, block.clone());
        }
        tracing::debug!(
            module = %module.name,
            marker = %self.registry.marker.attribute,
            sites = sites.len(),
            instructions = block.len(),
            "Injected registry wiring"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_bytecode::Label;
    use registrar_core::{AcceptorStrategy, Binding, Component, Marker, ProducerStrategy, Selector};
    use registrar_test_utils::ModuleBuilder;
    use std::sync::Arc;

    fn registry(components: Vec<Component>, bindings: Vec<Binding>) -> Registry {
        Registry {
            module: "app/C".into(),
            marker: Arc::new(Marker {
                attribute: "app/B".into(),
                selector: Selector::ByAttribute("app/Y".into()),
                produce: ProducerStrategy::Callback,
                accept: AcceptorStrategy::Callback,
            }),
            components: components.into(),
            dispatch: Some(AcceptorDescriptor {
                member: MemberDescriptor::new("register", "(Llang/Object;)Z"),
                accepts: names::OBJECT.into(),
            }),
            supply: Some(ProducerDescriptor::Callback {
                member: MemberDescriptor::new("lookup", "()Llang/Object;"),
                produces: names::OBJECT.into(),
                takes_registry: false,
            }),
            bindings,
        }
    }

    fn producing(name: &str, producer: ProducerDescriptor) -> Component {
        Component {
            module: name.into(),
            producer: Some(producer),
            acceptor: None,
        }
    }

    fn produce(i: usize) -> Binding {
        Binding { component: i, produce: true, accept: false }
    }

    #[test]
    fn test_emission_per_producer_strategy() {
        let registry = registry(
            vec![
                producing(
                    "app/D1",
                    ProducerDescriptor::Callback {
                        member: MemberDescriptor::new("create", "(Llang/Type;)Lapp/D1;"),
                        produces: "app/D1".into(),
                        takes_registry: true,
                    },
                ),
                producing("app/D2", ProducerDescriptor::Constructor { produces: "app/D2".into() }),
                producing("app/D3", ProducerDescriptor::TypeToken),
            ],
            vec![produce(0), produce(1), produce(2)],
        );
        let dispatch = Insn::InvokeStatic(MemberRef::new("app/C", "register", "(Llang/Object;)Z"));
        assert_eq!(
            RegistryPatcher::new(&registry).emission().unwrap(),
            vec![
                Insn::Ldc(Loadable::Type("app/C".into())),
                Insn::InvokeStatic(MemberRef::new("app/D1", "create", "(Llang/Type;)Lapp/D1;")),
                dispatch.clone(),
                Insn::Pop,
                Insn::New("app/D2".into()),
                Insn::Dup,
                Insn::InvokeSpecial(MemberRef::new("app/D2", "<init>", "()V")),
                dispatch.clone(),
                Insn::Pop,
                Insn::Ldc(Loadable::Type("app/D3".into())),
                dispatch,
                Insn::Pop,
            ]
        );
    }

    #[test]
    fn test_accept_emission() {
        let registry = registry(
            vec![Component {
                module: "app/E".into(),
                producer: None,
                acceptor: Some(AcceptorDescriptor {
                    member: MemberDescriptor::new("accept", "(Llang/Object;)V"),
                    accepts: names::OBJECT.into(),
                }),
            }],
            vec![Binding { component: 0, produce: false, accept: true }],
        );
        assert_eq!(
            RegistryPatcher::new(&registry).emission().unwrap(),
            vec![
                Insn::InvokeStatic(MemberRef::new("app/C", "lookup", "()Llang/Object;")),
                Insn::InvokeStatic(MemberRef::new("app/E", "accept", "(Llang/Object;)V")),
            ]
        );
    }

    #[test]
    fn test_synthesizes_static_initializer() {
        let registry = registry(
            vec![producing("app/D", ProducerDescriptor::TypeToken)],
            vec![produce(0)],
        );
        let mut module = ModuleBuilder::new("app/C").build();
        RegistryPatcher::new(&registry).apply(&mut module).unwrap();
        let init = module.member("<clinit>", "()V").unwrap();
        assert!(init.is_static());
        assert_eq!(init.code.as_ref().unwrap().instructions.len(), 4);
        assert_eq!(init.code.as_ref().unwrap().instructions[3], Insn::Return);
    }

    #[test]
    fn test_injects_before_every_return_and_retargets_branches() {
        let registry = registry(
            vec![producing("app/D", ProducerDescriptor::TypeToken)],
            vec![produce(0)],
        );
        let mut module = ModuleBuilder::new("app/C")
            .static_init(vec![
                Insn::GetStatic(MemberRef::new("app/C", "ready", "Lapp/Flag;")),
                Insn::IfNull(Label(3)),
                Insn::Return,
                Insn::Return,
            ])
            .build();
        RegistryPatcher::new(&registry).apply(&mut module).unwrap();
        let code = module.member("<clinit>", "()V").unwrap().code.as_ref().unwrap();
        // 4 original + 3 per return site
        assert_eq!(code.instructions.len(), 10);
        assert_eq!(code.instructions[1], Insn::IfNull(Label(6)));
        assert_eq!(code.instructions[6], Insn::Ldc(Loadable::Type("app/D".into())));
        assert_eq!(code.return_sites(), vec![5, 9]);
    }

    #[test]
    fn test_no_bindings_leaves_module_untouched() {
        let registry = registry(Vec::new(), Vec::new());
        let mut module = ModuleBuilder::new("app/C").build();
        let before = module.clone();
        RegistryPatcher::new(&registry).apply(&mut module).unwrap();
        assert_eq!(module, before);
    }

    #[test]
    fn test_wrong_module_rejected() {
        let registry = registry(Vec::new(), Vec::new());
        let mut module = ModuleBuilder::new("app/Other").build();
        assert!(matches!(
            RegistryPatcher::new(&registry).apply(&mut module),
            Err(RegistrarError::BinaryRewrite { .. })
        ));
    }
}
