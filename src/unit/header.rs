//! Stage 2, header pass: supertypes, type-parameter bounds and the InnerClasses table.
//!
//! Only names are resolved here. Argument counts and bounds need every class's type parameters, so the written
//! supertypes are kept in `unchecked` and validated by the member pass.

use std::collections::VecDeque;

use lava_core::lang::well_known;
use lava_syntax::Span;
use lava_syntax::diagnostics::codes;
use rustc_hash::FxHashSet;

use super::decl::{ClassDecl, ClassKind, TypeParamSyntax};
use super::{CompileUnit, Nesting, Stage};
use crate::context::GlobalContext;
use crate::local::LocalContext;
use crate::types::{ClassSignature, IType, TypeParamDecl, TypeRef, display_name};

/// Which clause a supertype was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuperRole {
    Parent,
    Interface,
}

impl CompileUnit {
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.name))]
    pub fn stage2_header(&mut self, ctx: &GlobalContext) {
        if self.failed || self.stage != Stage::Structure {
            return;
        }
        let (Some(lc), Some(decl)) = (self.local_context(ctx), self.decl.take()) else {
            return;
        };
        if self.owns_imports {
            for (path, span) in self.imports.unresolved(ctx) {
                lc.error(span, codes::IMPORT_UNRESOLVED, vec![display_name(&path)]);
            }
        }
        self.resolve_supertypes(&lc, &decl);
        self.publish(ctx);
        self.break_cycles(&lc, decl.name_span);
        self.collect_inner_classes(ctx, &decl);
        self.decl = Some(decl);
        self.stage = Stage::Header;
        self.publish(ctx);
    }

    fn resolve_supertypes(&mut self, lc: &LocalContext<'_>, decl: &ClassDecl) {
        let anonymous_parent = match &self.nesting {
            Nesting::Anonymous { parent, .. } => Some(parent.clone()),
            _ => None,
        };
        let (parent, interfaces) = match (anonymous_parent, decl.kind) {
            (Some(parent), _) => {
                match parent.class_name().and_then(|n| lc.class_info(&n)) {
                    Some(node) if node.is_interface() => (IType::object(), vec![parent]),
                    _ => (parent, Vec::new()),
                }
            }
            (None, ClassKind::Enum) => {
                let this = IType::class(self.name.clone());
                let interfaces = self.resolve_supers(lc, &decl.implements, SuperRole::Interface);
                (IType::generic(well_known::ENUM, vec![this]), interfaces)
            }
            (None, ClassKind::Record) => {
                (IType::class(well_known::RECORD), self.resolve_supers(lc, &decl.implements, SuperRole::Interface))
            }
            (None, ClassKind::Annotation) => (IType::object(), vec![IType::class(well_known::ANNOTATION)]),
            (None, ClassKind::Interface) => {
                (IType::object(), self.resolve_supers(lc, &decl.extends, SuperRole::Interface))
            }
            (None, ClassKind::Class | ClassKind::Struct) => {
                let parent = self.resolve_supers(lc, &decl.extends, SuperRole::Parent).pop();
                (parent.unwrap_or_else(IType::object), self.resolve_supers(lc, &decl.implements, SuperRole::Interface))
            }
        };
        let type_params: Vec<TypeParamDecl> =
            decl.type_params.iter().map(|tp| self.resolve_type_param(lc, tp)).collect();

        self.node.parent = Some(parent.erasure().class_name().unwrap_or(well_known::OBJECT).to_string());
        self.node.interfaces = interfaces.iter().filter_map(|i| i.erasure().class_name().map(str::to_string)).collect();
        let generic = !type_params.is_empty()
            || matches!(parent, IType::Generic(_))
            || interfaces.iter().any(|i| matches!(i, IType::Generic(_)));
        self.node.signature = generic.then(|| ClassSignature {
            type_params,
            parent,
            interfaces,
        });
    }

    /// Resolve written supertypes, dropping (after reporting) those that are missing or of the wrong kind.
    fn resolve_supers(&mut self, lc: &LocalContext<'_>, written: &[TypeRef], role: SuperRole) -> Vec<IType> {
        let mut out = Vec::with_capacity(written.len());
        for &ty in written {
            let span = self.arena.span(ty);
            let itype = self.arena.to_itype(ty);
            let owner = written_owner(&itype);
            if let Ok(None) = lc.lookup_class(&owner) {
                let code = match role {
                    SuperRole::Parent => codes::CLASS_PARENT_UNRESOLVED,
                    SuperRole::Interface => codes::CLASS_INTERFACE_UNRESOLVED,
                };
                lc.error(span, code, vec![owner, display_name(&self.name)]);
                continue;
            }
            let resolved = lc.resolve_names(&itype, span);
            let Some(node) = resolved.class_name().and_then(|n| lc.class_info(&n)) else {
                continue;
            };
            let shown = display_name(&node.name);
            match role {
                SuperRole::Parent if node.is_interface() => {
                    lc.error(span, codes::CLASS_PARENT_IS_INTERFACE, vec![shown]);
                    continue;
                }
                SuperRole::Parent if node.is_final() => {
                    lc.error(span, codes::CLASS_FINAL_PARENT, vec![shown]);
                    continue;
                }
                SuperRole::Interface if !node.is_interface() => {
                    lc.error(span, codes::CLASS_INTERFACE_EXPECTED, vec![shown]);
                    continue;
                }
                _ => {}
            }
            self.unchecked.push((resolved.clone(), span));
            out.push(resolved);
        }
        out
    }

    fn resolve_type_param(&mut self, lc: &LocalContext<'_>, tp: &TypeParamSyntax) -> TypeParamDecl {
        let mut param = TypeParamDecl::unbounded(tp.name.clone());
        for (i, &bound) in tp.bounds.iter().enumerate() {
            let span = self.arena.span(bound);
            let resolved = lc.resolve_names(&self.arena.to_itype(bound), span);
            self.unchecked.push((resolved.clone(), span));
            let is_interface = resolved.class_name().and_then(|n| lc.class_info(&n)).is_some_and(|n| n.is_interface());
            if i == 0 && !is_interface {
                param.class_bound = Some(resolved);
            } else {
                param.interface_bounds.push(resolved);
            }
        }
        param
    }

    /// Report and cut an inheritance cycle through this class; the parent falls back to `Object`.
    fn break_cycles(&mut self, lc: &LocalContext<'_>, span: Span) {
        let ctx = lc.global();
        let mut seen = FxHashSet::default();
        let mut queue: VecDeque<String> = self.node.supers().map(str::to_string).collect();
        while let Some(name) = queue.pop_front() {
            if name == self.name {
                lc.error(span, codes::CLASS_CYCLIC, vec![display_name(&self.name)]);
                self.node.parent = Some(well_known::OBJECT.to_string());
                self.node.interfaces.clear();
                if let Some(sig) = &mut self.node.signature {
                    sig.parent = IType::object();
                    sig.interfaces.clear();
                }
                return;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(node) = ctx.get_class_info(&name) {
                queue.extend(node.supers().map(str::to_string));
            }
        }
    }

    /// InnerClasses rows for direct member classes (this class's own row is written by S1).
    fn collect_inner_classes(&mut self, ctx: &GlobalContext, decl: &ClassDecl) {
        for member in &decl.member_classes {
            let name = format!("{}${}", self.name, member.simple_name);
            let Some(entry) = ctx.get_class_info(&name).and_then(|n| n.inner_entry().cloned()) else {
                continue;
            };
            if !self.node.inner_classes.iter().any(|ic| ic.inner == entry.inner) {
                self.node.inner_classes.push(entry);
            }
        }
    }
}

/// Written owner class of a supertype (`Map.Entry` for `Map.Entry<K, V>`).
fn written_owner(ty: &IType) -> String {
    match ty {
        IType::Generic(g) => g.owner.clone(),
        other => other.erasure().class_name().unwrap_or(well_known::OBJECT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::context::GlobalContext;
    use crate::types::IType;
    use crate::unit::test_support::{codes, compile};
    use lava_syntax::diagnostics::codes;

    #[test]
    fn test_generic_supertypes() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[(
                "Box.java",
                "package p; import java.util.*; public abstract class Box<T extends Comparable<T>> extends AbstractList<T> implements RandomAccess { }",
            )],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let node = units[0].node();
        assert_eq!(node.parent.as_deref(), Some("java/util/AbstractList"));
        assert_eq!(node.interfaces, ["java/util/RandomAccess"]);
        let sig = node.signature.as_ref().unwrap();
        assert_eq!(sig.parent, IType::generic("java/util/AbstractList", vec![IType::type_param("T")]));
        assert!(sig.type_params[0].class_bound.is_none());
        assert_eq!(sig.type_params[0].interface_bounds.len(), 1);
    }

    #[test]
    fn test_missing_parent_falls_back_to_object() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("A.java", "class A extends Missing implements AlsoMissing {}")]);
        assert_eq!(codes(&ctx), [codes::CLASS_PARENT_UNRESOLVED, codes::CLASS_INTERFACE_UNRESOLVED]);
        assert_eq!(units[0].node().parent.as_deref(), Some("java/lang/Object"));
        assert!(units[0].node().interfaces.is_empty());
    }

    #[test]
    fn test_kind_mismatches() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[
                ("A.java", "class A extends Runnable {}"),
                ("B.java", "class B extends String {}"),
                ("C.java", "class C implements Object {}"),
            ],
        );
        assert_eq!(
            codes(&ctx),
            [codes::CLASS_PARENT_IS_INTERFACE, codes::CLASS_FINAL_PARENT, codes::CLASS_INTERFACE_EXPECTED]
        );
    }

    #[test]
    fn test_cycle_is_reported_once() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("A.java", "class A extends B {}"), ("B.java", "class B extends A {}")]);
        assert_eq!(codes(&ctx), [codes::CLASS_CYCLIC]);
        assert_eq!(units[1].node().parent.as_deref(), Some("java/lang/Object"));
        assert_eq!(units[0].node().parent.as_deref(), Some("B"));
    }

    #[test]
    fn test_enum_and_record_parents() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("E.java", "enum E { A } record R(int x) {}")]);
        let sig = units[0].node().signature.as_ref().unwrap();
        assert_eq!(sig.parent, IType::generic("java/lang/Enum", vec![IType::class("E")]));
        assert_eq!(units[1].node().parent.as_deref(), Some("java/lang/Record"));
    }

    #[test]
    fn test_inner_class_rows_and_unresolved_import() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("O.java", "import nope.Gone; class O { static class I {} }")]);
        assert_eq!(codes(&ctx), [codes::IMPORT_UNRESOLVED]);
        let rows: Vec<_> = units[0].node().inner_classes.iter().map(|ic| ic.inner.as_str()).collect();
        assert_eq!(rows, ["O$I"]);
    }
}
