//! Stage 2, member pass: modifiers, member types and generic signatures.
//!
//! Runs after every unit finished its header pass, so ancestor lists are stable and written supertypes can be
//! validated against the declared type parameters of their classes.

use lava_core::access::*;
use lava_core::lang::well_known;
use lava_syntax::Span;
use lava_syntax::diagnostics::codes;
use rustc_hash::{FxHashMap, FxHashSet};

use super::decl::{ClassDecl, ClassKind, MethodDecl, Modifiers};
use super::structure::{field_access, method_access};
use super::{CompileUnit, Nesting, Stage};
use crate::class::{ClassNode, FieldNode, MethodNode};
use crate::context::GlobalContext;
use crate::local::LocalContext;
use crate::types::{IType, MethodSignature, Type, TypeParamDecl, display_name};

const MODIFIER_NAMES: &[(u16, &str)] = &[
    (ACC_PUBLIC, "public"),
    (ACC_PROTECTED, "protected"),
    (ACC_PRIVATE, "private"),
    (ACC_STATIC, "static"),
    (ACC_FINAL, "final"),
    (ACC_ABSTRACT, "abstract"),
    (ACC_SYNCHRONIZED, "synchronized"),
    (ACC_VOLATILE, "volatile"),
    (ACC_TRANSIENT, "transient"),
    (ACC_NATIVE, "native"),
    (ACC_STRICT, "strictfp"),
];

const CLASS_MODIFIERS: u16 = VISIBILITY_MASK | ACC_STATIC | ACC_FINAL | ACC_ABSTRACT | ACC_STRICT;
const FIELD_MODIFIERS: u16 = VISIBILITY_MASK | ACC_STATIC | ACC_FINAL | ACC_TRANSIENT | ACC_VOLATILE;
const INTERFACE_FIELD_MODIFIERS: u16 = ACC_PUBLIC | ACC_STATIC | ACC_FINAL;
const METHOD_MODIFIERS: u16 =
    VISIBILITY_MASK | ACC_STATIC | ACC_FINAL | ACC_ABSTRACT | ACC_SYNCHRONIZED | ACC_NATIVE | ACC_STRICT;
const INTERFACE_METHOD_MODIFIERS: u16 = ACC_PUBLIC | ACC_PRIVATE | ACC_STATIC | ACC_ABSTRACT | ACC_STRICT;

/// What a modifier list is attached to.
#[derive(Debug, Clone, Copy)]
struct Target {
    allowed: u16,
    default_allowed: bool,
    what: &'static str,
}

impl CompileUnit {
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.name))]
    pub fn stage2_members(&mut self, ctx: &GlobalContext) {
        if self.failed || self.stage != Stage::Header {
            return;
        }
        let (Some(lc), Some(decl)) = (self.local_context(ctx), self.decl.take()) else {
            return;
        };
        self.check_class_modifiers(&lc, &decl);
        for (ty, span) in std::mem::take(&mut self.unchecked) {
            lc.validate_type(&ty, span);
        }
        self.resolve_fields(&lc, &decl);
        self.resolve_methods(&lc, &decl);
        self.check_implicit_super(&lc, &decl);
        self.decl = Some(decl);
        self.stage = Stage::Members;
        self.publish(ctx);
    }

    fn check_class_modifiers(&self, lc: &LocalContext<'_>, decl: &ClassDecl) {
        let allowed = match self.nesting {
            Nesting::TopLevel => ACC_PUBLIC | ACC_FINAL | ACC_ABSTRACT | ACC_STRICT,
            Nesting::Member { .. } => CLASS_MODIFIERS,
            Nesting::Local | Nesting::Anonymous { .. } => ACC_FINAL | ACC_ABSTRACT | ACC_STRICT,
        };
        let allowed = match decl.kind {
            ClassKind::Class => allowed,
            ClassKind::Interface | ClassKind::Annotation => allowed & !ACC_FINAL,
            ClassKind::Enum | ClassKind::Record | ClassKind::Struct => allowed & !(ACC_FINAL | ACC_ABSTRACT),
        };
        let what = match decl.kind {
            ClassKind::Class => "a class",
            ClassKind::Interface | ClassKind::Annotation => "an interface",
            ClassKind::Enum => "an enum",
            ClassKind::Record => "a record",
            ClassKind::Struct => "a struct",
        };
        let target = Target {
            allowed,
            default_allowed: false,
            what,
        };
        check_modifiers(lc, &decl.modifiers, target, decl.name_span);
    }

    fn resolve_fields(&mut self, lc: &LocalContext<'_>, decl: &ClassDecl) {
        let target = if decl.kind.is_interface_like() {
            Target {
                allowed: INTERFACE_FIELD_MODIFIERS,
                default_allowed: false,
                what: "an interface field",
            }
        } else {
            Target {
                allowed: FIELD_MODIFIERS,
                default_allowed: false,
                what: "a field",
            }
        };
        let erasures = self.class_erasures();
        let mut seen = FxHashSet::default();
        let mut fields = Vec::with_capacity(decl.fields.len());
        self.field_slots.clear();
        for field in &decl.fields {
            if !is_synthetic(&field.modifiers) {
                check_modifiers(lc, &field.modifiers, target, field.span);
            }
            let ty = self.resolve_ref(lc, field.ty);
            if !seen.insert(field.name.as_str()) {
                lc.error(field.span, codes::MEMBER_DUPLICATE_FIELD, vec![field.name.clone()]);
                self.field_slots.push(None);
                continue;
            }
            self.field_slots.push(Some(fields.len()));
            let mut node = FieldNode::new(field.name.clone(), field_access(decl.kind, &field.modifiers), erase(&ty, &erasures));
            node.signature = needs_signature(&ty).then_some(ty);
            fields.push(node);
        }
        self.node.fields = fields;
    }

    /// Erasures of the class's own type variables.
    fn class_erasures(&self) -> FxHashMap<String, Type> {
        let mut map = FxHashMap::default();
        if let Some(sig) = &self.node.signature {
            add_erasures(&sig.type_params, &mut map);
        }
        map
    }

    fn resolve_methods(&mut self, lc: &LocalContext<'_>, decl: &ClassDecl) {
        let erasures = self.class_erasures();
        let mut seen = FxHashSet::default();
        let mut methods = Vec::with_capacity(decl.methods.len());
        self.method_slots.clear();
        for method in &decl.methods {
            if !is_synthetic(&method.modifiers) {
                check_modifiers(lc, &method.modifiers, method_target(decl.kind, method), method.span);
                check_method_conflicts(lc, &method.modifiers, method.span);
            }
            let node = self.method_node(lc, decl.kind, method, &erasures);
            if !seen.insert((node.name.clone(), node.param_key())) {
                let name = if node.is_constructor() { decl.simple_name.clone() } else { node.name.clone() };
                let params = node.generic_params().iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                lc.error(method.span, codes::MEMBER_DUPLICATE_METHOD, vec![name, format!("({params})")]);
                self.method_slots.push(None);
                continue;
            }
            self.method_slots.push(Some(methods.len()));
            methods.push(node);
        }
        self.node.methods = methods;
    }

    fn method_node(
        &mut self,
        lc: &LocalContext<'_>,
        kind: ClassKind,
        method: &MethodDecl,
        class_erasures: &FxHashMap<String, Type>,
    ) -> MethodNode {
        let names: Vec<String> = method.type_params.iter().map(|p| p.name.clone()).collect();
        let scoped = !names.is_empty();
        let mlc = lc.with_method(names, method.modifiers.has(ACC_STATIC));

        let mut type_params = Vec::with_capacity(method.type_params.len());
        for tp in &method.type_params {
            let mut param = TypeParamDecl::unbounded(tp.name.clone());
            for (i, &bound) in tp.bounds.iter().enumerate() {
                let resolved = self.resolve_in(&mlc, bound, true);
                let is_interface =
                    resolved.class_name().and_then(|n| mlc.class_info(&n)).is_some_and(|n| n.is_interface());
                if i == 0 && !is_interface {
                    param.class_bound = Some(resolved);
                } else {
                    param.interface_bounds.push(resolved);
                }
            }
            type_params.push(param);
        }
        let params: Vec<IType> = method
            .params
            .iter()
            .map(|p| {
                let ty = self.resolve_in(&mlc, p.ty, scoped);
                if p.varargs { ty.with_dims(ty.dims() + 1) } else { ty }
            })
            .collect();
        let ret = match method.ret {
            Some(r) => self.resolve_in(&mlc, r, scoped),
            None => IType::Raw(Type::void()),
        };
        let throws: Vec<IType> = method.throws.iter().map(|&t| self.resolve_in(&mlc, t, scoped)).collect();

        let mut erasures = class_erasures.clone();
        add_erasures(&type_params, &mut erasures);
        let mut node = MethodNode::new(
            method.name.clone(),
            method_access(kind, method),
            params.iter().map(|p| erase(p, &erasures)).collect(),
            erase(&ret, &erasures),
        );
        node.throws = throws.iter().filter_map(|t| erase(t, &erasures).class_name().map(str::to_string)).collect();
        let generic = !type_params.is_empty()
            || needs_signature(&ret)
            || params.iter().chain(&throws).any(needs_signature);
        node.signature = generic.then(|| MethodSignature {
            type_params,
            params,
            ret,
            throws,
        });
        node
    }

    /// A synthesized no-arg constructor calls `super()`, which the parent must offer.
    fn check_implicit_super(&self, lc: &LocalContext<'_>, decl: &ClassDecl) {
        if decl.kind != ClassKind::Class || matches!(self.nesting, Nesting::Anonymous { .. }) {
            return;
        }
        let synthesized =
            decl.methods.iter().any(|m| m.name == well_known::CONSTRUCTOR && m.body.is_none() && m.params.is_empty());
        let Some(parent) = self.node.parent.as_deref().and_then(|p| lc.class_info(p)) else {
            return;
        };
        if synthesized && !accepts_no_args(lc, &parent) {
            lc.error(decl.name_span, codes::CTOR_NO_DEFAULT_SUPER, vec![display_name(&parent.name)]);
        }
    }
}

/// Return `true` if `parent` has a constructor callable as `super()` from the current class.
///
/// A class with no constructors on record (an incomplete library entry) is given the benefit of the doubt.
pub(super) fn accepts_no_args(lc: &LocalContext<'_>, parent: &ClassNode) -> bool {
    let mut ctors = parent.methods_named(well_known::CONSTRUCTOR).peekable();
    if ctors.peek().is_none() {
        return true;
    }
    ctors.any(|m| {
        let callable = m.params.is_empty() || (m.params.len() == 1 && has(m.access, ACC_VARARGS));
        callable && lc.check_accessible(parent, m.access)
    })
}

/// Members the structure stage added carry flags but no written modifier.
fn is_synthetic(mods: &Modifiers) -> bool {
    mods.span.is_none() && mods.flags != 0
}

/// Erasure with type variables replaced by their bound's erasure.
fn erase(ty: &IType, bounds: &FxHashMap<String, Type>) -> Type {
    match ty {
        IType::TypeParam { name, dims } => match bounds.get(name) {
            Some(bound) => {
                let dims = bound.dims + dims;
                bound.clone().with_dims(dims)
            }
            None => Type::object().with_dims(*dims),
        },
        other => other.erasure(),
    }
}

fn add_erasures(params: &[TypeParamDecl], into: &mut FxHashMap<String, Type>) {
    for param in params {
        let erased = erase(&param.erasure(), into);
        into.insert(param.name.clone(), erased);
    }
}

fn needs_signature(ty: &IType) -> bool {
    !matches!(ty, IType::Raw(_))
}

fn method_target(kind: ClassKind, method: &MethodDecl) -> Target {
    if method.name == well_known::CONSTRUCTOR {
        let allowed = if kind == ClassKind::Enum { ACC_PRIVATE } else { VISIBILITY_MASK };
        return Target {
            allowed,
            default_allowed: false,
            what: "a constructor",
        };
    }
    if kind.is_interface_like() {
        Target {
            allowed: INTERFACE_METHOD_MODIFIERS,
            default_allowed: kind == ClassKind::Interface,
            what: "an interface method",
        }
    } else {
        Target {
            allowed: METHOD_MODIFIERS,
            default_allowed: false,
            what: "a method",
        }
    }
}

fn check_modifiers(lc: &LocalContext<'_>, mods: &Modifiers, target: Target, fallback: Span) {
    for (word, span) in &mods.repeated {
        lc.error(*span, codes::MODIFIER_REPEATED, vec![(*word).to_string()]);
    }
    let span = mods.span_or(fallback);
    for &(flag, word) in MODIFIER_NAMES {
        if has(mods.flags, flag) && !has(target.allowed, flag) {
            lc.error(span, codes::MODIFIER_ILLEGAL, vec![word.to_string(), target.what.to_string()]);
        }
    }
    if mods.default && !target.default_allowed {
        lc.error(span, codes::MODIFIER_ILLEGAL, vec!["default".to_string(), target.what.to_string()]);
    }
    let visibility: Vec<&str> = MODIFIER_NAMES[..3]
        .iter()
        .filter(|(flag, _)| has(mods.flags, *flag))
        .map(|(_, word)| *word)
        .collect();
    if let [first, second, ..] = visibility[..] {
        lc.error(span, codes::MODIFIER_CONFLICT, vec![first.to_string(), second.to_string()]);
    }
    if has(mods.flags, ACC_FINAL | ACC_VOLATILE) {
        lc.error(span, codes::MODIFIER_CONFLICT, vec!["final".to_string(), "volatile".to_string()]);
    }
}

fn check_method_conflicts(lc: &LocalContext<'_>, mods: &Modifiers, fallback: Span) {
    if !mods.has(ACC_ABSTRACT) {
        return;
    }
    let span = mods.span_or(fallback);
    for (flag, word) in [(ACC_FINAL, "final"), (ACC_PRIVATE, "private"), (ACC_STATIC, "static")] {
        if mods.has(flag) {
            lc.error(span, codes::MODIFIER_CONFLICT, vec!["abstract".to_string(), word.to_string()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::GlobalContext;
    use crate::types::IType;
    use crate::unit::test_support::{codes, compile};
    use lava_core::access::*;
    use lava_syntax::diagnostics::codes;

    #[test]
    fn test_signatures_are_bound() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[(
                "A.java",
                "package p; import java.util.List; class A<T> { List<T> items; T first; int n; <U extends Number> U pick(List<? extends U> xs, String... rest) { return null; } }",
            )],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let node = units[0].node();
        assert_eq!(node.fields[0].signature, Some(IType::generic("java/util/List", vec![IType::type_param("T")])));
        assert_eq!(node.fields[1].ty.class_name(), Some("java/lang/Object"));
        assert!(node.fields[2].signature.is_none());
        let pick = node.methods_named("pick").next().unwrap();
        assert_eq!(pick.descriptor(), "(Ljava/util/List;[Ljava/lang/String;)Ljava/lang/Number;");
        assert!(has(pick.access, ACC_VARARGS));
        let sig = pick.signature.as_ref().unwrap();
        assert_eq!(sig.ret, IType::type_param("U"));
        assert_eq!(node.methods_named("<init>").count(), 1);
    }

    #[test]
    fn test_duplicates_keep_the_first() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("A.java", "class A { int x; String x; void f(int a) {} int f(int b) { return b; } }")]);
        assert_eq!(codes(&ctx), [codes::MEMBER_DUPLICATE_FIELD, codes::MEMBER_DUPLICATE_METHOD]);
        assert_eq!(units[0].node().fields.len(), 1);
        assert_eq!(units[0].node().methods_named("f").count(), 1);
        assert!(ctx.diagnostics()[1].message().contains("f(int)"));
    }

    #[test]
    fn test_same_parameters_different_names() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[
                ("C.java", "class C { int a() { return 1; } int b() { return a(); } int c() { return b(); } }"),
                ("R.java", "record R(int a, String b) {}"),
                ("F.java", "enum F { A, B }"),
            ],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let c = units[0].node();
        for name in ["a", "b", "c", "<init>"] {
            assert_eq!(c.methods_named(name).count(), 1, "{name}");
        }
        let r = units[1].node();
        assert_eq!(r.methods_named("a").count(), 1);
        assert_eq!(r.methods_named("b").count(), 1);
        assert_eq!(r.methods_named("<init>").count(), 1);
        let f = units[2].node();
        assert_eq!(f.methods_named("values").count(), 1);
        assert_eq!(f.methods_named("<init>").count(), 1);
    }

    #[test]
    fn test_modifier_problems() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[(
                "A.java",
                "public public class A { private public int a; final volatile int b; abstract static void c(); transient void d() {} }",
            )],
        );
        assert_eq!(
            codes(&ctx),
            [
                codes::MODIFIER_REPEATED,
                codes::MODIFIER_CONFLICT,
                codes::MODIFIER_CONFLICT,
                codes::MODIFIER_CONFLICT,
                codes::MODIFIER_ILLEGAL,
            ]
        );
    }

    #[test]
    fn test_default_constructor_needs_parent_no_arg() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[
                ("P.java", "class P { P(int x) {} }"),
                ("Q.java", "class Q extends P {}"),
                ("R.java", "class R extends P { R() { super(1); } }"),
            ],
        );
        assert_eq!(codes(&ctx), [codes::CTOR_NO_DEFAULT_SUPER]);
        assert!(ctx.diagnostics()[0].unit == "Q");
    }

    #[test]
    fn test_supertype_arity_is_validated() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[("A.java", "import java.util.*; abstract class A extends AbstractList<String, String> implements Runnable {}")],
        );
        assert_eq!(codes(&ctx), [codes::GENERIC_ARITY]);
    }

    #[test]
    fn test_enum_constructor_visibility() {
        let ctx = GlobalContext::new();
        compile(&ctx, &[("E.java", "enum E { A; public E() {} }")]);
        assert_eq!(codes(&ctx), [codes::MODIFIER_ILLEGAL]);
    }
}
