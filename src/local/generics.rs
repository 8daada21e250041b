//! Type resolution and generic validation.
//!
//! Written types come out of the structure stage with source names (`List<String>`, `Map.Entry<K, V>`).
//! [`LocalContext::resolve_type`] turns them into internal names and validates them: argument counts against the
//! declared arity, primitive arguments, bounds, and static member classes selected through a parameterized owner.

use lava_core::access::{self, ACC_STATIC};
use lava_syntax::Span;
use lava_syntax::diagnostics::codes;
use rustc_hash::FxHashMap;

use super::LocalContext;
use crate::class::ClassNode;
use crate::types::{BaseType, Generic, GenericSub, IType, Type, display_name};

impl LocalContext<'_> {
    /// Resolve names and validate. Unresolvable classes are reported and replaced by `Object`.
    pub fn resolve_type(&self, written: &IType, span: Span) -> IType {
        let resolved = self.resolve_names(written, span);
        self.validate_type(&resolved, span);
        resolved
    }

    /// Resolve class names only; arity and bounds are not checked.
    pub fn resolve_names(&self, written: &IType, span: Span) -> IType {
        match written {
            IType::Raw(t) => match &t.base {
                BaseType::Class(name) if !name.contains(['.', '/']) && self.is_type_param(name) => {
                    IType::TypeParam {
                        name: name.clone(),
                        dims: t.dims,
                    }
                }
                BaseType::Class(name) => {
                    let resolved = self.resolve_class_checked(name, span);
                    IType::Raw(resolved.map_or_else(Type::object, Type::class).with_dims(t.dims))
                }
                _ => written.clone(),
            },
            IType::TypeParam { .. } => written.clone(),
            IType::Wildcard { bound, ty } => IType::Wildcard {
                bound: *bound,
                ty: ty.as_ref().map(|t| Box::new(self.resolve_names(t, span))),
            },
            IType::Generic(g) => {
                let Some(owner) = self.resolve_class_checked(&g.owner, span) else {
                    return IType::object().with_dims(g.dims);
                };
                let resolved = Generic {
                    owner,
                    args: g.args.iter().map(|a| self.resolve_names(a, span)).collect(),
                    dims: g.dims,
                    sub: g.sub.as_deref().map(|s| Box::new(self.resolve_sub_names(s, span))),
                };
                let full = resolved.full_name();
                if resolved.sub.is_some() && !self.global().class_exists(&full) {
                    self.error(span, codes::SYMBOL_UNRESOLVED, vec![display_name(&full)]);
                    return IType::object().with_dims(g.dims);
                }
                IType::Generic(Box::new(resolved))
            }
        }
    }

    fn resolve_sub_names(&self, sub: &GenericSub, span: Span) -> GenericSub {
        GenericSub {
            name: sub.name.clone(),
            args: sub.args.iter().map(|a| self.resolve_names(a, span)).collect(),
            sub: sub.sub.as_deref().map(|s| Box::new(self.resolve_sub_names(s, span))),
        }
    }

    /// Resolve a class name and check that it may be named here.
    fn resolve_class_checked(&self, written: &str, span: Span) -> Option<String> {
        let name = self.resolve_class_name(written, span)?;
        if let Some(node) = self.class_info(&name) {
            self.assert_class_accessible(&node, span);
        }
        Some(name)
    }

    /// Validate a resolved type. Returns `false` if anything was reported.
    pub fn validate_type(&self, ty: &IType, span: Span) -> bool {
        match ty {
            IType::Raw(_) | IType::TypeParam { .. } => true,
            IType::Wildcard { ty, .. } => ty.as_deref().is_none_or(|t| self.validate_type(t, span)),
            IType::Generic(g) => {
                let Some(owner) = self.class_info(&g.owner) else {
                    return true;
                };
                let mut ok = g.args.is_empty() || self.validate_args(&owner, &g.args, span);
                let mut current = owner;
                let mut parameterized = !g.args.is_empty();
                let mut sub = g.sub.as_deref();
                while let Some(s) = sub {
                    let name = format!("{}${}", current.name, s.name);
                    let Some(node) = self.class_info(&name) else {
                        return false;
                    };
                    let flags = self
                        .helper(&current.name)
                        .and_then(|h| h.inner_class_flags().get(&name).copied())
                        .unwrap_or_else(|| node.declared_access());
                    if parameterized && access::has(flags, ACC_STATIC) {
                        self.error(span, codes::GENERIC_STATIC_THROUGH_PARAM, vec![display_name(&name)]);
                        ok = false;
                    }
                    if !s.args.is_empty() {
                        ok &= self.validate_args(&node, &s.args, span);
                    }
                    parameterized = !s.args.is_empty();
                    current = node;
                    sub = s.sub.as_deref();
                }
                ok
            }
        }
    }

    fn validate_args(&self, class: &ClassNode, args: &[IType], span: Span) -> bool {
        let Some(sig) = class.signature.as_ref().filter(|s| !s.type_params.is_empty()) else {
            self.error(span, codes::GENERIC_NOT_GENERIC, vec![display_name(&class.name)]);
            return false;
        };
        if sig.type_params.len() != args.len() {
            self.error(
                span,
                codes::GENERIC_ARITY,
                vec![display_name(&class.name), sig.type_params.len().to_string(), args.len().to_string()],
            );
            return false;
        }
        let mut ok = true;
        for arg in args {
            if arg.is_primitive() {
                self.error(span, codes::GENERIC_PRIMITIVE_ARG, vec![arg.to_string()]);
                ok = false;
            } else {
                ok &= self.validate_type(arg, span);
            }
        }
        if !ok {
            return false;
        }
        let map: FxHashMap<String, IType> =
            sig.type_params.iter().map(|p| p.name.clone()).zip(args.iter().cloned()).collect();
        for (param, arg) in sig.type_params.iter().zip(args) {
            if matches!(arg, IType::Wildcard { .. } | IType::TypeParam { .. }) {
                continue;
            }
            for bound in param.bounds() {
                let bound = bound.substitute(&map);
                if bound.is_concrete() && self.classify_cast(arg, &bound) < super::CastKind::Widening {
                    self.error(span, codes::GENERIC_BOUND, vec![arg.to_string(), bound.to_string()]);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Type variable bindings of `declaring` as seen through `receiver`.
    ///
    /// `None` when the receiver is a raw use of a generic class (its members then erase).
    pub fn type_arg_map(&self, receiver: &IType, declaring: &str) -> Option<FxHashMap<String, IType>> {
        let receiver_class = receiver.class_name()?;
        let node = self.class_info(&receiver_class)?;
        let params: Vec<String> = node.signature.iter().flat_map(|s| s.type_param_names()).map(str::to_string).collect();
        if !params.is_empty() && receiver.args().len() != params.len() {
            return None;
        }
        let receiver_map: FxHashMap<String, IType> = params.into_iter().zip(receiver.args().iter().cloned()).collect();
        if receiver_class == declaring {
            return Some(receiver_map);
        }
        let owners = self.helper(&receiver_class)?.type_param_owner(self.global()).ok()?;
        let declared_args = owners.get(declaring)?;
        let declaring_node = self.class_info(declaring)?;
        let names = declaring_node.signature.iter().flat_map(|s| s.type_param_names()).map(str::to_string);
        Some(names.zip(declared_args.iter().map(|a| a.substitute(&receiver_map))).collect())
    }

    /// `ancestor` parameterized as `ty` sees it: `ArrayList<String>` viewed as `List` is `List<String>`.
    ///
    /// `None` for raw views and for classes that are not generic.
    pub fn view_as(&self, ty: &IType, ancestor: &str) -> Option<IType> {
        let node = self.class_info(ancestor)?;
        let names: Vec<&str> = node.signature.iter().flat_map(|s| s.type_param_names()).collect();
        if names.is_empty() {
            return None;
        }
        let map = self.type_arg_map(ty, ancestor)?;
        let args = names.iter().map(|n| map.get(*n).cloned()).collect::<Option<Vec<_>>>()?;
        Some(IType::generic(ancestor, args))
    }

    /// Type of a member of `declaring`, declared as `ty`, accessed through `receiver`.
    pub fn member_type(&self, receiver: &IType, declaring: &str, ty: &IType) -> IType {
        match self.type_arg_map(receiver, declaring) {
            Some(map) => ty.substitute(&map),
            None if self.class_info(declaring).is_some_and(|n| n.type_param_count() > 0) => IType::Raw(ty.erasure()),
            None => ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use crate::types::{TypeArena, WildcardBound};
    use crate::unit::cursor::{Cursor, TokenRange};
    use crate::unit::syntax::parse_type;
    use lava_syntax::lexer::lex;

    fn written(src: &str) -> IType {
        let tokens = lex(src).unwrap();
        let mut arena = TypeArena::new();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        let ty = parse_type(&mut c, &mut arena).unwrap();
        arena.to_itype(ty)
    }

    fn codes_of(ctx: &GlobalContext) -> Vec<&'static str> {
        ctx.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_resolves_names_and_type_params() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, "import java.util.*;"), 0);
        let ty = lc.resolve_type(&written("Map<String, List<? extends T>>"), Span::at(0));
        let expected = IType::generic(
            "java/util/Map",
            vec![
                IType::string(),
                IType::generic("java/util/List", vec![IType::wildcard(WildcardBound::Extends, IType::type_param("T"))]),
            ],
        );
        assert_eq!(ty, expected);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_arity_and_primitive_args() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, "import java.util.*;"), 0);
        lc.resolve_type(&written("List<String, String>"), Span::at(0));
        lc.resolve_type(&written("List<int>"), Span::at(0));
        lc.resolve_type(&written("String<Object>"), Span::at(0));
        assert_eq!(codes_of(&ctx), vec![codes::GENERIC_ARITY, codes::GENERIC_PRIMITIVE_ARG, codes::GENERIC_NOT_GENERIC]);
        assert_eq!(ctx.diagnostics()[0].args, vec!["java.util.List", "1", "2"]);
    }

    #[test]
    fn test_bounds() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        lc.resolve_type(&written("Enum<String>"), Span::at(0));
        assert_eq!(codes_of(&ctx), vec![codes::GENERIC_BOUND]);
    }

    #[test]
    fn test_static_member_through_parameterized_owner() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, "import java.util.Map;"), 0);
        lc.resolve_type(&written("Map<String, String>.Entry<String, String>"), Span::at(0));
        assert_eq!(codes_of(&ctx), vec![codes::GENERIC_STATIC_THROUGH_PARAM]);
    }

    #[test]
    fn test_unresolved_becomes_object() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        assert_eq!(lc.resolve_type(&written("Missing[]"), Span::at(0)), IType::object().with_dims(1));
        assert_eq!(codes_of(&ctx), vec![codes::SYMBOL_UNRESOLVED]);
    }

    #[test]
    fn test_member_type_through_subclass() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let receiver = IType::generic("java/util/ArrayList", vec![IType::string()]);
        assert_eq!(lc.member_type(&receiver, "java/util/List", &IType::type_param("E")), IType::string());
        let raw = IType::class("java/util/ArrayList");
        assert_eq!(lc.member_type(&raw, "java/util/List", &IType::type_param("E")), IType::object());
    }
}
