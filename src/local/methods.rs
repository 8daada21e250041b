//! Method overload selection.
//!
//! Candidates come from [`crate::resolve::ResolveHelper::find_method`]. Selection runs the usual three phases and
//! stops at the first one with an applicable candidate:
//!
//! 1. strict: every argument widens to its parameter
//! 2. loose: boxing and unboxing allowed
//! 3. variable arity: trailing arguments match the component of a varargs parameter
//!
//! Within a phase the most specific candidate wins; if none is strictly more specific the nearest one is taken.
//! Method type variables are inferred from the arguments only (no target typing).

use lava_core::access::{self, ACC_VARARGS};
use rustc_hash::FxHashMap;

use super::{CastKind, LocalContext};
use crate::resolve::MethodRef;
use crate::types::IType;

/// An applicable method with its parameter and return types as seen from the call site.
#[derive(Debug, Clone)]
pub struct MethodMatch {
    pub method: MethodRef,
    pub params: Vec<IType>,
    pub ret: IType,
    pub varargs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Strict,
    Loose,
    Varargs,
}

impl Phase {
    fn min(self) -> CastKind {
        match self {
            Phase::Strict => CastKind::Widening,
            Phase::Loose | Phase::Varargs => CastKind::IMPLICIT,
        }
    }
}

impl LocalContext<'_> {
    /// Pick the overload of `candidates` that `args` select, viewed through `receiver`.
    pub fn select_method(&self, receiver: &IType, candidates: &[MethodRef], args: &[IType]) -> Option<MethodMatch> {
        for phase in [Phase::Strict, Phase::Loose, Phase::Varargs] {
            let applicable: Vec<MethodMatch> =
                candidates.iter().filter_map(|m| self.applicable(receiver, m, args, phase)).collect();
            if let Some(best) = self.most_specific(applicable) {
                return Some(best);
            }
        }
        None
    }

    fn applicable(&self, receiver: &IType, m: &MethodRef, args: &[IType], phase: Phase) -> Option<MethodMatch> {
        let method = m.method();
        let varargs = phase == Phase::Varargs;
        if varargs && !access::has(method.access, ACC_VARARGS) {
            return None;
        }
        let view = |ty: &IType| {
            if method.is_static() {
                ty.clone()
            } else {
                self.member_type(receiver, &m.owner.name, ty)
            }
        };
        let declared: Vec<IType> = method.generic_params().iter().map(view).collect();
        let arity_ok = if varargs {
            !declared.is_empty() && args.len() + 1 >= declared.len()
        } else {
            args.len() == declared.len()
        };
        if !arity_ok {
            return None;
        }
        let method_params: Vec<&str> =
            method.signature.iter().flat_map(|s| s.type_params.iter()).map(|p| p.name.as_str()).collect();
        let mut inferred: FxHashMap<String, IType> = FxHashMap::default();
        if !method_params.is_empty() {
            for (i, arg) in args.iter().enumerate() {
                if let Some(param) = param_for(&declared, i, varargs) {
                    self.infer(&param, arg, &method_params, &mut inferred);
                }
            }
            for name in &method_params {
                inferred.entry((*name).to_string()).or_insert_with(IType::object);
            }
        }
        let params: Vec<IType> = declared.iter().map(|p| p.substitute(&inferred)).collect();
        for (i, arg) in args.iter().enumerate() {
            let target = param_for(&params, i, varargs)?;
            if self.classify_cast(arg, &target) < phase.min() {
                return None;
            }
        }
        let ret = view(&method.generic_return()).substitute(&inferred);
        Some(MethodMatch {
            method: m.clone(),
            params,
            ret,
            varargs,
        })
    }

    /// Bind method type variables occurring in `param` from the argument type.
    fn infer(&self, param: &IType, arg: &IType, vars: &[&str], inferred: &mut FxHashMap<String, IType>) {
        match param {
            IType::TypeParam { name, dims } if vars.contains(&name.as_str()) => {
                if arg.is_null() || arg.dims() < *dims {
                    return;
                }
                let mut bound = arg.with_dims(arg.dims() - dims);
                if let Some(kind) = bound.primitive_kind() {
                    match kind.wrapper() {
                        Some(wrapper) => bound = IType::class(wrapper),
                        None => return,
                    }
                }
                let merged = match inferred.get(name) {
                    Some(previous) => self.common_parent(previous, &bound),
                    None => bound,
                };
                inferred.insert(name.clone(), merged);
            }
            IType::Generic(_) => {
                let Some(owner) = param.class_name() else {
                    return;
                };
                let Some(map) = self.type_arg_map(arg, &owner) else {
                    return;
                };
                let Some(node) = self.class_info(&owner) else {
                    return;
                };
                let names = node.signature.iter().flat_map(|s| s.type_param_names());
                for (name, p) in names.zip(param.args()) {
                    if let Some(a) = map.get(name) {
                        let a = match a {
                            IType::Wildcard { ty: Some(t), .. } => t.as_ref(),
                            other => other,
                        };
                        let p = match p {
                            IType::Wildcard { ty: Some(t), .. } => t.as_ref(),
                            other => other,
                        };
                        self.infer(p, a, vars, inferred);
                    }
                }
            }
            _ => {}
        }
    }

    fn most_specific(&self, mut applicable: Vec<MethodMatch>) -> Option<MethodMatch> {
        if applicable.len() <= 1 {
            return applicable.pop();
        }
        let more_specific = |a: &MethodMatch, b: &MethodMatch| {
            a.params.len() == b.params.len()
                && a.params.iter().zip(&b.params).all(|(x, y)| self.classify_cast(x, y) >= CastKind::Widening)
        };
        let winner = (0..applicable.len()).find(|&i| {
            (0..applicable.len()).all(|j| i == j || more_specific(&applicable[i], &applicable[j]))
        });
        Some(applicable.swap_remove(winner.unwrap_or(0)))
    }
}

/// Parameter type the `i`-th argument is matched against.
fn param_for(params: &[IType], i: usize, varargs: bool) -> Option<IType> {
    if varargs && i + 1 >= params.len() {
        params.last().map(IType::component)
    } else {
        params.get(i).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use lava_core::lang::primitives::PrimitiveKind;
    use lava_core::lang::well_known;

    fn candidates(ctx: &GlobalContext, class: &str, name: &str) -> Vec<MethodRef> {
        ctx.helper_for(class).unwrap().find_method(ctx, name).unwrap()
    }

    #[test]
    fn test_exact_overload_beats_boxing() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let sb = IType::class(well_known::STRING_BUILDER);
        let append = candidates(&ctx, well_known::STRING_BUILDER, "append");
        let m = lc.select_method(&sb, &append, &[IType::primitive(PrimitiveKind::Int)]).unwrap();
        assert_eq!(m.method.method().descriptor(), "(I)Ljava/lang/StringBuilder;");
        let m = lc.select_method(&sb, &append, &[IType::string()]).unwrap();
        assert_eq!(m.method.method().descriptor(), "(Ljava/lang/String;)Ljava/lang/StringBuilder;");
        let m = lc.select_method(&sb, &append, &[IType::class("java/util/ArrayList")]).unwrap();
        assert_eq!(m.method.method().descriptor(), "(Ljava/lang/Object;)Ljava/lang/StringBuilder;");
    }

    #[test]
    fn test_return_type_through_receiver() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let list = IType::generic("java/util/ArrayList", vec![IType::string()]);
        let get = candidates(&ctx, "java/util/ArrayList", "get");
        let m = lc.select_method(&list, &get, &[IType::primitive(PrimitiveKind::Int)]).unwrap();
        assert_eq!(m.ret, IType::string());
        assert!(lc.select_method(&list, &get, &[IType::string()]).is_none());
    }

    #[test]
    fn test_no_arg_generic_method_defaults_to_object() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let of = candidates(&ctx, well_known::LIST, "of");
        let m = lc.select_method(&IType::class(well_known::LIST), &of, &[]).unwrap();
        assert_eq!(m.ret, IType::generic(well_known::LIST, vec![IType::object()]));
    }
}
