//! Least upper bound of two types.
//!
//! Used for conditional expressions and for inferring a method type variable bound by several arguments.
//!
//! Class types: the shared ancestor with the smallest combined BFS distance wins, ties broken by the smaller distance
//! in the longer of the two ancestor lists. When both lists are the same length the smaller of the two individual
//! distances decides, then classes before interfaces, then the name. `Object` is only chosen when nothing else is
//! shared.
//!
//! Type arguments of a shared parameterized ancestor are merged pairwise:
//!
//! | left          | right         | merged                     |
//! |---------------|---------------|----------------------------|
//! | `X`           | `Y`           | `? extends lub(X, Y)`      |
//! | `? extends X` | `Y`           | `? extends lub(X, Y)`      |
//! | `? extends X` | `? extends Y` | `? extends lub(X, Y)`      |
//! | `? super X`   | `? super Y`   | `?`                        |
//! | `? super X`   | `Y`           | `?`                        |
//! | `? extends X` | `? super Y`   | raw ancestor               |
//! | `?`           | anything      | `?`                        |
//!
//! The table follows long-standing compiler behaviour and is not a complete implementation of JLS §4.10.4.

use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::well_known;

use super::LocalContext;
use crate::types::{IType, WildcardBound};

/// Nesting limit for recursive argument merging (`Comparable<Comparable<...>>`).
const MAX_DEPTH: u32 = 3;

impl LocalContext<'_> {
    /// Most specific type both `a` and `b` convert to. Symmetric and reflexive.
    pub fn common_parent(&self, a: &IType, b: &IType) -> IType {
        self.lub(a, b, 0)
    }

    fn lub(&self, a: &IType, b: &IType, depth: u32) -> IType {
        if a == b {
            return a.clone();
        }
        if a.is_null() || b.is_null() {
            let other = if a.is_null() { b } else { a };
            return match other.primitive_kind() {
                Some(kind) => kind.wrapper().map_or_else(IType::object, IType::class),
                None => other.clone(),
            };
        }
        match (a.primitive_kind(), b.primitive_kind()) {
            (Some(x), Some(y)) => {
                return PrimitiveKind::promote(x, y).map_or_else(IType::object, IType::primitive);
            }
            (Some(_), None) | (None, Some(_)) => return IType::object(),
            (None, None) => {}
        }
        if a.is_array() || b.is_array() {
            if a.dims() != b.dims() {
                return IType::object();
            }
            let (ca, cb) = (a.component(), b.component());
            if ca.is_primitive() || cb.is_primitive() {
                return IType::object();
            }
            return self.lub(&ca, &cb, depth).with_dims(a.dims());
        }
        let (Some(an), Some(bn)) = (a.class_name(), b.class_name()) else {
            return IType::object();
        };
        let Some(ancestor) = self.nearest_common_ancestor(&an, &bn) else {
            return IType::object();
        };
        self.parameterize(&ancestor, a, b, depth)
    }

    fn nearest_common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        let la = self.helper(a)?.class_list(self.global()).ok()?;
        let lb = self.helper(b)?.class_list(self.global()).ok()?;
        let longer = la.len().cmp(&lb.len());
        la.iter()
            .filter(|(name, _)| *name != well_known::OBJECT)
            .filter_map(|(name, da)| lb.distance(name).map(|db| (da, db, name)))
            .map(|(da, db, name)| {
                let near = match longer {
                    std::cmp::Ordering::Greater => da,
                    std::cmp::Ordering::Less => db,
                    std::cmp::Ordering::Equal => da.max(db),
                };
                let interface = self.class_info(name).is_none_or(|n| n.is_interface());
                (da + db, near, interface, name)
            })
            .min()
            .map(|(_, _, _, name)| name.to_string())
    }

    /// `ancestor` parameterized with the merged arguments `a` and `b` pass to it.
    fn parameterize(&self, ancestor: &str, a: &IType, b: &IType, depth: u32) -> IType {
        let raw = IType::class(ancestor);
        let Some(node) = self.class_info(ancestor) else {
            return raw;
        };
        let names: Vec<&str> = node.signature.iter().flat_map(|s| s.type_param_names()).collect();
        if names.is_empty() {
            return raw;
        }
        let (Some(ma), Some(mb)) = (self.type_arg_map(a, ancestor), self.type_arg_map(b, ancestor)) else {
            return raw;
        };
        let mut args = Vec::with_capacity(names.len());
        for name in names {
            let (Some(x), Some(y)) = (ma.get(name), mb.get(name)) else {
                return raw;
            };
            match self.merge_arg(x, y, depth + 1) {
                Some(arg) => args.push(arg),
                None => return raw,
            }
        }
        IType::generic(ancestor, args)
    }

    /// One row of the merge table; `None` means the ancestor must stay raw.
    fn merge_arg(&self, x: &IType, y: &IType, depth: u32) -> Option<IType> {
        if x == y {
            return Some(x.clone());
        }
        if depth > MAX_DEPTH {
            return Some(IType::unbounded());
        }
        let merged = match (split(x), split(y)) {
            ((WildcardBound::Unbounded, _), _) | (_, (WildcardBound::Unbounded, _)) => IType::unbounded(),
            ((WildcardBound::Super, _), (WildcardBound::Super, _)) => IType::unbounded(),
            ((WildcardBound::Super, _), (WildcardBound::Extends, _))
            | ((WildcardBound::Extends, _), (WildcardBound::Super, _)) => {
                // `split` reports plain arguments as `Extends`
                if is_wildcard(x) && is_wildcard(y) {
                    return None;
                }
                IType::unbounded()
            }
            ((WildcardBound::Extends, tx), (WildcardBound::Extends, ty)) => {
                let bound = self.lub(tx, ty, depth);
                if bound == IType::object() {
                    IType::unbounded()
                } else {
                    IType::wildcard(WildcardBound::Extends, bound)
                }
            }
        };
        Some(merged)
    }
}

/// Wildcard kind and bound of a type argument. A plain argument counts as `? extends` itself.
fn split(arg: &IType) -> (WildcardBound, &IType) {
    match arg {
        IType::Wildcard {
            bound: WildcardBound::Unbounded,
            ..
        }
        | IType::Wildcard { ty: None, .. } => (WildcardBound::Unbounded, arg),
        IType::Wildcard { bound, ty: Some(ty) } => (*bound, ty),
        plain => (WildcardBound::Extends, plain),
    }
}

fn is_wildcard(arg: &IType) -> bool {
    matches!(arg, IType::Wildcard { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassOrigin};
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use lava_core::access::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC};

    const INTERFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;

    fn diamond(ctx: &GlobalContext) {
        for builder in [
            ClassBuilder::new("d/A", INTERFACE),
            ClassBuilder::new("d/B", INTERFACE).interfaces(&["d/A"]),
            ClassBuilder::new("d/C", INTERFACE).interfaces(&["d/A"]),
            ClassBuilder::new("d/D", ACC_PUBLIC).interfaces(&["d/B", "d/C"]),
        ] {
            ctx.add_generated_class(builder.origin(ClassOrigin::Generated).build().unwrap());
        }
    }

    #[test]
    fn test_diamond() {
        let ctx = GlobalContext::new();
        diamond(&ctx);
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let (b, c) = (IType::class("d/B"), IType::class("d/C"));
        assert_eq!(lc.common_parent(&b, &c), IType::class("d/A"));
        assert_eq!(lc.common_parent(&c, &b), IType::class("d/A"));
        assert_eq!(lc.common_parent(&IType::class("d/D"), &b), b);
    }

    #[test]
    fn test_tie_goes_to_the_nearer_ancestor_of_the_longer_list() {
        let ctx = GlobalContext::new();
        for builder in [
            ClassBuilder::new("t/I1", INTERFACE),
            ClassBuilder::new("t/I2", INTERFACE),
            ClassBuilder::new("t/I3", INTERFACE),
            ClassBuilder::new("t/I4", INTERFACE),
            ClassBuilder::new("t/P", ACC_PUBLIC).interfaces(&["t/I2"]),
            ClassBuilder::new("t/Q", ACC_PUBLIC).interfaces(&["t/I1"]),
            ClassBuilder::new("t/A", ACC_PUBLIC).parent("t/P").interfaces(&["t/I1"]),
            ClassBuilder::new("t/B", ACC_PUBLIC).parent("t/Q").interfaces(&["t/I2", "t/I3", "t/I4"]),
        ] {
            ctx.add_generated_class(builder.origin(ClassOrigin::Generated).build().unwrap());
        }
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let (a, b) = (IType::class("t/A"), IType::class("t/B"));
        assert_eq!(lc.common_parent(&a, &b), IType::class("t/I2"));
        assert_eq!(lc.common_parent(&b, &a), IType::class("t/I2"));
    }

    #[test]
    fn test_primitives_and_null() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let int = IType::primitive(PrimitiveKind::Int);
        let long = IType::primitive(PrimitiveKind::Long);
        assert_eq!(lc.common_parent(&int, &long), long);
        assert_eq!(lc.common_parent(&int, &IType::string()), IType::object());
        assert_eq!(lc.common_parent(&IType::null(), &IType::string()), IType::string());
        assert_eq!(lc.common_parent(&IType::null(), &int), IType::class("java/lang/Integer"));
    }

    #[test]
    fn test_boxed_numbers_share_number() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let lub = lc.common_parent(&IType::class("java/lang/Integer"), &IType::class("java/lang/Long"));
        assert_eq!(lub, IType::class(well_known::NUMBER));
    }

    #[test]
    fn test_arrays() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let ints = IType::primitive(PrimitiveKind::Int).with_dims(1);
        let longs = IType::primitive(PrimitiveKind::Long).with_dims(1);
        assert_eq!(lc.common_parent(&ints, &longs), IType::object());
        let lists = IType::class("java/util/AbstractList").with_dims(1);
        let sets = IType::class("java/util/AbstractSet").with_dims(1);
        assert_eq!(lc.common_parent(&lists, &sets), IType::class("java/util/AbstractCollection").with_dims(1));
    }

    #[test]
    fn test_argument_merge_table() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let list = |arg: IType| IType::generic(well_known::LIST, vec![arg]);
        let int = IType::class("java/lang/Integer");
        let long = IType::class("java/lang/Long");

        let merged = lc.common_parent(&list(int.clone()), &list(long.clone()));
        assert_eq!(merged, list(IType::wildcard(WildcardBound::Extends, IType::class(well_known::NUMBER))));

        let supers = lc.common_parent(
            &list(IType::wildcard(WildcardBound::Super, int.clone())),
            &list(IType::wildcard(WildcardBound::Super, long.clone())),
        );
        assert_eq!(supers, list(IType::unbounded()));

        let conflict = lc.common_parent(
            &list(IType::wildcard(WildcardBound::Extends, int)),
            &list(IType::wildcard(WildcardBound::Super, long)),
        );
        assert_eq!(conflict, IType::class(well_known::LIST));
    }

    #[test]
    fn test_arguments_through_subclass() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let a = IType::generic("java/util/ArrayList", vec![IType::string()]);
        let b = IType::generic(well_known::LIST, vec![IType::string()]);
        assert_eq!(lc.common_parent(&a, &b), b);
    }
}
