//! Conversion classification.
//!
//! Every conversion from one type to another falls into one [`CastKind`]. The kinds are ordered by how freely the
//! conversion may happen, so "is this allowed here" is a single comparison against the minimum the context accepts:
//! assignment contexts accept [`CastKind::IMPLICIT`] and above, cast expressions accept [`CastKind::EXPLICIT`].

use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::well_known;
use lava_syntax::diagnostics::codes;
use lava_syntax::{Severity, Span};

use super::LocalContext;
use crate::types::IType;

/// How a value of one type converts to another, from least to most permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CastKind {
    /// No conversion exists.
    Never,
    /// Numeric narrowing (`long` → `int`); may lose information.
    NumericNarrowing,
    /// Reference narrowing checked at run time.
    Downcast,
    /// Boxing or unboxing, possibly followed by widening.
    Boxing,
    /// Primitive or reference widening.
    Widening,
    Identity,
}

impl CastKind {
    /// Minimum accepted by assignment and argument contexts.
    pub const IMPLICIT: CastKind = CastKind::Boxing;
    /// Minimum accepted by cast expressions.
    pub const EXPLICIT: CastKind = CastKind::NumericNarrowing;
}

const ARRAY_SUPERTYPES: &[&str] = well_known::ARRAY_SUPERTYPES;

impl LocalContext<'_> {
    /// Classify the conversion from `from` to `to`. Pure: never reports.
    pub fn classify_cast(&self, from: &IType, to: &IType) -> CastKind {
        if from == to {
            return CastKind::Identity;
        }
        if from.is_void() || to.is_void() {
            return CastKind::Never;
        }
        if from.is_null() {
            return if to.is_primitive() { CastKind::Never } else { CastKind::Widening };
        }
        match (from.primitive_kind(), to.primitive_kind()) {
            (Some(a), Some(b)) => return classify_primitive(a, b),
            (Some(a), None) => return self.classify_boxing(a, to),
            (None, Some(b)) => return self.classify_unboxing(from, b),
            (None, None) => {}
        }
        if matches!(to, IType::Wildcard { .. }) || matches!(from, IType::Wildcard { .. }) {
            return self.classify_cast(&wildcard_upper(from), &wildcard_upper(to));
        }
        if from.is_array() || to.is_array() {
            return self.classify_arrays(from, to);
        }
        if matches!(to, IType::TypeParam { .. }) {
            return CastKind::Downcast;
        }
        let from_erased = from.erasure();
        let to_erased = to.erasure();
        if from_erased == to_erased {
            return if to.args().is_empty() {
                CastKind::Identity
            } else if from.args().is_empty() || self.args_contained(from.args(), to.args()) {
                // raw to parameterized is an unchecked conversion
                CastKind::Widening
            } else {
                CastKind::Downcast
            };
        }
        let kind = match (from_erased.class_name(), to_erased.class_name()) {
            (Some(a), Some(b)) => self.classify_classes(a, b),
            _ => CastKind::Never,
        };
        if kind != CastKind::Widening || to.args().is_empty() {
            return kind;
        }
        match to_erased.class_name().and_then(|target| self.view_as(from, target)) {
            Some(view) if !self.args_contained(view.args(), to.args()) => CastKind::Downcast,
            _ => CastKind::Widening,
        }
    }

    /// Return `true` if every argument in `from` is contained by the one at the same position in `to`.
    fn args_contained(&self, from: &[IType], to: &[IType]) -> bool {
        from.len() == to.len() && from.iter().zip(to).all(|(f, t)| self.contains_arg(t, f))
    }

    fn contains_arg(&self, outer: &IType, inner: &IType) -> bool {
        use crate::types::WildcardBound;
        if outer == inner {
            return true;
        }
        match outer {
            IType::Wildcard { ty: None, .. }
            | IType::Wildcard {
                bound: WildcardBound::Unbounded,
                ..
            } => true,
            IType::Wildcard {
                bound: WildcardBound::Extends,
                ty: Some(bound),
            } => self.classify_cast(&wildcard_upper(inner), bound) >= CastKind::Widening,
            IType::Wildcard {
                bound: WildcardBound::Super,
                ty: Some(bound),
            } => match inner {
                IType::Wildcard {
                    bound: WildcardBound::Super,
                    ty: Some(lower),
                } => self.classify_cast(bound, lower) >= CastKind::Widening,
                IType::Wildcard { .. } => false,
                _ => self.classify_cast(bound, inner) >= CastKind::Widening,
            },
            _ => false,
        }
    }

    /// Check that `from` converts to `to` in a context accepting `min` and above.
    ///
    /// Rejections are errors; accepted narrowing and accepted unchecked generic downcasts are warnings.
    pub fn cast_to(&self, from: &IType, to: &IType, min: CastKind, span: Span) -> bool {
        let kind = self.classify_cast(from, to);
        let args = || vec![from.to_string(), to.to_string()];
        if kind < min {
            let code = if kind == CastKind::NumericNarrowing {
                codes::CAST_NEEDS_EXPLICIT
            } else {
                codes::CAST_FORBIDDEN
            };
            self.error(span, code, args());
            return false;
        }
        match kind {
            CastKind::NumericNarrowing => self.report(Severity::SevereWarning, span, codes::CAST_LOSSY, args()),
            CastKind::Downcast if !to.is_concrete() || !to.args().is_empty() => {
                self.warn(span, codes::CAST_UNCHECKED, args())
            }
            _ => {}
        }
        true
    }

    /// Return `true` if `from` is assignable to `to` without a cast.
    pub fn is_assignable(&self, from: &IType, to: &IType) -> bool {
        self.classify_cast(from, to) >= CastKind::IMPLICIT
    }

    fn classify_boxing(&self, prim: PrimitiveKind, to: &IType) -> CastKind {
        match (prim.wrapper(), to.erasure().class_name()) {
            (Some(wrapper), Some(target)) if self.instance_of(wrapper, target) => CastKind::Boxing,
            _ => CastKind::Never,
        }
    }

    fn classify_unboxing(&self, from: &IType, prim: PrimitiveKind) -> CastKind {
        let erased = from.erasure();
        let Some(class) = erased.class_name() else {
            return CastKind::Never;
        };
        match PrimitiveKind::from_wrapper(class) {
            Some(unboxed) if unboxed.widens_to(prim) => CastKind::Boxing,
            Some(_) => CastKind::Never,
            // `(int) obj`: checked cast to the wrapper, then unboxing.
            None => match prim.wrapper() {
                Some(wrapper) if self.instance_of(wrapper, class) => CastKind::Downcast,
                _ => CastKind::Never,
            },
        }
    }

    fn classify_arrays(&self, from: &IType, to: &IType) -> CastKind {
        match (from.is_array(), to.is_array()) {
            (true, true) => {
                let (a, b) = (from.component(), to.component());
                if a.is_primitive() || b.is_primitive() {
                    return if a == b { CastKind::Identity } else { CastKind::Never };
                }
                match self.classify_cast(&a, &b) {
                    kind @ (CastKind::Identity | CastKind::Widening | CastKind::Downcast) => kind,
                    _ => CastKind::Never,
                }
            }
            (true, false) => match to.erasure().class_name() {
                Some(name) if ARRAY_SUPERTYPES.contains(&name) => CastKind::Widening,
                _ if matches!(to, IType::TypeParam { .. }) => CastKind::Downcast,
                _ => CastKind::Never,
            },
            (false, true) => match from.erasure().class_name() {
                Some(name) if ARRAY_SUPERTYPES.contains(&name) => CastKind::Downcast,
                _ if matches!(from, IType::TypeParam { .. }) => CastKind::Downcast,
                _ => CastKind::Never,
            },
            (false, false) => CastKind::Never,
        }
    }

    fn classify_classes(&self, from: &str, to: &str) -> CastKind {
        let (Some(from_node), Some(to_node)) = (self.class_info(from), self.class_info(to)) else {
            // Missing classes were already reported; do not cascade.
            return CastKind::Widening;
        };
        if self.instance_of(from, to) {
            return CastKind::Widening;
        }
        if self.instance_of(to, from) {
            return CastKind::Downcast;
        }
        let open = |node: &crate::class::ClassNode| node.is_interface() || !node.is_final();
        if (from_node.is_interface() && open(&to_node)) || (to_node.is_interface() && open(&from_node)) {
            return CastKind::Downcast;
        }
        CastKind::Never
    }
}

fn classify_primitive(from: PrimitiveKind, to: PrimitiveKind) -> CastKind {
    if from == to {
        CastKind::Identity
    } else if from.widens_to(to) {
        CastKind::Widening
    } else if from.is_numeric() && to.is_numeric() {
        CastKind::NumericNarrowing
    } else {
        CastKind::Never
    }
}

/// Upper bound of a wildcard (`? extends X` → `X`, others → `Object`).
fn wildcard_upper(ty: &IType) -> IType {
    match ty {
        IType::Wildcard {
            bound: crate::types::WildcardBound::Extends,
            ty: Some(bound),
        } => (**bound).clone(),
        IType::Wildcard { .. } => IType::object(),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;

    fn p(kind: PrimitiveKind) -> IType {
        IType::primitive(kind)
    }

    #[test]
    fn test_primitive_conversions() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Int), &p(PrimitiveKind::Long)), CastKind::Widening);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Long), &p(PrimitiveKind::Int)), CastKind::NumericNarrowing);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Boolean), &p(PrimitiveKind::Int)), CastKind::Never);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Int), &IType::class("java/lang/Integer")), CastKind::Boxing);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Int), &IType::class("java/lang/Number")), CastKind::Boxing);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Int), &IType::string()), CastKind::Never);
        assert_eq!(lc.classify_cast(&IType::class("java/lang/Integer"), &p(PrimitiveKind::Long)), CastKind::Boxing);
        assert_eq!(lc.classify_cast(&IType::object(), &p(PrimitiveKind::Int)), CastKind::Downcast);
    }

    #[test]
    fn test_reference_conversions() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let list = IType::class("java/util/List");
        let array_list = IType::class("java/util/ArrayList");
        assert_eq!(lc.classify_cast(&array_list, &list), CastKind::Widening);
        assert_eq!(lc.classify_cast(&list, &array_list), CastKind::Downcast);
        assert_eq!(lc.classify_cast(&IType::string(), &IType::class("java/lang/Integer")), CastKind::Never);
        // String is final and does not implement List
        assert_eq!(lc.classify_cast(&IType::string(), &list), CastKind::Never);
        assert_eq!(lc.classify_cast(&IType::Raw(crate::types::Type::null()), &list), CastKind::Widening);
        let strings = IType::string().with_dims(1);
        assert_eq!(lc.classify_cast(&strings, &IType::object().with_dims(1)), CastKind::Widening);
        assert_eq!(lc.classify_cast(&strings, &IType::class(well_known::CLONEABLE)), CastKind::Widening);
        assert_eq!(lc.classify_cast(&p(PrimitiveKind::Int).with_dims(1), &p(PrimitiveKind::Long).with_dims(1)), CastKind::Never);
    }

    #[test]
    fn test_type_argument_containment() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let list = |arg: IType| IType::generic("java/util/List", vec![arg]);
        let strings = IType::generic("java/util/ArrayList", vec![IType::string()]);
        assert_eq!(lc.classify_cast(&strings, &list(IType::string())), CastKind::Widening);
        assert_eq!(lc.classify_cast(&strings, &list(IType::class("java/lang/Integer"))), CastKind::Downcast);
        let numbers = list(IType::wildcard(crate::types::WildcardBound::Extends, IType::class(well_known::NUMBER)));
        let ints = list(IType::class("java/lang/Integer"));
        assert_eq!(lc.classify_cast(&ints, &numbers), CastKind::Widening);
        assert_eq!(lc.classify_cast(&numbers, &ints), CastKind::Downcast);
        assert_eq!(lc.classify_cast(&IType::class("java/util/ArrayList"), &list(IType::string())), CastKind::Widening);
    }

    #[test]
    fn test_cast_to_reports_by_kind() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let span = Span::at(0);
        assert!(!lc.cast_to(&p(PrimitiveKind::Long), &p(PrimitiveKind::Int), CastKind::IMPLICIT, span));
        assert!(lc.cast_to(&p(PrimitiveKind::Long), &p(PrimitiveKind::Int), CastKind::EXPLICIT, span));
        assert!(!lc.cast_to(&IType::string(), &p(PrimitiveKind::Int), CastKind::EXPLICIT, span));
        let found: Vec<_> = ctx.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(found, vec![codes::CAST_NEEDS_EXPLICIT, codes::CAST_LOSSY, codes::CAST_FORBIDDEN]);
    }

    #[test]
    fn test_generic_downcast_is_unchecked() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let target = IType::generic("java/util/List", vec![IType::string()]);
        assert!(lc.cast_to(&IType::object(), &target, CastKind::EXPLICIT, Span::at(0)));
        assert_eq!(ctx.diagnostics()[0].code, codes::CAST_UNCHECKED);
    }
}
