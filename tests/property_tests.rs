//! Property-based tests for type relations
//!
//! These tests use proptest to check the laws `common_parent` and the cast
//! classifier must obey over a pool of runtime types.

use std::sync::Arc;

use lava::GlobalContext;
use lava::local::{CastKind, ClassScope, LocalContext};
use lava::types::IType;
use lava::unit::imports::ImportTable;
use lava_core::lang::primitives::PrimitiveKind;
use lava_syntax::Span;
use proptest::prelude::*;

const CLASSES: &[&str] = &[
    "java/lang/Object",
    "java/lang/String",
    "java/lang/Integer",
    "java/lang/Long",
    "java/lang/Number",
    "java/lang/Runnable",
    "java/lang/RuntimeException",
    "java/lang/IllegalArgumentException",
    "java/lang/IllegalStateException",
    "java/util/ArrayList",
    "java/util/HashSet",
    "java/util/AbstractList",
    "java/util/List",
    "java/util/Set",
    "java/util/Collection",
];

const PRIMITIVES: &[PrimitiveKind] = &[
    PrimitiveKind::Boolean,
    PrimitiveKind::Byte,
    PrimitiveKind::Char,
    PrimitiveKind::Short,
    PrimitiveKind::Int,
    PrimitiveKind::Long,
    PrimitiveKind::Float,
    PrimitiveKind::Double,
];

fn probe(ctx: &GlobalContext) -> LocalContext<'_> {
    let scope = ClassScope::new("t/Probe", Arc::new(ImportTable::new("t")), Vec::new(), None);
    LocalContext::new(ctx, Arc::new(scope), 0)
}

fn primitive() -> impl Strategy<Value = IType> {
    prop::sample::select(PRIMITIVES).prop_map(IType::primitive)
}

fn any_type() -> impl Strategy<Value = IType> {
    prop_oneof![
        3 => prop::sample::select(CLASSES).prop_map(IType::class),
        2 => primitive(),
        1 => Just(IType::null()),
        1 => (prop::sample::select(CLASSES), 1u8..3).prop_map(|(c, d)| IType::class(c).with_dims(d)),
    ]
}

proptest! {
    /// Property: `common_parent` is symmetric and reflexive
    #[test]
    fn common_parent_is_symmetric_and_reflexive(a in any_type(), b in any_type()) {
        let ctx = GlobalContext::new();
        let lc = probe(&ctx);
        prop_assert_eq!(lc.common_parent(&a, &b), lc.common_parent(&b, &a));
        prop_assert_eq!(lc.common_parent(&a, &a), a);
    }

    /// Property: both primitive operands convert implicitly to their common parent
    #[test]
    fn primitives_convert_to_common_parent(a in primitive(), b in primitive()) {
        let ctx = GlobalContext::new();
        let lc = probe(&ctx);
        let lub = lc.common_parent(&a, &b);
        prop_assert!(lc.is_assignable(&a, &lub), "{} -> {}", a, lub);
        prop_assert!(lc.is_assignable(&b, &lub), "{} -> {}", b, lub);
    }

    /// Property: a conversion accepted implicitly is also accepted in a cast
    #[test]
    fn casts_are_monotonic(from in any_type(), to in any_type()) {
        let ctx = GlobalContext::new();
        let lc = probe(&ctx);
        if lc.cast_to(&from, &to, CastKind::IMPLICIT, Span::at(0)) {
            prop_assert!(lc.cast_to(&from, &to, CastKind::EXPLICIT, Span::at(0)));
        }
        prop_assert_eq!(lc.is_assignable(&from, &to), lc.classify_cast(&from, &to) >= CastKind::IMPLICIT);
    }

    /// Property: every class type is assignable to itself and to `Object`
    #[test]
    fn classes_widen_to_object(name in prop::sample::select(CLASSES)) {
        let ctx = GlobalContext::new();
        let lc = probe(&ctx);
        let ty = IType::class(name);
        prop_assert_eq!(lc.classify_cast(&ty, &ty), CastKind::Identity);
        prop_assert!(lc.is_assignable(&ty, &IType::object()));
    }
}

#[test]
fn exceptions_meet_at_runtime_exception() {
    let ctx = GlobalContext::new();
    let lc = probe(&ctx);
    let lub = lc.common_parent(
        &IType::class("java/lang/IllegalArgumentException"),
        &IType::class("java/lang/IllegalStateException"),
    );
    assert_eq!(lub, IType::class("java/lang/RuntimeException"));
}
