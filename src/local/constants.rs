//! Compile-time constants.
//!
//! Folding follows JVM arithmetic: integer operations wrap, shift distances are masked to the operand width, integer
//! division by zero is an error, and floating-point to integer conversions saturate (NaN becomes zero). String
//! concatenation uses the Java rendering of each operand (`1.0E10`, not `1e10`).

use lava_core::access::{self, ACC_ENUM};
use lava_core::lang::operators::OperatorId;
use lava_core::lang::primitives::PrimitiveKind;
use thiserror::Error;

use super::{FieldAccess, LocalContext};
use crate::class::{Constant, ElementValue};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoldError {
    #[error("division by zero")]
    DivByZero,
}

impl LocalContext<'_> {
    /// Compile-time value of a field: its constant attribute, or the constant itself for an enum constant.
    pub fn constant_value(&self, field: &FieldAccess) -> Option<ElementValue> {
        if let Some(constant) = field.constant() {
            return Some(ElementValue::Const(constant.clone()));
        }
        let node = field.field.field();
        (access::has(node.access, ACC_ENUM) && field.is_static()).then(|| ElementValue::Enum {
            owner: field.owner().name.clone(),
            name: node.name.clone(),
        })
    }
}

/// Numeric value after unary promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    I(i32),
    L(i64),
    F(f32),
    D(f64),
}

impl Num {
    fn of(c: &Constant) -> Option<Num> {
        Some(match *c {
            Constant::Char(v) => Num::I(i32::from(v)),
            Constant::Byte(v) => Num::I(i32::from(v)),
            Constant::Short(v) => Num::I(i32::from(v)),
            Constant::Int(v) => Num::I(v),
            Constant::Long(v) => Num::L(v),
            Constant::Float(v) => Num::F(v),
            Constant::Double(v) => Num::D(v),
            Constant::Boolean(_) | Constant::String(_) => return None,
        })
    }

    fn rank(self) -> u8 {
        match self {
            Num::I(_) => 0,
            Num::L(_) => 1,
            Num::F(_) => 2,
            Num::D(_) => 3,
        }
    }

    fn to_rank(self, rank: u8) -> Num {
        match rank {
            0 => Num::I(self.as_i32()),
            1 => Num::L(self.as_i64()),
            2 => Num::F(self.as_f32()),
            _ => Num::D(self.as_f64()),
        }
    }

    fn as_i32(self) -> i32 {
        match self {
            Num::I(v) => v,
            Num::L(v) => v as i32,
            Num::F(v) => v as i32,
            Num::D(v) => v as i32,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Num::I(v) => i64::from(v),
            Num::L(v) => v,
            Num::F(v) => v as i64,
            Num::D(v) => v as i64,
        }
    }

    fn as_f32(self) -> f32 {
        match self {
            Num::I(v) => v as f32,
            Num::L(v) => v as f32,
            Num::F(v) => v,
            Num::D(v) => v as f32,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::I(v) => f64::from(v),
            Num::L(v) => v as f64,
            Num::F(v) => f64::from(v),
            Num::D(v) => v,
        }
    }

    fn into_constant(self) -> Constant {
        match self {
            Num::I(v) => Constant::Int(v),
            Num::L(v) => Constant::Long(v),
            Num::F(v) => Constant::Float(v),
            Num::D(v) => Constant::Double(v),
        }
    }
}

/// Fold a prefix operator. `None` when the operator does not apply to the operand.
pub fn fold_unary(op: OperatorId, operand: &Constant) -> Option<Constant> {
    if let Constant::Boolean(b) = operand {
        return (op == OperatorId::Not).then_some(Constant::Boolean(!b));
    }
    let n = Num::of(operand)?;
    let folded = match (op, n) {
        (OperatorId::Plus, n) => n,
        (OperatorId::Minus, Num::I(v)) => Num::I(v.wrapping_neg()),
        (OperatorId::Minus, Num::L(v)) => Num::L(v.wrapping_neg()),
        (OperatorId::Minus, Num::F(v)) => Num::F(-v),
        (OperatorId::Minus, Num::D(v)) => Num::D(-v),
        (OperatorId::Tilde, Num::I(v)) => Num::I(!v),
        (OperatorId::Tilde, Num::L(v)) => Num::L(!v),
        _ => return None,
    };
    Some(folded.into_constant())
}

/// Fold a binary operator. `Ok(None)` when the operator does not apply to the operands.
pub fn fold_binary(op: OperatorId, left: &Constant, right: &Constant) -> Result<Option<Constant>, FoldError> {
    if op == OperatorId::Plus && (matches!(left, Constant::String(_)) || matches!(right, Constant::String(_))) {
        return Ok(Some(Constant::String(format!("{}{}", java_string(left), java_string(right)))));
    }
    if let (Constant::Boolean(l), Constant::Boolean(r)) = (left, right) {
        let (l, r) = (*l, *r);
        return Ok(match op {
            OperatorId::AndAnd | OperatorId::Amp => Some(Constant::Boolean(l && r)),
            OperatorId::OrOr | OperatorId::Pipe => Some(Constant::Boolean(l || r)),
            OperatorId::Caret | OperatorId::NotEq => Some(Constant::Boolean(l != r)),
            OperatorId::EqEq => Some(Constant::Boolean(l == r)),
            _ => None,
        });
    }
    if let (Constant::String(l), Constant::String(r)) = (left, right) {
        // interned literals compare by identity
        return Ok(match op {
            OperatorId::EqEq => Some(Constant::Boolean(l == r)),
            OperatorId::NotEq => Some(Constant::Boolean(l != r)),
            _ => None,
        });
    }
    let (Some(l), Some(r)) = (Num::of(left), Num::of(right)) else {
        return Ok(None);
    };
    if matches!(op, OperatorId::Shl | OperatorId::Shr | OperatorId::UShr) {
        return Ok(fold_shift(op, l, r).map(Num::into_constant));
    }
    let rank = l.rank().max(r.rank());
    let (l, r) = (l.to_rank(rank), r.to_rank(rank));
    let compare = |ord: Option<std::cmp::Ordering>| -> Option<Constant> {
        use std::cmp::Ordering::{Equal, Greater, Less};
        // NaN compares false for everything but `!=`
        let result = match (op, ord) {
            (OperatorId::NotEq, None) => true,
            (_, None) => false,
            (OperatorId::EqEq, Some(o)) => o == Equal,
            (OperatorId::NotEq, Some(o)) => o != Equal,
            (OperatorId::Lt, Some(o)) => o == Less,
            (OperatorId::Gt, Some(o)) => o == Greater,
            (OperatorId::LtEq, Some(o)) => o != Greater,
            (OperatorId::GtEq, Some(o)) => o != Less,
            _ => return None,
        };
        Some(Constant::Boolean(result))
    };
    if lava_core::lang::operators::is_comparison(op) {
        let ord = match (l, r) {
            (Num::I(a), Num::I(b)) => Some(a.cmp(&b)),
            (Num::L(a), Num::L(b)) => Some(a.cmp(&b)),
            (Num::F(a), Num::F(b)) => a.partial_cmp(&b),
            (Num::D(a), Num::D(b)) => a.partial_cmp(&b),
            _ => None,
        };
        return Ok(compare(ord));
    }
    let folded = match (l, r) {
        (Num::I(a), Num::I(b)) => match op {
            OperatorId::Plus => Num::I(a.wrapping_add(b)),
            OperatorId::Minus => Num::I(a.wrapping_sub(b)),
            OperatorId::Star => Num::I(a.wrapping_mul(b)),
            OperatorId::Slash if b == 0 => return Err(FoldError::DivByZero),
            OperatorId::Slash => Num::I(a.wrapping_div(b)),
            OperatorId::Percent if b == 0 => return Err(FoldError::DivByZero),
            OperatorId::Percent => Num::I(a.wrapping_rem(b)),
            OperatorId::Amp => Num::I(a & b),
            OperatorId::Pipe => Num::I(a | b),
            OperatorId::Caret => Num::I(a ^ b),
            _ => return Ok(None),
        },
        (Num::L(a), Num::L(b)) => match op {
            OperatorId::Plus => Num::L(a.wrapping_add(b)),
            OperatorId::Minus => Num::L(a.wrapping_sub(b)),
            OperatorId::Star => Num::L(a.wrapping_mul(b)),
            OperatorId::Slash if b == 0 => return Err(FoldError::DivByZero),
            OperatorId::Slash => Num::L(a.wrapping_div(b)),
            OperatorId::Percent if b == 0 => return Err(FoldError::DivByZero),
            OperatorId::Percent => Num::L(a.wrapping_rem(b)),
            OperatorId::Amp => Num::L(a & b),
            OperatorId::Pipe => Num::L(a | b),
            OperatorId::Caret => Num::L(a ^ b),
            _ => return Ok(None),
        },
        (Num::F(a), Num::F(b)) => match float_op32(op, a, b) {
            Some(v) => Num::F(v),
            None => return Ok(None),
        },
        (Num::D(a), Num::D(b)) => match float_op(op, a, b) {
            Some(v) => Num::D(v),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(folded.into_constant()))
}

fn float_op(op: OperatorId, a: f64, b: f64) -> Option<f64> {
    Some(match op {
        OperatorId::Plus => a + b,
        OperatorId::Minus => a - b,
        OperatorId::Star => a * b,
        OperatorId::Slash => a / b,
        OperatorId::Percent => a % b,
        _ => return None,
    })
}

/// Single-precision arithmetic must round per operation, not through `f64`.
fn float_op32(op: OperatorId, a: f32, b: f32) -> Option<f32> {
    Some(match op {
        OperatorId::Plus => a + b,
        OperatorId::Minus => a - b,
        OperatorId::Star => a * b,
        OperatorId::Slash => a / b,
        OperatorId::Percent => a % b,
        _ => return None,
    })
}

fn fold_shift(op: OperatorId, value: Num, distance: Num) -> Option<Num> {
    let distance = match distance {
        Num::I(d) => i64::from(d),
        Num::L(d) => d,
        _ => return None,
    };
    Some(match value {
        Num::I(v) => {
            let d = (distance & 0x1f) as u32;
            Num::I(match op {
                OperatorId::Shl => v.wrapping_shl(d),
                OperatorId::Shr => v.wrapping_shr(d),
                _ => ((v as u32) >> d) as i32,
            })
        }
        Num::L(v) => {
            let d = (distance & 0x3f) as u32;
            Num::L(match op {
                OperatorId::Shl => v.wrapping_shl(d),
                OperatorId::Shr => v.wrapping_shr(d),
                _ => ((v as u64) >> d) as i64,
            })
        }
        _ => return None,
    })
}

/// Convert a constant to `target` the way a cast or an assignment conversion would. `None` if no constant
/// conversion exists (for example `boolean` → `int`).
pub fn convert(value: &Constant, target: &Type) -> Option<Constant> {
    if target.class_name() == Some(lava_core::lang::well_known::STRING) {
        return matches!(value, Constant::String(_)).then(|| value.clone());
    }
    let kind = target.primitive_kind()?;
    if kind == PrimitiveKind::Boolean {
        return matches!(value, Constant::Boolean(_)).then(|| value.clone());
    }
    let n = Num::of(value)?;
    Some(match kind {
        PrimitiveKind::Byte => Constant::Byte(n.as_i32() as i8),
        PrimitiveKind::Short => Constant::Short(n.as_i32() as i16),
        PrimitiveKind::Char => Constant::Char(n.as_i32() as u16),
        PrimitiveKind::Int => Constant::Int(n.as_i32()),
        PrimitiveKind::Long => Constant::Long(n.as_i64()),
        PrimitiveKind::Float => Constant::Float(n.as_f32()),
        PrimitiveKind::Double => Constant::Double(n.as_f64()),
        _ => return None,
    })
}

/// Return `true` if an `int` constant fits `target` (`byte b = 10;` needs no cast).
pub fn fits(value: &Constant, target: PrimitiveKind) -> bool {
    let v = match *value {
        Constant::Int(v) => v,
        Constant::Short(v) => i32::from(v),
        Constant::Char(v) => i32::from(v),
        Constant::Byte(v) => i32::from(v),
        _ => return false,
    };
    match target {
        PrimitiveKind::Byte => i8::try_from(v).is_ok(),
        PrimitiveKind::Short => i16::try_from(v).is_ok(),
        PrimitiveKind::Char => u16::try_from(v).is_ok(),
        PrimitiveKind::Int => true,
        _ => false,
    }
}

/// Java's string conversion of a constant.
pub fn java_string(c: &Constant) -> String {
    match c {
        Constant::Boolean(v) => v.to_string(),
        Constant::Char(v) => char::from_u32(u32::from(*v)).map_or_else(|| '\u{fffd}'.to_string(), String::from),
        Constant::Byte(v) => v.to_string(),
        Constant::Short(v) => v.to_string(),
        Constant::Int(v) => v.to_string(),
        Constant::Long(v) => v.to_string(),
        Constant::Float(v) => java_float(f64::from(*v), v.to_string(), format!("{v:e}")),
        Constant::Double(v) => java_float(*v, v.to_string(), format!("{v:e}")),
        Constant::String(v) => v.clone(),
    }
}

/// `plain` and `sci` are the shortest decimal and scientific renderings at the operand's own precision.
fn java_float(v: f64, plain: String, sci: String) -> String {
    if v.is_nan() {
        return "NaN".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    let magnitude = v.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return if plain.contains('.') { plain } else { format!("{plain}.0") };
    }
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlobalContext;
    use crate::local::DotGet;
    use crate::local::test_support::scope;

    fn int(v: i32) -> Constant {
        Constant::Int(v)
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(fold_binary(OperatorId::Plus, &int(i32::MAX), &int(1)), Ok(Some(int(i32::MIN))));
        assert_eq!(fold_binary(OperatorId::Slash, &int(i32::MIN), &int(-1)), Ok(Some(int(i32::MIN))));
        assert_eq!(fold_binary(OperatorId::Slash, &int(1), &int(0)), Err(FoldError::DivByZero));
        assert_eq!(fold_binary(OperatorId::Percent, &int(-7), &int(3)), Ok(Some(int(-1))));
        assert_eq!(fold_unary(OperatorId::Minus, &int(i32::MIN)), Some(int(i32::MIN)));
    }

    #[test]
    fn test_shifts_mask_distance() {
        assert_eq!(fold_binary(OperatorId::Shl, &int(1), &int(33)), Ok(Some(int(2))));
        assert_eq!(fold_binary(OperatorId::UShr, &int(-1), &int(28)), Ok(Some(int(15))));
        assert_eq!(fold_binary(OperatorId::Shr, &int(-16), &int(2)), Ok(Some(int(-4))));
        assert_eq!(fold_binary(OperatorId::Shl, &Constant::Long(1), &int(40)), Ok(Some(Constant::Long(1 << 40))));
    }

    #[test]
    fn test_promotion_and_comparison() {
        assert_eq!(fold_binary(OperatorId::Plus, &int(1), &Constant::Long(2)), Ok(Some(Constant::Long(3))));
        assert_eq!(fold_binary(OperatorId::Slash, &int(1), &Constant::Double(2.0)), Ok(Some(Constant::Double(0.5))));
        assert_eq!(fold_binary(OperatorId::Lt, &Constant::Char(97), &int(98)), Ok(Some(Constant::Boolean(true))));
        let nan = Constant::Double(f64::NAN);
        assert_eq!(fold_binary(OperatorId::EqEq, &nan, &nan), Ok(Some(Constant::Boolean(false))));
        assert_eq!(fold_binary(OperatorId::NotEq, &nan, &nan), Ok(Some(Constant::Boolean(true))));
        assert_eq!(fold_binary(OperatorId::Plus, &Constant::Boolean(true), &int(1)), Ok(None));
    }

    #[test]
    fn test_string_concatenation_renders_like_java() {
        let s = |v: &str| Constant::String(v.into());
        let cat = |c: Constant| fold_binary(OperatorId::Plus, &s("v="), &c).unwrap().unwrap();
        assert_eq!(cat(Constant::Double(1.0)), s("v=1.0"));
        assert_eq!(cat(Constant::Double(1e10)), s("v=1.0E10"));
        assert_eq!(cat(Constant::Double(1.5e-5)), s("v=1.5E-5"));
        assert_eq!(cat(Constant::Float(0.1)), s("v=0.1"));
        assert_eq!(cat(Constant::Char(65)), s("v=A"));
        assert_eq!(cat(Constant::Long(-3)), s("v=-3"));
        assert_eq!(cat(Constant::Boolean(false)), s("v=false"));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(convert(&int(300), &Type::primitive(PrimitiveKind::Byte)), Some(Constant::Byte(44)));
        assert_eq!(convert(&Constant::Double(1e20), &Type::primitive(PrimitiveKind::Int)), Some(int(i32::MAX)));
        assert_eq!(convert(&Constant::Double(f64::NAN), &Type::primitive(PrimitiveKind::Long)), Some(Constant::Long(0)));
        assert_eq!(convert(&Constant::Boolean(true), &Type::primitive(PrimitiveKind::Int)), None);
        assert!(fits(&int(127), PrimitiveKind::Byte));
        assert!(!fits(&int(128), PrimitiveKind::Byte));
        assert!(!fits(&int(-1), PrimitiveKind::Char));
    }

    #[test]
    fn test_constant_value_of_fields() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let Some(DotGet::Field(max)) = lc.resolve_dot_get("Integer.MAX_VALUE", lava_syntax::Span::at(0)) else {
            panic!("expected a field");
        };
        assert_eq!(lc.constant_value(&max), Some(ElementValue::Const(int(i32::MAX))));
        let Some(DotGet::Field(runtime)) =
            lc.resolve_dot_get("java.lang.annotation.RetentionPolicy.RUNTIME", lava_syntax::Span::at(0))
        else {
            panic!("expected a field");
        };
        assert!(matches!(lc.constant_value(&runtime), Some(ElementValue::Enum { name, .. }) if name == "RUNTIME"));
    }
}
