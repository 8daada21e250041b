//! Primitive type metadata: descriptor characters, wrapper classes and numeric conversion rules.
//!
//! ## Examples
//! ```rust
//! use lava_core::lang::primitives::PrimitiveKind;
//!
//! assert_eq!(PrimitiveKind::from_descriptor('J'), Some(PrimitiveKind::Long));
//! assert!(PrimitiveKind::Int.widens_to(PrimitiveKind::Double));
//! assert!(!PrimitiveKind::Char.widens_to(PrimitiveKind::Short));
//! assert_eq!(PrimitiveKind::Int.wrapper(), Some("java/lang/Integer"));
//! ```

/// The nine primitive kinds (including `void`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

/// Metadata row for a primitive kind.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveInfo {
    pub kind: PrimitiveKind,
    pub name: &'static str,
    pub descriptor: char,
    pub wrapper: Option<&'static str>,
    /// Position in the widening chain (`0` for non-numeric kinds).
    pub rank: u8,
}

pub const PRIMITIVES: &[PrimitiveInfo] = &[
    PrimitiveInfo { kind: PrimitiveKind::Boolean, name: "boolean", descriptor: 'Z', wrapper: Some("java/lang/Boolean"), rank: 0 },
    PrimitiveInfo { kind: PrimitiveKind::Byte, name: "byte", descriptor: 'B', wrapper: Some("java/lang/Byte"), rank: 1 },
    PrimitiveInfo { kind: PrimitiveKind::Char, name: "char", descriptor: 'C', wrapper: Some("java/lang/Character"), rank: 2 },
    PrimitiveInfo { kind: PrimitiveKind::Short, name: "short", descriptor: 'S', wrapper: Some("java/lang/Short"), rank: 2 },
    PrimitiveInfo { kind: PrimitiveKind::Int, name: "int", descriptor: 'I', wrapper: Some("java/lang/Integer"), rank: 3 },
    PrimitiveInfo { kind: PrimitiveKind::Long, name: "long", descriptor: 'J', wrapper: Some("java/lang/Long"), rank: 4 },
    PrimitiveInfo { kind: PrimitiveKind::Float, name: "float", descriptor: 'F', wrapper: Some("java/lang/Float"), rank: 5 },
    PrimitiveInfo { kind: PrimitiveKind::Double, name: "double", descriptor: 'D', wrapper: Some("java/lang/Double"), rank: 6 },
    PrimitiveInfo { kind: PrimitiveKind::Void, name: "void", descriptor: 'V', wrapper: Some("java/lang/Void"), rank: 0 },
];

impl PrimitiveKind {
    fn info(self) -> &'static PrimitiveInfo {
        // PRIMITIVES is ordered like the enum.
        &PRIMITIVES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn descriptor(self) -> char {
        self.info().descriptor
    }

    /// Internal name of the boxing class.
    pub fn wrapper(self) -> Option<&'static str> {
        self.info().wrapper
    }

    pub fn from_descriptor(c: char) -> Option<Self> {
        PRIMITIVES.iter().find(|p| p.descriptor == c).map(|p| p.kind)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PRIMITIVES.iter().find(|p| p.name == name).map(|p| p.kind)
    }

    /// Inverse of [`PrimitiveKind::wrapper`]; `java/lang/Void` does not unbox.
    pub fn from_wrapper(class: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|p| p.kind != PrimitiveKind::Void && p.wrapper == Some(class))
            .map(|p| p.kind)
    }

    pub fn is_numeric(self) -> bool {
        self.info().rank > 0
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Char | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    /// Widening primitive conversion (JLS §5.1.2), identity included.
    pub fn widens_to(self, to: PrimitiveKind) -> bool {
        if self == to {
            return true;
        }
        if !self.is_numeric() || !to.is_numeric() {
            return false;
        }
        // char and the sub-int kinds do not widen into each other.
        if to == PrimitiveKind::Char || (self == PrimitiveKind::Char && to == PrimitiveKind::Short) {
            return false;
        }
        self.info().rank < to.info().rank
    }

    /// Binary numeric promotion (JLS §5.6.2).
    pub fn promote(a: PrimitiveKind, b: PrimitiveKind) -> Option<PrimitiveKind> {
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        Some(match (a, b) {
            (PrimitiveKind::Double, _) | (_, PrimitiveKind::Double) => PrimitiveKind::Double,
            (PrimitiveKind::Float, _) | (_, PrimitiveKind::Float) => PrimitiveKind::Float,
            (PrimitiveKind::Long, _) | (_, PrimitiveKind::Long) => PrimitiveKind::Long,
            _ => PrimitiveKind::Int,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_enum_ordered() {
        for (i, p) in PRIMITIVES.iter().enumerate() {
            assert_eq!(p.kind as usize, i);
        }
    }

    #[test]
    fn test_widening_matrix() {
        use PrimitiveKind::*;
        assert!(Byte.widens_to(Short));
        assert!(Byte.widens_to(Int));
        assert!(!Byte.widens_to(Char));
        assert!(Char.widens_to(Int));
        assert!(!Short.widens_to(Char));
        assert!(Long.widens_to(Float));
        assert!(!Double.widens_to(Float));
        assert!(!Boolean.widens_to(Int));
    }

    #[test]
    fn test_promotion() {
        use PrimitiveKind::*;
        assert_eq!(PrimitiveKind::promote(Byte, Short), Some(Int));
        assert_eq!(PrimitiveKind::promote(Int, Float), Some(Float));
        assert_eq!(PrimitiveKind::promote(Long, Int), Some(Long));
        assert_eq!(PrimitiveKind::promote(Boolean, Int), None);
    }

    #[test]
    fn test_wrapper_round_trip() {
        assert_eq!(PrimitiveKind::from_wrapper("java/lang/Character"), Some(PrimitiveKind::Char));
        assert_eq!(PrimitiveKind::from_wrapper("java/lang/Void"), None);
    }
}
