//! JVM access flags.
//!
//! The values are the ones written to class files (JVMS §4.1, §4.5, §4.6, §4.7.6). A few flags share bits across
//! contexts (`ACC_SUPER`/`ACC_SYNCHRONIZED`, `ACC_VOLATILE`/`ACC_BRIDGE`, `ACC_TRANSIENT`/`ACC_VARARGS`); callers are
//! expected to know which kind of entity they are looking at.
//!
//! ## Examples
//! ```rust
//! use lava_core::access::{self, Visibility};
//!
//! let flags = access::ACC_PUBLIC | access::ACC_FINAL;
//! assert_eq!(Visibility::of(flags), Visibility::Public);
//! assert!(access::has(flags, access::ACC_FINAL));
//! ```

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;
pub const ACC_MODULE: u16 = 0x8000;

/// Mask of the three visibility bits.
pub const VISIBILITY_MASK: u16 = ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED;

/// Flags a top-level class may carry in its class file.
pub const TOP_LEVEL_CLASS_MASK: u16 =
    ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_INTERFACE | ACC_ABSTRACT | ACC_SYNTHETIC | ACC_ANNOTATION | ACC_ENUM;

/// Return `true` if every bit of `flag` is set in `flags`.
#[inline]
pub fn has(flags: u16, flag: u16) -> bool {
    flags & flag == flag
}

/// Declared visibility of a class or member.
///
/// Ordered from the most to the least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    Private,
    Package,
    Protected,
    Public,
}

impl Visibility {
    /// Extract the visibility from raw access flags.
    pub fn of(flags: u16) -> Self {
        if has(flags, ACC_PUBLIC) {
            Visibility::Public
        } else if has(flags, ACC_PROTECTED) {
            Visibility::Protected
        } else if has(flags, ACC_PRIVATE) {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }

    /// Keyword spelling used in diagnostics (`package-private` for the implicit level).
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Package => "package-private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        }
    }
}

/// Class-file flags for a nested class as it appears in its own class file.
///
/// Class files cannot express `protected` or `private` on a class, so a protected nested class is written as
/// `public` and a private one as package-private. The declared flags live in the InnerClasses table.
pub fn binary_class_flags(declared: u16) -> u16 {
    let mut flags = declared & !(ACC_STATIC | ACC_PRIVATE | ACC_PROTECTED);
    if has(declared, ACC_PROTECTED) {
        flags |= ACC_PUBLIC;
    }
    flags
}

/// Render flags as source modifiers, in canonical order.
pub fn modifiers_to_string(flags: u16) -> String {
    const ORDER: &[(u16, &str)] = &[
        (ACC_PUBLIC, "public"),
        (ACC_PROTECTED, "protected"),
        (ACC_PRIVATE, "private"),
        (ACC_ABSTRACT, "abstract"),
        (ACC_STATIC, "static"),
        (ACC_FINAL, "final"),
    ];
    ORDER
        .iter()
        .filter(|(bit, _)| has(flags, *bit))
        .map(|(_, s)| *s)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_order() {
        assert!(Visibility::Private < Visibility::Package);
        assert!(Visibility::Protected < Visibility::Public);
        assert_eq!(Visibility::of(0), Visibility::Package);
        assert_eq!(Visibility::of(ACC_PROTECTED | ACC_STATIC), Visibility::Protected);
    }

    #[test]
    fn test_binary_class_flags() {
        assert_eq!(binary_class_flags(ACC_PROTECTED | ACC_STATIC), ACC_PUBLIC);
        assert_eq!(binary_class_flags(ACC_PRIVATE | ACC_FINAL), ACC_FINAL);
    }

    #[test]
    fn test_modifiers_to_string() {
        assert_eq!(modifiers_to_string(ACC_PUBLIC | ACC_STATIC | ACC_FINAL), "public static final");
        assert_eq!(modifiers_to_string(0), "");
    }
}
