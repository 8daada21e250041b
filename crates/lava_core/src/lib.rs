//! Provide canonical language vocabulary and JVM-level constants for the Lava compiler.
//!
//! This crate is intentionally small and dependency-free. It contains the registries that the syntax layer and the
//! resolver share: reserved words, punctuation/operators, primitive type metadata, access flags and a handful of
//! well-known class names.
//!
//! ## Notes
//!
//! - This is a “vocabulary” crate: **no IO**, no global state, and no compiler-specific types.
//! - Class names are always in internal form (`java/lang/Object`), never dotted.

pub mod access;
pub mod lang;

/// Convert a dotted name (`java.util.List`) to internal form (`java/util/List`).
///
/// ## Examples
/// ```rust
/// assert_eq!(lava_core::internal_name("java.util.List"), "java/util/List");
/// ```
pub fn internal_name(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// Split an internal class name into `(package, simple name)`.
///
/// The package is empty for classes in the unnamed package.
pub fn split_package(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}

/// Return the package portion of an internal class name.
pub fn package_of(name: &str) -> &str {
    split_package(name).0
}

/// Return the outermost class of a nest (`a/B$C$D` → `a/B`).
pub fn nest_host(name: &str) -> &str {
    let (pkg, simple) = split_package(name);
    match simple.find('$') {
        Some(i) => &name[..pkg.len() + usize::from(!pkg.is_empty()) + i],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_package() {
        assert_eq!(split_package("java/util/List"), ("java/util", "List"));
        assert_eq!(split_package("Top"), ("", "Top"));
    }

    #[test]
    fn test_nest_host() {
        assert_eq!(nest_host("a/b/Outer$Inner$Deep"), "a/b/Outer");
        assert_eq!(nest_host("Outer$1"), "Outer");
        assert_eq!(nest_host("a/Plain"), "a/Plain");
    }
}
