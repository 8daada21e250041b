//! Class libraries: read-only sources of compiled class symbols.
//!
//! A [`Library`] answers two questions: which classes it contains, and what a given class looks like. Content is
//! computed lazily and at most once; class lookups may be repeated (the global context memoizes hits).
//!
//! ## Implementations
//!
//! - [`MemoryLibrary`]: a fixed set of nodes (tests, embedding)
//! - [`DirectoryLibrary`]: a directory tree of `.class` files
//! - [`JarLibrary`]: a jar/zip archive
//! - [`BootstrapLibrary`]: the built-in core runtime classes
//! - [`SymbolCache`]: a prebuilt symbol-cache file

pub mod bootstrap;
pub mod directory;
pub mod jar;
pub mod memory;
pub mod symcache;

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::class::ClassNode;
use crate::error::SessionError;

pub use bootstrap::BootstrapLibrary;
pub use directory::DirectoryLibrary;
pub use jar::JarLibrary;
pub use memory::MemoryLibrary;
pub use symcache::{SymbolCache, SymbolCacheWriter};

/// Set of internal class names.
pub type NameSet = FxHashSet<String>;

pub trait Library: Send + Sync {
    /// Human-readable identity for logs (`jar:/path/rt.jar`).
    fn name(&self) -> &str;

    /// Internal names of every class this library provides.
    fn content(&self) -> &NameSet;

    /// Load a class. Returns `None` for names outside [`Library::content`] and for unreadable entries.
    fn get(&self, name: &str) -> Option<Arc<ClassNode>>;

    /// Module the class belongs to, when the library knows it.
    fn module(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Open one classpath entry: a directory, a `.jar`/`.zip` archive, or a symbol-cache file (`.lsym`).
pub fn open_classpath_entry(path: &Path) -> Result<Arc<dyn Library>, SessionError> {
    if path.is_dir() {
        return Ok(Arc::new(DirectoryLibrary::new(path)));
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        symcache::EXTENSION => Ok(Arc::new(SymbolCache::open(path)?)),
        _ => Ok(Arc::new(JarLibrary::open(path)?)),
    }
}

/// Build the internal-name set from archive or directory paths ending in `.class`.
pub(crate) fn class_name_of_path(path: &str) -> Option<String> {
    let name = path.strip_suffix(".class")?;
    if name.ends_with("module-info") || name.ends_with("package-info") {
        return None;
    }
    Some(name.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_of_path() {
        assert_eq!(class_name_of_path("java/util/List.class").as_deref(), Some("java/util/List"));
        assert_eq!(class_name_of_path("a\\B$C.class").as_deref(), Some("a/B$C"));
        assert_eq!(class_name_of_path("module-info.class"), None);
        assert_eq!(class_name_of_path("META-INF/MANIFEST.MF"), None);
    }
}
