//! Library over a directory tree of class files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use walkdir::WalkDir;

use super::{Library, NameSet, class_name_of_path};
use crate::class::{ClassNode, classfile};

pub struct DirectoryLibrary {
    root: PathBuf,
    label: String,
    content: OnceLock<NameSet>,
}

impl DirectoryLibrary {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let label = format!("dir:{}", root.display());
        Self {
            root,
            label,
            content: OnceLock::new(),
        }
    }

    #[tracing::instrument(skip_all, fields(root = %self.root.display()))]
    fn scan(&self) -> NameSet {
        let mut names = NameSet::default();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if let Some(name) = relative.to_str().and_then(class_name_of_path) {
                names.insert(name);
            }
        }
        tracing::debug!(classes = names.len(), "scanned class directory");
        names
    }
}

impl Library for DirectoryLibrary {
    fn name(&self) -> &str {
        &self.label
    }

    fn content(&self) -> &NameSet {
        self.content.get_or_init(|| self.scan())
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        if !self.content().contains(name) {
            return None;
        }
        let path = self.root.join(format!("{name}.class"));
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read class file");
                return None;
            }
        };
        match classfile::parse(&bytes) {
            Ok(node) => Some(Arc::new(node)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed class file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::class::classfile::test_support::write_class;
    use lava_core::access::ACC_PUBLIC;

    #[test]
    fn test_lists_and_loads_classes() {
        let dir = tempfile::tempdir().unwrap();
        let node = ClassBuilder::new("p/q/A", ACC_PUBLIC).build().unwrap();
        std::fs::create_dir_all(dir.path().join("p/q")).unwrap();
        std::fs::write(dir.path().join("p/q/A.class"), write_class(&node)).unwrap();
        std::fs::write(dir.path().join("p/q/Broken.class"), b"nope").unwrap();
        std::fs::write(dir.path().join("p/readme.txt"), b"ignored").unwrap();

        let lib = DirectoryLibrary::new(dir.path());
        assert_eq!(lib.content().len(), 2);
        assert_eq!(lib.get("p/q/A").unwrap().name, "p/q/A");
        assert!(lib.get("p/q/Broken").is_none());
        assert!(lib.get("p/q/Missing").is_none());
    }
}
