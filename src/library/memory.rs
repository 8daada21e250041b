//! In-memory library over a fixed set of nodes.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Library, NameSet};
use crate::class::ClassNode;

pub struct MemoryLibrary {
    name: String,
    classes: FxHashMap<String, Arc<ClassNode>>,
    content: NameSet,
}

impl MemoryLibrary {
    pub fn new(name: impl Into<String>, nodes: impl IntoIterator<Item = ClassNode>) -> Self {
        let classes: FxHashMap<String, Arc<ClassNode>> =
            nodes.into_iter().map(|n| (n.name.clone(), Arc::new(n))).collect();
        let content = classes.keys().cloned().collect();
        Self {
            name: name.into(),
            classes,
            content,
        }
    }
}

impl Library for MemoryLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> &NameSet {
        &self.content
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.classes.get(name).cloned()
    }
}
