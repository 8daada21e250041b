//! Session-wide symbol table.
//!
//! [`GlobalContext`] answers "what does class `X` look like right now" for every stage of every compile unit, and
//! collects the diagnostics they report. It is shared read-mostly between worker threads.
//!
//! ## Lookup order
//!
//! 1. compile units of this session (a unit shadows a library class of the same name)
//! 2. classes generated during compilation (anonymous classes)
//! 3. registered libraries, in registration order; the first hit is memoized
//! 4. the runtime library
//!
//! ## Notes
//!
//! - Resolve helpers are cached per class name and dropped whenever a class they depend on is republished.
//! - The short-name package index only covers libraries; compile units are found through their own package.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use lava_syntax::{Diagnostic, Severity, Span};
use rustc_hash::FxHashMap;

use crate::cache::KeyedCache;
use crate::class::ClassNode;
use crate::config::CompilerConfig;
use crate::error::{ClassNotFound, SessionError};
use crate::library::{BootstrapLibrary, Library};
use crate::resolve::ResolveHelper;

type ClassMap = FxHashMap<String, Arc<ClassNode>>;

pub struct GlobalContext {
    runtime: Arc<dyn Library>,
    libraries: Vec<Arc<dyn Library>>,
    units: RwLock<ClassMap>,
    generated: RwLock<ClassMap>,
    library_hits: RwLock<ClassMap>,
    helpers: KeyedCache<String, Arc<ResolveHelper>>,
    package_index: OnceLock<FxHashMap<String, Vec<String>>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    has_error: AtomicBool,
    error_count: AtomicUsize,
    warnings_as_errors: bool,
    max_errors: usize,
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalContext {
    /// A context whose runtime library is the built-in [`BootstrapLibrary`].
    pub fn new() -> Self {
        Self::with_runtime(BootstrapLibrary::shared())
    }

    pub fn with_runtime(runtime: Arc<dyn Library>) -> Self {
        Self {
            runtime,
            libraries: Vec::new(),
            units: RwLock::new(ClassMap::default()),
            generated: RwLock::new(ClassMap::default()),
            library_hits: RwLock::new(ClassMap::default()),
            helpers: KeyedCache::new(),
            package_index: OnceLock::new(),
            diagnostics: Mutex::new(Vec::new()),
            has_error: AtomicBool::new(false),
            error_count: AtomicUsize::new(0),
            warnings_as_errors: false,
            max_errors: 0,
        }
    }

    /// Apply the diagnostic policy of `config`.
    pub fn configure(&mut self, config: &CompilerConfig) {
        self.warnings_as_errors = config.warnings_as_errors;
        self.max_errors = config.max_errors;
    }

    /// Register a library after the ones already present.
    ///
    /// Memoized hits and the package index are dropped: the new library may shadow the runtime library.
    pub fn add_library(&mut self, library: Arc<dyn Library>) {
        tracing::debug!(library = library.name(), "registered library");
        self.libraries.push(library);
        self.library_hits.get_mut().unwrap_or_else(PoisonError::into_inner).clear();
        self.package_index = OnceLock::new();
        self.helpers.clear();
    }

    pub fn libraries(&self) -> &[Arc<dyn Library>] {
        &self.libraries
    }

    pub fn runtime(&self) -> &Arc<dyn Library> {
        &self.runtime
    }

    // ========================================================================
    // Class lookup
    // ========================================================================

    /// Current view of class `name`, or `None` if no source knows it.
    pub fn get_class_info(&self, name: &str) -> Option<Arc<ClassNode>> {
        if let Some(node) = read(&self.units).get(name) {
            return Some(Arc::clone(node));
        }
        if let Some(node) = read(&self.generated).get(name) {
            return Some(Arc::clone(node));
        }
        if let Some(node) = read(&self.library_hits).get(name) {
            return Some(Arc::clone(node));
        }
        let found = self
            .libraries
            .iter()
            .chain(std::iter::once(&self.runtime))
            .filter(|lib| lib.content().contains(name))
            .find_map(|lib| lib.get(name))?;
        tracing::trace!(class = name, "library hit");
        let mut hits = self.library_hits.write().unwrap_or_else(PoisonError::into_inner);
        Some(Arc::clone(hits.entry(name.to_string()).or_insert(found)))
    }

    /// Cheap existence check; does not load the class from its library.
    pub fn class_exists(&self, name: &str) -> bool {
        read(&self.units).contains_key(name)
            || read(&self.generated).contains_key(name)
            || self.libraries.iter().any(|lib| lib.content().contains(name))
            || self.runtime.content().contains(name)
    }

    /// Packages that offer a class with the given simple name, in no particular order.
    pub fn available_packages(&self, short_name: &str) -> Vec<String> {
        let index = self.package_index.get_or_init(|| self.build_package_index());
        index.get(short_name).cloned().unwrap_or_default()
    }

    /// Return `true` if any compile unit or library class lives directly in `package`.
    pub fn has_package(&self, package: &str) -> bool {
        if read(&self.units).keys().any(|name| lava_core::package_of(name) == package) {
            return true;
        }
        let index = self.package_index.get_or_init(|| self.build_package_index());
        index.values().any(|packages| packages.iter().any(|p| p == package))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn build_package_index(&self) -> FxHashMap<String, Vec<String>> {
        let mut index: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for lib in self.libraries.iter().chain(std::iter::once(&self.runtime)) {
            for name in lib.content() {
                let (package, simple) = lava_core::split_package(name);
                if simple.contains('$') {
                    continue;
                }
                let packages = index.entry(simple.to_string()).or_default();
                if !packages.iter().any(|p| p == package) {
                    packages.push(package.to_string());
                }
            }
        }
        tracing::debug!(names = index.len(), "built package index");
        index
    }

    // ========================================================================
    // Compile units and generated classes
    // ========================================================================

    /// Register the first snapshot of a compile unit. A second unit with the same name is fatal.
    pub fn add_compile_unit(&self, node: ClassNode) -> Result<(), SessionError> {
        let mut units = self.units.write().unwrap_or_else(PoisonError::into_inner);
        if units.contains_key(&node.name) {
            return Err(SessionError::DuplicateUnit { name: node.name });
        }
        let name = node.name.clone();
        units.insert(name.clone(), Arc::new(node));
        drop(units);
        self.invalidate(&name);
        Ok(())
    }

    /// Replace the visible snapshot of a unit after a stage.
    pub fn publish(&self, node: ClassNode) {
        let name = node.name.clone();
        self.units.write().unwrap_or_else(PoisonError::into_inner).insert(name.clone(), Arc::new(node));
        self.invalidate(&name);
    }

    /// Register (or replace) a class synthesized by the compiler.
    pub fn add_generated_class(&self, node: ClassNode) {
        let name = node.name.clone();
        self.generated.write().unwrap_or_else(PoisonError::into_inner).insert(name.clone(), Arc::new(node));
        self.invalidate(&name);
    }

    pub fn generated_classes(&self) -> Vec<Arc<ClassNode>> {
        let mut all: Vec<_> = read(&self.generated).values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Forget a compile unit.
    pub fn remove(&self, name: &str) -> Option<Arc<ClassNode>> {
        let removed = self.units.write().unwrap_or_else(PoisonError::into_inner).remove(name);
        self.invalidate(name);
        removed
    }

    /// Names of the registered compile units, sorted. Generated classes are not listed.
    pub fn unit_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.units).keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every unit, generated class, memoized hit, helper and diagnostic. Libraries stay registered.
    pub fn reset(&self) {
        self.units.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.generated.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.library_hits.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.helpers.clear();
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.has_error.store(false, Ordering::SeqCst);
        self.error_count.store(0, Ordering::SeqCst);
    }

    fn invalidate(&self, name: &str) {
        self.helpers.retain(|_, helper| !helper.depends_on(name));
    }

    // ========================================================================
    // Resolve helpers
    // ========================================================================

    /// Helper for the given snapshot. Computed at most once per class name while the snapshot stays current.
    pub fn resolve_helper(&self, node: &Arc<ClassNode>) -> Arc<ResolveHelper> {
        let helper = self
            .helpers
            .get_or_init(node.name.as_str(), || Arc::new(ResolveHelper::new(Arc::clone(node))));
        if Arc::ptr_eq(helper.class(), node) {
            helper
        } else {
            // Caller holds an older or unpublished snapshot: serve it without caching.
            Arc::new(ResolveHelper::new(Arc::clone(node)))
        }
    }

    /// Helper for the current view of `name`.
    pub fn helper_for(&self, name: &str) -> Result<Arc<ResolveHelper>, ClassNotFound> {
        let node = self.get_class_info(name).ok_or_else(|| ClassNotFound::new(name, name))?;
        Ok(self.resolve_helper(&node))
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Record a diagnostic. `Error` (or a warning under `warnings_as_errors`) sets the error latch.
    pub fn report(&self, unit: &str, severity: Severity, span: Span, code: &'static str, args: Vec<String>) {
        let severity = if self.warnings_as_errors && severity >= Severity::Warning {
            Severity::Error
        } else {
            severity
        };
        if severity.is_error() {
            self.has_error.store(true, Ordering::SeqCst);
            let count = self.error_count.fetch_add(1, Ordering::SeqCst);
            if self.max_errors > 0 && count >= self.max_errors {
                return;
            }
        }
        let diagnostic = Diagnostic::new(unit, severity, span, code, args);
        tracing::debug!(%diagnostic, "reported");
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).push(diagnostic);
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::SeqCst)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn read(lock: &RwLock<ClassMap>) -> std::sync::RwLockReadGuard<'_, ClassMap> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassOrigin};
    use crate::library::{MemoryLibrary, NameSet};
    use lava_core::access::ACC_PUBLIC;
    use lava_syntax::diagnostics::codes;

    fn unit(name: &str) -> ClassNode {
        ClassNode::new(name, ACC_PUBLIC, ClassOrigin::Unit)
    }

    struct CountingLibrary {
        inner: MemoryLibrary,
        gets: AtomicUsize,
    }

    impl Library for CountingLibrary {
        fn name(&self) -> &str {
            "counting"
        }

        fn content(&self) -> &NameSet {
            self.inner.content()
        }

        fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(name)
        }
    }

    #[test]
    fn test_duplicate_unit_keeps_first() {
        let ctx = GlobalContext::new();
        let mut first = unit("p/A");
        first.interfaces.push("java/lang/Runnable".into());
        ctx.add_compile_unit(first).unwrap();
        let err = ctx.add_compile_unit(unit("p/A")).unwrap_err();
        assert!(matches!(err, SessionError::DuplicateUnit { ref name } if name == "p/A"));
        assert_eq!(ctx.get_class_info("p/A").unwrap().interfaces.len(), 1);
    }

    #[test]
    fn test_units_shadow_libraries() {
        let ctx = GlobalContext::new();
        ctx.add_compile_unit(unit("java/lang/Runnable")).unwrap();
        assert_eq!(ctx.get_class_info("java/lang/Runnable").unwrap().origin, ClassOrigin::Unit);
        assert_eq!(ctx.unit_names(), vec!["java/lang/Runnable".to_string()]);
    }

    #[test]
    fn test_library_hits_are_memoized() {
        let lib = Arc::new(CountingLibrary {
            inner: MemoryLibrary::new("m", [ClassBuilder::new("q/B", ACC_PUBLIC).build().unwrap()]),
            gets: AtomicUsize::new(0),
        });
        let mut ctx = GlobalContext::new();
        ctx.add_library(lib.clone());
        let a = ctx.get_class_info("q/B").unwrap();
        let b = ctx.get_class_info("q/B").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(lib.gets.load(Ordering::SeqCst), 1);
        assert!(ctx.get_class_info("q/Missing").is_none());
    }

    #[test]
    fn test_generated_classes_are_not_units() {
        let ctx = GlobalContext::new();
        ctx.add_generated_class(ClassNode::new("p/A$1", 0, ClassOrigin::Generated));
        assert!(ctx.class_exists("p/A$1"));
        assert!(ctx.unit_names().is_empty());
        ctx.reset();
        assert!(!ctx.class_exists("p/A$1"));
    }

    #[test]
    fn test_publish_drops_dependent_helpers() {
        let ctx = GlobalContext::new();
        ctx.add_compile_unit(unit("p/Base")).unwrap();
        let mut child = unit("p/Child");
        child.parent = Some("p/Base".into());
        ctx.add_compile_unit(child).unwrap();

        let before = ctx.helper_for("p/Child").unwrap();
        before.class_list(&ctx).unwrap();
        ctx.publish(unit("p/Base"));
        let after = ctx.helper_for("p/Child").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));

        let stable = ctx.helper_for("java/lang/String").unwrap();
        ctx.publish(unit("p/Base"));
        assert!(Arc::ptr_eq(&stable, &ctx.helper_for("java/lang/String").unwrap()));
    }

    #[test]
    fn test_available_packages() {
        let ctx = GlobalContext::new();
        assert_eq!(ctx.available_packages("List"), vec!["java/util".to_string()]);
        assert!(ctx.available_packages("Entry").is_empty());
    }

    #[test]
    fn test_error_latch() {
        let mut ctx = GlobalContext::new();
        ctx.report("A", Severity::SevereWarning, Span::at(0), codes::CAST_LOSSY, vec![]);
        assert!(!ctx.has_error());
        ctx.report("A", Severity::Error, Span::at(0), codes::SYMBOL_UNRESOLVED, vec!["X".into()]);
        assert!(ctx.has_error());
        assert_eq!(ctx.take_diagnostics().len(), 2);

        ctx.reset();
        ctx.configure(&CompilerConfig::new().with_warnings_as_errors(true));
        ctx.report("A", Severity::Warning, Span::at(0), codes::IMPORT_DUPLICATE, vec!["x".into()]);
        assert!(ctx.has_error());
        assert_eq!(ctx.diagnostics()[0].severity, Severity::Error);
    }
}
