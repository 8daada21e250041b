//! Per-thread resolution toolkit.
//!
//! A [`LocalContext`] is what the member and body stages resolve against: the class being compiled (through its
//! [`ClassScope`]), the type variables in scope, whether the code is in a static context, and the nesting depth of
//! inline-compiled classes. It is cheap to clone and never shared between threads; each worker builds its own.
//!
//! Simple class names resolve in this order:
//!
//! 1. member classes of the current class, its enclosing classes and their ancestors
//! 2. single-type imports
//! 3. classes of the current package
//! 4. on-demand imports and `java.lang` (more than one hit is ambiguous)
//!
//! Type variables shadow all of the above and are handled by [`LocalContext::resolve_type`].

pub mod access;
pub mod cast;
pub mod constants;
pub mod dotget;
pub mod expr;
pub mod generics;
pub mod lub;
pub mod methods;
pub mod operators;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lava_core::lang::well_known;
use lava_syntax::diagnostics::codes;
use lava_syntax::{Severity, Span};

use crate::class::ClassNode;
use crate::context::GlobalContext;
use crate::resolve::ResolveHelper;
use crate::types::display_name;
use crate::unit::imports::{ImportTable, resolve_qualified};

pub use cast::CastKind;
pub use dotget::{DotGet, FieldAccess};
pub use methods::MethodMatch;

/// Static facts about the class whose code is being resolved.
#[derive(Debug)]
pub struct ClassScope {
    /// Internal name of the class.
    pub class: String,
    pub imports: Arc<ImportTable>,
    pub type_params: Vec<String>,
    /// Type variables of the method an inline class is declared in.
    pub outer_type_params: Vec<String>,
    pub enclosing: Option<Arc<ClassScope>>,
    /// Numbering for anonymous and local classes declared inside this class.
    local_classes: AtomicU32,
    /// Local classes declared in bodies of this class: simple name → internal name.
    local_names: Mutex<Vec<(String, String)>>,
}

impl ClassScope {
    pub fn new(
        class: impl Into<String>,
        imports: Arc<ImportTable>,
        type_params: Vec<String>,
        enclosing: Option<Arc<ClassScope>>,
    ) -> Self {
        Self {
            class: class.into(),
            imports,
            type_params,
            outer_type_params: Vec::new(),
            enclosing,
            local_classes: AtomicU32::new(0),
            local_names: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outer_type_params(mut self, names: Vec<String>) -> Self {
        self.outer_type_params = names;
        self
    }

    /// Next number for an anonymous or local class (`Outer$1`, `Outer$2Local`).
    pub fn next_local_class(&self) -> u32 {
        self.local_classes.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Name a local class declared in a body of this class (`Outer$1Local`) and make it visible by simple name.
    ///
    /// Visibility is class-wide from this point on, not limited to the declaring block.
    pub fn declare_local_class(&self, simple: &str) -> String {
        let name = format!("{}${}{simple}", self.class, self.next_local_class());
        self.local_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((simple.to_string(), name.clone()));
        name
    }

    /// Internal name of the latest local class declared as `simple`.
    pub fn local_class(&self, simple: &str) -> Option<String> {
        let names = self.local_names.lock().unwrap_or_else(PoisonError::into_inner);
        names.iter().rev().find(|(s, _)| s == simple).map(|(_, name)| name.clone())
    }

    /// This scope followed by its enclosing scopes, innermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ClassScope> {
        std::iter::successors(Some(self), |s| s.enclosing.as_deref())
    }
}

/// Resolution state for one thread at one nesting depth.
#[derive(Clone)]
pub struct LocalContext<'g> {
    ctx: &'g GlobalContext,
    scope: Arc<ClassScope>,
    method_type_params: Vec<String>,
    static_context: bool,
    depth: u32,
    /// Drop diagnostics instead of reporting them (speculative evaluation).
    silent: bool,
}

impl<'g> LocalContext<'g> {
    pub fn new(ctx: &'g GlobalContext, scope: Arc<ClassScope>, depth: u32) -> Self {
        Self {
            ctx,
            scope,
            method_type_params: Vec::new(),
            static_context: false,
            depth,
            silent: false,
        }
    }

    /// Context for a class compiled inline (anonymous or local) one level deeper.
    pub fn nested(&self, scope: Arc<ClassScope>) -> Self {
        Self::new(self.ctx, scope, self.depth + 1)
    }

    /// Context for code inside a method (or initializer) with the given type variables.
    pub fn with_method(&self, type_params: Vec<String>, is_static: bool) -> Self {
        Self {
            method_type_params: type_params,
            static_context: is_static,
            ..self.clone()
        }
    }

    /// The same context with reporting switched off.
    pub fn silenced(&self) -> Self {
        Self {
            silent: true,
            ..self.clone()
        }
    }

    pub fn method_type_params(&self) -> &[String] {
        &self.method_type_params
    }

    pub fn global(&self) -> &'g GlobalContext {
        self.ctx
    }

    pub fn scope(&self) -> &Arc<ClassScope> {
        &self.scope
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_static_context(&self) -> bool {
        self.static_context
    }

    pub fn class_name(&self) -> &str {
        &self.scope.class
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn report(&self, severity: Severity, span: Span, code: &'static str, args: Vec<String>) {
        if self.silent {
            return;
        }
        self.ctx.report(&self.scope.class, severity, span, code, args);
    }

    pub fn error(&self, span: Span, code: &'static str, args: Vec<String>) {
        self.report(Severity::Error, span, code, args);
    }

    pub fn warn(&self, span: Span, code: &'static str, args: Vec<String>) {
        self.report(Severity::Warning, span, code, args);
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Current snapshot of the class being compiled.
    pub fn current_class(&self) -> Option<Arc<ClassNode>> {
        self.ctx.get_class_info(&self.scope.class)
    }

    pub fn class_info(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.ctx.get_class_info(name)
    }

    pub fn helper(&self, name: &str) -> Option<Arc<ResolveHelper>> {
        self.ctx.helper_for(name).ok()
    }

    /// Return `true` if `class` is `ancestor` or inherits from it.
    pub fn instance_of(&self, class: &str, ancestor: &str) -> bool {
        class == ancestor || self.helper(class).is_some_and(|h| h.instance_of(self.ctx, ancestor))
    }

    pub fn is_type_param(&self, name: &str) -> bool {
        self.method_type_params.iter().any(|p| p == name)
            || self.scope.chain().any(|s| s.type_params.iter().chain(&s.outer_type_params).any(|p| p == name))
    }

    /// Resolve a written class name (`List`, `Map.Entry`, `java.util.List`, or an internal name) without reporting.
    ///
    /// `Err` carries the candidates of an ambiguous simple name.
    pub fn lookup_class(&self, written: &str) -> Result<Option<String>, Vec<String>> {
        if written.contains('/') {
            return Ok(self.ctx.class_exists(written).then(|| written.to_string()));
        }
        let segments: Vec<&str> = written.split('.').collect();
        let (first, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Ok(None),
        };
        match self.lookup_simple(first) {
            Ok(Some(outer)) => {
                let candidate = rest.iter().fold(outer, |acc, seg| format!("{acc}${seg}"));
                if rest.is_empty() || self.ctx.class_exists(&candidate) {
                    return Ok(Some(candidate));
                }
            }
            Err(candidates) if rest.is_empty() => return Err(candidates),
            _ => {}
        }
        if rest.is_empty() {
            return Ok(None);
        }
        Ok(resolve_qualified(self.ctx, &segments.join("/")))
    }

    fn lookup_simple(&self, name: &str) -> Result<Option<String>, Vec<String>> {
        for scope in self.scope.chain() {
            if let Some(found) = scope.local_class(name) {
                return Ok(Some(found));
            }
            if let Some(found) = self.member_class(&scope.class, name) {
                return Ok(Some(found));
            }
        }
        let imports = &self.scope.imports;
        if let Some(path) = imports.single(name) {
            if let Some(found) = resolve_qualified(self.ctx, path) {
                return Ok(Some(found));
            }
        }
        let local = qualify(&imports.package, name);
        if self.ctx.class_exists(&local) {
            return Ok(Some(local));
        }
        let mut hits: Vec<String> = Vec::new();
        let on_demand = imports.on_demand().map(|p| {
            let owner = resolve_qualified(self.ctx, p);
            owner.map_or_else(|| qualify(p, name), |class| format!("{class}${name}"))
        });
        for candidate in on_demand.chain(well_known::IMPLICIT_IMPORTS.iter().map(|p| qualify(p, name))) {
            if self.ctx.class_exists(&candidate) && !hits.contains(&candidate) {
                hits.push(candidate);
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.pop()),
            _ => Err(hits),
        }
    }

    /// `class$name`, declared or inherited.
    fn member_class(&self, class: &str, name: &str) -> Option<String> {
        let direct = format!("{class}${name}");
        if self.ctx.class_exists(&direct) {
            return Some(direct);
        }
        let list = self.helper(class)?.class_list(self.ctx).ok()?;
        list.iter()
            .skip(1)
            .map(|(ancestor, _)| format!("{ancestor}${name}"))
            .find(|candidate| self.ctx.class_exists(candidate))
    }

    /// Resolve a written class name, reporting failure. Ambiguous names resolve to the first candidate.
    pub fn resolve_class_name(&self, written: &str, span: Span) -> Option<String> {
        match self.lookup_class(written) {
            Ok(Some(name)) => Some(name),
            Ok(None) => {
                self.error(span, codes::SYMBOL_UNRESOLVED, vec![written.to_string()]);
                None
            }
            Err(candidates) => {
                let listed = candidates.iter().map(|c| display_name(c)).collect::<Vec<_>>().join(", ");
                self.error(span, codes::SYMBOL_AMBIGUOUS, vec![written.to_string(), listed]);
                candidates.into_iter().next()
            }
        }
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}/{name}")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::class::ClassOrigin;
    use crate::unit::cursor::{Cursor, TokenRange};
    use crate::unit::imports::parse_imports;
    use lava_core::access::ACC_PUBLIC;
    use lava_syntax::lexer::lex;

    /// A context whose current class is `p/Test` (registered as a unit) importing per `header`.
    pub fn scope(ctx: &GlobalContext, header: &str) -> Arc<ClassScope> {
        let tokens = lex(header).unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        let imports = parse_imports(&mut c, ctx, "p/Test").unwrap();
        let name = if imports.package.is_empty() { "Test".to_string() } else { format!("{}/Test", imports.package) };
        if ctx.get_class_info(&name).is_none() {
            ctx.add_compile_unit(ClassNode::new(name.clone(), ACC_PUBLIC, ClassOrigin::Unit)).unwrap();
        }
        Arc::new(ClassScope::new(name, Arc::new(imports), vec!["T".into()], None))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::scope;
    use super::*;
    use crate::class::ClassOrigin;
    use lava_core::access::ACC_PUBLIC;

    #[test]
    fn test_simple_name_order() {
        let ctx = GlobalContext::new();
        ctx.add_compile_unit(ClassNode::new("p/List", ACC_PUBLIC, ClassOrigin::Unit)).unwrap();
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p; import java.util.*;"), 0);
        // the same package beats an on-demand import
        assert_eq!(lc.lookup_class("List"), Ok(Some("p/List".into())));
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p; import java.util.List;"), 0);
        assert_eq!(lc.lookup_class("List"), Ok(Some("java/util/List".into())));
        assert_eq!(lc.lookup_class("String"), Ok(Some("java/lang/String".into())));
    }

    #[test]
    fn test_member_and_qualified_names() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, "import java.util.Map;"), 0);
        assert_eq!(lc.lookup_class("Map.Entry"), Ok(Some("java/util/Map$Entry".into())));
        assert_eq!(lc.lookup_class("java.util.Map.Entry"), Ok(Some("java/util/Map$Entry".into())));
        assert_eq!(lc.lookup_class("java/util/HashMap"), Ok(Some("java/util/HashMap".into())));
        assert!(lc.is_type_param("T"));
    }

    #[test]
    fn test_ambiguous_on_demand() {
        let ctx = GlobalContext::new();
        ctx.add_compile_unit(ClassNode::new("q/String", ACC_PUBLIC, ClassOrigin::Unit)).unwrap();
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p; import q.*;"), 0);
        assert!(lc.lookup_class("String").is_err());
        assert_eq!(lc.resolve_class_name("String", Span::at(0)).as_deref(), Some("q/String"));
        assert_eq!(ctx.diagnostics()[0].code, codes::SYMBOL_AMBIGUOUS);
        assert!(lc.resolve_class_name("Nope", Span::at(0)).is_none());
    }
}
