//! End-to-end tests for the compile pipeline
//!
//! Each test builds a [`Session`] from in-memory sources and checks what the global context ends up knowing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lava::class::{ClassBuilder, ClassNode};
use lava::library::{Library, NameSet};
use lava::types::IType;
use lava::{CompilerConfig, GlobalContext, Session, SessionError};
use lava_core::access::ACC_PUBLIC;
use lava_syntax::diagnostics::codes;

fn session(sources: &[(&str, &str)]) -> Session {
    let mut session = Session::new(CompilerConfig::default()).unwrap();
    for (name, text) in sources {
        session.add_source(*name, *text);
    }
    session.compile().unwrap();
    session
}

fn codes_of(session: &Session) -> Vec<&'static str> {
    session.diagnostics().iter().map(|d| d.code).collect()
}

/// Library that counts how often a class is actually loaded.
struct CountingLibrary {
    content: NameSet,
    loads: AtomicUsize,
}

impl CountingLibrary {
    fn new() -> Self {
        let mut content = NameSet::default();
        content.insert("q/Lib".to_string());
        Self {
            content,
            loads: AtomicUsize::new(0),
        }
    }
}

impl Library for CountingLibrary {
    fn name(&self) -> &str {
        "counting"
    }

    fn content(&self) -> &NameSet {
        &self.content
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        if name != "q/Lib" {
            return None;
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        let node = ClassBuilder::new("q/Lib", ACC_PUBLIC)
            .parent("java/lang/Object")
            .method("<init>", ACC_PUBLIC, "()V")
            .field("count", ACC_PUBLIC, "I")
            .build()
            .ok()?;
        Some(Arc::new(node))
    }
}

// =============================================================================
// Cross-unit resolution
// =============================================================================

#[test]
fn test_units_see_each_other_in_any_order() {
    let session = session(&[
        ("A.java", "package p; public class A extends B { int twice() { return LIMIT * 2; } }"),
        ("B.java", "package p; public class B { static final int LIMIT = 21; }"),
    ]);
    assert!(!session.has_error(), "{:?}", session.diagnostics());
    let a = session.context().get_class_info("p/A").unwrap();
    assert_eq!(a.parent.as_deref(), Some("p/B"));
}

#[test]
fn test_generic_parent_and_interface_share_arguments() {
    let session = session(&[(
        "X.java",
        "import java.util.*; class X<T> extends ArrayList<T> implements List<T> {}",
    )]);
    assert!(!session.has_error(), "{:?}", session.diagnostics());
    let ctx = session.context();
    let owners = ctx.helper_for("X").unwrap().type_param_owner(ctx).unwrap();
    let t = vec![IType::type_param("T")];
    assert_eq!(owners["java/util/ArrayList"], t);
    assert_eq!(owners["java/util/List"], t);
    assert_eq!(owners["java/util/Collection"], t);
}

#[test]
fn test_missing_parent_is_an_error_not_a_failure() {
    let session = session(&[(
        "Y.java",
        "class Y extends NoSuchClass { int count; int size() { return count; } void reset() { count = 0; } }",
    )]);
    assert_eq!(codes_of(&session), [codes::CLASS_PARENT_UNRESOLVED]);
    assert!(session.has_error());
    assert_eq!(session.units()[0].node().parent.as_deref(), Some("java/lang/Object"));

    let ctx = session.context();
    let helper = ctx.helper_for("Y").unwrap();
    let fields = helper.find_field(ctx, "count").unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].field().name, "count");
    assert_eq!(helper.find_method(ctx, "size").unwrap().len(), 1);
    assert_eq!(helper.find_method(ctx, "reset").unwrap().len(), 1);
    assert!(session.finish().is_none());
}

#[test]
fn test_inheritance_cycle() {
    let session = session(&[("A.java", "class A extends B {}"), ("B.java", "class B extends A {}")]);
    assert_eq!(codes_of(&session), [codes::CLASS_CYCLIC]);
}

#[test]
fn test_duplicate_units_abort_the_session() {
    let mut session = Session::new(CompilerConfig::default()).unwrap();
    session.add_source("One.java", "package p; class Twice {}");
    session.add_source("Two.java", "package p; class Twice {}");
    assert!(matches!(session.compile(), Err(SessionError::DuplicateUnit { ref name }) if name == "p/Twice"));
}

// =============================================================================
// Library memoization and cached tables
// =============================================================================

#[test]
fn test_library_classes_load_once() {
    let library = Arc::new(CountingLibrary::new());
    let mut ctx = GlobalContext::new();
    ctx.add_library(Arc::clone(&library) as Arc<dyn Library>);

    let first = ctx.get_class_info("q/Lib").unwrap();
    let second = ctx.get_class_info("q/Lib").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(ctx.get_class_info("q/Other").is_none());
    assert_eq!(library.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_class_list_is_computed_once() {
    let session = session(&[("C.java", "import java.util.*; abstract class C extends AbstractList<String> {}")]);
    let ctx = session.context();
    let helper = ctx.helper_for("C").unwrap();
    let first = helper.class_list(ctx).unwrap();
    let second = helper.class_list(ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.distance("C"), Some(0));
    assert_eq!(first.distance("java/util/AbstractList"), Some(1));
    assert_eq!(first.distance("java/lang/Iterable"), Some(4));
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn test_diagnostics_point_at_the_source() {
    let text = "class B extends Missing {\n    void f() { int x = 1; int x = 2; }\n}\n";
    let session = session(&[("B.java", text)]);
    let lines: Vec<String> = session
        .diagnostics()
        .iter()
        .map(|d| {
            let file = session.source_of(&d.unit).unwrap();
            d.format_short(&file.name, &file.text)
        })
        .collect();
    insta::assert_snapshot!(lines.join("\n"), @r"
    B.java:1:17: error: cannot find parent class `Missing` of `B`
    B.java:2:31: error: variable `x` is already defined in this scope
    ");
}

#[test]
fn test_warnings_as_errors() {
    let config = CompilerConfig::default().with_warnings_as_errors(true);
    let mut session = Session::new(config).unwrap();
    session.add_source("W.java", "class W { int f() { return 1 / 0; } }");
    session.compile().unwrap();
    assert_eq!(codes_of(&session), [codes::EXPR_DIV_BY_ZERO]);
    assert!(session.has_error());
}
