//! Stage 0: `package` and `import` declarations.
//!
//! Imports are only recorded here. A single-type import is resolved the first time its short name is used, so a file
//! importing something it never uses costs nothing; explicit imports are still checked once in the header stage.

use lava_core::lang::keywords::KeywordId;
use lava_core::lang::operators::OperatorId;
use lava_core::lang::punctuation::PunctuationId;
use lava_syntax::diagnostics::codes;
use lava_syntax::{Severity, Span, SyntaxError};
use rustc_hash::FxHashMap;

use super::cursor::Cursor;
use super::syntax::skip_annotations;
use crate::context::GlobalContext;
use crate::types::display_name;

/// Imports of one source file. Names are stored slash-separated exactly as written (`java/util/Map/Entry`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    /// Internal package name; empty for the unnamed package.
    pub package: String,
    single: FxHashMap<String, (String, Span)>,
    on_demand: Vec<(String, Span)>,
    statics: FxHashMap<String, Vec<(String, Span)>>,
    static_on_demand: Vec<(String, Span)>,
}

impl ImportTable {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Written target of the single-type import for `short`.
    pub fn single(&self, short: &str) -> Option<&str> {
        self.single.get(short).map(|(path, _)| path.as_str())
    }

    /// Wildcard-imported packages or classes.
    pub fn on_demand(&self) -> impl Iterator<Item = &str> {
        self.on_demand.iter().map(|(p, _)| p.as_str())
    }

    /// Owners a static member `name` may come from: explicit static imports first, then static wildcards.
    pub fn static_owners(&self, name: &str) -> Vec<&str> {
        let explicit = self.statics.get(name).into_iter().flatten().map(|(owner, _)| owner.as_str());
        explicit.chain(self.static_on_demand.iter().map(|(o, _)| o.as_str())).collect()
    }

    /// Explicit imports that name nothing on the classpath, with the span of the import.
    pub fn unresolved(&self, ctx: &GlobalContext) -> Vec<(String, Span)> {
        let mut missing = Vec::new();
        for (path, span) in self.single.values() {
            if resolve_qualified(ctx, path).is_none() {
                missing.push((path.clone(), *span));
            }
        }
        for (owner, span) in self.statics.values().flatten().chain(&self.static_on_demand) {
            if resolve_qualified(ctx, owner).is_none() {
                missing.push((owner.clone(), *span));
            }
        }
        for (path, span) in &self.on_demand {
            if !ctx.has_package(path) && resolve_qualified(ctx, path).is_none() {
                missing.push((format!("{path}/*"), *span));
            }
        }
        missing.sort_by_key(|(_, span)| span.start);
        missing.dedup();
        missing
    }

    fn add(&mut self, ctx: &GlobalContext, unit: &str, import: Import) {
        let Import {
            path,
            is_static,
            wildcard,
            span,
        } = import;
        let duplicate = |existing: &[(String, Span)]| existing.iter().any(|(p, _)| *p == path);
        let is_duplicate = match (is_static, wildcard) {
            (false, true) => duplicate(&self.on_demand),
            (true, true) => duplicate(&self.static_on_demand),
            (false, false) => self.single.values().any(|(p, _)| *p == path),
            (true, false) => {
                let (owner, member) = split_last(&path);
                self.statics.get(member).is_some_and(|owners| owners.iter().any(|(o, _)| o == owner))
            }
        };
        if is_duplicate {
            let written = display_name(&path) + if wildcard { ".*" } else { "" };
            ctx.report(unit, Severity::Warning, span, codes::IMPORT_DUPLICATE, vec![written]);
            return;
        }
        match (is_static, wildcard) {
            (false, true) => self.on_demand.push((path, span)),
            (true, true) => self.static_on_demand.push((path, span)),
            (false, false) => {
                let short = split_last(&path).1.to_string();
                if let Some((first, _)) = self.single.get(&short) {
                    ctx.report(
                        unit,
                        Severity::Error,
                        span,
                        codes::IMPORT_CONFLICT,
                        vec![short, display_name(first), display_name(&path)],
                    );
                    return;
                }
                self.single.insert(short, (path, span));
            }
            (true, false) => {
                let (owner, member) = split_last(&path);
                self.statics.entry(member.to_string()).or_default().push((owner.to_string(), span));
            }
        }
    }
}

struct Import {
    path: String,
    is_static: bool,
    wildcard: bool,
    span: Span,
}

fn split_last(path: &str) -> (&str, &str) {
    lava_core::split_package(path)
}

/// Parse the `package` clause and the imports at the cursor. Problems are reported against `unit`.
#[tracing::instrument(level = "debug", skip_all, fields(unit = unit))]
pub fn parse_imports(c: &mut Cursor<'_>, ctx: &GlobalContext, unit: &str) -> Result<ImportTable, SyntaxError> {
    let start = c.pos();
    skip_annotations(c)?;
    let package = if c.eat_keyword(KeywordId::Package) {
        let (name, _) = dotted_name(c)?;
        c.expect_punct(PunctuationId::Semicolon)?;
        name
    } else {
        // Annotations belong to the first declaration when there is no package clause.
        c.reset(start);
        String::new()
    };
    let mut table = ImportTable::new(package);
    loop {
        if c.eat_punct(PunctuationId::Semicolon) {
            continue;
        }
        if !c.is_keyword(KeywordId::Import) {
            break;
        }
        let span_start = c.bump().span;
        let is_static = c.eat_keyword(KeywordId::Static);
        let (path, _) = dotted_name(c)?;
        let wildcard = c.is_punct(PunctuationId::Dot) && c.nth(1).kind.is_operator(OperatorId::Star);
        if wildcard {
            c.bump();
            c.bump();
        }
        let end = c.expect_punct(PunctuationId::Semicolon)?;
        table.add(
            ctx,
            unit,
            Import {
                path,
                is_static,
                wildcard,
                span: span_start.to(end),
            },
        );
    }
    Ok(table)
}

/// `a.b.C` → `a/b/C`
fn dotted_name(c: &mut Cursor<'_>) -> Result<(String, Span), SyntaxError> {
    let (mut name, mut span) = c.expect_ident()?;
    while c.is_punct(PunctuationId::Dot) && c.nth(1).kind.ident().is_some() {
        c.bump();
        let (seg, seg_span) = c.expect_ident()?;
        name.push('/');
        name.push_str(&seg);
        span = span.to(seg_span);
    }
    Ok((name, span))
}

/// Resolve a fully qualified, slash-separated path whose class part may continue into member classes.
///
/// `java/util/Map/Entry` is tried as `java/util/Map/Entry`, then `java/util/Map$Entry`, then `java/util$Map$Entry`,
/// and so on: longer package prefixes win.
pub fn resolve_qualified(ctx: &GlobalContext, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    (0..segments.len()).rev().find_map(|k| {
        let class = segments[k..].join("$");
        let candidate = if k == 0 {
            class
        } else {
            format!("{}/{class}", segments[..k].join("/"))
        };
        ctx.class_exists(&candidate).then_some(candidate)
    })
}
