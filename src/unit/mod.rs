//! Compile units: one class of one source file, driven through four stages.
//!
//! | Stage | Method | Work |
//! |-------|--------|------|
//! | S0 | [`CompileUnit::stage0`] | `package` and `import` declarations |
//! | S1 | [`CompileUnit::stage1`] | class and member skeleton with written types; member classes become child units |
//! | S2 | [`CompileUnit::stage2_header`], [`CompileUnit::stage2_members`], [`CompileUnit::stage2_annotations`] | supertypes, member types and signatures, annotations |
//! | S3 | [`CompileUnit::fold_constants`], [`CompileUnit::stage3`] | deferred initializers and bodies |
//!
//! Every pass of a stage runs for all units before the next pass starts: a class's ancestors must have their
//! supertypes resolved before anything asks for its ancestor list. [`run_pipeline`] does exactly that.
//!
//! A unit republishes its [`ClassNode`] snapshot after each stage. Semantic problems are reported and patched with
//! placeholders (`java/lang/Object` for an unresolvable type); a [`SyntaxError`] ends the unit's pipeline.

pub mod annotations;
pub mod body;
pub mod cursor;
pub mod decl;
pub mod deferred;
pub mod header;
pub mod imports;
pub mod members;
pub mod structure;
pub mod syntax;

use std::collections::VecDeque;
use std::sync::Arc;

use lava_syntax::diagnostics::codes;
use lava_syntax::lexer::{Token, lex};
use lava_syntax::{Severity, Span, SyntaxError};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::class::{ClassNode, ClassOrigin};
use crate::context::GlobalContext;
use crate::error::SessionError;
use crate::local::expr::Locals;
use crate::local::{ClassScope, LocalContext};
use crate::types::{IType, TypeArena, TypeRef};
use cursor::TokenRange;
use decl::ClassDecl;
use imports::ImportTable;

/// A source file and its tokens. Shared by every unit declared in it.
#[derive(Debug)]
pub struct SourceFile {
    /// Path or label used in diagnostics.
    pub name: String,
    pub text: String,
    tokens: Vec<Token>,
    lex_error: Option<SyntaxError>,
}

impl SourceFile {
    #[tracing::instrument(name = "lex", level = "debug", skip(text))]
    pub fn new(name: String, text: String) -> Arc<Self> {
        let (tokens, lex_error) = match lex(&text) {
            Ok(tokens) => (tokens, None),
            Err(mut errors) => (Vec::new(), (!errors.is_empty()).then(|| errors.swap_remove(0))),
        };
        Arc::new(Self {
            name,
            text,
            tokens,
            lex_error,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Span covering the tokens of `range`.
    pub fn span_of(&self, range: TokenRange) -> Span {
        let first = self.tokens.get(range.start).map(|t| t.span);
        let last = range.end.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| t.span);
        match (first, last) {
            (Some(a), Some(b)) if range.end > range.start => a.to(b),
            (Some(a), _) => Span::at(a.start),
            _ => Span::at(self.text.len()),
        }
    }
}

/// Last stage a unit completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Created,
    Imports,
    Structure,
    Header,
    Members,
    Annotations,
    Finished,
}

/// Work queued by the structure stage and drained in S3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Initializer of `decl.fields[i]`.
    FieldInit(usize),
    /// Arguments and body of `decl.constants[i]`.
    EnumConstant(usize),
    /// `default` clause of the annotation element `decl.methods[i]`.
    AnnotationDefault(usize),
    /// Body of `decl.methods[i]`.
    Body(usize),
    /// `decl.initializers[i]`.
    Initializer(usize),
}

/// How a unit sits relative to other classes.
#[derive(Debug, Clone, PartialEq)]
pub enum Nesting {
    TopLevel,
    Member { outer: String, in_interface: bool },
    /// Declared in a block.
    Local,
    /// `new T(args) { ... }` or an enum constant with a body.
    Anonymous { parent: IType, args: Vec<IType> },
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct CompileUnit {
    file: Arc<SourceFile>,
    /// Internal name; empty until S1 (or given up front for inline classes).
    name: String,
    stage: Stage,
    failed: bool,
    /// Tokens of the declaration (the whole file before S0; the class body for anonymous classes).
    range: TokenRange,
    imports: Arc<ImportTable>,
    nesting: Nesting,
    enclosing: Option<Arc<ClassScope>>,
    depth: u32,
    /// Registered as a generated class rather than a compile unit.
    generated: bool,
    /// First unit of its file; checks the file's imports.
    owns_imports: bool,
    /// Locals of the enclosing body an inline class may read.
    captured: Locals,
    /// Type variables of the enclosing method, for inline classes.
    outer_type_params: Vec<String>,
    decl: Option<ClassDecl>,
    arena: TypeArena,
    /// Resolved form of each written type, resolved once in class context.
    resolved: FxHashMap<TypeRef, IType>,
    node: ClassNode,
    scope: Option<Arc<ClassScope>>,
    /// Supertypes and bounds bound by the header pass, validated by the member pass.
    unchecked: Vec<(IType, Span)>,
    /// `decl.fields[i]` → index in `node.fields` (`None` for dropped duplicates).
    field_slots: Vec<Option<usize>>,
    /// `decl.methods[i]` → index in `node.methods`.
    method_slots: Vec<Option<usize>>,
    deferred: VecDeque<DeferredTask>,
}

impl CompileUnit {
    /// A unit for a whole source file.
    pub fn new(file: Arc<SourceFile>) -> Self {
        let range = TokenRange::new(0, file.tokens().len());
        let mut unit =
            Self::with_parts(file, String::new(), range, Arc::new(ImportTable::default()), Nesting::TopLevel, None, 0);
        unit.owns_imports = true;
        unit
    }

    fn with_parts(
        file: Arc<SourceFile>,
        name: String,
        range: TokenRange,
        imports: Arc<ImportTable>,
        nesting: Nesting,
        enclosing: Option<Arc<ClassScope>>,
        depth: u32,
    ) -> Self {
        Self {
            file,
            node: ClassNode::new(name.clone(), 0, ClassOrigin::Unit),
            name,
            stage: Stage::Created,
            failed: false,
            range,
            imports,
            nesting,
            enclosing,
            depth,
            generated: false,
            owns_imports: false,
            captured: Locals::default(),
            outer_type_params: Vec::new(),
            decl: None,
            arena: TypeArena::new(),
            resolved: FxHashMap::default(),
            scope: None,
            unchecked: Vec::new(),
            field_slots: Vec::new(),
            method_slots: Vec::new(),
            deferred: VecDeque::new(),
        }
    }

    /// A class declared inside another unit's tokens; it starts at S0 with the enclosing file's imports.
    fn nested(&self, name: String, range: TokenRange, nesting: Nesting, enclosing: Option<Arc<ClassScope>>) -> Self {
        let mut unit = Self::with_parts(
            Arc::clone(&self.file),
            name,
            range,
            Arc::clone(&self.imports),
            nesting,
            enclosing,
            self.depth,
        );
        unit.generated = self.generated;
        unit.captured = self.captured.clone();
        unit.node.origin = self.node.origin;
        unit.stage = Stage::Imports;
        unit
    }

    /// A local or anonymous class compiled while checking code of `lc`'s class, one level deeper.
    pub(crate) fn inline(
        lc: &LocalContext<'_>,
        file: Arc<SourceFile>,
        name: String,
        range: TokenRange,
        nesting: Nesting,
        captured: Locals,
    ) -> Self {
        let imports = Arc::clone(&lc.scope().imports);
        let mut unit =
            Self::with_parts(file, name, range, imports, nesting, Some(Arc::clone(lc.scope())), lc.depth() + 1);
        unit.captured = captured;
        unit.outer_type_params = lc.method_type_params().to_vec();
        unit.generated = true;
        unit.stage = Stage::Imports;
        unit.node.origin = ClassOrigin::Generated;
        unit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Arc<SourceFile> {
        &self.file
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Past S1 without declaring anything.
    pub fn is_empty(&self) -> bool {
        !self.failed && self.stage >= Stage::Structure && self.name.is_empty()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Current working skeleton.
    pub fn node(&self) -> &ClassNode {
        &self.node
    }

    pub fn decl(&self) -> Option<&ClassDecl> {
        self.decl.as_ref()
    }

    /// Tasks not drained yet.
    pub fn deferred(&self) -> impl Iterator<Item = &DeferredTask> {
        self.deferred.iter()
    }

    /// Hand the finished skeleton to code generation.
    pub fn finish(self) -> ClassNode {
        self.node
    }

    /// Label diagnostics are filed under: the class name once known, the file before that.
    fn label(&self) -> &str {
        if self.name.is_empty() { &self.file.name } else { &self.name }
    }

    /// Resolution context for code of this class, available from S1 on.
    pub fn local_context<'g>(&self, ctx: &'g GlobalContext) -> Option<LocalContext<'g>> {
        self.scope.as_ref().map(|scope| LocalContext::new(ctx, Arc::clone(scope), self.depth))
    }

    /// Record the outcome of a stage: success advances it, a syntax error is reported and ends the pipeline.
    fn settle<T>(&mut self, ctx: &GlobalContext, result: Result<T, SyntaxError>, reached: Stage) -> Result<T, SyntaxError> {
        match &result {
            Ok(_) => self.stage = reached,
            Err(err) => {
                ctx.report(self.label(), Severity::Error, err.span, codes::SYNTAX, vec![err.message.clone()]);
                self.failed = true;
            }
        }
        result
    }

    /// Make the working skeleton visible to other units.
    fn publish(&self, ctx: &GlobalContext) {
        if self.generated {
            ctx.add_generated_class(self.node.clone());
        } else {
            ctx.publish(self.node.clone());
        }
    }

    /// Resolve a written type in class context, once per distinct type.
    fn resolve_ref(&mut self, lc: &LocalContext<'_>, ty: TypeRef) -> IType {
        if let Some(done) = self.resolved.get(&ty) {
            return done.clone();
        }
        let resolved = lc.resolve_type(&self.arena.to_itype(ty), self.arena.span(ty));
        self.resolved.insert(ty, resolved.clone());
        resolved
    }

    /// Like [`CompileUnit::resolve_ref`] for a context with method type variables, which must not be cached.
    fn resolve_in(&mut self, lc: &LocalContext<'_>, ty: TypeRef, method_scoped: bool) -> IType {
        if method_scoped {
            lc.resolve_type(&self.arena.to_itype(ty), self.arena.span(ty))
        } else {
            self.resolve_ref(lc, ty)
        }
    }

    /// Stage 0: `package` and imports.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.file.name))]
    pub fn stage0(&mut self, ctx: &GlobalContext) -> Result<(), SyntaxError> {
        let result = self.parse_imports(ctx);
        self.settle(ctx, result, Stage::Imports)
    }

    fn parse_imports(&mut self, ctx: &GlobalContext) -> Result<(), SyntaxError> {
        if let Some(err) = &self.file.lex_error {
            return Err(err.clone());
        }
        let file = Arc::clone(&self.file);
        let mut c = cursor::Cursor::new(file.tokens(), self.range);
        let imports = imports::parse_imports(&mut c, ctx, &file.name)?;
        self.range.start = c.pos();
        self.imports = Arc::new(imports);
        Ok(())
    }
}

/// Drive `units` through every remaining stage, pass by pass. Units created along the way (member classes) join the
/// list. S3 runs on up to `threads` threads.
///
/// Only a duplicate unit name stops the pipeline.
pub fn run_pipeline(
    mut units: Vec<CompileUnit>,
    ctx: &GlobalContext,
    threads: usize,
) -> Result<Vec<CompileUnit>, SessionError> {
    for unit in &mut units {
        if unit.stage < Stage::Imports && !unit.failed {
            let _ = unit.stage0(ctx);
        }
    }
    let mut all = Vec::with_capacity(units.len());
    for mut unit in units {
        let children = match unit.stage1(ctx) {
            Ok(children) => children,
            Err(StageError::Session(err)) => return Err(err),
            Err(StageError::Syntax(_)) => Vec::new(),
        };
        if unit.is_empty() {
            continue;
        }
        all.push(unit);
        all.extend(children);
    }
    finish_stages(all.iter_mut().filter(|u| !u.failed).collect(), ctx, threads);
    Ok(all)
}

/// S2 and S3 for units past S1.
fn finish_stages(mut live: Vec<&mut CompileUnit>, ctx: &GlobalContext, threads: usize) {
    for unit in &mut live {
        unit.stage2_header(ctx);
    }
    for unit in &mut live {
        unit.stage2_members(ctx);
    }
    while live.iter_mut().fold(false, |changed, unit| unit.fold_constants(ctx) | changed) {}
    // annotation types first: their own `@Target` must be known before anyone is checked against it
    live.sort_by_key(|u| !u.node.is_annotation());
    for unit in &mut live {
        unit.stage2_annotations(ctx);
    }
    run_stage3(live, ctx, threads);
}

/// Compile a local or anonymous class found in code of `lc`'s class, with its member classes, on this thread.
pub(crate) fn compile_inline(lc: &LocalContext<'_>, file: &Arc<SourceFile>, request: InlineClass) {
    let ctx = lc.global();
    tracing::debug!(class = %request.name, depth = lc.depth() + 1, "compiling inline class");
    let mut unit = CompileUnit::inline(lc, Arc::clone(file), request.name, request.range, request.nesting, request.captured);
    let children = unit.stage1(ctx).unwrap_or_default();
    let mut units = Vec::with_capacity(children.len() + 1);
    units.push(unit);
    units.extend(children);
    finish_stages(units.iter_mut().filter(|u| !u.failed).collect(), ctx, 1);
}

/// A class declared inside code, waiting to be compiled.
#[derive(Debug, Clone)]
pub(crate) struct InlineClass {
    pub name: String,
    pub range: TokenRange,
    pub nesting: Nesting,
    pub captured: Locals,
}

/// `slots[i]`, for the `field_slots`/`method_slots` tables.
fn slot(slots: &[Option<usize>], i: usize) -> Option<usize> {
    slots.get(i).copied().flatten()
}

fn run_stage3(mut live: Vec<&mut CompileUnit>, ctx: &GlobalContext, threads: usize) {
    if threads <= 1 || live.len() <= 1 {
        for unit in live {
            let _ = unit.stage3(ctx);
        }
        return;
    }
    let per_thread = live.len().div_ceil(threads);
    std::thread::scope(|s| {
        for chunk in live.chunks_mut(per_thread) {
            s.spawn(move || {
                for unit in chunk.iter_mut() {
                    let _ = unit.stage3(ctx);
                }
            });
        }
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Compile `sources` (`(file name, text)`) through every stage.
    pub fn compile(ctx: &GlobalContext, sources: &[(&str, &str)]) -> Vec<CompileUnit> {
        let units = sources
            .iter()
            .map(|(name, text)| CompileUnit::new(SourceFile::new(name.to_string(), text.to_string())))
            .collect();
        run_pipeline(units, ctx, 1).unwrap()
    }

    /// Codes of every diagnostic reported so far.
    pub fn codes(ctx: &GlobalContext) -> Vec<&'static str> {
        ctx.diagnostics().iter().map(|d| d.code).collect()
    }
}
