//! Stage 3: constant folding and the deferred work queued by the structure stage.
//!
//! [`CompileUnit::fold_constants`] runs to a fixpoint over all units before annotations are checked, so a constant
//! may refer to constants of units that come later in the list. [`CompileUnit::stage3`] then drains the queue:
//! field initializers, enum constants, method bodies and initializer blocks.

use std::sync::Arc;

use lava_core::access::{ACC_FINAL, has};
use lava_core::lang::keywords::KeywordId;
use lava_core::lang::punctuation::PunctuationId;
use lava_core::lang::well_known;
use lava_syntax::{Span, SyntaxError};
use lava_syntax::diagnostics::codes;

use super::body::BodyChecker;
use super::cursor::TokenRange;
use super::decl::{ClassDecl, ClassKind};
use super::members::accepts_no_args;
use super::{CompileUnit, DeferredTask, InlineClass, Nesting, SourceFile, Stage, compile_inline, slot};
use crate::context::GlobalContext;
use crate::local::LocalContext;
use crate::local::constants::convert;
use crate::local::expr::{Evaluator, Locals};
use crate::types::{IType, Type, display_name};

impl CompileUnit {
    /// One folding round over `final` fields of primitive or `String` type whose value is not known yet.
    ///
    /// Runs silently; the initializers are checked for real in S3. Returns `true` if a constant was found, which
    /// means another round may find more.
    pub fn fold_constants(&mut self, ctx: &GlobalContext) -> bool {
        if self.failed || self.stage != Stage::Members {
            return false;
        }
        let (Some(lc), Some(decl)) = (self.local_context(ctx), self.decl.take()) else {
            return false;
        };
        let quiet = lc.silenced();
        let file = Arc::clone(&self.file);
        let mut changed = false;
        for (i, field) in decl.fields.iter().enumerate() {
            let (Some(init), Some(index)) = (field.init, slot(&self.field_slots, i)) else {
                continue;
            };
            let Some(node) = self.node.fields.get(index) else {
                continue;
            };
            let foldable = node.ty.is_primitive() || node.ty == Type::string();
            if node.constant.is_some() || !has(node.access, ACC_FINAL) || node.ty.is_array() || !foldable {
                continue;
            }
            let (ty, target) = (node.ty.clone(), node.generic_type());
            let mut eval = Evaluator::new(quiet.with_method(Vec::new(), node.is_static()), file.tokens());
            let Ok(value) = eval.expression_in(init) else {
                continue;
            };
            if value.poisoned || !eval.check_assign(&value, &target, field.span) {
                continue;
            }
            if let Some(constant) = value.constant.as_ref().and_then(|k| convert(k, &ty)) {
                tracing::trace!(class = %self.name, field = %field.name, "folded constant");
                self.node.fields[index].constant = Some(constant);
                changed = true;
            }
        }
        self.decl = Some(decl);
        if changed {
            self.publish(ctx);
        }
        changed
    }

    /// Stage 3: drain the deferred queue.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.name))]
    pub fn stage3(&mut self, ctx: &GlobalContext) -> Result<(), SyntaxError> {
        if self.failed || self.stage != Stage::Annotations {
            return Ok(());
        }
        let (Some(lc), Some(decl)) = (self.local_context(ctx), self.decl.take()) else {
            return Ok(());
        };
        let file = Arc::clone(&self.file);
        let result = self.drain_tasks(&lc, &file, &decl);
        self.decl = Some(decl);
        let result = self.settle(ctx, result, Stage::Finished);
        if result.is_ok() {
            self.publish(ctx);
        }
        result
    }

    fn drain_tasks(&mut self, lc: &LocalContext<'_>, file: &Arc<SourceFile>, decl: &ClassDecl) -> Result<(), SyntaxError> {
        while let Some(task) = self.deferred.pop_front() {
            match task {
                DeferredTask::FieldInit(i) => self.check_field_init(lc, file, decl, i)?,
                DeferredTask::EnumConstant(i) => self.check_enum_constant(lc, file, decl, i)?,
                DeferredTask::AnnotationDefault(i) => {
                    let mut eval = Evaluator::new(lc.with_method(Vec::new(), true), file.tokens());
                    self.annotation_default(&mut eval, file, decl, i)?;
                }
                DeferredTask::Body(i) => self.check_body(lc, file, decl, i)?,
                DeferredTask::Initializer(i) => {
                    let Some(init) = decl.initializers.get(i) else {
                        continue;
                    };
                    let mut body = self.body_checker(lc.with_method(Vec::new(), init.is_static), file, void());
                    body.block(init.body)?;
                }
            }
        }
        Ok(())
    }

    /// Checker for code of this class; an inline class sees the locals of the body it was declared in.
    fn body_checker<'a, 'g>(&self, lc: LocalContext<'g>, file: &'a Arc<SourceFile>, ret: IType) -> BodyChecker<'a, 'g> {
        BodyChecker::new(lc, file, self.captured.capture(), ret)
    }

    fn check_field_init(
        &mut self,
        lc: &LocalContext<'_>,
        file: &Arc<SourceFile>,
        decl: &ClassDecl,
        i: usize,
    ) -> Result<(), SyntaxError> {
        let Some(init) = decl.fields.get(i).and_then(|f| f.init) else {
            return Ok(());
        };
        let Some(node) = slot(&self.field_slots, i).and_then(|s| self.node.fields.get(s)) else {
            return Ok(());
        };
        let target = node.generic_type();
        let mut body = self.body_checker(lc.with_method(Vec::new(), node.is_static()), file, void());
        body.initializer(init, &target)?;
        Ok(())
    }

    fn check_enum_constant(
        &mut self,
        lc: &LocalContext<'_>,
        file: &Arc<SourceFile>,
        decl: &ClassDecl,
        i: usize,
    ) -> Result<(), SyntaxError> {
        let Some(constant) = decl.constants.get(i) else {
            return Ok(());
        };
        let mut body = self.body_checker(lc.with_method(Vec::new(), true), file, void());
        let args = match constant.args {
            Some(range) => body.arguments(range)?,
            None => Vec::new(),
        };
        let types: Vec<IType> = args.iter().map(|a| a.ty.clone()).collect();
        if !args.iter().any(|a| a.poisoned) {
            let ctors = lc
                .helper(&self.name)
                .and_then(|h| h.find_method(lc.global(), well_known::CONSTRUCTOR).ok())
                .unwrap_or_default();
            let this = IType::class(self.name.clone());
            if lc.select_method(&this, &ctors, &types).is_none() {
                lc.error(constant.span, codes::ENUM_CONSTANT_ARGS, vec![display_name(&self.name), types.len().to_string()]);
            }
        }
        if let Some(range) = constant.body {
            let class = InlineClass {
                name: format!("{}${}", self.name, lc.scope().next_local_class()),
                range,
                nesting: Nesting::Anonymous {
                    parent: IType::class(self.name.clone()),
                    args: types,
                },
                captured: Locals::new(),
            };
            compile_inline(lc, file, class);
        }
        Ok(())
    }

    fn check_body(
        &mut self,
        lc: &LocalContext<'_>,
        file: &Arc<SourceFile>,
        decl: &ClassDecl,
        i: usize,
    ) -> Result<(), SyntaxError> {
        let Some(method) = decl.methods.get(i) else {
            return Ok(());
        };
        let Some(range) = method.body else {
            return Ok(());
        };
        // dropped duplicates keep no node
        let Some(node) = slot(&self.method_slots, i).and_then(|s| self.node.methods.get(s)).cloned() else {
            return Ok(());
        };
        let type_params = method.type_params.iter().map(|tp| tp.name.clone()).collect();
        let mlc = lc.with_method(type_params, node.is_static());
        if node.is_constructor() && !calls_other_constructor(file, range) {
            self.check_explicit_super(&mlc, decl, method.span);
        }
        let mut body = self.body_checker(mlc, file, node.generic_return());
        for (param, ty) in method.params.iter().zip(node.generic_params()) {
            body.declare(&param.name, ty, None, param.span);
        }
        body.block(range)
    }

    /// A written constructor that does not start with `this(...)` or `super(...)` calls `super()` implicitly.
    fn check_explicit_super(&self, lc: &LocalContext<'_>, decl: &ClassDecl, span: Span) {
        if decl.kind != ClassKind::Class || matches!(self.nesting, Nesting::Anonymous { .. }) {
            return;
        }
        let Some(parent) = self.node.parent.as_deref().and_then(|p| lc.class_info(p)) else {
            return;
        };
        if !accepts_no_args(lc, &parent) {
            lc.error(span, codes::CTOR_NO_DEFAULT_SUPER, vec![display_name(&parent.name)]);
        }
    }
}

fn void() -> IType {
    IType::Raw(Type::void())
}

/// Whether a constructor body starts with `this(...)` or `super(...)`.
fn calls_other_constructor(file: &SourceFile, body: TokenRange) -> bool {
    let tokens = file.tokens();
    let (Some(first), Some(second)) = (tokens.get(body.start), tokens.get(body.start + 1)) else {
        return false;
    };
    body.end > body.start + 1
        && (first.kind.is_keyword(KeywordId::This) || first.kind.is_keyword(KeywordId::Super))
        && second.kind.is_punctuation(PunctuationId::LParen)
}

#[cfg(test)]
mod tests {
    use crate::class::Constant;
    use crate::context::GlobalContext;
    use crate::unit::Stage;
    use crate::unit::test_support::{codes, compile};
    use lava_syntax::diagnostics::codes;

    #[test]
    fn test_constants_fold_across_units() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[
                ("A.java", "class A { static final int X = B.Y + 1; final String S = \"a\" + X; static int plain = 3; }"),
                ("B.java", "class B { static final int Y = 2 * 3; static final byte SMALL = 10; }"),
            ],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let a = units[0].node();
        assert_eq!(a.fields[0].constant, Some(Constant::Int(7)));
        assert_eq!(a.fields[1].constant, Some(Constant::String("a7".into())));
        assert_eq!(a.fields[2].constant, None);
        assert_eq!(units[1].node().fields[1].constant, Some(Constant::Byte(10)));
    }

    #[test]
    fn test_field_initializers_are_checked() {
        let ctx = GlobalContext::new();
        compile(&ctx, &[("A.java", "class A { int x = \"s\"; String[] xs = {\"a\", \"b\"}; long y = x; }")]);
        assert_eq!(codes(&ctx), [codes::CAST_FORBIDDEN]);
    }

    #[test]
    fn test_enum_constants() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[("E.java", "enum E { A(1), B(\"x\"), C { int extra() { return 2; } }; E(int v) {} E() {} }")],
        );
        assert_eq!(codes(&ctx), [codes::ENUM_CONSTANT_ARGS]);
        assert_eq!(units[0].stage(), Stage::Finished);
        let body = ctx.get_class_info("E$1").unwrap();
        assert_eq!(body.parent.as_deref(), Some("E"));
        assert!(body.methods.iter().any(|m| m.name == "extra"));
    }

    #[test]
    fn test_written_constructors_need_a_super_call() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[(
                "P.java",
                "class P { P(int x) {} } class Q extends P { Q() { } } class R extends P { R() { super(1); } R(String s) { this(); } }",
            )],
        );
        assert_eq!(codes(&ctx), [codes::CTOR_NO_DEFAULT_SUPER]);
    }
}
