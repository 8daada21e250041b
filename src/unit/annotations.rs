//! Stage 2, annotation pass: resolves annotation uses, checks where they may appear and records their values.
//!
//! Runs after constant folding, so element values may name constants of any unit. Annotation types go through this
//! pass before everything else: their own `@Target` and `@Retention`, and their element defaults, must be on record
//! before the first use is checked against them.

use std::sync::Arc;

use lava_core::lang::punctuation::PunctuationId;
use lava_core::lang::well_known;
use lava_syntax::SyntaxError;
use lava_syntax::diagnostics::codes;
use rustc_hash::FxHashSet;

use super::cursor::{Cursor, TokenRange};
use super::decl::{AnnotationUse, ClassDecl, ClassKind};
use super::syntax::{at_annotation, parse_annotation_use};
use super::{CompileUnit, DeferredTask, SourceFile, Stage, slot};
use crate::class::{Annotation, ElementValue};
use crate::context::GlobalContext;
use crate::local::constants::convert;
use crate::local::expr::Evaluator;
use crate::resolve::{AnnotationInfo, ElementKind, RetentionPolicy};
use crate::types::{IType, Type, display_name};

/// A record component annotation propagates to every member derived from the component.
const COMPONENT_TARGETS: [ElementKind; 4] =
    [ElementKind::RecordComponent, ElementKind::Field, ElementKind::Method, ElementKind::Parameter];

impl CompileUnit {
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.name))]
    pub fn stage2_annotations(&mut self, ctx: &GlobalContext) {
        if self.failed || self.stage != Stage::Members {
            return;
        }
        let (Some(lc), Some(decl)) = (self.local_context(ctx), self.decl.take()) else {
            return;
        };
        let file = Arc::clone(&self.file);
        let mut eval = Evaluator::new(lc.with_method(Vec::new(), true), file.tokens());
        let result = self.annotate_declarations(&mut eval, &file, &decl);
        self.decl = Some(decl);
        if self.settle(ctx, result, Stage::Annotations).is_ok() {
            self.publish(ctx);
        }
    }

    fn annotate_declarations(
        &mut self,
        eval: &mut Evaluator<'_, '_>,
        file: &SourceFile,
        decl: &ClassDecl,
    ) -> Result<(), SyntaxError> {
        if decl.kind == ClassKind::Annotation {
            for i in 0..decl.methods.len() {
                self.annotation_default(eval, file, decl, i)?;
            }
            self.deferred.retain(|task| !matches!(task, DeferredTask::AnnotationDefault(_)));
        }
        let class_kind = if decl.kind == ClassKind::Annotation { ElementKind::AnnotationType } else { ElementKind::Type };
        self.node.annotations = annotate(eval, file, &decl.modifiers.annotations, &[class_kind])?;

        for (i, field) in decl.fields.iter().enumerate() {
            let kinds: &[ElementKind] = if field.from_component { &COMPONENT_TARGETS } else { &[ElementKind::Field] };
            let found = annotate(eval, file, &field.modifiers.annotations, kinds)?;
            if let Some(node) = slot(&self.field_slots, i).and_then(|s| self.node.fields.get_mut(s)) {
                node.annotations = found;
            }
        }
        for (i, method) in decl.methods.iter().enumerate() {
            let kind = if method.name == well_known::CONSTRUCTOR { ElementKind::Constructor } else { ElementKind::Method };
            let found = annotate(eval, file, &method.modifiers.annotations, &[kind])?;
            for param in &method.params {
                annotate(eval, file, &param.modifiers.annotations, &[ElementKind::Parameter])?;
            }
            if let Some(node) = slot(&self.method_slots, i).and_then(|s| self.node.methods.get_mut(s)) {
                node.annotations = found;
            }
        }
        Ok(())
    }

    /// Evaluate the `default` clause of annotation element `decl.methods[i]`.
    pub(super) fn annotation_default(
        &mut self,
        eval: &mut Evaluator<'_, '_>,
        file: &SourceFile,
        decl: &ClassDecl,
        i: usize,
    ) -> Result<(), SyntaxError> {
        let Some(range) = decl.methods.get(i).and_then(|m| m.default_value) else {
            return Ok(());
        };
        let Some(index) = slot(&self.method_slots, i) else {
            return Ok(());
        };
        let Some(expected) = self.node.methods.get(index).map(|m| m.ret.clone()) else {
            return Ok(());
        };
        let value = element_value(eval, file, range, &expected)?;
        if let Some(method) = self.node.methods.get_mut(index) {
            method.default_value = value;
        }
        Ok(())
    }
}

/// Check the annotations written on one declaration of kind `kinds[0]` (or any of `kinds`).
///
/// Returns those that belong in the class file: resolved, applicable, and not `SOURCE`-retained.
fn annotate(
    eval: &mut Evaluator<'_, '_>,
    file: &SourceFile,
    uses: &[AnnotationUse],
    kinds: &[ElementKind],
) -> Result<Vec<Annotation>, SyntaxError> {
    let mut kept = Vec::new();
    let mut seen = FxHashSet::default();
    for written in uses {
        let Some((annotation, info)) = resolve_use(eval, file, written)? else {
            continue;
        };
        let lc = eval.context();
        let shown = display_name(&annotation.class);
        if !kinds.iter().any(|&kind| info.applicable(kind)) {
            let what = kinds.first().map_or("this declaration", |k| k.describe());
            lc.error(written.span, codes::ANNOTATION_NOT_APPLICABLE, vec![shown, what.to_string()]);
            continue;
        }
        if !seen.insert(annotation.class.clone()) {
            let repeatable =
                lc.class_info(&annotation.class).is_some_and(|n| n.annotation(well_known::REPEATABLE).is_some());
            if !repeatable {
                lc.error(written.span, codes::ANNOTATION_REPEATED, vec![shown]);
                continue;
            }
        }
        if info.retention != RetentionPolicy::Source {
            kept.push(annotation);
        }
    }
    Ok(kept)
}

/// Resolve `@Name(...)` and evaluate its element values.
fn resolve_use(
    eval: &mut Evaluator<'_, '_>,
    file: &SourceFile,
    written: &AnnotationUse,
) -> Result<Option<(Annotation, Arc<AnnotationInfo>)>, SyntaxError> {
    let lc = eval.context().clone();
    let Some(class) = lc.resolve_class_name(&written.name, written.span) else {
        return Ok(None);
    };
    let shown = display_name(&class);
    let Some(info) = lc.helper(&class).and_then(|h| h.annotation_info()) else {
        lc.error(written.span, codes::ANNOTATION_NOT_ANNOTATION, vec![shown]);
        return Ok(None);
    };
    let mut annotation = Annotation::new(class);
    let mut given = FxHashSet::default();
    for (element, range) in &written.args {
        let name = element.as_deref().unwrap_or("value");
        given.insert(name);
        let Some(expected) = info.elements.get(name) else {
            lc.error(file.span_of(*range), codes::ANNOTATION_UNKNOWN_ELEMENT, vec![shown.clone(), name.to_string()]);
            continue;
        };
        if let Some(value) = element_value(eval, file, *range, expected)? {
            annotation.values.push((name.to_string(), value));
        }
    }
    let mut missing: Vec<&String> =
        info.elements.keys().filter(|name| !given.contains(name.as_str()) && !info.defaults.contains_key(*name)).collect();
    missing.sort();
    for name in missing {
        lc.error(written.span, codes::ANNOTATION_MISSING_ELEMENT, vec![shown.clone(), name.clone()]);
    }
    Ok(Some((annotation, info)))
}

/// Evaluate an element value against the element's declared type.
///
/// Arrays accept a braced list or a single element. `None` means the value was rejected (and reported).
pub(super) fn element_value(
    eval: &mut Evaluator<'_, '_>,
    file: &SourceFile,
    range: TokenRange,
    expected: &Type,
) -> Result<Option<ElementValue>, SyntaxError> {
    let mut c = Cursor::new(file.tokens(), range);
    if expected.is_array() {
        let component = expected.component();
        if !c.is_punct(PunctuationId::LBrace) {
            return Ok(element_value(eval, file, range, &component)?.map(|v| ElementValue::Array(vec![v])));
        }
        let inner = c.skip_group()?;
        if !c.at_end() {
            return Err(c.unexpected("end of element value"));
        }
        let mut items = c.sub(inner);
        let mut values = Vec::new();
        let mut complete = true;
        while !items.at_end() {
            let item = items.skip_until(&[PunctuationId::Comma]);
            if item.is_empty() {
                return Err(items.unexpected("element value"));
            }
            match element_value(eval, file, item, &component)? {
                Some(value) => values.push(value),
                None => complete = false,
            }
            if !items.eat_punct(PunctuationId::Comma) && !items.at_end() {
                return Err(items.unexpected("`,` or `}`"));
            }
        }
        return Ok(complete.then_some(ElementValue::Array(values)));
    }

    let span = file.span_of(range);
    if at_annotation(&c) {
        let nested = parse_annotation_use(&mut c)?;
        if !c.at_end() {
            return Err(c.unexpected("end of element value"));
        }
        let Some((annotation, _)) = resolve_use(eval, file, &nested)? else {
            return Ok(None);
        };
        if expected.class_name() != Some(annotation.class.as_str()) {
            let args = vec![display_name(&annotation.class), expected.to_string()];
            eval.context().error(span, codes::CAST_FORBIDDEN, args);
            return Ok(None);
        }
        return Ok(Some(ElementValue::Annotation(Box::new(annotation))));
    }

    let value = eval.expression_in(range)?;
    if value.poisoned || !eval.check_assign(&value, &IType::Raw(expected.clone()), span) {
        return Ok(None);
    }
    let found = if expected.is_primitive() || expected.class_name() == Some(well_known::STRING) {
        value.constant.as_ref().and_then(|c| convert(c, expected)).map(ElementValue::Const)
    } else {
        value.element
    };
    if found.is_none() {
        eval.context().error(span, codes::EXPR_NOT_CONSTANT, Vec::new());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use crate::class::{Constant, ElementValue};
    use crate::context::GlobalContext;
    use crate::unit::test_support::{codes, compile};
    use lava_syntax::diagnostics::codes;

    const TAG: &str = "import java.lang.annotation.*;
        @Retention(RetentionPolicy.RUNTIME)
        @Target({ElementType.TYPE, ElementType.METHOD})
        @interface Tag { String value(); int weight() default 1; }";

    #[test]
    fn test_source_annotation_type_in_use() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("Tag.java", TAG), ("A.java", "@Tag(\"x\") class A { @Tag(value = \"m\", weight = 2) void m() {} }")]);
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());

        let tag = units[0].node();
        let weight = tag.methods_named("weight").next().unwrap();
        assert_eq!(weight.default_value, Some(ElementValue::Const(Constant::Int(1))));
        assert!(tag.annotation("java/lang/annotation/Retention").is_some());
        let target = tag.annotation("java/lang/annotation/Target").unwrap();
        assert!(matches!(target.value("value"), Some(ElementValue::Array(items)) if items.len() == 2));

        let a = units[1].node();
        assert_eq!(a.annotations.len(), 1);
        assert_eq!(a.annotations[0].value("value"), Some(&ElementValue::Const(Constant::String("x".into()))));
        let m = a.methods_named("m").next().unwrap();
        assert_eq!(m.annotations[0].value("weight"), Some(&ElementValue::Const(Constant::Int(2))));
    }

    #[test]
    fn test_applicability_and_retention() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[("B.java", "class B { @Override int f; @Override public String toString() { return \"\"; } }")],
        );
        assert_eq!(codes(&ctx), [codes::ANNOTATION_NOT_APPLICABLE]);
        assert!(ctx.diagnostics()[0].message().contains("a field"));
        let method = units[0].node().methods_named("toString").next().unwrap();
        assert!(method.annotations.is_empty(), "SOURCE-retained annotations are not recorded");
    }

    #[test]
    fn test_bad_annotation_uses() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[
                ("Tag.java", TAG),
                ("C.java", "@Deprecated @Deprecated class C {}"),
                ("D.java", "@String class D {}"),
                ("E.java", "@Nope class E {}"),
                ("F.java", "@Tag(weight = 3) class F {}"),
                ("G.java", "@Tag(value = \"g\", colour = 1) class G {}"),
            ],
        );
        assert_eq!(
            codes(&ctx),
            [
                codes::ANNOTATION_REPEATED,
                codes::ANNOTATION_NOT_ANNOTATION,
                codes::SYMBOL_UNRESOLVED,
                codes::ANNOTATION_MISSING_ELEMENT,
                codes::ANNOTATION_UNKNOWN_ELEMENT,
            ]
        );
    }

    #[test]
    fn test_element_values_must_be_constant() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[
                ("Tag.java", TAG),
                ("H.java", "@Tag(H.S) class H { static String S = \"a\"; }"),
                ("I.java", "@Tag(I.S) class I { static final String S = \"a\" + 1; }"),
                ("J.java", "@Tag(1) class J {}"),
            ],
        );
        assert_eq!(codes(&ctx), [codes::EXPR_NOT_CONSTANT, codes::CAST_FORBIDDEN]);
    }
}
