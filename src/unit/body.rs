//! Statement checking for method bodies, initializer blocks and field initializers.
//!
//! Every expression is typed through an [`Evaluator`]; the checker adds block-scoped locals, `return` and `throw`
//! rules, and the loop and `try` forms. Reachability is not analyzed, so a non-`void` method that falls off its
//! end goes unreported.
//!
//! Classes declared in code are compiled on the spot, right after the statement that declares them, so the rest
//! of the body can use their members.

use std::sync::Arc;

use lava_core::access::ACC_FINAL;
use lava_core::lang::keywords::KeywordId;
use lava_core::lang::operators::OperatorId;
use lava_core::lang::punctuation::PunctuationId;
use lava_syntax::diagnostics::codes;
use lava_syntax::lexer::TokenKind;
use lava_syntax::{Span, SyntaxError};

use super::cursor::{Cursor, TokenRange};
use super::structure::{at_class_kind, skip_class_decl};
use super::syntax::{parse_dims, parse_modifiers, try_parse_type};
use super::{InlineClass, Nesting, SourceFile, compile_inline};
use crate::class::Constant;
use crate::local::constants::convert;
use crate::local::expr::{Evaluator, Locals, Value};
use crate::local::{CastKind, LocalContext};
use crate::types::{IType, Type, TypeArena, WildcardBound};

const THROWABLE: &str = "java/lang/Throwable";
const ITERABLE: &str = "java/lang/Iterable";

pub(crate) struct BodyChecker<'a, 'g> {
    eval: Evaluator<'a, 'g>,
    file: &'a Arc<SourceFile>,
    /// Declared result; `void` for constructors and initializers.
    ret: IType,
}

impl<'a, 'g> BodyChecker<'a, 'g> {
    pub fn new(lc: LocalContext<'g>, file: &'a Arc<SourceFile>, locals: Locals, ret: IType) -> Self {
        let mut eval = Evaluator::new(lc, file.tokens());
        eval.locals = locals;
        Self { eval, file, ret }
    }

    fn lc(&self) -> &LocalContext<'g> {
        self.eval.context()
    }

    /// Declare a parameter or local, reporting a clash with one still in scope.
    pub fn declare(&mut self, name: &str, ty: IType, constant: Option<Constant>, span: Span) {
        if !self.eval.locals.declare(name, ty, constant) {
            self.lc().error(span, codes::STMT_DUPLICATE_LOCAL, vec![name.to_string()]);
        }
    }

    /// The statements of a `{ ... }` block; `range` is inside the braces.
    pub fn block(&mut self, range: TokenRange) -> Result<(), SyntaxError> {
        self.eval.locals.push();
        let mut c = Cursor::new(self.file.tokens(), range);
        while !c.at_end() {
            self.statement(&mut c)?;
        }
        self.eval.locals.pop();
        Ok(())
    }

    /// A field initializer filling `range`, checked against the field's type.
    pub fn initializer(&mut self, range: TokenRange, target: &IType) -> Result<Value, SyntaxError> {
        let mut c = Cursor::new(self.file.tokens(), range);
        let value = self.variable_init(&mut c, target)?;
        if !c.at_end() {
            return Err(c.unexpected("`;`"));
        }
        self.compile_local_classes();
        Ok(value)
    }

    /// A parenthesized argument list; `range` includes the parentheses.
    pub fn arguments(&mut self, range: TokenRange) -> Result<Vec<Value>, SyntaxError> {
        let mut c = Cursor::new(self.file.tokens(), range);
        let args = self.eval.arguments(&mut c)?;
        self.compile_local_classes();
        Ok(args)
    }

    fn variable_init(&mut self, c: &mut Cursor<'_>, target: &IType) -> Result<Value, SyntaxError> {
        if c.is_punct(PunctuationId::LBrace) {
            if !target.is_array() {
                return Err(c.unexpected("expression"));
            }
            self.eval.array_initializer(c, target)?;
            return Ok(Value::of(target.clone()));
        }
        let start = c.span();
        let value = self.eval.expression(c)?;
        self.eval.check_assign(&value, target, start.to(c.prev_span()));
        Ok(value)
    }

    /// Compile the anonymous classes met since the last call.
    fn compile_local_classes(&mut self) {
        for request in std::mem::take(&mut self.eval.local_classes) {
            let class = InlineClass {
                name: request.name,
                range: request.body,
                nesting: Nesting::Anonymous {
                    parent: request.parent,
                    args: request.args,
                },
                captured: self.eval.locals.capture(),
            };
            compile_inline(self.eval.context(), self.file, class);
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        self.statement_kind(c)?;
        self.compile_local_classes();
        Ok(())
    }

    /// A statement that opens its own scope (a loop or branch body).
    fn nested_statement(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        self.eval.locals.push();
        self.statement(c)?;
        self.eval.locals.pop();
        Ok(())
    }

    fn statement_kind(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if c.eat_punct(PunctuationId::Semicolon) {
            return Ok(());
        }
        if c.is_punct(PunctuationId::LBrace) {
            let inner = c.skip_group()?;
            return self.block(inner);
        }
        if c.is_ident() && c.nth(1).kind.is_punctuation(PunctuationId::Colon) {
            c.bump();
            c.bump();
            return self.statement_kind(c);
        }
        let keyword = match c.kind() {
            TokenKind::Keyword(k) => Some(*k),
            _ => None,
        };
        match keyword {
            Some(KeywordId::If) => {
                c.bump();
                self.eval.locals.push();
                self.condition_group(c)?;
                self.nested_statement(c)?;
                self.eval.locals.pop();
                if c.eat_keyword(KeywordId::Else) {
                    self.nested_statement(c)?;
                }
                Ok(())
            }
            Some(KeywordId::While) => {
                c.bump();
                self.eval.locals.push();
                self.condition_group(c)?;
                self.nested_statement(c)?;
                self.eval.locals.pop();
                Ok(())
            }
            Some(KeywordId::Do) => {
                c.bump();
                self.nested_statement(c)?;
                if !c.eat_keyword(KeywordId::While) {
                    return Err(c.unexpected("`while`"));
                }
                self.condition_group(c)?;
                c.expect_punct(PunctuationId::Semicolon)?;
                Ok(())
            }
            Some(KeywordId::For) => {
                c.bump();
                self.for_statement(c)
            }
            Some(KeywordId::Switch) => {
                c.bump();
                self.switch_statement(c)
            }
            Some(KeywordId::Try) => {
                c.bump();
                self.try_statement(c)
            }
            Some(KeywordId::Return) => {
                let span = c.bump().span;
                self.return_statement(c, span)
            }
            Some(KeywordId::Throw) => {
                c.bump();
                let start = c.span();
                let value = self.eval.expression(c)?;
                if !value.poisoned {
                    let span = start.to(c.prev_span());
                    self.lc().cast_to(&value.ty, &IType::class(THROWABLE), CastKind::IMPLICIT, span);
                }
                c.expect_punct(PunctuationId::Semicolon)?;
                Ok(())
            }
            Some(KeywordId::Break | KeywordId::Continue) => {
                c.bump();
                if c.is_ident() {
                    c.bump();
                }
                c.expect_punct(PunctuationId::Semicolon)?;
                Ok(())
            }
            Some(KeywordId::Assert) => {
                c.bump();
                self.eval.condition(c)?;
                if c.eat_punct(PunctuationId::Colon) {
                    self.eval.expression(c)?;
                }
                c.expect_punct(PunctuationId::Semicolon)?;
                Ok(())
            }
            // `synchronized` is also a modifier, so it must be claimed before the declaration probe
            Some(KeywordId::Synchronized) if c.nth(1).kind.is_punctuation(PunctuationId::LParen) => {
                c.bump();
                let range = c.skip_group()?;
                let lock = self.eval.expression_in(range)?;
                if !lock.poisoned && (lock.ty.is_primitive() || lock.ty.is_null()) {
                    let span = self.file.span_of(range);
                    self.lc().error(span, codes::CAST_FORBIDDEN, vec![lock.ty.to_string(), IType::object().to_string()]);
                }
                if !c.is_punct(PunctuationId::LBrace) {
                    return Err(c.unexpected("`{`"));
                }
                let inner = c.skip_group()?;
                self.block(inner)
            }
            _ if c.kind().is_contextual("yield") && starts_expression(&c.nth(1).kind) => {
                c.bump();
                self.eval.expression(c)?;
                c.expect_punct(PunctuationId::Semicolon)?;
                Ok(())
            }
            _ => self.declaration_or_expression(c),
        }
    }

    /// A local class, a local variable declaration, or an expression statement.
    fn declaration_or_expression(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        let start = c.pos();
        let modifiers = parse_modifiers(c)?;
        if at_class_kind(c) {
            c.reset(start);
            return self.local_class(c);
        }
        if self.declaration(c, modifiers.has(ACC_FINAL))? {
            return c.expect_punct(PunctuationId::Semicolon).map(drop);
        }
        if modifiers.span.is_some() {
            return Err(c.unexpected("declaration"));
        }
        self.eval.expression(c)?;
        c.expect_punct(PunctuationId::Semicolon)?;
        Ok(())
    }

    /// Declarators of a local variable declaration, if one starts at the cursor. Stops before the `;`.
    fn declaration(&mut self, c: &mut Cursor<'_>, is_final: bool) -> Result<bool, SyntaxError> {
        let base = if at_var(c) {
            c.bump();
            None
        } else if looks_like_declaration(c) {
            Some(self.eval.parse_type(c)?)
        } else {
            return Ok(false);
        };
        loop {
            let (name, span) = c.expect_ident()?;
            let extra = parse_dims(c);
            let declared = base.as_ref().map(|ty| ty.with_dims(ty.dims() + extra));
            let mut constant = None;
            let ty = if c.eat_op(OperatorId::Assign) {
                match declared {
                    Some(ty) => {
                        let value = self.variable_init(c, &ty)?;
                        if is_final {
                            constant = folded(&value, &ty);
                        }
                        ty
                    }
                    None => {
                        let value = self.eval.expression(c)?;
                        if is_final {
                            constant = value.constant.clone();
                        }
                        if value.ty.is_null() { IType::object() } else { value.ty }
                    }
                }
            } else {
                match declared {
                    Some(ty) => ty,
                    None => return Err(c.unexpected("`=`")),
                }
            };
            self.declare(&name, ty, constant, span);
            if !c.eat_punct(PunctuationId::Comma) {
                return Ok(true);
            }
        }
    }

    fn local_class(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        let start = c.pos();
        let simple = skip_class_decl(c)?;
        let range = TokenRange::new(start, c.pos());
        let name = self.lc().scope().declare_local_class(&simple);
        let class = InlineClass {
            name,
            range,
            nesting: Nesting::Local,
            captured: self.eval.locals.capture(),
        };
        compile_inline(self.eval.context(), self.file, class);
        Ok(())
    }

    /// `( condition )`
    fn condition_group(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if !c.is_punct(PunctuationId::LParen) {
            return Err(c.unexpected("`(`"));
        }
        let range = c.skip_group()?;
        let mut sub = c.sub(range);
        self.eval.condition(&mut sub)?;
        if !sub.at_end() {
            return Err(sub.unexpected("`)`"));
        }
        Ok(())
    }

    fn return_statement(&mut self, c: &mut Cursor<'_>, span: Span) -> Result<(), SyntaxError> {
        if c.eat_punct(PunctuationId::Semicolon) {
            if !self.ret.is_void() {
                self.lc().error(span, codes::STMT_MISSING_RETURN_VALUE, Vec::new());
            }
            return Ok(());
        }
        let start = c.span();
        let value = self.eval.expression(c)?;
        let span = start.to(c.prev_span());
        if self.ret.is_void() {
            if !value.poisoned {
                self.lc().error(span, codes::STMT_UNEXPECTED_RETURN_VALUE, Vec::new());
            }
        } else {
            self.eval.check_assign(&value, &self.ret, span);
        }
        c.expect_punct(PunctuationId::Semicolon)?;
        Ok(())
    }

    fn for_statement(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if !c.is_punct(PunctuationId::LParen) {
            return Err(c.unexpected("`(`"));
        }
        let range = c.skip_group()?;
        let mut header = c.sub(range);
        self.eval.locals.push();
        // a classic header always has a `;` at depth zero
        header.skip_until(&[PunctuationId::Semicolon]);
        let classic = header.is_punct(PunctuationId::Semicolon);
        header.reset(range.start);
        if classic {
            self.for_header(&mut header)?;
        } else {
            self.for_each_header(&mut header)?;
        }
        self.nested_statement(c)?;
        self.eval.locals.pop();
        Ok(())
    }

    /// `init; condition; update`
    fn for_header(&mut self, h: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if !h.is_punct(PunctuationId::Semicolon) {
            let modifiers = parse_modifiers(h)?;
            if !self.declaration(h, modifiers.has(ACC_FINAL))? {
                self.expression_list(h, PunctuationId::Semicolon)?;
            }
        }
        h.expect_punct(PunctuationId::Semicolon)?;
        if !h.is_punct(PunctuationId::Semicolon) {
            self.eval.condition(h)?;
        }
        h.expect_punct(PunctuationId::Semicolon)?;
        self.expression_list(h, PunctuationId::RParen)?;
        if !h.at_end() {
            return Err(h.unexpected("`)`"));
        }
        Ok(())
    }

    fn expression_list(&mut self, h: &mut Cursor<'_>, end: PunctuationId) -> Result<(), SyntaxError> {
        while !h.at_end() && !h.is_punct(end) {
            self.eval.expression(h)?;
            if !h.eat_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// `Type name : iterable`
    fn for_each_header(&mut self, h: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        parse_modifiers(h)?;
        let declared = if at_var(h) {
            h.bump();
            None
        } else {
            Some(self.eval.parse_type(h)?)
        };
        let (name, span) = h.expect_ident()?;
        h.expect_punct(PunctuationId::Colon)?;
        let start = h.span();
        let source = self.eval.expression(h)?;
        let source_span = start.to(h.prev_span());
        if !h.at_end() {
            return Err(h.unexpected("`)`"));
        }
        let element = if source.poisoned { None } else { self.element_type(&source.ty, source_span) };
        let ty = match (declared, element) {
            (Some(declared), Some(element)) => {
                self.lc().cast_to(&element, &declared, CastKind::IMPLICIT, span);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(element)) => element,
            (None, None) => IType::object(),
        };
        self.declare(&name, ty, None, span);
        Ok(())
    }

    /// Element type of an array or `Iterable`; reports anything else.
    fn element_type(&self, source: &IType, span: Span) -> Option<IType> {
        if source.is_array() {
            return Some(source.component());
        }
        let lc = self.lc();
        match lc.view_as(source, ITERABLE) {
            Some(view) => Some(view.args().first().map_or_else(IType::object, upper_bound)),
            None => {
                lc.cast_to(source, &IType::class(ITERABLE), CastKind::IMPLICIT, span);
                None
            }
        }
    }

    fn switch_statement(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if !c.is_punct(PunctuationId::LParen) {
            return Err(c.unexpected("`(`"));
        }
        let selector_range = c.skip_group()?;
        let selector = self.eval.expression_in(selector_range)?;
        if !c.is_punct(PunctuationId::LBrace) {
            return Err(c.unexpected("`{`"));
        }
        let inner = c.skip_group()?;
        let mut b = c.sub(inner);
        let enum_selector =
            selector.ty.class_name().and_then(|n| self.lc().class_info(&n)).is_some_and(|n| n.is_enum());
        self.eval.locals.push();
        while !b.at_end() {
            if b.eat_keyword(KeywordId::Case) {
                let labels = b.skip_until(&[PunctuationId::Colon, PunctuationId::Arrow]);
                if !enum_selector && !selector.poisoned {
                    self.case_labels(labels, &selector.ty)?;
                }
            } else if !b.eat_keyword(KeywordId::Default) {
                return Err(b.unexpected("`case` or `default`"));
            }
            if b.eat_punct(PunctuationId::Arrow) {
                self.nested_statement(&mut b)?;
            } else {
                b.expect_punct(PunctuationId::Colon)?;
                while !b.at_end() && !at_switch_label(&b) {
                    self.statement(&mut b)?;
                }
            }
        }
        self.eval.locals.pop();
        Ok(())
    }

    /// `case` labels: constants checked against the selector, patterns bound in the switch scope.
    fn case_labels(&mut self, range: TokenRange, selector: &IType) -> Result<(), SyntaxError> {
        let mut l = Cursor::new(self.file.tokens(), range);
        while !l.at_end() {
            if l.eat_keyword(KeywordId::Default) {
                // `case null, default`
            } else if looks_like_declaration(&l) {
                let ty = self.eval.parse_type(&mut l)?;
                let (name, _) = l.expect_ident()?;
                self.eval.locals.bind(&name, ty, None);
                // guard
                if l.eat_contextual("when") {
                    self.eval.condition(&mut l)?;
                }
            } else {
                let start = l.span();
                let value = self.eval.expression(&mut l)?;
                if !value.ty.is_null() {
                    self.eval.check_assign(&value, selector, start.to(l.prev_span()));
                }
            }
            if !l.eat_punct(PunctuationId::Comma) && !l.at_end() {
                return Err(l.unexpected("`,`"));
            }
        }
        Ok(())
    }

    fn try_statement(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        self.eval.locals.push();
        let has_resources = c.is_punct(PunctuationId::LParen);
        if has_resources {
            let range = c.skip_group()?;
            let mut r = c.sub(range);
            while !r.at_end() {
                let modifiers = parse_modifiers(&mut r)?;
                if !self.declaration(&mut r, modifiers.has(ACC_FINAL))? {
                    self.eval.expression(&mut r)?;
                }
                if !r.eat_punct(PunctuationId::Semicolon) && !r.at_end() {
                    return Err(r.unexpected("`;`"));
                }
            }
        }
        self.braced_block(c)?;
        self.eval.locals.pop();

        let mut handlers = 0;
        while c.eat_keyword(KeywordId::Catch) {
            handlers += 1;
            if !c.is_punct(PunctuationId::LParen) {
                return Err(c.unexpected("`(`"));
            }
            let range = c.skip_group()?;
            let mut h = c.sub(range);
            parse_modifiers(&mut h)?;
            let mut caught: Option<IType> = None;
            loop {
                let span = h.span();
                let ty = self.eval.parse_type(&mut h)?;
                self.lc().cast_to(&ty, &IType::class(THROWABLE), CastKind::IMPLICIT, span);
                caught = Some(match caught {
                    Some(prev) => self.lc().common_parent(&prev, &ty),
                    None => ty,
                });
                if !h.eat_op(OperatorId::Pipe) {
                    break;
                }
            }
            let (name, span) = h.expect_ident()?;
            if !h.at_end() {
                return Err(h.unexpected("`)`"));
            }
            self.eval.locals.push();
            self.declare(&name, caught.unwrap_or_else(|| IType::class(THROWABLE)), None, span);
            self.braced_block(c)?;
            self.eval.locals.pop();
        }
        if c.eat_keyword(KeywordId::Finally) {
            handlers += 1;
            self.braced_block(c)?;
        }
        if handlers == 0 && !has_resources {
            return Err(c.unexpected("`catch` or `finally`"));
        }
        Ok(())
    }

    fn braced_block(&mut self, c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
        if !c.is_punct(PunctuationId::LBrace) {
            return Err(c.unexpected("`{`"));
        }
        let inner = c.skip_group()?;
        self.block(inner)
    }
}

/// Constant value of a `final` local, converted to its declared type.
fn folded(value: &Value, ty: &IType) -> Option<Constant> {
    let erased: Type = ty.erasure();
    if erased.is_array() || !(erased.is_primitive() || erased == Type::string()) {
        return None;
    }
    value.constant.as_ref().and_then(|k| convert(k, &erased))
}

/// Upper bound of a type argument (`? extends T` gives `T`).
fn upper_bound(arg: &IType) -> IType {
    match arg {
        IType::Wildcard {
            bound: WildcardBound::Extends,
            ty: Some(ty),
        } => (**ty).clone(),
        IType::Wildcard { .. } => IType::object(),
        other => other.clone(),
    }
}

/// `var name` (with `var` as a type name rather than a variable).
fn at_var(c: &Cursor<'_>) -> bool {
    c.kind().is_contextual("var") && c.nth(1).kind.ident().is_some()
}

/// A type followed by a name: `List<String> xs`, `int[] a`, `Map.Entry e`.
fn looks_like_declaration(c: &Cursor<'_>) -> bool {
    let mut probe = c.clone();
    let mut scratch = TypeArena::new();
    try_parse_type(&mut probe, &mut scratch).is_some() && probe.is_ident()
}

fn at_switch_label(c: &Cursor<'_>) -> bool {
    c.is_keyword(KeywordId::Case)
        || (c.is_keyword(KeywordId::Default)
            && (c.nth(1).kind.is_punctuation(PunctuationId::Colon)
                || c.nth(1).kind.is_punctuation(PunctuationId::Arrow)))
}

/// Whether `yield` is followed by an operand rather than used as a variable name.
fn starts_expression(next: &TokenKind) -> bool {
    let continues_name = matches!(
        next,
        TokenKind::Operator(
            OperatorId::Assign
                | OperatorId::PlusAssign
                | OperatorId::MinusAssign
                | OperatorId::StarAssign
                | OperatorId::SlashAssign
                | OperatorId::PlusPlus
                | OperatorId::MinusMinus
        ) | TokenKind::Punctuation(PunctuationId::Dot | PunctuationId::LBracket | PunctuationId::Semicolon)
    );
    !continues_name
}

#[cfg(test)]
mod tests {
    use crate::context::GlobalContext;
    use crate::unit::test_support::{codes, compile};
    use lava_syntax::diagnostics::codes;

    fn check(body: &str) -> Vec<&'static str> {
        let ctx = GlobalContext::new();
        let source = format!("package p; import java.util.*; class A {{ {body} }}");
        compile(&ctx, &[("A.java", &source)]);
        codes(&ctx)
    }

    #[test]
    fn test_loops_and_locals() {
        let errs = check(
            "int sum(int n, List<String> names) {
                int total = 0;
                for (int i = 0, j = n; i < j; i++) { total += i; }
                for (int x : new int[] {1, 2}) { total += x; }
                for (String name : names) { total += name.length(); }
                for (var name : names) { name.isEmpty(); }
                while (total > 100) { total /= 2; }
                do { total--; } while (total > 50);
                outer: for (;;) { break outer; }
                final int k = 3;
                return total + k;
            }",
        );
        assert!(errs.is_empty(), "{errs:?}");
    }

    #[test]
    fn test_duplicate_locals() {
        let errs = check(
            "void f(int n) {
                int n = 1;
                { int k; }
                int k = 2;
                String s = \"a\", s = \"b\";
                for (int i = 0; i < 1; i++) {}
                for (int i = 0; i < 1; i++) {}
            }",
        );
        assert_eq!(errs, [codes::STMT_DUPLICATE_LOCAL, codes::STMT_DUPLICATE_LOCAL]);
    }

    #[test]
    fn test_returns() {
        let errs = check("void f() { return 1; } int g() { return; } int h() { return \"x\"; } long i() { return 1; }");
        assert_eq!(
            errs,
            [codes::STMT_UNEXPECTED_RETURN_VALUE, codes::STMT_MISSING_RETURN_VALUE, codes::CAST_FORBIDDEN]
        );
    }

    #[test]
    fn test_conditions_throw_and_iteration_sources() {
        let errs = check("void f(int n) { if (n) {} throw \"x\"; } void g(Object o) { for (Object x : o) {} }");
        assert_eq!(errs, [codes::CAST_FORBIDDEN, codes::CAST_FORBIDDEN, codes::CAST_FORBIDDEN]);
    }

    #[test]
    fn test_switch_try_and_patterns() {
        let errs = check(
            "enum Color { RED, GREEN }
            int f(Object o, Color c, int n) {
                switch (c) { case RED -> n++; case GREEN -> { n--; } }
                switch (n) { case 1: case 2: n = 0; break; default: n = 1; }
                switch (o) { case String s -> s.length(); default -> {} }
                try { n = 2; } catch (IllegalStateException | IllegalArgumentException e) { throw e; } finally { n = 3; }
                if (o instanceof String t) { t.length(); }
                synchronized (o) { n++; }
                assert n > 0 : \"positive\";
                return n;
            }",
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(check("void f(int n) { switch (n) { case \"a\": break; } }"), [codes::CAST_FORBIDDEN]);
    }

    #[test]
    fn test_local_and_anonymous_classes() {
        let ctx = GlobalContext::new();
        compile(
            &ctx,
            &[(
                "A.java",
                "package p; class A {
                    int f(final int base) {
                        class Counter { int next() { return base + 1; } }
                        Counter c = new Counter();
                        Runnable r = new Runnable() { public void run() { c.next(); } };
                        return c.next();
                    }
                }",
            )],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let counter = ctx.get_class_info("p/A$1Counter").unwrap();
        assert!(counter.methods.iter().any(|m| m.name == "next"));
        let anonymous = ctx.get_class_info("p/A$2").unwrap();
        assert_eq!(anonymous.interfaces, ["java/lang/Runnable"]);
    }

    #[test]
    fn test_syntax_error_in_body_fails_the_unit() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("A.java", "class A { void f() { if 1 { } } }")]);
        assert!(units[0].is_failed());
        assert_eq!(codes(&ctx), [codes::SYNTAX]);
    }
}
