//! Expression typing.
//!
//! An [`Evaluator`] walks an expression's tokens once, computing the static type of every subexpression, folding
//! constants, and reporting what does not type-check. Operator precedence is handled by precedence climbing over
//! [`operators::precedence`]; `>` tokens are glued back into shifts when they touch.
//!
//! Once an error has been reported for a subexpression its value is *poisoned*: everything built on top of it is
//! silently accepted, so one mistake produces one diagnostic.
//!
//! Lambda bodies, method references and `switch` expressions are skipped. Lambdas and method references type as
//! `null` (they convert to any reference type); switch expressions are opaque.

use lava_core::lang::keywords::KeywordId;
use lava_core::lang::operators::{self, OperatorId};
use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::punctuation::PunctuationId;
use lava_core::lang::well_known;
use lava_syntax::diagnostics::codes;
use lava_syntax::lexer::{Token, TokenKind};
use lava_syntax::{Span, SyntaxError};

use super::constants::{FoldError, convert, fits, fold_binary, fold_unary};
use super::dotget::FieldError;
use super::operators::OverrideOp;
use super::{CastKind, ClassScope, FieldAccess, LocalContext};
use crate::class::{Constant, ElementValue};
use crate::resolve::MethodRef;
use crate::types::{IType, TypeArena, TypeRef, WildcardBound, display_name};
use crate::unit::cursor::{Cursor, TokenRange};
use crate::unit::imports::resolve_qualified;
use crate::unit::syntax::{parse_dims, parse_type, primitive_keyword, try_parse_type};

/// Typed result of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub ty: IType,
    pub constant: Option<Constant>,
    /// Enum constant or class literal this expression denotes, for annotation element values.
    pub element: Option<ElementValue>,
    /// The expression denotes a variable (local, field or array element).
    pub assignable: bool,
    /// An error was already reported somewhere inside this expression.
    pub poisoned: bool,
}

impl Value {
    pub fn of(ty: IType) -> Self {
        Self {
            ty,
            constant: None,
            element: None,
            assignable: false,
            poisoned: false,
        }
    }

    pub fn constant(c: Constant) -> Self {
        Self {
            constant: Some(c.clone()),
            ..Self::of(IType::Raw(c.ty()))
        }
    }

    /// Value of an expression that was skipped or already failed.
    pub fn opaque() -> Self {
        Self {
            poisoned: true,
            ..Self::of(IType::null())
        }
    }

    fn variable(ty: IType, constant: Option<Constant>) -> Self {
        Self {
            constant,
            assignable: true,
            ..Self::of(ty)
        }
    }

    /// Return `true` if this is a `boolean` or `Boolean` value.
    pub fn is_boolean(&self) -> bool {
        unboxed(&self.ty) == Some(PrimitiveKind::Boolean)
    }
}

/// What a name or member selection denotes before it is used.
#[derive(Debug, Clone)]
enum Operand {
    Value(Value),
    Class(String),
    /// A package prefix (`java.util`) waiting for its class.
    Package(String),
}

/// A local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub name: String,
    pub ty: IType,
    /// Value of a `final` local initialized with a constant.
    pub constant: Option<Constant>,
}

/// Block-structured local variables of one method body.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    frames: Vec<Vec<Local>>,
    /// Frames below this index belong to an enclosing body; their names may be redeclared.
    floor: usize,
}

impl Locals {
    pub fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
            floor: 0,
        }
    }

    /// The variables visible here, as seen from the body of a class declared at this point.
    pub fn capture(&self) -> Self {
        let visible = self.frames.iter().flatten().cloned().collect();
        Self {
            frames: vec![visible, Vec::new()],
            floor: 1,
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > self.floor + 1 {
            self.frames.pop();
        }
    }

    /// Declare a local. Returns `false` if a local with the same name is already visible.
    pub fn declare(&mut self, name: &str, ty: IType, constant: Option<Constant>) -> bool {
        if self.frames.iter().skip(self.floor).flatten().any(|l| l.name == name) {
            return false;
        }
        self.bind(name, ty, constant);
        true
    }

    /// Declare without the duplicate check (pattern bindings).
    pub fn bind(&mut self, name: &str, ty: IType, constant: Option<Constant>) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Local {
                name: name.to_string(),
                ty,
                constant,
            });
        }
    }

    pub fn get(&self, name: &str) -> Option<&Local> {
        self.frames.iter().rev().flat_map(|f| f.iter().rev()).find(|l| l.name == name)
    }
}

/// An anonymous class body met inside an expression; compiled by the caller as its own class.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalClassRequest {
    /// Internal name (`p/Outer$1`).
    pub name: String,
    /// Class extended or interface implemented.
    pub parent: IType,
    pub body: TokenRange,
    pub span: Span,
    /// Argument types passed to the parent constructor.
    pub args: Vec<IType>,
}

/// Types expressions of one body.
pub struct Evaluator<'a, 'g> {
    lc: LocalContext<'g>,
    tokens: &'a [Token],
    arena: TypeArena,
    pub locals: Locals,
    pub local_classes: Vec<LocalClassRequest>,
    this_type: IType,
}

impl<'a, 'g> Evaluator<'a, 'g> {
    pub fn new(lc: LocalContext<'g>, tokens: &'a [Token]) -> Self {
        let this_type = scope_type(lc.scope());
        Self {
            lc,
            tokens,
            arena: TypeArena::new(),
            locals: Locals::new(),
            local_classes: Vec::new(),
            this_type,
        }
    }

    pub fn context(&self) -> &LocalContext<'g> {
        &self.lc
    }

    /// Type of `this` in the current class.
    pub fn this_type(&self) -> &IType {
        &self.this_type
    }

    /// Parse and resolve a written type at the cursor.
    pub fn parse_type(&mut self, c: &mut Cursor<'_>) -> Result<IType, SyntaxError> {
        let ty = parse_type(c, &mut self.arena)?;
        Ok(self.resolve(ty))
    }

    /// Like [`Evaluator::parse_type`], leaving the cursor alone when no type starts here.
    pub fn try_parse_type(&mut self, c: &mut Cursor<'_>) -> Option<IType> {
        try_parse_type(c, &mut self.arena).map(|ty| self.resolve(ty))
    }

    fn resolve(&self, ty: TypeRef) -> IType {
        self.lc.resolve_type(&self.arena.to_itype(ty), self.arena.span(ty))
    }

    /// Type one expression at the cursor.
    pub fn expression(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        self.assignment(c)
    }

    /// Type an expression that must fill `range` exactly.
    pub fn expression_in(&mut self, range: TokenRange) -> Result<Value, SyntaxError> {
        let mut sub = Cursor::new(self.tokens, range);
        let value = self.expression(&mut sub)?;
        if !sub.at_end() {
            return Err(sub.unexpected("end of expression"));
        }
        Ok(value)
    }

    /// Type a condition; it must be `boolean`.
    pub fn condition(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let span = c.span();
        let value = self.expression(c)?;
        self.expect_boolean(&value, span.to(c.prev_span()));
        Ok(value)
    }

    /// Check an assignment conversion of `value` to `target`, reporting failure.
    ///
    /// An `int` constant that fits is also assignable to `byte`, `short` and `char` (and their wrappers).
    pub fn check_assign(&self, value: &Value, target: &IType, span: Span) -> bool {
        if value.poisoned {
            return true;
        }
        if value.ty.is_void() {
            self.lc.error(span, codes::EXPR_VOID_VALUE, Vec::new());
            return false;
        }
        if let (Some(constant), Some(kind)) = (&value.constant, unboxed(target)) {
            let narrow = matches!(kind, PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char);
            let int_like = matches!(
                value.ty.primitive_kind(),
                Some(PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Byte)
            );
            if narrow && int_like && fits(constant, kind) {
                return true;
            }
        }
        self.lc.cast_to(&value.ty, target, CastKind::IMPLICIT, span)
    }

    fn expect_boolean(&self, value: &Value, span: Span) {
        if !value.poisoned && !value.is_boolean() {
            self.lc.cast_to(&value.ty, &IType::primitive(PrimitiveKind::Boolean), CastKind::IMPLICIT, span);
        }
    }

    // ========================================================================
    // Assignment, conditional, binary
    // ========================================================================

    fn assignment(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        if let Some(lambda) = self.try_lambda(c)? {
            return Ok(lambda);
        }
        let start = c.span();
        let lhs = self.ternary(c)?;
        let Some((op, width)) = assign_op(c) else {
            return Ok(lhs);
        };
        for _ in 0..width {
            c.bump();
        }
        let rhs = self.assignment(c)?;
        let span = start.to(c.prev_span());
        if lhs.poisoned || rhs.poisoned {
            return Ok(Value::of(lhs.ty));
        }
        if !lhs.assignable {
            let spelled = op.map_or("=", operators::as_str);
            self.lc.error(span, codes::EXPR_BAD_OPERAND, vec![spelled.to_string(), lhs.ty.to_string(), rhs.ty.to_string()]);
            return Ok(Value::opaque());
        }
        match op {
            None => {
                self.check_assign(&rhs, &lhs.ty, span);
            }
            // `s += x` on a String is concatenation
            Some(OperatorId::Plus) if is_string(&lhs.ty) => {}
            Some(bin) => {
                let result = self.binary_value(bin, Value::of(lhs.ty.clone()), rhs, span);
                if !result.poisoned {
                    // compound assignment narrows implicitly
                    self.lc.cast_to(&result.ty, &lhs.ty, CastKind::EXPLICIT, span);
                }
            }
        }
        Ok(Value::of(lhs.ty))
    }

    /// Skip a lambda (`x -> ...`, `(a, b) -> ...`) at the cursor.
    fn try_lambda(&mut self, c: &mut Cursor<'_>) -> Result<Option<Value>, SyntaxError> {
        let is_lambda = if c.is_ident() {
            c.nth(1).kind.is_punctuation(PunctuationId::Arrow)
        } else if c.is_punct(PunctuationId::LParen) {
            let start = c.pos();
            let found = c.skip_group().is_ok() && c.is_punct(PunctuationId::Arrow);
            c.reset(start);
            found
        } else {
            false
        };
        if !is_lambda {
            return Ok(None);
        }
        if c.is_ident() {
            c.bump();
        } else {
            c.skip_group()?;
        }
        c.expect_punct(PunctuationId::Arrow)?;
        if c.is_punct(PunctuationId::LBrace) {
            c.skip_group()?;
        } else {
            c.skip_until(&[PunctuationId::Comma, PunctuationId::Semicolon]);
        }
        Ok(Some(Value::of(IType::null())))
    }

    fn ternary(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let start = c.span();
        let cond = self.binary(c, 1)?;
        if !c.eat_punct(PunctuationId::Question) {
            return Ok(cond);
        }
        self.expect_boolean(&cond, start.to(c.prev_span()));
        let yes = self.assignment(c)?;
        c.expect_punct(PunctuationId::Colon)?;
        let no = match self.try_lambda(c)? {
            Some(lambda) => lambda,
            None => self.ternary(c)?,
        };
        let ty = self.conditional_type(&yes, &no);
        let constant = match (&cond.constant, &yes.constant, &no.constant) {
            (Some(Constant::Boolean(pick)), Some(a), Some(b)) => {
                convert(if *pick { a } else { b }, &ty.erasure())
            }
            _ => None,
        };
        Ok(Value {
            constant,
            poisoned: cond.poisoned && yes.poisoned && no.poisoned,
            ..Value::of(ty)
        })
    }

    fn conditional_type(&self, a: &Value, b: &Value) -> IType {
        if a.poisoned {
            return b.ty.clone();
        }
        if b.poisoned || a.ty == b.ty {
            return a.ty.clone();
        }
        match (unboxed(&a.ty), unboxed(&b.ty)) {
            (Some(PrimitiveKind::Boolean), Some(PrimitiveKind::Boolean)) => {
                return IType::primitive(PrimitiveKind::Boolean);
            }
            (Some(x), Some(y)) if x.is_numeric() && y.is_numeric() => {
                if let Some(kind) = PrimitiveKind::promote(x, y) {
                    return IType::primitive(kind);
                }
            }
            _ => {}
        }
        self.lc.common_parent(&a.ty, &b.ty)
    }

    fn binary(&mut self, c: &mut Cursor<'_>, min: u8) -> Result<Value, SyntaxError> {
        let start = c.span();
        let mut left = self.unary(c)?;
        loop {
            if c.is_keyword(KeywordId::Instanceof) {
                if operators::precedence(OperatorId::Lt) < min {
                    break;
                }
                c.bump();
                left = self.instance_of(left, c, start)?;
                continue;
            }
            let Some((op, width)) = binary_op(c) else {
                break;
            };
            let prec = operators::precedence(op);
            if prec < min {
                break;
            }
            for _ in 0..width {
                c.bump();
            }
            let right = self.binary(c, prec + 1)?;
            left = self.binary_value(op, left, right, start.to(c.prev_span()));
        }
        Ok(left)
    }

    fn instance_of(&mut self, left: Value, c: &mut Cursor<'_>, start: Span) -> Result<Value, SyntaxError> {
        c.eat_keyword(KeywordId::Final);
        let target = self.parse_type(c)?;
        if c.is_ident() {
            let (name, _) = c.expect_ident()?;
            self.locals.bind(&name, target.clone(), None);
        } else if c.is_punct(PunctuationId::LParen) {
            // record pattern; components are not bound
            c.skip_group()?;
        }
        let span = start.to(c.prev_span());
        if !left.poisoned {
            if left.ty.is_primitive() {
                self.lc.error(span, codes::EXPR_BAD_OPERAND, vec!["instanceof".into(), left.ty.to_string(), target.to_string()]);
            } else if self.lc.classify_cast(&left.ty, &target) < CastKind::Downcast {
                self.lc.error(span, codes::CAST_FORBIDDEN, vec![left.ty.to_string(), target.to_string()]);
            }
        }
        Ok(Value::of(IType::primitive(PrimitiveKind::Boolean)))
    }

    fn binary_value(&self, op: OperatorId, left: Value, right: Value, span: Span) -> Value {
        if left.poisoned || right.poisoned {
            return Value::opaque();
        }
        if left.ty.is_void() || right.ty.is_void() {
            self.lc.error(span, codes::EXPR_VOID_VALUE, Vec::new());
            return Value::opaque();
        }
        let ty = match builtin_binary(&self.lc, op, &left.ty, &right.ty) {
            Some(ty) => ty,
            None => {
                return match self.lc.operator_override(OverrideOp::Binary(op), &left.ty, Some(&right.ty)) {
                    Some(m) => Value::of(m.ret),
                    None => {
                        let args = vec![operators::as_str(op).to_string(), left.ty.to_string(), right.ty.to_string()];
                        self.lc.error(span, codes::EXPR_BAD_OPERAND, args);
                        Value::opaque()
                    }
                };
            }
        };
        let constant = match (&left.constant, &right.constant) {
            (Some(a), Some(b)) => match fold_binary(op, a, b) {
                Ok(folded) => folded,
                Err(FoldError::DivByZero) => {
                    self.lc.warn(span, codes::EXPR_DIV_BY_ZERO, Vec::new());
                    None
                }
            },
            _ => None,
        };
        Value { constant, ..Value::of(ty) }
    }

    // ========================================================================
    // Unary and casts
    // ========================================================================

    fn unary(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let start = c.span();
        let op = match c.kind() {
            TokenKind::Operator(
                op @ (OperatorId::Plus
                | OperatorId::Minus
                | OperatorId::Tilde
                | OperatorId::Not
                | OperatorId::PlusPlus
                | OperatorId::MinusMinus),
            ) => Some(*op),
            _ => None,
        };
        if let Some(op) = op {
            c.bump();
            // `-2147483648` is the one place the literal is in range
            if op == OperatorId::Minus && matches!(c.kind(), TokenKind::Int(v) if *v == 1 << 31) {
                c.bump();
                return Ok(Value::constant(Constant::Int(i32::MIN)));
            }
            let operand = self.unary(c)?;
            return Ok(self.unary_value(op, operand, start.to(c.prev_span())));
        }
        if c.is_punct(PunctuationId::LParen) {
            if let Some(target) = self.try_cast(c) {
                let operand = self.unary(c)?;
                return Ok(self.cast_value(target, operand, start.to(c.prev_span())));
            }
        }
        self.postfix(c)
    }

    fn unary_value(&self, op: OperatorId, operand: Value, span: Span) -> Value {
        if operand.poisoned {
            return Value::opaque();
        }
        let kind = unboxed(&operand.ty);
        let ty = match op {
            OperatorId::Not => kind.filter(|k| *k == PrimitiveKind::Boolean),
            OperatorId::Plus | OperatorId::Minus => kind.filter(|k| k.is_numeric()).map(unary_promote),
            OperatorId::Tilde => kind.filter(|k| k.is_integral()).map(unary_promote),
            _ => {
                if !operand.assignable || !kind.is_some_and(PrimitiveKind::is_numeric) {
                    let args = vec![operators::as_str(op).to_string(), operand.ty.to_string(), "(none)".into()];
                    self.lc.error(span, codes::EXPR_BAD_OPERAND, args);
                    return Value::opaque();
                }
                return Value::of(operand.ty);
            }
        };
        match ty {
            Some(kind) => Value {
                constant: operand.constant.as_ref().and_then(|c| fold_unary(op, c)),
                ..Value::of(IType::primitive(kind))
            },
            None if op == OperatorId::Not => match self.lc.operator_override(OverrideOp::Not, &operand.ty, None) {
                Some(m) => Value::of(m.ret),
                None => self.bad_unary(op, &operand, span),
            },
            None => self.bad_unary(op, &operand, span),
        }
    }

    fn bad_unary(&self, op: OperatorId, operand: &Value, span: Span) -> Value {
        let args = vec![operators::as_str(op).to_string(), operand.ty.to_string(), "(none)".into()];
        self.lc.error(span, codes::EXPR_BAD_OPERAND, args);
        Value::opaque()
    }

    /// `(Type)` followed by something that can only be a cast operand.
    fn try_cast(&mut self, c: &mut Cursor<'_>) -> Option<IType> {
        let start = c.pos();
        c.bump();
        let primitive = primitive_keyword(c.kind()).is_some();
        let Some(ty) = try_parse_type(c, &mut self.arena) else {
            c.reset(start);
            return None;
        };
        if !c.eat_punct(PunctuationId::RParen) {
            c.reset(start);
            return None;
        }
        let operand_follows = match c.kind() {
            TokenKind::Ident(_)
            | TokenKind::Int(_)
            | TokenKind::Long(_)
            | TokenKind::Float(_)
            | TokenKind::Double(_)
            | TokenKind::Char(_)
            | TokenKind::String(_) => true,
            TokenKind::Punctuation(PunctuationId::LParen) => true,
            TokenKind::Operator(OperatorId::Not | OperatorId::Tilde) => true,
            TokenKind::Operator(OperatorId::Plus | OperatorId::Minus) => primitive,
            TokenKind::Keyword(k) => matches!(
                k,
                KeywordId::This | KeywordId::Super | KeywordId::New | KeywordId::True | KeywordId::False | KeywordId::Null
            ) || primitive_keyword(c.kind()).is_some(),
            _ => false,
        };
        if !operand_follows {
            c.reset(start);
            return None;
        }
        Some(self.resolve(ty))
    }

    fn cast_value(&self, target: IType, operand: Value, span: Span) -> Value {
        if operand.poisoned {
            return Value::of(target);
        }
        let constant = match &operand.constant {
            Some(constant) if self.lc.classify_cast(&operand.ty, &target) >= CastKind::EXPLICIT => {
                convert(constant, &target.erasure())
            }
            _ => None,
        };
        if constant.is_none() && !self.lc.cast_to(&operand.ty, &target, CastKind::EXPLICIT, span) {
            return Value::opaque();
        }
        Value { constant, ..Value::of(target) }
    }

    // ========================================================================
    // Postfix and member selection
    // ========================================================================

    fn postfix(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let start = c.span();
        let mut operand = self.primary(c)?;
        loop {
            if c.is_punct(PunctuationId::Dot) {
                c.bump();
                operand = self.select(operand, c, start)?;
            } else if c.is_punct(PunctuationId::LBracket) {
                if let Operand::Class(class) = &operand {
                    // `String[].class`
                    let ty = IType::class(class.clone()).with_dims(parse_dims(c));
                    c.expect_punct(PunctuationId::Dot)?;
                    if !c.eat_keyword(KeywordId::Class) {
                        return Err(c.unexpected("`class`"));
                    }
                    operand = Operand::Value(class_literal(&ty));
                    continue;
                }
                let array = self.to_value(operand, start.to(c.prev_span()));
                let range = c.skip_group()?;
                let index = self.expression_in(range)?;
                operand = Operand::Value(self.index_value(array, index, start.to(c.prev_span())));
            } else if c.is_op(OperatorId::PlusPlus) || c.is_op(OperatorId::MinusMinus) {
                let value = self.to_value(operand, start.to(c.prev_span()));
                let op = if c.is_op(OperatorId::PlusPlus) { OperatorId::PlusPlus } else { OperatorId::MinusMinus };
                c.bump();
                operand = Operand::Value(self.unary_value(op, value, start.to(c.prev_span())));
            } else if c.is_punct(PunctuationId::ColonColon) {
                c.bump();
                if !c.eat_keyword(KeywordId::New) {
                    c.expect_ident()?;
                }
                operand = Operand::Value(Value::of(IType::null()));
            } else {
                break;
            }
        }
        Ok(self.to_value(operand, start.to(c.prev_span())))
    }

    fn index_value(&self, array: Value, index: Value, span: Span) -> Value {
        if array.poisoned || index.poisoned {
            return Value::opaque();
        }
        if array.ty.is_array() {
            let int = IType::primitive(PrimitiveKind::Int);
            if !matches!(unboxed(&index.ty), Some(k) if k.widens_to(PrimitiveKind::Int)) {
                self.lc.cast_to(&index.ty, &int, CastKind::IMPLICIT, span);
            }
            return Value::variable(array.ty.component(), None);
        }
        match self.lc.operator_override(OverrideOp::Index, &array.ty, Some(&index.ty)) {
            Some(m) => Value::of(m.ret),
            None => {
                self.lc.error(span, codes::EXPR_BAD_OPERAND, vec!["[]".into(), array.ty.to_string(), index.ty.to_string()]);
                Value::opaque()
            }
        }
    }

    /// Whatever follows a `.`.
    fn select(&mut self, operand: Operand, c: &mut Cursor<'_>, start: Span) -> Result<Operand, SyntaxError> {
        if c.is_op(OperatorId::Lt) {
            skip_type_args(c);
        }
        if c.is_keyword(KeywordId::New) {
            let outer = self.to_value(operand, start.to(c.prev_span()));
            let value = self.new_expr(c)?;
            return Ok(Operand::Value(if outer.poisoned { Value::opaque() } else { value }));
        }
        if let Operand::Class(class) = &operand {
            if c.eat_keyword(KeywordId::Class) {
                return Ok(Operand::Value(class_literal(&IType::class(class.clone()))));
            }
            if c.eat_keyword(KeywordId::This) {
                let scope = self.lc.scope().chain().find(|s| s.class == *class).map(scope_type);
                return Ok(Operand::Value(Value::of(scope.unwrap_or_else(|| IType::class(class.clone())))));
            }
        }
        let (name, name_span) = c.expect_ident()?;
        if c.is_punct(PunctuationId::LParen) {
            let value = self.qualified_call(operand, &name, name_span, c)?;
            return Ok(Operand::Value(value));
        }
        Ok(self.member(operand, &name, start.to(name_span)))
    }

    /// `operand.name` where `name` is not a call.
    fn member(&self, operand: Operand, name: &str, span: Span) -> Operand {
        match operand {
            Operand::Package(package) => {
                let path = format!("{package}.{name}");
                match self.lc.lookup_class(&path) {
                    Ok(Some(class)) => Operand::Class(class),
                    _ => Operand::Package(path),
                }
            }
            Operand::Class(class) => match self.lc.find_field(&IType::class(class.clone()), name) {
                Ok(field) if field.is_static() => Operand::Value(self.field_value(field)),
                Ok(_) => {
                    self.lc.error(span, codes::MEMBER_NOT_STATIC, vec![name.to_string()]);
                    Operand::Value(Value::opaque())
                }
                Err(FieldError::Inaccessible { owner, access }) => {
                    self.lc.assert_accessible(&owner, name, access, span);
                    Operand::Value(Value::opaque())
                }
                Err(_) => {
                    let member = format!("{class}${name}");
                    if self.lc.global().class_exists(&member) {
                        return Operand::Class(member);
                    }
                    self.lc.error(span, codes::MEMBER_FIELD_NOT_FOUND, vec![display_name(&class), name.to_string()]);
                    Operand::Value(Value::opaque())
                }
            },
            Operand::Value(value) => {
                if value.poisoned {
                    return Operand::Value(Value::opaque());
                }
                if value.ty.is_array() && name == "length" {
                    return Operand::Value(Value::of(IType::primitive(PrimitiveKind::Int)));
                }
                let receiver = upper_bound(&value.ty);
                match self.lc.resolve_field(&receiver, name, span) {
                    Some(field) => Operand::Value(self.field_value(field)),
                    None => Operand::Value(Value::opaque()),
                }
            }
        }
    }

    fn field_value(&self, field: FieldAccess) -> Value {
        let element = match self.lc.constant_value(&field) {
            Some(e @ ElementValue::Enum { .. }) => Some(e),
            _ => None,
        };
        Value {
            element,
            ..Value::variable(field.ty.clone(), field.constant().cloned())
        }
    }

    /// Turn an operand into a value, reporting names that denote nothing.
    fn to_value(&self, operand: Operand, span: Span) -> Value {
        match operand {
            Operand::Value(value) => value,
            Operand::Class(class) => {
                self.lc.error(span, codes::EXPR_UNRESOLVED_NAME, vec![display_name(&class)]);
                Value::opaque()
            }
            Operand::Package(path) if !path.contains('.') => {
                self.lc.error(span, codes::EXPR_UNRESOLVED_NAME, vec![path]);
                Value::opaque()
            }
            Operand::Package(path) => {
                self.lc.resolve_dot_get(&path, span);
                Value::opaque()
            }
        }
    }

    // ========================================================================
    // Primaries
    // ========================================================================

    fn primary(&mut self, c: &mut Cursor<'_>) -> Result<Operand, SyntaxError> {
        let token = c.peek().clone();
        let span = token.span;
        let value = match &token.kind {
            TokenKind::Int(v) => {
                c.bump();
                match i32::try_from(*v) {
                    Ok(v) => Value::constant(Constant::Int(v)),
                    Err(_) => {
                        self.lc.error(span, codes::EXPR_INT_OVERFLOW, vec![v.to_string()]);
                        Value {
                            poisoned: true,
                            ..Value::of(IType::primitive(PrimitiveKind::Int))
                        }
                    }
                }
            }
            TokenKind::Long(v) => {
                c.bump();
                Value::constant(Constant::Long(*v))
            }
            TokenKind::Float(v) => {
                c.bump();
                Value::constant(Constant::Float(*v))
            }
            TokenKind::Double(v) => {
                c.bump();
                Value::constant(Constant::Double(*v))
            }
            TokenKind::Char(ch) => {
                c.bump();
                Value::constant(Constant::Char(u16::try_from(u32::from(*ch)).unwrap_or(0xFFFD)))
            }
            TokenKind::String(s) => {
                c.bump();
                Value::constant(Constant::String(s.clone()))
            }
            TokenKind::Keyword(KeywordId::True | KeywordId::False) => {
                c.bump();
                Value::constant(Constant::Boolean(token.kind.is_keyword(KeywordId::True)))
            }
            TokenKind::Keyword(KeywordId::Null) => {
                c.bump();
                Value::of(IType::null())
            }
            TokenKind::Keyword(KeywordId::This) => {
                c.bump();
                if c.is_punct(PunctuationId::LParen) {
                    let ctors = self.constructors(self.lc.class_name());
                    let args = self.arguments(c)?;
                    let receiver = self.this_type.clone();
                    return Ok(Operand::Value(self.invoke(&receiver, ctors, &args, well_known::CONSTRUCTOR, span, false)));
                }
                if self.lc.is_static_context() {
                    self.lc.error(span, codes::MEMBER_NOT_STATIC, vec!["this".into()]);
                    return Ok(Operand::Value(Value::opaque()));
                }
                Value::of(self.this_type.clone())
            }
            TokenKind::Keyword(KeywordId::Super) => {
                c.bump();
                return self.super_expr(c, span).map(Operand::Value);
            }
            TokenKind::Keyword(KeywordId::New) => self.new_expr(c)?,
            TokenKind::Keyword(KeywordId::Switch) => {
                c.bump();
                c.skip_group()?;
                c.skip_group()?;
                Value::opaque()
            }
            TokenKind::Punctuation(PunctuationId::LParen) => {
                let range = c.skip_group()?;
                let inner = self.expression_in(range)?;
                Value {
                    element: None,
                    ..inner
                }
            }
            TokenKind::Ident(name) => {
                c.bump();
                if c.is_punct(PunctuationId::LParen) {
                    return self.unqualified_call(name, span, c).map(Operand::Value);
                }
                return Ok(self.name(name, span));
            }
            kind => {
                if let Some(kind) = primitive_keyword(kind) {
                    // `int.class`, `int[].class`, `int[]::new`
                    c.bump();
                    let ty = IType::primitive(kind).with_dims(parse_dims(c));
                    if c.is_punct(PunctuationId::ColonColon) {
                        return Ok(Operand::Value(Value::of(ty)));
                    }
                    c.expect_punct(PunctuationId::Dot)?;
                    if !c.eat_keyword(KeywordId::Class) {
                        return Err(c.unexpected("`class`"));
                    }
                    class_literal(&ty)
                } else {
                    return Err(c.unexpected("expression"));
                }
            }
        };
        Ok(Operand::Value(value))
    }

    /// A simple name: local, field (of this class or an enclosing one), static import, class, or package prefix.
    fn name(&self, name: &str, span: Span) -> Operand {
        if let Some(local) = self.locals.get(name) {
            return Operand::Value(Value::variable(local.ty.clone(), local.constant.clone()));
        }
        for (depth, scope) in self.lc.scope().chain().enumerate() {
            match self.lc.find_field(&scope_type(scope), name) {
                Ok(field) => {
                    if depth == 0 && !field.is_static() && self.lc.is_static_context() {
                        self.lc.error(span, codes::MEMBER_NOT_STATIC, vec![name.to_string()]);
                        return Operand::Value(Value::opaque());
                    }
                    return Operand::Value(self.field_value(field));
                }
                Err(FieldError::Inaccessible { owner, access }) => {
                    self.lc.assert_accessible(&owner, name, access, span);
                    return Operand::Value(Value::opaque());
                }
                Err(_) => {}
            }
        }
        for owner in self.lc.scope().imports.static_owners(name) {
            let Some(class) = resolve_qualified(self.lc.global(), owner) else {
                continue;
            };
            if let Ok(field) = self.lc.find_field(&IType::class(class), name) {
                if field.is_static() {
                    return Operand::Value(self.field_value(field));
                }
            }
        }
        match self.lc.lookup_class(name) {
            Ok(Some(class)) => Operand::Class(class),
            Ok(None) => Operand::Package(name.to_string()),
            Err(_) => self.lc.resolve_class_name(name, span).map_or(Operand::Value(Value::opaque()), Operand::Class),
        }
    }

    /// `super(...)`, `super.name` or `super.name(...)`.
    fn super_expr(&mut self, c: &mut Cursor<'_>, span: Span) -> Result<Value, SyntaxError> {
        let parent = self.lc.current_class().and_then(|node| node.generic_parent()).unwrap_or_else(IType::object);
        if c.is_punct(PunctuationId::LParen) {
            let ctors = parent.class_name().map(|p| self.constructors(&p)).unwrap_or_default();
            let args = self.arguments(c)?;
            return Ok(self.invoke(&parent, ctors, &args, well_known::CONSTRUCTOR, span, false));
        }
        if c.eat_punct(PunctuationId::ColonColon) {
            c.expect_ident()?;
            return Ok(Value::of(IType::null()));
        }
        c.expect_punct(PunctuationId::Dot)?;
        if self.lc.is_static_context() {
            self.lc.error(span, codes::MEMBER_NOT_STATIC, vec!["super".into()]);
            return Ok(Value::opaque());
        }
        let (name, name_span) = c.expect_ident()?;
        if c.is_punct(PunctuationId::LParen) {
            return self.qualified_call(Operand::Value(Value::of(parent)), &name, name_span, c);
        }
        match self.member(Operand::Value(Value::of(parent)), &name, span.to(name_span)) {
            Operand::Value(value) => Ok(value),
            other => Ok(self.to_value(other, span)),
        }
    }

    fn new_expr(&mut self, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let start = c.span();
        if !c.eat_keyword(KeywordId::New) {
            return Err(c.unexpected("`new`"));
        }
        if c.is_op(OperatorId::Lt) {
            skip_type_args(c);
        }
        let base = self.parse_type(c)?;
        if base.is_array() || c.is_punct(PunctuationId::LBracket) {
            let mut dims = base.dims();
            let element = base.with_dims(0);
            while c.is_punct(PunctuationId::LBracket) {
                if c.nth(1).kind.is_punctuation(PunctuationId::RBracket) {
                    c.bump();
                    c.bump();
                } else {
                    let range = c.skip_group()?;
                    let size = self.expression_in(range)?;
                    if !size.poisoned && !matches!(unboxed(&size.ty), Some(k) if k.widens_to(PrimitiveKind::Int)) {
                        self.lc.cast_to(&size.ty, &IType::primitive(PrimitiveKind::Int), CastKind::IMPLICIT, start.to(c.prev_span()));
                    }
                }
                dims = dims.saturating_add(1);
            }
            let array = element.with_dims(dims);
            if c.is_punct(PunctuationId::LBrace) {
                self.array_initializer(c, &array)?;
            }
            return Ok(Value::of(array));
        }
        let args = self.arguments(c)?;
        let body = if c.is_punct(PunctuationId::LBrace) { Some(c.skip_group()?) } else { None };
        let span = start.to(c.prev_span());
        let Some(class) = base.class_name() else {
            self.lc.error(span, codes::EXPR_BAD_OPERAND, vec!["new".into(), base.to_string(), "(none)".into()]);
            return Ok(Value::opaque());
        };
        let Some(node) = self.lc.class_info(&class) else {
            // unresolved classes were reported by `resolve_type`
            return Ok(Value::opaque());
        };
        if body.is_none() && (node.is_abstract() || node.is_interface()) {
            self.lc.error(span, codes::CLASS_ABSTRACT_INSTANTIATION, vec![display_name(&class)]);
        } else if node.is_interface() {
            if !args.is_empty() && !args.iter().any(|a| a.poisoned) {
                self.lc.error(span, codes::MEMBER_METHOD_NOT_FOUND, vec![display_name(&class), well_known::CONSTRUCTOR.into()]);
            }
        } else {
            let ctors = self.constructors(&class);
            self.invoke(&base, ctors, &args, well_known::CONSTRUCTOR, span, false);
        }
        if let Some(body) = body {
            let name = format!("{}${}", self.lc.class_name(), self.lc.scope().next_local_class());
            self.local_classes.push(LocalClassRequest {
                name,
                parent: base.clone(),
                body,
                span,
                args: args.into_iter().map(|a| a.ty).collect(),
            });
        }
        Ok(Value::of(base))
    }

    /// `{a, b, {c}}` checked against `array`'s component type.
    pub fn array_initializer(&mut self, c: &mut Cursor<'_>, array: &IType) -> Result<(), SyntaxError> {
        let range = c.skip_group()?;
        let mut sub = Cursor::new(self.tokens, range);
        let component = array.component();
        while !sub.at_end() {
            if sub.is_punct(PunctuationId::LBrace) {
                if !component.is_array() {
                    return Err(sub.unexpected("expression"));
                }
                self.array_initializer(&mut sub, &component)?;
            } else {
                let start = sub.span();
                let value = self.expression(&mut sub)?;
                self.check_assign(&value, &component, start.to(sub.prev_span()));
            }
            if !sub.eat_punct(PunctuationId::Comma) && !sub.at_end() {
                return Err(sub.unexpected("`,` or `}`"));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Parenthesized argument list at the cursor.
    pub fn arguments(&mut self, c: &mut Cursor<'_>) -> Result<Vec<Value>, SyntaxError> {
        if !c.is_punct(PunctuationId::LParen) {
            return Err(c.unexpected("`(`"));
        }
        let range = c.skip_group()?;
        let mut sub = Cursor::new(self.tokens, range);
        let mut args = Vec::new();
        while !sub.at_end() {
            args.push(self.expression(&mut sub)?);
            if !sub.eat_punct(PunctuationId::Comma) && !sub.at_end() {
                return Err(sub.unexpected("`,` or `)`"));
            }
        }
        Ok(args)
    }

    fn constructors(&self, class: &str) -> Vec<MethodRef> {
        self.lc
            .helper(class)
            .and_then(|h| h.find_method(self.lc.global(), well_known::CONSTRUCTOR).ok())
            .unwrap_or_default()
    }

    fn unqualified_call(&mut self, name: &str, span: Span, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let args = self.arguments(c)?;
        let span = span.to(c.prev_span());
        let scopes: Vec<IType> = self.lc.scope().chain().map(scope_type).collect();
        for (depth, receiver) in scopes.iter().enumerate() {
            let Some(class) = receiver.class_name() else {
                continue;
            };
            let found = self.lc.helper(&class).and_then(|h| h.find_method(self.lc.global(), name).ok());
            if let Some(candidates) = found.filter(|f| !f.is_empty()) {
                let require_static = depth == 0 && self.lc.is_static_context();
                return Ok(self.invoke(receiver, candidates, &args, name, span, require_static));
            }
        }
        for owner in self.lc.scope().imports.static_owners(name) {
            let Some(class) = resolve_qualified(self.lc.global(), owner) else {
                continue;
            };
            let found = self.lc.helper(&class).and_then(|h| h.find_method(self.lc.global(), name).ok());
            let statics: Vec<MethodRef> = found.into_iter().flatten().filter(|m| m.method().is_static()).collect();
            if !statics.is_empty() {
                return Ok(self.invoke(&IType::class(class), statics, &args, name, span, true));
            }
        }
        if !args.iter().any(|a| a.poisoned) {
            self.lc.error(span, codes::MEMBER_METHOD_NOT_FOUND, vec![display_name(self.lc.class_name()), name.to_string()]);
        }
        Ok(Value::opaque())
    }

    fn qualified_call(&mut self, operand: Operand, name: &str, span: Span, c: &mut Cursor<'_>) -> Result<Value, SyntaxError> {
        let (receiver, require_static) = match operand {
            Operand::Class(class) => (IType::class(class), true),
            Operand::Value(value) if value.poisoned => {
                self.arguments(c)?;
                return Ok(Value::opaque());
            }
            Operand::Value(value) => (upper_bound(&value.ty), false),
            package @ Operand::Package(_) => {
                self.to_value(package, span);
                self.arguments(c)?;
                return Ok(Value::opaque());
            }
        };
        let args = self.arguments(c)?;
        let span = span.to(c.prev_span());
        if receiver.is_primitive() || receiver.is_void() {
            self.lc.error(span, codes::MEMBER_METHOD_NOT_FOUND, vec![receiver.to_string(), name.to_string()]);
            return Ok(Value::opaque());
        }
        // arrays answer `Object`'s methods (`clone` keeps the array type)
        if receiver.is_array() {
            if name == "clone" && args.is_empty() {
                return Ok(Value::of(receiver));
            }
            return Ok(self.call_on(&IType::object(), name, &args, span, false));
        }
        Ok(self.call_on(&receiver, name, &args, span, require_static))
    }

    fn call_on(&self, receiver: &IType, name: &str, args: &[Value], span: Span, require_static: bool) -> Value {
        let Some(class) = receiver.class_name() else {
            return Value::opaque();
        };
        let candidates = self
            .lc
            .helper(&class)
            .and_then(|h| h.find_method(self.lc.global(), name).ok())
            .unwrap_or_default();
        self.invoke(receiver, candidates, args, name, span, require_static)
    }

    /// Select among `candidates` and type the call.
    fn invoke(
        &self,
        receiver: &IType,
        candidates: Vec<MethodRef>,
        args: &[Value],
        name: &str,
        span: Span,
        require_static: bool,
    ) -> Value {
        let types: Vec<IType> = args.iter().map(|a| a.ty.clone()).collect();
        if args.iter().any(|a| !a.poisoned && a.ty.is_void()) {
            self.lc.error(span, codes::EXPR_VOID_VALUE, Vec::new());
            return Value::opaque();
        }
        let poisoned = args.iter().any(|a| a.poisoned);
        let (visible, hidden): (Vec<MethodRef>, Vec<MethodRef>) =
            candidates.into_iter().partition(|m| self.lc.check_accessible(&m.owner, m.method().access));
        if let Some(found) = self.lc.select_method(receiver, &visible, &types) {
            if require_static && !found.method.method().is_static() && !found.method.method().is_constructor() {
                self.lc.error(span, codes::MEMBER_NOT_STATIC, vec![name.to_string()]);
                return Value::opaque();
            }
            return Value::of(found.ret);
        }
        if poisoned {
            return Value::opaque();
        }
        match self.lc.select_method(receiver, &hidden, &types) {
            Some(found) => {
                let method = found.method.method();
                self.lc.assert_accessible(&found.method.owner, &method.name, method.access, span);
            }
            None => {
                let owner = receiver.class_name().map_or_else(|| receiver.to_string(), |c| display_name(&c));
                self.lc.error(span, codes::MEMBER_METHOD_NOT_FOUND, vec![owner, name.to_string()]);
            }
        }
        Value::opaque()
    }
}

/// Type of `this` inside `scope`: the class parameterized by its own type variables.
fn scope_type(scope: &ClassScope) -> IType {
    if scope.type_params.is_empty() {
        IType::class(scope.class.clone())
    } else {
        IType::generic(scope.class.clone(), scope.type_params.iter().map(IType::type_param).collect())
    }
}

/// Class type used to look up members of a value of type `ty`.
fn upper_bound(ty: &IType) -> IType {
    match ty {
        IType::TypeParam { dims: 0, .. } => IType::object(),
        IType::Wildcard {
            bound: WildcardBound::Extends,
            ty: Some(bound),
        } => upper_bound(bound),
        IType::Wildcard { .. } => IType::object(),
        other => other.clone(),
    }
}

fn class_literal(ty: &IType) -> Value {
    let arg = match ty.primitive_kind() {
        Some(kind) => IType::class(kind.wrapper().unwrap_or("java/lang/Void")),
        None => ty.clone(),
    };
    Value {
        element: Some(ElementValue::Class(ty.erasure())),
        ..Value::of(IType::generic(well_known::CLASS, vec![arg]))
    }
}

/// Primitive kind of a primitive or wrapper type.
fn unboxed(ty: &IType) -> Option<PrimitiveKind> {
    ty.primitive_kind().or_else(|| ty.class_name().and_then(|n| PrimitiveKind::from_wrapper(&n)))
}

fn unary_promote(kind: PrimitiveKind) -> PrimitiveKind {
    match kind {
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char => PrimitiveKind::Int,
        other => other,
    }
}

fn is_string(ty: &IType) -> bool {
    *ty == IType::string()
}

/// Result type of a built-in binary operator, or `None` if the operands do not fit it.
fn builtin_binary(lc: &LocalContext<'_>, op: OperatorId, left: &IType, right: &IType) -> Option<IType> {
    use OperatorId::*;
    let boolean = IType::primitive(PrimitiveKind::Boolean);
    let (l, r) = (unboxed(left), unboxed(right));
    let numeric = || {
        let (a, b) = (l?, r?);
        if a.is_numeric() && b.is_numeric() { PrimitiveKind::promote(a, b) } else { None }
    };
    match op {
        Plus if is_string(left) || is_string(right) => Some(IType::string()),
        Plus | Minus | Star | Slash | Percent => numeric().map(IType::primitive),
        Shl | Shr | UShr => {
            let (a, b) = (l?, r?);
            (a.is_integral() && b.is_integral()).then(|| IType::primitive(unary_promote(a)))
        }
        Lt | Gt | LtEq | GtEq => numeric().map(|_| boolean),
        EqEq | NotEq => {
            if left.is_primitive() || right.is_primitive() {
                let both_boolean = l == Some(PrimitiveKind::Boolean) && r == Some(PrimitiveKind::Boolean);
                (both_boolean || numeric().is_some()).then_some(boolean)
            } else {
                let related = lc.classify_cast(left, right) >= CastKind::Downcast
                    || lc.classify_cast(right, left) >= CastKind::Downcast;
                related.then_some(boolean)
            }
        }
        Amp | Pipe | Caret => {
            let (a, b) = (l?, r?);
            if a == PrimitiveKind::Boolean && b == PrimitiveKind::Boolean {
                Some(boolean)
            } else if a.is_integral() && b.is_integral() {
                PrimitiveKind::promote(a, b).map(IType::primitive)
            } else {
                None
            }
        }
        AndAnd | OrOr => (l == Some(PrimitiveKind::Boolean) && r == Some(PrimitiveKind::Boolean)).then_some(boolean),
        _ => None,
    }
}

fn adjacent(a: &Token, b: &Token) -> bool {
    a.span.end == b.span.start
}

/// Binary operator at the cursor and how many tokens spell it.
fn binary_op(c: &Cursor<'_>) -> Option<(OperatorId, usize)> {
    let TokenKind::Operator(op) = c.kind() else {
        return None;
    };
    if *op == OperatorId::Gt {
        let (first, second, third) = (c.nth(0), c.nth(1), c.nth(2));
        let glued = |t: &Token, id: OperatorId| t.kind.is_operator(id);
        if glued(second, OperatorId::GtEq) && adjacent(first, second) {
            return None;
        }
        if glued(second, OperatorId::Gt) && adjacent(first, second) {
            if glued(third, OperatorId::GtEq) && adjacent(second, third) {
                return None;
            }
            if glued(third, OperatorId::Gt) && adjacent(second, third) {
                let fourth = c.nth(3);
                if glued(fourth, OperatorId::GtEq) && adjacent(third, fourth) {
                    return None;
                }
                return Some((OperatorId::UShr, 3));
            }
            return Some((OperatorId::Shr, 2));
        }
    }
    (operators::precedence(*op) > 0).then_some((*op, 1))
}

/// Assignment operator at the cursor: `None` inside for plain `=`, else the underlying binary operator.
fn assign_op(c: &Cursor<'_>) -> Option<(Option<OperatorId>, usize)> {
    use OperatorId::*;
    let TokenKind::Operator(op) = c.kind() else {
        return None;
    };
    let simple = match op {
        Assign => return Some((None, 1)),
        PlusAssign => Plus,
        MinusAssign => Minus,
        StarAssign => Star,
        SlashAssign => Slash,
        PercentAssign => Percent,
        AndAssign => Amp,
        OrAssign => Pipe,
        XorAssign => Caret,
        ShlAssign => Shl,
        Gt => {
            let (first, second, third) = (c.nth(0), c.nth(1), c.nth(2));
            if second.kind.is_operator(GtEq) && adjacent(first, second) {
                return Some((Some(Shr), 2));
            }
            if second.kind.is_operator(Gt) && adjacent(first, second) && third.kind.is_operator(GtEq) && adjacent(second, third) {
                return Some((Some(UShr), 3));
            }
            return None;
        }
        _ => return None,
    };
    Some((Some(simple), 1))
}

/// Skip explicit type arguments `<...>` of a generic call.
fn skip_type_args(c: &mut Cursor<'_>) {
    let mut depth = 0usize;
    while !c.at_end() {
        if c.is_op(OperatorId::Lt) {
            depth += 1;
        } else if c.is_op(OperatorId::Gt) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                c.bump();
                return;
            }
        }
        c.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use lava_syntax::Severity;
    use lava_syntax::lexer::lex;

    /// Type `src` in a static method of `p/Test` with `locals` declared.
    fn eval_with(ctx: &GlobalContext, src: &str, locals: &[(&str, IType)]) -> Value {
        let tokens = lex(src).unwrap();
        let lc = LocalContext::new(ctx, scope(ctx, "package p; import java.util.*;"), 0).with_method(Vec::new(), true);
        let mut eval = Evaluator::new(lc, &tokens);
        for (name, ty) in locals {
            eval.locals.declare(name, ty.clone(), None);
        }
        let len = tokens.iter().filter(|t| t.kind != TokenKind::Eof).count();
        eval.expression_in(TokenRange::new(0, len)).unwrap()
    }

    fn eval(src: &str) -> (Value, Vec<&'static str>) {
        let ctx = GlobalContext::new();
        let value = eval_with(&ctx, src, &[]);
        let codes = ctx.diagnostics().iter().filter(|d| d.severity >= Severity::Warning).map(|d| d.code).collect();
        (value, codes)
    }

    fn int() -> IType {
        IType::primitive(PrimitiveKind::Int)
    }

    #[test]
    fn test_constant_folding() {
        let (v, errs) = eval("1 + 2 * 3");
        assert!(errs.is_empty());
        assert_eq!(v.constant, Some(Constant::Int(7)));
        let (v, _) = eval("(1L << 40) > 0 ? \"big\" : \"small\"");
        assert_eq!(v.ty, IType::string());
        assert_eq!(v.constant, Some(Constant::String("big".into())));
        let (v, _) = eval("-8 >> 1");
        assert_eq!(v.constant, Some(Constant::Int(-4)));
        let (v, _) = eval("-8 >>> 28");
        assert_eq!(v.constant, Some(Constant::Int(15)));
        let (v, _) = eval("\"n=\" + 1.5f");
        assert_eq!(v.constant, Some(Constant::String("n=1.5".into())));
    }

    #[test]
    fn test_int_literal_range() {
        let (v, errs) = eval("-2147483648");
        assert!(errs.is_empty());
        assert_eq!(v.constant, Some(Constant::Int(i32::MIN)));
        let (_, errs) = eval("2147483648");
        assert_eq!(errs, vec![codes::EXPR_INT_OVERFLOW]);
    }

    #[test]
    fn test_bad_operands_report_once() {
        let (_, errs) = eval("true + 1");
        assert_eq!(errs, vec![codes::EXPR_BAD_OPERAND]);
        let (_, errs) = eval("(true + 1) * 2 - 3");
        assert_eq!(errs, vec![codes::EXPR_BAD_OPERAND]);
        let (_, errs) = eval("1 / 0");
        assert_eq!(errs, vec![codes::EXPR_DIV_BY_ZERO]);
    }

    #[test]
    fn test_static_constants_and_qualified_names() {
        let (v, errs) = eval("Integer.MAX_VALUE + 1");
        assert!(errs.is_empty());
        assert_eq!(v.constant, Some(Constant::Int(i32::MIN)));
        let (v, _) = eval("java.lang.Integer.MIN_VALUE");
        assert_eq!(v.constant, Some(Constant::Int(i32::MIN)));
        let (v, _) = eval("java.lang.annotation.RetentionPolicy.RUNTIME");
        assert!(matches!(v.element, Some(ElementValue::Enum { ref name, .. }) if name == "RUNTIME"));
        let (_, errs) = eval("java.lang.Integer.NOPE");
        assert_eq!(errs, vec![codes::MEMBER_FIELD_NOT_FOUND]);
        let (_, errs) = eval("nothing.here.At");
        assert_eq!(errs, vec![codes::DOTGET_UNRESOLVED]);
        let (_, errs) = eval("missing");
        assert_eq!(errs, vec![codes::EXPR_UNRESOLVED_NAME]);
    }

    #[test]
    fn test_method_calls_and_generics() {
        let ctx = GlobalContext::new();
        let list = IType::generic("java/util/ArrayList", vec![IType::string()]);
        let v = eval_with(&ctx, "names.get(0).length()", &[("names", list.clone())]);
        assert_eq!(v.ty, int());
        let v = eval_with(&ctx, "new ArrayList<String>()", &[]);
        assert_eq!(v.ty, list);
        let v = eval_with(&ctx, "String.valueOf(3)", &[]);
        assert_eq!(v.ty, IType::string());
        assert!(ctx.diagnostics().is_empty());
        eval_with(&ctx, "names.nope()", &[("names", list)]);
        assert_eq!(ctx.diagnostics()[0].code, codes::MEMBER_METHOD_NOT_FOUND);
    }

    #[test]
    fn test_operator_sugar() {
        let ctx = GlobalContext::new();
        let map = IType::generic("java/util/HashMap", vec![IType::string(), IType::class("java/lang/Integer")]);
        let v = eval_with(&ctx, "m[\"a\"] + 1", &[("m", map)]);
        assert_eq!(v.ty, int());
        let v = eval_with(&ctx, "\"ab\" * 3", &[]);
        assert_eq!(v.ty, IType::string());
        let v = eval_with(&ctx, "!\"\"", &[]);
        assert_eq!(v.ty, IType::primitive(PrimitiveKind::Boolean));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_casts_and_instanceof() {
        let (v, errs) = eval("(byte) 200");
        assert!(errs.is_empty());
        assert_eq!(v.constant, Some(Constant::Byte(-56)));
        let (_, errs) = eval("(String) 1");
        assert_eq!(errs, vec![codes::CAST_FORBIDDEN]);
        let ctx = GlobalContext::new();
        let v = eval_with(&ctx, "o instanceof String s && s.isEmpty()", &[("o", IType::object())]);
        assert_eq!(v.ty, IType::primitive(PrimitiveKind::Boolean));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_assignment_conversions() {
        let ctx = GlobalContext::new();
        let byte = IType::primitive(PrimitiveKind::Byte);
        eval_with(&ctx, "b = 10", &[("b", byte.clone())]);
        assert!(ctx.diagnostics().is_empty());
        eval_with(&ctx, "b = 300", &[("b", byte.clone())]);
        assert_eq!(ctx.diagnostics()[0].code, codes::CAST_NEEDS_EXPLICIT);
        let ctx = GlobalContext::new();
        eval_with(&ctx, "b += 300", &[("b", byte)]);
        assert!(ctx.diagnostics().iter().all(|d| !d.severity.is_error()));
    }

    #[test]
    fn test_arrays() {
        let ctx = GlobalContext::new();
        let v = eval_with(&ctx, "new int[3][]", &[]);
        assert_eq!(v.ty, int().with_dims(2));
        let v = eval_with(&ctx, "new String[] {\"a\", \"b\"}.length", &[]);
        assert_eq!(v.ty, int());
        let v = eval_with(&ctx, "xs[1] << 2", &[("xs", int().with_dims(1))]);
        assert_eq!(v.ty, int());
        assert!(ctx.diagnostics().is_empty());
        eval_with(&ctx, "new int[] {\"x\"}", &[]);
        assert_eq!(ctx.diagnostics()[0].code, codes::CAST_FORBIDDEN);
    }

    #[test]
    fn test_static_context_and_abstract_new() {
        let (_, errs) = eval("this");
        assert_eq!(errs, vec![codes::MEMBER_NOT_STATIC]);
        let (_, errs) = eval("new Number()");
        assert_eq!(errs, vec![codes::CLASS_ABSTRACT_INSTANTIATION]);
    }

    #[test]
    fn test_lambdas_and_anonymous_classes() {
        let ctx = GlobalContext::new();
        let tokens = lex("new Comparable<String>() { public int compareTo(String o) { return 0; } }").unwrap();
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p;"), 0);
        let mut ev = Evaluator::new(lc, &tokens);
        let v = ev.expression_in(TokenRange::new(0, tokens.len() - 1)).unwrap();
        assert_eq!(v.ty, IType::generic("java/lang/Comparable", vec![IType::string()]));
        assert_eq!(ev.local_classes.len(), 1);
        assert_eq!(ev.local_classes[0].name, "p/Test$1");
        let (v, errs) = eval("(a, b) -> a + b");
        assert!(errs.is_empty());
        assert!(v.ty.is_null());
    }

    #[test]
    fn test_shift_glue_and_comparison() {
        let (v, _) = eval("1 > 0");
        assert_eq!(v.constant, Some(Constant::Boolean(true)));
        let (v, _) = eval("64 >> 2 > 3");
        assert_eq!(v.constant, Some(Constant::Boolean(true)));
    }
}
