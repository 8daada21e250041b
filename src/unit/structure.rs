//! Stage 1: the class skeleton.
//!
//! The declaration is read down to member signatures with written (unresolved) types. Bodies, initializers and
//! annotation values stay token ranges and are queued for S3. Member classes are split off as child units, and any
//! further top-level declaration in the file becomes a sibling unit.
//!
//! Implicit members are synthesized here so every later stage sees them like written ones:
//!
//! - records and structs: a field per component, the canonical constructor, accessors (records also get
//!   `toString`, `hashCode` and `equals`)
//! - enums: a field per constant, `values()`, `valueOf(String)` and a private no-arg constructor if none is written

use std::sync::Arc;

use lava_core::access::*;
use lava_core::lang::keywords::KeywordId;
use lava_core::lang::operators::OperatorId;
use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::punctuation::PunctuationId;
use lava_core::lang::well_known;
use lava_syntax::diagnostics::codes;
use lava_syntax::lexer::TokenKind;
use lava_syntax::{Severity, Span, SyntaxError};

use super::cursor::{Cursor, TokenRange};
use super::decl::*;
use super::syntax::{
    at_annotation, parse_annotation_use, parse_dims, parse_modifiers, parse_type, parse_type_list, parse_type_params,
};
use super::{CompileUnit, DeferredTask, Nesting, Stage, StageError};
use crate::class::{ClassNode, FieldNode, InnerClass, MethodNode};
use crate::context::GlobalContext;
use crate::local::ClassScope;
use crate::types::arena::Segment;
use crate::types::{BaseType, ClassSignature, IType, Type, TypeArena, TypeNode, TypeParamDecl, TypeRef};

impl CompileUnit {
    /// Stage 1: parse the declaration, register the skeleton and split off member classes.
    ///
    /// Returns the units discovered along the way (member classes, recursively, and sibling top-level classes),
    /// each already past S1.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.file.name))]
    pub fn stage1(&mut self, ctx: &GlobalContext) -> Result<Vec<CompileUnit>, StageError> {
        if self.failed || self.stage >= Stage::Structure {
            return Ok(Vec::new());
        }
        if self.declares_nothing() {
            tracing::debug!("no type declaration");
            self.stage = Stage::Structure;
            return Ok(Vec::new());
        }
        let parsed = self.parse_structure();
        let siblings = self.settle(ctx, parsed, Stage::Structure)?;
        self.register(ctx)?;

        let mut found = Vec::new();
        if let Some(decl) = &self.decl {
            let in_interface = decl.kind.is_interface_like();
            for member in &decl.member_classes {
                let nesting = Nesting::Member {
                    outer: self.name.clone(),
                    in_interface,
                };
                found.push(self.nested(String::new(), member.range, nesting, self.scope.clone()));
            }
        }
        for range in siblings {
            found.push(self.nested(String::new(), range, Nesting::TopLevel, None));
        }

        let mut all = Vec::with_capacity(found.len());
        for mut unit in found {
            match unit.stage1(ctx) {
                Ok(more) => {
                    all.push(unit);
                    all.extend(more);
                }
                Err(StageError::Syntax(_)) => all.push(unit),
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }

    fn register(&self, ctx: &GlobalContext) -> Result<(), StageError> {
        if self.generated {
            ctx.add_generated_class(self.node.clone());
            return Ok(());
        }
        if let Err(err) = ctx.add_compile_unit(self.node.clone()) {
            let span = self.decl.as_ref().map_or(Span::at(0), |d| d.name_span);
            ctx.report(&self.file.name, Severity::Error, span, codes::CLASS_DUPLICATE_UNIT, vec![self.name.clone()]);
            return Err(err.into());
        }
        tracing::debug!(class = %self.name, "registered compile unit");
        Ok(())
    }

    /// A file holding only a package clause, imports and stray semicolons.
    fn declares_nothing(&self) -> bool {
        if self.nesting != Nesting::TopLevel {
            return false;
        }
        let mut c = Cursor::new(self.file.tokens(), self.range);
        while c.eat_punct(PunctuationId::Semicolon) {}
        c.at_end()
    }

    /// Parse the declaration; returns the ranges of further top-level declarations.
    fn parse_structure(&mut self) -> Result<Vec<TokenRange>, SyntaxError> {
        let file = Arc::clone(&self.file);
        let mut c = Cursor::new(file.tokens(), self.range);
        let mut decl = match &self.nesting {
            Nesting::Anonymous { .. } => {
                let mut decl = ClassDecl::new(ClassKind::Class, "", file.span_of(self.range));
                parse_body(&mut c, &mut decl, &mut self.arena)?;
                decl
            }
            _ => {
                while c.eat_punct(PunctuationId::Semicolon) {}
                parse_class_decl(&mut c, &mut self.arena)?
            }
        };

        let mut siblings = Vec::new();
        if self.nesting == Nesting::TopLevel {
            loop {
                while c.eat_punct(PunctuationId::Semicolon) {}
                if c.at_end() {
                    break;
                }
                let start = c.pos();
                skip_class_decl(&mut c)?;
                siblings.push(TokenRange::new(start, c.pos()));
            }
        }

        if self.name.is_empty() {
            self.name = match &self.nesting {
                Nesting::Member { outer, .. } => format!("{outer}${}", decl.simple_name),
                _ => qualify(&self.imports.package, &decl.simple_name),
            };
        }
        self.synthesize(&mut decl);
        self.node = self.skeleton(&decl);
        let type_params = decl.type_params.iter().map(|p| p.name.clone()).collect();
        let scope = ClassScope::new(self.name.clone(), Arc::clone(&self.imports), type_params, self.enclosing.clone())
            .with_outer_type_params(self.outer_type_params.clone());
        self.scope = Some(Arc::new(scope));
        self.queue_tasks(&decl);
        self.decl = Some(decl);
        Ok(siblings)
    }

    /// Add the members a declaration gets without writing them.
    fn synthesize(&mut self, decl: &mut ClassDecl) {
        let span = decl.name_span;
        match decl.kind {
            ClassKind::Record | ClassKind::Struct => self.synthesize_components(decl, span),
            ClassKind::Enum => self.synthesize_enum(decl, span),
            ClassKind::Class if !decl.declares_constructor() => self.synthesize_default_ctor(decl, span),
            _ => {}
        }
    }

    /// No-arg constructor with the class's visibility; an anonymous class passes its arguments through instead.
    fn synthesize_default_ctor(&mut self, decl: &mut ClassDecl, span: Span) {
        let anonymous_args = match &self.nesting {
            Nesting::Anonymous { args, .. } => Some(args.clone()),
            _ => None,
        };
        let (flags, params) = match anonymous_args {
            Some(args) => {
                let params = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| synthetic_param(&format!("arg{i}"), self.intern_erased(&arg.erasure(), span), span))
                    .collect();
                (0, params)
            }
            None => (decl.modifiers.flags & VISIBILITY_MASK, Vec::new()),
        };
        decl.methods.push(synthetic(well_known::CONSTRUCTOR, flags, params, None, span));
    }

    fn intern_erased(&mut self, ty: &Type, span: Span) -> TypeRef {
        let node = match &ty.base {
            BaseType::Primitive(kind) => TypeNode::Primitive { kind: *kind, dims: ty.dims },
            BaseType::Class(name) => class_node(name, ty.dims),
            BaseType::Null => class_node(well_known::OBJECT, ty.dims),
        };
        self.arena.intern(node, span)
    }

    fn synthesize_components(&mut self, decl: &mut ClassDecl, span: Span) {
        let record = decl.kind == ClassKind::Record;
        let field_flags = if record { ACC_PRIVATE | ACC_FINAL } else { ACC_PUBLIC };
        let components = decl.components.clone();
        for comp in &components {
            decl.fields.push(FieldDecl {
                name: comp.name.clone(),
                modifiers: Modifiers {
                    flags: field_flags,
                    annotations: comp.annotations.clone(),
                    ..Modifiers::default()
                },
                ty: comp.ty,
                span: comp.span,
                init: None,
                from_component: true,
            });
        }
        let canonical: Vec<TypeRef> = components.iter().map(|c| c.ty).collect();
        let has_canonical = decl
            .methods
            .iter()
            .any(|m| m.name == well_known::CONSTRUCTOR && m.params.iter().map(|p| p.ty).eq(canonical.iter().copied()));
        if !has_canonical {
            let params = components.iter().map(component_param).collect();
            decl.methods.push(synthetic(well_known::CONSTRUCTOR, ACC_PUBLIC, params, None, span));
        }
        for comp in &components {
            if !declares(decl, &comp.name, 0) {
                decl.methods.push(synthetic(&comp.name, ACC_PUBLIC, Vec::new(), Some(comp.ty), comp.span));
            }
        }
        if record {
            let string = self.arena.intern(class_node(well_known::STRING, 0), span);
            let int = self.arena.intern(primitive_node(PrimitiveKind::Int), span);
            let boolean = self.arena.intern(primitive_node(PrimitiveKind::Boolean), span);
            let object = self.arena.intern(class_node(well_known::OBJECT, 0), span);
            let flags = ACC_PUBLIC | ACC_FINAL;
            if !declares(decl, "toString", 0) {
                decl.methods.push(synthetic("toString", flags, Vec::new(), Some(string), span));
            }
            if !declares(decl, "hashCode", 0) {
                decl.methods.push(synthetic("hashCode", flags, Vec::new(), Some(int), span));
            }
            if !declares(decl, "equals", 1) {
                let other = synthetic_param("other", object, span);
                decl.methods.push(synthetic("equals", flags, vec![other], Some(boolean), span));
            }
        }
    }

    fn synthesize_enum(&mut self, decl: &mut ClassDecl, span: Span) {
        let this = self.arena.intern(class_node(&self.name, 0), span);
        let array = self.arena.intern(class_node(&self.name, 1), span);
        let string = self.arena.intern(class_node(well_known::STRING, 0), span);
        for constant in &decl.constants {
            decl.fields.push(FieldDecl {
                name: constant.name.clone(),
                modifiers: Modifiers {
                    flags: ACC_PUBLIC | ACC_STATIC | ACC_FINAL | ACC_ENUM,
                    annotations: constant.annotations.clone(),
                    ..Modifiers::default()
                },
                ty: this,
                span: constant.span,
                init: None,
                from_component: false,
            });
        }
        let flags = ACC_PUBLIC | ACC_STATIC;
        decl.methods.push(synthetic("values", flags, Vec::new(), Some(array), span));
        let name = synthetic_param("name", string, span);
        decl.methods.push(synthetic("valueOf", flags, vec![name], Some(this), span));
        if !decl.declares_constructor() {
            decl.methods.push(synthetic(well_known::CONSTRUCTOR, ACC_PRIVATE, Vec::new(), None, span));
        }
    }

    /// Flags as written plus those implied by the kind and position.
    fn declared_access(&self, decl: &ClassDecl) -> u16 {
        let mut flags = decl.modifiers.flags & (VISIBILITY_MASK | ACC_STATIC | ACC_FINAL | ACC_ABSTRACT | ACC_STRICT);
        match decl.kind {
            ClassKind::Class => {}
            ClassKind::Interface => flags |= ACC_INTERFACE | ACC_ABSTRACT,
            ClassKind::Annotation => flags |= ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
            ClassKind::Enum => {
                flags |= ACC_ENUM;
                if decl.constants.iter().all(|c| c.body.is_none()) {
                    flags |= ACC_FINAL;
                }
            }
            ClassKind::Record | ClassKind::Struct => flags |= ACC_FINAL,
        }
        if !decl.kind.is_interface_like() {
            flags |= ACC_SUPER;
        }
        match &self.nesting {
            Nesting::Member { in_interface: true, .. } => flags |= ACC_PUBLIC | ACC_STATIC,
            Nesting::Member { .. } | Nesting::Local if decl.kind != ClassKind::Class => flags |= ACC_STATIC,
            _ => {}
        }
        flags
    }

    /// Node with written erasures; the header and member passes replace them with resolved types.
    fn skeleton(&self, decl: &ClassDecl) -> ClassNode {
        let declared = self.declared_access(decl);
        let access = match self.nesting {
            Nesting::TopLevel => declared & TOP_LEVEL_CLASS_MASK,
            _ => binary_class_flags(declared),
        };
        let mut node = ClassNode::new(self.name.clone(), access, self.node.origin);
        node.parent = Some(kind_parent(decl.kind).to_string());
        if decl.kind == ClassKind::Annotation {
            node.interfaces.push(well_known::ANNOTATION.to_string());
        }
        if !decl.type_params.is_empty() {
            node.signature = Some(ClassSignature {
                type_params: decl.type_params.iter().map(|p| TypeParamDecl::unbounded(p.name.clone())).collect(),
                parent: IType::class(kind_parent(decl.kind)),
                interfaces: Vec::new(),
            });
        }
        if self.nesting != Nesting::TopLevel {
            let (outer, simple_name) = match &self.nesting {
                Nesting::Member { outer, .. } => (Some(outer.clone()), Some(decl.simple_name.clone())),
                Nesting::Local => (None, Some(decl.simple_name.clone())),
                _ => (None, None),
            };
            node.inner_classes.push(InnerClass {
                inner: self.name.clone(),
                outer,
                simple_name,
                access: declared & !ACC_SUPER,
            });
        }
        for field in &decl.fields {
            let ty = self.arena.written_erasure(field.ty);
            node.fields.push(FieldNode::new(field.name.clone(), field_access(decl.kind, &field.modifiers), ty));
        }
        for method in &decl.methods {
            let params = method
                .params
                .iter()
                .map(|p| {
                    let ty = self.arena.written_erasure(p.ty);
                    let dims = ty.dims + u8::from(p.varargs);
                    ty.with_dims(dims)
                })
                .collect();
            let ret = method.ret.map_or_else(Type::void, |r| self.arena.written_erasure(r));
            node.methods.push(MethodNode::new(method.name.clone(), method_access(decl.kind, method), params, ret));
        }
        node
    }

    fn queue_tasks(&mut self, decl: &ClassDecl) {
        self.deferred.clear();
        self.deferred.extend((0..decl.constants.len()).map(DeferredTask::EnumConstant));
        for (i, field) in decl.fields.iter().enumerate() {
            if field.init.is_some() {
                self.deferred.push_back(DeferredTask::FieldInit(i));
            }
        }
        self.deferred.extend((0..decl.initializers.len()).map(DeferredTask::Initializer));
        for (i, method) in decl.methods.iter().enumerate() {
            if method.default_value.is_some() {
                self.deferred.push_back(DeferredTask::AnnotationDefault(i));
            }
            if method.body.is_some() {
                self.deferred.push_back(DeferredTask::Body(i));
            }
        }
    }
}

/// Flags of a field as it will appear in the class file.
pub(super) fn field_access(kind: ClassKind, mods: &Modifiers) -> u16 {
    if kind.is_interface_like() {
        mods.flags | ACC_PUBLIC | ACC_STATIC | ACC_FINAL
    } else {
        mods.flags
    }
}

/// Flags of a method as it will appear in the class file.
pub(super) fn method_access(kind: ClassKind, method: &MethodDecl) -> u16 {
    let mut flags = method.modifiers.flags;
    if kind.is_interface_like() && !has(flags, ACC_PRIVATE) {
        flags |= ACC_PUBLIC;
        if method.body.is_none() && !has(flags, ACC_STATIC) {
            flags |= ACC_ABSTRACT;
        }
    }
    if kind == ClassKind::Enum && method.name == well_known::CONSTRUCTOR {
        flags = (flags & !VISIBILITY_MASK) | ACC_PRIVATE;
    }
    if method.params.last().is_some_and(|p| p.varargs) {
        flags |= ACC_VARARGS;
    }
    flags
}

/// Parent a kind implies when nothing is written.
pub(super) fn kind_parent(kind: ClassKind) -> &'static str {
    match kind {
        ClassKind::Enum => well_known::ENUM,
        ClassKind::Record => well_known::RECORD,
        _ => well_known::OBJECT,
    }
}

fn qualify(package: &str, simple: &str) -> String {
    if package.is_empty() {
        simple.to_string()
    } else {
        format!("{package}/{simple}")
    }
}

fn class_node(name: &str, dims: u8) -> TypeNode {
    TypeNode::Named {
        segments: vec![Segment {
            name: name.to_string(),
            args: Vec::new(),
        }],
        dims,
    }
}

fn primitive_node(kind: PrimitiveKind) -> TypeNode {
    TypeNode::Primitive { kind, dims: 0 }
}

fn declares(decl: &ClassDecl, name: &str, arity: usize) -> bool {
    decl.methods.iter().any(|m| m.name == name && m.params.len() == arity)
}

fn synthetic(name: &str, flags: u16, params: Vec<ParamDecl>, ret: Option<TypeRef>, span: Span) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        modifiers: Modifiers {
            flags,
            ..Modifiers::default()
        },
        type_params: Vec::new(),
        params,
        ret: if name == well_known::CONSTRUCTOR { None } else { ret },
        throws: Vec::new(),
        body: None,
        default_value: None,
        span,
        compact: false,
    }
}

fn synthetic_param(name: &str, ty: TypeRef, span: Span) -> ParamDecl {
    ParamDecl {
        name: name.to_string(),
        modifiers: Modifiers::default(),
        ty,
        varargs: false,
        span,
    }
}

fn component_param(comp: &ComponentDecl) -> ParamDecl {
    synthetic_param(&comp.name, comp.ty, comp.span)
}

/// Return `true` if a class declaration keyword (after modifiers) starts at the cursor.
pub(super) fn at_class_kind(c: &Cursor<'_>) -> bool {
    match c.kind() {
        TokenKind::Keyword(KeywordId::Class | KeywordId::Interface | KeywordId::Enum) => true,
        TokenKind::Punctuation(PunctuationId::At) => c.nth(1).kind.is_keyword(KeywordId::Interface),
        kind if kind.is_contextual("record") || kind.is_contextual("struct") => {
            c.nth(1).kind.ident().is_some()
                && (c.nth(2).kind.is_punctuation(PunctuationId::LParen) || c.nth(2).kind.is_operator(OperatorId::Lt))
        }
        _ => false,
    }
}

fn parse_kind(c: &mut Cursor<'_>) -> Result<ClassKind, SyntaxError> {
    let kind = match c.kind() {
        TokenKind::Keyword(KeywordId::Class) => ClassKind::Class,
        TokenKind::Keyword(KeywordId::Interface) => ClassKind::Interface,
        TokenKind::Keyword(KeywordId::Enum) => ClassKind::Enum,
        TokenKind::Punctuation(PunctuationId::At) if c.nth(1).kind.is_keyword(KeywordId::Interface) => {
            c.bump();
            ClassKind::Annotation
        }
        kind if kind.is_contextual("record") => ClassKind::Record,
        kind if kind.is_contextual("struct") => ClassKind::Struct,
        _ => return Err(c.unexpected("class, interface, enum or record declaration")),
    };
    c.bump();
    Ok(kind)
}

/// `modifiers kind Name<T> (components) extends ... implements ... permits ... { body }`
pub(super) fn parse_class_decl(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<ClassDecl, SyntaxError> {
    let modifiers = parse_modifiers(c)?;
    let kind = parse_kind(c)?;
    let (name, span) = c.expect_ident()?;
    let mut decl = ClassDecl::new(kind, name, span);
    decl.modifiers = modifiers;
    if c.is_op(OperatorId::Lt) {
        decl.type_params = parse_type_params(c, arena)?;
    }
    if kind.has_components() {
        decl.components = parse_components(c, arena)?;
    }
    if c.eat_keyword(KeywordId::Extends) {
        decl.extends = parse_type_list(c, arena)?;
    }
    if c.eat_keyword(KeywordId::Implements) {
        decl.implements = parse_type_list(c, arena)?;
    }
    if c.eat_contextual("permits") {
        parse_type_list(c, arena)?;
    }
    if !c.is_punct(PunctuationId::LBrace) {
        return Err(c.unexpected("`{`"));
    }
    let inner = c.skip_group()?;
    let mut body = c.sub(inner);
    parse_body(&mut body, &mut decl, arena)?;
    Ok(decl)
}

/// Skip a whole class declaration without recording anything; returns its simple name.
pub(super) fn skip_class_decl(c: &mut Cursor<'_>) -> Result<String, SyntaxError> {
    parse_modifiers(c)?;
    parse_kind(c)?;
    let (name, _) = c.expect_ident()?;
    skip_class_rest(c)?;
    Ok(name)
}

/// Skip from after the kind keyword to the end of the class body.
fn skip_class_rest(c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
    c.skip_until(&[PunctuationId::LBrace]);
    if !c.is_punct(PunctuationId::LBrace) {
        return Err(c.unexpected("`{`"));
    }
    c.skip_group()?;
    Ok(())
}

fn parse_components(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<Vec<ComponentDecl>, SyntaxError> {
    if !c.is_punct(PunctuationId::LParen) {
        return Err(c.unexpected("`(`"));
    }
    let inner = c.skip_group()?;
    let mut sub = c.sub(inner);
    let mut components = Vec::new();
    while !sub.at_end() {
        let mods = parse_modifiers(&mut sub)?;
        let ty = parse_type(&mut sub, arena)?;
        let (name, span) = sub.expect_ident()?;
        components.push(ComponentDecl {
            name,
            ty,
            annotations: mods.annotations,
            span,
        });
        if !sub.eat_punct(PunctuationId::Comma) && !sub.at_end() {
            return Err(sub.unexpected("`,` or `)`"));
        }
    }
    Ok(components)
}

/// Members of a class body; `c` covers the tokens inside the braces.
pub(super) fn parse_body(c: &mut Cursor<'_>, decl: &mut ClassDecl, arena: &mut TypeArena) -> Result<(), SyntaxError> {
    if decl.kind == ClassKind::Enum {
        parse_enum_constants(c, decl)?;
    }
    while !c.at_end() {
        if c.eat_punct(PunctuationId::Semicolon) {
            continue;
        }
        let start = c.pos();
        let is_static_block = c.is_keyword(KeywordId::Static) && c.nth(1).kind.is_punctuation(PunctuationId::LBrace);
        if is_static_block || c.is_punct(PunctuationId::LBrace) {
            let is_static = c.eat_keyword(KeywordId::Static);
            let span = c.span();
            let body = c.skip_group()?;
            decl.initializers.push(InitializerDecl { is_static, body, span });
            continue;
        }
        let mods = parse_modifiers(c)?;
        if at_class_kind(c) {
            let mut probe = c.sub(TokenRange::new(c.pos(), c.end()));
            parse_kind(&mut probe)?;
            let (simple_name, span) = probe.expect_ident()?;
            skip_class_rest(&mut probe)?;
            c.reset(probe.pos());
            decl.member_classes.push(MemberClassDecl {
                simple_name,
                range: TokenRange::new(start, c.pos()),
                span,
            });
            continue;
        }
        parse_member(c, decl, arena, mods)?;
    }
    Ok(())
}

fn parse_enum_constants(c: &mut Cursor<'_>, decl: &mut ClassDecl) -> Result<(), SyntaxError> {
    loop {
        let mut annotations = Vec::new();
        while at_annotation(c) {
            annotations.push(parse_annotation_use(c)?);
        }
        if !c.is_ident() {
            if !annotations.is_empty() {
                return Err(c.unexpected("enum constant"));
            }
            break;
        }
        let (name, span) = c.expect_ident()?;
        let args = if c.is_punct(PunctuationId::LParen) {
            let open = c.pos();
            c.skip_group()?;
            Some(TokenRange::new(open, c.pos()))
        } else {
            None
        };
        let body = if c.is_punct(PunctuationId::LBrace) { Some(c.skip_group()?) } else { None };
        decl.constants.push(EnumConstantDecl {
            name,
            annotations,
            span,
            args,
            body,
        });
        if !c.eat_punct(PunctuationId::Comma) {
            break;
        }
    }
    if !c.at_end() {
        c.expect_punct(PunctuationId::Semicolon)?;
    }
    Ok(())
}

/// A constructor, method or field declaration after its modifiers.
fn parse_member(
    c: &mut Cursor<'_>,
    decl: &mut ClassDecl,
    arena: &mut TypeArena,
    modifiers: Modifiers,
) -> Result<(), SyntaxError> {
    let type_params = if c.is_op(OperatorId::Lt) { parse_type_params(c, arena)? } else { Vec::new() };
    let named_like_class = c.kind().ident() == Some(decl.simple_name.as_str());
    if named_like_class && c.nth(1).kind.is_punctuation(PunctuationId::LParen) {
        let span = c.bump().span;
        let method = parse_method(c, arena, modifiers, type_params, None, well_known::CONSTRUCTOR.to_string(), span)?;
        decl.methods.push(method);
        return Ok(());
    }
    if named_like_class && decl.kind == ClassKind::Record && c.nth(1).kind.is_punctuation(PunctuationId::LBrace) {
        let span = c.bump().span;
        let body = c.skip_group()?;
        decl.methods.push(MethodDecl {
            name: well_known::CONSTRUCTOR.to_string(),
            modifiers,
            type_params,
            params: decl.components.iter().map(component_param).collect(),
            ret: None,
            throws: Vec::new(),
            body: Some(body),
            default_value: None,
            span,
            compact: true,
        });
        return Ok(());
    }

    let ty = parse_type(c, arena)?;
    let (name, span) = c.expect_ident()?;
    if c.is_punct(PunctuationId::LParen) {
        let method = parse_method(c, arena, modifiers, type_params, Some(ty), name, span)?;
        decl.methods.push(method);
        return Ok(());
    }
    if !type_params.is_empty() {
        return Err(c.unexpected("`(`"));
    }
    parse_fields(c, decl, arena, modifiers, ty, name, span)
}

#[allow(clippy::too_many_arguments)]
fn parse_method(
    c: &mut Cursor<'_>,
    arena: &mut TypeArena,
    modifiers: Modifiers,
    type_params: Vec<TypeParamSyntax>,
    ret: Option<TypeRef>,
    name: String,
    span: Span,
) -> Result<MethodDecl, SyntaxError> {
    let params = parse_params(c, arena)?;
    let extra = parse_dims(c);
    let ret = ret.map(|r| with_dims(arena, r, extra));
    let throws = if c.eat_keyword(KeywordId::Throws) { parse_type_list(c, arena)? } else { Vec::new() };
    let default_value = if c.eat_keyword(KeywordId::Default) {
        let value = c.skip_until(&[PunctuationId::Semicolon]);
        if value.is_empty() {
            return Err(c.unexpected("element value"));
        }
        Some(value)
    } else {
        None
    };
    let body = if c.is_punct(PunctuationId::LBrace) {
        Some(c.skip_group()?)
    } else {
        c.expect_punct(PunctuationId::Semicolon)?;
        None
    };
    Ok(MethodDecl {
        name,
        modifiers,
        type_params,
        params,
        ret,
        throws,
        body,
        default_value,
        span,
        compact: false,
    })
}

/// `(final int a, String... rest)`; a receiver parameter (`Foo this`) is dropped.
fn parse_params(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<Vec<ParamDecl>, SyntaxError> {
    if !c.is_punct(PunctuationId::LParen) {
        return Err(c.unexpected("`(`"));
    }
    let inner = c.skip_group()?;
    let mut sub = c.sub(inner);
    let mut params = Vec::new();
    while !sub.at_end() {
        let modifiers = parse_modifiers(&mut sub)?;
        let ty = parse_type(&mut sub, arena)?;
        let varargs = sub.eat_punct(PunctuationId::Ellipsis);
        if sub.eat_keyword(KeywordId::This) {
            // receiver parameter
        } else {
            let (name, span) = sub.expect_ident()?;
            let extra = parse_dims(&mut sub);
            params.push(ParamDecl {
                name,
                modifiers,
                ty: with_dims(arena, ty, extra),
                varargs,
                span,
            });
        }
        if !sub.eat_punct(PunctuationId::Comma) && !sub.at_end() {
            return Err(sub.unexpected("`,` or `)`"));
        }
    }
    Ok(params)
}

/// `T a = x, b[], c;`
fn parse_fields(
    c: &mut Cursor<'_>,
    decl: &mut ClassDecl,
    arena: &mut TypeArena,
    modifiers: Modifiers,
    ty: TypeRef,
    mut name: String,
    mut span: Span,
) -> Result<(), SyntaxError> {
    loop {
        let extra = parse_dims(c);
        let init = if c.eat_op(OperatorId::Assign) {
            let value = skip_initializer(c);
            if value.is_empty() {
                return Err(c.unexpected("initializer"));
            }
            Some(value)
        } else {
            None
        };
        decl.fields.push(FieldDecl {
            name,
            modifiers: modifiers.clone(),
            ty: with_dims(arena, ty, extra),
            span,
            init,
            from_component: false,
        });
        if !c.eat_punct(PunctuationId::Comma) {
            break;
        }
        (name, span) = c.expect_ident()?;
    }
    c.expect_punct(PunctuationId::Semicolon)?;
    Ok(())
}

/// Skip one declarator's initializer. A comma only ends it when another declarator (`name =`, `name,`, `name;` or
/// `name[`) follows, so type arguments such as `new HashMap<K, V>()` stay inside.
pub(super) fn skip_initializer(c: &mut Cursor<'_>) -> TokenRange {
    let start = c.pos();
    loop {
        c.skip_until(&[PunctuationId::Comma, PunctuationId::Semicolon]);
        if c.is_punct(PunctuationId::Comma) && !starts_declarator(c) {
            c.bump();
            continue;
        }
        return TokenRange::new(start, c.pos());
    }
}

fn starts_declarator(c: &Cursor<'_>) -> bool {
    let after = &c.nth(2).kind;
    c.nth(1).kind.ident().is_some()
        && (after.is_operator(OperatorId::Assign)
            || after.is_punctuation(PunctuationId::Comma)
            || after.is_punctuation(PunctuationId::Semicolon)
            || after.is_punctuation(PunctuationId::LBracket)
            || matches!(after, TokenKind::Eof))
}

/// `ty` with `extra` more array dimensions (`int a[]`).
pub(super) fn with_dims(arena: &mut TypeArena, ty: TypeRef, extra: u8) -> TypeRef {
    if extra == 0 {
        return ty;
    }
    let span = arena.span(ty);
    let node = match arena.node(ty).clone() {
        TypeNode::Primitive { kind, dims } => TypeNode::Primitive {
            kind,
            dims: dims.saturating_add(extra),
        },
        TypeNode::Named { segments, dims } => TypeNode::Named {
            segments,
            dims: dims.saturating_add(extra),
        },
        wildcard @ TypeNode::Wildcard { .. } => wildcard,
    };
    arena.intern(node, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::SourceFile;
    use crate::unit::test_support::{codes, compile};

    fn structure(ctx: &GlobalContext, text: &str) -> Vec<CompileUnit> {
        let mut unit = CompileUnit::new(SourceFile::new("T.java".into(), text.into()));
        unit.stage0(ctx).unwrap();
        let more = unit.stage1(ctx).unwrap();
        let mut all = vec![unit];
        all.extend(more);
        all
    }

    #[test]
    fn test_members_and_tasks() {
        let ctx = GlobalContext::new();
        let units = structure(
            &ctx,
            "package p; public class A<T> { int a = 1, b[], c; static { } A(int x) { } <U> U pick(U... us) { return us[0]; } }",
        );
        let unit = &units[0];
        let decl = unit.decl().unwrap();
        assert_eq!(unit.name(), "p/A");
        assert_eq!(decl.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(unit.node().fields[1].ty, Type::primitive(PrimitiveKind::Int).with_dims(1));
        assert_eq!(decl.methods.len(), 2);
        assert!(has(unit.node().methods[1].access, ACC_VARARGS));
        assert_eq!(unit.node().type_param_count(), 1);
        let tasks: Vec<_> = unit.deferred().copied().collect();
        assert_eq!(
            tasks,
            [DeferredTask::FieldInit(0), DeferredTask::Initializer(0), DeferredTask::Body(0), DeferredTask::Body(1)]
        );
        assert!(ctx.class_exists("p/A"));
    }

    #[test]
    fn test_generic_initializer_keeps_its_commas() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "class A { java.util.Map<String, Integer> m = new java.util.HashMap<String, Integer>(), n; }");
        let fields = &units[0].decl().unwrap().fields;
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name, "n");
    }

    #[test]
    fn test_member_classes_become_units() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "package p; class Outer { private static class In { class Deep {} } interface I {} }");
        let names: Vec<_> = units.iter().map(|u| u.name()).collect();
        assert_eq!(names, ["p/Outer", "p/Outer$In", "p/Outer$In$Deep", "p/Outer$I"]);
        let inner = units[1].node().inner_entry().unwrap();
        assert_eq!(inner.outer.as_deref(), Some("p/Outer"));
        assert!(has(inner.access, ACC_PRIVATE | ACC_STATIC));
        assert!(!has(units[1].node().access, ACC_PRIVATE));
        assert!(has(units[3].node().declared_access(), ACC_STATIC | ACC_INTERFACE));
    }

    #[test]
    fn test_sibling_top_level_classes() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "class A {} ; class B extends A {}");
        assert_eq!(units.iter().map(|u| u.name()).collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn test_record_synthesis() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "record P(int x, String name) { P { } public int x() { return x; } }");
        let node = units[0].node();
        assert!(node.is_final());
        assert_eq!(node.parent.as_deref(), Some(well_known::RECORD));
        assert_eq!(node.fields.len(), 2);
        assert!(has(node.fields[0].access, ACC_PRIVATE | ACC_FINAL));
        assert_eq!(node.methods_named(well_known::CONSTRUCTOR).count(), 1);
        assert_eq!(node.methods_named("x").count(), 1);
        assert_eq!(node.methods_named("name").count(), 1);
        assert_eq!(node.methods_named("equals").next().unwrap().params, [Type::class("java/lang/Object")]);
    }

    #[test]
    fn test_enum_synthesis() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "package p; enum Color { RED, GREEN(1) { }, BLUE; Color() {} Color(int x) {} }");
        let node = units[0].node();
        assert!(node.is_enum());
        assert!(!node.is_final());
        let red = node.field("RED").unwrap();
        assert!(has(red.access, ACC_PUBLIC | ACC_STATIC | ACC_FINAL | ACC_ENUM));
        assert_eq!(red.ty, Type::class("p/Color"));
        assert!(node.methods_named(well_known::CONSTRUCTOR).all(|m| has(m.access, ACC_PRIVATE)));
        assert_eq!(node.methods_named("values").next().unwrap().ret, Type::class("p/Color").with_dims(1));
        let decl = units[0].decl().unwrap();
        assert!(decl.constants[1].args.is_some());
        assert!(decl.constants[1].body.is_some());
    }

    #[test]
    fn test_interface_members_get_implicit_flags() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "interface I { int N = 1; void run(); default void twice() { run(); } private void h() {} }");
        let node = units[0].node();
        assert!(has(node.access, ACC_INTERFACE | ACC_ABSTRACT));
        assert!(has(node.fields[0].access, ACC_PUBLIC | ACC_STATIC | ACC_FINAL));
        assert!(has(node.methods[0].access, ACC_PUBLIC | ACC_ABSTRACT));
        assert!(!has(node.methods[1].access, ACC_ABSTRACT));
        assert!(has(node.methods[2].access, ACC_PRIVATE));
    }

    #[test]
    fn test_annotation_type() {
        let ctx = GlobalContext::new();
        let units = structure(&ctx, "@interface Tag { String value() default \"x\"; int[] ids() default {}; }");
        let node = units[0].node();
        assert!(node.is_annotation());
        assert_eq!(node.interfaces, [well_known::ANNOTATION]);
        assert!(units[0].deferred().all(|t| matches!(t, DeferredTask::AnnotationDefault(_))));
        assert_eq!(units[0].deferred().count(), 2);
    }

    #[test]
    fn test_malformed_member_is_a_syntax_error() {
        let ctx = GlobalContext::new();
        let units = compile(&ctx, &[("A.java", "class A { int ; }")]);
        assert!(units[0].is_failed());
        assert_eq!(codes(&ctx), [codes::SYNTAX]);
    }

    #[test]
    fn test_files_without_declarations_yield_no_units() {
        let ctx = GlobalContext::new();
        let units = compile(
            &ctx,
            &[
                ("Empty.java", ""),
                ("Imports.java", "package p; import java.util.List; ;"),
                ("A.java", "package p; class A {}"),
            ],
        );
        assert!(codes(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        assert_eq!(units.iter().map(|u| u.name()).collect::<Vec<_>>(), ["p/A"]);
    }

    #[test]
    fn test_duplicate_unit_is_fatal() {
        let ctx = GlobalContext::new();
        let mut a = CompileUnit::new(SourceFile::new("A.java".into(), "class A {}".into()));
        let mut b = CompileUnit::new(SourceFile::new("B.java".into(), "class A {}".into()));
        a.stage0(&ctx).unwrap();
        b.stage0(&ctx).unwrap();
        a.stage1(&ctx).unwrap();
        assert!(matches!(b.stage1(&ctx), Err(StageError::Session(_))));
        assert_eq!(codes(&ctx), [codes::CLASS_DUPLICATE_UNIT]);
    }
}
