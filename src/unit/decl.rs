//! Declaration skeletons recorded by the structure stage.
//!
//! Types are kept as [`TypeRef`]s into the unit's arena and bodies as token ranges; nothing here is resolved.

use lava_syntax::Span;

use super::cursor::TokenRange;
use crate::types::TypeRef;

/// The closed set of class kinds a declaration can introduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    /// Lava extension: a final class with public fields and a canonical constructor.
    Struct,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::Record => "record",
            ClassKind::Annotation => "@interface",
            ClassKind::Struct => "struct",
        }
    }

    pub fn is_interface_like(self) -> bool {
        matches!(self, ClassKind::Interface | ClassKind::Annotation)
    }

    /// Kinds whose header carries a component list (`record P(int x)`).
    pub fn has_components(self) -> bool {
        matches!(self, ClassKind::Record | ClassKind::Struct)
    }
}

/// `@Name(...)` as written.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUse {
    /// Written (possibly dotted) name.
    pub name: String,
    pub span: Span,
    /// `(element, value tokens)`; the element is `None` for the single-value shorthand.
    pub args: Vec<(Option<String>, TokenRange)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub flags: u16,
    pub annotations: Vec<AnnotationUse>,
    /// `default` on an interface method.
    pub default: bool,
    pub span: Option<Span>,
    /// Modifiers written more than once, with the span of the repetition.
    pub repeated: Vec<(&'static str, Span)>,
}

impl Modifiers {
    pub fn has(&self, flag: u16) -> bool {
        lava_core::access::has(self.flags, flag)
    }

    /// Span of the first modifier or annotation, falling back to `or`.
    pub fn span_or(&self, or: Span) -> Span {
        self.span.unwrap_or(or)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamSyntax {
    pub name: String,
    pub bounds: Vec<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub span: Span,
    pub init: Option<TokenRange>,
    /// Synthesized from a record or struct component.
    pub from_component: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub varargs: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// `<init>` for constructors.
    pub name: String,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParamSyntax>,
    pub params: Vec<ParamDecl>,
    /// `None` for constructors.
    pub ret: Option<TypeRef>,
    pub throws: Vec<TypeRef>,
    pub body: Option<TokenRange>,
    /// `default` clause of an annotation element.
    pub default_value: Option<TokenRange>,
    pub span: Span,
    /// Compact canonical constructor of a record (`R { ... }`).
    pub compact: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstantDecl {
    pub name: String,
    pub annotations: Vec<AnnotationUse>,
    pub span: Span,
    /// `(...)` including the parentheses.
    pub args: Option<TokenRange>,
    pub body: Option<TokenRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerDecl {
    pub is_static: bool,
    pub body: TokenRange,
    pub span: Span,
}

/// Header component of a record or struct.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDecl {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<AnnotationUse>,
    pub span: Span,
}

/// A member class found in a class body; it becomes its own unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberClassDecl {
    pub simple_name: String,
    pub range: TokenRange,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub simple_name: String,
    pub name_span: Span,
    pub type_params: Vec<TypeParamSyntax>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub components: Vec<ComponentDecl>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constants: Vec<EnumConstantDecl>,
    pub initializers: Vec<InitializerDecl>,
    pub member_classes: Vec<MemberClassDecl>,
}

impl ClassDecl {
    pub fn new(kind: ClassKind, simple_name: impl Into<String>, name_span: Span) -> Self {
        Self {
            kind,
            modifiers: Modifiers::default(),
            simple_name: simple_name.into(),
            name_span,
            type_params: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            components: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            initializers: Vec::new(),
            member_classes: Vec::new(),
        }
    }

    pub fn declares_constructor(&self) -> bool {
        self.methods.iter().any(|m| m.name == lava_core::lang::well_known::CONSTRUCTOR)
    }
}
