//! Diagnostics and error reporting for Lava.
//!
//! A [`Diagnostic`] is a plain value: the unit it belongs to, an ordered [`Severity`], a byte-offset span, a catalog
//! `code` and positional arguments. Turning the code into prose is the consumer's job; [`message`] provides the
//! English catalog and [`Diagnostic::render`] draws a `miette` report with the source line underneath.

use std::fmt;

use miette::{GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::span::{Span, line_col};

/// Ordered severity. `Error` and above set the session error latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    SevereWarning,
    Error,
}

impl Severity {
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::SevereWarning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A lexical or structural error. Aborts the remaining stages of the unit that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Internal name of the compile unit (or library) the problem belongs to.
    pub unit: String,
    pub severity: Severity,
    pub span: Span,
    pub code: &'static str,
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new(unit: impl Into<String>, severity: Severity, span: Span, code: &'static str, args: Vec<String>) -> Self {
        Self {
            unit: unit.into(),
            severity,
            span,
            code,
            args,
        }
    }

    /// Wrap a syntax error reported against `unit`.
    pub fn from_syntax(unit: impl Into<String>, err: &SyntaxError) -> Self {
        Self::new(unit, Severity::Error, err.span, codes::SYNTAX, vec![err.message.clone()])
    }

    /// Byte offset the diagnostic points at.
    pub fn pos(&self) -> usize {
        self.span.start
    }

    /// English message from the catalog.
    pub fn message(&self) -> String {
        message(self.code, &self.args)
    }

    /// `file:line:col: severity: message`, without source context.
    pub fn format_short(&self, file_name: &str, source: &str) -> String {
        let (line, col) = line_col(source, self.span.start);
        format!("{file_name}:{line}:{col}: {}: {}", self.severity, self.message())
    }

    /// Render with the offending source line using `miette`'s graphical handler (no colors).
    pub fn render(&self, file_name: &str, source: &str) -> String {
        let report = Report {
            diagnostic: self,
            message: self.message(),
            source: NamedSource::new(file_name, source.to_string()),
        };
        let mut out = String::new();
        let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
        if handler.render_report(&mut out, &report).is_err() {
            return self.format_short(file_name, source);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}: {}", self.unit, self.span.start, self.severity, self.message())
    }
}

/// Adapter that lets `miette` draw a [`Diagnostic`].
#[derive(Debug)]
struct Report<'a> {
    diagnostic: &'a Diagnostic,
    message: String,
    source: NamedSource<String>,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Report<'_> {}

impl miette::Diagnostic for Report<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        Some(Box::new(self.diagnostic.code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            Severity::Note => miette::Severity::Advice,
            Severity::Warning | Severity::SevereWarning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        })
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.diagnostic.span;
        let span = if span.is_empty() { Span::new(span.start, span.start + 1) } else { span };
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(None, span))))
    }
}

// ============================================================================
// Message catalog
// ============================================================================

/// Catalog keys. Grouped by the component that reports them.
pub mod codes {
    pub const SYNTAX: &str = "syntax.error";

    pub const IMPORT_DUPLICATE: &str = "import.duplicate";
    pub const IMPORT_UNRESOLVED: &str = "import.unresolved";
    pub const IMPORT_CONFLICT: &str = "import.conflict";

    pub const SYMBOL_UNRESOLVED: &str = "symbol.unresolved";
    pub const SYMBOL_AMBIGUOUS: &str = "symbol.ambiguous";

    pub const CLASS_PARENT_UNRESOLVED: &str = "class.parent_unresolved";
    pub const CLASS_INTERFACE_UNRESOLVED: &str = "class.interface_unresolved";
    pub const CLASS_FINAL_PARENT: &str = "class.final_parent";
    pub const CLASS_PARENT_IS_INTERFACE: &str = "class.parent_is_interface";
    pub const CLASS_INTERFACE_EXPECTED: &str = "class.interface_expected";
    pub const CLASS_CYCLIC: &str = "class.cyclic";
    pub const CLASS_DUPLICATE_UNIT: &str = "class.duplicate_unit";
    pub const CLASS_INACCESSIBLE: &str = "class.inaccessible";
    pub const CLASS_ABSTRACT_INSTANTIATION: &str = "class.abstract_instantiation";

    pub const MODIFIER_ILLEGAL: &str = "modifier.illegal";
    pub const MODIFIER_REPEATED: &str = "modifier.repeated";
    pub const MODIFIER_CONFLICT: &str = "modifier.conflict";

    pub const MEMBER_DUPLICATE_FIELD: &str = "member.duplicate_field";
    pub const MEMBER_DUPLICATE_METHOD: &str = "member.duplicate_method";
    pub const MEMBER_INACCESSIBLE: &str = "member.inaccessible";
    pub const MEMBER_FIELD_NOT_FOUND: &str = "member.field_not_found";
    pub const MEMBER_METHOD_NOT_FOUND: &str = "member.method_not_found";
    pub const MEMBER_NOT_STATIC: &str = "member.not_static";
    pub const CTOR_NO_DEFAULT_SUPER: &str = "ctor.no_default_super";

    pub const GENERIC_ARITY: &str = "generic.arity";
    pub const GENERIC_BOUND: &str = "generic.bound";
    pub const GENERIC_STATIC_THROUGH_PARAM: &str = "generic.static_through_param";
    pub const GENERIC_PRIMITIVE_ARG: &str = "generic.primitive_arg";
    pub const GENERIC_NOT_GENERIC: &str = "generic.not_generic";

    pub const CAST_FORBIDDEN: &str = "cast.forbidden";
    pub const CAST_NEEDS_EXPLICIT: &str = "cast.needs_explicit";
    pub const CAST_LOSSY: &str = "cast.lossy";
    pub const CAST_UNCHECKED: &str = "cast.unchecked";

    pub const ANNOTATION_NOT_APPLICABLE: &str = "annotation.not_applicable";
    pub const ANNOTATION_NOT_ANNOTATION: &str = "annotation.not_annotation";
    pub const ANNOTATION_REPEATED: &str = "annotation.repeated";
    pub const ANNOTATION_UNKNOWN_ELEMENT: &str = "annotation.unknown_element";
    pub const ANNOTATION_MISSING_ELEMENT: &str = "annotation.missing_element";

    pub const DOTGET_UNRESOLVED: &str = "dotget.unresolved";

    pub const EXPR_UNRESOLVED_NAME: &str = "expr.unresolved_name";
    pub const EXPR_BAD_OPERAND: &str = "expr.bad_operand";
    pub const EXPR_DIV_BY_ZERO: &str = "expr.div_by_zero";
    pub const EXPR_NOT_CONSTANT: &str = "expr.not_constant";
    pub const EXPR_INT_OVERFLOW: &str = "expr.int_overflow";
    pub const EXPR_VOID_VALUE: &str = "expr.void_value";
    pub const STMT_MISSING_RETURN_VALUE: &str = "stmt.missing_return_value";
    pub const STMT_UNEXPECTED_RETURN_VALUE: &str = "stmt.unexpected_return_value";
    pub const STMT_DUPLICATE_LOCAL: &str = "stmt.duplicate_local";
    pub const ENUM_CONSTANT_ARGS: &str = "enum.constant_args";
}

/// Resolve a catalog key to an English message, substituting `{0}`, `{1}`, ... with `args`.
pub fn message(code: &str, args: &[String]) -> String {
    let template = match code {
        codes::SYNTAX => "{0}",
        codes::IMPORT_DUPLICATE => "duplicate import `{0}`",
        codes::IMPORT_UNRESOLVED => "cannot resolve import `{0}`",
        codes::IMPORT_CONFLICT => "`{0}` is imported from both `{1}` and `{2}`",
        codes::SYMBOL_UNRESOLVED => "cannot find class `{0}`",
        codes::SYMBOL_AMBIGUOUS => "reference to `{0}` is ambiguous: {1}",
        codes::CLASS_PARENT_UNRESOLVED => "cannot find parent class `{0}` of `{1}`",
        codes::CLASS_INTERFACE_UNRESOLVED => "cannot find interface `{0}` of `{1}`",
        codes::CLASS_FINAL_PARENT => "cannot inherit from final class `{0}`",
        codes::CLASS_PARENT_IS_INTERFACE => "`{0}` is an interface; use `implements`",
        codes::CLASS_INTERFACE_EXPECTED => "`{0}` is not an interface",
        codes::CLASS_CYCLIC => "cyclic inheritance involving `{0}`",
        codes::CLASS_DUPLICATE_UNIT => "duplicate class `{0}`",
        codes::CLASS_INACCESSIBLE => "class `{0}` is {1} and cannot be accessed here",
        codes::CLASS_ABSTRACT_INSTANTIATION => "`{0}` is abstract; cannot be instantiated",
        codes::MODIFIER_ILLEGAL => "modifier `{0}` not allowed on {1}",
        codes::MODIFIER_REPEATED => "repeated modifier `{0}`",
        codes::MODIFIER_CONFLICT => "illegal combination of modifiers `{0}` and `{1}`",
        codes::MEMBER_DUPLICATE_FIELD => "field `{0}` is already defined",
        codes::MEMBER_DUPLICATE_METHOD => "method `{0}{1}` is already defined",
        codes::MEMBER_INACCESSIBLE => "`{0}.{1}` is {2} and cannot be accessed here",
        codes::MEMBER_FIELD_NOT_FOUND => "cannot find field `{1}` in `{0}`",
        codes::MEMBER_METHOD_NOT_FOUND => "cannot find method `{1}` in `{0}`",
        codes::MEMBER_NOT_STATIC => "non-static `{0}` cannot be referenced from a static context",
        codes::CTOR_NO_DEFAULT_SUPER => "parent class `{0}` has no accessible no-argument constructor",
        codes::GENERIC_ARITY => "wrong number of type arguments for `{0}`: expected {1}, found {2}",
        codes::GENERIC_BOUND => "type argument `{0}` is not within bound `{1}`",
        codes::GENERIC_STATIC_THROUGH_PARAM => "cannot select static class `{0}` from a parameterized type",
        codes::GENERIC_PRIMITIVE_ARG => "type argument cannot be primitive: `{0}`",
        codes::GENERIC_NOT_GENERIC => "`{0}` does not take type parameters",
        codes::CAST_FORBIDDEN => "incompatible types: `{0}` cannot be converted to `{1}`",
        codes::CAST_NEEDS_EXPLICIT => "possible lossy conversion from `{0}` to `{1}`",
        codes::CAST_LOSSY => "narrowing conversion from `{0}` to `{1}`",
        codes::CAST_UNCHECKED => "unchecked cast from `{0}` to `{1}`",
        codes::ANNOTATION_NOT_APPLICABLE => "annotation `{0}` is not applicable to {1}",
        codes::ANNOTATION_NOT_ANNOTATION => "`{0}` is not an annotation type",
        codes::ANNOTATION_REPEATED => "annotation `{0}` is not repeatable",
        codes::ANNOTATION_UNKNOWN_ELEMENT => "annotation `{0}` has no element `{1}`",
        codes::ANNOTATION_MISSING_ELEMENT => "annotation `{0}` is missing a value for element `{1}`",
        codes::DOTGET_UNRESOLVED => "cannot resolve `{0}`: {1}",
        codes::EXPR_UNRESOLVED_NAME => "cannot find symbol `{0}`",
        codes::EXPR_BAD_OPERAND => "bad operand types for `{0}`: `{1}` and `{2}`",
        codes::EXPR_DIV_BY_ZERO => "division by zero in constant expression",
        codes::EXPR_NOT_CONSTANT => "element value must be a constant expression",
        codes::EXPR_INT_OVERFLOW => "integer literal `{0}` is out of range",
        codes::EXPR_VOID_VALUE => "`void` cannot be used as a value",
        codes::STMT_MISSING_RETURN_VALUE => "missing return value",
        codes::STMT_UNEXPECTED_RETURN_VALUE => "cannot return a value from a method with `void` result",
        codes::STMT_DUPLICATE_LOCAL => "variable `{0}` is already defined in this scope",
        codes::ENUM_CONSTANT_ARGS => "no constructor of `{0}` takes {1} argument(s)",
        _ => return format!("{code} {}", args.join(" ")),
    };
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::SevereWarning);
        assert!(Severity::SevereWarning < Severity::Error);
        assert!(!Severity::SevereWarning.is_error());
    }

    #[test]
    fn test_message_substitution() {
        let msg = message(codes::GENERIC_ARITY, &["java/util/List".into(), "1".into(), "2".into()]);
        assert_eq!(msg, "wrong number of type arguments for `java/util/List`: expected 1, found 2");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(message("x.y", &["a".into()]), "x.y a");
    }

    #[test]
    fn test_format_short() {
        let d = Diagnostic::new("A", Severity::Error, Span::new(12, 15), codes::SYMBOL_UNRESOLVED, vec!["Foo".into()]);
        insta::assert_snapshot!(d.format_short("A.java", "class A {\n  Foo f;\n}"), @"A.java:2:3: error: cannot find class `Foo`");
    }
}
