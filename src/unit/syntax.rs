//! Shared declaration-level syntax: written types, modifiers, annotation uses and type-parameter lists.
//!
//! These are the pieces both the structure stage and the statement checker need. Everything here only reads
//! tokens; nothing is resolved.

use lava_core::access::*;
use lava_core::lang::keywords::{self, KeywordId};
use lava_core::lang::operators::OperatorId;
use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::punctuation::PunctuationId;
use lava_syntax::SyntaxError;
use lava_syntax::lexer::TokenKind;

use super::cursor::Cursor;
use super::decl::{AnnotationUse, Modifiers, TypeParamSyntax};
use crate::types::arena::Segment;
use crate::types::{TypeArena, TypeNode, TypeRef, WildcardBound};

/// Access flag for a modifier keyword. `default` has no flag and is handled separately.
fn modifier_flag(id: KeywordId) -> Option<u16> {
    Some(match id {
        KeywordId::Public => ACC_PUBLIC,
        KeywordId::Protected => ACC_PROTECTED,
        KeywordId::Private => ACC_PRIVATE,
        KeywordId::Static => ACC_STATIC,
        KeywordId::Final => ACC_FINAL,
        KeywordId::Abstract => ACC_ABSTRACT,
        KeywordId::Native => ACC_NATIVE,
        KeywordId::Synchronized => ACC_SYNCHRONIZED,
        KeywordId::Transient => ACC_TRANSIENT,
        KeywordId::Volatile => ACC_VOLATILE,
        KeywordId::Strictfp => ACC_STRICT,
        _ => return None,
    })
}

/// Primitive kind named by a keyword token (`int`, `void`, ...).
pub fn primitive_keyword(kind: &TokenKind) -> Option<PrimitiveKind> {
    match kind {
        TokenKind::Keyword(k) => PrimitiveKind::from_name(keywords::as_str(*k)),
        _ => None,
    }
}

/// Return `true` if the cursor sits on something that can start a type.
pub fn at_type_start(c: &Cursor<'_>) -> bool {
    c.is_ident() || primitive_keyword(c.kind()).is_some()
}

/// Return `true` if an annotation use (not `@interface`) starts at the cursor.
pub fn at_annotation(c: &Cursor<'_>) -> bool {
    c.is_punct(PunctuationId::At) && !c.nth(1).kind.is_keyword(KeywordId::Interface)
}

/// Parse modifiers and annotation uses in any order.
pub fn parse_modifiers(c: &mut Cursor<'_>) -> Result<Modifiers, SyntaxError> {
    let mut mods = Modifiers::default();
    loop {
        let span = c.span();
        if at_annotation(c) {
            mods.annotations.push(parse_annotation_use(c)?);
        } else if let TokenKind::Keyword(k) = *c.kind() {
            if k == KeywordId::Default {
                // `default:` in a switch is not a modifier; the caller never asks for modifiers there.
                if mods.default {
                    mods.repeated.push(("default", span));
                }
                mods.default = true;
            } else if let Some(flag) = modifier_flag(k) {
                if has(mods.flags, flag) {
                    mods.repeated.push((keywords::as_str(k), span));
                }
                mods.flags |= flag;
            } else {
                break;
            }
            c.bump();
        } else if c.kind().is_contextual("sealed")
            && (matches!(c.nth(1).kind, TokenKind::Keyword(_))
                || c.nth(1).kind.is_contextual("record")
                || c.nth(1).kind.is_contextual("struct"))
        {
            c.bump();
        } else if c.kind().is_contextual("non")
            && c.nth(1).kind.is_operator(OperatorId::Minus)
            && c.nth(2).kind.is_contextual("sealed")
        {
            c.bump();
            c.bump();
            c.bump();
        } else {
            break;
        }
        mods.span.get_or_insert(span);
    }
    Ok(mods)
}

/// Parse `@Name`, `@Name(value)` or `@Name(a = x, b = y)`.
pub fn parse_annotation_use(c: &mut Cursor<'_>) -> Result<AnnotationUse, SyntaxError> {
    let at = c.expect_punct(PunctuationId::At)?;
    let (mut name, mut span) = c.expect_ident()?;
    while c.is_punct(PunctuationId::Dot) && c.nth(1).kind.ident().is_some() {
        c.bump();
        let (seg, seg_span) = c.expect_ident()?;
        name.push('.');
        name.push_str(&seg);
        span = span.to(seg_span);
    }
    let mut args = Vec::new();
    if c.is_punct(PunctuationId::LParen) {
        let inner = c.skip_group()?;
        let mut sub = c.sub(inner);
        let named = sub.is_ident() && sub.nth(1).kind.is_operator(OperatorId::Assign);
        if !named && !sub.at_end() {
            args.push((None, inner));
        }
        while named && !sub.at_end() {
            let (element, _) = sub.expect_ident()?;
            sub.expect_op(OperatorId::Assign)?;
            let value = sub.skip_until(&[PunctuationId::Comma]);
            if value.is_empty() {
                return Err(sub.unexpected("element value"));
            }
            args.push((Some(element), value));
            if !sub.eat_punct(PunctuationId::Comma) && !sub.at_end() {
                return Err(sub.unexpected("`,` or `)`"));
            }
        }
    }
    Ok(AnnotationUse {
        name,
        span: at.to(span),
        args,
    })
}

/// Skip annotation uses, e.g. type annotations in front of a type.
pub fn skip_annotations(c: &mut Cursor<'_>) -> Result<(), SyntaxError> {
    while at_annotation(c) {
        parse_annotation_use(c)?;
    }
    Ok(())
}

/// Parse a written type into `arena`.
pub fn parse_type(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<TypeRef, SyntaxError> {
    skip_annotations(c)?;
    let start = c.span();
    let node = if let Some(kind) = primitive_keyword(c.kind()) {
        c.bump();
        TypeNode::Primitive {
            kind,
            dims: parse_dims(c),
        }
    } else {
        let mut segments = Vec::new();
        loop {
            let (name, _) = c.expect_ident()?;
            let args = if c.is_op(OperatorId::Lt) {
                parse_type_args(c, arena)?
            } else {
                Vec::new()
            };
            segments.push(Segment { name, args });
            if c.is_punct(PunctuationId::Dot) && c.nth(1).kind.ident().is_some() {
                c.bump();
            } else {
                break;
            }
        }
        TypeNode::Named {
            segments,
            dims: parse_dims(c),
        }
    };
    Ok(arena.intern(node, start.to(c.prev_span())))
}

/// Speculatively parse a type; on failure the cursor is left where it was.
pub fn try_parse_type(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Option<TypeRef> {
    if !at_type_start(c) {
        return None;
    }
    let start = c.pos();
    match parse_type(c, arena) {
        Ok(ty) => Some(ty),
        Err(_) => {
            c.reset(start);
            None
        }
    }
}

/// Consume `[]` pairs and return how many there were.
pub fn parse_dims(c: &mut Cursor<'_>) -> u8 {
    let mut dims = 0u8;
    while c.is_punct(PunctuationId::LBracket) && c.nth(1).kind.is_punctuation(PunctuationId::RBracket) {
        c.bump();
        c.bump();
        dims = dims.saturating_add(1);
    }
    dims
}

/// `<A, ? extends B, ? super C, ?>`; the diamond `<>` yields an empty list.
fn parse_type_args(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<Vec<TypeRef>, SyntaxError> {
    c.expect_op(OperatorId::Lt)?;
    let mut args = Vec::new();
    if c.eat_op(OperatorId::Gt) {
        return Ok(args);
    }
    loop {
        skip_annotations(c)?;
        if c.is_punct(PunctuationId::Question) {
            let span = c.bump().span;
            let (bound, ty) = if c.eat_keyword(KeywordId::Extends) {
                (WildcardBound::Extends, Some(parse_type(c, arena)?))
            } else if c.eat_keyword(KeywordId::Super) {
                (WildcardBound::Super, Some(parse_type(c, arena)?))
            } else {
                (WildcardBound::Unbounded, None)
            };
            args.push(arena.intern(TypeNode::Wildcard { bound, ty }, span.to(c.prev_span())));
        } else {
            args.push(parse_type(c, arena)?);
        }
        if !c.eat_punct(PunctuationId::Comma) {
            break;
        }
    }
    c.expect_op(OperatorId::Gt)?;
    Ok(args)
}

/// `<T, U extends Comparable<U> & Serializable>`
pub fn parse_type_params(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<Vec<TypeParamSyntax>, SyntaxError> {
    c.expect_op(OperatorId::Lt)?;
    let mut params = Vec::new();
    loop {
        skip_annotations(c)?;
        let (name, span) = c.expect_ident()?;
        let mut bounds = Vec::new();
        if c.eat_keyword(KeywordId::Extends) {
            bounds.push(parse_type(c, arena)?);
            while c.eat_op(OperatorId::Amp) {
                bounds.push(parse_type(c, arena)?);
            }
        }
        params.push(TypeParamSyntax { name, bounds, span });
        if !c.eat_punct(PunctuationId::Comma) {
            break;
        }
    }
    c.expect_op(OperatorId::Gt)?;
    Ok(params)
}

/// Parse a comma-separated type list (`extends A, B` / `implements C<D>`).
pub fn parse_type_list(c: &mut Cursor<'_>, arena: &mut TypeArena) -> Result<Vec<TypeRef>, SyntaxError> {
    let mut types = vec![parse_type(c, arena)?];
    while c.eat_punct(PunctuationId::Comma) {
        types.push(parse_type(c, arena)?);
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IType;
    use crate::unit::cursor::TokenRange;
    use lava_syntax::lexer::lex;

    fn with_cursor<T>(src: &str, f: impl FnOnce(&mut Cursor<'_>) -> T) -> T {
        let tokens = lex(src).unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        f(&mut c)
    }

    #[test]
    fn test_nested_generic_type() {
        let mut arena = TypeArena::new();
        let ty = with_cursor("Map<String, List<? extends Number>>[] x", |c| {
            let ty = parse_type(c, &mut arena).unwrap();
            assert_eq!(c.kind().ident(), Some("x"));
            ty
        });
        assert_eq!(arena.to_itype(ty).to_string(), "Map<String, List<? extends Number>>[]");
    }

    #[test]
    fn test_member_path_and_primitives() {
        let mut arena = TypeArena::new();
        let ty = with_cursor("Outer<String>.Inner", |c| parse_type(c, &mut arena).unwrap());
        assert_eq!(arena.to_itype(ty).to_string(), "Outer<String>.Inner");
        let ty = with_cursor("int[][]", |c| parse_type(c, &mut arena).unwrap());
        assert_eq!(arena.to_itype(ty), IType::primitive(PrimitiveKind::Int).with_dims(2));
    }

    #[test]
    fn test_try_parse_type_restores_position() {
        let mut arena = TypeArena::new();
        with_cursor("a < b ;", |c| {
            assert!(try_parse_type(c, &mut arena).is_none());
            assert_eq!(c.pos(), 0);
        });
    }

    #[test]
    fn test_modifiers_and_annotations() {
        let mods = with_cursor("@Deprecated(since = \"1\", forRemoval = true) public static public non-sealed class", |c| {
            let mods = parse_modifiers(c).unwrap();
            assert!(c.is_keyword(KeywordId::Class));
            mods
        });
        assert_eq!(mods.flags, ACC_PUBLIC | ACC_STATIC);
        assert_eq!(mods.repeated.len(), 1);
        assert_eq!(mods.annotations[0].name, "Deprecated");
        let names: Vec<_> = mods.annotations[0].args.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec![Some("since".to_string()), Some("forRemoval".to_string())]);
    }

    #[test]
    fn test_single_value_annotation() {
        let ann = with_cursor("@Target({ElementType.TYPE, ElementType.METHOD})", |c| parse_annotation_use(c).unwrap());
        assert_eq!(ann.args.len(), 1);
        assert!(ann.args[0].0.is_none());
    }

    #[test]
    fn test_annotation_interface_is_not_a_modifier() {
        with_cursor("public @interface A {}", |c| {
            let mods = parse_modifiers(c).unwrap();
            assert!(mods.annotations.is_empty());
            assert!(c.is_punct(PunctuationId::At));
        });
    }

    #[test]
    fn test_type_params_with_bounds() {
        let mut arena = TypeArena::new();
        let params = with_cursor("<T, U extends Comparable<U> & Cloneable>", |c| parse_type_params(c, &mut arena).unwrap());
        assert_eq!(params.len(), 2);
        assert!(params[0].bounds.is_empty());
        assert_eq!(params[1].bounds.len(), 2);
    }
}
