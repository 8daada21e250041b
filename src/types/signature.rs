//! Generic signatures as stored in the `Signature` attribute (JVMS §4.7.9.1).
//!
//! Parsing produces [`IType`]s with internal class names; writing is the exact inverse for anything the parser
//! produces, so a signature survives a class-file or symbol-cache round trip unchanged.

use std::iter::Peekable;
use std::str::Chars;

use lava_core::lang::primitives::PrimitiveKind;
use thiserror::Error;

use super::{Generic, GenericSub, IType, Type, WildcardBound};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed signature `{signature}`: {reason}")]
pub struct SignatureError {
    pub signature: String,
    pub reason: &'static str,
}

/// A declared type parameter with its bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParamDecl {
    pub name: String,
    pub class_bound: Option<IType>,
    pub interface_bounds: Vec<IType>,
}

impl TypeParamDecl {
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_bound: None,
            interface_bounds: Vec::new(),
        }
    }

    pub fn bounds(&self) -> impl Iterator<Item = &IType> {
        self.class_bound.iter().chain(self.interface_bounds.iter())
    }

    /// The type this parameter erases to.
    pub fn erasure(&self) -> IType {
        self.bounds().next().cloned().unwrap_or_else(IType::object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    pub type_params: Vec<TypeParamDecl>,
    pub parent: IType,
    pub interfaces: Vec<IType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<IType>,
    pub ret: IType,
    pub throws: Vec<IType>,
}

impl ClassSignature {
    pub fn parse(sig: &str) -> Result<Self, SignatureError> {
        let mut p = SigParser::new(sig);
        let type_params = p.type_params()?;
        let parent = p.class_type()?;
        let mut interfaces = Vec::new();
        while p.peek().is_some() {
            interfaces.push(p.class_type()?);
        }
        Ok(Self {
            type_params,
            parent,
            interfaces,
        })
    }

    pub fn to_jvm(&self) -> String {
        let mut out = String::new();
        write_type_params(&mut out, &self.type_params);
        write_type(&mut out, &self.parent);
        for i in &self.interfaces {
            write_type(&mut out, i);
        }
        out
    }

    pub fn type_param_names(&self) -> impl Iterator<Item = &str> {
        self.type_params.iter().map(|p| p.name.as_str())
    }
}

impl MethodSignature {
    pub fn parse(sig: &str) -> Result<Self, SignatureError> {
        let mut p = SigParser::new(sig);
        let type_params = p.type_params()?;
        p.expect('(')?;
        let mut params = Vec::new();
        while p.peek() != Some(')') {
            params.push(p.java_type()?);
        }
        p.expect(')')?;
        let ret = p.java_type()?;
        let mut throws = Vec::new();
        while p.peek() == Some('^') {
            p.bump();
            throws.push(p.reference_type()?);
        }
        p.finish()?;
        Ok(Self {
            type_params,
            params,
            ret,
            throws,
        })
    }

    pub fn to_jvm(&self) -> String {
        let mut out = String::new();
        write_type_params(&mut out, &self.type_params);
        out.push('(');
        for p in &self.params {
            write_type(&mut out, p);
        }
        out.push(')');
        write_type(&mut out, &self.ret);
        for t in &self.throws {
            out.push('^');
            write_type(&mut out, t);
        }
        out
    }
}

/// Parse a field signature.
pub fn parse_field(sig: &str) -> Result<IType, SignatureError> {
    let mut p = SigParser::new(sig);
    let ty = p.reference_type()?;
    p.finish()?;
    Ok(ty)
}

/// Write a single type in signature form.
pub fn type_signature(ty: &IType) -> String {
    let mut out = String::new();
    write_type(&mut out, ty);
    out
}

struct SigParser<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl<'a> SigParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
        }
    }

    fn error(&self, reason: &'static str) -> SignatureError {
        SignatureError {
            signature: self.source.to_string(),
            reason,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn expect(&mut self, c: char) -> Result<(), SignatureError> {
        match self.bump() {
            Some(found) if found == c => Ok(()),
            _ => Err(self.error("unexpected character")),
        }
    }

    fn finish(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error("trailing characters")),
        }
    }

    fn identifier(&mut self) -> Result<String, SignatureError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ';' | '<' | '>' | '.' | ':' | '/' | '[') {
                break;
            }
            out.push(c);
            self.bump();
        }
        if out.is_empty() {
            return Err(self.error("empty identifier"));
        }
        Ok(out)
    }

    fn type_params(&mut self) -> Result<Vec<TypeParamDecl>, SignatureError> {
        let mut params = Vec::new();
        if self.peek() != Some('<') {
            return Ok(params);
        }
        self.bump();
        while self.peek() != Some('>') {
            let name = self.identifier()?;
            self.expect(':')?;
            let class_bound = match self.peek() {
                Some(':') | Some('>') => None,
                _ => Some(self.reference_type()?),
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(':') {
                self.bump();
                interface_bounds.push(self.reference_type()?);
            }
            params.push(TypeParamDecl {
                name,
                class_bound,
                interface_bounds,
            });
        }
        self.bump();
        if params.is_empty() {
            return Err(self.error("empty type parameter list"));
        }
        Ok(params)
    }

    fn java_type(&mut self) -> Result<IType, SignatureError> {
        match self.peek() {
            Some(c) => match PrimitiveKind::from_descriptor(c) {
                Some(kind) => {
                    self.bump();
                    Ok(IType::primitive(kind))
                }
                None => self.reference_type(),
            },
            None => Err(self.error("unexpected end")),
        }
    }

    fn reference_type(&mut self) -> Result<IType, SignatureError> {
        match self.peek() {
            Some('L') => self.class_type(),
            Some('T') => {
                self.bump();
                let name = self.identifier()?;
                self.expect(';')?;
                Ok(IType::type_param(name))
            }
            Some('[') => {
                self.bump();
                let component = self.java_type()?;
                if component.is_void() {
                    return Err(self.error("array of void"));
                }
                Ok(component.with_dims(component.dims() + 1))
            }
            _ => Err(self.error("expected a reference type")),
        }
    }

    fn class_type(&mut self) -> Result<IType, SignatureError> {
        self.expect('L')?;
        let mut owner = String::new();
        loop {
            let part = self.identifier()?;
            owner.push_str(&part);
            if self.peek() == Some('/') {
                self.bump();
                owner.push('/');
            } else {
                break;
            }
        }
        let mut args = self.type_args()?;
        // Segments without arguments fold into the owner name.
        while args.is_empty() && self.peek() == Some('.') {
            self.bump();
            owner.push('$');
            owner.push_str(&self.identifier()?);
            args = self.type_args()?;
        }
        let mut subs = Vec::new();
        while self.peek() == Some('.') {
            self.bump();
            let name = self.identifier()?;
            let sub_args = self.type_args()?;
            subs.push((name, sub_args));
        }
        self.expect(';')?;

        if args.is_empty() && subs.is_empty() {
            return Ok(IType::Raw(Type::class(owner)));
        }
        let sub = subs.into_iter().rev().fold(None, |inner, (name, args)| {
            Some(Box::new(GenericSub {
                name,
                args,
                sub: inner,
            }))
        });
        Ok(IType::Generic(Box::new(Generic {
            owner,
            args,
            dims: 0,
            sub,
        })))
    }

    fn type_args(&mut self) -> Result<Vec<IType>, SignatureError> {
        let mut args = Vec::new();
        if self.peek() != Some('<') {
            return Ok(args);
        }
        self.bump();
        while self.peek() != Some('>') {
            let arg = match self.peek() {
                Some('*') => {
                    self.bump();
                    IType::unbounded()
                }
                Some('+') => {
                    self.bump();
                    IType::wildcard(WildcardBound::Extends, self.reference_type()?)
                }
                Some('-') => {
                    self.bump();
                    IType::wildcard(WildcardBound::Super, self.reference_type()?)
                }
                Some(_) => self.reference_type()?,
                None => return Err(self.error("unterminated type arguments")),
            };
            args.push(arg);
        }
        self.bump();
        if args.is_empty() {
            return Err(self.error("empty type arguments"));
        }
        Ok(args)
    }
}

fn write_type_params(out: &mut String, params: &[TypeParamDecl]) {
    if params.is_empty() {
        return;
    }
    out.push('<');
    for p in params {
        out.push_str(&p.name);
        out.push(':');
        if let Some(bound) = &p.class_bound {
            write_type(out, bound);
        }
        for bound in &p.interface_bounds {
            out.push(':');
            write_type(out, bound);
        }
    }
    out.push('>');
}

fn write_type(out: &mut String, ty: &IType) {
    match ty {
        IType::Raw(t) => out.push_str(&t.descriptor()),
        IType::TypeParam { name, dims } => {
            out.push_str(&"[".repeat(*dims as usize));
            out.push('T');
            out.push_str(name);
            out.push(';');
        }
        IType::Wildcard { bound, ty } => match (bound, ty) {
            (WildcardBound::Extends, Some(ty)) => {
                out.push('+');
                write_type(out, ty);
            }
            (WildcardBound::Super, Some(ty)) => {
                out.push('-');
                write_type(out, ty);
            }
            _ => out.push('*'),
        },
        IType::Generic(g) => {
            out.push_str(&"[".repeat(g.dims as usize));
            out.push('L');
            out.push_str(&g.owner);
            write_args(out, &g.args);
            let mut sub = g.sub.as_deref();
            while let Some(s) = sub {
                out.push('.');
                out.push_str(&s.name);
                write_args(out, &s.args);
                sub = s.sub.as_deref();
            }
            out.push(';');
        }
    }
}

fn write_args(out: &mut String, args: &[IType]) {
    if args.is_empty() {
        return;
    }
    out.push('<');
    for a in args {
        write_type(out, a);
    }
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_signature_of_array_list() {
        let text = "<E:Ljava/lang/Object;>Ljava/util/AbstractList<TE;>;Ljava/util/List<TE;>;Ljava/util/RandomAccess;";
        let sig = ClassSignature::parse(text).unwrap();
        assert_eq!(sig.type_params.len(), 1);
        assert_eq!(sig.type_params[0].name, "E");
        assert_eq!(sig.parent, IType::generic("java/util/AbstractList", vec![IType::type_param("E")]));
        assert_eq!(sig.interfaces[1], IType::class("java/util/RandomAccess"));
        assert_eq!(sig.to_jvm(), text);
    }

    #[test]
    fn test_interface_only_bound() {
        let text = "<T::Ljava/lang/Comparable<-TT;>;>Ljava/lang/Object;";
        let sig = ClassSignature::parse(text).unwrap();
        let t = &sig.type_params[0];
        assert!(t.class_bound.is_none());
        assert_eq!(
            t.erasure(),
            IType::generic("java/lang/Comparable", vec![IType::wildcard(WildcardBound::Super, IType::type_param("T"))])
        );
        assert_eq!(sig.to_jvm(), text);
    }

    #[test]
    fn test_method_signature_with_throws_and_arrays() {
        let text = "<X:Ljava/lang/Throwable;>([TT;I)Ljava/util/List<*>;^TX;";
        let sig = MethodSignature::parse(text).unwrap();
        assert_eq!(sig.params[0], IType::TypeParam { name: "T".into(), dims: 1 });
        assert_eq!(sig.ret.args(), &[IType::unbounded()]);
        assert_eq!(sig.throws, vec![IType::type_param("X")]);
        assert_eq!(sig.to_jvm(), text);
    }

    #[test]
    fn test_member_class_path() {
        let ty = parse_field("Lp/Outer<Ljava/lang/String;>.Inner<TT;>;").unwrap();
        let IType::Generic(g) = &ty else { panic!("expected generic") };
        assert_eq!(g.owner, "p/Outer");
        assert_eq!(g.full_name(), "p/Outer$Inner");
        assert_eq!(ty.args(), &[IType::type_param("T")]);
        assert_eq!(type_signature(&ty), "Lp/Outer<Ljava/lang/String;>.Inner<TT;>;");
    }

    #[test]
    fn test_unparameterized_outer_folds_into_owner() {
        let ty = parse_field("Ljava/util/Map.Entry<TK;TV;>;").unwrap();
        let IType::Generic(g) = &ty else { panic!("expected generic") };
        assert_eq!(g.owner, "java/util/Map$Entry");
        assert!(g.sub.is_none());
    }

    #[test]
    fn test_malformed() {
        assert!(ClassSignature::parse("<>Ljava/lang/Object;").is_err());
        assert!(parse_field("Ljava/util/List<>;").is_err());
        assert!(MethodSignature::parse("(I").is_err());
    }
}
