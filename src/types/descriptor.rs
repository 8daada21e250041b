//! JVM field and method descriptors (JVMS §4.3).

use lava_core::lang::primitives::PrimitiveKind;
use thiserror::Error;

use super::{BaseType, Type};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed descriptor `{0}`")]
pub struct DescriptorError(pub String);

impl Type {
    /// Field descriptor (`I`, `[Ljava/lang/String;`). `null` has no descriptor and is written as `Object`.
    pub fn descriptor(&self) -> String {
        let mut out = "[".repeat(self.dims as usize);
        match &self.base {
            BaseType::Primitive(k) => out.push(k.descriptor()),
            BaseType::Class(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            BaseType::Null => out.push_str("Ljava/lang/Object;"),
        }
        out
    }
}

/// Build a method descriptor from erased parameter and return types.
pub fn method_descriptor(params: &[Type], ret: &Type) -> String {
    let mut out = String::from("(");
    for p in params {
        out.push_str(&p.descriptor());
    }
    out.push(')');
    out.push_str(&ret.descriptor());
    out
}

/// Parse a single field descriptor.
pub fn parse_field(desc: &str) -> Result<Type, DescriptorError> {
    let (ty, rest) = parse_one(desc).ok_or_else(|| DescriptorError(desc.to_string()))?;
    if !rest.is_empty() {
        return Err(DescriptorError(desc.to_string()));
    }
    Ok(ty)
}

/// Parse a method descriptor into `(params, return type)`.
pub fn parse_method(desc: &str) -> Result<(Vec<Type>, Type), DescriptorError> {
    let err = || DescriptorError(desc.to_string());
    let mut rest = desc.strip_prefix('(').ok_or_else(err)?;
    let mut params = Vec::new();
    while !rest.starts_with(')') {
        let (ty, tail) = parse_one(rest).ok_or_else(err)?;
        if ty.is_void() {
            return Err(err());
        }
        params.push(ty);
        rest = tail;
    }
    let (ret, tail) = parse_one(&rest[1..]).ok_or_else(err)?;
    if !tail.is_empty() {
        return Err(err());
    }
    Ok((params, ret))
}

fn parse_one(s: &str) -> Option<(Type, &str)> {
    let dims = s.bytes().take_while(|b| *b == b'[').count();
    let rest = &s[dims..];
    let c = rest.chars().next()?;
    let dims = u8::try_from(dims).ok()?;
    if c == 'L' {
        let end = rest.find(';')?;
        let name = &rest[1..end];
        if name.is_empty() {
            return None;
        }
        return Some((Type::class(name).with_dims(dims), &rest[end + 1..]));
    }
    let kind = PrimitiveKind::from_descriptor(c)?;
    if kind == PrimitiveKind::Void && dims > 0 {
        return None;
    }
    Some((Type::primitive(kind).with_dims(dims), &rest[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_descriptor() {
        let (params, ret) = parse_method("(I[Ljava/lang/String;J)V").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[1], Type::string().with_dims(1));
        assert!(ret.is_void());
        assert_eq!(method_descriptor(&params, &ret), "(I[Ljava/lang/String;J)V");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_field("Ljava/lang/String").is_err());
        assert!(parse_field("[V").is_err());
        assert!(parse_method("(V)V").is_err());
        assert!(parse_method("I)V").is_err());
        assert!(parse_field("II").is_err());
    }
}
