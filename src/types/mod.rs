//! Type representations.
//!
//! Two layers exist:
//!
//! - [`Type`] is an erased JVM type: a primitive or a class name plus array dimensions. It is what descriptors carry.
//! - [`IType`] is a source-level type: it additionally knows about type arguments, type variables and wildcards.
//!   Every `IType` erases to a `Type` via [`IType::erasure`] (type variables erase to `Object` unless the caller
//!   substitutes a bound first).
//!
//! Class names are in internal form once resolved. An `IType` built straight from source text may still hold a
//! written name (`List`, `Map.Entry`); [`crate::local::LocalContext::resolve_type`] turns those into internal names.

pub mod arena;
pub mod descriptor;
pub mod signature;

use std::fmt;

use lava_core::lang::primitives::PrimitiveKind;
use lava_core::lang::well_known;
use rustc_hash::FxHashMap;

pub use arena::{TypeArena, TypeNode, TypeRef};
pub use signature::{ClassSignature, MethodSignature, SignatureError, TypeParamDecl};

/// The element type of a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    Primitive(PrimitiveKind),
    Class(String),
    /// Type of the `null` literal. Never appears in a descriptor.
    Null,
}

/// An erased type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub base: BaseType,
    pub dims: u8,
}

impl Type {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            base: BaseType::Primitive(kind),
            dims: 0,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            base: BaseType::Class(name.into()),
            dims: 0,
        }
    }

    pub fn object() -> Self {
        Self::class(well_known::OBJECT)
    }

    pub fn string() -> Self {
        Self::class(well_known::STRING)
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    pub fn null() -> Self {
        Self {
            base: BaseType::Null,
            dims: 0,
        }
    }

    pub fn with_dims(mut self, dims: u8) -> Self {
        self.dims = dims;
        self
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    /// The primitive kind, if this is a primitive and not an array.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match &self.base {
            BaseType::Primitive(k) if self.dims == 0 => Some(*k),
            _ => None,
        }
    }

    /// The class name, if this is a class type and not an array.
    pub fn class_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Class(name) if self.dims == 0 => Some(name),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }

    pub fn is_void(&self) -> bool {
        self.primitive_kind() == Some(PrimitiveKind::Void)
    }

    pub fn is_null(&self) -> bool {
        self.base == BaseType::Null
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Element type one dimension down (identity for non-arrays).
    pub fn component(&self) -> Type {
        Type {
            base: self.base.clone(),
            dims: self.dims.saturating_sub(1),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            BaseType::Primitive(k) => write!(f, "{}", k.name())?,
            BaseType::Class(name) => write!(f, "{}", display_name(name))?,
            BaseType::Null => write!(f, "null")?,
        }
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Render an internal name the way sources write it.
pub fn display_name(name: &str) -> String {
    name.replace(['/', '$'], ".")
}

/// Wildcard bound kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends,
    Super,
}

/// A parameterized class type: `owner<args>`, optionally followed by a member-class path (`Outer<A>.Inner<B>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generic {
    pub owner: String,
    pub args: Vec<IType>,
    pub dims: u8,
    pub sub: Option<Box<GenericSub>>,
}

/// One `.Inner<args>` step of a generic member-class path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericSub {
    /// Simple name of the member class.
    pub name: String,
    pub args: Vec<IType>,
    pub sub: Option<Box<GenericSub>>,
}

/// A source-level type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IType {
    Raw(Type),
    Generic(Box<Generic>),
    TypeParam { name: String, dims: u8 },
    Wildcard { bound: WildcardBound, ty: Option<Box<IType>> },
}

impl IType {
    pub fn class(name: impl Into<String>) -> Self {
        IType::Raw(Type::class(name))
    }

    pub fn object() -> Self {
        IType::Raw(Type::object())
    }

    pub fn string() -> Self {
        IType::Raw(Type::string())
    }

    pub fn null() -> Self {
        IType::Raw(Type::null())
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        IType::Raw(Type::primitive(kind))
    }

    pub fn type_param(name: impl Into<String>) -> Self {
        IType::TypeParam {
            name: name.into(),
            dims: 0,
        }
    }

    pub fn generic(owner: impl Into<String>, args: Vec<IType>) -> Self {
        IType::Generic(Box::new(Generic {
            owner: owner.into(),
            args,
            dims: 0,
            sub: None,
        }))
    }

    pub fn unbounded() -> Self {
        IType::Wildcard {
            bound: WildcardBound::Unbounded,
            ty: None,
        }
    }

    pub fn wildcard(bound: WildcardBound, ty: IType) -> Self {
        IType::Wildcard {
            bound,
            ty: Some(Box::new(ty)),
        }
    }

    pub fn dims(&self) -> u8 {
        match self {
            IType::Raw(t) => t.dims,
            IType::Generic(g) => g.dims,
            IType::TypeParam { dims, .. } => *dims,
            IType::Wildcard { .. } => 0,
        }
    }

    /// Same type with a different number of array dimensions. Wildcards are returned unchanged.
    pub fn with_dims(&self, dims: u8) -> IType {
        match self {
            IType::Raw(t) => IType::Raw(t.clone().with_dims(dims)),
            IType::Generic(g) => {
                let mut g = g.clone();
                g.dims = dims;
                IType::Generic(g)
            }
            IType::TypeParam { name, .. } => IType::TypeParam {
                name: name.clone(),
                dims,
            },
            IType::Wildcard { .. } => self.clone(),
        }
    }

    /// Element type one dimension down.
    pub fn component(&self) -> IType {
        self.with_dims(self.dims().saturating_sub(1))
    }

    pub fn is_array(&self) -> bool {
        self.dims() > 0
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            IType::Raw(t) => t.primitive_kind(),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }

    pub fn is_void(&self) -> bool {
        self.primitive_kind() == Some(PrimitiveKind::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, IType::Raw(t) if t.is_null())
    }

    /// Name of the class this type refers to (ignoring arguments), if it is a non-array class type.
    ///
    /// For a member-class path the innermost class is returned.
    pub fn class_name(&self) -> Option<String> {
        match self {
            IType::Raw(t) => t.class_name().map(str::to_string),
            IType::Generic(g) if g.dims == 0 => Some(g.full_name()),
            _ => None,
        }
    }

    /// Type arguments applied to the innermost class (empty for raw types).
    pub fn args(&self) -> &[IType] {
        match self {
            IType::Generic(g) => g.innermost_args(),
            _ => &[],
        }
    }

    /// Erased form. Type variables and wildcards erase to `Object` (or to their `extends` bound).
    pub fn erasure(&self) -> Type {
        match self {
            IType::Raw(t) => t.clone(),
            IType::Generic(g) => Type::class(g.full_name()).with_dims(g.dims),
            IType::TypeParam { dims, .. } => Type::object().with_dims(*dims),
            IType::Wildcard {
                bound: WildcardBound::Extends,
                ty: Some(ty),
            } => ty.erasure(),
            IType::Wildcard { .. } => Type::object(),
        }
    }

    /// Return `true` if no type variable occurs anywhere inside.
    pub fn is_concrete(&self) -> bool {
        match self {
            IType::Raw(_) => true,
            IType::TypeParam { .. } => false,
            IType::Generic(g) => g.all_args().all(IType::is_concrete),
            IType::Wildcard { ty, .. } => ty.as_deref().is_none_or(IType::is_concrete),
        }
    }

    /// Replace type variables according to `map`. Unmapped variables are kept.
    pub fn substitute(&self, map: &FxHashMap<String, IType>) -> IType {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            IType::Raw(_) => self.clone(),
            IType::TypeParam { name, dims } => match map.get(name) {
                Some(replacement) if *dims == 0 => replacement.clone(),
                Some(replacement) => replacement.with_dims(replacement.dims() + dims),
                None => self.clone(),
            },
            IType::Generic(g) => IType::Generic(Box::new(Generic {
                owner: g.owner.clone(),
                args: g.args.iter().map(|a| a.substitute(map)).collect(),
                dims: g.dims,
                sub: g.sub.as_ref().map(|s| Box::new(s.substitute(map))),
            })),
            IType::Wildcard { bound, ty } => IType::Wildcard {
                bound: *bound,
                ty: ty.as_ref().map(|t| Box::new(t.substitute(map))),
            },
        }
    }
}

impl Generic {
    /// Internal name of the innermost class of the path (`Outer$Inner`).
    pub fn full_name(&self) -> String {
        let mut name = self.owner.clone();
        let mut sub = self.sub.as_deref();
        while let Some(s) = sub {
            name.push('$');
            name.push_str(&s.name);
            sub = s.sub.as_deref();
        }
        name
    }

    pub fn innermost_args(&self) -> &[IType] {
        let mut args = self.args.as_slice();
        let mut sub = self.sub.as_deref();
        while let Some(s) = sub {
            args = &s.args;
            sub = s.sub.as_deref();
        }
        args
    }

    fn all_args(&self) -> impl Iterator<Item = &IType> {
        let mut all: Vec<&IType> = self.args.iter().collect();
        let mut sub = self.sub.as_deref();
        while let Some(s) = sub {
            all.extend(s.args.iter());
            sub = s.sub.as_deref();
        }
        all.into_iter()
    }
}

impl GenericSub {
    fn substitute(&self, map: &FxHashMap<String, IType>) -> GenericSub {
        GenericSub {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(map)).collect(),
            sub: self.sub.as_ref().map(|s| Box::new(s.substitute(map))),
        }
    }
}

impl From<Type> for IType {
    fn from(t: Type) -> Self {
        IType::Raw(t)
    }
}

impl fmt::Display for IType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IType::Raw(t) => write!(f, "{t}"),
            IType::TypeParam { name, dims } => {
                write!(f, "{name}")?;
                write_dims(f, *dims)
            }
            IType::Wildcard { bound, ty } => match (bound, ty) {
                (WildcardBound::Extends, Some(ty)) => write!(f, "? extends {ty}"),
                (WildcardBound::Super, Some(ty)) => write!(f, "? super {ty}"),
                _ => write!(f, "?"),
            },
            IType::Generic(g) => {
                write!(f, "{}", display_name(&g.owner))?;
                write_args(f, &g.args)?;
                let mut sub = g.sub.as_deref();
                while let Some(s) = sub {
                    write!(f, ".{}", s.name)?;
                    write_args(f, &s.args)?;
                    sub = s.sub.as_deref();
                }
                write_dims(f, g.dims)
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[IType]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    write!(f, ">")
}

fn write_dims(f: &mut fmt::Formatter<'_>, dims: u8) -> fmt::Result {
    for _ in 0..dims {
        write!(f, "[]")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let list = IType::generic("java/util/List", vec![IType::wildcard(WildcardBound::Extends, IType::class("java/lang/Number"))]);
        assert_eq!(list.to_string(), "java.util.List<? extends java.lang.Number>");
        assert_eq!(IType::primitive(PrimitiveKind::Int).with_dims(2).to_string(), "int[][]");
    }

    #[test]
    fn test_erasure() {
        let list = IType::generic("java/util/List", vec![IType::type_param("T")]).with_dims(1);
        assert_eq!(list.erasure(), Type::class("java/util/List").with_dims(1));
        assert_eq!(IType::type_param("T").erasure(), Type::object());
    }

    #[test]
    fn test_substitute_keeps_array_dims() {
        let mut map = FxHashMap::default();
        map.insert("T".to_string(), IType::class("java/lang/String"));
        let arr = IType::TypeParam { name: "T".into(), dims: 1 };
        assert_eq!(arr.substitute(&map), IType::class("java/lang/String").with_dims(1));
        assert!(!arr.is_concrete());
        assert!(arr.substitute(&map).is_concrete());
    }

    #[test]
    fn test_member_path_name() {
        let g = Generic {
            owner: "a/Outer".into(),
            args: vec![IType::class("java/lang/String")],
            dims: 0,
            sub: Some(Box::new(GenericSub { name: "Inner".into(), args: vec![], sub: None })),
        };
        assert_eq!(g.full_name(), "a/Outer$Inner");
        assert!(g.innermost_args().is_empty());
    }
}
