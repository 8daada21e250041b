//! Class-level symbol model.
//!
//! A [`ClassNode`] is the resolver's view of a class regardless of where it came from: a compile unit being built,
//! a library class file, or a class generated during compilation (anonymous classes, synthetic helpers). Members keep
//! their erased descriptor types plus an optional generic signature.

pub mod builder;
pub mod classfile;

use lava_core::access::{self, ACC_ABSTRACT, ACC_ANNOTATION, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_STATIC};
use lava_core::lang::well_known;

use crate::types::descriptor::method_descriptor;
use crate::types::{ClassSignature, IType, MethodSignature, Type};

pub use builder::ClassBuilder;

/// Where a class came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassOrigin {
    Unit,
    Library,
    Generated,
}

/// A compile-time constant (`ConstantValue` attribute or a folded expression).
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Boolean(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Constant {
    /// Erased type of the constant.
    pub fn ty(&self) -> Type {
        use lava_core::lang::primitives::PrimitiveKind as P;
        match self {
            Constant::Boolean(_) => Type::primitive(P::Boolean),
            Constant::Char(_) => Type::primitive(P::Char),
            Constant::Byte(_) => Type::primitive(P::Byte),
            Constant::Short(_) => Type::primitive(P::Short),
            Constant::Int(_) => Type::primitive(P::Int),
            Constant::Long(_) => Type::primitive(P::Long),
            Constant::Float(_) => Type::primitive(P::Float),
            Constant::Double(_) => Type::primitive(P::Double),
            Constant::String(_) => Type::string(),
        }
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Boolean(v) => write!(f, "{v}"),
            Constant::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{v:04x}'"),
            },
            Constant::Byte(v) => write!(f, "{v}"),
            Constant::Short(v) => write!(f, "{v}"),
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v}F"),
            Constant::Double(v) => write!(f, "{v}"),
            Constant::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Annotation element value (JVMS §4.7.16.1).
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(Constant),
    Enum { owner: String, name: String },
    Class(Type),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Internal name of the annotation type.
    pub class: String,
    pub values: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            values: Vec::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&ElementValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One row of the InnerClasses table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner: String,
    /// `None` for local and anonymous classes.
    pub outer: Option<String>,
    /// `None` for anonymous classes.
    pub simple_name: Option<String>,
    /// Flags as declared in source (may include `private`, `protected`, `static`).
    pub access: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub access: u16,
    pub ty: Type,
    pub signature: Option<IType>,
    pub constant: Option<Constant>,
    pub annotations: Vec<Annotation>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, access: u16, ty: Type) -> Self {
        Self {
            name: name.into(),
            access,
            ty,
            signature: None,
            constant: None,
            annotations: Vec::new(),
        }
    }

    /// Generic type if present, otherwise the erased type.
    pub fn generic_type(&self) -> IType {
        self.signature.clone().unwrap_or_else(|| IType::Raw(self.ty.clone()))
    }

    pub fn is_static(&self) -> bool {
        access::has(self.access, ACC_STATIC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub name: String,
    pub access: u16,
    pub params: Vec<Type>,
    pub ret: Type,
    pub signature: Option<MethodSignature>,
    pub throws: Vec<String>,
    /// `AnnotationDefault` of an annotation element.
    pub default_value: Option<ElementValue>,
    pub annotations: Vec<Annotation>,
}

impl MethodNode {
    pub fn new(name: impl Into<String>, access: u16, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            access,
            params,
            ret,
            signature: None,
            throws: Vec::new(),
            default_value: None,
            annotations: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> String {
        method_descriptor(&self.params, &self.ret)
    }

    /// Descriptor without the return type; two methods with equal keys clash in one class.
    pub fn param_key(&self) -> String {
        let mut key = String::from("(");
        for p in &self.params {
            key.push_str(&p.descriptor());
        }
        key.push(')');
        key
    }

    pub fn is_static(&self) -> bool {
        access::has(self.access, ACC_STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == well_known::CONSTRUCTOR
    }

    pub fn generic_params(&self) -> Vec<IType> {
        match &self.signature {
            Some(sig) if sig.params.len() == self.params.len() => sig.params.clone(),
            _ => self.params.iter().cloned().map(IType::Raw).collect(),
        }
    }

    pub fn generic_return(&self) -> IType {
        match &self.signature {
            Some(sig) => sig.ret.clone(),
            None => IType::Raw(self.ret.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    /// Internal name (`java/util/ArrayList`, `a/Outer$Inner`).
    pub name: String,
    pub access: u16,
    /// `None` only for `java/lang/Object` and `module-info`.
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
    pub signature: Option<ClassSignature>,
    pub inner_classes: Vec<InnerClass>,
    pub annotations: Vec<Annotation>,
    pub origin: ClassOrigin,
}

impl ClassNode {
    pub fn new(name: impl Into<String>, access: u16, origin: ClassOrigin) -> Self {
        Self {
            name: name.into(),
            access,
            parent: Some(well_known::OBJECT.to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            signature: None,
            inner_classes: Vec::new(),
            annotations: Vec::new(),
            origin,
        }
    }

    pub fn is_interface(&self) -> bool {
        access::has(self.access, ACC_INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        access::has(self.access, ACC_ANNOTATION)
    }

    pub fn is_enum(&self) -> bool {
        access::has(self.access, ACC_ENUM)
    }

    pub fn is_final(&self) -> bool {
        access::has(self.access, ACC_FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        access::has(self.access, ACC_ABSTRACT)
    }

    pub fn package(&self) -> &str {
        lava_core::package_of(&self.name)
    }

    /// Direct supertypes: parent first, then interfaces in declaration order.
    pub fn supers(&self) -> impl Iterator<Item = &str> {
        self.parent.iter().map(String::as_str).chain(self.interfaces.iter().map(String::as_str))
    }

    /// Declared type parameter count (zero for non-generic classes).
    pub fn type_param_count(&self) -> usize {
        self.signature.as_ref().map_or(0, |s| s.type_params.len())
    }

    /// This class's own InnerClasses row, if it is a nested class.
    pub fn inner_entry(&self) -> Option<&InnerClass> {
        self.inner_classes.iter().find(|ic| ic.inner == self.name)
    }

    /// Enclosing class for member classes.
    pub fn outer(&self) -> Option<&str> {
        self.inner_entry().and_then(|ic| ic.outer.as_deref())
    }

    /// Flags as declared in source: the InnerClasses row wins over the class-file flags.
    pub fn declared_access(&self) -> u16 {
        self.inner_entry().map_or(self.access, |ic| ic.access)
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodNode> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn annotation(&self, class: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.class == class)
    }

    /// Generic parent type (raw when the class has no signature).
    pub fn generic_parent(&self) -> Option<IType> {
        match &self.signature {
            Some(sig) => Some(sig.parent.clone()),
            None => self.parent.as_ref().map(|p| IType::class(p.clone())),
        }
    }

    /// Generic interfaces (raw when the class has no signature).
    pub fn generic_interfaces(&self) -> Vec<IType> {
        match &self.signature {
            Some(sig) if sig.interfaces.len() == self.interfaces.len() => sig.interfaces.clone(),
            _ => self.interfaces.iter().map(|i| IType::class(i.clone())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_core::access::{ACC_PRIVATE, ACC_PUBLIC};

    #[test]
    fn test_declared_access_prefers_inner_row() {
        let mut node = ClassNode::new("a/Outer$In", ACC_PUBLIC, ClassOrigin::Unit);
        node.inner_classes.push(InnerClass {
            inner: "a/Outer$In".into(),
            outer: Some("a/Outer".into()),
            simple_name: Some("In".into()),
            access: ACC_PRIVATE | ACC_STATIC,
        });
        assert_eq!(node.declared_access(), ACC_PRIVATE | ACC_STATIC);
        assert_eq!(node.outer(), Some("a/Outer"));
    }

    #[test]
    fn test_param_key_ignores_return() {
        let a = MethodNode::new("f", 0, vec![Type::string()], Type::void());
        let b = MethodNode::new("f", 0, vec![Type::string()], Type::object());
        assert_eq!(a.param_key(), b.param_key());
        assert_ne!(a.descriptor(), b.descriptor());
    }
}
