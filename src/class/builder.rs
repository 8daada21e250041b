//! Fluent construction of [`ClassNode`]s from descriptor and signature strings.
//!
//! Used for the built-in runtime classes and heavily in tests:
//!
//! ```rust
//! use lava::class::ClassBuilder;
//! use lava_core::access::ACC_PUBLIC;
//!
//! let node = ClassBuilder::new("p/Box", ACC_PUBLIC)
//!     .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
//!     .method_sig("get", ACC_PUBLIC, "()Ljava/lang/Object;", "()TT;")
//!     .build()
//!     .unwrap();
//! assert_eq!(node.type_param_count(), 1);
//! ```

use thiserror::Error;

use super::{Annotation, ClassNode, ClassOrigin, Constant, ElementValue, FieldNode, InnerClass, MethodNode};
use crate::types::descriptor::{self, DescriptorError};
use crate::types::signature::{self, SignatureError};
use crate::types::{ClassSignature, MethodSignature};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("in `{class}`: {source}")]
    Descriptor {
        class: String,
        #[source]
        source: DescriptorError,
    },
    #[error("in `{class}`: {source}")]
    Signature {
        class: String,
        #[source]
        source: SignatureError,
    },
}

pub struct ClassBuilder {
    node: ClassNode,
    error: Option<BuildError>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>, access: u16) -> Self {
        Self {
            node: ClassNode::new(name, access, ClassOrigin::Library),
            error: None,
        }
    }

    pub fn origin(mut self, origin: ClassOrigin) -> Self {
        self.node.origin = origin;
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.node.parent = Some(parent.to_string());
        self
    }

    pub fn no_parent(mut self) -> Self {
        self.node.parent = None;
        self
    }

    pub fn interfaces(mut self, names: &[&str]) -> Self {
        self.node.interfaces = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn signature(mut self, sig: &str) -> Self {
        match ClassSignature::parse(sig) {
            Ok(sig) => self.node.signature = Some(sig),
            Err(source) => self.fail_signature(source),
        }
        self
    }

    pub fn field(self, name: &str, access: u16, desc: &str) -> Self {
        self.push_field(name, access, desc, None, None)
    }

    pub fn field_sig(self, name: &str, access: u16, desc: &str, sig: &str) -> Self {
        self.push_field(name, access, desc, Some(sig), None)
    }

    pub fn constant(self, name: &str, access: u16, desc: &str, value: Constant) -> Self {
        self.push_field(name, access, desc, None, Some(value))
    }

    pub fn method(self, name: &str, access: u16, desc: &str) -> Self {
        self.push_method(name, access, desc, None, None)
    }

    pub fn method_sig(self, name: &str, access: u16, desc: &str, sig: &str) -> Self {
        self.push_method(name, access, desc, Some(sig), None)
    }

    /// Annotation element with a default value.
    pub fn element(self, name: &str, access: u16, desc: &str, default: ElementValue) -> Self {
        self.push_method(name, access, desc, None, Some(default))
    }

    pub fn inner(mut self, inner: &str, outer: &str, simple: &str, access: u16) -> Self {
        self.node.inner_classes.push(InnerClass {
            inner: inner.to_string(),
            outer: Some(outer.to_string()),
            simple_name: Some(simple.to_string()),
            access,
        });
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.node.annotations.push(annotation);
        self
    }

    pub fn build(self) -> Result<ClassNode, BuildError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.node),
        }
    }

    fn push_field(mut self, name: &str, access: u16, desc: &str, sig: Option<&str>, value: Option<Constant>) -> Self {
        let ty = match descriptor::parse_field(desc) {
            Ok(ty) => ty,
            Err(source) => {
                self.fail_descriptor(source);
                return self;
            }
        };
        let mut field = FieldNode::new(name, access, ty);
        field.constant = value;
        if let Some(sig) = sig {
            match signature::parse_field(sig) {
                Ok(sig) => field.signature = Some(sig),
                Err(source) => self.fail_signature(source),
            }
        }
        self.node.fields.push(field);
        self
    }

    fn push_method(
        mut self,
        name: &str,
        access: u16,
        desc: &str,
        sig: Option<&str>,
        default: Option<ElementValue>,
    ) -> Self {
        let (params, ret) = match descriptor::parse_method(desc) {
            Ok(parsed) => parsed,
            Err(source) => {
                self.fail_descriptor(source);
                return self;
            }
        };
        let mut method = MethodNode::new(name, access, params, ret);
        method.default_value = default;
        if let Some(sig) = sig {
            match MethodSignature::parse(sig) {
                Ok(sig) => method.signature = Some(sig),
                Err(source) => self.fail_signature(source),
            }
        }
        self.node.methods.push(method);
        self
    }

    fn fail_descriptor(&mut self, source: DescriptorError) {
        if self.error.is_none() {
            self.error = Some(BuildError::Descriptor {
                class: self.node.name.clone(),
                source,
            });
        }
    }

    fn fail_signature(&mut self, source: SignatureError) {
        if self.error.is_none() {
            self.error = Some(BuildError::Signature {
                class: self.node.name.clone(),
                source,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_core::access::ACC_PUBLIC;

    #[test]
    fn test_first_error_is_reported() {
        let err = ClassBuilder::new("p/Bad", ACC_PUBLIC)
            .field("x", 0, "Q")
            .signature("<>")
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Descriptor { .. }));
    }

    #[test]
    fn test_generic_members() {
        let node = ClassBuilder::new("p/Box", ACC_PUBLIC)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .field_sig("value", ACC_PUBLIC, "Ljava/lang/Object;", "TT;")
            .build()
            .unwrap();
        assert_eq!(node.fields[0].generic_type(), crate::types::IType::type_param("T"));
    }
}
