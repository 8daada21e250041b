//! Annotation-type metadata: retention, applicable targets, element defaults.

use lava_core::lang::well_known;
use rustc_hash::FxHashMap;

use crate::class::{ClassNode, ElementValue};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionPolicy {
    Source,
    Class,
    Runtime,
}

/// Program elements an annotation may be applied to (`java.lang.annotation.ElementType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Type,
    Field,
    Method,
    Parameter,
    Constructor,
    LocalVariable,
    AnnotationType,
    Package,
    TypeParameter,
    TypeUse,
    Module,
    RecordComponent,
}

impl ElementKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "TYPE" => ElementKind::Type,
            "FIELD" => ElementKind::Field,
            "METHOD" => ElementKind::Method,
            "PARAMETER" => ElementKind::Parameter,
            "CONSTRUCTOR" => ElementKind::Constructor,
            "LOCAL_VARIABLE" => ElementKind::LocalVariable,
            "ANNOTATION_TYPE" => ElementKind::AnnotationType,
            "PACKAGE" => ElementKind::Package,
            "TYPE_PARAMETER" => ElementKind::TypeParameter,
            "TYPE_USE" => ElementKind::TypeUse,
            "MODULE" => ElementKind::Module,
            "RECORD_COMPONENT" => ElementKind::RecordComponent,
            _ => return None,
        })
    }

    /// Wording used in "not applicable to ..." diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            ElementKind::Type => "a type declaration",
            ElementKind::Field => "a field",
            ElementKind::Method => "a method",
            ElementKind::Parameter => "a parameter",
            ElementKind::Constructor => "a constructor",
            ElementKind::LocalVariable => "a local variable",
            ElementKind::AnnotationType => "an annotation type",
            ElementKind::Package => "a package",
            ElementKind::TypeParameter => "a type parameter",
            ElementKind::TypeUse => "a type use",
            ElementKind::Module => "a module",
            ElementKind::RecordComponent => "a record component",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInfo {
    pub retention: RetentionPolicy,
    /// `None` when the annotation has no `@Target` (applicable to every declaration).
    pub targets: Option<Vec<ElementKind>>,
    /// Element name → declared return type.
    pub elements: FxHashMap<String, Type>,
    pub defaults: FxHashMap<String, ElementValue>,
}

impl AnnotationInfo {
    pub fn of(node: &ClassNode) -> Option<Self> {
        if !node.is_annotation() {
            return None;
        }
        let retention = match node.annotation(well_known::RETENTION).and_then(|a| a.value("value")) {
            Some(ElementValue::Enum { name, .. }) => match name.as_str() {
                "SOURCE" => RetentionPolicy::Source,
                "RUNTIME" => RetentionPolicy::Runtime,
                _ => RetentionPolicy::Class,
            },
            _ => RetentionPolicy::Class,
        };
        let targets = node.annotation(well_known::TARGET).map(|a| {
            let mut kinds = Vec::new();
            let mut push = |v: &ElementValue| {
                if let ElementValue::Enum { name, .. } = v {
                    kinds.extend(ElementKind::from_name(name));
                }
            };
            match a.value("value") {
                Some(ElementValue::Array(items)) => items.iter().for_each(&mut push),
                Some(single) => push(single),
                None => {}
            }
            kinds
        });
        let elements = node.methods.iter().filter(|m| !m.is_static()).map(|m| (m.name.clone(), m.ret.clone())).collect();
        let defaults = node
            .methods
            .iter()
            .filter_map(|m| m.default_value.clone().map(|v| (m.name.clone(), v)))
            .collect();
        Some(Self {
            retention,
            targets,
            elements,
            defaults,
        })
    }

    /// Return `true` if the annotation may be placed on `kind`.
    ///
    /// Without `@Target` an annotation applies to every declaration context. `TYPE` covers annotation types too.
    pub fn applicable(&self, kind: ElementKind) -> bool {
        match &self.targets {
            None => !matches!(kind, ElementKind::TypeParameter | ElementKind::TypeUse),
            Some(targets) => {
                targets.contains(&kind)
                    || (kind == ElementKind::AnnotationType && targets.contains(&ElementKind::Type))
                    || (kind == ElementKind::Type && targets.contains(&ElementKind::TypeUse))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{BootstrapLibrary, Library};

    #[test]
    fn test_override_targets_methods_only() {
        let lib = BootstrapLibrary::new();
        let info = AnnotationInfo::of(&lib.get("java/lang/Override").unwrap()).unwrap();
        assert_eq!(info.retention, RetentionPolicy::Source);
        assert!(info.applicable(ElementKind::Method));
        assert!(!info.applicable(ElementKind::Type));
        assert!(!info.applicable(ElementKind::Field));
    }

    #[test]
    fn test_defaults_and_non_annotations() {
        let lib = BootstrapLibrary::new();
        let info = AnnotationInfo::of(&lib.get("java/lang/Deprecated").unwrap()).unwrap();
        assert_eq!(info.retention, RetentionPolicy::Runtime);
        assert!(info.defaults.contains_key("forRemoval"));
        assert!(info.elements.contains_key("since"));
        assert!(AnnotationInfo::of(&lib.get(well_known::STRING).unwrap()).is_none());
    }
}
