//! Built-in runtime library.
//!
//! Holds symbol-level descriptions of the core platform classes the resolver cannot work without (`Object`,
//! `String`, the boxing classes, `Enum`, `Record`, the collection interfaces the operator overrides rely on, and the
//! meta-annotations). It is the runtime library of a [`crate::context::GlobalContext`] unless a real one is
//! configured, and the last place a lookup falls through to.

use std::sync::{Arc, OnceLock};

use lava_core::access::{
    ACC_ABSTRACT, ACC_ANNOTATION, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC,
    ACC_STATIC, ACC_SUPER,
};
use lava_core::lang::well_known;
use rustc_hash::FxHashMap;

use super::{Library, NameSet};
use crate::class::builder::BuildError;
use crate::class::{Annotation, ClassBuilder, ClassNode, Constant, ElementValue};

const PUB: u16 = ACC_PUBLIC;
const PUB_STATIC: u16 = ACC_PUBLIC | ACC_STATIC;
const PUB_CONST: u16 = ACC_PUBLIC | ACC_STATIC | ACC_FINAL;
const PUB_ABSTRACT: u16 = ACC_PUBLIC | ACC_ABSTRACT;
const CLASS: u16 = ACC_PUBLIC | ACC_SUPER;
const FINAL_CLASS: u16 = ACC_PUBLIC | ACC_FINAL | ACC_SUPER;
const ABSTRACT_CLASS: u16 = ACC_PUBLIC | ACC_ABSTRACT | ACC_SUPER;
const INTERFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;

const ONE_PARAM: &str = "<E:Ljava/lang/Object;>";

pub struct BootstrapLibrary {
    classes: FxHashMap<String, Arc<ClassNode>>,
    content: NameSet,
}

impl BootstrapLibrary {
    pub fn new() -> Self {
        let mut classes = FxHashMap::default();
        for built in definitions() {
            match built {
                Ok(node) => {
                    classes.insert(node.name.clone(), Arc::new(node));
                }
                Err(err) => tracing::error!(error = %err, "skipping malformed built-in class"),
            }
        }
        let content = classes.keys().cloned().collect();
        Self { classes, content }
    }

    /// Process-wide instance; built on first use.
    pub fn shared() -> Arc<BootstrapLibrary> {
        static SHARED: OnceLock<Arc<BootstrapLibrary>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(BootstrapLibrary::new())))
    }
}

impl Default for BootstrapLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl Library for BootstrapLibrary {
    fn name(&self) -> &str {
        "bootstrap"
    }

    fn content(&self) -> &NameSet {
        &self.content
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.classes.get(name).cloned()
    }

    fn module(&self, name: &str) -> Option<String> {
        self.classes.contains_key(name).then(|| "java.base".to_string())
    }
}

fn enum_value(owner: &str, name: &str) -> ElementValue {
    ElementValue::Enum {
        owner: owner.to_string(),
        name: name.to_string(),
    }
}

fn retention(policy: &str) -> Annotation {
    Annotation {
        class: well_known::RETENTION.to_string(),
        values: vec![("value".to_string(), enum_value(well_known::RETENTION_POLICY, policy))],
    }
}

fn target(kinds: &[&str]) -> Annotation {
    let values = kinds.iter().map(|k| enum_value(well_known::ELEMENT_TYPE, k)).collect();
    Annotation {
        class: well_known::TARGET.to_string(),
        values: vec![("value".to_string(), ElementValue::Array(values))],
    }
}

fn annotation_type(name: &str, policy: &str, kinds: Option<&[&str]>) -> ClassBuilder {
    let builder = ClassBuilder::new(name, INTERFACE | ACC_ANNOTATION)
        .interfaces(&[well_known::ANNOTATION])
        .annotation(retention(policy));
    match kinds {
        Some(kinds) => builder.annotation(target(kinds)),
        None => builder,
    }
}

fn enum_type(name: &str, constants: &[&str]) -> ClassBuilder {
    let desc = format!("L{name};");
    let mut builder = ClassBuilder::new(name, FINAL_CLASS | ACC_ENUM)
        .parent(well_known::ENUM)
        .signature(&format!("Ljava/lang/Enum<{desc}>;"));
    for c in constants {
        builder = builder.field(c, PUB_CONST | ACC_ENUM, &desc);
    }
    builder
        .method("values", PUB_STATIC, &format!("()[{desc}"))
        .method("valueOf", PUB_STATIC, &format!("(Ljava/lang/String;){desc}"))
        .method("<init>", ACC_PRIVATE, "(Ljava/lang/String;I)V")
}

/// A final `Number` subclass with the usual constants and accessors.
fn boxed_number(name: &str, prim: char, min: Constant, max: Constant) -> ClassBuilder {
    let desc = format!("L{name};");
    ClassBuilder::new(name, FINAL_CLASS)
        .parent(well_known::NUMBER)
        .interfaces(&[well_known::COMPARABLE])
        .signature(&format!("Ljava/lang/Number;Ljava/lang/Comparable<{desc}>;"))
        .constant("MIN_VALUE", PUB_CONST, &prim.to_string(), min)
        .constant("MAX_VALUE", PUB_CONST, &prim.to_string(), max)
        .method("valueOf", PUB_STATIC, &format!("({prim}){desc}"))
        .method("compareTo", PUB, &format!("({desc})I"))
        .method("intValue", PUB, "()I")
        .method("longValue", PUB, "()J")
        .method("floatValue", PUB, "()F")
        .method("doubleValue", PUB, "()D")
}

fn collection_type(name: &str, parent_sig: &str) -> ClassBuilder {
    ClassBuilder::new(name, INTERFACE)
        .interfaces(&[parent_sig.split('<').next().unwrap_or_default().trim_start_matches('L')])
        .signature(&format!("{ONE_PARAM}Ljava/lang/Object;{parent_sig}"))
        .method("size", PUB_ABSTRACT, "()I")
        .method("isEmpty", PUB_ABSTRACT, "()Z")
        .method("contains", PUB_ABSTRACT, "(Ljava/lang/Object;)Z")
        .method_sig("add", PUB_ABSTRACT, "(Ljava/lang/Object;)Z", "(TE;)Z")
}

fn definitions() -> Vec<Result<ClassNode, BuildError>> {
    let element_types: &[&str] = &[
        "TYPE",
        "FIELD",
        "METHOD",
        "PARAMETER",
        "CONSTRUCTOR",
        "LOCAL_VARIABLE",
        "ANNOTATION_TYPE",
        "PACKAGE",
        "TYPE_PARAMETER",
        "TYPE_USE",
        "MODULE",
        "RECORD_COMPONENT",
    ];

    vec![
        // java.lang core
        ClassBuilder::new(well_known::OBJECT, CLASS)
            .no_parent()
            .method("<init>", PUB, "()V")
            .method("equals", PUB, "(Ljava/lang/Object;)Z")
            .method("hashCode", PUB, "()I")
            .method("toString", PUB, "()Ljava/lang/String;")
            .method_sig("getClass", PUB | ACC_FINAL, "()Ljava/lang/Class;", "()Ljava/lang/Class<*>;")
            .method("clone", ACC_PROTECTED, "()Ljava/lang/Object;"),
        ClassBuilder::new("java/lang/CharSequence", INTERFACE)
            .method("length", PUB_ABSTRACT, "()I")
            .method("charAt", PUB_ABSTRACT, "(I)C")
            .method("toString", PUB_ABSTRACT, "()Ljava/lang/String;"),
        ClassBuilder::new(well_known::COMPARABLE, INTERFACE)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method_sig("compareTo", PUB_ABSTRACT, "(Ljava/lang/Object;)I", "(TT;)I"),
        ClassBuilder::new(well_known::CLONEABLE, INTERFACE),
        ClassBuilder::new(well_known::SERIALIZABLE, INTERFACE),
        ClassBuilder::new("java/lang/Runnable", INTERFACE).method("run", PUB_ABSTRACT, "()V"),
        ClassBuilder::new("java/lang/Iterable", INTERFACE)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method_sig("iterator", PUB_ABSTRACT, "()Ljava/util/Iterator;", "()Ljava/util/Iterator<TT;>;"),
        ClassBuilder::new(well_known::STRING, FINAL_CLASS)
            .interfaces(&[well_known::SERIALIZABLE, well_known::COMPARABLE, "java/lang/CharSequence"])
            .signature(
                "Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/String;>;Ljava/lang/CharSequence;",
            )
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V")
            .method("length", PUB, "()I")
            .method("isEmpty", PUB, "()Z")
            .method("charAt", PUB, "(I)C")
            .method("repeat", PUB, "(I)Ljava/lang/String;")
            .method("concat", PUB, "(Ljava/lang/String;)Ljava/lang/String;")
            .method("substring", PUB, "(I)Ljava/lang/String;")
            .method("substring", PUB, "(II)Ljava/lang/String;")
            .method("indexOf", PUB, "(Ljava/lang/String;)I")
            .method("trim", PUB, "()Ljava/lang/String;")
            .method("compareTo", PUB, "(Ljava/lang/String;)I")
            .method("equals", PUB, "(Ljava/lang/Object;)Z")
            .method("valueOf", PUB_STATIC, "(I)Ljava/lang/String;")
            .method("valueOf", PUB_STATIC, "(Ljava/lang/Object;)Ljava/lang/String;"),
        ClassBuilder::new(well_known::NUMBER, ABSTRACT_CLASS)
            .interfaces(&[well_known::SERIALIZABLE])
            .method("<init>", PUB, "()V")
            .method("intValue", PUB_ABSTRACT, "()I")
            .method("longValue", PUB_ABSTRACT, "()J")
            .method("floatValue", PUB_ABSTRACT, "()F")
            .method("doubleValue", PUB_ABSTRACT, "()D"),
        boxed_number("java/lang/Integer", 'I', Constant::Int(i32::MIN), Constant::Int(i32::MAX))
            .method("parseInt", PUB_STATIC, "(Ljava/lang/String;)I"),
        boxed_number("java/lang/Long", 'J', Constant::Long(i64::MIN), Constant::Long(i64::MAX)),
        boxed_number("java/lang/Short", 'S', Constant::Short(i16::MIN), Constant::Short(i16::MAX)),
        boxed_number("java/lang/Byte", 'B', Constant::Byte(i8::MIN), Constant::Byte(i8::MAX)),
        boxed_number("java/lang/Float", 'F', Constant::Float(f32::from_bits(1)), Constant::Float(f32::MAX)),
        boxed_number("java/lang/Double", 'D', Constant::Double(f64::from_bits(1)), Constant::Double(f64::MAX)),
        ClassBuilder::new("java/lang/Character", FINAL_CLASS)
            .interfaces(&[well_known::SERIALIZABLE, well_known::COMPARABLE])
            .signature("Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/Character;>;")
            .constant("MIN_VALUE", PUB_CONST, "C", Constant::Char(0))
            .constant("MAX_VALUE", PUB_CONST, "C", Constant::Char(u16::MAX))
            .method("valueOf", PUB_STATIC, "(C)Ljava/lang/Character;")
            .method("charValue", PUB, "()C"),
        ClassBuilder::new("java/lang/Boolean", FINAL_CLASS)
            .interfaces(&[well_known::SERIALIZABLE, well_known::COMPARABLE])
            .signature("Ljava/lang/Object;Ljava/io/Serializable;Ljava/lang/Comparable<Ljava/lang/Boolean;>;")
            .field("TRUE", PUB_CONST, "Ljava/lang/Boolean;")
            .field("FALSE", PUB_CONST, "Ljava/lang/Boolean;")
            .method("valueOf", PUB_STATIC, "(Z)Ljava/lang/Boolean;")
            .method("booleanValue", PUB, "()Z"),
        ClassBuilder::new("java/lang/Void", FINAL_CLASS).method("<init>", ACC_PRIVATE, "()V"),
        ClassBuilder::new(well_known::CLASS, FINAL_CLASS)
            .interfaces(&[well_known::SERIALIZABLE])
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/io/Serializable;")
            .method("getName", PUB, "()Ljava/lang/String;"),
        ClassBuilder::new(well_known::ENUM, ABSTRACT_CLASS)
            .interfaces(&[well_known::COMPARABLE, well_known::SERIALIZABLE])
            .signature("<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;Ljava/io/Serializable;")
            .method("<init>", ACC_PROTECTED, "(Ljava/lang/String;I)V")
            .method("name", PUB | ACC_FINAL, "()Ljava/lang/String;")
            .method("ordinal", PUB | ACC_FINAL, "()I")
            .method_sig("compareTo", PUB | ACC_FINAL, "(Ljava/lang/Enum;)I", "(TE;)I"),
        ClassBuilder::new(well_known::RECORD, ABSTRACT_CLASS)
            .method("<init>", ACC_PROTECTED, "()V")
            .method("equals", PUB_ABSTRACT, "(Ljava/lang/Object;)Z")
            .method("hashCode", PUB_ABSTRACT, "()I")
            .method("toString", PUB_ABSTRACT, "()Ljava/lang/String;"),
        ClassBuilder::new("java/lang/Throwable", CLASS)
            .interfaces(&[well_known::SERIALIZABLE])
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V")
            .method("getMessage", PUB, "()Ljava/lang/String;"),
        ClassBuilder::new("java/lang/Exception", CLASS)
            .parent("java/lang/Throwable")
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V"),
        ClassBuilder::new("java/lang/Error", CLASS)
            .parent("java/lang/Throwable")
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V"),
        ClassBuilder::new("java/lang/RuntimeException", CLASS)
            .parent("java/lang/Exception")
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V"),
        ClassBuilder::new("java/lang/IllegalArgumentException", CLASS)
            .parent("java/lang/RuntimeException")
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V"),
        ClassBuilder::new("java/lang/IllegalStateException", CLASS)
            .parent("java/lang/RuntimeException")
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V"),
        ClassBuilder::new("java/lang/System", FINAL_CLASS)
            .method("<init>", ACC_PRIVATE, "()V")
            .field("out", PUB_CONST, "Ljava/io/PrintStream;")
            .field("err", PUB_CONST, "Ljava/io/PrintStream;")
            .method("currentTimeMillis", PUB_STATIC, "()J"),
        ClassBuilder::new("java/lang/Math", FINAL_CLASS)
            .method("<init>", ACC_PRIVATE, "()V")
            .constant("PI", PUB_CONST, "D", Constant::Double(std::f64::consts::PI))
            .constant("E", PUB_CONST, "D", Constant::Double(std::f64::consts::E))
            .method("max", PUB_STATIC, "(II)I")
            .method("abs", PUB_STATIC, "(I)I")
            .method("sqrt", PUB_STATIC, "(D)D"),
        ClassBuilder::new(well_known::STRING_BUILDER, FINAL_CLASS)
            .interfaces(&[well_known::SERIALIZABLE, "java/lang/CharSequence"])
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(Ljava/lang/String;)V")
            .method("append", PUB, "(Ljava/lang/Object;)Ljava/lang/StringBuilder;")
            .method("append", PUB, "(Ljava/lang/String;)Ljava/lang/StringBuilder;")
            .method("append", PUB, "(I)Ljava/lang/StringBuilder;")
            .method("length", PUB, "()I")
            .method("charAt", PUB, "(I)C")
            .method("toString", PUB, "()Ljava/lang/String;"),
        // annotations
        ClassBuilder::new(well_known::ANNOTATION, INTERFACE)
            .method_sig("annotationType", PUB_ABSTRACT, "()Ljava/lang/Class;", "()Ljava/lang/Class<*>;"),
        annotation_type(well_known::RETENTION, "RUNTIME", Some(&["ANNOTATION_TYPE"]))
            .method("value", PUB_ABSTRACT, "()Ljava/lang/annotation/RetentionPolicy;"),
        annotation_type(well_known::TARGET, "RUNTIME", Some(&["ANNOTATION_TYPE"]))
            .method("value", PUB_ABSTRACT, "()[Ljava/lang/annotation/ElementType;"),
        annotation_type("java/lang/annotation/Documented", "RUNTIME", Some(&["ANNOTATION_TYPE"])),
        annotation_type("java/lang/annotation/Inherited", "RUNTIME", Some(&["ANNOTATION_TYPE"])),
        enum_type(well_known::ELEMENT_TYPE, element_types),
        enum_type(well_known::RETENTION_POLICY, &["SOURCE", "CLASS", "RUNTIME"]),
        annotation_type("java/lang/Override", "SOURCE", Some(&["METHOD"])),
        annotation_type("java/lang/FunctionalInterface", "RUNTIME", Some(&["TYPE"])),
        annotation_type(
            "java/lang/Deprecated",
            "RUNTIME",
            Some(&["CONSTRUCTOR", "FIELD", "LOCAL_VARIABLE", "METHOD", "PACKAGE", "MODULE", "PARAMETER", "TYPE"]),
        )
        .element("since", PUB_ABSTRACT, "()Ljava/lang/String;", ElementValue::Const(Constant::String(String::new())))
        .element("forRemoval", PUB_ABSTRACT, "()Z", ElementValue::Const(Constant::Boolean(false))),
        annotation_type(
            "java/lang/SuppressWarnings",
            "SOURCE",
            Some(&["TYPE", "FIELD", "METHOD", "PARAMETER", "CONSTRUCTOR", "LOCAL_VARIABLE", "MODULE"]),
        )
        .method("value", PUB_ABSTRACT, "()[Ljava/lang/String;"),
        // java.io
        ClassBuilder::new("java/io/PrintStream", CLASS)
            .method("println", PUB, "()V")
            .method("println", PUB, "(Ljava/lang/String;)V")
            .method("println", PUB, "(Ljava/lang/Object;)V")
            .method("println", PUB, "(I)V")
            .method("println", PUB, "(J)V")
            .method("println", PUB, "(D)V")
            .method("println", PUB, "(Z)V")
            .method("println", PUB, "(C)V")
            .method("print", PUB, "(Ljava/lang/String;)V"),
        // java.util
        ClassBuilder::new("java/util/Iterator", INTERFACE)
            .signature(&format!("{ONE_PARAM}Ljava/lang/Object;"))
            .method("hasNext", PUB_ABSTRACT, "()Z")
            .method_sig("next", PUB_ABSTRACT, "()Ljava/lang/Object;", "()TE;"),
        ClassBuilder::new("java/util/RandomAccess", INTERFACE),
        collection_type("java/util/Collection", "Ljava/lang/Iterable<TE;>;"),
        collection_type(well_known::LIST, "Ljava/util/Collection<TE;>;")
            .method_sig("get", PUB_ABSTRACT, "(I)Ljava/lang/Object;", "(I)TE;")
            .method_sig("set", PUB_ABSTRACT, "(ILjava/lang/Object;)Ljava/lang/Object;", "(ITE;)TE;")
            .method_sig(
                "of",
                PUB_STATIC,
                "()Ljava/util/List;",
                "<E:Ljava/lang/Object;>()Ljava/util/List<TE;>;",
            ),
        collection_type("java/util/Set", "Ljava/util/Collection<TE;>;"),
        ClassBuilder::new("java/util/AbstractCollection", ABSTRACT_CLASS)
            .interfaces(&["java/util/Collection"])
            .signature(&format!("{ONE_PARAM}Ljava/lang/Object;Ljava/util/Collection<TE;>;"))
            .method("<init>", ACC_PROTECTED, "()V")
            .method("size", PUB_ABSTRACT, "()I"),
        ClassBuilder::new("java/util/AbstractList", ABSTRACT_CLASS)
            .parent("java/util/AbstractCollection")
            .interfaces(&[well_known::LIST])
            .signature(&format!("{ONE_PARAM}Ljava/util/AbstractCollection<TE;>;Ljava/util/List<TE;>;"))
            .method("<init>", ACC_PROTECTED, "()V")
            .method_sig("get", PUB_ABSTRACT, "(I)Ljava/lang/Object;", "(I)TE;"),
        ClassBuilder::new("java/util/ArrayList", CLASS)
            .parent("java/util/AbstractList")
            .interfaces(&[well_known::LIST, "java/util/RandomAccess", well_known::CLONEABLE, well_known::SERIALIZABLE])
            .signature(&format!(
                "{ONE_PARAM}Ljava/util/AbstractList<TE;>;Ljava/util/List<TE;>;Ljava/util/RandomAccess;Ljava/lang/Cloneable;Ljava/io/Serializable;"
            ))
            .method("<init>", PUB, "()V")
            .method("<init>", PUB, "(I)V")
            .method_sig("get", PUB, "(I)Ljava/lang/Object;", "(I)TE;")
            .method_sig("add", PUB, "(Ljava/lang/Object;)Z", "(TE;)Z")
            .method("size", PUB, "()I"),
        ClassBuilder::new("java/util/AbstractSet", ABSTRACT_CLASS)
            .parent("java/util/AbstractCollection")
            .interfaces(&["java/util/Set"])
            .signature(&format!("{ONE_PARAM}Ljava/util/AbstractCollection<TE;>;Ljava/util/Set<TE;>;"))
            .method("<init>", ACC_PROTECTED, "()V"),
        ClassBuilder::new("java/util/HashSet", CLASS)
            .parent("java/util/AbstractSet")
            .interfaces(&["java/util/Set", well_known::CLONEABLE, well_known::SERIALIZABLE])
            .signature(&format!(
                "{ONE_PARAM}Ljava/util/AbstractSet<TE;>;Ljava/util/Set<TE;>;Ljava/lang/Cloneable;Ljava/io/Serializable;"
            ))
            .method("<init>", PUB, "()V"),
        ClassBuilder::new(well_known::MAP, INTERFACE)
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
            .inner("java/util/Map$Entry", well_known::MAP, "Entry", PUB_STATIC | ACC_INTERFACE | ACC_ABSTRACT)
            .method("size", PUB_ABSTRACT, "()I")
            .method("containsKey", PUB_ABSTRACT, "(Ljava/lang/Object;)Z")
            .method_sig("get", PUB_ABSTRACT, "(Ljava/lang/Object;)Ljava/lang/Object;", "(Ljava/lang/Object;)TV;")
            .method_sig(
                "put",
                PUB_ABSTRACT,
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                "(TK;TV;)TV;",
            )
            .method_sig(
                "entrySet",
                PUB_ABSTRACT,
                "()Ljava/util/Set;",
                "()Ljava/util/Set<Ljava/util/Map$Entry<TK;TV;>;>;",
            ),
        ClassBuilder::new("java/util/Map$Entry", INTERFACE)
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
            .inner("java/util/Map$Entry", well_known::MAP, "Entry", PUB_STATIC | ACC_INTERFACE | ACC_ABSTRACT)
            .method_sig("getKey", PUB_ABSTRACT, "()Ljava/lang/Object;", "()TK;")
            .method_sig("getValue", PUB_ABSTRACT, "()Ljava/lang/Object;", "()TV;"),
        ClassBuilder::new("java/util/AbstractMap", ABSTRACT_CLASS)
            .interfaces(&[well_known::MAP])
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Map<TK;TV;>;")
            .method("<init>", ACC_PROTECTED, "()V"),
        ClassBuilder::new("java/util/HashMap", CLASS)
            .parent("java/util/AbstractMap")
            .interfaces(&[well_known::MAP, well_known::CLONEABLE, well_known::SERIALIZABLE])
            .signature(
                "<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/util/AbstractMap<TK;TV;>;Ljava/util/Map<TK;TV;>;Ljava/lang/Cloneable;Ljava/io/Serializable;",
            )
            .method("<init>", PUB, "()V")
            .method_sig("get", PUB, "(Ljava/lang/Object;)Ljava/lang/Object;", "(Ljava/lang/Object;)TV;"),
    ]
    .into_iter()
    .map(ClassBuilder::build)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_definitions_build() {
        for built in definitions() {
            built.unwrap();
        }
    }

    #[test]
    fn test_core_classes_present() {
        let lib = BootstrapLibrary::new();
        for name in [
            well_known::OBJECT,
            well_known::STRING,
            well_known::ENUM,
            well_known::RECORD,
            "java/util/ArrayList",
            "java/util/Map$Entry",
            well_known::TARGET,
        ] {
            assert!(lib.content().contains(name), "missing {name}");
        }
        assert_eq!(lib.get(well_known::OBJECT).unwrap().parent, None);
        assert_eq!(lib.module("java/util/List").as_deref(), Some("java.base"));
    }

    #[test]
    fn test_collection_interfaces_extend_their_parent() {
        let lib = BootstrapLibrary::new();
        let list = lib.get(well_known::LIST).unwrap();
        assert_eq!(list.interfaces, vec!["java/util/Collection".to_string()]);
        assert_eq!(list.signature.as_ref().unwrap().interfaces.len(), 1);
    }
}
