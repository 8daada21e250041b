//! Internal names of classes the resolver treats specially.

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";
pub const CLASS: &str = "java/lang/Class";
pub const ENUM: &str = "java/lang/Enum";
pub const RECORD: &str = "java/lang/Record";
pub const NUMBER: &str = "java/lang/Number";
pub const CLONEABLE: &str = "java/lang/Cloneable";
pub const SERIALIZABLE: &str = "java/io/Serializable";
pub const COMPARABLE: &str = "java/lang/Comparable";
pub const ANNOTATION: &str = "java/lang/annotation/Annotation";
pub const RETENTION: &str = "java/lang/annotation/Retention";
pub const TARGET: &str = "java/lang/annotation/Target";
pub const REPEATABLE: &str = "java/lang/annotation/Repeatable";
pub const ELEMENT_TYPE: &str = "java/lang/annotation/ElementType";
pub const RETENTION_POLICY: &str = "java/lang/annotation/RetentionPolicy";
pub const STRING_BUILDER: &str = "java/lang/StringBuilder";
pub const LIST: &str = "java/util/List";
pub const MAP: &str = "java/util/Map";

/// Packages every compilation unit imports implicitly.
pub const IMPLICIT_IMPORTS: &[&str] = &["java/lang"];

/// Supertypes shared by every array type.
pub const ARRAY_SUPERTYPES: &[&str] = &[OBJECT, CLONEABLE, SERIALIZABLE];

/// Name of instance initializers.
pub const CONSTRUCTOR: &str = "<init>";
/// Name of static initializers.
pub const STATIC_INIT: &str = "<clinit>";
