//! Class-file reader (JVMS §4).
//!
//! Only the parts the resolver needs are decoded: header, names, flags, supertypes, member descriptors and the
//! `Signature`, `ConstantValue`, `InnerClasses`, `Exceptions`, `AnnotationDefault` and visible/invisible annotation
//! attributes. Method bodies are skipped.

use thiserror::Error;

use super::{Annotation, ClassNode, ClassOrigin, Constant, ElementValue, FieldNode, InnerClass, MethodNode};
use crate::types::descriptor::{self, DescriptorError};
use crate::types::signature::{self, SignatureError};
use crate::types::{ClassSignature, MethodSignature, Type};

const MAGIC: u32 = 0xCAFE_BABE;

mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("unexpected end of class file")]
    Truncated,
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("invalid constant pool index {0}")]
    BadConstant(u16),
    #[error("unsupported constant pool tag {0}")]
    UnsupportedTag(u8),
    #[error("unknown annotation element tag `{0}`")]
    BadElementTag(char),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

#[derive(Debug, Clone)]
enum PoolEntry {
    Empty,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    Other,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self.pos.checked_add(n).ok_or(ClassFileError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(ClassFileError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, ClassFileError> {
        let hi = u64::from(self.u32()?);
        let lo = u64::from(self.u32()?);
        Ok(hi << 32 | lo)
    }
}

struct Pool(Vec<PoolEntry>);

impl Pool {
    fn read(r: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut entries = vec![PoolEntry::Empty];
        let mut i = 1;
        while i < count {
            let tag = r.u8()?;
            let entry = match tag {
                tags::UTF8 => {
                    let len = r.u16()? as usize;
                    PoolEntry::Utf8(decode_modified_utf8(r.take(len)?))
                }
                tags::INTEGER => PoolEntry::Integer(r.u32()? as i32),
                tags::FLOAT => PoolEntry::Float(f32::from_bits(r.u32()?)),
                tags::LONG => PoolEntry::Long(r.u64()? as i64),
                tags::DOUBLE => PoolEntry::Double(f64::from_bits(r.u64()?)),
                tags::CLASS => PoolEntry::Class(r.u16()?),
                tags::STRING => PoolEntry::String(r.u16()?),
                tags::METHOD_TYPE | tags::MODULE | tags::PACKAGE => {
                    r.u16()?;
                    PoolEntry::Other
                }
                tags::FIELDREF
                | tags::METHODREF
                | tags::INTERFACE_METHODREF
                | tags::NAME_AND_TYPE
                | tags::DYNAMIC
                | tags::INVOKE_DYNAMIC => {
                    r.u32()?;
                    PoolEntry::Other
                }
                tags::METHOD_HANDLE => {
                    r.take(3)?;
                    PoolEntry::Other
                }
                other => return Err(ClassFileError::UnsupportedTag(other)),
            };
            let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
            entries.push(entry);
            i += 1;
            // 8-byte constants take two slots.
            if wide {
                entries.push(PoolEntry::Empty);
                i += 1;
            }
        }
        Ok(Pool(entries))
    }

    fn get(&self, index: u16) -> Result<&PoolEntry, ClassFileError> {
        self.0.get(index as usize).ok_or(ClassFileError::BadConstant(index))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            PoolEntry::Utf8(s) => Ok(s),
            _ => Err(ClassFileError::BadConstant(index)),
        }
    }

    fn class(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            PoolEntry::Class(name) => self.utf8(*name),
            _ => Err(ClassFileError::BadConstant(index)),
        }
    }

    fn opt_class(&self, index: u16) -> Result<Option<String>, ClassFileError> {
        if index == 0 {
            return Ok(None);
        }
        self.class(index).map(|s| Some(s.to_string()))
    }

    fn opt_utf8(&self, index: u16) -> Result<Option<String>, ClassFileError> {
        if index == 0 {
            return Ok(None);
        }
        self.utf8(index).map(|s| Some(s.to_string()))
    }
}

/// Decode JVM "modified UTF-8" (JVMS §4.4.7).
fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push(u16::from(b & 0x1F) << 6 | u16::from(bytes[i + 1] & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(u16::from(b & 0x0F) << 12 | u16::from(bytes[i + 1] & 0x3F) << 6 | u16::from(bytes[i + 2] & 0x3F));
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

/// Parse a class file into a library [`ClassNode`].
pub fn parse(bytes: &[u8]) -> Result<ClassNode, ClassFileError> {
    let mut r = Reader { bytes, pos: 0 };
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    r.u16()?; // minor
    r.u16()?; // major
    let pool = Pool::read(&mut r)?;

    let access = r.u16()?;
    let name = pool.class(r.u16()?)?.to_string();
    let parent = pool.opt_class(r.u16()?)?;
    let mut node = ClassNode::new(name, access, ClassOrigin::Library);
    node.parent = parent;
    for _ in 0..r.u16()? {
        node.interfaces.push(pool.class(r.u16()?)?.to_string());
    }

    for _ in 0..r.u16()? {
        node.fields.push(read_field(&mut r, &pool)?);
    }
    for _ in 0..r.u16()? {
        node.methods.push(read_method(&mut r, &pool)?);
    }

    for _ in 0..r.u16()? {
        let attr = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let mut body = Reader { bytes: r.take(len)?, pos: 0 };
        match attr.as_str() {
            "Signature" => node.signature = Some(ClassSignature::parse(pool.utf8(body.u16()?)?)?),
            "InnerClasses" => {
                for _ in 0..body.u16()? {
                    let inner = pool.class(body.u16()?)?.to_string();
                    let outer = pool.opt_class(body.u16()?)?;
                    let simple_name = pool.opt_utf8(body.u16()?)?;
                    let access = body.u16()?;
                    node.inner_classes.push(InnerClass {
                        inner,
                        outer,
                        simple_name,
                        access,
                    });
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                node.annotations.extend(read_annotations(&mut body, &pool)?);
            }
            _ => {}
        }
    }
    Ok(node)
}

fn read_field(r: &mut Reader<'_>, pool: &Pool) -> Result<FieldNode, ClassFileError> {
    let access = r.u16()?;
    let name = pool.utf8(r.u16()?)?.to_string();
    let ty = descriptor::parse_field(pool.utf8(r.u16()?)?)?;
    let mut field = FieldNode::new(name, access, ty);
    for _ in 0..r.u16()? {
        let attr = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let mut body = Reader { bytes: r.take(len)?, pos: 0 };
        match attr.as_str() {
            "Signature" => field.signature = Some(signature::parse_field(pool.utf8(body.u16()?)?)?),
            "ConstantValue" => {
                let index = body.u16()?;
                field.constant = Some(typed_constant(pool, index, &field.ty)?);
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                field.annotations.extend(read_annotations(&mut body, pool)?);
            }
            _ => {}
        }
    }
    Ok(field)
}

fn read_method(r: &mut Reader<'_>, pool: &Pool) -> Result<MethodNode, ClassFileError> {
    let access = r.u16()?;
    let name = pool.utf8(r.u16()?)?.to_string();
    let (params, ret) = descriptor::parse_method(pool.utf8(r.u16()?)?)?;
    let mut method = MethodNode::new(name, access, params, ret);
    for _ in 0..r.u16()? {
        let attr = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let mut body = Reader { bytes: r.take(len)?, pos: 0 };
        match attr.as_str() {
            "Signature" => method.signature = Some(MethodSignature::parse(pool.utf8(body.u16()?)?)?),
            "Exceptions" => {
                for _ in 0..body.u16()? {
                    method.throws.push(pool.class(body.u16()?)?.to_string());
                }
            }
            "AnnotationDefault" => method.default_value = Some(read_element(&mut body, pool)?),
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                method.annotations.extend(read_annotations(&mut body, pool)?);
            }
            _ => {}
        }
    }
    Ok(method)
}

/// `ConstantValue` entries for sub-int kinds are stored as `Integer`; the field type picks the variant.
fn typed_constant(pool: &Pool, index: u16, ty: &Type) -> Result<Constant, ClassFileError> {
    use lava_core::lang::primitives::PrimitiveKind as P;
    let value = match pool.get(index)? {
        PoolEntry::Integer(v) => match ty.primitive_kind() {
            Some(P::Boolean) => Constant::Boolean(*v != 0),
            Some(P::Char) => Constant::Char(*v as u16),
            Some(P::Byte) => Constant::Byte(*v as i8),
            Some(P::Short) => Constant::Short(*v as i16),
            _ => Constant::Int(*v),
        },
        PoolEntry::Float(v) => Constant::Float(*v),
        PoolEntry::Long(v) => Constant::Long(*v),
        PoolEntry::Double(v) => Constant::Double(*v),
        PoolEntry::String(s) => Constant::String(pool.utf8(*s)?.to_string()),
        _ => return Err(ClassFileError::BadConstant(index)),
    };
    Ok(value)
}

fn read_annotations(r: &mut Reader<'_>, pool: &Pool) -> Result<Vec<Annotation>, ClassFileError> {
    let count = r.u16()?;
    (0..count).map(|_| read_annotation(r, pool)).collect()
}

fn read_annotation(r: &mut Reader<'_>, pool: &Pool) -> Result<Annotation, ClassFileError> {
    let ty = descriptor::parse_field(pool.utf8(r.u16()?)?)?;
    let class = ty.class_name().unwrap_or_default().to_string();
    let mut annotation = Annotation::new(class);
    for _ in 0..r.u16()? {
        let name = pool.utf8(r.u16()?)?.to_string();
        let value = read_element(r, pool)?;
        annotation.values.push((name, value));
    }
    Ok(annotation)
}

fn read_element(r: &mut Reader<'_>, pool: &Pool) -> Result<ElementValue, ClassFileError> {
    use lava_core::lang::primitives::PrimitiveKind as P;
    let tag = char::from(r.u8()?);
    let value = match tag {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => {
            let index = r.u16()?;
            let kind = P::from_descriptor(tag).ok_or(ClassFileError::BadElementTag(tag))?;
            ElementValue::Const(typed_constant(pool, index, &Type::primitive(kind))?)
        }
        's' => ElementValue::Const(Constant::String(pool.utf8(r.u16()?)?.to_string())),
        'e' => {
            let ty = descriptor::parse_field(pool.utf8(r.u16()?)?)?;
            let name = pool.utf8(r.u16()?)?.to_string();
            ElementValue::Enum {
                owner: ty.class_name().unwrap_or_default().to_string(),
                name,
            }
        }
        'c' => {
            let desc = pool.utf8(r.u16()?)?;
            ElementValue::Class(descriptor::parse_field(desc)?)
        }
        '@' => ElementValue::Annotation(Box::new(read_annotation(r, pool)?)),
        '[' => {
            let count = r.u16()?;
            let items = (0..count).map(|_| read_element(r, pool)).collect::<Result<Vec<_>, _>>()?;
            ElementValue::Array(items)
        }
        other => return Err(ClassFileError::BadElementTag(other)),
    };
    Ok(value)
}

/// Minimal class-file writer for tests of the readers and libraries.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct PoolWriter {
        bytes: Vec<u8>,
        count: u16,
        utf8: FxHashMap<String, u16>,
    }

    impl PoolWriter {
        fn utf8(&mut self, s: &str) -> u16 {
            if let Some(i) = self.utf8.get(s) {
                return *i;
            }
            self.count += 1;
            self.bytes.push(tags::UTF8);
            self.bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
            self.bytes.extend_from_slice(s.as_bytes());
            self.utf8.insert(s.to_string(), self.count);
            self.count
        }

        fn class(&mut self, name: &str) -> u16 {
            let n = self.utf8(name);
            self.count += 1;
            self.bytes.push(tags::CLASS);
            self.bytes.extend_from_slice(&n.to_be_bytes());
            self.count
        }

        fn constant(&mut self, c: &Constant) -> u16 {
            match c {
                Constant::String(s) => {
                    let n = self.utf8(s);
                    self.count += 1;
                    self.bytes.push(tags::STRING);
                    self.bytes.extend_from_slice(&n.to_be_bytes());
                    self.count
                }
                Constant::Long(v) => {
                    self.count += 1;
                    self.bytes.push(tags::LONG);
                    self.bytes.extend_from_slice(&v.to_be_bytes());
                    let index = self.count;
                    self.count += 1;
                    index
                }
                Constant::Int(v) => {
                    self.count += 1;
                    self.bytes.push(tags::INTEGER);
                    self.bytes.extend_from_slice(&v.to_be_bytes());
                    self.count
                }
                other => panic!("test writer does not support {other:?}"),
            }
        }
    }

    fn attr(out: &mut Vec<u8>, pool: &mut PoolWriter, name: &str, body: &[u8]) {
        out.extend_from_slice(&pool.utf8(name).to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
    }

    /// Serialize the parts of `node` the reader understands (annotations excluded).
    pub(crate) fn write_class(node: &ClassNode) -> Vec<u8> {
        let mut pool = PoolWriter::default();
        let mut body = Vec::new();
        body.extend_from_slice(&node.access.to_be_bytes());
        body.extend_from_slice(&pool.class(&node.name).to_be_bytes());
        let parent = node.parent.as_deref().map_or(0, |p| pool.class(p));
        body.extend_from_slice(&parent.to_be_bytes());
        body.extend_from_slice(&(node.interfaces.len() as u16).to_be_bytes());
        for i in &node.interfaces {
            body.extend_from_slice(&pool.class(i).to_be_bytes());
        }

        body.extend_from_slice(&(node.fields.len() as u16).to_be_bytes());
        for f in &node.fields {
            body.extend_from_slice(&f.access.to_be_bytes());
            body.extend_from_slice(&pool.utf8(&f.name).to_be_bytes());
            body.extend_from_slice(&pool.utf8(&f.ty.descriptor()).to_be_bytes());
            let mut attrs = Vec::new();
            let mut n = 0u16;
            if let Some(sig) = &f.signature {
                let i = pool.utf8(&signature::type_signature(sig));
                attr(&mut attrs, &mut pool, "Signature", &i.to_be_bytes());
                n += 1;
            }
            if let Some(c) = &f.constant {
                let i = pool.constant(c);
                attr(&mut attrs, &mut pool, "ConstantValue", &i.to_be_bytes());
                n += 1;
            }
            body.extend_from_slice(&n.to_be_bytes());
            body.extend_from_slice(&attrs);
        }

        body.extend_from_slice(&(node.methods.len() as u16).to_be_bytes());
        for m in &node.methods {
            body.extend_from_slice(&m.access.to_be_bytes());
            body.extend_from_slice(&pool.utf8(&m.name).to_be_bytes());
            body.extend_from_slice(&pool.utf8(&m.descriptor()).to_be_bytes());
            let mut attrs = Vec::new();
            let mut n = 0u16;
            if let Some(sig) = &m.signature {
                let i = pool.utf8(&sig.to_jvm());
                attr(&mut attrs, &mut pool, "Signature", &i.to_be_bytes());
                n += 1;
            }
            if !m.throws.is_empty() {
                let mut b = (m.throws.len() as u16).to_be_bytes().to_vec();
                for t in &m.throws {
                    b.extend_from_slice(&pool.class(t).to_be_bytes());
                }
                attr(&mut attrs, &mut pool, "Exceptions", &b);
                n += 1;
            }
            body.extend_from_slice(&n.to_be_bytes());
            body.extend_from_slice(&attrs);
        }

        let mut attrs = Vec::new();
        let mut n = 0u16;
        if let Some(sig) = &node.signature {
            let i = pool.utf8(&sig.to_jvm());
            attr(&mut attrs, &mut pool, "Signature", &i.to_be_bytes());
            n += 1;
        }
        if !node.inner_classes.is_empty() {
            let mut b = (node.inner_classes.len() as u16).to_be_bytes().to_vec();
            for ic in &node.inner_classes {
                b.extend_from_slice(&pool.class(&ic.inner).to_be_bytes());
                let outer = ic.outer.as_deref().map_or(0, |o| pool.class(o));
                b.extend_from_slice(&outer.to_be_bytes());
                let simple = ic.simple_name.as_deref().map_or(0, |s| pool.utf8(s));
                b.extend_from_slice(&simple.to_be_bytes());
                b.extend_from_slice(&ic.access.to_be_bytes());
            }
            attr(&mut attrs, &mut pool, "InnerClasses", &b);
            n += 1;
        }
        body.extend_from_slice(&n.to_be_bytes());
        body.extend_from_slice(&attrs);

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&(pool.count + 1).to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}
