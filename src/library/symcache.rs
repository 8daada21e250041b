//! Prebuilt symbol cache.
//!
//! A symbol cache is a single file holding the resolver-relevant parts of many classes, so a large classpath can be
//! loaded without opening thousands of class files. Entries are decoded lazily, each at most once.
//!
//! ## Layout
//!
//! ```text
//! "LSYM"  u16 version
//! u32 string count, then per string: u32 length + UTF-8 bytes
//! u32 class count, then per class: u32 name index, u32 payload offset, u32 payload length
//! u32 payload length, then the payload bytes
//! ```
//!
//! Strings are referenced by index; `u32::MAX` encodes "absent". A malformed header makes the whole file unusable
//! (fatal); a malformed entry is logged and treated as missing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Library, NameSet};
use crate::cache::KeyedCache;
use crate::class::{
    Annotation, ClassNode, ClassOrigin, Constant, ElementValue, FieldNode, InnerClass, MethodNode,
};
use crate::error::SessionError;
use crate::types::descriptor;
use crate::types::signature;
use crate::types::{ClassSignature, MethodSignature};

pub const EXTENSION: &str = "lsym";
const MAGIC: &[u8; 4] = b"LSYM";
const VERSION: u16 = 1;
const NONE: u32 = u32::MAX;

pub struct SymbolCache {
    label: String,
    strings: Vec<String>,
    entries: FxHashMap<String, (usize, usize)>,
    payload: Vec<u8>,
    content: NameSet,
    decoded: KeyedCache<String, Option<Arc<ClassNode>>>,
}

impl SymbolCache {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let bytes = std::fs::read(path).map_err(|e| SessionError::io(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    #[tracing::instrument(skip_all, fields(path = %path.display(), bytes = bytes.len()))]
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, SessionError> {
        let corrupt = |reason: &str| SessionError::CorruptSymbolCache {
            path: PathBuf::from(path),
            reason: reason.to_string(),
        };
        let mut d = Decoder::new(bytes);
        if d.take(4).map_err(|e| corrupt(e.0))? != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = d.u16().map_err(|e| corrupt(e.0))?;
        if version != VERSION {
            return Err(corrupt("unsupported version"));
        }

        let count = d.u32().map_err(|e| corrupt(e.0))?;
        let mut strings = Vec::new();
        for _ in 0..count {
            let len = d.u32().map_err(|e| corrupt(e.0))? as usize;
            let raw = d.take(len).map_err(|e| corrupt(e.0))?;
            let s = std::str::from_utf8(raw).map_err(|_| corrupt("string is not UTF-8"))?;
            strings.push(s.to_string());
        }

        let count = d.u32().map_err(|e| corrupt(e.0))?;
        let mut index = Vec::new();
        for _ in 0..count {
            let name = d.u32().map_err(|e| corrupt(e.0))? as usize;
            let offset = d.u32().map_err(|e| corrupt(e.0))? as usize;
            let len = d.u32().map_err(|e| corrupt(e.0))? as usize;
            let name = strings.get(name).ok_or_else(|| corrupt("class name out of range"))?;
            index.push((name.clone(), offset, len));
        }

        let payload_len = d.u32().map_err(|e| corrupt(e.0))? as usize;
        let payload = d.take(payload_len).map_err(|e| corrupt(e.0))?.to_vec();
        let mut entries = FxHashMap::default();
        for (name, offset, len) in index {
            if offset.checked_add(len).is_none_or(|end| end > payload.len()) {
                return Err(corrupt("entry outside payload"));
            }
            entries.insert(name, (offset, len));
        }
        let content = entries.keys().cloned().collect();
        tracing::debug!(classes = entries.len(), "opened symbol cache");
        Ok(Self {
            label: format!("symcache:{}", path.display()),
            strings,
            entries,
            payload,
            content,
            decoded: KeyedCache::new(),
        })
    }

    fn decode(&self, name: &str) -> Option<Arc<ClassNode>> {
        let (offset, len) = *self.entries.get(name)?;
        let mut d = EntryDecoder {
            d: Decoder::new(&self.payload[offset..offset + len]),
            strings: &self.strings,
        };
        match d.class() {
            Ok(node) => Some(Arc::new(node)),
            Err(err) => {
                tracing::warn!(cache = %self.label, class = name, error = err.0, "corrupted symbol-cache entry");
                None
            }
        }
    }
}

impl Library for SymbolCache {
    fn name(&self) -> &str {
        &self.label
    }

    fn content(&self) -> &NameSet {
        &self.content
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        if !self.entries.contains_key(name) {
            return None;
        }
        self.decoded.get_or_init(name, || self.decode(name))
    }
}

#[derive(Debug)]
struct DecodeError(&'static str);

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError("length overflow"))?;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError("unexpected end of data"))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let lo = u64::from(self.u32()?);
        let hi = u64::from(self.u32()?);
        Ok(hi << 32 | lo)
    }
}

struct EntryDecoder<'a> {
    d: Decoder<'a>,
    strings: &'a [String],
}

impl EntryDecoder<'_> {
    fn string(&mut self) -> Result<String, DecodeError> {
        let index = self.d.u32()? as usize;
        self.strings.get(index).cloned().ok_or(DecodeError("string index out of range"))
    }

    fn opt_string(&mut self) -> Result<Option<String>, DecodeError> {
        let index = self.d.u32()?;
        if index == NONE {
            return Ok(None);
        }
        self.strings.get(index as usize).cloned().map(Some).ok_or(DecodeError("string index out of range"))
    }

    fn class(&mut self) -> Result<ClassNode, DecodeError> {
        let access = self.d.u16()?;
        let name = self.string()?;
        let mut node = ClassNode::new(name, access, ClassOrigin::Library);
        node.parent = self.opt_string()?;
        for _ in 0..self.d.u16()? {
            node.interfaces.push(self.string()?);
        }
        if let Some(sig) = self.opt_string()? {
            node.signature = Some(ClassSignature::parse(&sig).map_err(|_| DecodeError("bad class signature"))?);
        }
        for _ in 0..self.d.u16()? {
            node.fields.push(self.field()?);
        }
        for _ in 0..self.d.u16()? {
            node.methods.push(self.method()?);
        }
        for _ in 0..self.d.u16()? {
            let inner = self.string()?;
            let outer = self.opt_string()?;
            let simple_name = self.opt_string()?;
            let access = self.d.u16()?;
            node.inner_classes.push(InnerClass {
                inner,
                outer,
                simple_name,
                access,
            });
        }
        node.annotations = self.annotations()?;
        Ok(node)
    }

    fn field(&mut self) -> Result<FieldNode, DecodeError> {
        let access = self.d.u16()?;
        let name = self.string()?;
        let ty = descriptor::parse_field(&self.string()?).map_err(|_| DecodeError("bad field descriptor"))?;
        let mut field = FieldNode::new(name, access, ty);
        if let Some(sig) = self.opt_string()? {
            field.signature = Some(signature::parse_field(&sig).map_err(|_| DecodeError("bad field signature"))?);
        }
        if self.d.u8()? != 0 {
            field.constant = Some(self.constant()?);
        }
        field.annotations = self.annotations()?;
        Ok(field)
    }

    fn method(&mut self) -> Result<MethodNode, DecodeError> {
        let access = self.d.u16()?;
        let name = self.string()?;
        let (params, ret) =
            descriptor::parse_method(&self.string()?).map_err(|_| DecodeError("bad method descriptor"))?;
        let mut method = MethodNode::new(name, access, params, ret);
        if let Some(sig) = self.opt_string()? {
            method.signature = Some(MethodSignature::parse(&sig).map_err(|_| DecodeError("bad method signature"))?);
        }
        for _ in 0..self.d.u16()? {
            method.throws.push(self.string()?);
        }
        if self.d.u8()? != 0 {
            method.default_value = Some(self.element()?);
        }
        method.annotations = self.annotations()?;
        Ok(method)
    }

    fn constant(&mut self) -> Result<Constant, DecodeError> {
        Ok(match self.d.u8()? {
            1 => Constant::Boolean(self.d.u8()? != 0),
            2 => Constant::Char(self.d.u16()?),
            3 => Constant::Byte(self.d.u8()? as i8),
            4 => Constant::Short(self.d.u16()? as i16),
            5 => Constant::Int(self.d.u32()? as i32),
            6 => Constant::Long(self.d.u64()? as i64),
            7 => Constant::Float(f32::from_bits(self.d.u32()?)),
            8 => Constant::Double(f64::from_bits(self.d.u64()?)),
            9 => Constant::String(self.string()?),
            _ => return Err(DecodeError("unknown constant tag")),
        })
    }

    fn element(&mut self) -> Result<ElementValue, DecodeError> {
        Ok(match self.d.u8()? {
            b'k' => ElementValue::Const(self.constant()?),
            b'e' => ElementValue::Enum {
                owner: self.string()?,
                name: self.string()?,
            },
            b'c' => ElementValue::Class(
                descriptor::parse_field(&self.string()?).map_err(|_| DecodeError("bad class literal"))?,
            ),
            b'@' => ElementValue::Annotation(Box::new(self.annotation()?)),
            b'[' => {
                let count = self.d.u16()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(self.element()?);
                }
                ElementValue::Array(items)
            }
            _ => return Err(DecodeError("unknown element tag")),
        })
    }

    fn annotation(&mut self) -> Result<Annotation, DecodeError> {
        let mut annotation = Annotation::new(self.string()?);
        for _ in 0..self.d.u16()? {
            let name = self.string()?;
            let value = self.element()?;
            annotation.values.push((name, value));
        }
        Ok(annotation)
    }

    fn annotations(&mut self) -> Result<Vec<Annotation>, DecodeError> {
        let count = self.d.u16()?;
        (0..count).map(|_| self.annotation()).collect()
    }
}

/// Serializes classes into the symbol-cache format.
#[derive(Default)]
pub struct SymbolCacheWriter {
    strings: Vec<String>,
    string_ids: FxHashMap<String, u32>,
    index: Vec<(u32, u32, u32)>,
    payload: Vec<u8>,
}

impl SymbolCacheWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Add every class of `library`. Unloadable classes are skipped.
    pub fn add_library(&mut self, library: &dyn Library) {
        let mut names: Vec<&String> = library.content().iter().collect();
        names.sort();
        for name in names {
            if let Some(node) = library.get(name) {
                self.add(&node);
            }
        }
    }

    pub fn add(&mut self, node: &ClassNode) {
        let start = self.payload.len();
        let name = self.intern(&node.name);
        self.class(node);
        let len = self.payload.len() - start;
        self.index.push((name, start as u32, len as u32));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 64);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());
        for s in &self.strings {
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        out.extend_from_slice(&(self.index.len() as u32).to_le_bytes());
        for (name, offset, len) in &self.index {
            out.extend_from_slice(&name.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
        }
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.to_bytes()).map_err(|e| SessionError::io(path, e))
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(id) = self.string_ids.get(s) {
            return *id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), id);
        id
    }

    fn u8(&mut self, v: u8) {
        self.payload.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.payload.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.payload.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.u32(v as u32);
        self.u32((v >> 32) as u32);
    }

    fn string(&mut self, s: &str) {
        let id = self.intern(s);
        self.u32(id);
    }

    fn opt_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => self.string(s),
            None => self.u32(NONE),
        }
    }

    fn class(&mut self, node: &ClassNode) {
        self.u16(node.access);
        self.string(&node.name);
        self.opt_string(node.parent.as_deref());
        self.u16(node.interfaces.len() as u16);
        for i in &node.interfaces {
            self.string(i);
        }
        let sig = node.signature.as_ref().map(ClassSignature::to_jvm);
        self.opt_string(sig.as_deref());
        self.u16(node.fields.len() as u16);
        for f in &node.fields {
            self.u16(f.access);
            self.string(&f.name);
            self.string(&f.ty.descriptor());
            let sig = f.signature.as_ref().map(signature::type_signature);
            self.opt_string(sig.as_deref());
            match &f.constant {
                Some(c) => {
                    self.u8(1);
                    self.constant(c);
                }
                None => self.u8(0),
            }
            self.annotations(&f.annotations);
        }
        self.u16(node.methods.len() as u16);
        for m in &node.methods {
            self.u16(m.access);
            self.string(&m.name);
            self.string(&m.descriptor());
            let sig = m.signature.as_ref().map(MethodSignature::to_jvm);
            self.opt_string(sig.as_deref());
            self.u16(m.throws.len() as u16);
            for t in &m.throws {
                self.string(t);
            }
            match &m.default_value {
                Some(v) => {
                    self.u8(1);
                    self.element(v);
                }
                None => self.u8(0),
            }
            self.annotations(&m.annotations);
        }
        self.u16(node.inner_classes.len() as u16);
        for ic in &node.inner_classes {
            self.string(&ic.inner);
            self.opt_string(ic.outer.as_deref());
            self.opt_string(ic.simple_name.as_deref());
            self.u16(ic.access);
        }
        self.annotations(&node.annotations);
    }

    fn constant(&mut self, c: &Constant) {
        match c {
            Constant::Boolean(v) => {
                self.u8(1);
                self.u8(u8::from(*v));
            }
            Constant::Char(v) => {
                self.u8(2);
                self.u16(*v);
            }
            Constant::Byte(v) => {
                self.u8(3);
                self.u8(*v as u8);
            }
            Constant::Short(v) => {
                self.u8(4);
                self.u16(*v as u16);
            }
            Constant::Int(v) => {
                self.u8(5);
                self.u32(*v as u32);
            }
            Constant::Long(v) => {
                self.u8(6);
                self.u64(*v as u64);
            }
            Constant::Float(v) => {
                self.u8(7);
                self.u32(v.to_bits());
            }
            Constant::Double(v) => {
                self.u8(8);
                self.u64(v.to_bits());
            }
            Constant::String(s) => {
                self.u8(9);
                self.string(s);
            }
        }
    }

    fn element(&mut self, v: &ElementValue) {
        match v {
            ElementValue::Const(c) => {
                self.u8(b'k');
                self.constant(c);
            }
            ElementValue::Enum { owner, name } => {
                self.u8(b'e');
                self.string(owner);
                self.string(name);
            }
            ElementValue::Class(ty) => {
                self.u8(b'c');
                self.string(&ty.descriptor());
            }
            ElementValue::Annotation(a) => {
                self.u8(b'@');
                self.annotation(a);
            }
            ElementValue::Array(items) => {
                self.u8(b'[');
                self.u16(items.len() as u16);
                for item in items {
                    self.element(item);
                }
            }
        }
    }

    fn annotation(&mut self, a: &Annotation) {
        self.string(&a.class);
        self.u16(a.values.len() as u16);
        for (name, value) in &a.values {
            self.string(name);
            self.element(value);
        }
    }

    fn annotations(&mut self, list: &[Annotation]) {
        self.u16(list.len() as u16);
        for a in list {
            self.annotation(a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::BootstrapLibrary;
    use lava_core::lang::well_known;

    fn cache_of_bootstrap() -> (Vec<u8>, BootstrapLibrary) {
        let lib = BootstrapLibrary::new();
        let mut writer = SymbolCacheWriter::new();
        writer.add_library(&lib);
        (writer.to_bytes(), lib)
    }

    #[test]
    fn test_bootstrap_survives_cache() {
        let (bytes, lib) = cache_of_bootstrap();
        let cache = SymbolCache::from_bytes(Path::new("rt.lsym"), &bytes).unwrap();
        assert_eq!(cache.content(), lib.content());
        for name in [well_known::ENUM, "java/util/HashMap", "java/lang/Deprecated", "java/lang/Integer"] {
            assert_eq!(cache.get(name).as_deref(), lib.get(name).as_deref(), "{name}");
        }
    }

    #[test]
    fn test_entries_decode_once() {
        let (bytes, _) = cache_of_bootstrap();
        let cache = SymbolCache::from_bytes(Path::new("rt.lsym"), &bytes).unwrap();
        let a = cache.get(well_known::STRING).unwrap();
        let b = cache.get(well_known::STRING).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_corrupt_header_is_fatal() {
        let (mut bytes, _) = cache_of_bootstrap();
        bytes[0] = b'X';
        let err = SymbolCache::from_bytes(Path::new("rt.lsym"), &bytes).err().unwrap();
        assert!(matches!(err, SessionError::CorruptSymbolCache { .. }));

        let (bytes, _) = cache_of_bootstrap();
        let err = SymbolCache::from_bytes(Path::new("rt.lsym"), &bytes[..bytes.len() / 2]).err().unwrap();
        assert!(matches!(err, SessionError::CorruptSymbolCache { .. }));
    }

    #[test]
    fn test_corrupt_entry_is_missing() {
        let mut writer = SymbolCacheWriter::new();
        writer.add(&ClassNode::new("p/Good", 0, ClassOrigin::Library));
        let mut bytes = writer.to_bytes();
        // Point the interfaces count of the only entry far past the payload.
        let payload_start = bytes.len() - writer.payload.len();
        let interfaces_at = payload_start + 2 + 4 + 4;
        bytes[interfaces_at] = 0xFF;
        bytes[interfaces_at + 1] = 0xFF;
        let cache = SymbolCache::from_bytes(Path::new("x.lsym"), &bytes).unwrap();
        assert!(cache.content().contains("p/Good"));
        assert!(cache.get("p/Good").is_none());
    }
}
