//! Dotted path resolution: `(package.)(Class.)(field.)*`.
//!
//! A path such as `java.lang.Integer.MAX_VALUE` or `Outer.Inner.CONST.field` is split into segments. Class prefixes
//! are tried longest first; whatever follows the class must be a static field, then instance fields of each
//! field's type. The first prefix that resolves the whole path wins. If none does, the failure that got furthest
//! into the path is reported.

use std::sync::Arc;

use lava_core::access::Visibility;
use lava_syntax::Span;
use lava_syntax::diagnostics::codes;

use super::LocalContext;
use crate::class::{ClassNode, Constant};
use crate::resolve::FieldRef;
use crate::types::{IType, display_name};

/// A field as seen through a receiver type.
#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub field: FieldRef,
    /// Field type with the receiver's type arguments applied.
    pub ty: IType,
}

impl FieldAccess {
    pub fn owner(&self) -> &Arc<ClassNode> {
        &self.field.owner
    }

    pub fn name(&self) -> &str {
        &self.field.field().name
    }

    pub fn is_static(&self) -> bool {
        self.field.field().is_static()
    }

    pub fn constant(&self) -> Option<&Constant> {
        self.field.field().constant.as_ref()
    }
}

/// What a dotted path denotes.
#[derive(Debug, Clone)]
pub enum DotGet {
    Class(String),
    Field(FieldAccess),
}

/// Why a field lookup failed.
#[derive(Debug, Clone)]
pub enum FieldError {
    /// The receiver is not a class type.
    NotAClass,
    NotFound,
    Inaccessible { owner: Arc<ClassNode>, access: u16 },
}

impl LocalContext<'_> {
    /// Find the accessible field `name` visible through `receiver`, nearest declaration first.
    pub fn find_field(&self, receiver: &IType, name: &str) -> Result<FieldAccess, FieldError> {
        let class = receiver.class_name().ok_or(FieldError::NotAClass)?;
        let helper = self.helper(&class).ok_or(FieldError::NotFound)?;
        let found = helper.find_field(self.global(), name).map_err(|_| FieldError::NotFound)?;
        let mut hidden = None;
        for field in found {
            let access = field.field().access;
            if self.check_accessible(&field.owner, access) {
                let ty = self.member_type(receiver, &field.owner.name, &field.field().generic_type());
                return Ok(FieldAccess { field, ty });
            }
            hidden.get_or_insert((Arc::clone(&field.owner), access));
        }
        match hidden {
            Some((owner, access)) => Err(FieldError::Inaccessible { owner, access }),
            None => Err(FieldError::NotFound),
        }
    }

    /// Like [`LocalContext::find_field`], reporting failure.
    pub fn resolve_field(&self, receiver: &IType, name: &str, span: Span) -> Option<FieldAccess> {
        match self.find_field(receiver, name) {
            Ok(access) => Some(access),
            Err(FieldError::Inaccessible { owner, access }) => {
                self.assert_accessible(&owner, name, access, span);
                None
            }
            Err(FieldError::NotFound | FieldError::NotAClass) => {
                self.error(span, codes::MEMBER_FIELD_NOT_FOUND, vec![receiver.to_string(), name.to_string()]);
                None
            }
        }
    }

    /// Resolve a dotted (or slash-separated) path without reporting. `Err` explains the best partial failure.
    pub fn lookup_dot_get(&self, path: &str) -> Result<DotGet, String> {
        let segments: Vec<&str> = path.split(['.', '/']).filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err("empty path".to_string());
        }
        let mut best: Option<(usize, String)> = None;
        for split in (1..=segments.len()).rev() {
            let Ok(Some(class)) = self.lookup_class(&segments[..split].join(".")) else {
                continue;
            };
            if split == segments.len() {
                return Ok(DotGet::Class(class));
            }
            match self.walk_fields(&class, &segments[split..]) {
                Ok(access) => return Ok(DotGet::Field(access)),
                Err((consumed, reason)) => {
                    let reached = split + consumed;
                    if best.as_ref().is_none_or(|(far, _)| reached > *far) {
                        best = Some((reached, reason));
                    }
                }
            }
        }
        Err(best.map_or_else(|| format!("no class named `{}` is visible", segments[0]), |(_, reason)| reason))
    }

    /// Like [`LocalContext::lookup_dot_get`], reporting `dotget.unresolved` on failure.
    pub fn resolve_dot_get(&self, path: &str, span: Span) -> Option<DotGet> {
        match self.lookup_dot_get(path) {
            Ok(found) => Some(found),
            Err(reason) => {
                self.error(span, codes::DOTGET_UNRESOLVED, vec![display_name(path), reason]);
                None
            }
        }
    }

    /// Static field `fields[0]` of `class`, then instance fields. `Err` carries how many fields resolved.
    fn walk_fields(&self, class: &str, fields: &[&str]) -> Result<FieldAccess, (usize, String)> {
        let mut receiver = IType::class(class);
        let mut current: Option<FieldAccess> = None;
        for (i, name) in fields.iter().enumerate() {
            let access = self.find_field(&receiver, name).map_err(|err| {
                let reason = match err {
                    FieldError::NotAClass => format!("`{receiver}` has no fields"),
                    FieldError::NotFound => format!("`{receiver}` has no field `{name}`"),
                    FieldError::Inaccessible { owner, access } => format!(
                        "`{}.{name}` is {}",
                        display_name(&owner.name),
                        Visibility::of(access).as_str()
                    ),
                };
                (i, reason)
            })?;
            if i == 0 && !access.is_static() {
                return Err((i, format!("`{}.{name}` is not static", display_name(class))));
            }
            receiver = access.ty.clone();
            current = Some(access);
        }
        current.ok_or_else(|| (0, "no field selected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassOrigin};
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use lava_core::access::{ACC_FINAL, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};

    fn fixture(ctx: &GlobalContext) {
        let builder = ClassBuilder::new("q/Holder", ACC_PUBLIC)
            .field("INSTANCE", ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "Lq/Holder;")
            .field("name", ACC_PUBLIC, "Ljava/lang/String;")
            .field("secret", ACC_PRIVATE | ACC_STATIC, "I")
            .field("count", ACC_PUBLIC, "I");
        ctx.add_generated_class(builder.origin(ClassOrigin::Generated).build().unwrap());
    }

    #[test]
    fn test_qualified_static_constant() {
        let ctx = GlobalContext::new();
        let lc = LocalContext::new(&ctx, scope(&ctx, ""), 0);
        let Ok(DotGet::Field(access)) = lc.lookup_dot_get("java.lang.Integer.MAX_VALUE") else {
            panic!("expected a field");
        };
        assert_eq!(access.constant(), Some(&Constant::Int(i32::MAX)));
        assert!(matches!(lc.lookup_dot_get("java/util/Map.Entry"), Ok(DotGet::Class(c)) if c == "java/util/Map$Entry"));
    }

    #[test]
    fn test_field_chain() {
        let ctx = GlobalContext::new();
        fixture(&ctx);
        let lc = LocalContext::new(&ctx, scope(&ctx, "import q.Holder;"), 0);
        let Ok(DotGet::Field(access)) = lc.lookup_dot_get("Holder.INSTANCE.name") else {
            panic!("expected a field");
        };
        assert_eq!(access.name(), "name");
        assert_eq!(access.ty, IType::string());
    }

    #[test]
    fn test_furthest_failure_wins() {
        let ctx = GlobalContext::new();
        fixture(&ctx);
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p;"), 0);
        let err = lc.lookup_dot_get("q.Holder.INSTANCE.missing").unwrap_err();
        assert_eq!(err, "`q.Holder` has no field `missing`");
        let err = lc.lookup_dot_get("q.Holder.count").unwrap_err();
        assert_eq!(err, "`q.Holder.count` is not static");
        let err = lc.lookup_dot_get("q.Holder.secret").unwrap_err();
        assert_eq!(err, "`q.Holder.secret` is private");
        assert!(lc.resolve_dot_get("nowhere.Thing", Span::at(0)).is_none());
        assert_eq!(ctx.diagnostics()[0].code, codes::DOTGET_UNRESOLVED);
    }
}
