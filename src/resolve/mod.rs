//! Per-class derived lookup tables.
//!
//! A [`ResolveHelper`] wraps one class snapshot and lazily computes what resolution repeatedly needs about it:
//!
//! - the ancestor list with minimum inheritance distances ([`ClassList`])
//! - inherited methods and fields grouped by name
//! - the type arguments each parameterized ancestor is instantiated with
//! - declared flags of member classes
//! - annotation metadata, when the class is an annotation type
//!
//! Each table is computed at most once per helper. The global context keeps one helper per class name and drops it
//! whenever the class is republished, so helpers never observe a stale snapshot.
//!
//! A helper computation may read other classes through the context but never asks for another helper; this keeps
//! the per-key compute-once cells free of re-entrancy.

mod annotations;

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use lava_core::lang::well_known;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::class::{ClassNode, FieldNode, MethodNode};
use crate::context::GlobalContext;
use crate::error::ClassNotFound;
use crate::types::IType;

pub use annotations::{AnnotationInfo, ElementKind, RetentionPolicy};

/// Ancestors of a class (itself included at distance 0), in breadth-first order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassList {
    entries: Vec<(String, u16)>,
    index: FxHashMap<String, u16>,
}

impl ClassList {
    fn push(&mut self, name: &str, distance: u16) {
        self.entries.push((name.to_string(), distance));
        self.index.insert(name.to_string(), distance);
    }

    /// Minimum inheritance distance to `name`, if it is an ancestor.
    pub fn distance(&self, name: &str) -> Option<u16> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), *d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A method found through a class or one of its ancestors.
#[derive(Debug, Clone)]
pub struct MethodRef {
    pub owner: Arc<ClassNode>,
    pub index: usize,
}

impl MethodRef {
    pub fn method(&self) -> &MethodNode {
        &self.owner.methods[self.index]
    }
}

/// A field found through a class or one of its ancestors.
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub owner: Arc<ClassNode>,
    pub index: usize,
}

impl FieldRef {
    pub fn field(&self) -> &FieldNode {
        &self.owner.fields[self.index]
    }
}

type Lazy<T> = OnceLock<Result<Arc<T>, ClassNotFound>>;

/// Ancestor name → type arguments it is instantiated with (in terms of this class's type variables).
pub type TypeParamOwners = FxHashMap<String, Vec<IType>>;

pub struct ResolveHelper {
    class: Arc<ClassNode>,
    class_list: Lazy<ClassList>,
    methods: Lazy<FxHashMap<String, Vec<MethodRef>>>,
    fields: Lazy<FxHashMap<String, Vec<FieldRef>>>,
    type_params: Lazy<TypeParamOwners>,
    inner_flags: OnceLock<Arc<FxHashMap<String, u16>>>,
    annotation: OnceLock<Option<Arc<AnnotationInfo>>>,
}

impl ResolveHelper {
    pub fn new(class: Arc<ClassNode>) -> Self {
        Self {
            class,
            class_list: OnceLock::new(),
            methods: OnceLock::new(),
            fields: OnceLock::new(),
            type_params: OnceLock::new(),
            inner_flags: OnceLock::new(),
            annotation: OnceLock::new(),
        }
    }

    pub fn class(&self) -> &Arc<ClassNode> {
        &self.class
    }

    /// Ancestor list; fails if any ancestor cannot be found.
    pub fn class_list(&self, ctx: &GlobalContext) -> Result<Arc<ClassList>, ClassNotFound> {
        self.class_list.get_or_init(|| self.compute_class_list(ctx).map(Arc::new)).clone()
    }

    /// Return `true` if this class is `name` or inherits from it. Missing ancestors count as "no".
    pub fn instance_of(&self, ctx: &GlobalContext, name: &str) -> bool {
        self.class_list(ctx).is_ok_and(|list| list.contains(name))
    }

    /// Overload set for `name`: own and inherited methods, nearest first, overridden ones removed.
    ///
    /// Constructors and static initializers are never inherited.
    pub fn find_method(&self, ctx: &GlobalContext, name: &str) -> Result<Vec<MethodRef>, ClassNotFound> {
        let table = self.methods.get_or_init(|| self.compute_methods(ctx).map(Arc::new)).clone()?;
        Ok(table.get(name).cloned().unwrap_or_default())
    }

    /// Fields named `name` in this class and its ancestors, nearest first.
    pub fn find_field(&self, ctx: &GlobalContext, name: &str) -> Result<Vec<FieldRef>, ClassNotFound> {
        let table = self.fields.get_or_init(|| self.compute_fields(ctx).map(Arc::new)).clone()?;
        Ok(table.get(name).cloned().unwrap_or_default())
    }

    /// For each parameterized ancestor, the type arguments it receives.
    ///
    /// For `class X<T> extends ArrayList<T>` the result maps `java/util/List` to `[T]`. Ancestors only reachable
    /// through a raw supertype are absent.
    pub fn type_param_owner(&self, ctx: &GlobalContext) -> Result<Arc<TypeParamOwners>, ClassNotFound> {
        self.type_params.get_or_init(|| self.compute_type_params(ctx).map(Arc::new)).clone()
    }

    /// Return `true` if a table already computed here may have read `name`.
    ///
    /// Used to drop helpers that captured an outdated snapshot of a republished class.
    pub fn depends_on(&self, name: &str) -> bool {
        if self.class.name == name || self.type_params.get().is_some() {
            return true;
        }
        match self.class_list.get() {
            Some(Ok(list)) => list.contains(name),
            Some(Err(err)) => err.name == name,
            None => false,
        }
    }

    /// Declared flags of the member classes of this class, keyed by internal name.
    pub fn inner_class_flags(&self) -> Arc<FxHashMap<String, u16>> {
        Arc::clone(self.inner_flags.get_or_init(|| {
            let flags = self
                .class
                .inner_classes
                .iter()
                .filter(|ic| ic.outer.as_deref() == Some(self.class.name.as_str()))
                .map(|ic| (ic.inner.clone(), ic.access))
                .collect();
            Arc::new(flags)
        }))
    }

    /// Annotation metadata; `None` when the class is not an annotation type.
    pub fn annotation_info(&self) -> Option<Arc<AnnotationInfo>> {
        self.annotation
            .get_or_init(|| AnnotationInfo::of(&self.class).map(Arc::new))
            .clone()
    }

    fn load(&self, ctx: &GlobalContext, name: &str, needed_by: &str) -> Result<Arc<ClassNode>, ClassNotFound> {
        if name == self.class.name {
            return Ok(Arc::clone(&self.class));
        }
        ctx.get_class_info(name).ok_or_else(|| ClassNotFound::new(name, needed_by))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(class = %self.class.name))]
    fn compute_class_list(&self, ctx: &GlobalContext) -> Result<ClassList, ClassNotFound> {
        let mut list = ClassList::default();
        list.push(&self.class.name, 0);
        let mut queue = VecDeque::from([(Arc::clone(&self.class), 0u16)]);
        while let Some((node, distance)) = queue.pop_front() {
            for sup in node.supers() {
                if list.contains(sup) {
                    continue;
                }
                let info = self.load(ctx, sup, &node.name)?;
                list.push(sup, distance + 1);
                queue.push_back((info, distance + 1));
            }
        }
        Ok(list)
    }

    fn compute_methods(&self, ctx: &GlobalContext) -> Result<FxHashMap<String, Vec<MethodRef>>, ClassNotFound> {
        let list = self.class_list(ctx)?;
        let mut table: FxHashMap<String, Vec<MethodRef>> = FxHashMap::default();
        for (name, distance) in list.iter() {
            let node = self.load(ctx, name, &self.class.name)?;
            for (index, method) in node.methods.iter().enumerate() {
                let special = method.is_constructor() || method.name == well_known::STATIC_INIT;
                if special && distance > 0 {
                    continue;
                }
                let overloads = table.entry(method.name.clone()).or_default();
                let key = method.param_key();
                if overloads.iter().any(|r| r.method().param_key() == key) {
                    continue;
                }
                overloads.push(MethodRef {
                    owner: Arc::clone(&node),
                    index,
                });
            }
        }
        Ok(table)
    }

    fn compute_fields(&self, ctx: &GlobalContext) -> Result<FxHashMap<String, Vec<FieldRef>>, ClassNotFound> {
        let list = self.class_list(ctx)?;
        let mut table: FxHashMap<String, Vec<FieldRef>> = FxHashMap::default();
        for (name, _) in list.iter() {
            let node = self.load(ctx, name, &self.class.name)?;
            for (index, field) in node.fields.iter().enumerate() {
                table.entry(field.name.clone()).or_default().push(FieldRef {
                    owner: Arc::clone(&node),
                    index,
                });
            }
        }
        Ok(table)
    }

    fn compute_type_params(&self, ctx: &GlobalContext) -> Result<TypeParamOwners, ClassNotFound> {
        let mut owners = TypeParamOwners::default();
        let mut visited = FxHashSet::default();
        visited.insert(self.class.name.clone());
        let mut queue = VecDeque::from([(Arc::clone(&self.class), FxHashMap::<String, IType>::default())]);

        while let Some((node, subst)) = queue.pop_front() {
            let supers = node.generic_parent().into_iter().chain(node.generic_interfaces());
            for sup in supers {
                let (name, args) = match &sup {
                    IType::Generic(g) => (g.full_name(), g.innermost_args().iter().map(|a| a.substitute(&subst)).collect()),
                    IType::Raw(t) => match t.class_name() {
                        Some(name) => (name.to_string(), Vec::new()),
                        None => continue,
                    },
                    _ => continue,
                };
                if !visited.insert(name.clone()) {
                    continue;
                }
                let info = self.load(ctx, &name, &node.name)?;
                let params: Vec<&str> = info.signature.iter().flat_map(|s| s.type_param_names()).collect();
                if args.is_empty() && !params.is_empty() {
                    // Raw use of a generic class: everything above it is erased.
                    continue;
                }
                let next: FxHashMap<String, IType> =
                    params.iter().map(|p| p.to_string()).zip(args.iter().cloned()).collect();
                if !args.is_empty() {
                    owners.insert(name, args);
                }
                queue.push_back((info, next));
            }
        }
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassOrigin};
    use lava_core::access::ACC_PUBLIC;

    fn ctx_with(nodes: Vec<ClassNode>) -> GlobalContext {
        let ctx = GlobalContext::new();
        for node in nodes {
            ctx.add_generated_class(node);
        }
        ctx
    }

    #[test]
    fn test_class_list_distances() {
        let ctx = GlobalContext::new();
        let helper = ctx.helper_for("java/util/ArrayList").unwrap();
        let list = helper.class_list(&ctx).unwrap();
        assert_eq!(list.distance("java/util/ArrayList"), Some(0));
        assert_eq!(list.distance("java/util/List"), Some(1));
        assert_eq!(list.distance("java/util/AbstractList"), Some(1));
        assert_eq!(list.distance("java/util/Collection"), Some(2));
        assert_eq!(list.distance("java/lang/Iterable"), Some(3));
        assert!(Arc::ptr_eq(&list, &helper.class_list(&ctx).unwrap()));
    }

    #[test]
    fn test_missing_ancestor() {
        let ctx = ctx_with(vec![ClassBuilder::new("p/A", ACC_PUBLIC)
            .parent("p/Nope")
            .origin(ClassOrigin::Generated)
            .build()
            .unwrap()]);
        let err = ctx.helper_for("p/A").unwrap().class_list(&ctx).unwrap_err();
        assert_eq!(err, ClassNotFound::new("p/Nope", "p/A"));
    }

    #[test]
    fn test_overridden_methods_hidden() {
        let ctx = ctx_with(vec![ClassBuilder::new("p/S", ACC_PUBLIC)
            .method("toString", ACC_PUBLIC, "()Ljava/lang/String;")
            .method("<init>", ACC_PUBLIC, "()V")
            .build()
            .unwrap()]);
        let helper = ctx.helper_for("p/S").unwrap();
        let to_string = helper.find_method(&ctx, "toString").unwrap();
        assert_eq!(to_string.len(), 1);
        assert_eq!(to_string[0].owner.name, "p/S");
        let hash = helper.find_method(&ctx, "hashCode").unwrap();
        assert_eq!(hash[0].owner.name, well_known::OBJECT);
        assert_eq!(helper.find_method(&ctx, "<init>").unwrap().len(), 1);
    }

    #[test]
    fn test_type_param_owner_through_library() {
        let ctx = GlobalContext::new();
        let helper = ctx.helper_for("java/util/HashMap").unwrap();
        let owners = helper.type_param_owner(&ctx).unwrap();
        assert_eq!(owners["java/util/Map"], vec![IType::type_param("K"), IType::type_param("V")]);
        assert_eq!(owners["java/util/AbstractMap"].len(), 2);
    }

    #[test]
    fn test_inner_class_flags() {
        let ctx = GlobalContext::new();
        let flags = ctx.helper_for(well_known::MAP).unwrap().inner_class_flags();
        assert!(lava_core::access::has(flags["java/util/Map$Entry"], lava_core::access::ACC_STATIC));
    }
}
