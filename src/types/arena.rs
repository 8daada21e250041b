//! Hash-consed storage for type syntax.
//!
//! The structure parser records every written type (`List<String>`, `int[]`, `? extends T`) as a [`TypeNode`] in a
//! per-unit [`TypeArena`] and keeps only a [`TypeRef`] index. Structurally equal types share one entry, so later
//! stages resolve each distinct written type once and cache the result by index.

use lava_core::lang::primitives::PrimitiveKind;
use lava_syntax::Span;
use rustc_hash::FxHashMap;

use super::{Generic, GenericSub, IType, Type, WildcardBound};

/// Index of a [`TypeNode`] in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);

impl TypeRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One `Name<args>` step of a written class type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: String,
    pub args: Vec<TypeRef>,
}

/// A type as written in source; names are not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Primitive { kind: PrimitiveKind, dims: u8 },
    Named { segments: Vec<Segment>, dims: u8 },
    Wildcard { bound: WildcardBound, ty: Option<TypeRef> },
}

#[derive(Debug, Default)]
pub struct TypeArena {
    nodes: Vec<TypeNode>,
    spans: Vec<Span>,
    index: FxHashMap<TypeNode, TypeRef>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `node`, returning the existing index if an equal node was stored before.
    ///
    /// The span of the first occurrence is kept for diagnostics.
    pub fn intern(&mut self, node: TypeNode, span: Span) -> TypeRef {
        if let Some(existing) = self.index.get(&node) {
            return *existing;
        }
        let id = TypeRef(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node.clone());
        self.spans.push(span);
        self.index.insert(node, id);
        id
    }

    pub fn node(&self, id: TypeRef) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn span(&self, id: TypeRef) -> Span {
        self.spans[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Convert to an [`IType`] that still carries the written (dotted) names.
    ///
    /// Leading segments without arguments are joined into the owner name (`java.util.Map.Entry`); segments after
    /// the first parameterized one become a member-class path.
    pub fn to_itype(&self, id: TypeRef) -> IType {
        match self.node(id) {
            TypeNode::Primitive { kind, dims } => IType::Raw(Type::primitive(*kind).with_dims(*dims)),
            TypeNode::Wildcard { bound, ty } => IType::Wildcard {
                bound: *bound,
                ty: ty.map(|t| Box::new(self.to_itype(t))),
            },
            TypeNode::Named { segments, dims } => {
                let mut owner = String::new();
                let mut rest = segments.iter().peekable();
                let mut args = Vec::new();
                while let Some(seg) = rest.next() {
                    if !owner.is_empty() {
                        owner.push('.');
                    }
                    owner.push_str(&seg.name);
                    if !seg.args.is_empty() {
                        args = seg.args.iter().map(|a| self.to_itype(*a)).collect();
                        break;
                    }
                }
                let subs: Vec<&Segment> = rest.collect();
                if args.is_empty() && subs.is_empty() {
                    return IType::Raw(Type::class(owner).with_dims(*dims));
                }
                let sub = subs.into_iter().rev().fold(None, |inner, seg| {
                    Some(Box::new(GenericSub {
                        name: seg.name.clone(),
                        args: seg.args.iter().map(|a| self.to_itype(*a)).collect(),
                        sub: inner,
                    }))
                });
                IType::Generic(Box::new(Generic {
                    owner,
                    args,
                    dims: *dims,
                    sub,
                }))
            }
        }
    }

    /// Best-effort erased form before names are resolved. Used for the structural skeleton only.
    pub fn written_erasure(&self, id: TypeRef) -> Type {
        match self.node(id) {
            TypeNode::Primitive { kind, dims } => Type::primitive(*kind).with_dims(*dims),
            TypeNode::Named { segments, dims } => {
                let name = segments.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(".");
                Type::class(name).with_dims(*dims)
            }
            TypeNode::Wildcard { .. } => Type::object(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(arena: &mut TypeArena, names: &[(&str, Vec<TypeRef>)], dims: u8) -> TypeRef {
        let segments = names
            .iter()
            .map(|(n, a)| Segment {
                name: n.to_string(),
                args: a.clone(),
            })
            .collect();
        arena.intern(TypeNode::Named { segments, dims }, Span::at(0))
    }

    #[test]
    fn test_interning_shares_equal_nodes() {
        let mut arena = TypeArena::new();
        let a = named(&mut arena, &[("String", vec![])], 0);
        let b = named(&mut arena, &[("String", vec![])], 0);
        let c = named(&mut arena, &[("String", vec![])], 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_to_itype_splits_member_path() {
        let mut arena = TypeArena::new();
        let s = named(&mut arena, &[("String", vec![])], 0);
        let t = named(&mut arena, &[("p", vec![]), ("Outer", vec![s]), ("Inner", vec![])], 0);
        let IType::Generic(g) = arena.to_itype(t) else { panic!("expected generic") };
        assert_eq!(g.owner, "p.Outer");
        assert_eq!(g.args, vec![IType::class("String")]);
        assert_eq!(g.sub.as_ref().map(|s| s.name.as_str()), Some("Inner"));
    }

    #[test]
    fn test_to_itype_raw_dotted() {
        let mut arena = TypeArena::new();
        let t = named(&mut arena, &[("Map", vec![]), ("Entry", vec![])], 2);
        assert_eq!(arena.to_itype(t), IType::Raw(Type::class("Map.Entry").with_dims(2)));
    }
}
