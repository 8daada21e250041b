//! Access control for classes and members.

use lava_core::access::{self, Visibility};
use lava_syntax::Span;
use lava_syntax::diagnostics::codes;

use super::LocalContext;
use crate::class::ClassNode;
use crate::types::display_name;

impl LocalContext<'_> {
    /// Return `true` if a member of `owner` with flags `member_access` may be used from the current class.
    ///
    /// Private members are visible inside the whole nest; protected members also from subclasses of `owner`,
    /// including subclasses that merely enclose the current class.
    pub fn check_accessible(&self, owner: &ClassNode, member_access: u16) -> bool {
        let current = self.class_name();
        match Visibility::of(member_access) {
            Visibility::Public => true,
            Visibility::Private => lava_core::nest_host(&owner.name) == lava_core::nest_host(current),
            Visibility::Package => owner.package() == lava_core::package_of(current),
            Visibility::Protected => {
                owner.package() == lava_core::package_of(current)
                    || self.scope().chain().any(|s| self.instance_of(&s.class, &owner.name))
            }
        }
    }

    /// Like [`LocalContext::check_accessible`], reporting `member.inaccessible` on failure.
    pub fn assert_accessible(&self, owner: &ClassNode, member: &str, member_access: u16, span: Span) -> bool {
        let ok = self.check_accessible(owner, member_access);
        if !ok {
            self.error(
                span,
                codes::MEMBER_INACCESSIBLE,
                vec![
                    display_name(&owner.name),
                    member.to_string(),
                    Visibility::of(member_access).as_str().to_string(),
                ],
            );
        }
        ok
    }

    /// Return `true` if class `node` may be named from the current class.
    ///
    /// Nested classes are judged by their declared flags; a protected member class counts as protected on its
    /// enclosing class.
    pub fn check_class_accessible(&self, node: &ClassNode) -> bool {
        let declared = node.declared_access();
        match node.outer() {
            Some(outer) => match self.class_info(outer) {
                Some(outer_node) => self.check_accessible(&outer_node, declared),
                None => true,
            },
            None => {
                access::has(declared, access::ACC_PUBLIC) || node.package() == lava_core::package_of(self.class_name())
            }
        }
    }

    /// Like [`LocalContext::check_class_accessible`], reporting `class.inaccessible` on failure.
    pub fn assert_class_accessible(&self, node: &ClassNode, span: Span) -> bool {
        let ok = self.check_class_accessible(node);
        if !ok {
            let visibility = Visibility::of(node.declared_access()).as_str().to_string();
            self.error(span, codes::CLASS_INACCESSIBLE, vec![display_name(&node.name), visibility]);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassOrigin};
    use crate::context::GlobalContext;
    use crate::local::test_support::scope;
    use lava_core::access::{ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC};

    fn generated(ctx: &GlobalContext, builder: ClassBuilder) {
        ctx.add_generated_class(builder.origin(ClassOrigin::Generated).build().unwrap());
    }

    #[test]
    fn test_protected_through_subclass() {
        let ctx = GlobalContext::new();
        generated(&ctx, ClassBuilder::new("q/Base", ACC_PUBLIC));
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p;"), 0);
        let base = ctx.get_class_info("q/Base").unwrap();
        assert!(!lc.check_accessible(&base, ACC_PROTECTED));
        assert!(!lc.check_accessible(&base, 0));
        assert!(lc.check_accessible(&base, ACC_PUBLIC));

        let mut test = (*ctx.get_class_info("p/Test").unwrap()).clone();
        test.parent = Some("q/Base".into());
        ctx.publish(test);
        assert!(lc.check_accessible(&base, ACC_PROTECTED));
        assert!(!lc.assert_accessible(&base, "secret", ACC_PRIVATE, Span::at(0)));
        assert_eq!(ctx.diagnostics()[0].args[2], "private");
    }

    #[test]
    fn test_private_within_nest() {
        let ctx = GlobalContext::new();
        generated(
            &ctx,
            ClassBuilder::new("p/Test$Inner", 0).inner("p/Test$Inner", "p/Test", "Inner", ACC_PRIVATE | ACC_STATIC),
        );
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p;"), 0);
        let inner = ctx.get_class_info("p/Test$Inner").unwrap();
        assert!(lc.check_accessible(&inner, ACC_PRIVATE));
        assert!(lc.check_class_accessible(&inner));
    }

    #[test]
    fn test_package_private_class() {
        let ctx = GlobalContext::new();
        generated(&ctx, ClassBuilder::new("q/Hidden", 0));
        let lc = LocalContext::new(&ctx, scope(&ctx, "package p;"), 0);
        let hidden = ctx.get_class_info("q/Hidden").unwrap();
        assert!(!lc.assert_class_accessible(&hidden, Span::at(0)));
        assert!(ctx.has_error());
    }
}
