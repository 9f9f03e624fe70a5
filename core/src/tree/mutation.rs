//! Structural and property mutation.
//!
//! Every operation here leaves the tree consistent before it returns:
//! parent links match slot contents, back-reference buckets match the
//! reference slots of attached elements, and feature sets match their
//! predicates. Errors are reported before anything is modified.

use crate::back_refs::BackRef;
use crate::element::{ChildStorage, ParentLink};
use crate::error::TreeError;
use crate::id::{ChildSlot, ElementId, RefSlot};
use crate::kind::{ElementKind, SlotShape};

use super::BirTree;

impl BirTree {
    /// Puts `child` into the single slot `slot` of `parent`, or clears the
    /// slot with `None`. Returns the previous occupant, which is detached.
    ///
    /// Setting the current occupant again is a no-op and returns `None`:
    /// nothing was displaced.
    pub fn set_child(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        child: Option<ElementId>,
    ) -> Result<Option<ElementId>, TreeError> {
        self.check_slot(parent, slot, SlotShape::Single)?;
        let previous = self.child(parent, slot);
        if previous == child {
            return Ok(None);
        }
        if let Some(child) = child {
            self.check_attachable(child, parent)?;
        }

        *self.storage_mut(parent, slot) = ChildStorage::Single(child);
        if let Some(previous) = previous {
            self.el_mut(previous).parent = None;
        }
        if let Some(child) = child {
            self.el_mut(child).parent = Some(ParentLink {
                parent,
                slot,
                index: 0,
            });
        }
        self.el_mut(parent).touch();
        self.bump();

        if let Some(module) = self.el(parent).module {
            if let Some(previous) = previous {
                self.unregister_subtree(previous);
            }
            if let Some(child) = child {
                self.register_subtree(child, module);
            }
        }
        self.reevaluate(parent);
        tracing::trace!(%parent, %slot, ?previous, ?child, "set child");
        Ok(previous)
    }

    /// Detaches the occupant of a single slot.
    pub fn take_child(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
    ) -> Result<Option<ElementId>, TreeError> {
        self.set_child(parent, slot, None)
    }

    /// Puts `new` exactly where `old` sits (same slot, same list position)
    /// and detaches `old`.
    pub fn replace(&mut self, old: ElementId, new: ElementId) -> Result<(), TreeError> {
        let link = self
            .get(old)?
            .parent
            .ok_or(TreeError::NotAttachedToParent { element: old })?;
        if old == new {
            return Ok(());
        }
        self.check_attachable(new, link.parent)?;

        match self.storage_mut(link.parent, link.slot) {
            ChildStorage::Single(occupant) => *occupant = Some(new),
            ChildStorage::List(items) => items[link.index as usize] = new,
        }
        self.el_mut(old).parent = None;
        self.el_mut(new).parent = Some(link);
        self.el_mut(link.parent).touch();
        self.bump();

        if let Some(module) = self.el(link.parent).module {
            self.unregister_subtree(old);
            self.register_subtree(new, module);
        }
        self.reevaluate(link.parent);
        tracing::trace!(%old, %new, parent = %link.parent, "replaced element");
        Ok(())
    }

    /// [`replace`](Self::replace), checking that `old` is a child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: ElementId,
        old: ElementId,
        new: ElementId,
    ) -> Result<(), TreeError> {
        self.check(parent)?;
        if self.parent(old) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child: old });
        }
        self.replace(old, new)
    }

    /// Detaches `element` from whatever slot holds it.
    pub fn remove(&mut self, element: ElementId) -> Result<(), TreeError> {
        let link = self
            .get(element)?
            .parent
            .ok_or(TreeError::NotAttachedToParent { element })?;
        match self.el(link.parent).children[link.slot.0 as usize] {
            ChildStorage::Single(_) => self.set_child(link.parent, link.slot, None).map(|_| ()),
            ChildStorage::List(_) => self
                .remove_child_at(link.parent, link.slot, link.index as usize)
                .map(|_| ()),
        }
    }

    /// Points reference slot `slot` of `element` at `target` (or clears it).
    /// Returns the previous target.
    ///
    /// Setting the current target again is a no-op and returns `None`, the
    /// same as [`set_child`](Self::set_child).
    ///
    /// The back-reference buckets are updated only while `element` is
    /// attached; a detached element's references are recorded when it is
    /// attached.
    pub fn set_reference(
        &mut self,
        element: ElementId,
        slot: RefSlot,
        target: Option<ElementId>,
    ) -> Result<Option<ElementId>, TreeError> {
        self.check_ref_slot(element, slot)?;
        if let Some(target) = target {
            self.check(target)?;
        }
        let previous = self.el(element).reference(slot);
        if previous == target {
            return Ok(None);
        }

        if self.el(element).module.is_some() {
            let entry = BackRef {
                from: element,
                slot,
            };
            if let Some(previous) = previous {
                let removed = self.el_mut(previous).referenced_by.unregister(entry);
                debug_assert!(removed, "stale reference from {element} to {previous}");
            }
            if let Some(target) = target {
                self.el_mut(target).referenced_by.register(entry);
            }
        }
        let el = self.el_mut(element);
        el.references[slot.0 as usize] = target;
        el.touch();
        self.bump();
        self.reevaluate(element);
        tracing::trace!(%element, %slot, ?previous, ?target, "set reference");
        Ok(previous)
    }

    /// Runs `f` on the properties of `element` and re-evaluates the element
    /// in every feature set afterwards.
    ///
    /// # Panics
    ///
    /// If `f` changes the element's class. Slot storage is shaped by the
    /// class, so that would corrupt the tree.
    pub fn modify<R>(
        &mut self,
        element: ElementId,
        f: impl FnOnce(&mut ElementKind) -> R,
    ) -> Result<R, TreeError> {
        self.check(element)?;
        let el = self.el_mut(element);
        let class = el.class();
        let result = f(&mut el.kind);
        assert_eq!(
            el.class(),
            class,
            "modify must not change the class of {element}"
        );
        el.touch();
        self.bump();
        self.reevaluate(element);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::kind::slots::{call, function, ret};
    use crate::test_utils::init_test_logging;
    use crate::{BirTree, ElementKind, FeatureSpec, ModuleOrigin, TreeError};

    fn function(tree: &mut BirTree, name: &str) -> crate::ElementId {
        tree.create(ElementKind::Function {
            name: name.into(),
            is_inline: false,
            is_exported: false,
        })
    }

    #[test]
    fn test_set_child_links_both_ways() {
        init_test_logging();
        let mut tree = BirTree::new();
        let f = function(&mut tree, "f");
        let body = tree.create(ElementKind::Block);

        assert_eq!(tree.set_child(f, function::BODY, Some(body)), Ok(None));
        assert_eq!(tree.parent(body), Some(f));
        assert_eq!(tree.child(f, function::BODY), Some(body));
        assert_eq!(tree.position_in_parent(body), Some((function::BODY, 0)));

        assert_eq!(tree.take_child(f, function::BODY), Ok(Some(body)));
        assert_eq!(tree.parent(body), None);
        assert_eq!(tree.child(f, function::BODY), None);
    }

    #[test]
    fn test_attach_errors() {
        let mut tree = BirTree::new();
        let f = function(&mut tree, "f");
        let g = function(&mut tree, "g");
        let body = tree.create(ElementKind::Block);
        tree.set_child(f, function::BODY, Some(body)).unwrap();

        assert_eq!(
            tree.set_child(g, function::BODY, Some(body)),
            Err(TreeError::AlreadyAttached {
                element: body,
                parent: f,
                new_parent: g
            })
        );
        // A function body is a single slot, the parameter list is not.
        assert!(matches!(
            tree.set_child(f, function::PARAMETERS, Some(g)),
            Err(TreeError::NotASingleSlot { .. })
        ));

        let inner = tree.create(ElementKind::Return);
        tree.push_child(body, crate::slots::block::STATEMENTS, inner)
            .unwrap();
        assert_eq!(
            tree.set_child(inner, ret::VALUE, Some(f)),
            Err(TreeError::WouldCreateCycle {
                element: f,
                new_parent: inner
            })
        );

        let module = tree.add_module(g, ModuleOrigin::Local).unwrap();
        assert_eq!(
            tree.set_child(inner, ret::VALUE, Some(g)),
            Err(TreeError::CannotAttachRoot {
                element: g,
                module,
                new_parent: inner
            })
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut tree = BirTree::new();
        let call = tree.create(ElementKind::Call);
        let args: Vec<_> = (0..3).map(|_| tree.create(ElementKind::Block)).collect();
        tree.extend_children(call, call::ARGUMENTS, args.iter().copied())
            .unwrap();
        let replacement = tree.create(ElementKind::Return);

        tree.replace(args[1], replacement).unwrap();
        assert_eq!(
            tree.slot_children(call, call::ARGUMENTS),
            &[args[0], replacement, args[2]]
        );
        assert_eq!(tree.position_in_parent(replacement), Some((call::ARGUMENTS, 1)));
        assert_eq!(tree.parent(args[1]), None);

        assert_eq!(
            tree.replace(args[1], replacement),
            Err(TreeError::NotAttachedToParent { element: args[1] })
        );
        assert_eq!(
            tree.replace_child(replacement, args[0], args[1]),
            Err(TreeError::NotAChild {
                parent: replacement,
                child: args[0]
            })
        );
    }

    #[test]
    fn test_back_references_follow_attachment() {
        let mut tree = BirTree::new();
        let root = tree.create(ElementKind::ModuleFragment { name: "m".into() });
        let file = tree.create(ElementKind::File { name: "a".into() });
        tree.push_child(root, crate::slots::module_fragment::FILES, file)
            .unwrap();
        let callee = function(&mut tree, "callee");
        let caller = function(&mut tree, "caller");
        tree.extend_children(file, crate::slots::file::DECLARATIONS, [callee, caller])
            .unwrap();
        tree.add_module(root, ModuleOrigin::Local).unwrap();

        let body = tree.create(ElementKind::Block);
        let c = tree.create(ElementKind::Call);
        tree.set_reference(c, call::TARGET, Some(callee)).unwrap();
        tree.push_child(body, crate::slots::block::STATEMENTS, c)
            .unwrap();
        // Still detached: nothing recorded yet.
        assert!(tree.references_to(callee).unwrap().is_empty());

        tree.set_child(caller, function::BODY, Some(body)).unwrap();
        assert_eq!(
            tree.references_to(callee).unwrap().referrers().collect::<Vec<_>>(),
            vec![c]
        );

        tree.set_reference(c, call::TARGET, Some(caller)).unwrap();
        assert!(tree.references_to(callee).unwrap().is_empty());
        assert_eq!(tree.references_to(caller).unwrap().len(), 1);

        tree.take_child(caller, function::BODY).unwrap();
        assert!(tree.references_to(caller).unwrap().is_empty());
    }

    #[test]
    fn test_noop_setters_return_none() {
        let mut tree = BirTree::new();
        let f = function(&mut tree, "f");
        let body = tree.create(ElementKind::Block);
        let c = tree.create(ElementKind::Call);
        tree.set_child(f, function::BODY, Some(body)).unwrap();
        tree.set_reference(c, call::TARGET, Some(f)).unwrap();
        let stamp = tree.mutation_stamp();

        assert_eq!(tree.set_child(f, function::BODY, Some(body)), Ok(None));
        assert_eq!(tree.set_reference(c, call::TARGET, Some(f)), Ok(None));
        assert_eq!(tree.mutation_stamp(), stamp);
        assert_eq!(tree.parent(body), Some(f));

        assert_eq!(tree.set_reference(c, call::TARGET, None), Ok(Some(f)));
        assert_eq!(tree.mutation_stamp(), stamp + 1);
    }

    #[test]
    fn test_modify_reevaluates_features() {
        let mut tree = BirTree::new();
        let f = function(&mut tree, "f");
        tree.add_module(f, ModuleOrigin::Local).unwrap();
        let inline = tree.register_feature(FeatureSpec::new(|e| e.kind().is_inline_function()));
        assert!(tree.matching(inline).unwrap().is_empty());

        tree.modify(f, |kind| {
            if let ElementKind::Function { is_inline, .. } = kind {
                *is_inline = true;
            }
        })
        .unwrap();
        assert!(tree.matching(inline).unwrap().contains(f));
    }

    #[test]
    #[should_panic(expected = "must not change the class")]
    fn test_modify_rejects_class_change() {
        let mut tree = BirTree::new();
        let f = function(&mut tree, "f");
        let _ = tree.modify(f, |kind| *kind = ElementKind::Block);
    }
}
