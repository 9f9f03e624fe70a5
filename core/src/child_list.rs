//! Ordered list slots.
//!
//! A list slot is a plain `Vec<ElementId>` in the parent; every edit here
//! keeps each child's [`ParentLink`] (parent, slot, index) in step with it.
//! [`ChildList`] and [`ChildListMut`] are views bound to one
//! `(parent, slot)` pair for code that works on a single list.

use core::mem;

use crate::element::{ChildStorage, ParentLink};
use crate::error::TreeError;
use crate::id::{ChildSlot, ElementId};
use crate::kind::SlotShape;
use crate::tree::BirTree;
use crate::Vec;

impl BirTree {
    pub fn list(&self, parent: ElementId, slot: ChildSlot) -> Result<ChildList<'_>, TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        Ok(ChildList {
            tree: self,
            parent,
            slot,
        })
    }

    pub fn list_mut(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
    ) -> Result<ChildListMut<'_>, TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        Ok(ChildListMut {
            tree: self,
            parent,
            slot,
        })
    }

    /// Inserts `child` at `index`, shifting later items right.
    pub fn insert_child(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        index: usize,
        child: ElementId,
    ) -> Result<(), TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        let len = self.slot_children(parent, slot).len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds {
                element: parent,
                slot,
                index,
                len,
            });
        }
        self.check_attachable(child, parent)?;

        self.items_mut(parent, slot)?.insert(index, child);
        self.relink_from(parent, slot, index);
        self.el_mut(parent).touch();
        self.bump();

        if let Some(module) = self.el(parent).module {
            self.register_subtree(child, module);
        }
        self.reevaluate(parent);
        self.reevaluate_items_from(parent, slot, index + 1);
        tracing::trace!(%parent, %slot, index, %child, "inserted child");
        Ok(())
    }

    pub fn push_child(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        child: ElementId,
    ) -> Result<(), TreeError> {
        let len = self.slot_children(parent, slot).len();
        self.insert_child(parent, slot, len, child)
    }

    /// Appends every element of `children` in order. Stops at the first
    /// element that cannot be attached; the ones before it stay attached.
    pub fn extend_children(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        children: impl IntoIterator<Item = ElementId>,
    ) -> Result<(), TreeError> {
        for child in children {
            self.push_child(parent, slot, child)?;
        }
        Ok(())
    }

    /// Removes and detaches the item at `index`.
    pub fn remove_child_at(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        index: usize,
    ) -> Result<ElementId, TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        let len = self.slot_children(parent, slot).len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds {
                element: parent,
                slot,
                index,
                len,
            });
        }

        let child = self.items_mut(parent, slot)?.remove(index);
        self.el_mut(child).parent = None;
        self.relink_from(parent, slot, index);
        self.el_mut(parent).touch();
        self.bump();

        if self.el(parent).module.is_some() {
            self.unregister_subtree(child);
        }
        self.reevaluate(parent);
        self.reevaluate_items_from(parent, slot, index);
        tracing::trace!(%parent, %slot, index, %child, "removed child");
        Ok(child)
    }

    /// Replaces the item at `index` with `child` in place and returns the
    /// detached previous item. Replacing an item with itself is a no-op.
    pub fn set_child_at(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
        index: usize,
        child: ElementId,
    ) -> Result<ElementId, TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        let items = self.slot_children(parent, slot);
        let old = *items.get(index).ok_or(TreeError::IndexOutOfBounds {
            element: parent,
            slot,
            index,
            len: items.len(),
        })?;
        self.replace(old, child)?;
        Ok(old)
    }

    /// Detaches every item of the list; returns them in their former order.
    pub fn clear_children(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
    ) -> Result<Vec<ElementId>, TreeError> {
        self.check_slot(parent, slot, SlotShape::List)?;
        let removed = mem::take(self.items_mut(parent, slot)?);
        if removed.is_empty() {
            return Ok(removed);
        }
        for &child in &removed {
            self.el_mut(child).parent = None;
        }
        self.el_mut(parent).touch();
        self.bump();

        if self.el(parent).module.is_some() {
            for &child in &removed {
                self.unregister_subtree(child);
            }
        }
        self.reevaluate(parent);
        tracing::trace!(%parent, %slot, count = removed.len(), "cleared children");
        Ok(removed)
    }

    /// Moves every item of `(src, src_slot)` to the end of
    /// `(dst, dst_slot)`, preserving order. See
    /// [`splice_all_from_at`](Self::splice_all_from_at).
    pub fn splice_all_from(
        &mut self,
        dst: ElementId,
        dst_slot: ChildSlot,
        src: ElementId,
        src_slot: ChildSlot,
    ) -> Result<usize, TreeError> {
        self.check_slot(dst, dst_slot, SlotShape::List)?;
        let len = self.slot_children(dst, dst_slot).len();
        self.splice_all_from_at(dst, dst_slot, len, src, src_slot)
    }

    /// Moves every item of `(src, src_slot)` into `(dst, dst_slot)` starting
    /// at `index`, preserving order; returns how many were moved.
    ///
    /// This is a single step: moved elements are never observed detached.
    /// When both lists are attached under the same module the registries
    /// are left untouched; otherwise the moved subtrees are re-registered
    /// for their new module. Splicing a list into itself is a no-op.
    pub fn splice_all_from_at(
        &mut self,
        dst: ElementId,
        dst_slot: ChildSlot,
        index: usize,
        src: ElementId,
        src_slot: ChildSlot,
    ) -> Result<usize, TreeError> {
        self.check_slot(dst, dst_slot, SlotShape::List)?;
        self.check_slot(src, src_slot, SlotShape::List)?;
        if dst == src && dst_slot == src_slot {
            return Ok(0);
        }
        let len = self.slot_children(dst, dst_slot).len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds {
                element: dst,
                slot: dst_slot,
                index,
                len,
            });
        }
        // `dst` must not live inside one of the moved subtrees.
        let inside_moved = core::iter::once(dst)
            .chain(self.ancestors(dst))
            .find(|&id| {
                self.parent_link(id)
                    .is_some_and(|link| link.parent == src && link.slot == src_slot)
            });
        if let Some(element) = inside_moved {
            return Err(TreeError::WouldCreateCycle {
                element,
                new_parent: dst,
            });
        }

        let moved = mem::take(self.items_mut(src, src_slot)?);
        if moved.is_empty() {
            return Ok(0);
        }
        self.el_mut(src).touch();
        let items = self.items_mut(dst, dst_slot)?;
        let tail = items.split_off(index);
        items.extend(moved.iter().copied());
        items.extend(tail);
        self.relink_from(dst, dst_slot, index);
        self.el_mut(dst).touch();
        self.bump();

        let from_module = self.el(src).module;
        let to_module = self.el(dst).module;
        if from_module != to_module {
            for &child in &moved {
                if from_module.is_some() {
                    self.unregister_subtree(child);
                }
                if let Some(module) = to_module {
                    self.register_subtree(child, module);
                }
            }
        }
        self.reevaluate(src);
        self.reevaluate(dst);
        self.reevaluate_items_from(dst, dst_slot, index);
        tracing::trace!(%src, %dst, count = moved.len(), "spliced children");
        Ok(moved.len())
    }

    fn items_mut(
        &mut self,
        parent: ElementId,
        slot: ChildSlot,
    ) -> Result<&mut Vec<ElementId>, TreeError> {
        let class = self.el(parent).class();
        match self.storage_mut(parent, slot) {
            ChildStorage::List(items) => Ok(items),
            ChildStorage::Single(_) => Err(TreeError::NotAListSlot {
                element: parent,
                class,
                slot,
            }),
        }
    }

    /// Rewrites the parent links of items `from..` of a list slot. Each
    /// relinked item counts as changed for the feature cache.
    fn relink_from(&mut self, parent: ElementId, slot: ChildSlot, from: usize) {
        let len = self.slot_children(parent, slot).len();
        for index in from..len {
            let child = self.slot_children(parent, slot)[index];
            let el = self.el_mut(child);
            el.parent = Some(ParentLink {
                parent,
                slot,
                index: index as u32,
            });
            el.touch();
        }
    }

    fn reevaluate_items_from(&mut self, parent: ElementId, slot: ChildSlot, from: usize) {
        let len = self.slot_children(parent, slot).len();
        for index in from..len {
            let child = self.slot_children(parent, slot)[index];
            self.reevaluate(child);
        }
    }
}

/// Read view of one list slot.
#[derive(Clone, Copy)]
pub struct ChildList<'a> {
    tree: &'a BirTree,
    parent: ElementId,
    slot: ChildSlot,
}

impl<'a> ChildList<'a> {
    pub fn parent(&self) -> ElementId {
        self.parent
    }

    pub fn as_slice(&self) -> &'a [ElementId] {
        self.tree.slot_children(self.parent, self.slot)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ElementId> {
        self.as_slice().get(index).copied()
    }

    pub fn first(&self) -> Option<ElementId> {
        self.as_slice().first().copied()
    }

    pub fn last(&self) -> Option<ElementId> {
        self.as_slice().last().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ElementId> + 'a {
        self.as_slice().iter().copied()
    }

    /// Position of `child`, read from its parent link.
    pub fn index_of(&self, child: ElementId) -> Option<usize> {
        self.tree
            .parent_link(child)
            .filter(|link| link.parent == self.parent && link.slot == self.slot)
            .map(|link| link.index as usize)
    }
}

/// Mutable view of one list slot. Every method forwards to the tree, so
/// the same consistency guarantees apply.
pub struct ChildListMut<'a> {
    tree: &'a mut BirTree,
    parent: ElementId,
    slot: ChildSlot,
}

impl ChildListMut<'_> {
    pub fn as_slice(&self) -> &[ElementId] {
        self.tree.slot_children(self.parent, self.slot)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ElementId> {
        self.as_slice().get(index).copied()
    }

    pub fn push(&mut self, child: ElementId) -> Result<(), TreeError> {
        self.tree.push_child(self.parent, self.slot, child)
    }

    pub fn insert(&mut self, index: usize, child: ElementId) -> Result<(), TreeError> {
        self.tree.insert_child(self.parent, self.slot, index, child)
    }

    pub fn extend(&mut self, children: impl IntoIterator<Item = ElementId>) -> Result<(), TreeError> {
        self.tree.extend_children(self.parent, self.slot, children)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<ElementId, TreeError> {
        self.tree.remove_child_at(self.parent, self.slot, index)
    }

    /// Removes `child` if it is an item of this list.
    pub fn remove(&mut self, child: ElementId) -> Result<bool, TreeError> {
        let link = self
            .tree
            .parent_link(child)
            .filter(|link| link.parent == self.parent && link.slot == self.slot);
        match link {
            Some(link) => self.remove_at(link.index as usize).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn set(&mut self, index: usize, child: ElementId) -> Result<ElementId, TreeError> {
        self.tree.set_child_at(self.parent, self.slot, index, child)
    }

    pub fn clear(&mut self) -> Result<Vec<ElementId>, TreeError> {
        self.tree.clear_children(self.parent, self.slot)
    }

    /// Moves every item of another list to the end of this one.
    pub fn splice_all_from(&mut self, src: ElementId, src_slot: ChildSlot) -> Result<usize, TreeError> {
        self.tree
            .splice_all_from(self.parent, self.slot, src, src_slot)
    }
}
