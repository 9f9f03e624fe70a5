//! Subtree duplication.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::TreeError;
use crate::id::{ChildSlot, ElementId, RefSlot};
use crate::kind::SlotShape;
use crate::tree::BirTree;
use crate::Vec;

impl BirTree {
    /// Copies the subtree under `root` into fresh, detached elements and
    /// returns the copy of `root`.
    ///
    /// References that point inside the subtree are redirected to the
    /// corresponding copies (a recursive call keeps calling itself); all
    /// other references keep their targets. Aux storage is not copied.
    pub fn deep_copy(&mut self, root: ElementId) -> Result<ElementId, TreeError> {
        self.check(root)?;
        let originals = self.subtree(root);
        let mut copies: HashMap<ElementId, ElementId> = HashMap::with_capacity(originals.len());
        for &original in &originals {
            let kind = self.el(original).kind.clone();
            let copy = self.create(kind);
            copies.insert(original, copy);
        }

        for &original in &originals {
            let copy = copies[&original];
            let layout = self.el(original).class().layout();
            for (slot, info) in layout.children.iter().enumerate() {
                let slot = ChildSlot(slot as u16);
                let items: Vec<ElementId> = self
                    .slot_children(original, slot)
                    .iter()
                    .map(|child| copies[child])
                    .collect();
                match info.shape {
                    SlotShape::Single => {
                        self.set_child(copy, slot, items.first().copied())?;
                    }
                    SlotShape::List => self.extend_children(copy, slot, items)?,
                }
            }
            let refs: SmallVec<[(RefSlot, ElementId); 2]> = self.el(original).references().collect();
            for (slot, target) in refs {
                let target = copies.get(&target).copied().unwrap_or(target);
                self.set_reference(copy, slot, Some(target))?;
            }
        }
        tracing::debug!(%root, count = originals.len(), "deep copied subtree");
        Ok(copies[&root])
    }
}
