//! Stackless pre-order walk over parent and sibling links.
//!
//! Uses no memory beyond the cursor, but relies on the links staying put:
//! the tree must not be mutated while the walk runs. Debug builds check
//! this with [`BirTree::mutation_stamp`].

use core::mem;

use super::WalkStep;
use crate::id::ElementId;
use crate::tree::BirTree;

#[derive(Debug, Clone)]
pub struct ParentWalker {
    root: ElementId,
    include_self: bool,
    started: bool,
    current: Option<ElementId>,
    skip: bool,
    stamp: u64,
}

impl ParentWalker {
    pub fn new(root: ElementId) -> Self {
        Self {
            root,
            include_self: false,
            started: false,
            current: None,
            skip: false,
            stamp: 0,
        }
    }

    pub fn include_self(mut self, include: bool) -> Self {
        self.include_self = include;
        self
    }

    pub fn skip_children(&mut self) {
        self.skip = true;
    }

    pub fn next(&mut self, tree: &BirTree) -> Option<ElementId> {
        let next = if !self.started {
            self.started = true;
            self.stamp = tree.mutation_stamp();
            if self.include_self {
                tree.contains(self.root).then_some(self.root)
            } else {
                tree.first_child(self.root)
            }
        } else {
            debug_assert_eq!(
                tree.mutation_stamp(),
                self.stamp,
                "tree mutated during a parent-pointer walk"
            );
            let current = self.current?;
            let descend = !mem::take(&mut self.skip);
            self.successor(tree, current, descend)
        };
        self.current = next;
        next
    }

    fn successor(&self, tree: &BirTree, current: ElementId, descend: bool) -> Option<ElementId> {
        if descend && let Some(child) = tree.first_child(current) {
            return Some(child);
        }
        let mut at = current;
        while at != self.root {
            if let Some(next) = tree.next_sibling(at) {
                return Some(next);
            }
            at = tree.parent(at)?;
        }
        None
    }
}

/// Calls `f` on every element under `root` in pre-order.
pub fn traverse_parent_based(
    tree: &BirTree,
    root: ElementId,
    include_self: bool,
    mut f: impl FnMut(ElementId) -> WalkStep,
) {
    let mut walker = ParentWalker::new(root).include_self(include_self);
    while let Some(id) = walker.next(tree) {
        match f(id) {
            WalkStep::StepInto => {}
            WalkStep::StepOver => walker.skip_children(),
            WalkStep::EndTraversal => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kind::slots::{block, call};
    use crate::{ElementKind, Vec};

    #[test]
    fn test_matches_preorder_and_stays_inside_root() {
        let mut tree = BirTree::new();
        let outer = tree.create(ElementKind::Block);
        let root = tree.create(ElementKind::Call);
        let receiver = tree.create(ElementKind::GetValue);
        let arg0 = tree.create(ElementKind::Block);
        let nested = tree.create(ElementKind::Return);
        let arg1 = tree.create(ElementKind::GetValue);
        let after = tree.create(ElementKind::Return);
        tree.push_child(arg0, block::STATEMENTS, nested).unwrap();
        tree.set_child(root, call::RECEIVER, Some(receiver)).unwrap();
        tree.extend_children(root, call::ARGUMENTS, [arg0, arg1]).unwrap();
        tree.extend_children(outer, block::STATEMENTS, [root, after])
            .unwrap();

        for include_self in [false, true] {
            let mut seen = Vec::new();
            traverse_parent_based(&tree, root, include_self, |id| {
                seen.push(id);
                WalkStep::StepInto
            });
            let mut expected = tree.preorder(root);
            if !include_self {
                expected.remove(0);
            }
            assert_eq!(seen, expected);
            assert!(!seen.contains(&after));
        }

        let mut seen = Vec::new();
        traverse_parent_based(&tree, root, true, |id| {
            seen.push(id);
            if id == root {
                WalkStep::StepOver
            } else {
                WalkStep::StepInto
            }
        });
        assert_eq!(seen, vec![root]);

        let mut seen = Vec::new();
        traverse_parent_based(&tree, root, false, |id| {
            seen.push(id);
            if id == arg0 {
                WalkStep::StepOver
            } else {
                WalkStep::StepInto
            }
        });
        assert_eq!(seen, vec![receiver, arg0, arg1]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "tree mutated during a parent-pointer walk")]
    fn test_mutation_is_detected() {
        let mut tree = BirTree::new();
        let root = tree.create(ElementKind::Block);
        let a = tree.create(ElementKind::Block);
        let b = tree.create(ElementKind::Block);
        tree.extend_children(root, block::STATEMENTS, [a, b]).unwrap();

        let mut walker = ParentWalker::new(root);
        walker.next(&tree);
        tree.remove(b).unwrap();
        walker.next(&tree);
    }
}
