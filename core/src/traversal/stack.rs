//! Explicit-stack pre-order walk that tolerates mutation.
//!
//! [`StackWalker`] holds no borrow of the tree between steps, so the caller
//! may mutate the tree between two calls to [`StackWalker::next`]. After the
//! walker returned `c`, found at position `i` of some slot of `p`, the next
//! step:
//!
//! - descends into `c`'s children as they are *now*, unless
//!   [`StackWalker::skip_children`] was called or `c` left that slot;
//! - continues right after `c` if `c` is still in the slot;
//! - otherwise continues at the sibling that followed `c` when it was
//!   returned, if that sibling is still in the slot;
//! - otherwise continues at position `i`, or `i + 1` when something new
//!   occupies `i` (an element that replaced `c` in place is not visited).
//!
//! Edits behind the walk (earlier siblings, finished subtrees) are never
//! observed.

use core::mem;

use super::WalkStep;
use crate::id::{ChildSlot, ElementId};
use crate::tree::BirTree;
use crate::Vec;

#[derive(Debug, Clone, Copy)]
struct Visit {
    child: ElementId,
    slot: u16,
    index: u32,
    /// Next item of the same list slot at the time `child` was returned.
    next: Option<ElementId>,
}

#[derive(Debug, Clone)]
struct Frame {
    parent: ElementId,
    slot: u16,
    index: u32,
    visiting: Option<Visit>,
}

impl Frame {
    fn new(parent: ElementId) -> Self {
        Self {
            parent,
            slot: 0,
            index: 0,
            visiting: None,
        }
    }

    /// Repositions the cursor after `visit.child` was handed out.
    fn resume(&mut self, tree: &BirTree, visit: Visit) {
        let parent = self.parent;
        let in_slot = |id: ElementId| {
            tree.parent_link(id)
                .filter(|link| link.parent == parent && link.slot.0 == visit.slot)
        };
        self.slot = visit.slot;
        if let Some(link) = in_slot(visit.child) {
            self.index = link.index + 1;
        } else if let Some(link) = visit.next.and_then(in_slot) {
            self.index = link.index;
        } else {
            let occupied = tree
                .child_at(parent, ChildSlot(visit.slot), visit.index as usize)
                .is_some();
            self.index = visit.index + occupied as u32;
        }
    }

    fn advance(&mut self, tree: &BirTree) -> Option<Visit> {
        let element = tree.get(self.parent).ok()?;
        let slot_count = element.class().layout().children.len();
        while (self.slot as usize) < slot_count {
            let items = element.slot_children(ChildSlot(self.slot));
            if let Some(&child) = items.get(self.index as usize) {
                return Some(Visit {
                    child,
                    slot: self.slot,
                    index: self.index,
                    next: items.get(self.index as usize + 1).copied(),
                });
            }
            self.slot += 1;
            self.index = 0;
        }
        None
    }
}

/// Pre-order cursor over the subtree of `root`.
///
/// # Example
///
/// ```
/// use bir_core::{BirTree, ElementKind, StackWalker, slots};
///
/// let mut tree = BirTree::new();
/// let outer = tree.create(ElementKind::Block);
/// let inner = tree.create(ElementKind::Block);
/// tree.push_child(outer, slots::block::STATEMENTS, inner).unwrap();
///
/// let mut walker = StackWalker::new(outer);
/// let mut seen = Vec::new();
/// while let Some(id) = walker.next(&tree) {
///     seen.push(id);
///     // Mutation between steps is allowed.
///     let extra = tree.create(ElementKind::Return);
///     if id == inner {
///         tree.push_child(inner, slots::block::STATEMENTS, extra).unwrap();
///     }
/// }
/// assert_eq!(seen.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StackWalker {
    root: ElementId,
    include_self: bool,
    started: bool,
    done: bool,
    stack: Vec<Frame>,
    last: Option<ElementId>,
    depth: usize,
    skip: bool,
}

impl StackWalker {
    /// Walks the descendants of `root`, not `root` itself.
    pub fn new(root: ElementId) -> Self {
        Self {
            root,
            include_self: false,
            started: false,
            done: false,
            stack: Vec::new(),
            last: None,
            depth: 0,
            skip: false,
        }
    }

    pub fn include_self(mut self, include: bool) -> Self {
        self.include_self = include;
        self
    }

    /// Do not descend into the element returned last.
    pub fn skip_children(&mut self) {
        self.skip = true;
    }

    /// Depth of the element returned last; `root` is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn next(&mut self, tree: &BirTree) -> Option<ElementId> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if !tree.contains(self.root) {
                self.done = true;
                return None;
            }
            if self.include_self {
                self.last = Some(self.root);
                return Some(self.root);
            }
            self.stack.push(Frame::new(self.root));
        } else if let Some(last) = self.last.take() {
            let skip = mem::take(&mut self.skip);
            if !skip && self.still_placed(tree, last) {
                self.stack.push(Frame::new(last));
            }
        }

        while let Some(frame) = self.stack.last_mut() {
            if let Some(visit) = frame.visiting.take() {
                frame.resume(tree, visit);
            }
            if let Some(visit) = frame.advance(tree) {
                frame.visiting = Some(visit);
                self.last = Some(visit.child);
                self.depth = self.stack.len();
                return Some(visit.child);
            }
            self.stack.pop();
        }
        self.done = true;
        None
    }

    fn still_placed(&self, tree: &BirTree, last: ElementId) -> bool {
        match self.stack.last() {
            None => last == self.root,
            Some(frame) => {
                frame.visiting.is_some_and(|visit| visit.child == last)
                    && tree.parent(last) == Some(frame.parent)
            }
        }
    }
}

/// Runs `f` on every element under `root` in pre-order, letting it mutate
/// the tree. Children are fetched after `f` returns, so `f` may rewrite the
/// children of the element it was given before they are visited.
pub fn traverse_stack_based<E>(
    tree: &mut BirTree,
    root: ElementId,
    include_self: bool,
    mut f: impl FnMut(&mut BirTree, ElementId) -> Result<WalkStep, E>,
) -> Result<(), E> {
    let mut walker = StackWalker::new(root).include_self(include_self);
    while let Some(id) = walker.next(tree) {
        match f(tree, id)? {
            WalkStep::StepInto => {}
            WalkStep::StepOver => walker.skip_children(),
            WalkStep::EndTraversal => break,
        }
    }
    Ok(())
}

impl BirTree {
    /// `root` and its descendants in pre-order.
    pub fn preorder(&self, root: ElementId) -> Vec<ElementId> {
        let mut walker = StackWalker::new(root).include_self(true);
        let mut out = Vec::new();
        while let Some(id) = walker.next(self) {
            out.push(id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kind::slots::{block, branch, when};
    use crate::ElementKind;

    /// `root: Block [a: Block [a0, a1], b: When [br: Branch(cond, res)], c]`
    struct Fixture {
        tree: BirTree,
        root: ElementId,
        a: ElementId,
        a0: ElementId,
        a1: ElementId,
        b: ElementId,
        br: ElementId,
        cond: ElementId,
        res: ElementId,
        c: ElementId,
    }

    fn fixture() -> Fixture {
        let mut tree = BirTree::new();
        let root = tree.create(ElementKind::Block);
        let a = tree.create(ElementKind::Block);
        let a0 = tree.create(ElementKind::Return);
        let a1 = tree.create(ElementKind::Return);
        let b = tree.create(ElementKind::When);
        let br = tree.create(ElementKind::Branch);
        let cond = tree.create(ElementKind::GetValue);
        let res = tree.create(ElementKind::GetValue);
        let c = tree.create(ElementKind::Return);
        tree.extend_children(a, block::STATEMENTS, [a0, a1]).unwrap();
        // Slot order, not creation order: condition before result.
        tree.set_child(br, branch::RESULT, Some(res)).unwrap();
        tree.set_child(br, branch::CONDITION, Some(cond)).unwrap();
        tree.push_child(b, when::BRANCHES, br).unwrap();
        tree.extend_children(root, block::STATEMENTS, [a, b, c]).unwrap();
        Fixture {
            tree,
            root,
            a,
            a0,
            a1,
            b,
            br,
            cond,
            res,
            c,
        }
    }

    fn walk(
        tree: &mut BirTree,
        root: ElementId,
        mut f: impl FnMut(&mut BirTree, ElementId) -> WalkStep,
    ) -> Vec<ElementId> {
        let mut seen = Vec::new();
        traverse_stack_based::<()>(tree, root, false, |tree, id| {
            seen.push(id);
            Ok(f(tree, id))
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_preorder_follows_slot_order() {
        let f = fixture();
        assert_eq!(
            f.tree.preorder(f.root),
            vec![f.root, f.a, f.a0, f.a1, f.b, f.br, f.cond, f.res, f.c]
        );
    }

    #[test]
    fn test_depth_and_skip() {
        let f = fixture();
        let mut walker = StackWalker::new(f.root);
        let mut seen = Vec::new();
        while let Some(id) = walker.next(&f.tree) {
            seen.push((id, walker.depth()));
            if id == f.b {
                walker.skip_children();
            }
        }
        assert_eq!(
            seen,
            vec![(f.a, 1), (f.a0, 2), (f.a1, 2), (f.b, 1), (f.c, 1)]
        );
    }

    #[test]
    fn test_end_traversal_stops() {
        let mut f = fixture();
        let a0 = f.a0;
        let seen = walk(&mut f.tree, f.root, |_, id| {
            if id == a0 {
                WalkStep::EndTraversal
            } else {
                WalkStep::StepInto
            }
        });
        assert_eq!(seen, vec![f.a, f.a0]);
    }

    #[test]
    fn test_removing_current_continues_with_next_sibling() {
        let mut f = fixture();
        let a = f.a;
        let seen = walk(&mut f.tree, f.root, |tree, id| {
            if id == a {
                tree.remove(a).unwrap();
            }
            WalkStep::StepInto
        });
        assert_eq!(seen, vec![f.a, f.b, f.br, f.cond, f.res, f.c]);
    }

    #[test]
    fn test_replaced_element_is_not_visited() {
        let mut f = fixture();
        let (a, c) = (f.a, f.c);
        let mut replacement = None;
        let seen = walk(&mut f.tree, f.root, |tree, id| {
            if id == a {
                let new = tree.create(ElementKind::Const(crate::ConstValue::Unit));
                tree.replace(a, new).unwrap();
                replacement = Some(new);
            }
            if id == c {
                let new = tree.create(ElementKind::Const(crate::ConstValue::Unit));
                tree.replace(c, new).unwrap();
            }
            WalkStep::StepInto
        });
        assert_eq!(seen, vec![f.a, f.b, f.br, f.cond, f.res, f.c]);
        assert!(!seen.contains(&replacement.unwrap()));
    }

    #[test]
    fn test_inserted_later_siblings_and_children_are_visited() {
        let mut f = fixture();
        let (root, a, a0) = (f.root, f.a, f.a0);
        let mut added = Vec::new();
        let seen = walk(&mut f.tree, root, |tree, id| {
            if id == a {
                let sibling = tree.create(ElementKind::Block);
                tree.insert_child(root, block::STATEMENTS, 1, sibling).unwrap();
                let child = tree.create(ElementKind::Return);
                tree.push_child(a, block::STATEMENTS, child).unwrap();
                added.push(child);
                added.push(sibling);
            }
            if id == a0 {
                // Earlier siblings of later elements: no effect on the walk.
                let first = tree.slot_children(root, block::STATEMENTS)[0];
                assert_eq!(first, a);
            }
            WalkStep::StepInto
        });
        assert_eq!(
            seen,
            vec![f.a, f.a0, f.a1, added[0], added[1], f.b, f.br, f.cond, f.res, f.c]
        );
    }

    #[test]
    fn test_removing_next_sibling_skips_it() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        let seen = walk(&mut f.tree, f.root, |tree, id| {
            if id == a {
                tree.remove(b).unwrap();
                return WalkStep::StepOver;
            }
            WalkStep::StepInto
        });
        assert_eq!(seen, vec![f.a, f.c]);
    }
}
