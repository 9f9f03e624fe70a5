//! Per-element storage.
//!
//! An [`Element`] is what the arena stores: properties, generic child and
//! reference slots shaped by the class [`Layout`](crate::Layout), the parent
//! link, the bucket of incoming references, and bookkeeping counters.

use smallvec::SmallVec;

use crate::Vec;
use crate::back_refs::BackReferences;
use crate::id::{ChildSlot, ElementId, ModuleId, RefSlot};
use crate::kind::{ElementClass, ElementKind, SlotShape};

/// Where an element sits inside its parent.
///
/// `index` is the position within a list slot (always 0 for single slots).
/// List edits keep it current, which makes sibling navigation and in-place
/// replacement O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentLink {
    pub parent: ElementId,
    pub slot: ChildSlot,
    pub index: u32,
}

/// Contents of one structural child slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChildStorage {
    Single(Option<ElementId>),
    List(Vec<ElementId>),
}

impl ChildStorage {
    pub(crate) fn len(&self) -> usize {
        match self {
            ChildStorage::Single(child) => child.is_some() as usize,
            ChildStorage::List(items) => items.len(),
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<ElementId> {
        match self {
            ChildStorage::Single(child) if index == 0 => *child,
            ChildStorage::Single(_) => None,
            ChildStorage::List(items) => items.get(index).copied(),
        }
    }

    pub(crate) fn as_slice(&self) -> &[ElementId] {
        match self {
            ChildStorage::Single(child) => child.as_slice(),
            ChildStorage::List(items) => items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: SmallVec<[ChildStorage; 2]>,
    pub(crate) references: SmallVec<[Option<ElementId>; 1]>,
    pub(crate) referenced_by: BackReferences,
    /// Module this element is attached under; `None` while detached.
    pub(crate) module: Option<ModuleId>,
    /// Bumped on every local mutation (properties, own slots, references)
    /// and whenever the parent link changes.
    pub(crate) generation: u32,
    /// `generation` as of the last feature-cache evaluation.
    pub(crate) evaluated_generation: u32,
}

impl Element {
    pub(crate) fn new(kind: ElementKind) -> Self {
        let layout = kind.class().layout();
        let children = layout
            .children
            .iter()
            .map(|info| match info.shape {
                SlotShape::Single => ChildStorage::Single(None),
                SlotShape::List => ChildStorage::List(Vec::new()),
            })
            .collect();
        let references = layout.references.iter().map(|_| None).collect();
        Self {
            kind,
            parent: None,
            children,
            references,
            referenced_by: BackReferences::default(),
            module: None,
            generation: 0,
            evaluated_generation: 0,
        }
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn class(&self) -> ElementClass {
        self.kind.class()
    }

    pub fn parent_link(&self) -> Option<ParentLink> {
        self.parent
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent.map(|link| link.parent)
    }

    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn reference(&self, slot: RefSlot) -> Option<ElementId> {
        self.references.get(slot.0 as usize).copied().flatten()
    }

    pub fn references(&self) -> impl Iterator<Item = (RefSlot, ElementId)> + '_ {
        self.references
            .iter()
            .enumerate()
            .filter_map(|(i, target)| target.map(|t| (RefSlot(i as u16), t)))
    }

    pub fn referenced_by(&self) -> &BackReferences {
        &self.referenced_by
    }

    /// Children of one slot, in order.
    pub fn slot_children(&self, slot: ChildSlot) -> &[ElementId] {
        self.children
            .get(slot.0 as usize)
            .map(ChildStorage::as_slice)
            .unwrap_or(&[])
    }

    /// All structural children, slot by slot.
    pub fn children(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children
            .iter()
            .flat_map(|storage| storage.as_slice().iter().copied())
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(|storage| storage.len() > 0)
    }

    pub fn first_child(&self) -> Option<ElementId> {
        self.children().next()
    }

    pub(crate) fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
