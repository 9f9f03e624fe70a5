//! Stable handles into a [`BirTree`](crate::BirTree).
//!
//! Elements live in an arena owned by the tree and are addressed by
//! [`ElementId`]. Ids are never reused for the lifetime of the tree, so a
//! handle to a detached element stays valid and can be re-attached later.

use core::fmt;
use core::num::NonZeroU32;

/// Identity of an element inside its tree.
///
/// `Option<ElementId>` is the same size as `ElementId`, which keeps child and
/// reference slots at four bytes each.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(NonZeroU32);

static_assertions::assert_eq_size!(Option<ElementId>, u32);

impl ElementId {
    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("element arena overflowed u32 ids");
        Self(raw)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Raw numeric value, as shown in dumps (`#12`).
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered module root. See [`BirTree::add_module`](crate::BirTree::add_module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module{}", self.0)
    }
}

/// Index of a structural child slot within an element's layout.
///
/// Slots are ordered; that order is the structural order used by every
/// traversal and by "first child" queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildSlot(pub u16);

/// Index of a non-owning reference slot within an element's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefSlot(pub u16);

impl fmt::Display for ChildSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "child slot {}", self.0)
    }
}

impl fmt::Display for RefSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reference slot {}", self.0)
    }
}
