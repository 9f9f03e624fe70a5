//! "Who references me" buckets.
//!
//! Every element owns a [`BackReferences`] bucket listing the attached
//! elements whose reference slots currently point at it. The bucket lives
//! on the target itself, so a query costs O(referrers) and the bucket dies
//! with the target. Entries are keyed by `(referrer, slot)`: one referrer
//! can hold several slots pointing at the same target and each is tracked
//! on its own.

use smallvec::SmallVec;

use crate::id::{ElementId, RefSlot};

/// One incoming reference edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackRef {
    pub from: ElementId,
    pub slot: RefSlot,
}

/// Unordered bucket of incoming references.
///
/// Most declarations are referenced once or not at all, so the first entry
/// is stored inline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackReferences(SmallVec<[BackRef; 1]>);

impl BackReferences {
    pub(crate) fn register(&mut self, entry: BackRef) {
        debug_assert!(
            !self.0.contains(&entry),
            "{} is already registered through {}",
            entry.from,
            entry.slot
        );
        self.0.push(entry);
    }

    /// Removes an entry; returns whether it was present.
    pub(crate) fn unregister(&mut self, entry: BackRef) -> bool {
        match self.0.iter().position(|e| *e == entry) {
            Some(pos) => {
                self.0.swap_remove(pos);
                if self.0.is_empty() {
                    self.0.shrink_to_fit();
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, entry: BackRef) -> bool {
        self.0.contains(&entry)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = BackRef> + '_ {
        self.0.iter().copied()
    }

    /// Distinct referring elements, in registration order.
    pub fn referrers(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(i, entry)| !self.0[..*i].iter().any(|prev| prev.from == entry.from))
            .map(|(_, entry)| entry.from)
    }
}

impl<'a> IntoIterator for &'a BackReferences {
    type Item = BackRef;
    type IntoIter = core::iter::Copied<core::slice::Iter<'a, BackRef>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}
