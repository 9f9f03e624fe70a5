//! Incrementally maintained "all elements matching P" sets.
//!
//! A lowering phase registers a [`FeatureSpec`] once and gets a
//! [`FeatureKey`]. From then on the tree keeps the key's set equal to
//! `{ e : e attached, class(e) in classes, module filter holds, P(e) }`:
//!
//! - attaching a subtree evaluates every element of it against every key;
//! - detaching a subtree drops every element of it from every set;
//! - any local mutation of an element (properties, own child slots, own
//!   references) re-evaluates that element;
//! - an element whose parent link moves (spliced to a new parent, or
//!   shifted to a new index by an insert or removal) is re-evaluated.
//!
//! Predicates must therefore only look at the element they are given
//! (its properties, its own slot contents, its references, its parent
//! link); they must not depend on the state of other elements.

use core::fmt;

use hashbrown::HashSet;

use crate::element::Element;
use crate::error::TreeError;
use crate::id::{ChildSlot, ElementId, ModuleId, RefSlot};
use crate::kind::{ElementClass, ElementClassSet, ElementKind};
use crate::tree::ModuleOrigin;
use crate::{Box, Vec};

/// Read-only view of one element handed to predicates.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    id: ElementId,
    element: &'a Element,
    origin: Option<ModuleOrigin>,
}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(id: ElementId, element: &'a Element, origin: Option<ModuleOrigin>) -> Self {
        Self {
            id,
            element,
            origin,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn kind(&self) -> &'a ElementKind {
        &self.element.kind
    }

    pub fn class(&self) -> ElementClass {
        self.element.class()
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.element.parent()
    }

    pub fn reference(&self, slot: RefSlot) -> Option<ElementId> {
        self.element.reference(slot)
    }

    pub fn slot_children(&self, slot: ChildSlot) -> &'a [ElementId] {
        self.element.slot_children(slot)
    }

    pub fn module(&self) -> Option<ModuleId> {
        self.element.module
    }

    /// Origin of the module the element is attached under.
    pub fn origin(&self) -> Option<ModuleOrigin> {
        self.origin
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.class())
    }
}

pub type Predicate = Box<dyn Fn(ElementRef<'_>) -> bool>;

/// Description of a feature key: which elements it considers and the
/// predicate they must satisfy.
pub struct FeatureSpec {
    classes: ElementClassSet,
    include_other_modules: bool,
    predicate: Predicate,
}

impl FeatureSpec {
    /// Matches elements of any class in local modules.
    pub fn new(predicate: impl Fn(ElementRef<'_>) -> bool + 'static) -> Self {
        Self {
            classes: ElementClassSet::all(),
            include_other_modules: false,
            predicate: Box::new(predicate),
        }
    }

    /// Every element of one class, in every module.
    pub fn class(class: ElementClass) -> Self {
        Self::new(|_| true).of_classes(class).include_other_modules(true)
    }

    pub fn of_classes(mut self, classes: impl Into<ElementClassSet>) -> Self {
        self.classes = classes.into();
        self
    }

    /// Whether elements under [`ModuleOrigin::External`] roots are tracked too.
    pub fn include_other_modules(mut self, include: bool) -> Self {
        self.include_other_modules = include;
        self
    }

    pub(crate) fn matches(&self, element: ElementRef<'_>) -> bool {
        if element.element.module.is_none() || !self.classes.contains_class(element.class()) {
            return false;
        }
        if !self.include_other_modules && element.origin != Some(ModuleOrigin::Local) {
            return false;
        }
        (self.predicate)(element)
    }
}

impl fmt::Debug for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSpec")
            .field("classes", &self.classes)
            .field("include_other_modules", &self.include_other_modules)
            .finish_non_exhaustive()
    }
}

/// Handle to a registered feature set.
///
/// Keys are checked on use: a key that was released (or that came from a
/// different tree and does not resolve) yields
/// [`TreeError::UnknownFeatureKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    index: u32,
    stamp: u32,
}

/// Marks a point in key registration history. Every key registered after it
/// can be released in one go, which is how a phase's keys are discarded
/// together with the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureScope(u32);

struct KeyEntry {
    spec: FeatureSpec,
    stamp: u32,
    /// Pinned keys (the per-class index) survive scope release.
    pinned: bool,
    matches: HashSet<ElementId>,
}

#[derive(Default)]
pub(crate) struct FeatureCache {
    keys: Vec<Option<KeyEntry>>,
    free: Vec<u32>,
    next_stamp: u32,
    class_keys: [Option<FeatureKey>; ElementClass::ALL.len()],
}

impl FeatureCache {
    pub(crate) fn insert(&mut self, spec: FeatureSpec, pinned: bool) -> FeatureKey {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let entry = KeyEntry {
            spec,
            stamp,
            pinned,
            matches: HashSet::new(),
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.keys[index as usize] = Some(entry);
                index
            }
            None => {
                self.keys.push(Some(entry));
                (self.keys.len() - 1) as u32
            }
        };
        FeatureKey { index, stamp }
    }

    fn entry(&self, key: FeatureKey) -> Result<&KeyEntry, TreeError> {
        self.keys
            .get(key.index as usize)
            .and_then(Option::as_ref)
            .filter(|entry| entry.stamp == key.stamp)
            .ok_or(TreeError::UnknownFeatureKey { index: key.index })
    }

    fn entry_mut(&mut self, key: FeatureKey) -> Result<&mut KeyEntry, TreeError> {
        self.keys
            .get_mut(key.index as usize)
            .and_then(Option::as_mut)
            .filter(|entry| entry.stamp == key.stamp)
            .ok_or(TreeError::UnknownFeatureKey { index: key.index })
    }

    /// Evaluates one element for one key only; used to seed a fresh key.
    pub(crate) fn seed(&mut self, key: FeatureKey, element: ElementRef<'_>) {
        if let Ok(entry) = self.entry_mut(key)
            && entry.spec.matches(element)
        {
            entry.matches.insert(element.id());
        }
    }

    pub(crate) fn release(&mut self, key: FeatureKey) -> Result<(), TreeError> {
        self.entry(key)?;
        self.keys[key.index as usize] = None;
        self.free.push(key.index);
        for class_key in self.class_keys.iter_mut() {
            if *class_key == Some(key) {
                *class_key = None;
            }
        }
        Ok(())
    }

    pub(crate) fn scope(&self) -> FeatureScope {
        FeatureScope(self.next_stamp)
    }

    pub(crate) fn release_since(&mut self, scope: FeatureScope) -> usize {
        let mut released = 0;
        for (index, slot) in self.keys.iter_mut().enumerate() {
            let expired = slot
                .as_ref()
                .is_some_and(|entry| !entry.pinned && entry.stamp >= scope.0);
            if expired {
                *slot = None;
                self.free.push(index as u32);
                released += 1;
            }
        }
        released
    }

    pub(crate) fn class_key(&self, class: ElementClass) -> Option<FeatureKey> {
        self.class_keys[class as usize]
    }

    pub(crate) fn set_class_key(&mut self, class: ElementClass, key: FeatureKey) {
        self.class_keys[class as usize] = Some(key);
    }

    pub(crate) fn matching(&self, key: FeatureKey) -> Result<MatchingElements<'_>, TreeError> {
        self.entry(key).map(|entry| MatchingElements {
            set: &entry.matches,
        })
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.iter().flatten().count()
    }

    /// Live keys with their specs and current sets, for the verifier.
    pub(crate) fn live_keys(
        &self,
    ) -> impl Iterator<Item = (FeatureKey, &FeatureSpec, &HashSet<ElementId>)> + '_ {
        self.keys.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|entry| {
                let key = FeatureKey {
                    index: index as u32,
                    stamp: entry.stamp,
                };
                (key, &entry.spec, &entry.matches)
            })
        })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keys.iter().all(Option::is_none)
    }

    /// A newly attached element: add it wherever it matches.
    pub(crate) fn element_attached(&mut self, element: ElementRef<'_>) {
        for entry in self.keys.iter_mut().flatten() {
            if entry.spec.matches(element) {
                entry.matches.insert(element.id());
            }
        }
    }

    /// A detached element: drop it from every set.
    pub(crate) fn element_detached(&mut self, id: ElementId) {
        for entry in self.keys.iter_mut().flatten() {
            entry.matches.remove(&id);
        }
    }

    /// An attached element changed: re-evaluate it everywhere.
    pub(crate) fn element_changed(&mut self, element: ElementRef<'_>) {
        for entry in self.keys.iter_mut().flatten() {
            if entry.spec.matches(element) {
                entry.matches.insert(element.id());
            } else {
                entry.matches.remove(&element.id());
            }
        }
    }
}

/// Current members of a feature set.
///
/// This borrows the tree, so it reflects the state at the time of the call;
/// asking the tree again after a mutation gives the updated set. Iteration
/// order is unspecified, use [`MatchingElements::to_sorted_vec`] when order
/// matters.
#[derive(Clone, Copy)]
pub struct MatchingElements<'a> {
    set: &'a HashSet<ElementId>,
}

impl<'a> MatchingElements<'a> {
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.set.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementId> + 'a {
        self.set.iter().copied()
    }

    /// Snapshot in id order; the usual way to iterate while mutating.
    pub fn to_sorted_vec(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.iter().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for MatchingElements<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_sorted_vec()).finish()
    }
}
