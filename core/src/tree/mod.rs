//! The tree context.
//!
//! [`BirTree`] owns every element of a compilation plus the registries that
//! must stay consistent with the tree's shape: module roots, back-reference
//! buckets, feature-cache keys and aux storage. All mutation goes through
//! `&mut BirTree`, which is what keeps those registries in sync.
//!
//! An element is *attached* when it is a module root or its parent is
//! attached. Only attached elements are recorded in back-reference buckets
//! and feature sets; a subtree built while detached is registered in one go
//! when it is attached, and unregistered in one go when it is detached.

mod mutation;

use core::fmt;

use smallvec::SmallVec;

use crate::aux_data::AuxStorage;
use crate::back_refs::{BackRef, BackReferences};
use crate::element::{ChildStorage, Element, ParentLink};
use crate::error::TreeError;
use crate::feature_cache::{
    ElementRef, FeatureCache, FeatureKey, FeatureScope, FeatureSpec, MatchingElements,
};
use crate::id::{ChildSlot, ElementId, ModuleId, RefSlot};
use crate::kind::{ElementClass, ElementKind, SlotShape};
use crate::options::TreeOptions;
use crate::{Vec, vec};

/// Whether a module is being compiled or only consulted.
///
/// Feature keys skip [`ModuleOrigin::External`] modules unless they opt in
/// with [`FeatureSpec::include_other_modules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleOrigin {
    Local,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleEntry {
    pub root: ElementId,
    pub origin: ModuleOrigin,
}

pub struct BirTree {
    pub(crate) elements: Vec<Element>,
    pub(crate) modules: Vec<Option<ModuleEntry>>,
    pub(crate) features: FeatureCache,
    pub(crate) aux: AuxStorage,
    options: TreeOptions,
    mutation_stamp: u64,
}

impl Default for BirTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BirTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BirTree")
            .field("elements", &self.elements.len())
            .field("modules", &self.modules().count())
            .field("feature_keys", &self.features.key_count())
            .finish_non_exhaustive()
    }
}

/// Builds the predicate view of `id`. Takes the fields rather than `&BirTree`
/// so callers can hold `&mut self.features` at the same time.
pub(crate) fn element_ref<'a>(
    elements: &'a [Element],
    modules: &[Option<ModuleEntry>],
    id: ElementId,
) -> ElementRef<'a> {
    let element = &elements[id.index()];
    let origin = element
        .module
        .and_then(|module| modules.get(module.0 as usize).copied().flatten())
        .map(|entry| entry.origin);
    ElementRef::new(id, element, origin)
}

impl BirTree {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            elements: Vec::with_capacity(options.expected_element_count),
            modules: Vec::new(),
            features: FeatureCache::default(),
            aux: AuxStorage::default(),
            options,
            mutation_stamp: 0,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Number of elements ever created, attached or not.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.elements.reserve(additional);
    }

    /// Incremented by every structural or property mutation. Walkers that
    /// must not observe mutation compare it before and after each step.
    pub fn mutation_stamp(&self) -> u64 {
        self.mutation_stamp
    }

    pub(crate) fn bump(&mut self) {
        self.mutation_stamp += 1;
    }

    /// Every element id ever created, in creation order.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(ElementId::from_index)
    }

    /// Creates a detached element with empty slots.
    pub fn create(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId::from_index(self.elements.len());
        tracing::trace!(%id, class = %kind.class(), "create element");
        self.elements.push(Element::new(kind));
        id
    }

    pub fn contains(&self, id: ElementId) -> bool {
        id.index() < self.elements.len()
    }

    pub fn get(&self, id: ElementId) -> Result<&Element, TreeError> {
        self.elements
            .get(id.index())
            .ok_or(TreeError::UnknownElement { element: id })
    }

    pub(crate) fn check(&self, id: ElementId) -> Result<(), TreeError> {
        self.get(id).map(|_| ())
    }

    /// Unchecked lookup for ids that were validated by the caller.
    #[inline]
    pub(crate) fn el(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    #[inline]
    pub(crate) fn el_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index()]
    }

    pub fn element_ref(&self, id: ElementId) -> Result<ElementRef<'_>, TreeError> {
        self.check(id)?;
        Ok(element_ref(&self.elements, &self.modules, id))
    }

    pub fn kind(&self, id: ElementId) -> Option<&ElementKind> {
        self.elements.get(id.index()).map(Element::kind)
    }

    pub fn class(&self, id: ElementId) -> Option<ElementClass> {
        self.elements.get(id.index()).map(Element::class)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id.index())?.parent()
    }

    pub fn parent_link(&self, id: ElementId) -> Option<ParentLink> {
        self.elements.get(id.index())?.parent
    }

    /// Slot and position of `id` inside its parent.
    pub fn position_in_parent(&self, id: ElementId) -> Option<(ChildSlot, usize)> {
        self.parent_link(id)
            .map(|link| (link.slot, link.index as usize))
    }

    pub fn module_of(&self, id: ElementId) -> Option<ModuleId> {
        self.elements.get(id.index())?.module
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.module_of(id).is_some()
    }

    pub fn is_module_root(&self, id: ElementId) -> bool {
        self.elements
            .get(id.index())
            .is_some_and(|element| element.module.is_some() && element.parent.is_none())
    }

    /// Children of one slot, in order. Empty for unknown elements or slots.
    pub fn slot_children(&self, id: ElementId, slot: ChildSlot) -> &[ElementId] {
        self.elements
            .get(id.index())
            .map(|element| element.slot_children(slot))
            .unwrap_or(&[])
    }

    /// The occupant of a single slot (or the first item of a list slot).
    pub fn child(&self, id: ElementId, slot: ChildSlot) -> Option<ElementId> {
        self.slot_children(id, slot).first().copied()
    }

    pub fn child_at(&self, id: ElementId, slot: ChildSlot, index: usize) -> Option<ElementId> {
        self.slot_children(id, slot).get(index).copied()
    }

    /// All structural children of `id`, slot by slot.
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .get(id.index())
            .into_iter()
            .flat_map(Element::children)
    }

    pub fn first_child(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(id.index())?.first_child()
    }

    /// The next element in the parent's structural order, crossing into
    /// later slots when the current one is exhausted.
    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        let link = self.parent_link(id)?;
        let parent = self.el(link.parent);
        let slot = link.slot.0 as usize;
        if let Some(next) = parent.children[slot].get(link.index as usize + 1) {
            return Some(next);
        }
        parent.children[slot + 1..]
            .iter()
            .find_map(|storage| storage.get(0))
    }

    /// Proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Whether `id` is `root` or lies below it.
    pub fn is_in_subtree(&self, root: ElementId, id: ElementId) -> bool {
        id == root || self.ancestors(id).any(|ancestor| ancestor == root)
    }

    pub fn reference(&self, id: ElementId, slot: RefSlot) -> Option<ElementId> {
        self.elements.get(id.index())?.reference(slot)
    }

    /// Attached elements whose reference slots point at `target`.
    pub fn references_to(&self, target: ElementId) -> Result<&BackReferences, TreeError> {
        self.get(target).map(Element::referenced_by)
    }

    /// Pre-order ids of the subtree under `root`, `root` included.
    pub(crate) fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let start = stack.len();
            stack.extend(self.el(id).children());
            stack[start..].reverse();
        }
        out
    }

    pub(crate) fn check_slot(
        &self,
        element: ElementId,
        slot: ChildSlot,
        shape: SlotShape,
    ) -> Result<(), TreeError> {
        let class = self.get(element)?.class();
        let info = class
            .layout()
            .child_slot(slot)
            .ok_or(TreeError::SlotOutOfRange {
                element,
                class,
                slot,
            })?;
        match (info.shape, shape) {
            (SlotShape::Single, SlotShape::Single) | (SlotShape::List, SlotShape::List) => Ok(()),
            (SlotShape::List, SlotShape::Single) => Err(TreeError::NotASingleSlot {
                element,
                class,
                slot,
            }),
            (SlotShape::Single, SlotShape::List) => Err(TreeError::NotAListSlot {
                element,
                class,
                slot,
            }),
        }
    }

    pub(crate) fn check_ref_slot(&self, element: ElementId, slot: RefSlot) -> Result<(), TreeError> {
        let class = self.get(element)?.class();
        if class.layout().has_reference(slot) {
            Ok(())
        } else {
            Err(TreeError::ReferenceSlotOutOfRange {
                element,
                class,
                slot,
            })
        }
    }

    /// `child` may become a child of `new_parent`: it is free (neither a
    /// child nor a module root) and not an ancestor of `new_parent`.
    pub(crate) fn check_attachable(
        &self,
        child: ElementId,
        new_parent: ElementId,
    ) -> Result<(), TreeError> {
        let element = self.get(child)?;
        if let Some(parent) = element.parent() {
            return Err(TreeError::AlreadyAttached {
                element: child,
                parent,
                new_parent,
            });
        }
        if let Some(module) = element.module {
            return Err(TreeError::CannotAttachRoot {
                element: child,
                module,
                new_parent,
            });
        }
        if self.is_in_subtree(child, new_parent) {
            return Err(TreeError::WouldCreateCycle {
                element: child,
                new_parent,
            });
        }
        Ok(())
    }

    pub(crate) fn storage_mut(&mut self, parent: ElementId, slot: ChildSlot) -> &mut ChildStorage {
        &mut self.el_mut(parent).children[slot.0 as usize]
    }

    // ---- registration --------------------------------------------------

    /// Marks the subtree under `root` as attached under `module` and records
    /// its references and feature matches.
    pub(crate) fn register_subtree(&mut self, root: ElementId, module: ModuleId) {
        let ids = self.subtree(root);
        for &id in &ids {
            self.el_mut(id).module = Some(module);
        }
        for &id in &ids {
            let refs: SmallVec<[(RefSlot, ElementId); 2]> = self.el(id).references().collect();
            for (slot, target) in refs {
                self.el_mut(target)
                    .referenced_by
                    .register(BackRef { from: id, slot });
            }
            let element = self.el_mut(id);
            element.evaluated_generation = element.generation;
            if !self.features.is_empty() {
                self.features
                    .element_attached(element_ref(&self.elements, &self.modules, id));
            }
        }
        tracing::trace!(%root, %module, count = ids.len(), "registered subtree");
    }

    /// Inverse of [`register_subtree`](Self::register_subtree).
    pub(crate) fn unregister_subtree(&mut self, root: ElementId) {
        let ids = self.subtree(root);
        for &id in &ids {
            let refs: SmallVec<[(RefSlot, ElementId); 2]> = self.el(id).references().collect();
            for (slot, target) in refs {
                let removed = self
                    .el_mut(target)
                    .referenced_by
                    .unregister(BackRef { from: id, slot });
                debug_assert!(removed, "{id} was not registered as referencing {target}");
            }
            self.el_mut(id).module = None;
            self.features.element_detached(id);
        }
        tracing::trace!(%root, count = ids.len(), "unregistered subtree");
    }

    /// Re-evaluates an attached element whose generation moved since its
    /// last evaluation.
    pub(crate) fn reevaluate(&mut self, id: ElementId) {
        let element = self.el(id);
        if element.module.is_none() || element.evaluated_generation == element.generation {
            return;
        }
        let generation = element.generation;
        if !self.features.is_empty() {
            self.features
                .element_changed(element_ref(&self.elements, &self.modules, id));
        }
        self.el_mut(id).evaluated_generation = generation;
    }

    // ---- modules -------------------------------------------------------

    /// Registers `root` as a module root. `root` and everything below it
    /// become attached.
    pub fn add_module(
        &mut self,
        root: ElementId,
        origin: ModuleOrigin,
    ) -> Result<ModuleId, TreeError> {
        let element = self.get(root)?;
        if let Some(module) = element.module.filter(|_| element.parent.is_none()) {
            return Err(TreeError::AlreadyARoot {
                element: root,
                module,
            });
        }
        if let Some(parent) = element.parent() {
            return Err(TreeError::AlreadyAttached {
                element: root,
                parent,
                new_parent: root,
            });
        }
        let module = ModuleId(self.modules.len() as u32);
        self.modules.push(Some(ModuleEntry { root, origin }));
        self.register_subtree(root, module);
        self.bump();
        tracing::debug!(%module, %root, ?origin, "added module");
        Ok(module)
    }

    /// Unregisters a module. Its root and subtree become detached and can be
    /// attached elsewhere.
    pub fn remove_module(&mut self, module: ModuleId) -> Result<ElementId, TreeError> {
        let entry = self
            .modules
            .get_mut(module.0 as usize)
            .and_then(Option::take)
            .ok_or(TreeError::UnknownModule { module })?;
        self.unregister_subtree(entry.root);
        self.bump();
        tracing::debug!(%module, root = %entry.root, "removed module");
        Ok(entry.root)
    }

    pub fn module(&self, module: ModuleId) -> Option<ModuleEntry> {
        self.modules.get(module.0 as usize).copied().flatten()
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, ModuleEntry)> + '_ {
        self.modules
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.map(|entry| (ModuleId(i as u32), entry)))
    }

    pub fn module_roots(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.modules().map(|(_, entry)| entry.root)
    }

    // ---- feature cache -------------------------------------------------

    /// Registers a feature key and seeds it with one walk over every module.
    pub fn register_feature(&mut self, spec: FeatureSpec) -> FeatureKey {
        self.insert_feature(spec, false)
    }

    /// Shorthand for a key over every class.
    pub fn register_key(
        &mut self,
        predicate: impl Fn(ElementRef<'_>) -> bool + 'static,
        include_other_modules: bool,
    ) -> FeatureKey {
        let spec = FeatureSpec::new(predicate).include_other_modules(include_other_modules);
        self.register_feature(spec)
    }

    fn insert_feature(&mut self, spec: FeatureSpec, pinned: bool) -> FeatureKey {
        let key = self.features.insert(spec, pinned);
        let roots: Vec<ElementId> = self.module_roots().collect();
        for root in roots {
            for id in self.subtree(root) {
                self.features
                    .seed(key, element_ref(&self.elements, &self.modules, id));
            }
        }
        let seeded = self.features.matching(key).map_or(0, |set| set.len());
        tracing::debug!(?key, pinned, seeded, "registered feature key");
        key
    }

    /// Current members of a key's set.
    pub fn matching(&self, key: FeatureKey) -> Result<MatchingElements<'_>, TreeError> {
        self.features.matching(key)
    }

    /// Live keys, class keys included.
    pub fn feature_key_count(&self) -> usize {
        self.features.key_count()
    }

    pub fn release_feature(&mut self, key: FeatureKey) -> Result<(), TreeError> {
        self.features.release(key)
    }

    /// Marks the current point in key registration history.
    pub fn feature_scope(&self) -> FeatureScope {
        self.features.scope()
    }

    /// Releases every non-class key registered after `scope`; returns how
    /// many were released.
    pub fn release_features_since(&mut self, scope: FeatureScope) -> usize {
        let released = self.features.release_since(scope);
        if released > 0 {
            tracing::debug!(released, "released feature keys");
        }
        released
    }

    /// Every attached element of `class`, in every module.
    ///
    /// The first call for a class registers a pinned key; later calls are
    /// lookups.
    pub fn elements_of_class(
        &mut self,
        class: ElementClass,
    ) -> Result<MatchingElements<'_>, TreeError> {
        let key = match self.features.class_key(class) {
            Some(key) => key,
            None => {
                let key = self.insert_feature(FeatureSpec::class(class), true);
                self.features.set_class_key(class, key);
                key
            }
        };
        self.features.matching(key)
    }
}

/// Iterator over proper ancestors, see [`BirTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a BirTree,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
