//! Consistency checks.
//!
//! [`verify`] recomputes everything the tree maintains incrementally
//! (parent links, attachment, back-reference buckets, feature sets) from
//! scratch and reports every disagreement. It is O(elements × keys) and
//! meant for tests and for the pipeline's debug-mode check after each
//! phase.
//!
//! [`compare_structure`] walks two subtrees in lock-step and reports where
//! their shapes differ.

use core::fmt;

use thiserror::Error;

use crate::back_refs::BackRef;
use crate::element::ParentLink;
use crate::feature_cache::FeatureKey;
use crate::id::{ChildSlot, ElementId, ModuleId, RefSlot};
use crate::kind::ElementClass;
use crate::tree::{BirTree, element_ref};
use crate::{Vec, vec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{child} sits at {slot}[{index}] of {parent} but its parent link is {link:?}")]
    ParentLinkMismatch {
        parent: ElementId,
        slot: ChildSlot,
        index: usize,
        child: ElementId,
        link: Option<ParentLink>,
    },

    #[error("{child} claims {parent} as parent but is not among its children")]
    DanglingParentLink { child: ElementId, parent: ElementId },

    #[error("{element} is recorded under {actual:?} but belongs under {expected:?}")]
    ModuleMismatch {
        element: ElementId,
        expected: Option<ModuleId>,
        actual: Option<ModuleId>,
    },

    #[error("{target} lists {from} ({slot}) as a referrer but no such live reference exists")]
    StaleBackReference {
        target: ElementId,
        from: ElementId,
        slot: RefSlot,
    },

    #[error("{slot} of {from} points at {target} but is missing from its back-references")]
    MissingBackReference {
        target: ElementId,
        from: ElementId,
        slot: RefSlot,
    },

    #[error("feature key {key:?} should contain {element}")]
    FeatureMissing { key: FeatureKey, element: ElementId },

    #[error("feature key {key:?} contains {element} which does not match")]
    FeatureStale { key: FeatureKey, element: ElementId },
}

/// Every inconsistency in `tree`. Empty means the tree is sound.
pub fn verify(tree: &BirTree) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    let mut expected_module: Vec<Option<ModuleId>> = vec![None; tree.len()];
    for (module, entry) in tree.modules() {
        for id in tree.subtree(entry.root) {
            expected_module[id.index()] = Some(module);
        }
    }

    for id in tree.ids() {
        let element = tree.el(id);
        for (slot, storage) in element.children.iter().enumerate() {
            let slot = ChildSlot(slot as u16);
            for (index, &child) in storage.as_slice().iter().enumerate() {
                let link = tree.el(child).parent;
                let wanted = ParentLink {
                    parent: id,
                    slot,
                    index: index as u32,
                };
                if link != Some(wanted) {
                    out.push(InvariantViolation::ParentLinkMismatch {
                        parent: id,
                        slot,
                        index,
                        child,
                        link,
                    });
                }
            }
        }
        if let Some(link) = element.parent {
            let held = tree
                .el(link.parent)
                .children
                .get(link.slot.0 as usize)
                .and_then(|storage| storage.get(link.index as usize));
            if held != Some(id) {
                out.push(InvariantViolation::DanglingParentLink {
                    child: id,
                    parent: link.parent,
                });
            }
        }
        if element.module != expected_module[id.index()] {
            out.push(InvariantViolation::ModuleMismatch {
                element: id,
                expected: expected_module[id.index()],
                actual: element.module,
            });
        }

        for BackRef { from, slot } in element.referenced_by() {
            let live = tree.el(from).module.is_some() && tree.el(from).reference(slot) == Some(id);
            if !live {
                out.push(InvariantViolation::StaleBackReference {
                    target: id,
                    from,
                    slot,
                });
            }
        }
        if element.module.is_some() {
            for (slot, target) in element.references() {
                if !tree
                    .el(target)
                    .referenced_by
                    .contains(BackRef { from: id, slot })
                {
                    out.push(InvariantViolation::MissingBackReference {
                        target,
                        from: id,
                        slot,
                    });
                }
            }
        }
    }

    for (key, spec, set) in tree.features.live_keys() {
        for id in tree.ids() {
            let matches = spec.matches(element_ref(&tree.elements, &tree.modules, id));
            match (matches, set.contains(&id)) {
                (true, false) => out.push(InvariantViolation::FeatureMissing { key, element: id }),
                (false, true) => out.push(InvariantViolation::FeatureStale { key, element: id }),
                _ => {}
            }
        }
    }

    if !out.is_empty() {
        tracing::warn!(violations = out.len(), "tree invariants violated");
    }
    out
}

/// First violation found by [`verify`], if any.
pub fn check_invariants(tree: &BirTree) -> Result<(), InvariantViolation> {
    match verify(tree).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

impl BirTree {
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_invariants(self)
    }
}

/// A place where two subtrees differ. `path` lists child positions (in
/// structural order) from the compared roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureMismatch {
    Class {
        path: Vec<usize>,
        original: ElementClass,
        derived: ElementClass,
    },
    ChildCount {
        path: Vec<usize>,
        original: usize,
        derived: usize,
    },
}

impl fmt::Display for StructureMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureMismatch::Class {
                path,
                original,
                derived,
            } => write!(f, "at {path:?}: {original} became {derived}"),
            StructureMismatch::ChildCount {
                path,
                original,
                derived,
            } => write!(f, "at {path:?}: {original} children became {derived}"),
        }
    }
}

/// Walks `original_root` and `derived_root` in lock-step.
///
/// Elements are paired by position. A class mismatch is reported and the
/// pair is not descended into; a child-count mismatch is reported and the
/// common prefix of children is still compared.
pub fn compare_structure(
    original: &BirTree,
    original_root: ElementId,
    derived: &BirTree,
    derived_root: ElementId,
) -> Vec<StructureMismatch> {
    let mut out = Vec::new();
    let mut stack = vec![(original_root, derived_root, Vec::new())];
    while let Some((a, b, path)) = stack.pop() {
        let (Some(class_a), Some(class_b)) = (original.class(a), derived.class(b)) else {
            continue;
        };
        if class_a != class_b {
            out.push(StructureMismatch::Class {
                path,
                original: class_a,
                derived: class_b,
            });
            continue;
        }
        let children_a: Vec<ElementId> = original.children(a).collect();
        let children_b: Vec<ElementId> = derived.children(b).collect();
        if children_a.len() != children_b.len() {
            out.push(StructureMismatch::ChildCount {
                path: path.clone(),
                original: children_a.len(),
                derived: children_b.len(),
            });
        }
        let pairs = children_a.into_iter().zip(children_b).enumerate();
        for (position, (child_a, child_b)) in pairs.rev() {
            let mut child_path = path.clone();
            child_path.push(position);
            stack.push((child_a, child_b, child_path));
        }
    }
    out
}
