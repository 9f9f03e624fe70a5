use crate::error::TreeError;
use crate::feature_cache::{FeatureKey, FeatureSpec};
use crate::id::ElementId;
use crate::kind::{ElementClass, ElementKind};
use crate::tree::BirTree;
use crate::Box;

use super::{LoweringError, LoweringPhase};

/// Deletes functions that are neither exported nor referenced from outside
/// their own body, until no such function is left.
///
/// Candidates come from a feature key (non-exported functions in local
/// modules); referrers come from the back-reference buckets. Removing a
/// function detaches its body, which drops the references it made and can
/// make further functions unreferenced.
pub struct RemoveUnreferencedFunctions {
    candidates: FeatureKey,
    removed: usize,
}

impl RemoveUnreferencedFunctions {
    pub fn new(tree: &mut BirTree) -> Self {
        let spec = FeatureSpec::new(|e| {
            matches!(e.kind(), ElementKind::Function { is_exported: false, .. })
        });
        let candidates = tree.register_feature(spec.of_classes(ElementClass::Function));
        Self {
            candidates,
            removed: 0,
        }
    }

    pub fn create(tree: &mut BirTree) -> Result<Box<dyn LoweringPhase>, LoweringError> {
        Ok(Box::new(Self::new(tree)))
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    fn is_unreferenced(tree: &BirTree, function: ElementId) -> Result<bool, TreeError> {
        Ok(tree
            .references_to(function)?
            .iter()
            .all(|entry| tree.is_in_subtree(function, entry.from)))
    }
}

impl LoweringPhase for RemoveUnreferencedFunctions {
    fn name(&self) -> &'static str {
        "remove-unreferenced-functions"
    }

    fn run(&mut self, tree: &mut BirTree) -> Result<(), LoweringError> {
        loop {
            let mut changed = false;
            for function in tree.matching(self.candidates)?.to_sorted_vec() {
                // Module roots cannot be removed; earlier removals in this
                // round may have detached nested functions.
                if tree.parent(function).is_none() || !tree.is_attached(function) {
                    continue;
                }
                if Self::is_unreferenced(tree, function)? {
                    tracing::trace!(%function, "removing unreferenced function");
                    tree.remove(function)?;
                    self.removed += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        tracing::debug!(removed = self.removed, "removed unreferenced functions");
        Ok(())
    }
}
