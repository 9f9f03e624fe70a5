use crate::error::TreeError;
use crate::id::{ChildSlot, ElementId};
use crate::kind::slots::{block, function};
use crate::kind::ElementClass;
use crate::traversal::{WalkStep, traverse_stack_based};
use crate::tree::{BirTree, ModuleOrigin};
use crate::{Box, Vec};

use super::{LoweringError, LoweringPhase};

/// Removes redundant blocks in local modules:
///
/// - a block directly inside another block's statements is spliced into it;
/// - a block with exactly one statement anywhere else (other than a
///   function body) is replaced in place by that statement.
///
/// Each element's children are rewritten when the walk reaches the element,
/// before the walk descends into them.
#[derive(Debug, Default)]
pub struct FlattenNestedBlocks {
    spliced: usize,
    unwrapped: usize,
}

impl FlattenNestedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(_tree: &mut BirTree) -> Result<Box<dyn LoweringPhase>, LoweringError> {
        Ok(Box::new(Self::new()))
    }

    pub fn spliced(&self) -> usize {
        self.spliced
    }

    pub fn unwrapped(&self) -> usize {
        self.unwrapped
    }

    fn splice_nested(&mut self, tree: &mut BirTree, parent: ElementId) -> Result<(), TreeError> {
        let mut index = 0;
        while let Some(statement) = tree.child_at(parent, block::STATEMENTS, index) {
            if tree.class(statement) == Some(ElementClass::Block) {
                // The nested statements land at `index`, so they are checked
                // next; the emptied block ends up right after them.
                let nested = block::STATEMENTS;
                tree.splice_all_from_at(parent, block::STATEMENTS, index, statement, nested)?;
                tree.remove(statement)?;
                self.spliced += 1;
            } else {
                index += 1;
            }
        }
        Ok(())
    }

    fn unwrap_singletons(&mut self, tree: &mut BirTree, parent: ElementId) -> Result<(), TreeError> {
        let Some(class) = tree.class(parent) else {
            return Ok(());
        };
        for slot in 0..class.layout().children.len() {
            let slot = ChildSlot(slot as u16);
            if class == ElementClass::Function && slot == function::BODY {
                continue;
            }
            let mut index = 0;
            while let Some(child) = tree.child_at(parent, slot, index) {
                let singleton = tree.class(child) == Some(ElementClass::Block)
                    && tree.slot_children(child, block::STATEMENTS).len() == 1;
                if singleton {
                    let inner = tree.remove_child_at(child, block::STATEMENTS, 0)?;
                    tree.replace(child, inner)?;
                    self.unwrapped += 1;
                } else {
                    index += 1;
                }
            }
        }
        Ok(())
    }
}

impl LoweringPhase for FlattenNestedBlocks {
    fn name(&self) -> &'static str {
        "flatten-nested-blocks"
    }

    fn run(&mut self, tree: &mut BirTree) -> Result<(), LoweringError> {
        let roots: Vec<ElementId> = tree
            .modules()
            .filter(|(_, entry)| entry.origin == ModuleOrigin::Local)
            .map(|(_, entry)| entry.root)
            .collect();
        for root in roots {
            traverse_stack_based(tree, root, true, |tree, id| {
                if tree.class(id) == Some(ElementClass::Block) {
                    self.splice_nested(tree, id)?;
                } else {
                    self.unwrap_singletons(tree, id)?;
                }
                Ok::<_, TreeError>(WalkStep::StepInto)
            })?;
        }
        tracing::debug!(
            spliced = self.spliced,
            unwrapped = self.unwrapped,
            "flattened blocks"
        );
        Ok(())
    }
}
