//! Errors raised by tree operations.
//!
//! Every variant is a programming error in the caller (usually a lowering
//! phase): nothing here is retried or recovered from. Phases propagate them
//! with `?` and the pipeline aborts.

use thiserror::Error;

use crate::id::{ChildSlot, ElementId, ModuleId, RefSlot};
use crate::kind::ElementClass;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("{element} does not belong to this tree")]
    UnknownElement { element: ElementId },

    #[error("cannot attach {element} under {new_parent}: it is already a child of {parent}")]
    AlreadyAttached {
        element: ElementId,
        parent: ElementId,
        new_parent: ElementId,
    },

    #[error("cannot attach {element} under {new_parent}: it is the root of {module}")]
    CannotAttachRoot {
        element: ElementId,
        module: ModuleId,
        new_parent: ElementId,
    },

    #[error("attaching {element} under {new_parent} would make it its own ancestor")]
    WouldCreateCycle {
        element: ElementId,
        new_parent: ElementId,
    },

    #[error("{slot} of {class} {element} is a list slot")]
    NotASingleSlot {
        element: ElementId,
        class: ElementClass,
        slot: ChildSlot,
    },

    #[error("{slot} of {class} {element} is not a list slot")]
    NotAListSlot {
        element: ElementId,
        class: ElementClass,
        slot: ChildSlot,
    },

    #[error("{class} {element} has no {slot}")]
    SlotOutOfRange {
        element: ElementId,
        class: ElementClass,
        slot: ChildSlot,
    },

    #[error("{class} {element} has no {slot}")]
    ReferenceSlotOutOfRange {
        element: ElementId,
        class: ElementClass,
        slot: RefSlot,
    },

    #[error("index {index} out of bounds for {slot} of {element} (len {len})")]
    IndexOutOfBounds {
        element: ElementId,
        slot: ChildSlot,
        index: usize,
        len: usize,
    },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },

    #[error("{element} has no parent to be replaced in")]
    NotAttachedToParent { element: ElementId },

    #[error("{element} is already the root of {module}")]
    AlreadyARoot { element: ElementId, module: ModuleId },

    #[error("{module} is not registered")]
    UnknownModule { module: ModuleId },

    #[error("feature key {index} was never registered or has been released")]
    UnknownFeatureKey { index: u32 },

    #[error("aux storage key {index} was never registered")]
    UnknownAuxKey { index: u32 },
}
