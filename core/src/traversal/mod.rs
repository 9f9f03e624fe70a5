//! Tree walks.
//!
//! Three strategies, all visiting children in structural order (slot
//! order, then list order) and parents before children:
//!
//! - [`stack`]: an explicit-stack cursor that tolerates mutation of the
//!   element it just returned and of that element's later siblings.
//! - [`parent`]: a stackless walk over parent/sibling links; the tree must
//!   not change while it runs.
//! - [`visitor`]: double dispatch into per-class methods of an
//!   [`ElementVisitor`](visitor::ElementVisitor).

pub mod parent;
pub mod stack;
pub mod visitor;

pub use parent::{ParentWalker, traverse_parent_based};
pub use stack::{StackWalker, traverse_stack_based};
pub use visitor::{ElementVisitor, accept, accept_children};

/// What a walk should do after visiting an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Continue into the element's children.
    StepInto,
    /// Skip the element's children and continue with what follows them.
    StepOver,
    /// Stop the walk.
    EndTraversal,
}
