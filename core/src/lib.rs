#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
//! A mutable, arena-backed intermediate representation tree.
//!
//! [`BirTree`] owns every element of a compilation. Elements form a strict
//! ownership tree through typed child slots and point at each other through
//! non-owning reference slots. The tree keeps three things consistent with
//! every mutation:
//!
//! - parent links (each element knows the slot and position that holds it);
//! - back-references (each element knows which attached elements reference
//!   it);
//! - feature sets (for each registered predicate, the attached elements that
//!   currently satisfy it).
//!
//! Walks come in three flavours: a mutation-tolerant [`StackWalker`], a
//! stackless [`ParentWalker`], and per-class double dispatch through
//! [`ElementVisitor`].
//!
//! # Example
//!
//! ```
//! use bir_core::{BirTree, FeatureSpec, ModuleOrigin, slots};
//!
//! let mut tree = BirTree::new();
//! let callee = tree.function("callee", [], None).unwrap();
//! let call = tree.call(Some(callee), None, []).unwrap();
//! let body = tree.block([call]).unwrap();
//! let caller = tree.function("caller", [], Some(body)).unwrap();
//! let file = tree.file("main", [callee, caller]).unwrap();
//! tree.add_module(file, ModuleOrigin::Local).unwrap();
//!
//! let calls = tree.register_feature(FeatureSpec::new(|e| {
//!     e.reference(slots::call::TARGET).is_some()
//! }));
//! assert!(tree.matching(calls).unwrap().contains(call));
//! assert_eq!(tree.references_to(callee).unwrap().len(), 1);
//!
//! tree.remove(call).unwrap();
//! assert!(tree.matching(calls).unwrap().is_empty());
//! assert!(tree.references_to(callee).unwrap().is_empty());
//! ```

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod aux_data;
pub mod back_refs;
pub mod builders;
pub mod child_list;
pub mod copy;
pub mod dump;
pub mod element;
pub mod error;
pub mod feature_cache;
pub mod id;
pub mod import;
pub mod kind;
pub mod lowering;
pub mod options;
pub mod traversal;
pub mod tree;
pub mod verify;

pub use aux_data::AuxKey;
pub use back_refs::{BackRef, BackReferences};
pub use child_list::{ChildList, ChildListMut};
pub use dump::Dump;
pub use element::{Element, ParentLink};
pub use error::TreeError;
pub use feature_cache::{ElementRef, FeatureKey, FeatureScope, FeatureSpec, MatchingElements};
pub use id::{ChildSlot, ElementId, ModuleId, RefSlot};
pub use import::ProgramImporter;
pub use kind::{
    ConstValue, ElementClass, ElementClassSet, ElementKind, Layout, SlotInfo, SlotShape, slots,
};
pub use lowering::{LoweringError, LoweringPhase, Pipeline, PipelineReport};
pub use options::{PipelineOptions, TreeOptions};
pub use traversal::{
    ElementVisitor, ParentWalker, StackWalker, WalkStep, accept, accept_children,
    traverse_parent_based, traverse_stack_based,
};
pub use tree::{Ancestors, BirTree, ModuleEntry, ModuleOrigin};
pub use verify::{
    InvariantViolation, StructureMismatch, check_invariants, compare_structure, verify,
};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_splice() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
