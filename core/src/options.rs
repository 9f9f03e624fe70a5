//! Configuration for trees and lowering pipelines.

/// Options fixed when a [`BirTree`](crate::BirTree) is created.
///
/// # Example
///
/// ```
/// use bir_core::{BirTree, TreeOptions};
///
/// let tree = BirTree::with_options(TreeOptions {
///     expected_element_count: 4096,
///     ..TreeOptions::default()
/// });
/// assert!(tree.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Capacity reserved for the element arena up front.
    ///
    /// Importers know roughly how many elements they are about to create;
    /// passing that here avoids regrowing the arena during import.
    ///
    /// Default: 0
    pub expected_element_count: usize,

    /// Run the structural verifier after every lowering phase.
    ///
    /// Default: on in debug builds, off in release builds.
    pub verify_after_each_phase: bool,

    /// Measure wall-clock time per phase. Only has an effect with the `std`
    /// feature.
    ///
    /// Default: false
    pub record_phase_timings: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            expected_element_count: 0,
            verify_after_each_phase: cfg!(debug_assertions),
            record_phase_timings: false,
        }
    }
}

/// Options for one run of a [`Pipeline`](crate::lowering::Pipeline).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Stop after the phase with this name has run.
    ///
    /// Default: None (run every phase)
    pub stop_after: Option<&'static str>,

    /// Overrides [`TreeOptions::verify_after_each_phase`] when set.
    ///
    /// Default: None
    pub verify: Option<bool>,
}
