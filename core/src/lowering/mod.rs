//! Lowering phases and the driver that runs them.
//!
//! A phase is built by a factory that receives the tree, so it can register
//! the feature keys it needs before it runs. The [`Pipeline`] records the
//! key-registration point before calling each factory and releases every key
//! registered since once the phase is done, whether it succeeded or not.

mod flatten_blocks;
mod remove_unreferenced;

use core::fmt;
use core::time::Duration;

use thiserror::Error;

pub use flatten_blocks::FlattenNestedBlocks;
pub use remove_unreferenced::RemoveUnreferencedFunctions;

use crate::error::TreeError;
use crate::options::PipelineOptions;
use crate::tree::BirTree;
use crate::verify::{InvariantViolation, check_invariants};
use crate::{Box, String, Vec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("tree is inconsistent after phase `{phase}`: {violation}")]
    Invariant {
        phase: &'static str,
        #[source]
        violation: InvariantViolation,
    },

    #[error("phase `{phase}` failed: {message}")]
    Phase {
        phase: &'static str,
        message: String,
    },
}

pub trait LoweringPhase {
    fn name(&self) -> &'static str;

    fn run(&mut self, tree: &mut BirTree) -> Result<(), LoweringError>;
}

type PhaseFactory = Box<dyn Fn(&mut BirTree) -> Result<Box<dyn LoweringPhase>, LoweringError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub name: &'static str,
    /// Wall-clock time, when timings were requested and `std` is available.
    pub elapsed: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub phases: Vec<PhaseReport>,
}

#[derive(Default)]
pub struct Pipeline {
    factories: Vec<PhaseFactory>,
    options: PipelineOptions,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("phases", &self.factories.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PipelineOptions) -> Self {
        Self {
            factories: Vec::new(),
            options,
        }
    }

    /// Appends a phase. `factory` runs right before the phase does.
    pub fn phase(
        mut self,
        factory: impl Fn(&mut BirTree) -> Result<Box<dyn LoweringPhase>, LoweringError> + 'static,
    ) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// The two phases this crate ships, in their usual order.
    pub fn standard() -> Self {
        Self::new()
            .phase(RemoveUnreferencedFunctions::create)
            .phase(FlattenNestedBlocks::create)
    }

    pub fn run(&self, tree: &mut BirTree) -> Result<PipelineReport, LoweringError> {
        let verify = self
            .options
            .verify
            .unwrap_or(tree.options().verify_after_each_phase);
        let timed = tree.options().record_phase_timings;
        let mut report = PipelineReport::default();

        for factory in &self.factories {
            let scope = tree.feature_scope();
            let result = factory(tree).and_then(|mut phase| {
                let name = phase.name();
                let span = tracing::info_span!("lowering_phase", name);
                let _guard = span.enter();
                tracing::debug!("phase started");
                let stopwatch = timed.then(Stopwatch::start);
                phase.run(tree)?;
                let elapsed = stopwatch.and_then(|stopwatch| stopwatch.elapsed());
                tracing::debug!(?elapsed, "phase finished");
                Ok(PhaseReport { name, elapsed })
            });
            tree.release_features_since(scope);
            let phase = result?;

            if verify {
                check_invariants(tree).map_err(|violation| LoweringError::Invariant {
                    phase: phase.name,
                    violation,
                })?;
            }
            let stop = self.options.stop_after == Some(phase.name);
            report.phases.push(phase);
            if stop {
                break;
            }
        }
        Ok(report)
    }
}

#[cfg(any(feature = "std", test))]
struct Stopwatch(std::time::Instant);

#[cfg(any(feature = "std", test))]
impl Stopwatch {
    fn start() -> Self {
        Self(std::time::Instant::now())
    }

    fn elapsed(&self) -> Option<Duration> {
        Some(self.0.elapsed())
    }
}

#[cfg(not(any(feature = "std", test)))]
struct Stopwatch;

#[cfg(not(any(feature = "std", test)))]
impl Stopwatch {
    fn start() -> Self {
        Self
    }

    fn elapsed(&self) -> Option<Duration> {
        None
    }
}
