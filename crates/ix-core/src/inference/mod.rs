//! Inference strategies.
//!
//! Every strategy implements [`InferenceStrategy`]; [`Strategy`] is the sum
//! type the dispatcher holds, chosen once when the dispatcher is built.
//!
//! - [`Variational`]: MAP for point masses, KLqp for Gaussian-based families.
//! - [`MonteCarlo`]: Metropolis-within-Gibbs into empirical families.
//! - [`Exact`]: closed-form conjugate updates from a [`ConjugacyTable`].

pub mod conjugacy;
pub mod exact;
pub mod monte_carlo;
pub mod variational;

use std::fmt;

use clap::ValueEnum;
use ix_common::VariableId;
use ix_config::InferenceConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::graph::{ModelGraph, ObservedData};
use crate::state::InferenceState;

pub use conjugacy::{ConjugacyTable, ConjugateRule, LikelihoodSite};
pub use exact::Exact;
pub use monte_carlo::MonteCarlo;
pub use variational::Variational;

/// Which strategy family to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Variational,
    MonteCarlo,
    Exact,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Variational => "variational",
            StrategyKind::MonteCarlo => "monte_carlo",
            StrategyKind::Exact => "exact",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only inputs shared by every step of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub graph: &'a ModelGraph,
    pub observed: &'a ObservedData,
    pub config: &'a InferenceConfig,
}

impl RunContext<'_> {
    /// Latent variables in topological order.
    pub fn latents(&self) -> Vec<VariableId> {
        self.graph
            .topological_order()
            .iter()
            .filter(|id| !self.observed.contains_key(*id))
            .cloned()
            .collect()
    }
}

/// What a single step concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stopping predicate is not met yet.
    Continue,
    /// The strategy's stopping predicate holds.
    Converged,
}

/// One inference algorithm.
///
/// `initialize` runs once before the first step and checks that every latent
/// carries a family the strategy can update. `step` performs one update of
/// the families in `state`; it must not change the status or iteration count,
/// which belong to the caller.
pub trait InferenceStrategy {
    fn kind(&self) -> StrategyKind;

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<(), InferenceError>;

    fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<StepOutcome, InferenceError>;
}

/// The strategy held by a dispatcher.
#[derive(Debug, Clone)]
pub enum Strategy {
    Variational(Variational),
    MonteCarlo(MonteCarlo),
    Exact(Exact),
}

impl Strategy {
    /// A fresh strategy of `kind` with default settings.
    pub fn new(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Variational => Strategy::Variational(Variational::default()),
            StrategyKind::MonteCarlo => Strategy::MonteCarlo(MonteCarlo::default()),
            StrategyKind::Exact => Strategy::Exact(Exact::default()),
        }
    }
}

impl From<StrategyKind> for Strategy {
    fn from(kind: StrategyKind) -> Self {
        Strategy::new(kind)
    }
}

impl InferenceStrategy for Strategy {
    fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Variational(s) => s.kind(),
            Strategy::MonteCarlo(s) => s.kind(),
            Strategy::Exact(s) => s.kind(),
        }
    }

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<(), InferenceError> {
        match self {
            Strategy::Variational(s) => s.initialize(ctx, state, rng),
            Strategy::MonteCarlo(s) => s.initialize(ctx, state, rng),
            Strategy::Exact(s) => s.initialize(ctx, state, rng),
        }
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<StepOutcome, InferenceError> {
        match self {
            Strategy::Variational(s) => s.step(ctx, state, rng),
            Strategy::MonteCarlo(s) => s.step(ctx, state, rng),
            Strategy::Exact(s) => s.step(ctx, state, rng),
        }
    }
}

/// Prior family of a latent variable; the dispatcher has already checked it exists.
pub(crate) fn prior_tag(
    ctx: &RunContext<'_>,
    id: &VariableId,
) -> Result<ix_math::DistributionTag, InferenceError> {
    ctx.graph
        .node(id)
        .map(|n| n.family())
        .ok_or_else(|| InferenceError::UnknownVariable { id: id.clone() })
}
