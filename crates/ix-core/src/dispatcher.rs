//! The inference dispatcher.
//!
//! A [`Dispatcher`] is bound to one strategy at construction. [`Dispatcher::run`]
//! validates its inputs, builds the initial families, and steps the strategy
//! until the run reaches a terminal status. [`Dispatcher::start`] exposes the
//! same loop one iteration at a time through [`InferenceRun`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use ix_config::InferenceConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::InferenceError;
use crate::family::{ApproximationFamily, ApproximationSpec};
use crate::graph::{ModelGraph, ObservedData};
use crate::inference::{InferenceStrategy, RunContext, StepOutcome, Strategy, StrategyKind};
use crate::state::{InferenceState, RunStatus};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    strategy: Strategy,
}

impl Dispatcher {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            strategy: Strategy::new(kind),
        }
    }

    /// Dispatch to a preconfigured strategy, e.g. exact inference with an
    /// extended conjugacy table.
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self { strategy }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Check the inputs of a run without running it.
    ///
    /// Checks, in order: the config, that every approximated variable exists,
    /// that every observation binds a known leaf with in-support values and
    /// no approximation, and that every remaining variable is approximated.
    pub fn validate(
        graph: &ModelGraph,
        approximations: &ApproximationSpec,
        observed: &ObservedData,
        config: &InferenceConfig,
    ) -> Result<(), InferenceError> {
        config.validate()?;

        if let Some(id) = approximations.keys().find(|id| !graph.contains(id)) {
            return Err(InferenceError::UnknownVariable { id: id.clone() });
        }

        for (id, values) in observed {
            let invalid = |reason: String| InferenceError::InvalidObservation {
                id: id.clone(),
                reason,
            };
            let Some(node) = graph.node(id) else {
                return Err(invalid("not a variable of the model".to_string()));
            };
            if !graph.is_leaf(id) {
                return Err(invalid("only leaf variables can be observed".to_string()));
            }
            if values.is_empty() {
                return Err(invalid("no observed values".to_string()));
            }
            if approximations.contains_key(id) {
                return Err(invalid("variable is both observed and approximated".to_string()));
            }
            if let Some(x) = values.iter().find(|x| !node.admits(**x)) {
                return Err(invalid(format!(
                    "value {x} is outside the support of {}",
                    node.family()
                )));
            }
        }

        for id in graph.topological_order() {
            if !observed.contains_key(id) && !approximations.contains_key(id) {
                return Err(InferenceError::MissingApproximation { id: id.clone() });
            }
        }
        Ok(())
    }

    /// Validate, initialise, and hand back a run positioned before its first step.
    pub fn start<'a>(
        &self,
        graph: &'a ModelGraph,
        approximations: &ApproximationSpec,
        observed: &'a ObservedData,
        config: &'a InferenceConfig,
    ) -> Result<InferenceRun<'a>, InferenceError> {
        if let Err(err) = Self::validate(graph, approximations, observed, config) {
            warn!(strategy = %self.strategy_kind(), error = %err, "inference inputs rejected");
            return Err(err);
        }

        let mut families = BTreeMap::new();
        for (id, spec) in approximations {
            let family = ApproximationFamily::new(*spec, config.sample_capacity)
                .map_err(|source| InferenceError::family(id, source))?;
            families.insert(id.clone(), family);
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let ctx = RunContext {
            graph,
            observed,
            config,
        };
        let mut strategy = self.strategy.clone();
        let mut state = InferenceState::new(strategy.kind(), families);
        strategy.initialize(&ctx, &mut state, &mut rng)?;

        info!(
            strategy = %strategy.kind(),
            latents = approximations.len(),
            observed = observed.len(),
            max_iterations = config.max_iterations,
            seed = ?config.seed,
            "inference run started"
        );
        Ok(InferenceRun {
            ctx,
            strategy,
            state,
            rng,
        })
    }

    /// Run to a terminal status.
    pub fn run(
        &self,
        graph: &ModelGraph,
        approximations: &ApproximationSpec,
        observed: &ObservedData,
        config: &InferenceConfig,
    ) -> Result<InferenceState, InferenceError> {
        let never = AtomicBool::new(false);
        self.run_until(graph, approximations, observed, config, &never)
    }

    /// Like [`run`](Self::run), but checks `cancel` before every iteration
    /// and stops with [`InferenceError::Cancelled`] once it is set.
    pub fn run_until(
        &self,
        graph: &ModelGraph,
        approximations: &ApproximationSpec,
        observed: &ObservedData,
        config: &InferenceConfig,
        cancel: &AtomicBool,
    ) -> Result<InferenceState, InferenceError> {
        let mut run = self.start(graph, approximations, observed, config)?;
        while !run.status().is_terminal() {
            if cancel.load(Ordering::Relaxed) {
                let iterations = run.state().iterations();
                warn!(iterations, "inference run cancelled");
                return Err(InferenceError::Cancelled { iterations });
            }
            run.step()?;
        }
        Ok(run.finish())
    }
}

/// An initialised run, advanced one iteration per [`step`](Self::step).
#[derive(Debug)]
pub struct InferenceRun<'a> {
    ctx: RunContext<'a>,
    strategy: Strategy,
    state: InferenceState,
    rng: StdRng,
}

impl InferenceRun<'_> {
    /// Perform one iteration and return the resulting status.
    ///
    /// A strategy error moves the run to [`RunStatus::Failed`] and is returned.
    /// Stepping a run that already reached a terminal status is an error.
    pub fn step(&mut self) -> Result<RunStatus, InferenceError> {
        let status = self.state.status();
        if status.is_terminal() {
            return Err(InferenceError::Terminated { status });
        }
        if status == RunStatus::Initialized {
            self.state.set_status(RunStatus::Running);
        }

        let outcome = match self
            .strategy
            .step(&self.ctx, &mut self.state, &mut self.rng)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state.set_status(RunStatus::Failed);
                warn!(
                    strategy = %self.strategy.kind(),
                    iteration = self.state.iterations() + 1,
                    error = %err,
                    "inference step failed"
                );
                return Err(err);
            }
        };
        self.state.record_iteration();

        if outcome == StepOutcome::Converged {
            self.state.set_status(RunStatus::Converged);
        } else if self.state.iterations() >= self.ctx.config.max_iterations {
            self.state.set_status(RunStatus::IterationLimitReached);
        }

        let status = self.state.status();
        debug!(iteration = self.state.iterations(), status = %status, "inference step");
        if status.is_terminal() {
            info!(
                strategy = %self.strategy.kind(),
                status = %status,
                iterations = self.state.iterations(),
                objective = ?self.state.diagnostics().objective,
                acceptance_rate = ?self.state.diagnostics().acceptance_rate,
                "inference run finished"
            );
        }
        Ok(status)
    }

    pub fn status(&self) -> RunStatus {
        self.state.status()
    }

    pub fn state(&self) -> &InferenceState {
        &self.state
    }

    /// Give up the run and keep its state.
    pub fn finish(self) -> InferenceState {
        self.state
    }
}
