//! Monte Carlo inference by random-walk Metropolis-within-Gibbs.
//!
//! The chain state is one value per latent. A step sweeps the latents in
//! topological order, proposing `x' = x + N(0, proposal_scale²)` for each and
//! accepting with probability `min(1, p(x') / p(x))` under the joint density.
//! The resulting joint sample depends only on the previous one and is
//! appended to every latent's empirical family.

use ix_common::VariableId;
use ix_math::Distribution;
use rand::Rng;
use tracing::{debug, trace};

use super::{prior_tag, InferenceStrategy, RunContext, StepOutcome, StrategyKind};
use crate::error::InferenceError;
use crate::family::{ApproximationFamily, FamilyError, FamilyUpdate};
use crate::graph::{Assignment, GraphError};
use crate::state::InferenceState;

#[derive(Debug, Clone, Default)]
pub struct MonteCarlo {
    latents: Vec<VariableId>,
    current: Assignment,
    current_log_density: f64,
    proposed: u64,
    accepted: u64,
}

impl MonteCarlo {
    /// Current chain position.
    pub fn position(&self) -> &Assignment {
        &self.current
    }

    pub fn acceptance_rate(&self) -> Option<f64> {
        (self.proposed > 0).then(|| self.accepted as f64 / self.proposed as f64)
    }

    /// Start each latent at its prior mean given the already-initialised parents.
    fn initial_position(
        ctx: &RunContext<'_>,
        latents: &[VariableId],
    ) -> Result<Assignment, InferenceError> {
        let mut position = Assignment::new();
        for id in latents {
            let node = ctx
                .graph
                .node(id)
                .ok_or_else(|| InferenceError::UnknownVariable { id: id.clone() })?;
            let start = match node.resolve(|parent| position.get(parent).copied()) {
                Ok(prior) => start_point(&prior),
                // Parent starting values outside this prior's parameter domain.
                Err(GraphError::Parameters { .. }) => {
                    start_point(&Distribution::standard(node.family()))
                }
                Err(e) => return Err(e.into()),
            };
            position.insert(id.clone(), start);
        }
        Ok(position)
    }
}

fn start_point(prior: &Distribution) -> f64 {
    let mean = prior.mean();
    if prior.contains(mean) {
        mean
    } else {
        Distribution::standard(prior.tag()).mean()
    }
}

impl InferenceStrategy for MonteCarlo {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MonteCarlo
    }

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        _rng: &mut R,
    ) -> Result<(), InferenceError> {
        let latents = ctx.latents();
        for id in &latents {
            match state.family(id) {
                Some(ApproximationFamily::Empirical(_)) => {}
                Some(other) => {
                    return Err(InferenceError::family(
                        id,
                        FamilyError::Unsupported {
                            strategy: "monte carlo",
                            family: other.kind().to_string(),
                        },
                    ))
                }
                None => return Err(InferenceError::MissingApproximation { id: id.clone() }),
            }
            let prior = prior_tag(ctx, id)?;
            if prior.support().is_discrete() {
                return Err(InferenceError::family(
                    id,
                    FamilyError::DiscreteLatent {
                        strategy: "monte carlo",
                        prior,
                    },
                ));
            }
        }

        self.current = Self::initial_position(ctx, &latents)?;
        self.current_log_density = ctx.graph.log_joint(&self.current, ctx.observed)?;
        self.latents = latents;
        self.proposed = 0;
        self.accepted = 0;
        debug!(
            latents = self.latents.len(),
            log_density = self.current_log_density,
            "initialised Metropolis chain"
        );
        Ok(())
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<StepOutcome, InferenceError> {
        let jitter = Distribution::Normal {
            loc: 0.0,
            scale: ctx.config.proposal_scale,
        };

        for id in &self.latents {
            let Some(&old) = self.current.get(id) else {
                return Err(InferenceError::MissingApproximation { id: id.clone() });
            };
            let step = jitter.sample(rng).map_err(|source| GraphError::Parameters {
                node: id.clone(),
                source,
            })?;
            let candidate = old + step;
            self.current.insert(id.clone(), candidate);
            let proposed = ctx.graph.log_joint(&self.current, ctx.observed)?;
            self.proposed += 1;

            let accept = if proposed == f64::NEG_INFINITY {
                false
            } else if self.current_log_density == f64::NEG_INFINITY {
                true
            } else {
                let log_ratio = proposed - self.current_log_density;
                log_ratio >= 0.0 || rng.random::<f64>().ln() < log_ratio
            };

            if accept {
                self.accepted += 1;
                self.current_log_density = proposed;
            } else {
                self.current.insert(id.clone(), old);
            }
            trace!(latent = %id, candidate, accept, "metropolis proposal");
        }

        for (id, value) in &self.current {
            let family = state
                .family_mut(id)
                .ok_or_else(|| InferenceError::MissingApproximation { id: id.clone() })?;
            family
                .update(FamilyUpdate::Sample(*value))
                .map_err(|source| InferenceError::family(id, source))?;
        }
        state.diagnostics_mut().acceptance_rate = self.acceptance_rate();
        Ok(StepOutcome::Continue)
    }
}
