//! Exact inference through conjugacy.
//!
//! A single step folds every observed child of each latent into the latent's
//! prior using the rule registered for the (prior, likelihood) pair. Any
//! structure the table cannot express fails with `NoConjugacy`; there is no
//! approximate fallback.

use ix_common::VariableId;
use ix_math::Distribution;
use rand::Rng;
use tracing::debug;

use super::conjugacy::{ConjugacyTable, LikelihoodSite};
use super::{InferenceStrategy, RunContext, StepOutcome, StrategyKind};
use crate::error::InferenceError;
use crate::family::{ApproximationFamily, FamilyError, FamilyUpdate};
use crate::graph::ParamRef;
use crate::state::InferenceState;

#[derive(Debug, Clone, Default)]
pub struct Exact {
    table: ConjugacyTable,
}

impl Exact {
    pub fn with_table(table: ConjugacyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ConjugacyTable {
        &self.table
    }

    /// Closed-form posterior of one latent.
    fn posterior(&self, ctx: &RunContext<'_>, id: &VariableId) -> Result<Distribution, InferenceError> {
        let no_conjugacy = |reason: String| InferenceError::NoConjugacy {
            id: id.clone(),
            reason,
        };

        let node = ctx
            .graph
            .node(id)
            .ok_or_else(|| InferenceError::UnknownVariable { id: id.clone() })?;
        let mut posterior = node.constant_distribution().ok_or_else(|| {
            no_conjugacy("prior parameters must be literals".to_string())
        })?;

        for child_id in ctx.graph.children(id) {
            let Some(observations) = ctx.observed.get(child_id) else {
                return Err(no_conjugacy(format!("child {child_id} is not observed")));
            };
            let child = ctx
                .graph
                .node(child_id)
                .ok_or_else(|| InferenceError::UnknownVariable { id: child_id.clone() })?;
            let rule = self.table.lookup(posterior.tag(), child.family()).ok_or_else(|| {
                no_conjugacy(format!(
                    "no conjugate rule for {} prior with {} likelihood",
                    posterior.tag(),
                    child.family()
                ))
            })?;

            let mut params = Vec::with_capacity(child.params().len());
            for (slot, param) in child.params().iter().enumerate() {
                match (slot == rule.slot, param) {
                    (true, ParamRef::Var(v)) if v == id => params.push(None),
                    (false, ParamRef::Const(c)) => params.push(Some(*c)),
                    _ => {
                        return Err(no_conjugacy(format!(
                            "{} parameter {} of child {child_id} must be {}",
                            child.family(),
                            child.family().param_names()[slot],
                            if slot == rule.slot {
                                format!("variable {id}")
                            } else {
                                "a literal".to_string()
                            }
                        )))
                    }
                }
            }

            let site = LikelihoodSite {
                child: child_id,
                params: &params,
                observations,
            };
            posterior = (rule.update)(&posterior, &site).ok_or_else(|| {
                no_conjugacy(format!("rule for {} rejected child {child_id}", posterior.tag()))
            })?;
            debug!(latent = %id, child = %child_id, posterior = %posterior, "conjugate update");
        }

        Ok(posterior)
    }
}

impl InferenceStrategy for Exact {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Exact
    }

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        _rng: &mut R,
    ) -> Result<(), InferenceError> {
        for id in ctx.latents() {
            match state.family(&id) {
                Some(ApproximationFamily::Parametric { .. }) => {}
                Some(other) => {
                    return Err(InferenceError::family(
                        &id,
                        FamilyError::Unsupported {
                            strategy: "exact",
                            family: other.kind().to_string(),
                        },
                    ))
                }
                None => return Err(InferenceError::MissingApproximation { id }),
            }
        }
        Ok(())
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        _rng: &mut R,
    ) -> Result<StepOutcome, InferenceError> {
        let mut updates = Vec::new();
        for id in ctx.latents() {
            let posterior = self.posterior(ctx, &id)?;
            updates.push((id, posterior));
        }

        for (id, posterior) in updates {
            let family = state
                .family_mut(&id)
                .ok_or_else(|| InferenceError::MissingApproximation { id: id.clone() })?;
            family
                .update(FamilyUpdate::Parameters(posterior))
                .map_err(|source| InferenceError::family(&id, source))?;
        }
        Ok(StepOutcome::Converged)
    }
}
