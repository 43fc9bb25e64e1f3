//! Variational inference: MAP for point masses, KLqp for Gaussian-based families.
//!
//! Every latent is optimised in unconstrained coordinates `u` and mapped to
//! its prior's support by a fixed transform (identity, `exp` or logistic).
//!
//! - A point mass contributes one coordinate, `u`. Its term of the objective
//!   is the negative log joint at `T(u)`, so the optimum is the posterior mode.
//! - A Normal, LogNormal or LogitNormal family contributes `(loc, ln scale)`
//!   and is fitted with the reparameterisation estimator: `u = loc + scale·ε`
//!   with `ε ~ N(0, 1)`, plus the log Jacobian of `T` and the Gaussian entropy.
//!
//! Gradients are central finite differences of the Monte Carlo objective,
//! evaluated with the same `ε` draws on both sides. Adam takes the step.

use std::f64::consts::{E, PI};

use ix_common::VariableId;
use ix_math::{logistic, logistic_log_jacobian, logit, Adam, Distribution, DistributionTag, Support};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, trace};

use super::{prior_tag, InferenceStrategy, RunContext, StepOutcome, StrategyKind};
use crate::error::InferenceError;
use crate::family::{ApproximationFamily, FamilyError, FamilyUpdate};
use crate::graph::Assignment;
use crate::state::InferenceState;

/// Relative step of the central difference.
const FD_STEP: f64 = 1e-5;

/// Map from the real line onto a latent's support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    Exp,
    Logistic,
}

impl Transform {
    pub fn for_support(support: Support) -> Option<Self> {
        match support {
            Support::Real => Some(Transform::Identity),
            Support::Positive => Some(Transform::Exp),
            Support::UnitInterval => Some(Transform::Logistic),
            Support::Binary | Support::Counts => None,
        }
    }

    /// The transform implied by a Gaussian-based approximation family.
    pub fn for_family(tag: DistributionTag) -> Option<Self> {
        match tag {
            DistributionTag::Normal => Some(Transform::Identity),
            DistributionTag::LogNormal => Some(Transform::Exp),
            DistributionTag::LogitNormal => Some(Transform::Logistic),
            _ => None,
        }
    }

    pub fn forward(self, u: f64) -> f64 {
        match self {
            Transform::Identity => u,
            Transform::Exp => u.exp(),
            Transform::Logistic => logistic(u),
        }
    }

    pub fn inverse(self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Exp => x.ln(),
            Transform::Logistic => logit(x),
        }
    }

    /// `ln |dT/du|`.
    pub fn log_jacobian(self, u: f64) -> f64 {
        match self {
            Transform::Identity => 0.0,
            Transform::Exp => u,
            Transform::Logistic => logistic_log_jacobian(u),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Coordinates {
    Point { index: usize },
    Gaussian { family: DistributionTag, loc: usize, log_scale: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct Factor {
    id: VariableId,
    transform: Transform,
    coords: Coordinates,
}

impl Factor {
    /// Unconstrained value for draw `eps`.
    fn unconstrained(&self, theta: &[f64], eps: f64) -> f64 {
        match self.coords {
            Coordinates::Point { index } => theta[index],
            Coordinates::Gaussian { loc, log_scale, .. } => theta[loc] + theta[log_scale].exp() * eps,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Variational {
    factors: Vec<Factor>,
    theta: Vec<f64>,
    optimizer: Option<Adam>,
    previous: Option<f64>,
}

impl Variational {
    /// Current unconstrained parameter vector.
    pub fn parameters(&self) -> &[f64] {
        &self.theta
    }

    fn stochastic(&self) -> bool {
        self.factors
            .iter()
            .any(|f| matches!(f.coords, Coordinates::Gaussian { .. }))
    }

    /// Negative ELBO at `theta` for fixed standard-normal draws.
    fn objective(
        &self,
        ctx: &RunContext<'_>,
        theta: &[f64],
        noise: &[Vec<f64>],
    ) -> Result<f64, InferenceError> {
        let mut assignment = Assignment::new();
        let mut expected = 0.0;
        for eps in noise {
            let mut log_jacobian = 0.0;
            for (factor, &e) in self.factors.iter().zip(eps) {
                let u = factor.unconstrained(theta, e);
                if let Coordinates::Gaussian { .. } = factor.coords {
                    log_jacobian += factor.transform.log_jacobian(u);
                }
                assignment.insert(factor.id.clone(), factor.transform.forward(u));
            }
            expected += ctx.graph.log_joint(&assignment, ctx.observed)? + log_jacobian;
        }
        expected /= noise.len() as f64;

        let entropy: f64 = self
            .factors
            .iter()
            .filter_map(|f| match f.coords {
                Coordinates::Gaussian { log_scale, .. } => {
                    Some(theta[log_scale] + 0.5 * (2.0 * PI * E).ln())
                }
                Coordinates::Point { .. } => None,
            })
            .sum();

        Ok(-expected - entropy)
    }

    fn gradient(
        &self,
        ctx: &RunContext<'_>,
        noise: &[Vec<f64>],
    ) -> Result<Vec<f64>, InferenceError> {
        let mut probe = self.theta.clone();
        let mut grad = Vec::with_capacity(self.theta.len());
        for i in 0..self.theta.len() {
            let h = FD_STEP * self.theta[i].abs().max(1.0);
            probe[i] = self.theta[i] + h;
            let upper = self.objective(ctx, &probe, noise)?;
            probe[i] = self.theta[i] - h;
            let lower = self.objective(ctx, &probe, noise)?;
            probe[i] = self.theta[i];
            grad.push((upper - lower) / (2.0 * h));
        }
        Ok(grad)
    }

    /// Write the current parameters back into the state's families.
    fn publish(&self, state: &mut InferenceState) -> Result<(), InferenceError> {
        for factor in &self.factors {
            let update = match factor.coords {
                Coordinates::Point { index } => {
                    FamilyUpdate::Point(factor.transform.forward(self.theta[index]))
                }
                Coordinates::Gaussian { family, loc, log_scale } => {
                    let dist = Distribution::from_params(
                        family,
                        &[self.theta[loc], self.theta[log_scale].exp()],
                    )
                    .map_err(|e| InferenceError::family(&factor.id, e.into()))?;
                    FamilyUpdate::Parameters(dist)
                }
            };
            state
                .family_mut(&factor.id)
                .ok_or_else(|| InferenceError::MissingApproximation {
                    id: factor.id.clone(),
                })?
                .update(update)
                .map_err(|source| InferenceError::family(&factor.id, source))?;
        }
        Ok(())
    }
}

impl InferenceStrategy for Variational {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Variational
    }

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        _rng: &mut R,
    ) -> Result<(), InferenceError> {
        self.factors.clear();
        self.theta.clear();
        self.previous = None;

        for id in ctx.latents() {
            let prior = prior_tag(ctx, &id)?;
            let Some(transform) = Transform::for_support(prior.support()) else {
                return Err(InferenceError::family(
                    &id,
                    FamilyError::DiscreteLatent {
                        strategy: "variational",
                        prior,
                    },
                ));
            };

            let coords = match state.family(&id) {
                Some(ApproximationFamily::PointMass { value }) => {
                    let u = transform.inverse(*value);
                    self.theta.push(if u.is_finite() { u } else { 0.0 });
                    Coordinates::Point {
                        index: self.theta.len() - 1,
                    }
                }
                Some(ApproximationFamily::Parametric { distribution }) => {
                    let family = distribution.tag();
                    if Transform::for_family(family) != Some(transform) {
                        let err = match Transform::for_family(family) {
                            Some(_) => FamilyError::SupportMismatch { family, prior },
                            None => FamilyError::Unsupported {
                                strategy: "variational",
                                family: format!("parametric {family}"),
                            },
                        };
                        return Err(InferenceError::family(&id, err));
                    }
                    let (loc, scale) = match *distribution {
                        Distribution::Normal { loc, scale }
                        | Distribution::LogNormal { loc, scale }
                        | Distribution::LogitNormal { loc, scale } => (loc, scale),
                        _ => (0.0, 1.0),
                    };
                    self.theta.push(loc);
                    self.theta.push(scale.ln());
                    Coordinates::Gaussian {
                        family,
                        loc: self.theta.len() - 2,
                        log_scale: self.theta.len() - 1,
                    }
                }
                Some(other) => {
                    return Err(InferenceError::family(
                        &id,
                        FamilyError::Unsupported {
                            strategy: "variational",
                            family: other.kind().to_string(),
                        },
                    ))
                }
                None => return Err(InferenceError::MissingApproximation { id }),
            };
            self.factors.push(Factor {
                id,
                transform,
                coords,
            });
        }

        self.optimizer = Some(Adam::new(self.theta.len(), ctx.config.learning_rate));
        self.publish(state)?;
        debug!(
            factors = self.factors.len(),
            dimension = self.theta.len(),
            stochastic = self.stochastic(),
            "initialised variational parameters"
        );
        Ok(())
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        ctx: &RunContext<'_>,
        state: &mut InferenceState,
        rng: &mut R,
    ) -> Result<StepOutcome, InferenceError> {
        let iteration = state.iterations() + 1;
        let draws = if self.stochastic() {
            ctx.config.vi_samples.max(1)
        } else {
            1
        };
        let mut noise = Vec::with_capacity(draws);
        for _ in 0..draws {
            let eps: Vec<f64> = (0..self.factors.len())
                .map(|_| rng.sample(StandardNormal))
                .collect();
            noise.push(eps);
        }

        let objective = self.objective(ctx, &self.theta, &noise)?;
        let grad = self.gradient(ctx, &noise)?;
        if !objective.is_finite() || grad.iter().any(|g| !g.is_finite()) {
            return Err(InferenceError::NonFiniteObjective { iteration });
        }

        let Some(optimizer) = self.optimizer.as_mut() else {
            return Err(InferenceError::Terminated {
                status: state.status(),
            });
        };
        optimizer.step(&mut self.theta, &grad);
        self.publish(state)?;
        state.diagnostics_mut().objective = Some(objective);
        trace!(iteration, objective, "variational step");

        let converged = self
            .previous
            .is_some_and(|prev| (objective - prev).abs() < ctx.config.tolerance);
        self.previous = Some(objective);
        Ok(if converged {
            StepOutcome::Converged
        } else {
            StepOutcome::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_invert() {
        for (t, x) in [
            (Transform::Identity, -2.5),
            (Transform::Exp, 3.0),
            (Transform::Logistic, 0.2),
        ] {
            assert!((t.forward(t.inverse(x)) - x).abs() < 1e-12);
        }
    }

    #[test]
    fn transform_choice_follows_support() {
        assert_eq!(Transform::for_support(Support::Positive), Some(Transform::Exp));
        assert_eq!(Transform::for_support(Support::Counts), None);
        assert_eq!(
            Transform::for_family(DistributionTag::LogitNormal),
            Some(Transform::Logistic)
        );
        assert_eq!(Transform::for_family(DistributionTag::Beta), None);
    }

    #[test]
    fn exp_jacobian_matches_derivative() {
        let u = 0.7;
        let h = 1e-6;
        let numeric = ((Transform::Exp.forward(u + h) - Transform::Exp.forward(u - h)) / (2.0 * h)).ln();
        assert!((numeric - Transform::Exp.log_jacobian(u)).abs() < 1e-6);
        let numeric = ((Transform::Logistic.forward(u + h) - Transform::Logistic.forward(u - h))
            / (2.0 * h))
            .ln();
        assert!((numeric - Transform::Logistic.log_jacobian(u)).abs() < 1e-6);
    }
}
