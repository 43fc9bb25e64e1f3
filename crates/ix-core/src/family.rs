//! Approximation families: the current posterior estimate of one latent.
//!
//! - [`ApproximationFamily::PointMass`]: a single value.
//! - [`ApproximationFamily::Parametric`]: a distribution with named parameters.
//! - [`ApproximationFamily::Empirical`]: a bounded, ordered sample set.
//!
//! The empirical buffer keeps the most recent `capacity` samples; appending
//! to a full buffer evicts the oldest.

use std::collections::{BTreeMap, VecDeque};

use ix_common::VariableId;
use ix_math::{Distribution, DistributionTag, MathError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from family construction, update, and sampling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FamilyError {
    #[error("empirical family has no samples")]
    EmptySamples,

    #[error("empirical capacity must be at least 1")]
    ZeroCapacity,

    #[error("empirical family holds {len} samples but capacity is {capacity}")]
    Overfull { len: usize, capacity: usize },

    #[error("cannot apply {update} update to a {family} family")]
    UpdateMismatch {
        family: &'static str,
        update: &'static str,
    },

    #[error("expected a {expected} distribution, got {found}")]
    TagMismatch {
        expected: DistributionTag,
        found: DistributionTag,
    },

    #[error("{strategy} inference does not support {family} families")]
    Unsupported {
        strategy: &'static str,
        family: String,
    },

    #[error("{family} approximation does not cover the support of a {prior} prior")]
    SupportMismatch {
        family: DistributionTag,
        prior: DistributionTag,
    },

    #[error("{strategy} inference cannot handle discrete latent with {prior} prior")]
    DiscreteLatent {
        strategy: &'static str,
        prior: DistributionTag,
    },

    #[error(transparent)]
    Distribution(#[from] MathError),
}

/// Requested family for one latent variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilySpec {
    PointMass,
    Parametric { family: DistributionTag },
    Empirical,
}

/// Requested family per latent variable.
pub type ApproximationSpec = BTreeMap<VariableId, FamilySpec>;

/// Replacement or addition applied by [`ApproximationFamily::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FamilyUpdate {
    /// Replace a point mass value.
    Point(f64),
    /// Replace parametric parameters; the family tag must not change.
    Parameters(Distribution),
    /// Append one sample to an empirical family.
    Sample(f64),
}

impl FamilyUpdate {
    fn name(&self) -> &'static str {
        match self {
            FamilyUpdate::Point(_) => "point",
            FamilyUpdate::Parameters(_) => "parameters",
            FamilyUpdate::Sample(_) => "sample",
        }
    }
}

/// Fixed-capacity sample buffer, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEmpiricalSamples")]
pub struct EmpiricalSamples {
    capacity: usize,
    samples: VecDeque<f64>,
}

/// Unchecked wire form of [`EmpiricalSamples`].
#[derive(Deserialize)]
struct RawEmpiricalSamples {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl TryFrom<RawEmpiricalSamples> for EmpiricalSamples {
    type Error = FamilyError;

    fn try_from(raw: RawEmpiricalSamples) -> Result<Self, Self::Error> {
        if raw.capacity == 0 {
            return Err(FamilyError::ZeroCapacity);
        }
        if raw.samples.len() > raw.capacity {
            return Err(FamilyError::Overfull {
                len: raw.samples.len(),
                capacity: raw.capacity,
            });
        }
        Ok(Self {
            capacity: raw.capacity,
            samples: raw.samples,
        })
    }
}

impl EmpiricalSamples {
    pub fn new(capacity: usize) -> Result<Self, FamilyError> {
        if capacity == 0 {
            return Err(FamilyError::ZeroCapacity);
        }
        // Grows on push; capacity is only an upper bound.
        Ok(Self {
            capacity,
            samples: VecDeque::new(),
        })
    }

    /// Append, evicting the oldest sample when full.
    pub fn push(&mut self, value: f64) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<f64> {
        self.samples.get(index).copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Samples in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// Posterior estimate for one latent variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApproximationFamily {
    PointMass { value: f64 },
    Parametric { distribution: Distribution },
    Empirical(EmpiricalSamples),
}

impl ApproximationFamily {
    /// Initial family for `spec`: zero point, zero unconstrained parameters,
    /// or an empty buffer holding up to `capacity` samples.
    pub fn new(spec: FamilySpec, capacity: usize) -> Result<Self, FamilyError> {
        Ok(match spec {
            FamilySpec::PointMass => ApproximationFamily::PointMass { value: 0.0 },
            FamilySpec::Parametric { family } => ApproximationFamily::Parametric {
                distribution: Distribution::standard(family),
            },
            FamilySpec::Empirical => ApproximationFamily::Empirical(EmpiricalSamples::new(capacity)?),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApproximationFamily::PointMass { .. } => "point_mass",
            ApproximationFamily::Parametric { .. } => "parametric",
            ApproximationFamily::Empirical(_) => "empirical",
        }
    }

    /// The kind plus the distribution tag for parametric families.
    pub fn describe(&self) -> String {
        match self {
            ApproximationFamily::Parametric { distribution } => {
                format!("parametric {}", distribution.tag())
            }
            other => other.kind().to_string(),
        }
    }

    pub fn update(&mut self, update: FamilyUpdate) -> Result<(), FamilyError> {
        match (&mut *self, update) {
            (ApproximationFamily::PointMass { value }, FamilyUpdate::Point(v)) => {
                *value = v;
                Ok(())
            }
            (ApproximationFamily::Parametric { distribution }, FamilyUpdate::Parameters(next)) => {
                if distribution.tag() != next.tag() {
                    return Err(FamilyError::TagMismatch {
                        expected: distribution.tag(),
                        found: next.tag(),
                    });
                }
                *distribution = next;
                Ok(())
            }
            (ApproximationFamily::Empirical(samples), FamilyUpdate::Sample(v)) => {
                samples.push(v);
                Ok(())
            }
            (family, update) => Err(FamilyError::UpdateMismatch {
                family: family.kind(),
                update: update.name(),
            }),
        }
    }

    /// Draw one realisation.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, FamilyError> {
        match self {
            ApproximationFamily::PointMass { value } => Ok(*value),
            ApproximationFamily::Parametric { distribution } => Ok(distribution.sample(rng)?),
            ApproximationFamily::Empirical(samples) => {
                if samples.is_empty() {
                    return Err(FamilyError::EmptySamples);
                }
                let idx = rng.random_range(0..samples.len());
                samples.get(idx).ok_or(FamilyError::EmptySamples)
            }
        }
    }

    /// Posterior mean estimate; `None` for an empty sample set.
    pub fn mean(&self) -> Option<f64> {
        match self {
            ApproximationFamily::PointMass { value } => Some(*value),
            ApproximationFamily::Parametric { distribution } => Some(distribution.mean()),
            ApproximationFamily::Empirical(samples) => {
                if samples.is_empty() {
                    None
                } else {
                    Some(samples.iter().sum::<f64>() / samples.len() as f64)
                }
            }
        }
    }

    /// Posterior variance estimate (population variance for sample sets).
    pub fn variance(&self) -> Option<f64> {
        match self {
            ApproximationFamily::PointMass { .. } => Some(0.0),
            ApproximationFamily::Parametric { distribution } => Some(distribution.variance()),
            ApproximationFamily::Empirical(samples) => {
                let mean = self.mean()?;
                let ss: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
                Some(ss / samples.len() as f64)
            }
        }
    }

    pub fn as_distribution(&self) -> Option<&Distribution> {
        match self {
            ApproximationFamily::Parametric { distribution } => Some(distribution),
            _ => None,
        }
    }

    pub fn as_empirical(&self) -> Option<&EmpiricalSamples> {
        match self {
            ApproximationFamily::Empirical(samples) => Some(samples),
            _ => None,
        }
    }
}
