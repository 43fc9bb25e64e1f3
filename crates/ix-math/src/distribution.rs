//! Scalar distribution families.
//!
//! [`DistributionTag`] names a family; [`Distribution`] is a fully
//! parameterised member of one. Every family exposes its log density, a
//! sampler backed by `rand_distr`, and its first two moments.
//!
//! # Unconstrained coordinates
//!
//! [`Distribution::standard`] builds the member whose parameters are all zero
//! in unconstrained coordinates (locations stay as-is, positive parameters
//! go through `ln`, probabilities through `logit`). That is the initial state
//! of a parametric approximation before any update.

use std::fmt;

use rand::Rng;
use rand_distr::{Beta, Binomial, Exp, Gamma, LogNormal, Normal, Poisson};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::special::{ln_beta, ln_choose, ln_gamma};
use crate::math::stable::{logistic, logit, xlogy};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Quadrature half-width (in standard deviations) for logit-normal moments.
const QUADRATURE_SPAN: f64 = 8.0;
const QUADRATURE_POINTS: usize = 400;

/// Errors from distribution construction and sampling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    #[error("{family} expects {expected} parameters, got {got}")]
    Arity {
        family: DistributionTag,
        expected: usize,
        got: usize,
    },

    #[error("invalid {family} parameter {name}={value}")]
    InvalidParameter {
        family: DistributionTag,
        name: &'static str,
        value: f64,
    },

    #[error("sampling failed: {0}")]
    Sampling(String),
}

/// Set of values a family assigns positive density to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    Real,
    Positive,
    UnitInterval,
    Binary,
    Counts,
}

impl Support {
    /// Whether the support is a subset of the integers.
    pub fn is_discrete(self) -> bool {
        matches!(self, Support::Binary | Support::Counts)
    }
}

/// Distribution family identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionTag {
    Normal,
    LogNormal,
    LogitNormal,
    Beta,
    Gamma,
    Exponential,
    Bernoulli,
    Binomial,
    Poisson,
}

impl DistributionTag {
    pub const ALL: [DistributionTag; 9] = [
        DistributionTag::Normal,
        DistributionTag::LogNormal,
        DistributionTag::LogitNormal,
        DistributionTag::Beta,
        DistributionTag::Gamma,
        DistributionTag::Exponential,
        DistributionTag::Bernoulli,
        DistributionTag::Binomial,
        DistributionTag::Poisson,
    ];

    /// Parameter names in positional order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            DistributionTag::Normal | DistributionTag::LogNormal | DistributionTag::LogitNormal => {
                &["loc", "scale"]
            }
            DistributionTag::Beta => &["alpha", "beta"],
            DistributionTag::Gamma => &["shape", "rate"],
            DistributionTag::Exponential | DistributionTag::Poisson => &["rate"],
            DistributionTag::Bernoulli => &["probs"],
            DistributionTag::Binomial => &["total_count", "probs"],
        }
    }

    pub fn arity(self) -> usize {
        self.param_names().len()
    }

    /// Position of a named parameter.
    pub fn param_index(self, name: &str) -> Option<usize> {
        self.param_names().iter().position(|n| *n == name)
    }

    pub fn support(self) -> Support {
        match self {
            DistributionTag::Normal => Support::Real,
            DistributionTag::LogNormal | DistributionTag::Gamma | DistributionTag::Exponential => {
                Support::Positive
            }
            DistributionTag::LogitNormal | DistributionTag::Beta => Support::UnitInterval,
            DistributionTag::Bernoulli => Support::Binary,
            DistributionTag::Binomial | DistributionTag::Poisson => Support::Counts,
        }
    }

    /// Whether `x` can lie in the support of some member of this family.
    ///
    /// Used to screen observations before the family's parameters are known.
    pub fn admits(self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        match self {
            DistributionTag::Normal => true,
            DistributionTag::LogNormal | DistributionTag::Gamma => x > 0.0,
            DistributionTag::Exponential => x >= 0.0,
            DistributionTag::LogitNormal | DistributionTag::Beta => x > 0.0 && x < 1.0,
            DistributionTag::Bernoulli => x == 0.0 || x == 1.0,
            DistributionTag::Binomial | DistributionTag::Poisson => x >= 0.0 && x.fract() == 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DistributionTag::Normal => "normal",
            DistributionTag::LogNormal => "log_normal",
            DistributionTag::LogitNormal => "logit_normal",
            DistributionTag::Beta => "beta",
            DistributionTag::Gamma => "gamma",
            DistributionTag::Exponential => "exponential",
            DistributionTag::Bernoulli => "bernoulli",
            DistributionTag::Binomial => "binomial",
            DistributionTag::Poisson => "poisson",
        }
    }
}

impl fmt::Display for DistributionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterised scalar distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Distribution {
    Normal { loc: f64, scale: f64 },
    LogNormal { loc: f64, scale: f64 },
    LogitNormal { loc: f64, scale: f64 },
    Beta { alpha: f64, beta: f64 },
    Gamma { shape: f64, rate: f64 },
    Exponential { rate: f64 },
    Bernoulli { probs: f64 },
    Binomial { total_count: u64, probs: f64 },
    Poisson { rate: f64 },
}

impl Distribution {
    /// Build a member of `tag` from positional parameter values.
    pub fn from_params(tag: DistributionTag, values: &[f64]) -> Result<Self, MathError> {
        if values.len() != tag.arity() {
            return Err(MathError::Arity {
                family: tag,
                expected: tag.arity(),
                got: values.len(),
            });
        }
        let names = tag.param_names();
        let finite = |i: usize| -> Result<f64, MathError> {
            let v = values[i];
            if v.is_finite() {
                Ok(v)
            } else {
                Err(MathError::InvalidParameter { family: tag, name: names[i], value: v })
            }
        };
        let positive = |i: usize| -> Result<f64, MathError> {
            let v = finite(i)?;
            if v > 0.0 {
                Ok(v)
            } else {
                Err(MathError::InvalidParameter { family: tag, name: names[i], value: v })
            }
        };
        let probability = |i: usize| -> Result<f64, MathError> {
            let v = finite(i)?;
            if (0.0..=1.0).contains(&v) {
                Ok(v)
            } else {
                Err(MathError::InvalidParameter { family: tag, name: names[i], value: v })
            }
        };

        let dist = match tag {
            DistributionTag::Normal => Distribution::Normal { loc: finite(0)?, scale: positive(1)? },
            DistributionTag::LogNormal => Distribution::LogNormal { loc: finite(0)?, scale: positive(1)? },
            DistributionTag::LogitNormal => {
                Distribution::LogitNormal { loc: finite(0)?, scale: positive(1)? }
            }
            DistributionTag::Beta => Distribution::Beta { alpha: positive(0)?, beta: positive(1)? },
            DistributionTag::Gamma => Distribution::Gamma { shape: positive(0)?, rate: positive(1)? },
            DistributionTag::Exponential => Distribution::Exponential { rate: positive(0)? },
            DistributionTag::Bernoulli => Distribution::Bernoulli { probs: probability(0)? },
            DistributionTag::Binomial => {
                let n = finite(0)?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(MathError::InvalidParameter {
                        family: tag,
                        name: names[0],
                        value: n,
                    });
                }
                Distribution::Binomial { total_count: n as u64, probs: probability(1)? }
            }
            DistributionTag::Poisson => Distribution::Poisson { rate: positive(0)? },
        };
        Ok(dist)
    }

    /// The member of `tag` whose unconstrained parameters are all zero.
    pub fn standard(tag: DistributionTag) -> Self {
        match tag {
            DistributionTag::Normal => Distribution::Normal { loc: 0.0, scale: 1.0 },
            DistributionTag::LogNormal => Distribution::LogNormal { loc: 0.0, scale: 1.0 },
            DistributionTag::LogitNormal => Distribution::LogitNormal { loc: 0.0, scale: 1.0 },
            DistributionTag::Beta => Distribution::Beta { alpha: 1.0, beta: 1.0 },
            DistributionTag::Gamma => Distribution::Gamma { shape: 1.0, rate: 1.0 },
            DistributionTag::Exponential => Distribution::Exponential { rate: 1.0 },
            DistributionTag::Bernoulli => Distribution::Bernoulli { probs: 0.5 },
            // ln(total_count) = 0
            DistributionTag::Binomial => Distribution::Binomial { total_count: 1, probs: 0.5 },
            DistributionTag::Poisson => Distribution::Poisson { rate: 1.0 },
        }
    }

    pub fn tag(&self) -> DistributionTag {
        match self {
            Distribution::Normal { .. } => DistributionTag::Normal,
            Distribution::LogNormal { .. } => DistributionTag::LogNormal,
            Distribution::LogitNormal { .. } => DistributionTag::LogitNormal,
            Distribution::Beta { .. } => DistributionTag::Beta,
            Distribution::Gamma { .. } => DistributionTag::Gamma,
            Distribution::Exponential { .. } => DistributionTag::Exponential,
            Distribution::Bernoulli { .. } => DistributionTag::Bernoulli,
            Distribution::Binomial { .. } => DistributionTag::Binomial,
            Distribution::Poisson { .. } => DistributionTag::Poisson,
        }
    }

    /// Positional parameter values, matching [`DistributionTag::param_names`].
    pub fn values(&self) -> Vec<f64> {
        match *self {
            Distribution::Normal { loc, scale }
            | Distribution::LogNormal { loc, scale }
            | Distribution::LogitNormal { loc, scale } => vec![loc, scale],
            Distribution::Beta { alpha, beta } => vec![alpha, beta],
            Distribution::Gamma { shape, rate } => vec![shape, rate],
            Distribution::Exponential { rate } | Distribution::Poisson { rate } => vec![rate],
            Distribution::Bernoulli { probs } => vec![probs],
            Distribution::Binomial { total_count, probs } => vec![total_count as f64, probs],
        }
    }

    /// Named parameter values.
    pub fn params(&self) -> Vec<(&'static str, f64)> {
        self.tag()
            .param_names()
            .iter()
            .copied()
            .zip(self.values())
            .collect()
    }

    pub fn support(&self) -> Support {
        self.tag().support()
    }

    /// Whether `x` lies in the support of this member.
    pub fn contains(&self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        match *self {
            Distribution::Normal { .. } => true,
            Distribution::LogNormal { .. }
            | Distribution::Gamma { .. } => x > 0.0,
            Distribution::Exponential { .. } => x >= 0.0,
            Distribution::LogitNormal { .. } | Distribution::Beta { .. } => x > 0.0 && x < 1.0,
            Distribution::Bernoulli { .. } => x == 0.0 || x == 1.0,
            Distribution::Binomial { total_count, .. } => {
                x >= 0.0 && x.fract() == 0.0 && x <= total_count as f64
            }
            Distribution::Poisson { .. } => x >= 0.0 && x.fract() == 0.0,
        }
    }

    /// Log density (or log mass for discrete families). `-inf` outside the support.
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NEG_INFINITY;
        }
        match *self {
            Distribution::Normal { loc, scale } => normal_ln_pdf(x, loc, scale),
            Distribution::LogNormal { loc, scale } => {
                let lx = x.ln();
                normal_ln_pdf(lx, loc, scale) - lx
            }
            Distribution::LogitNormal { loc, scale } => {
                normal_ln_pdf(logit(x), loc, scale) - x.ln() - (1.0 - x).ln()
            }
            Distribution::Beta { alpha, beta } => {
                (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln() - ln_beta(alpha, beta)
            }
            Distribution::Gamma { shape, rate } => {
                shape * rate.ln() - ln_gamma(shape) + (shape - 1.0) * x.ln() - rate * x
            }
            Distribution::Exponential { rate } => rate.ln() - rate * x,
            Distribution::Bernoulli { probs } => {
                if x == 1.0 {
                    probs.ln()
                } else {
                    (1.0 - probs).ln()
                }
            }
            Distribution::Binomial { total_count, probs } => {
                let k = x as u64;
                ln_choose(total_count, k)
                    + xlogy(x, probs)
                    + xlogy(total_count as f64 - x, 1.0 - probs)
            }
            Distribution::Poisson { rate } => xlogy(x, rate) - rate - ln_gamma(x + 1.0),
        }
    }

    /// Draw one realisation.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, MathError> {
        use rand_distr::Distribution as _;

        let err = |e: &dyn fmt::Display| MathError::Sampling(e.to_string());
        let value = match *self {
            Distribution::Normal { loc, scale } => {
                Normal::new(loc, scale).map_err(|e| err(&e))?.sample(rng)
            }
            Distribution::LogNormal { loc, scale } => {
                LogNormal::new(loc, scale).map_err(|e| err(&e))?.sample(rng)
            }
            Distribution::LogitNormal { loc, scale } => {
                logistic(Normal::new(loc, scale).map_err(|e| err(&e))?.sample(rng))
            }
            Distribution::Beta { alpha, beta } => {
                Beta::new(alpha, beta).map_err(|e| err(&e))?.sample(rng)
            }
            Distribution::Gamma { shape, rate } => {
                Gamma::new(shape, 1.0 / rate).map_err(|e| err(&e))?.sample(rng)
            }
            Distribution::Exponential { rate } => Exp::new(rate).map_err(|e| err(&e))?.sample(rng),
            Distribution::Bernoulli { probs } => {
                if rng.random_bool(probs) {
                    1.0
                } else {
                    0.0
                }
            }
            Distribution::Binomial { total_count, probs } => {
                Binomial::new(total_count, probs).map_err(|e| err(&e))?.sample(rng) as f64
            }
            Distribution::Poisson { rate } => Poisson::new(rate).map_err(|e| err(&e))?.sample(rng),
        };
        Ok(value)
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Normal { loc, .. } => loc,
            Distribution::LogNormal { loc, scale } => (loc + 0.5 * scale * scale).exp(),
            Distribution::LogitNormal { loc, scale } => logit_normal_moments(loc, scale).0,
            Distribution::Beta { alpha, beta } => alpha / (alpha + beta),
            Distribution::Gamma { shape, rate } => shape / rate,
            Distribution::Exponential { rate } => 1.0 / rate,
            Distribution::Bernoulli { probs } => probs,
            Distribution::Binomial { total_count, probs } => total_count as f64 * probs,
            Distribution::Poisson { rate } => rate,
        }
    }

    pub fn variance(&self) -> f64 {
        match *self {
            Distribution::Normal { scale, .. } => scale * scale,
            Distribution::LogNormal { loc, scale } => {
                let s2 = scale * scale;
                (s2.exp() - 1.0) * (2.0 * loc + s2).exp()
            }
            Distribution::LogitNormal { loc, scale } => logit_normal_moments(loc, scale).1,
            Distribution::Beta { alpha, beta } => {
                let sum = alpha + beta;
                (alpha * beta) / (sum * sum * (sum + 1.0))
            }
            Distribution::Gamma { shape, rate } => shape / (rate * rate),
            Distribution::Exponential { rate } => 1.0 / (rate * rate),
            Distribution::Bernoulli { probs } => probs * (1.0 - probs),
            Distribution::Binomial { total_count, probs } => {
                total_count as f64 * probs * (1.0 - probs)
            }
            Distribution::Poisson { rate } => rate,
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.tag())?;
        for (i, (name, value)) in self.params().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

/// Log density of `Normal(loc, scale)` at `x`.
pub fn normal_ln_pdf(x: f64, loc: f64, scale: f64) -> f64 {
    let z = (x - loc) / scale;
    -0.5 * z * z - scale.ln() - LN_SQRT_2PI
}

/// Mean and variance of a logit-normal by trapezoidal quadrature over the
/// underlying standard normal.
fn logit_normal_moments(loc: f64, scale: f64) -> (f64, f64) {
    let step = 2.0 * QUADRATURE_SPAN / QUADRATURE_POINTS as f64;
    let mut m1 = 0.0;
    let mut m2 = 0.0;
    let mut mass = 0.0;
    for i in 0..=QUADRATURE_POINTS {
        let z = -QUADRATURE_SPAN + i as f64 * step;
        let w = if i == 0 || i == QUADRATURE_POINTS { 0.5 } else { 1.0 };
        let density = w * (-0.5 * z * z).exp();
        let p = logistic(loc + scale * z);
        mass += density;
        m1 += density * p;
        m2 += density * p * p;
    }
    let mean = m1 / mass;
    (mean, (m2 / mass - mean * mean).max(0.0))
}
