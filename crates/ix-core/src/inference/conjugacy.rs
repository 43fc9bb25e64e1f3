//! Conjugate prior/likelihood pairs.
//!
//! The table is keyed by `(prior tag, likelihood tag)`. Each rule names the
//! likelihood parameter slot the latent must occupy and a closed-form update
//! folding one observed child into the prior. New pairs are added with
//! [`ConjugacyTable::register`] without touching the exact strategy.
//!
//! | Prior  | Likelihood  | Slot          | Posterior                               |
//! |--------|-------------|---------------|-----------------------------------------|
//! | Beta   | Bernoulli   | `probs`       | `Beta(α + Σx, β + n − Σx)`              |
//! | Beta   | Binomial    | `probs`       | `Beta(α + Σx, β + nN − Σx)`             |
//! | Gamma  | Poisson     | `rate`        | `Gamma(a + Σx, b + n)`                  |
//! | Gamma  | Exponential | `rate`        | `Gamma(a + n, b + Σx)`                  |
//! | Normal | Normal      | `loc`         | precision-weighted mean, known scale    |

use std::collections::HashMap;
use std::fmt;

use ix_common::VariableId;
use ix_math::{Distribution, DistributionTag};

/// One observed child of the latent being updated.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodSite<'a> {
    pub child: &'a VariableId,
    /// Likelihood parameters; the conjugate slot is `None`, every other slot
    /// holds its literal value.
    pub params: &'a [Option<f64>],
    pub observations: &'a [f64],
}

impl LikelihoodSite<'_> {
    /// Literal value of a non-conjugate parameter.
    pub fn param(&self, index: usize) -> Option<f64> {
        self.params.get(index).copied().flatten()
    }

    fn sum(&self) -> f64 {
        self.observations.iter().sum()
    }

    fn count(&self) -> f64 {
        self.observations.len() as f64
    }
}

/// Closed-form posterior update. Returns `None` when the prior is not the
/// variant the rule was registered for or a required literal is missing.
pub type UpdateFn = fn(&Distribution, &LikelihoodSite<'_>) -> Option<Distribution>;

#[derive(Clone, Copy)]
pub struct ConjugateRule {
    /// Likelihood parameter index that must reference the latent.
    pub slot: usize,
    pub update: UpdateFn,
}

impl fmt::Debug for ConjugateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConjugateRule").field("slot", &self.slot).finish()
    }
}

/// Lookup table of recognised conjugate pairs.
#[derive(Debug, Clone)]
pub struct ConjugacyTable {
    rules: HashMap<(DistributionTag, DistributionTag), ConjugateRule>,
}

impl Default for ConjugacyTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ConjugacyTable {
    /// An empty table; every lookup misses.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The built-in pairs listed in the module docs.
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        table.register(DistributionTag::Beta, DistributionTag::Bernoulli, 0, beta_bernoulli);
        table.register(DistributionTag::Beta, DistributionTag::Binomial, 1, beta_binomial);
        table.register(DistributionTag::Gamma, DistributionTag::Poisson, 0, gamma_poisson);
        table.register(DistributionTag::Gamma, DistributionTag::Exponential, 0, gamma_exponential);
        table.register(DistributionTag::Normal, DistributionTag::Normal, 0, normal_normal);
        table
    }

    /// Add or replace the rule for a pair.
    pub fn register(
        &mut self,
        prior: DistributionTag,
        likelihood: DistributionTag,
        slot: usize,
        update: UpdateFn,
    ) {
        self.rules.insert((prior, likelihood), ConjugateRule { slot, update });
    }

    pub fn lookup(&self, prior: DistributionTag, likelihood: DistributionTag) -> Option<&ConjugateRule> {
        self.rules.get(&(prior, likelihood))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn beta_bernoulli(prior: &Distribution, site: &LikelihoodSite<'_>) -> Option<Distribution> {
    let Distribution::Beta { alpha, beta } = *prior else {
        return None;
    };
    let successes = site.sum();
    Some(Distribution::Beta {
        alpha: alpha + successes,
        beta: beta + site.count() - successes,
    })
}

fn beta_binomial(prior: &Distribution, site: &LikelihoodSite<'_>) -> Option<Distribution> {
    let Distribution::Beta { alpha, beta } = *prior else {
        return None;
    };
    let trials = site.param(0)?;
    let successes = site.sum();
    Some(Distribution::Beta {
        alpha: alpha + successes,
        beta: beta + site.count() * trials - successes,
    })
}

fn gamma_poisson(prior: &Distribution, site: &LikelihoodSite<'_>) -> Option<Distribution> {
    let Distribution::Gamma { shape, rate } = *prior else {
        return None;
    };
    Some(Distribution::Gamma {
        shape: shape + site.sum(),
        rate: rate + site.count(),
    })
}

fn gamma_exponential(prior: &Distribution, site: &LikelihoodSite<'_>) -> Option<Distribution> {
    let Distribution::Gamma { shape, rate } = *prior else {
        return None;
    };
    Some(Distribution::Gamma {
        shape: shape + site.count(),
        rate: rate + site.sum(),
    })
}

fn normal_normal(prior: &Distribution, site: &LikelihoodSite<'_>) -> Option<Distribution> {
    let Distribution::Normal { loc, scale } = *prior else {
        return None;
    };
    let noise = site.param(1)?;
    let prior_precision = 1.0 / (scale * scale);
    let data_precision = site.count() / (noise * noise);
    let precision = prior_precision + data_precision;
    let mean = (loc * prior_precision + site.sum() / (noise * noise)) / precision;
    Some(Distribution::Normal {
        loc: mean,
        scale: precision.sqrt().recip(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site<'a>(child: &'a VariableId, params: &'a [Option<f64>], obs: &'a [f64]) -> LikelihoodSite<'a> {
        LikelihoodSite {
            child,
            params,
            observations: obs,
        }
    }

    #[test]
    fn default_table_has_five_pairs() {
        let table = ConjugacyTable::with_defaults();
        assert_eq!(table.len(), 5);
        assert!(table
            .lookup(DistributionTag::Beta, DistributionTag::Bernoulli)
            .is_some());
        assert!(table
            .lookup(DistributionTag::Normal, DistributionTag::Poisson)
            .is_none());
        assert!(ConjugacyTable::empty().is_empty());
    }

    #[test]
    fn beta_bernoulli_counts_successes() {
        let child = VariableId::from("x");
        let obs = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let params = [None];
        let post = beta_bernoulli(
            &Distribution::Beta { alpha: 1.0, beta: 1.0 },
            &site(&child, &params, &obs),
        )
        .unwrap();
        assert_eq!(post, Distribution::Beta { alpha: 3.0, beta: 9.0 });
    }

    #[test]
    fn beta_binomial_uses_trial_count() {
        let child = VariableId::from("k");
        let params = [Some(4.0), None];
        let post = beta_binomial(
            &Distribution::Beta { alpha: 2.0, beta: 2.0 },
            &site(&child, &params, &[1.0, 3.0]),
        )
        .unwrap();
        assert_eq!(post, Distribution::Beta { alpha: 6.0, beta: 6.0 });
    }

    #[test]
    fn gamma_updates() {
        let child = VariableId::from("n");
        let params = [None];
        let poisson = gamma_poisson(
            &Distribution::Gamma { shape: 2.0, rate: 1.0 },
            &site(&child, &params, &[3.0, 1.0, 4.0]),
        )
        .unwrap();
        assert_eq!(poisson, Distribution::Gamma { shape: 10.0, rate: 4.0 });

        let exponential = gamma_exponential(
            &Distribution::Gamma { shape: 1.0, rate: 1.0 },
            &site(&child, &params, &[0.5, 1.5]),
        )
        .unwrap();
        assert_eq!(exponential, Distribution::Gamma { shape: 3.0, rate: 3.0 });
    }

    #[test]
    fn normal_normal_precision_weighting() {
        let child = VariableId::from("y");
        let params = [None, Some(1.0)];
        let post = normal_normal(
            &Distribution::Normal { loc: 0.0, scale: 1.0 },
            &site(&child, &params, &[1.0, 2.0, 3.0]),
        )
        .unwrap();
        let Distribution::Normal { loc, scale } = post else {
            panic!("expected normal posterior");
        };
        assert!((loc - 1.5).abs() < 1e-12);
        assert!((scale - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rule_rejects_wrong_prior_variant() {
        let child = VariableId::from("x");
        let params = [None];
        assert!(beta_bernoulli(
            &Distribution::Gamma { shape: 1.0, rate: 1.0 },
            &site(&child, &params, &[1.0])
        )
        .is_none());
    }

    #[test]
    fn register_extends_table() {
        fn keep_prior(prior: &Distribution, _: &LikelihoodSite<'_>) -> Option<Distribution> {
            Some(*prior)
        }
        let mut table = ConjugacyTable::empty();
        table.register(DistributionTag::LogNormal, DistributionTag::Poisson, 0, keep_prior);
        let rule = table
            .lookup(DistributionTag::LogNormal, DistributionTag::Poisson)
            .unwrap();
        assert_eq!(rule.slot, 0);
    }
}
