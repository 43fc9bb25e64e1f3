//! Property-based tests for run termination and family invariants.

use ix_config::InferenceConfig;
use ix_core::{
    ApproximationFamily, ApproximationSpec, Dispatcher, FamilySpec, FamilyUpdate, ModelGraph,
    ObservedData, ParamRef, RunStatus, StrategyKind,
};
use ix_math::{Distribution, DistributionTag};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn normal_mean() -> ModelGraph {
    ModelGraph::builder()
        .node("mu", DistributionTag::Normal, [0.0, 1.0])
        .node("y", DistributionTag::Normal, [ParamRef::from("mu"), ParamRef::from(1.0)])
        .build()
        .expect("normal model")
}

fn single(id: &str, spec: FamilySpec) -> ApproximationSpec {
    let mut approximations = ApproximationSpec::new();
    approximations.insert(id.into(), spec);
    approximations
}

fn observe(id: &str, values: Vec<f64>) -> ObservedData {
    let mut observed = ObservedData::new();
    observed.insert(id.into(), values);
    observed
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn monte_carlo_never_exceeds_capacity(
        max_iterations in 1usize..60,
        capacity in 1usize..30,
        seed in any::<u64>(),
        data in prop::collection::vec(-5.0f64..5.0, 1..6),
    ) {
        let config = InferenceConfig::default()
            .with_seed(seed)
            .with_max_iterations(max_iterations)
            .with_sample_capacity(capacity);
        let state = Dispatcher::new(StrategyKind::MonteCarlo)
            .run(&normal_mean(), &single("mu", FamilySpec::Empirical), &observe("y", data), &config)
            .expect("monte carlo run");

        prop_assert_eq!(state.status(), RunStatus::IterationLimitReached);
        prop_assert_eq!(state.iterations(), max_iterations);
        let len = state
            .family(&"mu".into())
            .and_then(ApproximationFamily::as_empirical)
            .map(|s| s.len())
            .expect("empirical family");
        prop_assert_eq!(len, capacity.min(max_iterations));
    }

    #[test]
    fn variational_terminates_within_budget(
        max_iterations in 1usize..40,
        seed in any::<u64>(),
        point in any::<bool>(),
        data in prop::collection::vec(-3.0f64..3.0, 1..5),
    ) {
        let spec = if point {
            FamilySpec::PointMass
        } else {
            FamilySpec::Parametric { family: DistributionTag::Normal }
        };
        let config = InferenceConfig::default()
            .with_seed(seed)
            .with_max_iterations(max_iterations);
        let state = Dispatcher::new(StrategyKind::Variational)
            .run(&normal_mean(), &single("mu", spec), &observe("y", data), &config)
            .expect("variational run");

        prop_assert!(state.status().is_terminal());
        prop_assert!(state.iterations() >= 1 && state.iterations() <= max_iterations);
        prop_assert_eq!(state.converged(), state.status() == RunStatus::Converged);
    }

    #[test]
    fn exact_beta_bernoulli_counts(flips in prop::collection::vec(any::<bool>(), 1..40)) {
        let graph = ModelGraph::builder()
            .node("p", DistributionTag::Beta, [1.0, 1.0])
            .node("x", DistributionTag::Bernoulli, ["p"])
            .build()
            .expect("coin model");
        let values: Vec<f64> = flips.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect();
        let heads = values.iter().sum::<f64>();
        let tails = values.len() as f64 - heads;
        let state = Dispatcher::new(StrategyKind::Exact)
            .run(
                &graph,
                &single("p", FamilySpec::Parametric { family: DistributionTag::Beta }),
                &observe("x", values),
                &InferenceConfig::default().with_seed(0),
            )
            .expect("exact run");

        prop_assert_eq!(
            state.family(&"p".into()).and_then(ApproximationFamily::as_distribution).copied(),
            Some(Distribution::Beta { alpha: 1.0 + heads, beta: 1.0 + tails })
        );
    }

    #[test]
    fn point_mass_sampling_is_idempotent(value in -1e6f64..1e6, seed in any::<u64>()) {
        let mut family = ApproximationFamily::new(FamilySpec::PointMass, 1).expect("point mass");
        family.update(FamilyUpdate::Point(value)).expect("point update");
        let mut rng = StdRng::seed_from_u64(seed);
        let first = family.sample(&mut rng).expect("sample");
        let second = family.sample(&mut rng).expect("sample");
        prop_assert_eq!(first, value);
        prop_assert_eq!(second, value);
    }
}
