//! Run status and the inference result.

use std::collections::BTreeMap;
use std::fmt;

use ix_common::VariableId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::family::ApproximationFamily;
use crate::inference::StrategyKind;

/// Lifecycle of a run.
///
/// ```text
/// Initialized ──▶ Running ──▶ Converged
///                    │    ──▶ IterationLimitReached
///                    └──────▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Initialized,
    Running,
    Converged,
    IterationLimitReached,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Converged | RunStatus::IterationLimitReached | RunStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Initialized => "initialized",
            RunStatus::Running => "running",
            RunStatus::Converged => "converged",
            RunStatus::IterationLimitReached => "iteration_limit_reached",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy-specific numbers recorded during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Latest variational objective (negative ELBO, or negative log joint for MAP).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    /// Fraction of accepted Metropolis proposals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_rate: Option<f64>,
}

/// Result of a run: one family per latent plus progress counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceState {
    strategy: StrategyKind,
    families: BTreeMap<VariableId, ApproximationFamily>,
    iterations: usize,
    converged: bool,
    status: RunStatus,
    diagnostics: RunDiagnostics,
}

impl InferenceState {
    pub(crate) fn new(
        strategy: StrategyKind,
        families: BTreeMap<VariableId, ApproximationFamily>,
    ) -> Self {
        Self {
            strategy,
            families,
            iterations: 0,
            converged: false,
            status: RunStatus::Initialized,
            diagnostics: RunDiagnostics::default(),
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn family(&self, id: &VariableId) -> Option<&ApproximationFamily> {
        self.families.get(id)
    }

    pub fn families(&self) -> &BTreeMap<VariableId, ApproximationFamily> {
        &self.families
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    /// Draw one value from the approximation of `id`.
    pub fn sample<R: Rng + ?Sized>(&self, id: &VariableId, rng: &mut R) -> Result<f64, InferenceError> {
        let family = self
            .families
            .get(id)
            .ok_or_else(|| InferenceError::UnknownVariable { id: id.clone() })?;
        family
            .sample(rng)
            .map_err(|source| InferenceError::family(id, source))
    }

    /// Per-latent mean and standard deviation.
    pub fn summary(&self) -> Vec<LatentSummary> {
        self.families
            .iter()
            .map(|(id, family)| LatentSummary {
                id: id.clone(),
                family: family.describe(),
                mean: family.mean(),
                std_dev: family.variance().map(f64::sqrt),
                samples: family.as_empirical().map(|s| s.len()),
            })
            .collect()
    }

    pub(crate) fn family_mut(&mut self, id: &VariableId) -> Option<&mut ApproximationFamily> {
        self.families.get_mut(id)
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut RunDiagnostics {
        &mut self.diagnostics
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.converged = status == RunStatus::Converged;
    }

    pub(crate) fn record_iteration(&mut self) {
        self.iterations += 1;
    }
}

/// One row of [`InferenceState::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatentSummary {
    pub id: VariableId,
    pub family: String,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilySpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state() -> InferenceState {
        let mut families = BTreeMap::new();
        families.insert(
            VariableId::from("mu"),
            ApproximationFamily::PointMass { value: 1.5 },
        );
        families.insert(
            VariableId::from("z"),
            ApproximationFamily::new(FamilySpec::Empirical, 4).unwrap(),
        );
        InferenceState::new(StrategyKind::Variational, families)
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Initialized.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Converged.is_terminal());
        assert!(RunStatus::IterationLimitReached.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn converged_flag_follows_status() {
        let mut s = state();
        s.set_status(RunStatus::Running);
        assert!(!s.converged());
        s.set_status(RunStatus::Converged);
        assert!(s.converged());
        s.set_status(RunStatus::IterationLimitReached);
        assert!(!s.converged());
    }

    #[test]
    fn sample_accessor_reports_errors() {
        let s = state();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(s.sample(&"mu".into(), &mut rng).unwrap(), 1.5);
        assert!(matches!(
            s.sample(&"nope".into(), &mut rng),
            Err(InferenceError::UnknownVariable { .. })
        ));
        assert!(matches!(
            s.sample(&"z".into(), &mut rng),
            Err(InferenceError::InvalidFamily { .. })
        ));
    }

    #[test]
    fn summary_has_one_row_per_latent() {
        let rows = state().summary();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_str(), "mu");
        assert_eq!(rows[0].std_dev, Some(0.0));
        assert_eq!(rows[1].samples, Some(0));
        assert_eq!(rows[1].mean, None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&RunStatus::IterationLimitReached).unwrap();
        assert_eq!(json, "\"iteration_limit_reached\"");
    }
}
