//! Errors surfaced by the dispatcher and strategies.

use ix_common::VariableId;
use ix_config::ConfigError;
use thiserror::Error;

use crate::family::FamilyError;
use crate::graph::GraphError;
use crate::state::RunStatus;

/// Errors from validating or running inference.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("unknown variable {id} in approximation spec")]
    UnknownVariable { id: VariableId },

    #[error("invalid observation for {id}: {reason}")]
    InvalidObservation { id: VariableId, reason: String },

    #[error("latent variable {id} has no approximation")]
    MissingApproximation { id: VariableId },

    #[error("invalid family for {id}: {source}")]
    InvalidFamily {
        id: VariableId,
        #[source]
        source: FamilyError,
    },

    #[error("no conjugate update for {id}: {reason}")]
    NoConjugacy { id: VariableId, reason: String },

    #[error("objective is not finite at iteration {iteration}")]
    NonFiniteObjective { iteration: usize },

    #[error("run already terminated with status {status}")]
    Terminated { status: RunStatus },

    #[error("run cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InferenceError {
    pub(crate) fn family(id: &VariableId, source: FamilyError) -> Self {
        InferenceError::InvalidFamily {
            id: id.clone(),
            source,
        }
    }
}

impl From<InferenceError> for ix_common::Error {
    fn from(err: InferenceError) -> Self {
        use ix_common::Error;
        match err {
            InferenceError::UnknownVariable { id } => Error::UnknownVariable { id: id.to_string() },
            InferenceError::InvalidObservation { .. } => Error::InvalidObservation(err.to_string()),
            InferenceError::MissingApproximation { id } => {
                Error::MissingApproximation { id: id.to_string() }
            }
            InferenceError::InvalidFamily { .. } => Error::InvalidFamily(err.to_string()),
            InferenceError::NoConjugacy { .. } => Error::NoConjugacy(err.to_string()),
            InferenceError::NonFiniteObjective { .. } => Error::NumericalInstability(err.to_string()),
            InferenceError::Terminated { .. } | InferenceError::Cancelled { .. } => {
                Error::Inference(err.to_string())
            }
            InferenceError::Graph(GraphError::NotANumber(_)) => {
                Error::NumericalInstability(err.to_string())
            }
            InferenceError::Graph(_) => Error::Model(err.to_string()),
            InferenceError::Config(ConfigError::Invalid(_)) => Error::InvalidConfig(err.to_string()),
            InferenceError::Config(_) => Error::Config(err.to_string()),
        }
    }
}
