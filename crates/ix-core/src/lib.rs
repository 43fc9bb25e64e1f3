//! inferix core: approximate posterior inference over small probabilistic models.
//!
//! A [`ModelGraph`] of scalar random variables, an [`ApproximationSpec`]
//! naming the family fitted to each latent, and [`ObservedData`] for the
//! leaves go into a [`Dispatcher`]. The dispatcher runs one of three
//! strategies and returns an [`InferenceState`]:
//!
//! - variational (MAP and KLqp) via [`inference::Variational`]
//! - Metropolis-within-Gibbs via [`inference::MonteCarlo`]
//! - closed-form conjugate updates via [`inference::Exact`]

pub mod cli;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod family;
pub mod graph;
pub mod inference;
pub mod logging;
pub mod state;

pub use dispatcher::{Dispatcher, InferenceRun};
pub use document::{DocumentError, ModelDocument};
pub use error::InferenceError;
pub use family::{ApproximationFamily, ApproximationSpec, EmpiricalSamples, FamilyError, FamilySpec, FamilyUpdate};
pub use graph::{Assignment, GraphError, ModelGraph, ObservedData, ParamRef, RandomVariableNode};
pub use inference::{InferenceStrategy, Strategy, StrategyKind};
pub use state::{InferenceState, LatentSummary, RunDiagnostics, RunStatus};
