//! Run configuration shared by all inference strategies.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::{validate_config, ValidationError};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported config extension for {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("{}", format_validation(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("invalid configuration: {}", parts.join("; "))
}

/// Options recognised by the dispatcher and its strategies.
///
/// Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Upper bound on update steps per run.
    pub max_iterations: usize,
    /// Variational runs stop once the objective moves less than this.
    pub tolerance: f64,
    /// Capacity T of every empirical (sample-set) approximation.
    pub sample_capacity: usize,
    /// RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Adam step size for variational runs.
    pub learning_rate: f64,
    /// Reparameterised draws per variational objective estimate.
    pub vi_samples: usize,
    /// Standard deviation of the random-walk proposal for Monte Carlo runs.
    pub proposal_scale: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            sample_capacity: 1000,
            seed: None,
            learning_rate: 0.05,
            vi_samples: 8,
            proposal_scale: 0.5,
        }
    }
}

impl InferenceConfig {
    /// Load from a `.toml` or `.json` file and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: InferenceConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints, collecting every violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = validate_config(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_sample_capacity(mut self, sample_capacity: usize) -> Self {
        self.sample_capacity = sample_capacity;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}
