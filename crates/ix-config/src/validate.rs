//! Semantic validation for [`InferenceConfig`].

use std::fmt;

use serde::Serialize;

use crate::config::InferenceConfig;

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every field, returning all violations (empty when valid).
pub fn validate_config(config: &InferenceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: String| {
        errors.push(ValidationError { field, message });
    };

    if config.max_iterations == 0 {
        fail("max_iterations", "must be at least 1".into());
    }
    if !config.tolerance.is_finite() || config.tolerance < 0.0 {
        fail("tolerance", format!("must be finite and >= 0, got {}", config.tolerance));
    }
    if config.sample_capacity == 0 {
        fail("sample_capacity", "must be at least 1".into());
    }
    if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
        fail(
            "learning_rate",
            format!("must be finite and > 0, got {}", config.learning_rate),
        );
    }
    if config.vi_samples == 0 {
        fail("vi_samples", "must be at least 1".into());
    }
    if !config.proposal_scale.is_finite() || config.proposal_scale <= 0.0 {
        fail(
            "proposal_scale",
            format!("must be finite and > 0, got {}", config.proposal_scale),
        );
    }

    errors
}
