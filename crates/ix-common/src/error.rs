//! Error types for inferix.

use thiserror::Error;

/// Result type alias for inferix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for inferix.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("schema version {found} is not compatible with {expected}")]
    SchemaMismatch { expected: String, found: String },

    // Model errors (20-29)
    #[error("unknown variable: {id}")]
    UnknownVariable { id: String },

    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("latent variable {id} has no approximation")]
    MissingApproximation { id: String },

    #[error("model graph error: {0}")]
    Model(String),

    // Inference errors (30-39)
    #[error("invalid approximation family: {0}")]
    InvalidFamily(String),

    #[error("no conjugate update: {0}")]
    NoConjugacy(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::SchemaMismatch { .. } => 12,
            Error::UnknownVariable { .. } => 20,
            Error::InvalidObservation(_) => 21,
            Error::MissingApproximation { .. } => 22,
            Error::Model(_) => 23,
            Error::InvalidFamily(_) => 30,
            Error::NoConjugacy(_) => 31,
            Error::Inference(_) => 32,
            Error::NumericalInstability(_) => 33,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_range() {
        assert_eq!(Error::Config("x".into()).code() / 10, 1);
        assert_eq!(Error::UnknownVariable { id: "z".into() }.code() / 10, 2);
        assert_eq!(Error::NoConjugacy("x".into()).code() / 10, 3);
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), 60);
    }

    #[test]
    fn messages_name_the_variable() {
        let err = Error::MissingApproximation { id: "theta".into() };
        assert_eq!(err.to_string(), "latent variable theta has no approximation");
    }
}
