//! Exit codes for the `ix` CLI.
//!
//! Scripts can branch on the outcome of a run without parsing its output.
//! The values are stable.

use ix_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run converged, or a non-run command succeeded
    Clean = 0,

    /// Run stopped at `max_iterations` without converging
    IterationLimit = 1,

    /// Configuration could not be loaded or is invalid
    ConfigError = 10,

    /// Model document, graph, or run inputs rejected
    ModelError = 11,

    /// A strategy failed during the run
    InferenceError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Exit code for a workspace error, keyed on its stable code.
    pub fn for_error(err: &Error) -> Self {
        match err.code() {
            10..=12 => ExitCode::ConfigError,
            20..=23 | 61 => ExitCode::ModelError,
            30..=33 => ExitCode::InferenceError,
            60 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_outcomes_are_not_errors() {
        assert!(!ExitCode::Clean.is_error());
        assert!(!ExitCode::IterationLimit.is_error());
        assert!(ExitCode::ModelError.is_error());
        assert_eq!(i32::from(ExitCode::InternalError), 99);
    }

    #[test]
    fn error_codes_map_to_exit_codes() {
        let cases = [
            (Error::Config("x".into()), ExitCode::ConfigError),
            (
                Error::UnknownVariable { id: "z".into() },
                ExitCode::ModelError,
            ),
            (Error::NoConjugacy("x".into()), ExitCode::InferenceError),
            (
                Error::Io(std::io::Error::other("disk")),
                ExitCode::IoError,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ExitCode::for_error(&err), expected, "{err}");
        }
    }
}
