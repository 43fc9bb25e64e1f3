//! Output format selection shared by the CLI commands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How results are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Machine-readable JSON document.
    Json,
    /// One line per latent variable.
    #[default]
    Summary,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}
