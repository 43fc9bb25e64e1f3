//! Random-variable identity.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of a random variable in a model graph.
///
/// Identifiers are non-empty and contain no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(String);

impl VariableId {
    /// Create an identifier without validation.
    pub fn new(name: impl Into<String>) -> Self {
        VariableId(name.into())
    }

    /// Parse and validate an identifier string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            None
        } else {
            Some(VariableId(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariableId {
    fn from(name: &str) -> Self {
        VariableId(name.to_string())
    }
}

impl From<String> for VariableId {
    fn from(name: String) -> Self {
        VariableId(name)
    }
}

impl Borrow<str> for VariableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
