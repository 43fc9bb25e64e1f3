//! Named run budgets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, InferenceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    /// Short runs for smoke tests and interactive exploration.
    Fast,
    /// The built-in defaults.
    Default,
    /// Long chains, more variational draws, smaller steps.
    Thorough,
}

impl PresetName {
    pub const ALL: [PresetName; 3] = [PresetName::Fast, PresetName::Default, PresetName::Thorough];

    pub fn as_str(self) -> &'static str {
        match self {
            PresetName::Fast => "fast",
            PresetName::Default => "default",
            PresetName::Thorough => "thorough",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

/// Listing entry for `ix config presets`.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: &'static str,
}

pub fn get_preset(name: PresetName) -> InferenceConfig {
    let base = InferenceConfig::default();
    match name {
        PresetName::Fast => InferenceConfig {
            max_iterations: 200,
            sample_capacity: 200,
            vi_samples: 4,
            tolerance: 1e-4,
            ..base
        },
        PresetName::Default => base,
        PresetName::Thorough => InferenceConfig {
            max_iterations: 5000,
            sample_capacity: 5000,
            vi_samples: 16,
            learning_rate: 0.02,
            tolerance: 1e-8,
            ..base
        },
    }
}

pub fn list_presets() -> Vec<PresetInfo> {
    vec![
        PresetInfo {
            name: PresetName::Fast,
            description: "200 iterations, 4 variational draws",
        },
        PresetInfo {
            name: PresetName::Default,
            description: "1000 iterations, 8 variational draws",
        },
        PresetInfo {
            name: PresetName::Thorough,
            description: "5000 iterations, 16 variational draws, learning rate 0.02",
        },
    ]
}
