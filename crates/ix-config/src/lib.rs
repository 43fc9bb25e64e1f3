//! inferix configuration loading and validation.
//!
//! This crate provides:
//! - The typed [`InferenceConfig`] recognised by every inference strategy
//! - Config resolution (explicit path → `IX_CONFIG` env → preset/defaults)
//! - Semantic validation with per-field messages
//! - Named presets for common run budgets

pub mod config;
pub mod preset;
pub mod resolve;
pub mod validate;

pub use config::{ConfigError, InferenceConfig};
pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use resolve::{resolve_config, resolve_config_with_env, ConfigSource, ResolvedConfig, CONFIG_ENV_VAR};
pub use validate::{validate_config, ValidationError};
