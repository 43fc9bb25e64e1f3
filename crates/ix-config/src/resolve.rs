//! Configuration resolution.
//!
//! Order: explicit path (CLI flag) → named preset (CLI flag) → path in
//! `IX_CONFIG` → built-in defaults. The first source that exists wins; a file that exists
//! but fails to parse or validate is an error, never a silent fallback.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::{ConfigError, InferenceConfig};
use crate::preset::{get_preset, PresetName};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "IX_CONFIG";

/// Where the resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigSource {
    File { path: PathBuf },
    Environment { path: PathBuf },
    Preset { name: PresetName },
    Defaults,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub config: InferenceConfig,
    pub source: ConfigSource,
}

/// Resolve against the process environment.
pub fn resolve_config(
    explicit: Option<&Path>,
    preset: Option<PresetName>,
) -> Result<ResolvedConfig, ConfigError> {
    resolve_config_with_env(explicit, preset, |key| std::env::var(key).ok())
}

/// Resolve with an injectable environment lookup.
pub fn resolve_config_with_env<F>(
    explicit: Option<&Path>,
    preset: Option<PresetName>,
    env: F,
) -> Result<ResolvedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config from explicit path");
        return Ok(ResolvedConfig {
            config: InferenceConfig::from_file(path)?,
            source: ConfigSource::File {
                path: path.to_path_buf(),
            },
        });
    }

    if let Some(name) = preset {
        debug!(preset = %name, "using preset config");
        return Ok(ResolvedConfig {
            config: get_preset(name),
            source: ConfigSource::Preset { name },
        });
    }

    if let Some(raw) = env(CONFIG_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        let path = PathBuf::from(raw);
        debug!(path = %path.display(), "loading config from {}", CONFIG_ENV_VAR);
        return Ok(ResolvedConfig {
            config: InferenceConfig::from_file(&path)?,
            source: ConfigSource::Environment { path },
        });
    }

    Ok(ResolvedConfig {
        config: InferenceConfig::default(),
        source: ConfigSource::Defaults,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn falls_back_to_defaults() {
        let resolved = resolve_config_with_env(None, None, no_env).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, InferenceConfig::default());
    }

    #[test]
    fn preset_beats_defaults() {
        let resolved = resolve_config_with_env(None, Some(PresetName::Fast), no_env).unwrap();
        assert_eq!(resolved.config.max_iterations, 200);
    }

    #[test]
    fn preset_beats_env() {
        let resolved = resolve_config_with_env(None, Some(PresetName::Fast), |_| {
            Some("/nonexistent/ix.toml".to_string())
        })
        .unwrap();
        assert_eq!(resolved.config.max_iterations, 200);
        assert_eq!(resolved.source, ConfigSource::Preset { name: PresetName::Fast });
    }

    #[test]
    fn env_beats_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_iterations = 7").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let resolved = resolve_config_with_env(None, None, |key| {
            (key == CONFIG_ENV_VAR).then(|| path.clone())
        })
        .unwrap();
        assert_eq!(resolved.config.max_iterations, 7);
        assert!(matches!(resolved.source, ConfigSource::Environment { .. }));
    }

    #[test]
    fn explicit_beats_env() {
        let mut explicit = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(explicit, "max_iterations = 3").unwrap();
        let resolved = resolve_config_with_env(Some(explicit.path()), None, |_| {
            Some("/nonexistent/ix.toml".to_string())
        })
        .unwrap();
        assert_eq!(resolved.config.max_iterations, 3);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = resolve_config_with_env(Some(Path::new("/nonexistent/ix.toml")), None, no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
