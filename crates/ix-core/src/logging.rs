//! Tracing subscriber setup for the `ix` binary.
//!
//! Logs go to stderr so stdout stays reserved for results. The filter comes
//! from `IX_LOG`, then `RUST_LOG`, then the level implied by `-v`/`-q`.

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive for `ix`.
pub const LOG_ENV_VAR: &str = "IX_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub level: Level,
    /// One JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            json: false,
        }
    }
}

impl LogOptions {
    /// Level from repeated `-v` flags, silenced by `-q`.
    pub fn from_verbosity(verbose: u8, quiet: bool, json: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::INFO,
            (false, 2) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };
        Self { level, json }
    }
}

fn filter(options: &LogOptions) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(options.level.as_str()))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(options: LogOptions) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter(&options))
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed, e.g. by a test harness.
    let _ = if options.json {
        tracing::subscriber::set_global_default(builder.json().with_current_span(false).finish())
    } else {
        tracing::subscriber::set_global_default(builder.with_target(false).finish())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogOptions::from_verbosity(0, false, false).level, Level::WARN);
        assert_eq!(LogOptions::from_verbosity(1, false, false).level, Level::INFO);
        assert_eq!(LogOptions::from_verbosity(5, false, true).level, Level::TRACE);
        assert_eq!(LogOptions::from_verbosity(3, true, false).level, Level::ERROR);
    }
}
