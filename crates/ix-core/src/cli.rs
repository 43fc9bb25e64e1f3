//! Command-line interface for `ix`.
//!
//! Commands print a JSON envelope (`--format json`) or a short text summary
//! and report their outcome through [`ExitCode`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{ArgAction, Args, Parser, Subcommand};
use ix_common::{OutputFormat, SCHEMA_VERSION};
use ix_config::{list_presets, resolve_config, ConfigSource, PresetName, ResolvedConfig};
use serde_json::json;
use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::document::ModelDocument;
use crate::error::InferenceError;
use crate::exit_codes::ExitCode;
use crate::inference::StrategyKind;
use crate::state::{InferenceState, RunStatus};

#[derive(Parser, Debug)]
#[command(name = "ix", version, about = "Approximate posterior inference for small probabilistic models")]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Increase log verbosity (repeatable)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run inference on a model document
    Run(RunArgs),
    /// Check a model document without running inference
    Validate(ValidateArgs),
    /// Inspect run configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ConfigSelection {
    /// Config file (.toml or .json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named preset (fast, default, thorough); used when no file is given and
    /// overrides $IX_CONFIG
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,
}

impl ConfigSelection {
    fn resolve(&self) -> Result<ResolvedConfig, ix_common::Error> {
        let preset = self
            .preset
            .as_deref()
            .map(PresetName::from_str)
            .transpose()
            .map_err(InferenceError::from)?;
        resolve_config(self.config.as_deref(), preset).map_err(|e| InferenceError::from(e).into())
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Model document (JSON)
    #[arg(long, short = 'm', value_name = "FILE")]
    pub model: PathBuf,

    /// Inference strategy
    #[arg(long, short = 's', value_enum, default_value_t = StrategyKind::Variational)]
    pub strategy: StrategyKind,

    #[command(flatten)]
    pub config: ConfigSelection,

    /// RNG seed, overriding the config
    #[arg(long)]
    pub seed: Option<u64>,

    /// Iteration budget, overriding the config
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Model document (JSON)
    #[arg(long, short = 'm', value_name = "FILE")]
    pub model: PathBuf,

    /// Also check that the families suit this strategy
    #[arg(long, short = 's', value_enum)]
    pub strategy: Option<StrategyKind>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the configuration a run would use
    Show(ConfigSelection),
    /// List the named presets
    Presets,
}

/// Dispatch a parsed command line.
pub fn execute(cli: &Cli) -> ExitCode {
    let format = cli.format;
    let outcome = match &cli.command {
        Commands::Run(args) => run_inference(format, args),
        Commands::Validate(args) => run_validate(format, args),
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show(selection) => run_config_show(format, selection),
            ConfigCommands::Presets => run_config_presets(format),
        },
    };
    match outcome {
        Ok(code) => code,
        Err(err) => report_error(format, command_name(&cli.command), &err),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run(_) => "run",
        Commands::Validate(_) => "validate",
        Commands::Config(args) => match args.command {
            ConfigCommands::Show(_) => "config show",
            ConfigCommands::Presets => "config presets",
        },
    }
}

fn report_error(format: OutputFormat, command: &str, err: &ix_common::Error) -> ExitCode {
    let code = ExitCode::for_error(err);
    match format {
        OutputFormat::Json => {
            let output = json!({
                "schema_version": SCHEMA_VERSION,
                "command": command,
                "status": "error",
                "error": {
                    "code": err.code(),
                    "message": err.to_string(),
                },
            });
            print_json(&output);
        }
        OutputFormat::Summary => eprintln!("ix {command}: {err}"),
    }
    code
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to render JSON output: {e}"),
    }
}

fn load_document(path: &Path) -> Result<ModelDocument, ix_common::Error> {
    debug!(path = %path.display(), "loading model document");
    Ok(ModelDocument::from_path(path)?)
}

fn run_inference(format: OutputFormat, args: &RunArgs) -> Result<ExitCode, ix_common::Error> {
    let resolved = args.config.resolve()?;
    let mut config = resolved.config;
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(max_iterations) = args.max_iterations {
        config = config.with_max_iterations(max_iterations);
    }

    let doc = load_document(&args.model)?;
    let graph = doc.graph()?;
    let state = Dispatcher::new(args.strategy).run(
        &graph,
        &doc.approximations,
        &doc.observations,
        &config,
    )?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "schema_version": SCHEMA_VERSION,
                "command": "run",
                "model": args.model.display().to_string(),
                "config_source": resolved.source,
                "seed": config.seed,
                "strategy": state.strategy(),
                "status": state.status(),
                "converged": state.converged(),
                "iterations": state.iterations(),
                "diagnostics": state.diagnostics(),
                "latents": state.summary(),
                "families": state.families(),
            });
            print_json(&output);
        }
        OutputFormat::Summary => print_state(&state),
    }

    Ok(match state.status() {
        RunStatus::Converged => ExitCode::Clean,
        RunStatus::IterationLimitReached => ExitCode::IterationLimit,
        _ => ExitCode::InternalError,
    })
}

fn print_state(state: &InferenceState) {
    println!(
        "# {} inference: {} after {} iteration(s)",
        state.strategy(),
        state.status(),
        state.iterations()
    );
    if let Some(objective) = state.diagnostics().objective {
        println!("  objective: {objective:.6}");
    }
    if let Some(rate) = state.diagnostics().acceptance_rate {
        println!("  acceptance rate: {rate:.3}");
    }
    println!();
    for (row, family) in state.summary().iter().zip(state.families().values()) {
        let detail = match family.as_distribution() {
            Some(dist) => dist.to_string(),
            None => row.family.clone(),
        };
        let mean = row.mean.map_or_else(|| "-".to_string(), |m| format!("{m:.4}"));
        let sd = row.std_dev.map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        print!("  {:<12} {:<32} mean={mean:<10} sd={sd}", row.id.as_str(), detail);
        match row.samples {
            Some(n) => println!("  samples={n}"),
            None => println!(),
        }
    }
}

fn run_validate(format: OutputFormat, args: &ValidateArgs) -> Result<ExitCode, ix_common::Error> {
    let doc = load_document(&args.model)?;
    let graph = doc.graph()?;
    let config = ix_config::InferenceConfig::default();
    match args.strategy {
        Some(kind) => {
            Dispatcher::new(kind).start(&graph, &doc.approximations, &doc.observations, &config)?;
        }
        None => {
            Dispatcher::validate(&graph, &doc.approximations, &doc.observations, &config)?;
        }
    }

    let latents = graph.len() - doc.observations.len();
    match format {
        OutputFormat::Json => {
            let output = json!({
                "schema_version": SCHEMA_VERSION,
                "command": "validate",
                "status": "valid",
                "model": args.model.display().to_string(),
                "strategy": args.strategy,
                "variables": graph.len(),
                "latents": latents,
                "observed": doc.observations.len(),
            });
            print_json(&output);
        }
        OutputFormat::Summary => {
            println!("Model is valid");
            println!("  Path: {}", args.model.display());
            println!("  Variables: {} ({} latent, {} observed)", graph.len(), latents, doc.observations.len());
            if let Some(kind) = args.strategy {
                println!("  Families suit {kind} inference");
            }
        }
    }
    Ok(ExitCode::Clean)
}

fn run_config_show(
    format: OutputFormat,
    selection: &ConfigSelection,
) -> Result<ExitCode, ix_common::Error> {
    let resolved = selection.resolve()?;
    match format {
        OutputFormat::Json => {
            let output = json!({
                "schema_version": SCHEMA_VERSION,
                "command": "config show",
                "source": resolved.source,
                "config": resolved.config,
            });
            print_json(&output);
        }
        OutputFormat::Summary => {
            let source = match &resolved.source {
                ConfigSource::File { path } => format!("file {}", path.display()),
                ConfigSource::Environment { path } => format!("$IX_CONFIG {}", path.display()),
                ConfigSource::Preset { name } => format!("preset {name}"),
                ConfigSource::Defaults => "built-in defaults".to_string(),
            };
            println!("# source: {source}");
            let text = toml::to_string_pretty(&resolved.config)
                .map_err(|e| ix_common::Error::Config(e.to_string()))?;
            print!("{text}");
        }
    }
    Ok(ExitCode::Clean)
}

fn run_config_presets(format: OutputFormat) -> Result<ExitCode, ix_common::Error> {
    let presets = list_presets();
    match format {
        OutputFormat::Json => {
            let output = json!({
                "schema_version": SCHEMA_VERSION,
                "command": "config presets",
                "presets": presets,
            });
            print_json(&output);
        }
        OutputFormat::Summary => {
            for preset in presets {
                println!("  {:<10} {}", preset.name, preset.description);
            }
        }
    }
    Ok(ExitCode::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "ix",
            "run",
            "--model",
            "m.json",
            "--strategy",
            "monte-carlo",
            "--preset",
            "fast",
            "--seed",
            "3",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.strategy, StrategyKind::MonteCarlo);
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.config.preset.as_deref(), Some("fast"));
    }

    #[test]
    fn unknown_preset_is_a_config_error() {
        let selection = ConfigSelection {
            config: None,
            preset: Some("turbo".into()),
        };
        let err = selection.resolve().unwrap_err();
        assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
    }
}
