//! `ix` command-line entry point.

use clap::Parser;
use ix_core::cli::{execute, Cli};
use ix_core::logging::{init_logging, LogOptions};

fn main() {
    let cli = Cli::parse();
    init_logging(LogOptions::from_verbosity(cli.verbose, cli.quiet, cli.log_json));
    let code = execute(&cli);
    std::process::exit(code.as_i32());
}
