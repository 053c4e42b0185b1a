//! Weave CLI Binary
//!
//! Command-line administration of the perspectives registry.

use anyhow::Context;
use clap::Parser;
use std::process;
use weave::logging::init_logging;
use weave::tooling::cli::{Cli, CliContext};

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = cli.resolve_config().context("Error loading configuration")?;
    init_logging(Some(&config.logging)).context("Error initializing logging")?;
    let context = CliContext::new(&config).context("Error opening data directory")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
