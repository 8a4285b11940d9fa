use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    check::{self, CheckArgs},
    generate::{self, GenerateArgs},
    inspect::{self, InspectArgs},
    run::{self, RunArgs},
    soils::{self, SoilsArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "dseq", about = "DART sequence generator and multi-soil run orchestrator")]
struct Cli {
    /// Log filter (e.g. `info`, `debug`, `dseq::engine=debug`); overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the sequence descriptor for a configuration.
    Generate(GenerateArgs),
    /// List soil variants accepted by discovery.
    Soils(SoilsArgs),
    /// Print the group and series shape of a descriptor.
    Inspect(InspectArgs),
    /// Verify the simulation tree before a run.
    Check(CheckArgs),
    /// Generate, then run the engine once per soil variant.
    Run(RunArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    match cli.command {
        Command::Generate(args) => generate::run(&args),
        Command::Soils(args) => soils::run(&args),
        Command::Inspect(args) => inspect::run(&args),
        Command::Check(args) => check::run(&args),
        Command::Run(args) => run::run(&args),
    }
}

fn init_logging(level: Option<&str>) -> Result<(), Box<dyn Error>> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
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
    fn run_accepts_skip_generate() {
        let cli = Cli::parse_from(["dseq", "run", "--config", "config.json", "--skip-generate"]);
        match cli.command {
            Command::Run(args) => assert!(args.skip_generate),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
