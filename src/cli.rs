// src/cli.rs
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Debug, Parser)]
#[command(
    name = "stage-runner",
    version,
    about = "Stage sample sources, compile them with a metadata processor, and replay incremental-build scenarios."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scenario file against a freshly staged workspace.
    Run(RunArgs),
    /// Validate a scenario file without compiling anything.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the scenario file.
    #[arg(short, long, value_name = "SCENARIO", default_value = "Scenario.toml")]
    pub scenario: PathBuf,

    /// Directory to create the scratch workspace in. Defaults to the system temp dir.
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Keep the scratch workspace after the run.
    #[arg(long)]
    pub keep: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Path to the scenario file.
    #[arg(short, long, value_name = "SCENARIO", default_value = "Scenario.toml")]
    pub scenario: PathBuf,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => commands::run::execute(args).await,
        Command::Check(args) => commands::check::execute(args),
    }
}
