// src/cli/commands/run.rs

use anyhow::{Context, Result};
use colored::*;

use crate::{
    cli::RunArgs,
    core::scenario::{run_scenario, Scenario},
    infra::fs::create_scratch_dir,
    reporting::{print_failure_details, print_summary},
};

pub async fn execute(args: RunArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let name = scenario.display_name().to_string();

    println!(
        "{} {}",
        "Loading scenario:".cyan(),
        args.scenario.display()
    );
    println!(
        "{} {}",
        "Original sources:".cyan(),
        scenario.project.source_root.display()
    );

    let scratch = create_scratch_dir(&name, args.workspace.as_deref())?;
    println!("{} {}", "Workspace:".cyan(), scratch.path().display());

    let outcome = run_scenario(&scenario, scratch.path()).await;

    // The workspace is kept even when staging failed.
    let cleanup = if args.keep {
        let kept = scratch.keep();
        println!("{} {}", "Workspace kept at:".yellow(), kept.display());
        Ok(())
    } else {
        scratch.close().context("Failed to remove scratch workspace")
    };
    let results = outcome?;
    cleanup?;

    print_summary(&name, &results);
    print_failure_details(&results);

    if results.iter().any(|r| r.is_failure()) {
        anyhow::bail!("Scenario '{}' failed.", name);
    }

    println!("\n{}", "SCENARIO PASSED SUCCESSFULLY".green().bold());
    Ok(())
}
