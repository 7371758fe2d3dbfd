// src/cli/commands/check.rs

use anyhow::Result;
use colored::*;
use indexmap::IndexSet;

use crate::{
    cli::CheckArgs,
    core::{scenario::Scenario, unit::Unit},
};

/// Validates a scenario file: it must parse, name a compiler command, and
/// every unit it references must have an original source.
pub fn execute(args: CheckArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let problems = find_problems(&scenario);

    if problems.is_empty() {
        println!(
            "{} {} ({} steps)",
            "Scenario OK:".green().bold(),
            scenario.display_name(),
            scenario.steps.len()
        );
        return Ok(());
    }

    for problem in &problems {
        println!("  - {}", problem.red());
    }
    anyhow::bail!(
        "Scenario '{}' has {} problem(s).",
        scenario.display_name(),
        problems.len()
    );
}

pub fn find_problems(scenario: &Scenario) -> Vec<String> {
    let project = &scenario.project;
    let mut problems = Vec::new();

    if project.compiler.command.is_empty() {
        problems.push("no compiler command configured".to_string());
    }
    if !project.source_root.is_dir() {
        problems.push(format!(
            "source root does not exist: {}",
            project.source_root.display()
        ));
    }
    if let Some(seed) = &project.classpath_seed {
        if !seed.is_dir() {
            problems.push(format!("class path seed does not exist: {}", seed.display()));
        }
    }

    let mut units: IndexSet<&Unit> = project.always_include.iter().collect();
    units.extend(scenario.units.iter());
    units.extend(scenario.steps.iter().flat_map(|step| step.referenced_units()));

    for unit in units {
        let original = project.original_source_file(unit);
        if !original.is_file() {
            problems.push(format!(
                "original source for '{}' not found: {}",
                unit,
                original.display()
            ));
        }
    }
    problems
}
