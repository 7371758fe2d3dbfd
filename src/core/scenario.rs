//! # Scenario Module / 场景模块
//!
//! A scenario is a TOML script that drives a [`TestProject`] through a
//! sequence of edits and builds, asserting on the metadata each build
//! returns. Steps run in order and the run stops at the first failure.
//!
//! 场景是一个 TOML 脚本，它驱动 [`TestProject`] 执行一系列编辑和构建，
//! 并对每次构建返回的元数据进行断言。步骤按顺序执行，遇到第一个失败时停止。

use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::compiler::Compiler;
use crate::core::config::ProjectConfig;
use crate::core::metadata::Metadata;
use crate::core::project::TestProject;
use crate::core::unit::Unit;

/// A scenario file: the project to stage, the initial units and the steps.
/// 场景文件：要暂存的项目、初始单元和步骤。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub project: ProjectConfig,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One action against the project, tagged by `action` in the scenario file.
/// 针对项目的一个动作，在场景文件中以 `action` 标记。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    FullBuild {
        #[serde(default)]
        expect_items: Vec<String>,
        #[serde(default)]
        expect_absent: Vec<String>,
    },
    IncrementalBuild {
        units: Vec<Unit>,
        #[serde(default)]
        expect_items: Vec<String>,
        #[serde(default)]
        expect_absent: Vec<String>,
    },
    Add {
        unit: Unit,
    },
    Delete {
        unit: Unit,
    },
    Revert {
        unit: Unit,
    },
    ReplaceText {
        unit: Unit,
        find: String,
        replace: String,
    },
    /// Exactly one of `snippet` and `snippet_file` must be set.
    AddSourceCode {
        unit: Unit,
        #[serde(default)]
        snippet: Option<String>,
        #[serde(default)]
        snippet_file: Option<PathBuf>,
    },
    /// Checks whether a file exists beneath the output directory.
    ExpectOutput {
        path: PathBuf,
        #[serde(default = "default_exists")]
        exists: bool,
    },
}

fn default_exists() -> bool {
    true
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::FullBuild { .. } => write!(f, "full-build"),
            Step::IncrementalBuild { units, .. } => {
                let names: Vec<&str> = units.iter().map(Unit::name).collect();
                write!(f, "incremental-build [{}]", names.join(", "))
            }
            Step::Add { unit } => write!(f, "add {}", unit),
            Step::Delete { unit } => write!(f, "delete {}", unit),
            Step::Revert { unit } => write!(f, "revert {}", unit),
            Step::ReplaceText { unit, find, replace } => {
                write!(f, "replace-text {} '{}' -> '{}'", unit, find, replace)
            }
            Step::AddSourceCode { unit, .. } => write!(f, "add-source-code {}", unit),
            Step::ExpectOutput { path, exists } => {
                let verb = if *exists { "exists" } else { "absent" };
                write!(f, "expect-output {} {}", path.display(), verb)
            }
        }
    }
}

impl Step {
    /// Units whose originals this step needs.
    pub fn referenced_units(&self) -> Vec<&Unit> {
        match self {
            Step::FullBuild { .. } | Step::ExpectOutput { .. } => Vec::new(),
            Step::IncrementalBuild { units, .. } => units.iter().collect(),
            Step::Add { unit }
            | Step::Delete { unit }
            | Step::Revert { unit }
            | Step::ReplaceText { unit, .. }
            | Step::AddSourceCode { unit, .. } => vec![unit],
        }
    }
}

impl Scenario {
    /// Loads a scenario file. Project paths and snippet files are resolved
    /// against the scenario's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        let scenario: Scenario = toml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(scenario.resolve_paths(base))
    }

    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.project = self.project.resolve_paths(base);
        for step in &mut self.steps {
            if let Step::AddSourceCode {
                snippet_file: Some(file),
                ..
            } = step
            {
                *file = base.join(&*file);
            }
        }
        self
    }

    /// Display name: the explicit name, or "scenario".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("scenario")
    }
}

/// The outcome of a single scenario step.
/// 单个场景步骤的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Passed {
        step: String,
        duration: Duration,
        /// Number of metadata items for build steps.
        items: Option<usize>,
    },
    Failed {
        step: String,
        reason: String,
        duration: Duration,
    },
    /// Not run because an earlier step failed.
    Skipped { step: String },
}

impl StepResult {
    pub fn step(&self) -> &str {
        match self {
            StepResult::Passed { step, .. }
            | StepResult::Failed { step, .. }
            | StepResult::Skipped { step } => step,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepResult::Failed { .. })
    }

    pub fn get_duration(&self) -> Option<Duration> {
        match self {
            StepResult::Passed { duration, .. } | StepResult::Failed { duration, .. } => {
                Some(*duration)
            }
            StepResult::Skipped { .. } => None,
        }
    }

    pub fn get_status_str(&self) -> &'static str {
        match self {
            StepResult::Passed { .. } => "Passed",
            StepResult::Failed { .. } => "Failed",
            StepResult::Skipped { .. } => "Skipped",
        }
    }
}

/// Stages the scenario's project under `workspace` with the configured
/// command compiler and runs every step.
pub async fn run_scenario(scenario: &Scenario, workspace: &Path) -> Result<Vec<StepResult>> {
    let mut project = TestProject::new(workspace, scenario.project.clone(), &scenario.units)
        .with_context(|| format!("Failed to stage project in {}", workspace.display()))?;
    Ok(run_steps(&mut project, &scenario.steps).await)
}

/// Runs `steps` against an existing project. After the first failure the
/// remaining steps are reported as skipped.
pub async fn run_steps<C: Compiler>(project: &mut TestProject<C>, steps: &[Step]) -> Vec<StepResult> {
    let mut results = Vec::with_capacity(steps.len());
    let mut failed = false;

    for step in steps {
        let label = step.to_string();
        if failed {
            results.push(StepResult::Skipped { step: label });
            continue;
        }

        println!("{} {}", "Running".blue(), label);
        let start_time = Instant::now();
        let outcome = run_step(project, step).await;
        let duration = start_time.elapsed();

        match outcome {
            Ok(items) => {
                println!(
                    "{}",
                    format!("  ok ({:.2}s)", duration.as_secs_f64()).green()
                );
                results.push(StepResult::Passed {
                    step: label,
                    duration,
                    items,
                });
            }
            Err(e) => {
                println!(
                    "{}",
                    format!("  FAILED ({:.2}s)", duration.as_secs_f64()).red()
                );
                failed = true;
                results.push(StepResult::Failed {
                    step: label,
                    reason: format!("{:#}", e),
                    duration,
                });
            }
        }
    }
    results
}

async fn run_step<C: Compiler>(project: &mut TestProject<C>, step: &Step) -> Result<Option<usize>> {
    match step {
        Step::FullBuild {
            expect_items,
            expect_absent,
        } => {
            let metadata = project.full_build().await?;
            check_expectations(&metadata, expect_items, expect_absent)?;
            Ok(Some(metadata.len()))
        }
        Step::IncrementalBuild {
            units,
            expect_items,
            expect_absent,
        } => {
            let metadata = project.incremental_build(units).await?;
            check_expectations(&metadata, expect_items, expect_absent)?;
            Ok(Some(metadata.len()))
        }
        Step::Add { unit } => {
            project.add(unit)?;
            Ok(None)
        }
        Step::Delete { unit } => {
            project.delete(unit)?;
            Ok(None)
        }
        Step::Revert { unit } => {
            project.revert(unit)?;
            Ok(None)
        }
        Step::ReplaceText {
            unit,
            find,
            replace,
        } => {
            project.replace_text(unit, find, replace)?;
            Ok(None)
        }
        Step::AddSourceCode {
            unit,
            snippet,
            snippet_file,
        } => {
            match (snippet, snippet_file) {
                (Some(text), None) => project.add_source_code(unit, text.as_bytes())?,
                (None, Some(file)) => {
                    let reader = fs::File::open(file).with_context(|| {
                        format!("Failed to open snippet file: {}", file.display())
                    })?;
                    project.add_source_code(unit, reader)?
                }
                _ => bail!("add-source-code needs exactly one of 'snippet' and 'snippet_file'"),
            }
            Ok(None)
        }
        Step::ExpectOutput { path, exists } => {
            let file = project.output_file(path)?;
            if file.exists() != *exists {
                let expected = if *exists { "to exist" } else { "to be absent" };
                bail!("expected output file '{}' {}", path.display(), expected);
            }
            Ok(None)
        }
    }
}

fn check_expectations(metadata: &Metadata, expect_items: &[String], expect_absent: &[String]) -> Result<()> {
    let missing: Vec<&str> = expect_items
        .iter()
        .map(String::as_str)
        .filter(|name| !metadata.contains(name))
        .collect();
    let unexpected: Vec<&str> = expect_absent
        .iter()
        .map(String::as_str)
        .filter(|name| metadata.contains(name))
        .collect();

    match (missing.is_empty(), unexpected.is_empty()) {
        (true, true) => Ok(()),
        (false, true) => Err(anyhow!("missing metadata items: {}", missing.join(", "))),
        (true, false) => Err(anyhow!("unexpected metadata items: {}", unexpected.join(", "))),
        (false, false) => Err(anyhow!(
            "missing metadata items: {}; unexpected metadata items: {}",
            missing.join(", "),
            unexpected.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetadataItem;

    const SCENARIO: &str = r#"
        name = "rename property"
        units = ["sample.simple.SimpleProperties"]

        [project]
        source_root = "samples"
        always_include = ["sample.ConfigurationProperties"]

        [project.compiler]
        command = ["mycc", "-d", "{output}", "{sources}"]

        [[steps]]
        action = "full-build"
        expect_items = ["simple.name"]

        [[steps]]
        action = "replace-text"
        unit = "sample.simple.SimpleProperties"
        find = "name"
        replace = "title"

        [[steps]]
        action = "incremental-build"
        units = ["sample.simple.SimpleProperties"]
        expect_items = ["simple.title"]
        expect_absent = ["simple.name"]

        [[steps]]
        action = "add-source-code"
        unit = "sample.simple.SimpleProperties"
        snippet_file = "snippets/extra.src"

        [[steps]]
        action = "expect-output"
        path = "sample/simple/SimpleProperties.out"
    "#;

    #[test]
    fn scenario_deserializes_every_step_kind() {
        let scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.display_name(), "rename property");
        assert_eq!(scenario.units.len(), 1);
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(&scenario.steps[0], Step::FullBuild { expect_items, .. } if expect_items == &["simple.name"]));
        assert!(matches!(&scenario.steps[2], Step::IncrementalBuild { units, .. } if units.len() == 1));
        assert!(matches!(&scenario.steps[4], Step::ExpectOutput { exists: true, .. }));
    }

    #[test]
    fn resolve_paths_resolves_snippet_files_but_not_output_paths() {
        let scenario: Scenario = toml::from_str(SCENARIO).unwrap();
        let scenario = scenario.resolve_paths(Path::new("/scenarios"));
        assert_eq!(scenario.project.source_root, Path::new("/scenarios").join("samples"));
        assert!(matches!(
            &scenario.steps[3],
            Step::AddSourceCode { snippet_file: Some(file), .. } if file == &Path::new("/scenarios").join("snippets/extra.src")
        ));
        assert!(matches!(
            &scenario.steps[4],
            Step::ExpectOutput { path, .. } if path == Path::new("sample/simple/SimpleProperties.out")
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result: std::result::Result<Scenario, _> = toml::from_str(
            r#"
                [project]
                source_root = "samples"

                [[steps]]
                action = "explode"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn step_labels_are_readable() {
        let unit = Unit::new("a.B").unwrap();
        let step = Step::IncrementalBuild {
            units: vec![unit.clone(), Unit::new("a.C").unwrap()],
            expect_items: vec![],
            expect_absent: vec![],
        };
        assert_eq!(step.to_string(), "incremental-build [a.B, a.C]");
        assert_eq!(Step::Delete { unit }.to_string(), "delete a.B");
    }

    #[test]
    fn check_expectations_reports_missing_and_unexpected_items() {
        let unit = Unit::new("a.B").unwrap();
        let metadata = Metadata {
            items: vec![MetadataItem::new("present", unit)],
        };
        assert!(check_expectations(&metadata, &["present".into()], &["gone".into()]).is_ok());

        let err = check_expectations(&metadata, &["gone".into()], &["present".into()]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing metadata items: gone"));
        assert!(message.contains("unexpected metadata items: present"));
    }

    #[test]
    fn step_result_accessors() {
        let passed = StepResult::Passed {
            step: "full-build".into(),
            duration: Duration::from_millis(5),
            items: Some(2),
        };
        let skipped = StepResult::Skipped { step: "delete a.B".into() };
        assert_eq!(passed.get_status_str(), "Passed");
        assert!(!passed.is_failure());
        assert_eq!(skipped.get_duration(), None);
        assert_eq!(skipped.step(), "delete a.B");
    }
}
