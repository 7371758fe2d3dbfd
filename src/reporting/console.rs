//! # Console Reporting Module / 控制台报告模块
//!
//! Colorful, formatted summaries of scenario runs.
//!
//! 场景运行的彩色格式化摘要。

use colored::*;

use crate::core::scenario::StepResult;

/// Prints a formatted summary of step results to the console.
///
/// 在控制台打印格式化的步骤结果摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Scenario Summary: rename property ---
///   - Passed   | full-build                                         |     0.12s  (3 items)
///   - Failed   | incremental-build [sample.Foo]                     |     0.08s
///   - Skipped  | delete sample.Foo                                  |       N/A
/// ```
pub fn print_summary(name: &str, results: &[StepResult]) {
    println!("\n{}", format!("--- Scenario Summary: {} ---", name).bold());

    for result in results {
        let duration_str = result
            .get_duration()
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());

        let items_str = match result {
            StepResult::Passed {
                items: Some(items), ..
            } => format!(" ({} items)", items),
            _ => String::new(),
        };

        let status = result.get_status_str();
        let status_colored = match result {
            StepResult::Passed { .. } => status.green(),
            StepResult::Failed { .. } => status.red(),
            StepResult::Skipped { .. } => status.dimmed(),
        };

        println!(
            "  - {:<8} | {:<50} | {:>10}{}",
            status_colored,
            result.step(),
            duration_str,
            items_str
        );
    }
}

/// Prints the reason of every failed step. Returns early when nothing failed.
///
/// 打印每个失败步骤的原因。没有失败时提前返回。
pub fn print_failure_details(results: &[StepResult]) {
    let failures: Vec<&StepResult> = results.iter().filter(|r| r.is_failure()).collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", "SCENARIO FAILED".red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in failures.iter().enumerate() {
        if let StepResult::Failed { step, reason, .. } = result {
            println!(
                "[{}/{}] {} '{}'",
                i + 1,
                failures.len(),
                "Failure in step".red(),
                step.cyan()
            );
            println!("\n{}\n", reason);
            println!("{}", "-".repeat(80));
        }
    }
}
