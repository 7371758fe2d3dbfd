//! # Reporting Module / 报告模块
//!
//! This module prints scenario results to the console.
//!
//! 此模块将场景结果打印到控制台。

pub mod console;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
