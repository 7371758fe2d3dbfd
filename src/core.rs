//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Stage Runner: source units,
//! project configuration, compiler invocation, metadata collection, the
//! workspace manager and scripted scenarios.
//!
//! 此模块包含 Stage Runner 的核心功能：源单元、项目配置、
//! 编译器调用、元数据收集、工作区管理器和脚本化场景。

pub mod compiler;
pub mod config;
pub mod metadata;
pub mod project;
pub mod scenario;
pub mod unit;

// Re-exports
pub use project::TestProject;
pub use scenario::{run_scenario, Scenario, StepResult};
pub use unit::Unit;
