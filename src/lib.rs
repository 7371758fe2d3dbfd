//! # Stage Runner Library / Stage Runner 库
//!
//! This library provides a workspace fixture for incremental-build testing.
//! A [`TestProject`] stages copies of sample source units into a scratch
//! directory, compiles them through an external compiler with a
//! metadata-collecting processor, and lets test code mutate, restore and
//! delete individual staged sources between compilation passes.
//!
//! 此库为增量构建测试提供工作区夹具。
//! [`TestProject`] 将示例源单元的副本暂存到临时目录中，
//! 通过外部编译器和元数据收集处理器编译它们，
//! 并允许测试代码在编译轮次之间修改、还原和删除单个暂存源文件。
//!
//! ## Modules / 模块
//!
//! - `core` - Units, configuration, compiler invocation, metadata and the workspace manager
//! - `infra` - Infrastructure services like command execution and file system operations
//! - `reporting` - Scenario result reporting
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 单元、配置、编译器调用、元数据和工作区管理器
//! - `infra` - 基础设施服务，如命令执行和文件系统操作
//! - `reporting` - 场景结果报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod error;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::compiler::{CommandCompiler, CompilationTask, Compiler, CompilerRun, CompilerSettings};
pub use crate::core::config::ProjectConfig;
pub use crate::core::metadata::{Metadata, MetadataItem, MetadataProcessor};
pub use crate::core::project::TestProject;
pub use crate::core::unit::Unit;
pub use error::{ProjectError, Result};
