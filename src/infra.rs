//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Stage Runner,
//! including command execution and file system operations.
//!
//! 此模块为 Stage Runner 提供基础设施服务，
//! 包括命令执行和文件系统操作。

pub mod command;
pub mod fs;
