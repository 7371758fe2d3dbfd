//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations used by the
//! workspace manager, such as seeding directories, copying single files,
//! clearing build output and reading or writing staged sources.
//!
//! 此模块提供工作区管理器使用的文件系统操作工具，
//! 如填充目录、复制单个文件、清空构建输出以及读写暂存源文件。

use anyhow::Context;
use fs_extra::dir::{copy, CopyOptions};
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;

use crate::error::{IoResultExt, Result};

/// Creates a uniquely named scratch directory for a scenario run.
///
/// The name is sanitized so it can be used as a directory prefix.
///
/// # Arguments
/// * `name` - Name of the scenario, used to make the directory easy to identify
/// * `parent` - Optional directory to create the scratch directory in
pub fn create_scratch_dir(name: &str, parent: Option<&Path>) -> anyhow::Result<TempDir> {
    let sanitized_name = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    let prefix = format!("stage_runner_{}_", sanitized_name);

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);
    let scratch = match parent {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create workspace parent: {}", dir.display()))?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    };
    scratch.with_context(|| "Failed to create scratch directory".to_string())
}

/// Copies the content of `from` into `to`, creating `to` if needed.
/// Existing files in the destination are overwritten.
///
/// 将 `from` 的内容复制到 `to` 中，必要时创建 `to`。
/// 目标中已存在的文件会被覆盖。
pub fn copy_dir_contents(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).at_path(to)?;
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    copy(from, to, &options)?;
    Ok(())
}

/// Copies a single file, creating the parent directories of the target.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).at_path(parent)?;
    }
    fs::copy(from, to).at_path(from)?;
    Ok(())
}

/// Deletes a directory recursively and recreates it empty.
///
/// 递归删除目录并重新创建一个空目录。
pub fn delete_dir_contents(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).at_path(dir),
    }
    fs::create_dir_all(dir).at_path(dir)
}

/// Removes a file, treating a missing file as success.
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).at_path(path),
    }
}

pub fn read_contents(path: &Path) -> Result<String> {
    fs::read_to_string(path).at_path(path)
}

pub fn write_contents(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).at_path(path)
}
