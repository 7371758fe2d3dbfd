//! # Error Module / 错误模块
//!
//! Errors raised by workspace operations. Every failure either wraps an I/O
//! error from the file system or reports a violated precondition at the call
//! that violated it.
//!
//! 工作区操作产生的错误。每个失败要么包装文件系统的 I/O 错误，
//! 要么在违反前置条件的调用处报告该条件。

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy directory: {0}")]
    Copy(#[from] fs_extra::error::Error),

    #[error("Source file for unit '{0}' already exists")]
    SourceAlreadyExists(String),

    #[error("Source file for unit '{0}' does not exist")]
    SourceNotFound(String),

    #[error("Original source for unit '{unit}' not found at '{}'", .path.display())]
    OriginalNotFound { unit: String, path: PathBuf },

    #[error("'{}' was absolute", .0.display())]
    AbsolutePath(PathBuf),

    #[error("Invalid unit name '{0}'")]
    InvalidUnit(String),

    #[error("Source file for unit '{0}' has no closing brace")]
    NoClosingBrace(String),

    #[error("Invalid compiler command: {0}")]
    InvalidCommand(String),

    #[error("Failed to launch compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Compilation failed:\n{output}")]
    CompilationFailed { output: String },

    #[error("Invalid metadata in '{}': {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProjectError>;

/// Attaches the offending path to a raw `io::Result`.
/// 为原始 `io::Result` 附加出错的路径。
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
