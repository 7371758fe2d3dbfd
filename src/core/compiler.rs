//! # Compiler Invocation Module / 编译器调用模块
//!
//! This module defines the boundary to the external compiler: a
//! [`CompilationTask`] describes one pass over a set of staged sources, a
//! [`Compiler`] runs it, and the compiler's JSON message stream is parsed
//! into [`CompilerMessage`]s.
//!
//! Customization of the source directory and class path is injected through
//! [`CompilerSettings`] strategies rather than by overriding the compiler.
//!
//! 此模块定义了与外部编译器的边界：[`CompilationTask`] 描述对一组暂存源文件的一次编译，
//! [`Compiler`] 执行它，编译器的 JSON 消息流被解析为 [`CompilerMessage`]。
//!
//! 源目录和类路径的定制通过 [`CompilerSettings`] 中注入的策略完成，而非重写编译器。

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::metadata::{MetadataItem, MetadataProcessor};
use crate::core::unit::Unit;
use crate::error::{ProjectError, Result};
use crate::infra::command;

/// A single message from the compiler's JSON output, keyed by `reason`.
/// Lines that are not valid messages are ignored by [`CompilerMessage::parse_lines`].
///
/// 来自编译器 JSON 输出的单条消息，以 `reason` 为键。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum CompilerMessage {
    /// A metadata item produced by the processor for a source unit.
    /// 处理器为源单元生成的元数据项。
    MetadataItem(MetadataItem),
    /// A diagnostic such as a warning or an error.
    /// 诊断信息，例如警告或错误。
    #[serde(rename = "compiler-message")]
    Diagnostic(Diagnostic),
}

impl CompilerMessage {
    /// Parses every line of `output` that holds a valid message.
    pub fn parse_lines(output: &str) -> impl Iterator<Item = CompilerMessage> + '_ {
        output
            .lines()
            .filter_map(|line| serde_json::from_str::<CompilerMessage>(line.trim()).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Diagnostic {
    /// The severity level of the diagnostic (e.g., "error", "warning").
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub rendered: Option<String>,
}

/// One compilation pass over a set of staged source files.
///
/// 对一组暂存源文件的一次编译。
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationTask {
    pub sources: Vec<PathBuf>,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub class_path: Vec<PathBuf>,
}

impl CompilationTask {
    /// The units compiled by this task, recovered from the source paths.
    /// Sources outside the source directory are skipped.
    pub fn units(&self) -> Vec<Unit> {
        self.sources
            .iter()
            .filter_map(|source| source.strip_prefix(&self.source_dir).ok())
            .filter_map(|relative| Unit::from_relative_path(relative).ok())
            .collect()
    }

    /// Runs the task and hands the compiler output to `processor`.
    ///
    /// Fails with [`ProjectError::CompilationFailed`] when the compiler
    /// reports failure; the processor then sees nothing.
    pub async fn call<C: Compiler>(
        &self,
        compiler: &C,
        processor: &mut MetadataProcessor,
    ) -> Result<()> {
        let run = compiler.invoke(self).await?;
        if !run.success {
            return Err(ProjectError::CompilationFailed {
                output: command::format_error_output(&run.output),
            });
        }
        processor.process(self, &run.output)
    }
}

/// The result of running a compiler to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerRun {
    pub success: bool,
    /// Combined stdout and stderr.
    pub output: String,
}

type SourceDirSupplier = Box<dyn Fn() -> PathBuf>;
type ClassPathFilter = Box<dyn Fn(Vec<PathBuf>) -> Vec<PathBuf>>;

/// Output location, class path and the two injected strategies used to
/// build [`CompilationTask`]s.
///
/// 输出位置、类路径以及用于构建 [`CompilationTask`] 的两个注入策略。
pub struct CompilerSettings {
    output_dir: PathBuf,
    class_path: Vec<PathBuf>,
    source_dir: SourceDirSupplier,
    class_path_filter: ClassPathFilter,
}

impl CompilerSettings {
    /// Settings with an empty class path, the current directory as source
    /// directory and a class path filter that changes nothing.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            class_path: Vec::new(),
            source_dir: Box::new(|| PathBuf::from(".")),
            class_path_filter: Box::new(|entries| entries),
        }
    }

    pub fn with_class_path(mut self, class_path: Vec<PathBuf>) -> Self {
        self.class_path = class_path;
        self
    }

    /// Injects the strategy locating the directory sources are compiled from.
    pub fn with_source_dir(mut self, supplier: impl Fn() -> PathBuf + 'static) -> Self {
        self.source_dir = Box::new(supplier);
        self
    }

    /// Injects the strategy rewriting the class path before each task.
    pub fn with_class_path_filter(
        mut self,
        filter: impl Fn(Vec<PathBuf>) -> Vec<PathBuf> + 'static,
    ) -> Self {
        self.class_path_filter = Box::new(filter);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn source_dir(&self) -> PathBuf {
        (self.source_dir)()
    }

    pub fn class_path(&self) -> Vec<PathBuf> {
        (self.class_path_filter)(self.class_path.clone())
    }

    pub fn task(&self, sources: Vec<PathBuf>) -> CompilationTask {
        CompilationTask {
            sources,
            source_dir: self.source_dir(),
            output_dir: self.output_dir.clone(),
            class_path: self.class_path(),
        }
    }
}

impl fmt::Debug for CompilerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerSettings")
            .field("output_dir", &self.output_dir)
            .field("class_path", &self.class_path)
            .finish_non_exhaustive()
    }
}

/// The external compiler-invocation service.
///
/// Implementations only need to provide their settings and `invoke`; task
/// construction goes through the injected strategies.
///
/// 外部编译器调用服务。
pub trait Compiler {
    fn settings(&self) -> &CompilerSettings;

    /// Runs the compiler over `task` to completion.
    fn invoke(&self, task: &CompilationTask) -> impl Future<Output = Result<CompilerRun>>;

    fn output_location(&self) -> &Path {
        self.settings().output_dir()
    }

    fn task<I>(&self, sources: I) -> CompilationTask
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.settings().task(sources.into_iter().collect())
    }
}

/// Runs an external program built from an argument template.
///
/// The program token is shell-expanded (`~`, `$VAR`); the remaining tokens
/// only get placeholder substitution so they can carry shell scripts.
#[derive(Debug)]
pub struct CommandCompiler {
    settings: CompilerSettings,
    command: Vec<String>,
}

impl CommandCompiler {
    pub fn new(settings: CompilerSettings, command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(ProjectError::InvalidCommand(
                "compiler command is empty".to_string(),
            ));
        }
        Ok(Self { settings, command })
    }

    /// Expands the argument template for `task`. The first element is the program.
    pub fn expand_args(&self, task: &CompilationTask) -> Result<Vec<OsString>> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ProjectError::InvalidCommand("compiler command is empty".to_string()))?;

        let program = shellexpand::full(program)
            .map_err(|e| ProjectError::InvalidCommand(format!("failed to expand '{}': {}", program, e)))?;

        let class_path = std::env::join_paths(&task.class_path)
            .map_err(|e| ProjectError::InvalidCommand(format!("invalid class path entry: {}", e)))?;
        let class_path = class_path.to_string_lossy();
        let output = task.output_dir.to_string_lossy();
        let source_dir = task.source_dir.to_string_lossy();

        let mut expanded = vec![OsString::from(program.into_owned())];
        for arg in args {
            if arg == "{sources}" {
                expanded.extend(task.sources.iter().map(|s| s.as_os_str().to_owned()));
                continue;
            }
            let substituted = arg
                .replace("{output}", &output)
                .replace("{source_dir}", &source_dir)
                .replace("{class_path}", &class_path);
            expanded.push(OsString::from(substituted));
        }
        Ok(expanded)
    }
}

impl Compiler for CommandCompiler {
    fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    async fn invoke(&self, task: &CompilationTask) -> Result<CompilerRun> {
        let args = self.expand_args(task)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| ProjectError::InvalidCommand("compiler command is empty".to_string()))?;
        let program_name = program.to_string_lossy().into_owned();

        debug!(
            program = %program_name,
            sources = task.sources.len(),
            "invoking compiler"
        );

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(rest).kill_on_drop(true).current_dir(&task.source_dir);

        let (status_res, output) = command::spawn_and_capture(cmd).await;
        let status = status_res.map_err(|source| ProjectError::Spawn {
            program: program_name.clone(),
            source,
        })?;

        debug!(program = %program_name, status = %status, "compiler finished");
        Ok(CompilerRun {
            success: status.success(),
            output,
        })
    }
}
