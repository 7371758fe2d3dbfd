//! # Test Project Module / 测试项目模块
//!
//! A [`TestProject`] holds copies of a subset of sample sources in a scratch
//! workspace. Incremental build tests need to modify the sources between
//! passes without touching the originals, so every operation works on the
//! staged copies.
//!
//! Workspace layout:
//!
//! ```text
//! <destination>/
//! ├── src/         staged sources
//! ├── build/       compiler output location
//! └── classPath/   copy of the class path seed
//! ```
//!
//! [`TestProject`] 在临时工作区中保存示例源文件子集的副本。
//! 增量构建测试需要在编译轮次之间修改源文件而不触碰原始文件，
//! 因此所有操作都作用于暂存副本。

use indexmap::IndexSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::compiler::{CommandCompiler, Compiler, CompilerSettings};
use crate::core::config::ProjectConfig;
use crate::core::metadata::{Metadata, MetadataProcessor};
use crate::core::unit::Unit;
use crate::error::{IoResultExt, ProjectError, Result};
use crate::infra::fs as project_fs;

pub const SOURCE_DIR: &str = "src";
pub const OUTPUT_DIR: &str = "build";
pub const CLASS_PATH_DIR: &str = "classPath";

/// A staged copy of sample sources plus the compiler that builds them.
///
/// The tracked source set and the staged files on disk are kept consistent:
/// every tracked path has a file, and deleting a unit removes both.
///
/// 示例源文件的暂存副本以及构建它们的编译器。
#[derive(Debug)]
pub struct TestProject<C: Compiler = CommandCompiler> {
    config: ProjectConfig,
    source_dir: PathBuf,
    class_path_dir: PathBuf,
    compiler: C,
    source_files: IndexSet<PathBuf>,
}

impl TestProject<CommandCompiler> {
    /// Creates a project compiled by the configured external command.
    pub fn new(destination: &Path, config: ProjectConfig, units: &[Unit]) -> Result<Self> {
        let command = config.compiler.command.clone();
        Self::with_compiler(destination, config, units, |settings| {
            CommandCompiler::new(settings, command)
        })
    }
}

impl<C: Compiler> TestProject<C> {
    /// Seeds the workspace under `destination` and stages `units` together
    /// with the configured `always_include` units.
    ///
    /// `make_compiler` receives settings whose source directory is the staged
    /// source subtree and whose class path has the seed replaced by the
    /// workspace copy.
    pub fn with_compiler<F>(
        destination: &Path,
        config: ProjectConfig,
        units: &[Unit],
        make_compiler: F,
    ) -> Result<Self>
    where
        F: FnOnce(CompilerSettings) -> Result<C>,
    {
        let source_dir = destination.join(SOURCE_DIR);
        let output_dir = destination.join(OUTPUT_DIR);
        let class_path_dir = destination.join(CLASS_PATH_DIR);
        for dir in [&source_dir, &output_dir, &class_path_dir] {
            fs::create_dir_all(dir).at_path(dir)?;
        }

        let seed = config.classpath_seed.clone();
        if let Some(seed) = &seed {
            project_fs::copy_dir_contents(seed, &class_path_dir)?;
        }

        let mut class_path: Vec<PathBuf> = seed.iter().cloned().collect();
        class_path.extend(config.class_path.iter().cloned());

        let settings = CompilerSettings::new(&output_dir)
            .with_class_path(class_path)
            .with_source_dir({
                let source_dir = source_dir.clone();
                move || source_dir.clone()
            })
            .with_class_path_filter({
                let class_path_dir = class_path_dir.clone();
                move |entries| {
                    entries
                        .into_iter()
                        .map(|entry| {
                            if Some(&entry) == seed.as_ref() {
                                class_path_dir.clone()
                            } else {
                                entry
                            }
                        })
                        .collect()
                }
            });
        let compiler = make_compiler(settings)?;

        let mut project = Self {
            config,
            source_dir,
            class_path_dir,
            compiler,
            source_files: IndexSet::new(),
        };

        let mut contents: IndexSet<Unit> = units.iter().cloned().collect();
        contents.extend(project.config.always_include.iter().cloned());
        for unit in &contents {
            project.copy_source(unit)?;
        }

        info!(
            destination = %destination.display(),
            units = contents.len(),
            "test project initialized"
        );
        Ok(project)
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        self.compiler.output_location()
    }

    pub fn class_path_dir(&self) -> &Path {
        &self.class_path_dir
    }

    /// The tracked staged sources, in the order they were staged.
    pub fn source_files(&self) -> impl Iterator<Item = &Path> {
        self.source_files.iter().map(PathBuf::as_path)
    }

    pub fn is_tracked(&self, unit: &Unit) -> bool {
        self.source_files.contains(&self.source_file(unit))
    }

    /// The staged source file of `unit`, whether or not it exists.
    pub fn source_file(&self, unit: &Unit) -> PathBuf {
        self.source_dir
            .join(unit.source_path(&self.config.source_extension))
    }

    /// Clears the output directory and compiles every tracked source.
    ///
    /// 清空输出目录并编译所有被跟踪的源文件。
    pub async fn full_build(&self) -> Result<Metadata> {
        let mut processor = self.processor();
        let task = self.compiler.task(self.source_files.iter().cloned());
        project_fs::delete_dir_contents(self.compiler.output_location())?;
        info!(sources = task.sources.len(), "running full build");
        task.call(&self.compiler, &mut processor).await?;
        Ok(processor.into_metadata())
    }

    /// Compiles only `to_recompile`, leaving previous output in place.
    /// Choosing a realistic subset is up to the caller.
    ///
    /// 仅编译 `to_recompile`，保留之前的输出。由调用方选择合理的子集。
    pub async fn incremental_build(&self, to_recompile: &[Unit]) -> Result<Metadata> {
        let mut processor = self.processor();
        let task = self
            .compiler
            .task(to_recompile.iter().map(|unit| self.source_file(unit)));
        info!(sources = task.sources.len(), "running incremental build");
        task.call(&self.compiler, &mut processor).await?;
        Ok(processor.into_metadata())
    }

    /// Resolves `relative_path` beneath the output directory.
    pub fn output_file(&self, relative_path: impl AsRef<Path>) -> Result<PathBuf> {
        let relative_path = relative_path.as_ref();
        if relative_path.is_absolute() || relative_path.has_root() {
            return Err(ProjectError::AbsolutePath(relative_path.to_path_buf()));
        }
        Ok(self.compiler.output_location().join(relative_path))
    }

    /// Inserts the snippet read from `snippet` just before the last `}` of
    /// the staged source. The insertion point is textual, not syntactic.
    pub fn add_source_code(&self, unit: &Unit, mut snippet: impl Read) -> Result<()> {
        let target = self.existing_source_file(unit)?;
        let mut contents = project_fs::read_contents(&target)?;
        let insert_at = contents
            .rfind('}')
            .ok_or_else(|| ProjectError::NoClosingBrace(unit.to_string()))?;

        let mut additional = String::new();
        snippet.read_to_string(&mut additional).at_path(&target)?;
        contents.insert_str(insert_at, &additional);
        project_fs::write_contents(&target, &contents)?;
        debug!(unit = %unit, bytes = additional.len(), "source code added");
        Ok(())
    }

    /// Removes the staged source of `unit` and its compiled artifact from
    /// both the output directory and the workspace class path.
    /// Files that do not exist are skipped silently.
    ///
    /// 删除 `unit` 的暂存源文件，以及输出目录和工作区类路径中的编译产物。
    pub fn delete(&mut self, unit: &Unit) -> Result<()> {
        let target = self.source_file(unit);
        project_fs::remove_file_if_exists(&target)?;
        self.source_files.shift_remove(&target);

        let artifact = unit.artifact_path(&self.config.artifact_extension);
        project_fs::remove_file_if_exists(&self.compiler.output_location().join(&artifact))?;
        project_fs::remove_file_if_exists(&self.class_path_dir.join(&artifact))?;
        debug!(unit = %unit, "unit deleted");
        Ok(())
    }

    /// Restores the staged source of `unit` to its original contents.
    pub fn revert(&mut self, unit: &Unit) -> Result<()> {
        self.existing_source_file(unit)?;
        self.copy_source(unit)
    }

    /// Stages a unit that is not part of the project yet.
    pub fn add(&mut self, unit: &Unit) -> Result<()> {
        if self.source_file(unit).exists() {
            return Err(ProjectError::SourceAlreadyExists(unit.to_string()));
        }
        self.copy_source(unit)
    }

    /// Literal, case-sensitive replacement of every occurrence of `find`.
    /// An empty `find` matches between every character.
    pub fn replace_text(&self, unit: &Unit, find: &str, replace: &str) -> Result<()> {
        let target = self.existing_source_file(unit)?;
        let contents = project_fs::read_contents(&target)?;
        if !contents.contains(find) {
            return Ok(());
        }
        project_fs::write_contents(&target, &contents.replace(find, replace))
    }

    fn copy_source(&mut self, unit: &Unit) -> Result<()> {
        let original = self.config.original_source_file(unit);
        if !original.is_file() {
            return Err(ProjectError::OriginalNotFound {
                unit: unit.to_string(),
                path: original,
            });
        }
        let target = self.source_file(unit);
        project_fs::copy_file(&original, &target)?;
        debug!(unit = %unit, target = %target.display(), "source staged");
        self.source_files.insert(target);
        Ok(())
    }

    fn existing_source_file(&self, unit: &Unit) -> Result<PathBuf> {
        let target = self.source_file(unit);
        if target.is_file() {
            Ok(target)
        } else {
            Err(ProjectError::SourceNotFound(unit.to_string()))
        }
    }

    fn processor(&self) -> MetadataProcessor {
        MetadataProcessor::for_project(&self.config, self.compiler.output_location())
    }
}
