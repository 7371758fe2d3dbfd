//! # Project Configuration Module / 项目配置模块
//!
//! Describes where pristine sources live, what every project always stages,
//! how files are named and how the external compiler is invoked.
//! Loaded from TOML.
//!
//! 描述原始源文件的位置、每个项目总是暂存的内容、
//! 文件的命名方式以及外部编译器的调用方式。从 TOML 加载。

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::unit::Unit;

/// Configuration of a test project, usually the `[project]` table of a
/// scenario file.
///
/// 测试项目的配置，通常是场景文件中的 `[project]` 表。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Root directory of the pristine original sources.
    /// 原始源文件的根目录。
    pub source_root: PathBuf,

    /// Directory copied once into the workspace class path at construction.
    /// Wherever it appears on the compiler's class path it is replaced by
    /// the workspace copy.
    ///
    /// 在构造时复制到工作区类路径中的目录。
    /// 它在编译器类路径中出现的位置都会被工作区副本替换。
    #[serde(default)]
    pub classpath_seed: Option<PathBuf>,

    /// Additional class path entries handed to the compiler.
    /// 传递给编译器的额外类路径条目。
    #[serde(default)]
    pub class_path: Vec<PathBuf>,

    /// Units staged by every project on top of the caller's selection.
    /// 除调用方选择之外，每个项目都会暂存的单元。
    #[serde(default)]
    pub always_include: Vec<Unit>,

    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// Location of the metadata file, relative to the output directory.
    /// 元数据文件的位置，相对于输出目录。
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,

    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// The command compiler's argument template.
///
/// Supported placeholders: `{output}`, `{source_dir}`, `{class_path}` and
/// `{sources}` (a token of its own, expanded to one argument per source).
/// `command` is either an array of tokens or a single command line, which is
/// split with shell quoting rules.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompilerConfig {
    #[serde(default, deserialize_with = "deserialize_command")]
    pub command: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommandTemplate {
    Line(String),
    Tokens(Vec<String>),
}

fn deserialize_command<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match CommandTemplate::deserialize(deserializer)? {
        CommandTemplate::Tokens(tokens) => Ok(tokens),
        CommandTemplate::Line(line) => shlex::split(&line)
            .ok_or_else(|| de::Error::custom(format!("failed to parse command: {}", line))),
    }
}

fn default_source_extension() -> String {
    "src".to_string()
}

fn default_artifact_extension() -> String {
    "out".to_string()
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("META-INF").join("stage-metadata.json")
}

impl ProjectConfig {
    /// Creates a configuration with defaults for everything but the source root.
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            classpath_seed: None,
            class_path: Vec::new(),
            always_include: Vec::new(),
            source_extension: default_source_extension(),
            artifact_extension: default_artifact_extension(),
            metadata_file: default_metadata_file(),
            compiler: CompilerConfig::default(),
        }
    }

    /// Loads a standalone project configuration file.
    /// Relative paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config: {}", path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse project config: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base))
    }

    /// Makes `source_root`, `classpath_seed` and `class_path` absolute
    /// against `base`. Absolute entries are kept as they are.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.source_root = base.join(&self.source_root);
        self.classpath_seed = self.classpath_seed.map(|seed| base.join(seed));
        self.class_path = self.class_path.iter().map(|entry| base.join(entry)).collect();
        self
    }

    /// The pristine file a unit is staged from.
    pub fn original_source_file(&self, unit: &Unit) -> PathBuf {
        self.source_root.join(unit.source_path(&self.source_extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: ProjectConfig = toml::from_str(r#"source_root = "samples""#).unwrap();
        assert_eq!(config, ProjectConfig::new("samples"));
        assert_eq!(config.source_extension, "src");
        assert_eq!(config.artifact_extension, "out");
        assert_eq!(config.metadata_file, Path::new("META-INF").join("stage-metadata.json"));
        assert!(config.compiler.command.is_empty());
    }

    #[test]
    fn full_config_deserializes() {
        let toml_str = r#"
            source_root = "samples/src"
            classpath_seed = "samples/classes"
            class_path = ["libs/annotations"]
            always_include = ["sample.ConfigurationProperties", "sample.NestedConfigurationProperty"]
            source_extension = "java"
            artifact_extension = "class"
            metadata_file = "META-INF/custom.json"

            [compiler]
            command = ["javac", "-d", "{output}", "-cp", "{class_path}", "{sources}"]
        "#;
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.classpath_seed, Some(PathBuf::from("samples/classes")));
        assert_eq!(config.always_include.len(), 2);
        assert_eq!(config.always_include[0].simple_name(), "ConfigurationProperties");
        assert_eq!(config.compiler.command[0], "javac");
        assert_eq!(config.metadata_file, PathBuf::from("META-INF/custom.json"));
    }

    #[test]
    fn command_line_string_is_split_with_shell_rules() {
        let toml_str = r#"
            source_root = "samples"

            [compiler]
            command = "mycc -d {output} --note 'two words' {sources}"
        "#;
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.compiler.command,
            vec!["mycc", "-d", "{output}", "--note", "two words", "{sources}"]
        );
    }

    #[test]
    fn unterminated_command_line_is_rejected() {
        let toml_str = r#"
            source_root = "samples"

            [compiler]
            command = "mycc \"unterminated"
        "#;
        let result: std::result::Result<ProjectConfig, _> = toml::from_str(toml_str);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("failed to parse command"));
    }

    #[test]
    fn missing_source_root_is_an_error() {
        let result: std::result::Result<ProjectConfig, _> = toml::from_str(r#"source_extension = "java""#);
        assert!(result.is_err());
    }

    #[test]
    fn load_resolves_relative_paths_against_config_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("project.toml");
        fs::write(
            &path,
            r#"
                source_root = "samples"
                classpath_seed = "classes"
                class_path = ["/opt/lib"]
            "#,
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.source_root, temp.path().join("samples"));
        assert_eq!(config.classpath_seed, Some(temp.path().join("classes")));
        assert_eq!(config.class_path, vec![temp.path().join("/opt/lib")]);
    }

    #[test]
    fn original_source_file_is_under_source_root() {
        let config = ProjectConfig::new("/samples");
        let unit = Unit::new("sample.Foo").unwrap();
        assert_eq!(
            config.original_source_file(&unit),
            Path::new("/samples").join("sample").join("Foo.src")
        );
    }
}
