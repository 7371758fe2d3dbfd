//! # Source Unit Module / 源单元模块
//!
//! A unit is a named source item, identified by a dot-separated qualified
//! name such as `sample.simple.SimpleProperties`. Each unit maps to one
//! source file and one compiled artifact, both laid out as nested
//! directories under their respective roots.
//!
//! 单元是一个命名的源项，由点分隔的限定名标识，
//! 例如 `sample.simple.SimpleProperties`。每个单元对应一个源文件和一个编译产物，
//! 两者都以嵌套目录的形式位于各自的根目录下。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ProjectError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    name: String,
}

impl Unit {
    /// Creates a unit from its qualified name.
    ///
    /// Fails with [`ProjectError::InvalidUnit`] when the name is empty, has an
    /// empty segment, or contains path separators or relative components.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.split('.').all(|segment| {
                !segment.is_empty() && !segment.contains(['/', '\\']) && segment.trim() == segment
            });
        if valid {
            Ok(Self { name })
        } else {
            Err(ProjectError::InvalidUnit(name))
        }
    }

    /// Recovers a unit from a path relative to a source or output root,
    /// e.g. `sample/simple/SimpleProperties.src`.
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let stem = path.with_extension("");
        let segments: Vec<String> = stem
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Self::new(segments.join("."))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Relative path of the unit's source file, e.g. `sample/Foo.src`.
    pub fn source_path(&self, extension: &str) -> PathBuf {
        self.relative_path(extension)
    }

    /// Relative path of the unit's compiled artifact, e.g. `sample/Foo.out`.
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.relative_path(extension)
    }

    fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.name.split('.').collect();
        if !extension.is_empty() {
            path.set_extension(extension);
        }
        path
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Unit {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Unit {
    type Error = ProjectError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.name
    }
}
