//! # Metadata Module / 元数据模块
//!
//! The structured result of processing compiled units, and the processor
//! that collects it from compiler output.
//!
//! A fresh [`MetadataProcessor`] is created for every build pass. It merges
//! the items reported by the pass with the metadata a previous pass left in
//! the output directory, so an incremental pass sees the whole project:
//! previous items survive only when their unit was not recompiled and its
//! compiled artifact still exists.
//!
//! 处理编译单元得到的结构化结果，以及从编译器输出中收集它的处理器。
//!
//! 每次构建都会创建一个新的 [`MetadataProcessor`]。它将本次报告的元数据项
//! 与上一次留在输出目录中的元数据合并，因此增量构建能看到整个项目：
//! 只有当单元未被重新编译且其编译产物仍然存在时，之前的元数据项才会保留。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::compiler::{CompilationTask, CompilerMessage};
use crate::core::config::ProjectConfig;
use crate::core::unit::Unit;
use crate::error::{IoResultExt, ProjectError, Result};

/// A single piece of metadata contributed by a source unit.
/// 由源单元提供的一条元数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub name: String,
    /// The unit that declared the item.
    /// 声明该项的单元。
    pub source: Unit,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl MetadataItem {
    pub fn new(name: impl Into<String>, source: Unit) -> Self {
        Self {
            name: name.into(),
            source,
            item_type: None,
            description: None,
            default_value: None,
        }
    }
}

/// Metadata returned by a build pass, sorted by item name.
/// 构建返回的元数据，按项名称排序。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub items: Vec<MetadataItem>,
}

impl Metadata {
    pub fn item(&self, name: &str) -> Option<&MetadataItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.item(name).is_some()
    }

    /// Items declared by `unit`.
    pub fn items_from<'a>(&'a self, unit: &'a Unit) -> impl Iterator<Item = &'a MetadataItem> + 'a {
        self.items.iter().filter(move |item| &item.source == unit)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Collects metadata from compiler output and persists it next to the
/// compiled artifacts.
///
/// 从编译器输出中收集元数据，并将其持久化到编译产物旁边。
#[derive(Debug)]
pub struct MetadataProcessor {
    output_dir: PathBuf,
    metadata_file: PathBuf,
    artifact_extension: String,
    metadata: Metadata,
}

impl MetadataProcessor {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        metadata_file: impl Into<PathBuf>,
        artifact_extension: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            metadata_file: metadata_file.into(),
            artifact_extension: artifact_extension.into(),
            metadata: Metadata::default(),
        }
    }

    pub fn for_project(config: &ProjectConfig, output_dir: &Path) -> Self {
        Self::new(output_dir, &config.metadata_file, &config.artifact_extension)
    }

    /// Absolute path of the persisted metadata file.
    pub fn metadata_location(&self) -> PathBuf {
        self.output_dir.join(&self.metadata_file)
    }

    /// Merges the items reported in `output` with the previously persisted
    /// metadata and writes the result back to the output directory.
    pub fn process(&mut self, task: &CompilationTask, output: &str) -> Result<()> {
        let recompiled: HashSet<Unit> = task.units().into_iter().collect();
        let previous = self.read_previous()?;

        let mut merged: BTreeMap<String, MetadataItem> = BTreeMap::new();
        let mut kept = 0usize;
        for item in previous.items {
            if !recompiled.contains(&item.source) && self.artifact_exists(&item.source) {
                kept += 1;
                merged.insert(item.name.clone(), item);
            }
        }

        let mut collected = 0usize;
        for message in CompilerMessage::parse_lines(output) {
            if let CompilerMessage::MetadataItem(item) = message {
                collected += 1;
                merged.insert(item.name.clone(), item);
            }
        }

        debug!(collected, kept, "metadata processed");
        self.metadata = Metadata {
            items: merged.into_values().collect(),
        };
        self.write()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn into_metadata(self) -> Metadata {
        self.metadata
    }

    fn artifact_exists(&self, unit: &Unit) -> bool {
        self.output_dir
            .join(unit.artifact_path(&self.artifact_extension))
            .is_file()
    }

    fn read_previous(&self) -> Result<Metadata> {
        let location = self.metadata_location();
        if !location.is_file() {
            return Ok(Metadata::default());
        }
        let content = fs::read_to_string(&location).at_path(&location)?;
        serde_json::from_str(&content).map_err(|source| ProjectError::Metadata {
            path: location,
            source,
        })
    }

    fn write(&self) -> Result<()> {
        let location = self.metadata_location();
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent).at_path(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.metadata).map_err(|source| {
            ProjectError::Metadata {
                path: location.clone(),
                source,
            }
        })?;
        fs::write(&location, content).at_path(&location)
    }
}
