//! 服务定义模型
//!
//! - `RawDefinition`: 来源读取器产出的原始定义（可能带 `extends`）
//! - `ResolvedDefinition`: 继承链展开后的自包含定义
//! - `DefinitionTable`: 名称到已解析定义的有序映射

pub mod reader;
pub mod resolver;

pub use reader::{DefinitionReader, FileReader, SourceFormat, StaticReader, TextReader};
pub use resolver::resolve;

use crate::errors::{FactoryError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 构造参数，保持声明顺序
pub type Params = IndexMap<String, String>;

/// Type recorded for names registered with a ready-made instance.
pub const DIRECT_INSTANCE_TYPE: &str = "<instance>";

/// 原始定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDefinition {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub params: Params,
}

impl RawDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            extends: None,
            params: Params::new(),
        }
    }

    /// A definition that inherits its type from `parent`.
    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            extends: Some(parent.into()),
            params: Params::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// 已解析定义：不再含有父引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: Params,
}

impl ResolvedDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            params,
        }
    }

    /// Placeholder definition for a directly registered instance.
    pub fn direct(name: impl Into<String>) -> Self {
        Self::new(name, DIRECT_INSTANCE_TYPE, Params::new())
    }

    pub fn is_direct(&self) -> bool {
        self.type_name == DIRECT_INSTANCE_TYPE
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// 定义表 - 构建一次后只读，修改总是产生新表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionTable {
    entries: IndexMap<String, ResolvedDefinition>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedDefinition> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 名称列表（声明顺序）
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedDefinition> {
        self.entries.values()
    }

    /// Copy of this table with `definition` inserted or replaced in place.
    pub fn with_definition(&self, definition: ResolvedDefinition) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(definition.name.clone(), definition);
        Self { entries }
    }

    /// Copy of this table without `name`, preserving the order of the rest.
    pub fn without(&self, name: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.shift_remove(name);
        Self { entries }
    }

    pub(crate) fn insert(&mut self, definition: ResolvedDefinition) {
        self.entries.insert(definition.name.clone(), definition);
    }

    /// 序列化为缓存字节
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| FactoryError::Cache(format!("failed to encode definition table: {e}")))
    }

    /// 从缓存字节反序列化
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| FactoryError::Cache(format!("failed to decode definition table: {e}")))
    }
}

impl FromIterator<ResolvedDefinition> for DefinitionTable {
    fn from_iter<I: IntoIterator<Item = ResolvedDefinition>>(iter: I) -> Self {
        let mut table = Self::new();
        for definition in iter {
            table.insert(definition);
        }
        table
    }
}
