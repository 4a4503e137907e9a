//! Definition sources.
//!
//! A reader turns some source (a file, a string, an in-memory list) into raw
//! definitions in declaration order. `source_id` identifies the source for
//! cache keys and error messages.

use super::{Params, RawDefinition};
use crate::errors::{FactoryError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Produces raw definitions in declaration order.
pub trait DefinitionReader: Send + Sync {
    /// Stable identity of the source.
    fn source_id(&self) -> String;

    fn read(&self) -> Result<Vec<RawDefinition>>;
}

/// Serialized document formats understood by the text and file readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Json,
}

impl SourceFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(SourceFormat::Toml),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Toml => "toml",
            SourceFormat::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceDocument {
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    services: Vec<DocumentService>,
}

#[derive(Debug, Deserialize)]
struct DocumentService {
    name: String,
    #[serde(rename = "type", default)]
    type_name: Option<String>,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    params: IndexMap<String, ParamValue>,
}

/// Scalar parameter values; all of them end up as strings.
///
/// Number literals are normalized by their parsed value: `1.10` becomes
/// `"1.1"` and floats always keep a fractional part (`1.0` stays `"1.0"`).
/// Quote a value in the document to keep its exact text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParamValue {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    fn into_string(self) -> String {
        match self {
            ParamValue::Text(s) => s,
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Unsigned(u) => u.to_string(),
            ParamValue::Float(f) => format!("{f:?}"),
            ParamValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<DocumentService> for RawDefinition {
    fn from(service: DocumentService) -> Self {
        let params: Params = service
            .params
            .into_iter()
            .map(|(key, value)| (key, value.into_string()))
            .collect();
        RawDefinition {
            name: service.name,
            type_name: service.type_name,
            extends: service.extends,
            params,
        }
    }
}

fn parse_document(text: &str, format: SourceFormat, source_id: &str) -> Result<SourceDocument> {
    match format {
        SourceFormat::Toml => {
            toml::from_str(text).map_err(|e| FactoryError::source_read(source_id, e))
        }
        SourceFormat::Json => {
            serde_json::from_str(text).map_err(|e| FactoryError::source_read(source_id, e))
        }
    }
}

fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// In-memory definitions, e.g. built in code or by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticReader {
    definitions: Vec<RawDefinition>,
}

impl StaticReader {
    pub fn new(definitions: Vec<RawDefinition>) -> Self {
        Self { definitions }
    }
}

impl DefinitionReader for StaticReader {
    fn source_id(&self) -> String {
        let encoded = serde_json::to_vec(&self.definitions).unwrap_or_default();
        format!("static:{}", content_hash(&encoded))
    }

    fn read(&self) -> Result<Vec<RawDefinition>> {
        Ok(self.definitions.clone())
    }
}

/// Definitions parsed from a TOML or JSON string. Includes are not allowed.
#[derive(Debug, Clone)]
pub struct TextReader {
    text: String,
    format: SourceFormat,
}

impl TextReader {
    pub fn new(text: impl Into<String>, format: SourceFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn toml(text: impl Into<String>) -> Self {
        Self::new(text, SourceFormat::Toml)
    }

    pub fn json(text: impl Into<String>) -> Self {
        Self::new(text, SourceFormat::Json)
    }
}

impl DefinitionReader for TextReader {
    fn source_id(&self) -> String {
        format!(
            "text:{}:{}",
            self.format.as_str(),
            content_hash(self.text.as_bytes())
        )
    }

    fn read(&self) -> Result<Vec<RawDefinition>> {
        let source_id = self.source_id();
        let document = parse_document(&self.text, self.format, &source_id)?;
        if !document.includes.is_empty() {
            return Err(FactoryError::source_read(
                source_id,
                "includes are only supported for file sources",
            ));
        }
        Ok(document.services.into_iter().map(RawDefinition::from).collect())
    }
}

/// Definitions read from a `.toml` or `.json` file, following `includes`.
#[derive(Debug, Clone)]
pub struct FileReader {
    path: PathBuf,
}

impl FileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self, path: &Path, stack: &mut Vec<PathBuf>) -> Result<Vec<RawDefinition>> {
        let display = path.display().to_string();
        let canonical = path
            .canonicalize()
            .map_err(|e| FactoryError::source_read(&display, e))?;

        if stack.contains(&canonical) {
            return Err(FactoryError::IncludeCycle { path: display });
        }

        let format = SourceFormat::from_path(path).ok_or_else(|| {
            FactoryError::source_read(&display, "unsupported file extension (expected .toml or .json)")
        })?;
        let text =
            std::fs::read_to_string(&canonical).map_err(|e| FactoryError::source_read(&display, e))?;
        let document = parse_document(&text, format, &display)?;

        stack.push(canonical.clone());
        let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut definitions = Vec::new();
        for include in &document.includes {
            let expanded = shellexpand::tilde(include);
            let include_path = base.join(expanded.as_ref());
            log::debug!("including definitions from {}", include_path.display());
            definitions.extend(self.read_file(&include_path, stack)?);
        }
        stack.pop();

        definitions.extend(document.services.into_iter().map(RawDefinition::from));
        Ok(definitions)
    }
}

impl DefinitionReader for FileReader {
    fn source_id(&self) -> String {
        let path = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        format!("file:{}", path.display())
    }

    fn read(&self) -> Result<Vec<RawDefinition>> {
        let mut stack = Vec::new();
        let definitions = self.read_file(&self.path, &mut stack)?;
        log::info!(
            "read {} service definitions from {}",
            definitions.len(),
            self.path.display()
        );
        Ok(definitions)
    }
}
