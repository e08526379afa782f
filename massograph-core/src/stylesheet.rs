//! Declarative field mappings ("stylesheets").
//!
//! A stylesheet maps classification → format → field → `{selector, attribute}`:
//!
//! ```json
//! {"press": {"xml": {"title": {"selector": "//title", "attribute": "text"}}}}
//! ```

use crate::types::{Classification, SourceFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StylesheetError {
    #[error("failed to read stylesheet {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON stylesheet: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML stylesheet: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("stylesheet has no '{format}' entry for classification '{classification}'")]
    MissingEntry {
        classification: Classification,
        format: SourceFormat,
    },
}

/// How a matched element becomes a string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeMode {
    /// Inner text of the element.
    Text,
    /// `href` attribute; also records (href, visible text) alias pairs.
    Href,
    /// First match parsed as an integer.
    Int,
    /// Any other name: raw attribute lookup.
    Attribute(String),
}

impl From<String> for AttributeMode {
    fn from(mode: String) -> Self {
        match mode.as_str() {
            "text" => AttributeMode::Text,
            "href" => AttributeMode::Href,
            "int" => AttributeMode::Int,
            _ => AttributeMode::Attribute(mode),
        }
    }
}

impl From<AttributeMode> for String {
    fn from(mode: AttributeMode) -> Self {
        match mode {
            AttributeMode::Text => "text".to_string(),
            AttributeMode::Href => "href".to_string(),
            AttributeMode::Int => "int".to_string(),
            AttributeMode::Attribute(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub selector: String,
    pub attribute: AttributeMode,
}

impl FieldSpec {
    pub fn new(selector: &str, attribute: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: AttributeMode::from(attribute.to_string()),
        }
    }
}

/// Field name → selector spec for one (classification, format) pair, in
/// file order. Fields are evaluated in this order.
pub type FieldMapping = IndexMap<String, FieldSpec>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stylesheet {
    entries: BTreeMap<String, BTreeMap<SourceFormat, FieldMapping>>,
}

impl Stylesheet {
    /// Load a stylesheet file. `.yaml`/`.yml` files are read as YAML,
    /// everything else as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, StylesheetError> {
        let content = std::fs::read_to_string(path).map_err(|source| StylesheetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
            .unwrap_or(false);
        if is_yaml {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StylesheetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, classification: &str, format: SourceFormat, mapping: FieldMapping) {
        self.entries
            .entry(classification.to_string())
            .or_default()
            .insert(format, mapping);
    }

    pub fn entry(&self, classification: Classification, format: SourceFormat) -> Option<&FieldMapping> {
        classification
            .stylesheet_keys()
            .iter()
            .find_map(|key| self.entries.get(*key))
            .and_then(|formats| formats.get(&format))
    }

    pub fn require_entry(
        &self,
        classification: Classification,
        format: SourceFormat,
    ) -> Result<&FieldMapping, StylesheetError> {
        self.entry(classification, format)
            .ok_or(StylesheetError::MissingEntry {
                classification,
                format,
            })
    }
}
