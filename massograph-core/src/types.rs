use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Field name → ordered values. Every extracted field is multi-valued;
/// scalar fields carry a single-element sequence.
pub type FieldValues = BTreeMap<String, Vec<String>>;

/// The schema version stamped on every resolved snapshot.
/// Bump this when the snapshot shape changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

// ===== SOURCE TAGS =====

/// Source classification of a document. Selects the stylesheet entry and
/// the record variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Press,
    #[serde(alias = "calls")]
    Call,
    Pdf,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Press => "press",
            Classification::Call => "call",
            Classification::Pdf => "pdf",
        }
    }

    /// Keys under which a stylesheet may list this classification.
    pub fn stylesheet_keys(&self) -> &'static [&'static str] {
        match self {
            Classification::Press => &["press"],
            Classification::Call => &["call", "calls"],
            Classification::Pdf => &["pdf"],
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "press" => Ok(Classification::Press),
            "call" | "calls" => Ok(Classification::Call),
            "pdf" | "pdfs" => Ok(Classification::Pdf),
            other => Err(RecordError::UnknownClassification(other.to_string())),
        }
    }
}

/// Markup or binary format of a raw document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Xml,
    Html,
    Pdf,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Xml => "xml",
            SourceFormat::Html => "html",
            SourceFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xml" => Ok(SourceFormat::Xml),
            "html" | "htm" => Ok(SourceFormat::Html),
            "pdf" => Ok(SourceFormat::Pdf),
            other => Err(RecordError::UnknownFormat(other.to_string())),
        }
    }
}

/// A fetched document as handed to the selector engine. Immutable once read.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub classification: Classification,
    pub format: SourceFormat,
    pub origin: PathBuf,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, classification: Classification, format: SourceFormat, origin: PathBuf) -> Self {
        Self {
            bytes,
            classification,
            format,
            origin,
        }
    }

    /// Origin path as stored in `local_source`.
    pub fn local_source(&self) -> String {
        self.origin.to_string_lossy().to_string()
    }

    /// File stem of the origin path (PDF titles are derived from it).
    pub fn file_stem(&self) -> String {
        self.origin
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

// ===== SELECTOR ENGINE OUTPUT =====

/// Flat field mapping produced by applying one stylesheet entry to one document.
///
/// Serializes as `{"title": ["Policy X"], "classification": "press"}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedFields {
    #[serde(flatten)]
    pub fields: FieldValues,
    pub classification: Classification,
}

impl ExtractedFields {
    pub fn new(classification: Classification) -> Self {
        Self {
            fields: FieldValues::new(),
            classification,
        }
    }

    pub fn insert(&mut self, field: &str, values: Vec<String>) {
        self.fields.insert(field.to_string(), values);
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(|v| v.as_slice())
    }
}

// ===== RECORDS =====

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("unknown classification '{0}'")]
    UnknownClassification(String),
    #[error("unknown source format '{0}'")]
    UnknownFormat(String),
    #[error("record has neither a title nor an identifier")]
    MissingKey,
    #[error("pdf record has no title")]
    MissingTitle,
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("field '{0}' holds a nested object")]
    NestedObject(String),
}

/// Fields of an XML or HTML sourced record (press releases, calls).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupRecord {
    pub identifier: Vec<String>,
    pub title: Vec<String>,
    pub fulltext: Vec<String>,
    pub links: Vec<String>,
    /// Any further stylesheet fields.
    pub fields: FieldValues,
    pub local_source: String,
}

/// Fields of a PDF sourced record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfRecord {
    pub title: String,
    pub fulltext: Vec<String>,
    pub local_source: String,
}

/// One normalized document. Never mutated after construction.
///
/// On disk a record is one flat JSON object tagged with `classification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Record {
    Press(MarkupRecord),
    Call(MarkupRecord),
    Pdf(PdfRecord),
}

impl Record {
    /// Build a record from extracted fields, validating the variant's
    /// required fields.
    pub fn from_fields(
        classification: Classification,
        mut fields: FieldValues,
        local_source: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let local_source = local_source.into();
        match classification {
            Classification::Pdf => {
                let title = fields.remove("title").map(|t| t.join(" ")).unwrap_or_default();
                if title.trim().is_empty() {
                    return Err(RecordError::MissingTitle);
                }
                Ok(Record::Pdf(PdfRecord {
                    title,
                    fulltext: fields.remove("fulltext").unwrap_or_default(),
                    local_source,
                }))
            }
            Classification::Press | Classification::Call => {
                let record = MarkupRecord {
                    identifier: fields.remove("identifier").unwrap_or_default(),
                    title: fields.remove("title").unwrap_or_default(),
                    fulltext: fields.remove("fulltext").unwrap_or_default(),
                    links: fields.remove("links").unwrap_or_default(),
                    fields,
                    local_source,
                };
                let has_title = record.title.iter().any(|t| !t.trim().is_empty());
                let has_identifier = record.identifier.iter().any(|i| !i.trim().is_empty());
                if !has_title && !has_identifier {
                    return Err(RecordError::MissingKey);
                }
                Ok(match classification {
                    Classification::Press => Record::Press(record),
                    _ => Record::Call(record),
                })
            }
        }
    }

    pub fn classification(&self) -> Classification {
        match self {
            Record::Press(_) => Classification::Press,
            Record::Call(_) => Classification::Call,
            Record::Pdf(_) => Classification::Pdf,
        }
    }

    pub fn local_source(&self) -> &str {
        match self {
            Record::Press(r) | Record::Call(r) => &r.local_source,
            Record::Pdf(r) => &r.local_source,
        }
    }

    /// Fulltext paragraphs. A PDF's single text blob is a one-element list.
    pub fn fulltext(&self) -> &[String] {
        match self {
            Record::Press(r) | Record::Call(r) => &r.fulltext,
            Record::Pdf(r) => &r.fulltext,
        }
    }

    pub fn links(&self) -> &[String] {
        match self {
            Record::Press(r) | Record::Call(r) => &r.links,
            Record::Pdf(_) => &[],
        }
    }

    pub fn identifiers(&self) -> &[String] {
        match self {
            Record::Press(r) | Record::Call(r) => &r.identifier,
            Record::Pdf(_) => &[],
        }
    }

    /// Title as one string: markup title values are joined with spaces.
    pub fn title(&self) -> Option<String> {
        let title = match self {
            Record::Press(r) | Record::Call(r) => r.title.join(" "),
            Record::Pdf(r) => r.title.clone(),
        };
        let title = title.trim().to_string();
        (!title.is_empty()).then_some(title)
    }

    /// Lookup of any field by name, including the well-known ones.
    pub fn field(&self, name: &str) -> Option<&[String]> {
        match (self, name) {
            (_, "fulltext") => Some(self.fulltext()),
            (Record::Press(r) | Record::Call(r), "identifier") => Some(&r.identifier),
            (Record::Press(r) | Record::Call(r), "title") => Some(&r.title),
            (Record::Press(r) | Record::Call(r), "links") => Some(&r.links),
            (Record::Press(r) | Record::Call(r), other) => r.fields.get(other).map(|v| v.as_slice()),
            (Record::Pdf(_), _) => None,
        }
    }

    /// Output key: the title if present, else the first identifier.
    pub fn key(&self) -> Result<String, RecordError> {
        if let Some(title) = self.title() {
            return Ok(title);
        }
        self.identifiers()
            .iter()
            .map(|i| i.trim())
            .find(|i| !i.is_empty())
            .map(str::to_string)
            .ok_or(RecordError::MissingKey)
    }

    /// Identity of this record's source node in the citation graph.
    pub fn node_key(&self) -> String {
        self.key().unwrap_or_else(|_| self.local_source().to_string())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        let mut map = Map::new();
        let classification = record.classification();
        match record {
            Record::Press(r) | Record::Call(r) => {
                for (name, values) in [
                    ("identifier", r.identifier),
                    ("title", r.title),
                    ("fulltext", r.fulltext),
                    ("links", r.links),
                ] {
                    if !values.is_empty() {
                        map.insert(name.to_string(), Value::from(values));
                    }
                }
                for (name, values) in r.fields {
                    map.insert(name, Value::from(values));
                }
                map.insert("local_source".to_string(), Value::String(r.local_source));
            }
            Record::Pdf(r) => {
                map.insert("title".to_string(), Value::String(r.title));
                map.insert("fulltext".to_string(), Value::from(r.fulltext));
                map.insert("local_source".to_string(), Value::String(r.local_source));
            }
        }
        map.insert(
            "classification".to_string(),
            Value::String(classification.as_str().to_string()),
        );
        Value::Object(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(RecordError::NotAnObject);
        };

        let mut classification = None;
        let mut local_source = String::new();
        let mut fields = FieldValues::new();

        for (name, value) in map {
            match name.as_str() {
                "classification" => {
                    let tag = scalar_to_string(&value).unwrap_or_default();
                    classification = Some(tag.parse::<Classification>()?);
                }
                "local_source" => local_source = scalar_to_string(&value).unwrap_or_default(),
                _ => {
                    let values = listify(&name, value)?;
                    fields.insert(name, values);
                }
            }
        }

        let classification =
            classification.ok_or_else(|| RecordError::UnknownClassification(String::new()))?;
        Record::from_fields(classification, fields, local_source)
    }
}

/// Coerce a JSON value into a sequence of strings: scalars are wrapped,
/// numbers stringified, nulls dropped.
fn listify(field: &str, value: Value) -> Result<Vec<String>, RecordError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => {}
                    Value::Object(_) | Value::Array(_) => {
                        return Err(RecordError::NestedObject(field.to_string()))
                    }
                    scalar => out.extend(scalar_to_string(&scalar)),
                }
            }
            Ok(out)
        }
        Value::Object(_) => Err(RecordError::NestedObject(field.to_string())),
        scalar => Ok(scalar_to_string(&scalar).into_iter().collect()),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ===== RESOLUTION OUTPUT =====

/// How a citation target was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Link resolved through the alias table.
    Alias,
    /// Corpus title found verbatim in the fulltext.
    Mention,
    /// Unresolved link named after its filename stem.
    Stem,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Alias => "alias",
            Provenance::Mention => "mention",
            Provenance::Stem => "stem",
        }
    }
}

/// One outbound link after alias lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Citation {
    Resolved { link: String, title: String },
    Unresolved { link: String, stem: String },
}

impl Citation {
    /// Name used as the citation target.
    pub fn name(&self) -> &str {
        match self {
            Citation::Resolved { title, .. } => title,
            Citation::Unresolved { stem, .. } => stem,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            Citation::Resolved { link, .. } | Citation::Unresolved { link, .. } => link,
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Citation::Resolved { .. } => Provenance::Alias,
            Citation::Unresolved { .. } => Provenance::Stem,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Citation::Resolved { .. })
    }
}

/// A resolved citation endpoint for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub provenance: BTreeSet<Provenance>,
}

/// A record together with everything the resolver derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRecord {
    pub record: Record,
    /// Stylesheet links merged with recognizer links, emails removed.
    pub links: Vec<String>,
    pub entities: Vec<String>,
    pub title_mentions: Vec<String>,
    pub identifier_mentions: Vec<String>,
    pub cites: Vec<Citation>,
    pub targets: Vec<Target>,
    pub target_links: Vec<String>,
}

impl ResolvedRecord {
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }
}

/// All resolved records of one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolvedCorpus {
    pub schema_version: String,
    pub records: Vec<ResolvedRecord>,
}

impl ResolvedCorpus {
    pub fn new(records: Vec<ResolvedRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save_to_json(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_json(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
