//! Record Normalizer: extracted fields → validated [`Record`].

use crate::types::{ExtractedFields, Record, RecordError};
use thiserror::Error;

/// Longest file name stem written for a record.
const MAX_FILE_STEM_CHARS: usize = 150;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("record key '{0}' has no usable file name")]
    EmptyFileName(String),
}

/// A record together with its output key and the file name derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub key: String,
    pub file_name: String,
    pub record: Record,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordNormalizer;

impl RecordNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Build the record variant for the extracted classification and derive
    /// its output key (title, else first identifier).
    pub fn normalize(
        &self,
        extracted: ExtractedFields,
        local_source: &str,
    ) -> Result<NormalizedRecord, NormalizeError> {
        let ExtractedFields {
            fields,
            classification,
        } = extracted;
        let record = Record::from_fields(classification, fields, local_source)?;
        let key = record.key()?;
        let stem = sanitize_file_stem(&key);
        if stem.is_empty() {
            return Err(NormalizeError::EmptyFileName(key));
        }
        Ok(NormalizedRecord {
            file_name: format!("{}.json", stem),
            key,
            record,
        })
    }
}

/// Make a record key safe to use as a file name on any platform.
pub fn sanitize_file_stem(key: &str) -> String {
    let replaced: String = key
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_start_matches('.');
    trimmed.chars().take(MAX_FILE_STEM_CHARS).collect::<String>().trim().to_string()
}
