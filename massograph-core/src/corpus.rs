//! Corpus Store: append-only JSONL log plus one pretty JSON file per record.
//!
//! Writes are at-least-once. A line, once appended, is never retracted;
//! re-running extraction on the same inputs appends duplicates unless the
//! log is truncated first.

use crate::normalizer::NormalizedRecord;
use crate::types::Record;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CORPUS_FILE: &str = "corpus.jsonl";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CorpusError + '_ {
    move |source| CorpusError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, CorpusError> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.dir.join(CORPUS_FILE)
    }

    /// Append one record to the log and write its per-record file.
    /// Returns the path of the per-record file.
    pub fn append(&self, normalized: &NormalizedRecord) -> Result<PathBuf, CorpusError> {
        let line = serde_json::to_string(&normalized.record)?;
        let corpus_path = self.corpus_path();
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&corpus_path)
            .map_err(io_error(&corpus_path))?;
        writeln!(log, "{}", line).map_err(io_error(&corpus_path))?;

        let record_path = self.dir.join(&normalized.file_name);
        let pretty = serde_json::to_string_pretty(&normalized.record)?;
        fs::write(&record_path, pretty).map_err(io_error(&record_path))?;
        Ok(record_path)
    }

    /// Empty the log. Per-record files are left in place.
    pub fn truncate(&self) -> Result<(), CorpusError> {
        let corpus_path = self.corpus_path();
        fs::write(&corpus_path, "").map_err(io_error(&corpus_path))
    }

    pub fn read_records(&self) -> Result<Vec<Record>, CorpusError> {
        read_corpus(&self.corpus_path())
    }
}

/// Read a JSONL corpus. Blank lines are ignored; lines that do not parse
/// into a record are logged and skipped.
pub fn read_corpus(path: &Path) -> Result<Vec<Record>, CorpusError> {
    let file = fs::File::open(path).map_err(io_error(path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error(path))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping {}:{}: {}", path.display(), index + 1, e),
        }
    }
    tracing::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Locate the corpus log for an `--input` argument: the file itself, or
/// `corpus.jsonl` (legacy `corpus.json`) inside a directory.
pub fn resolve_corpus_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        let jsonl = input.join(CORPUS_FILE);
        let legacy = input.join("corpus.json");
        if !jsonl.exists() && legacy.exists() {
            return legacy;
        }
        return jsonl;
    }
    input.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RecordNormalizer;
    use crate::types::{Classification, ExtractedFields};

    fn normalized(title: &str) -> NormalizedRecord {
        let mut fields = ExtractedFields::new(Classification::Press);
        fields.insert("title", vec![title.to_string()]);
        fields.insert("fulltext", vec!["text".to_string()]);
        RecordNormalizer::new().normalize(fields, "press/a.xml").unwrap()
    }

    #[test]
    fn append_writes_log_line_and_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(&dir.path().join("corpus")).unwrap();

        let path = store.append(&normalized("Policy X")).unwrap();
        store.append(&normalized("Policy Y")).unwrap();

        assert_eq!(path.file_name().unwrap(), "Policy X.json");
        let pretty = fs::read_to_string(&path).unwrap();
        assert!(pretty.contains("\"classification\": \"press\""));

        let records = store.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title().as_deref(), Some("Policy Y"));
    }

    #[test]
    fn appends_are_never_retracted_until_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::open(dir.path()).unwrap();
        store.append(&normalized("A")).unwrap();
        store.append(&normalized("A")).unwrap();
        assert_eq!(store.read_records().unwrap().len(), 2);

        store.truncate().unwrap();
        assert!(store.read_records().unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CORPUS_FILE);
        fs::write(
            &path,
            "{\"classification\":\"press\",\"title\":[\"A\"]}\nnot json\n\n{\"classification\":\"press\"}\n",
        )
        .unwrap();
        let records = read_corpus(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn resolves_directory_inputs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_corpus_path(dir.path()), dir.path().join(CORPUS_FILE));
        fs::write(dir.path().join("corpus.json"), "").unwrap();
        assert_eq!(resolve_corpus_path(dir.path()), dir.path().join("corpus.json"));
    }
}
