//! URL ↔ title alias table.
//!
//! Extraction never writes the table directly: each batch returns an
//! [`AliasFragment`] and the fragments are merged into one [`AliasTable`]
//! once every document has been processed. Resolution only ever sees the
//! frozen table.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("alias table I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("alias table CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Titles are keyed case-insensitively with collapsed whitespace.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// `(href, visible text)` pairs collected from one extraction batch, in
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasFragment {
    pairs: Vec<(String, String)>,
}

impl AliasFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: impl Into<String>, title: impl Into<String>) {
        self.pairs.push((url.into(), title.into()));
    }

    pub fn extend(&mut self, other: AliasFragment) {
        self.pairs.extend(other.pairs);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(u, t)| (u.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append the pairs to a semicolon separated, quoted two-column file.
    pub fn append_to_csv(&self, path: &Path) -> Result<(), AliasError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AliasError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .quote(b'"')
            .has_headers(false)
            .from_writer(file);
        for (url, title) in self.iter() {
            writer.write_record([url, title])?;
        }
        writer.flush().map_err(|source| AliasError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

/// One-to-one URL ↔ lower-cased title mapping. Last write wins; a
/// re-insert drops the stale reverse entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    url_to_title: HashMap<String, String>,
    title_to_url: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce fragments into one table, applying them in order.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = AliasFragment>,
    {
        let mut table = Self::new();
        for fragment in fragments {
            table.merge(&fragment);
        }
        table
    }

    pub fn merge(&mut self, fragment: &AliasFragment) {
        for (url, title) in fragment.iter() {
            self.insert(url, title);
        }
    }

    pub fn insert(&mut self, url: &str, title: &str) {
        let url = url.trim();
        let title = normalize_title(title);
        if url.is_empty() || title.is_empty() {
            return;
        }

        if let Some(old_title) = self.url_to_title.remove(url) {
            if self.title_to_url.get(&old_title).map(String::as_str) == Some(url) {
                self.title_to_url.remove(&old_title);
            }
        }
        if let Some(old_url) = self.title_to_url.remove(&title) {
            if self.url_to_title.get(&old_url) == Some(&title) {
                self.url_to_title.remove(&old_url);
            }
        }

        self.url_to_title.insert(url.to_string(), title.clone());
        self.title_to_url.insert(title, url.to_string());
    }

    pub fn title_of(&self, url: &str) -> Option<&str> {
        self.url_to_title.get(url.trim()).map(String::as_str)
    }

    pub fn url_of(&self, title: &str) -> Option<&str> {
        self.title_to_url.get(&normalize_title(title)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.url_to_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.url_to_title.is_empty()
    }

    /// Entries sorted by URL, for hashing and export.
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .url_to_title
            .iter()
            .map(|(u, t)| (u.as_str(), t.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Read a persisted table. A missing file yields an empty table.
    pub fn load_csv(path: &Path) -> Result<Self, AliasError> {
        if !path.exists() {
            tracing::info!("No alias table at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .quote(b'"')
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut table = Self::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = row?;
            match (row.get(0), row.get(1)) {
                (Some(url), Some(title)) => table.insert(url, title),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} malformed alias rows in {}", skipped, path.display());
        }
        tracing::info!("Loaded {} aliases from {}", table.len(), path.display());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric_for_latest_mapping() {
        let mut table = AliasTable::new();
        table.insert("http://eu.example/a.pdf", "Policy X");
        table.insert("http://eu.example/b.pdf", "Policy X");

        let url = table.url_of("policy x").unwrap();
        assert_eq!(url, "http://eu.example/b.pdf");
        assert_eq!(table.title_of(url), Some("policy x"));
        assert_eq!(table.title_of("http://eu.example/a.pdf"), None);
    }

    #[test]
    fn reinserting_url_drops_old_title() {
        let mut table = AliasTable::new();
        table.insert("http://eu.example/a.pdf", "Old Name");
        table.insert("http://eu.example/a.pdf", "New Name");

        assert_eq!(table.url_of("old name"), None);
        assert_eq!(table.title_of(table.url_of("new name").unwrap()), Some("new name"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn titles_are_case_and_space_normalized() {
        let mut table = AliasTable::new();
        table.insert("u", "  Horizon\n 2020 ");
        assert_eq!(table.title_of("u"), Some("horizon 2020"));
        assert_eq!(table.url_of("HORIZON 2020"), Some("u"));
    }

    #[test]
    fn fragments_merge_in_order() {
        let mut first = AliasFragment::new();
        first.push("u1", "A");
        let mut second = AliasFragment::new();
        second.push("u2", "A");

        let table = AliasTable::from_fragments([first, second]);
        assert_eq!(table.url_of("a"), Some("u2"));
    }

    #[test]
    fn csv_append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("url_map.csv");

        let mut fragment = AliasFragment::new();
        fragment.push("http://eu.example/policy-x.pdf", "Policy X");
        fragment.push("http://eu.example/q.html", "Call; with \"quotes\"");
        fragment.append_to_csv(&path).unwrap();

        let mut more = AliasFragment::new();
        more.push("http://eu.example/z.html", "Z");
        more.append_to_csv(&path).unwrap();

        let table = AliasTable::load_csv(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.title_of("http://eu.example/policy-x.pdf"), Some("policy x"));
        assert_eq!(table.title_of("http://eu.example/q.html"), Some("call; with \"quotes\""));
    }

    #[test]
    fn missing_file_is_empty_table() {
        let table = AliasTable::load_csv(Path::new("/nonexistent/url_map.csv")).unwrap();
        assert!(table.is_empty());
    }
}
