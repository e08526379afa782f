//! Corpus vocabularies and substring mention scanning.

use crate::types::Record;
use std::collections::HashSet;

/// Join paragraphs, collapse whitespace, lower-case.
pub fn normalize_fulltext(fulltext: &[String]) -> String {
    fulltext
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An ordered, duplicate-free list of terms to look for in fulltexts.
///
/// Each entry keeps its reported form next to the lower-cased needle that is
/// actually searched for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(String, String)>,
}

impl Vocabulary {
    /// Build from raw terms. Blank terms are skipped; later duplicates
    /// (same needle) are dropped.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for term in terms {
            let display = term.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
            if display.is_empty() {
                continue;
            }
            let needle = display.to_lowercase();
            if seen.insert(needle.clone()) {
                entries.push((display, needle));
            }
        }
        Self { entries }
    }

    /// Lower-cased titles of every record.
    pub fn titles(records: &[Record]) -> Self {
        Self::from_terms(
            records
                .iter()
                .filter_map(Record::title)
                .map(|title| title.to_lowercase()),
        )
    }

    /// Every identifier value of every record.
    pub fn identifiers(records: &[Record]) -> Self {
        Self::from_terms(records.iter().flat_map(|r| r.identifiers().iter()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(display, _)| display.as_str())
    }

    /// Terms contained in `normalized_text` (see [`normalize_fulltext`]),
    /// in vocabulary order. Plain substring containment, no word boundaries.
    pub fn mentions_in(&self, normalized_text: &str) -> Vec<String> {
        if normalized_text.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(_, needle)| normalized_text.contains(needle.as_str()))
            .map(|(display, _)| display.clone())
            .collect()
    }
}
