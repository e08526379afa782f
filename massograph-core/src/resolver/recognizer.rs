//! Entity recognition over record fulltext.
//!
//! The resolver only depends on the [`EntityRecognizer`] trait. The bundled
//! [`HeuristicRecognizer`] needs no model: URLs are found token by token
//! the way tokenizer-based `like_url` checks do, and entities are runs of
//! capitalised words or acronyms.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RecognizerError {
    #[error("text of {chars} chars exceeds the recognizer limit of {limit}")]
    TooLarge { chars: usize, limit: usize },
    #[error("recognizer failed: {0}")]
    Failed(String),
}

/// URL-like tokens and named-entity spans found in one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub links: Vec<String>,
    pub entities: Vec<String>,
}

pub trait EntityRecognizer {
    fn recognize(&self, text: &str) -> Result<Recognition, RecognizerError>;

    /// Recognizer identifier for logging and cache keys
    fn name(&self) -> &str;
}

// Capitalised words, optionally joined by lower-case connectors
static TITLE_SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\p{Lu}[\p{L}\p{N}'’&-]*(?:\s+(?:(?:of|for|and|the|on|in|de|du|des|la|le|van|von)\s+)*\p{Lu}[\p{L}\p{N}'’&-]*)+",
    )
    .unwrap()
});

static ACRONYM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}{2,}[0-9]*\b").unwrap());

const TOKEN_PUNCTUATION: &[char] = &['(', ')', '[', ']', '{', '}', '<', '>', '"', '\'', ',', ';', '!', '?', '«', '»', '“', '”'];

const TLDS: &[&str] = &[
    "com", "org", "net", "edu", "gov", "int", "mil", "info", "biz", "io", "eu", "uk", "de", "fr",
    "be", "nl", "lu", "it", "es", "pt", "ie", "at", "ch", "se", "dk", "fi", "no", "is", "pl",
    "cz", "sk", "hu", "ro", "bg", "gr", "cy", "mt", "si", "hr", "ee", "lv", "lt", "us", "ca",
    "au", "nz", "jp", "cn", "in", "br", "ru", "za", "tv", "me", "co", "ly",
];

/// Model-free recognizer.
#[derive(Debug, Clone)]
pub struct HeuristicRecognizer {
    max_chars: usize,
}

impl Default for HeuristicRecognizer {
    fn default() -> Self {
        Self {
            max_chars: 1_000_000,
        }
    }
}

impl HeuristicRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse texts longer than `max_chars`.
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl EntityRecognizer for HeuristicRecognizer {
    fn recognize(&self, text: &str) -> Result<Recognition, RecognizerError> {
        let chars = text.chars().count();
        if chars > self.max_chars {
            return Err(RecognizerError::TooLarge {
                chars,
                limit: self.max_chars,
            });
        }
        Ok(Recognition {
            links: url_tokens(text),
            entities: entity_spans(text),
        })
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Whitespace tokens that read like URLs, surrounding punctuation removed.
pub fn url_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_matches(TOKEN_PUNCTUATION)
                .trim_end_matches(['.', ':'])
        })
        .filter(|token| like_url(token))
        .map(str::to_string)
        .collect()
}

pub fn like_url(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.starts_with("http://") || token.starts_with("https://") {
        return true;
    }
    if token.starts_with("www.") && token.len() >= 5 {
        return true;
    }
    if token.starts_with('.') || token.ends_with('.') || token.contains('@') {
        return false;
    }
    let Some((_, last)) = token.rsplit_once('.') else {
        return false;
    };
    let tld = last.split(':').next().unwrap_or(last);
    if tld.ends_with('/') {
        return true;
    }
    let tld = tld.split('/').next().unwrap_or(tld);
    tld.chars().all(|c| c.is_ascii_alphabetic()) && TLDS.contains(&tld.to_lowercase().as_str())
}

/// Capitalised multi-word spans and acronyms, in text order, without overlaps.
pub fn entity_spans(text: &str) -> Vec<String> {
    let mut spans: Vec<(usize, usize)> = TITLE_SPAN_REGEX
        .find_iter(text)
        .chain(ACRONYM_REGEX.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.sort_by_key(|&(start, end)| (start, std::cmp::Reverse(end)));

    let mut entities = Vec::new();
    let mut covered_until = 0;
    for (start, end) in spans {
        if start < covered_until {
            continue;
        }
        entities.push(text[start..end].to_string());
        covered_until = end;
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_like_tokens() {
        assert!(like_url("http://eu.example/a.pdf"));
        assert!(like_url("www.europa.eu"));
        assert!(like_url("ec.europa.eu/research/"));
        assert!(like_url("cordis.europa.eu"));
        assert!(!like_url("someone@ec.europa.eu"));
        assert!(!like_url("report.pdf"));
        assert!(!like_url("e.g"));
        assert!(!like_url("end."));
    }

    #[test]
    fn finds_urls_in_running_text() {
        let links = url_tokens("See (http://eu.example/policy-x.pdf), or www.europa.eu. Mail a@b.eu today.");
        assert_eq!(links, ["http://eu.example/policy-x.pdf", "www.europa.eu"]);
    }

    #[test]
    fn finds_entity_spans() {
        let entities = entity_spans("The European Research Council met the ERC2 panel in Brussels. Horizon 2020 starts.");
        assert!(entities.contains(&"The European Research Council".to_string()));
        assert!(entities.contains(&"ERC2".to_string()));
        assert!(!entities.iter().any(|e| e == "Brussels"));
    }

    #[test]
    fn overlong_text_is_rejected() {
        let recognizer = HeuristicRecognizer::with_max_chars(4);
        assert_eq!(
            recognizer.recognize("too long"),
            Err(RecognizerError::TooLarge { chars: 8, limit: 4 })
        );
        assert!(recognizer.recognize("ok").is_ok());
    }
}
