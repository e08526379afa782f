//! Link/Entity Resolver
//!
//! Turns a corpus of records into resolved records: recognizer output,
//! title and identifier mentions, cleaned links, alias-resolved citations
//! and the final target set per record.
//!
//! Resolution is a pure function of (records, alias table, config). The
//! alias table is only ever borrowed.

pub mod links;
pub mod matching;
pub mod recognizer;

use crate::alias::AliasTable;
use crate::config::ResolutionConfig;
use crate::types::{Citation, Provenance, Record, ResolvedCorpus, ResolvedRecord, Target};
use std::collections::{BTreeSet, HashMap};

pub use links::{filename_stem, is_email_like};
pub use matching::{normalize_fulltext, Vocabulary};
pub use recognizer::{EntityRecognizer, HeuristicRecognizer, Recognition, RecognizerError};

pub struct Resolver {
    recognizer: Box<dyn EntityRecognizer>,
    config: ResolutionConfig,
}

impl Resolver {
    pub fn new(recognizer: Box<dyn EntityRecognizer>, config: ResolutionConfig) -> Self {
        Self { recognizer, config }
    }

    /// Resolver backed by the model-free [`HeuristicRecognizer`].
    pub fn with_heuristics(config: ResolutionConfig) -> Self {
        Self::new(Box::new(HeuristicRecognizer::new()), config)
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn resolve(&self, records: &[Record], aliases: &AliasTable) -> ResolvedCorpus {
        let titles = Vocabulary::titles(records);
        let identifiers = Vocabulary::identifiers(records);
        tracing::info!(
            "Resolving {} records ({} titles, {} identifiers, {} aliases)",
            records.len(),
            titles.len(),
            identifiers.len(),
            aliases.len()
        );

        let resolved: Vec<ResolvedRecord> = records
            .iter()
            .map(|record| self.resolve_record(record, &titles, &identifiers, aliases))
            .collect();

        let (resolved_cites, total_cites) = resolved.iter().fold((0, 0), |(hit, all), r| {
            (
                hit + r.cites.iter().filter(|c| c.is_resolved()).count(),
                all + r.cites.len(),
            )
        });
        tracing::info!(
            "Resolved {}/{} links through the alias table",
            resolved_cites,
            total_cites
        );
        ResolvedCorpus::new(resolved)
    }

    /// Resolve the records of an earlier result again.
    pub fn re_resolve(&self, corpus: &ResolvedCorpus, aliases: &AliasTable) -> ResolvedCorpus {
        let records: Vec<Record> = corpus.records.iter().map(|r| r.record.clone()).collect();
        self.resolve(&records, aliases)
    }

    fn resolve_record(
        &self,
        record: &Record,
        titles: &Vocabulary,
        identifiers: &Vocabulary,
        aliases: &AliasTable,
    ) -> ResolvedRecord {
        let fulltext = record.fulltext();
        let joined = fulltext.join(" ");

        let recognition = if joined.trim().is_empty() {
            Recognition::default()
        } else {
            self.recognizer.recognize(&joined).unwrap_or_else(|e| {
                tracing::warn!(
                    "Entity recognition failed for '{}': {}",
                    record.node_key(),
                    e
                );
                Recognition::default()
            })
        };

        let normalized = normalize_fulltext(fulltext);
        let title_mentions = if self.config.title_mentions {
            titles.mentions_in(&normalized)
        } else {
            Vec::new()
        };
        let identifier_mentions = if self.config.identifier_mentions {
            identifiers.mentions_in(&normalized)
        } else {
            Vec::new()
        };

        let links: Vec<String> = record
            .links()
            .iter()
            .chain(recognition.links.iter())
            .map(|link| link.trim())
            .filter(|link| !link.is_empty())
            .filter(|link| !(self.config.drop_email_links && is_email_like(link)))
            .map(str::to_string)
            .collect();

        let cites: Vec<Citation> = links.iter().map(|link| cite(link, aliases)).collect();
        let targets = merge_targets(&cites, &title_mentions);

        let target_links = if self.config.map_target_links {
            targets
                .iter()
                .filter_map(|t| aliases.url_of(&t.name))
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        ResolvedRecord {
            record: record.clone(),
            links,
            entities: recognition.entities,
            title_mentions,
            identifier_mentions,
            cites,
            targets,
            target_links,
        }
    }
}

/// Alias lookup with filename-stem fallback.
pub fn cite(link: &str, aliases: &AliasTable) -> Citation {
    match aliases.title_of(link) {
        Some(title) => Citation::Resolved {
            link: link.to_string(),
            title: title.to_string(),
        },
        None => Citation::Unresolved {
            link: link.to_string(),
            stem: filename_stem(link),
        },
    }
}

/// `cites` followed by `title_mentions`, one target per name, provenances
/// merged.
pub fn merge_targets(cites: &[Citation], title_mentions: &[String]) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let named = cites
        .iter()
        .map(|c| (c.name(), c.provenance()))
        .chain(title_mentions.iter().map(|t| (t.as_str(), Provenance::Mention)));

    for (name, provenance) in named {
        match index.get(name) {
            Some(&i) => {
                targets[i].provenance.insert(provenance);
            }
            None => {
                index.insert(name.to_string(), targets.len());
                targets.push(Target {
                    name: name.to_string(),
                    provenance: BTreeSet::from([provenance]),
                });
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Classification, FieldValues};

    fn press(title: &str, fulltext: &str, links: &[&str]) -> Record {
        let mut fields = FieldValues::new();
        fields.insert("title".into(), vec![title.into()]);
        fields.insert("fulltext".into(), vec![fulltext.into()]);
        fields.insert("links".into(), links.iter().map(|l| l.to_string()).collect());
        Record::from_fields(Classification::Press, fields, format!("{}.xml", title)).unwrap()
    }

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn recognize(&self, _text: &str) -> Result<Recognition, RecognizerError> {
            Err(RecognizerError::Failed("model unavailable".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn alias_hit_and_stem_fallback() {
        let records = vec![press("Call A", "", &["http://eu.example/policy-x.pdf"])];
        let resolver = Resolver::with_heuristics(ResolutionConfig::default());

        let mut aliases = AliasTable::new();
        aliases.insert("http://eu.example/policy-x.pdf", "Policy X");
        let resolved = resolver.resolve(&records, &aliases);
        let names: Vec<&str> = resolved.records[0].cites.iter().map(Citation::name).collect();
        assert_eq!(names, ["policy x"]);
        assert_eq!(resolved.records[0].target_links, ["http://eu.example/policy-x.pdf"]);

        let resolved = resolver.resolve(&records, &AliasTable::new());
        let names: Vec<&str> = resolved.records[0].cites.iter().map(Citation::name).collect();
        assert_eq!(names, ["policy-x"]);
        assert!(resolved.records[0].target_links.is_empty());
    }

    #[test]
    fn title_mentions_ignore_case_and_punctuation_context() {
        let records = vec![
            press("Policy X", "Policy text.", &[]),
            press("Call B", "As set out in POLICY X, applicants must...", &[]),
        ];
        let resolved = Resolver::with_heuristics(ResolutionConfig::default()).resolve(&records, &AliasTable::new());
        assert_eq!(resolved.records[1].title_mentions, ["policy x"]);
        assert!(resolved.records[1].target_names().any(|t| t == "policy x"));
    }

    #[test]
    fn emails_are_dropped_and_recognizer_links_merged() {
        let records = vec![press(
            "Call C",
            "Details at http://eu.example/guide.pdf or write to info@eu.example",
            &["mailto:info@eu.example", "", "http://eu.example/annex.pdf"],
        )];
        let resolved = Resolver::with_heuristics(ResolutionConfig::default()).resolve(&records, &AliasTable::new());
        assert_eq!(
            resolved.records[0].links,
            ["http://eu.example/annex.pdf", "http://eu.example/guide.pdf"]
        );
    }

    #[test]
    fn targets_contain_cites_and_mentions_with_merged_provenance() {
        let records = vec![
            press("Policy X", "", &[]),
            press("Call D", "see policy x", &["http://eu.example/policy-x.pdf", "http://eu.example/other.pdf"]),
        ];
        let mut aliases = AliasTable::new();
        aliases.insert("http://eu.example/policy-x.pdf", "Policy X");
        let resolved = Resolver::with_heuristics(ResolutionConfig::default()).resolve(&records, &aliases);
        let record = &resolved.records[1];

        for cite in &record.cites {
            assert!(record.target_names().any(|t| t == cite.name()));
        }
        for mention in &record.title_mentions {
            assert!(record.target_names().any(|t| t == mention));
        }
        assert_eq!(record.targets.len(), 2);
        assert_eq!(
            record.targets[0].provenance,
            BTreeSet::from([Provenance::Alias, Provenance::Mention])
        );
        assert_eq!(record.targets[1].provenance, BTreeSet::from([Provenance::Stem]));
    }

    #[test]
    fn recognizer_failure_leaves_record_usable() {
        let records = vec![press("Call E", "http://eu.example/x.pdf", &["http://eu.example/y.pdf"])];
        let resolver = Resolver::new(Box::new(FailingRecognizer), ResolutionConfig::default());
        let resolved = resolver.resolve(&records, &AliasTable::new());
        assert!(resolved.records[0].entities.is_empty());
        assert_eq!(resolved.records[0].links, ["http://eu.example/y.pdf"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let records = vec![
            press("Policy X", "", &[]),
            press("Call F", "policy x and http://eu.example/z.pdf", &[]),
        ];
        let resolver = Resolver::with_heuristics(ResolutionConfig::default());
        let aliases = AliasTable::new();
        let first = resolver.resolve(&records, &aliases);
        let second = resolver.re_resolve(&first, &aliases);
        assert_eq!(first, second);
    }
}
