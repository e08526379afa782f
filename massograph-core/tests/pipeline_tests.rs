//! Pipeline boundary tests over the fixture working directory.
//!
//! `test_fixtures/workdir/` holds three press releases (XML), two calls
//! (HTML) and the stylesheet that maps them. Each test copies the directory
//! into a scratch location and runs the real extraction → resolution →
//! graph pipeline over it.
//!
//! Expected citation structure:
//! - "policy x" is cited by both calls and one press release, and mentioned
//!   by the "Policy X" release itself
//! - "Annual Report" only cites its own annex, forming a second component

use massograph_core::alias::AliasTable;
use massograph_core::corpus::CorpusStore;
use massograph_core::graphs::{CitationGraph, CitationGraphBuilder, GraphAnalytics, Side};
use massograph_core::processor::{AnalysisOptions, AnalysisProcessor, ExtractionProcessor};
use massograph_core::resolver::Resolver;
use massograph_core::{
    AnalysisConfig, Citation, Classification, MarkupPreprocessor, Preprocessor, Provenance, ResolvedCorpus,
    ResolvedRecord, SourceFormat, Stylesheet,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures/workdir")
}

/// Copy the fixture working directory into a fresh temp dir.
fn scratch_workdir() -> tempfile::TempDir {
    let scratch = tempfile::tempdir().unwrap();
    for entry in walkdir::WalkDir::new(fixtures_dir()) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(fixtures_dir()).unwrap();
        let dest = scratch.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
        } else {
            std::fs::copy(entry.path(), &dest).unwrap();
        }
    }
    scratch
}

fn stylesheet() -> Stylesheet {
    Stylesheet::load_from_file(&fixtures_dir().join("stylesheet.json")).unwrap()
}

/// Extract press/ and calls/ into `<workdir>/corpus`, persisting alias
/// pairs to `<workdir>/url_map.csv`, and return the store and the table.
fn extract_workdir(workdir: &Path) -> (CorpusStore, AliasTable) {
    let store = CorpusStore::open(&workdir.join("corpus")).unwrap();
    let alias_path = workdir.join("url_map.csv");
    for (dir, classification, format) in [
        ("press", Classification::Press, SourceFormat::Xml),
        ("calls", Classification::Call, SourceFormat::Html),
    ] {
        let processor = ExtractionProcessor::for_format(format, Some(stylesheet()), store.clone()).unwrap();
        let report = processor.extract_directory(&workdir.join(dir), classification).unwrap();
        assert_eq!(report.dropped, 0, "no fixture document should be dropped");
        report.aliases.append_to_csv(&alias_path).unwrap();
    }
    (store.clone(), AliasTable::load_csv(&alias_path).unwrap())
}

fn resolve_workdir(workdir: &Path) -> (ResolvedCorpus, AliasTable) {
    let (store, aliases) = extract_workdir(workdir);
    let records = store.read_records().unwrap();
    let resolver = Resolver::with_heuristics(AnalysisConfig::default().resolution);
    (resolver.resolve(&records, &aliases), aliases)
}

fn record<'a>(corpus: &'a ResolvedCorpus, key: &str) -> &'a ResolvedRecord {
    corpus
        .records
        .iter()
        .find(|r| r.record.node_key() == key)
        .unwrap_or_else(|| panic!("no record keyed '{}'", key))
}

fn build_graph(corpus: &ResolvedCorpus) -> CitationGraph {
    CitationGraphBuilder::with_config(&AnalysisConfig::default().graph).build(corpus)
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_xml_title_extraction() {
    let preprocessor = MarkupPreprocessor::new(stylesheet(), SourceFormat::Xml).unwrap();
    let extraction = preprocessor
        .process_file(&fixtures_dir().join("press/IP-16-001.xml"), Classification::Press)
        .unwrap();

    assert_eq!(extraction.fields.get("title").unwrap(), ["Policy X"]);
    assert_eq!(extraction.fields.get("identifier").unwrap(), ["IP/16/001"]);
    assert_eq!(extraction.fields.get("date").unwrap(), ["2016-01-12"]);
    assert_eq!(
        extraction.fields.get("fulltext").unwrap(),
        ["The Commission adopted Policy X today.", "See the annex."]
    );
    // XML anchors are links only, never aliases
    assert_eq!(extraction.fields.get("links").unwrap(), ["http://eu.example/docs/annex.pdf"]);
    assert!(extraction.aliases.is_empty());
}

#[test]
fn test_html_extraction_and_int_fields() {
    let workdir = scratch_workdir();
    let (store, _) = extract_workdir(workdir.path());
    let records = store.read_records().unwrap();
    assert_eq!(records.len(), 5);

    let call_a = records.iter().find(|r| r.node_key() == "Call A").unwrap();
    assert_eq!(call_a.classification(), Classification::Call);
    assert_eq!(call_a.field("budget").unwrap(), ["4000000"]);
    assert_eq!(call_a.identifiers(), ["CALL-A-2016"]);
    assert_eq!(call_a.fulltext().len(), 2);

    // "n/a" is not an integer: the field is left out
    let call_b = records.iter().find(|r| r.node_key() == "Call B").unwrap();
    assert!(call_b.field("budget").is_none());
    assert_eq!(
        call_b.links(),
        ["http://eu.example/docs/guide-2016.pdf", "http://eu.example/docs/policy-x.pdf"]
    );
}

#[test]
fn test_corpus_store_layout() {
    let workdir = scratch_workdir();
    let (store, _) = extract_workdir(workdir.path());
    for name in ["Policy X.json", "Horizon Funding Rules.json", "Annual Report.json", "Call A.json", "Call B.json"] {
        assert!(store.dir().join(name).exists(), "missing {}", name);
    }
    let lines = std::fs::read_to_string(store.corpus_path()).unwrap();
    assert_eq!(lines.lines().count(), 5);
}

#[test]
fn test_alias_table_is_symmetric() {
    let workdir = scratch_workdir();
    let (_, aliases) = extract_workdir(workdir.path());
    assert_eq!(aliases.title_of("http://eu.example/docs/policy-x.pdf"), Some("policy x"));
    // Only the call pages (HTML) contribute pairs
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases.title_of("http://eu.example/docs/report-annex.pdf"), None);
    for (url, title) in aliases.sorted_entries() {
        assert_eq!(aliases.url_of(title), Some(url));
        assert_eq!(aliases.title_of(url), Some(title));
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_alias_versus_stem_resolution() {
    let workdir = scratch_workdir();
    let (store, aliases) = extract_workdir(workdir.path());
    let records = store.read_records().unwrap();
    let resolver = Resolver::with_heuristics(AnalysisConfig::default().resolution);

    let with_aliases = resolver.resolve(&records, &aliases);
    let call_b = record(&with_aliases, "Call B");
    assert_eq!(
        call_b.cites,
        [
            Citation::Unresolved {
                link: "http://eu.example/docs/guide-2016.pdf".into(),
                stem: "guide-2016".into(),
            },
            Citation::Resolved {
                link: "http://eu.example/docs/policy-x.pdf".into(),
                title: "policy x".into(),
            },
        ]
    );
    assert_eq!(call_b.target_links, ["http://eu.example/docs/policy-x.pdf"]);

    let annual = record(&with_aliases, "Annual Report");
    assert_eq!(
        annual.cites,
        [Citation::Unresolved {
            link: "http://eu.example/docs/report-annex.pdf".into(),
            stem: "report-annex".into(),
        }]
    );

    let without_aliases = resolver.resolve(&records, &AliasTable::new());
    let names: Vec<&str> = record(&without_aliases, "Call B").cites.iter().map(Citation::name).collect();
    assert_eq!(names, ["guide-2016", "policy-x"]);
}

#[test]
fn test_mentions_ignore_case_and_punctuation() {
    let workdir = scratch_workdir();
    let (corpus, _) = resolve_workdir(workdir.path());

    // "As set out in POLICY X, applicants must register."
    let horizon = record(&corpus, "Horizon Funding Rules");
    assert_eq!(horizon.title_mentions, ["policy x"]);
    assert_eq!(record(&corpus, "Call B").identifier_mentions, ["IP/16/001"]);
}

#[test]
fn test_email_links_are_dropped() {
    let workdir = scratch_workdir();
    let (corpus, _) = resolve_workdir(workdir.path());
    let horizon = record(&corpus, "Horizon Funding Rules");
    assert_eq!(horizon.links, ["http://eu.example/docs/policy-x.pdf"]);
    assert!(horizon.target_names().all(|t| !t.contains('@')));
}

#[test]
fn test_targets_cover_cites_and_mentions() {
    let workdir = scratch_workdir();
    let (corpus, _) = resolve_workdir(workdir.path());
    for resolved in &corpus.records {
        for cite in &resolved.cites {
            assert!(resolved.target_names().any(|t| t == cite.name()));
        }
        for mention in &resolved.title_mentions {
            assert!(resolved.target_names().any(|t| t == mention));
        }
    }

    let horizon = record(&corpus, "Horizon Funding Rules");
    let policy = horizon.targets.iter().find(|t| t.name == "policy x").unwrap();
    assert_eq!(policy.provenance, BTreeSet::from([Provenance::Alias, Provenance::Mention]));
}

#[test]
fn test_resolution_is_idempotent() {
    let workdir = scratch_workdir();
    let (corpus, aliases) = resolve_workdir(workdir.path());
    let resolver = Resolver::with_heuristics(AnalysisConfig::default().resolution);
    assert_eq!(resolver.re_resolve(&corpus, &aliases), corpus);
}

// ============================================================================
// Graph
// ============================================================================

#[test]
fn test_shared_target_is_one_node() {
    let workdir = scratch_workdir();
    let (corpus, _) = resolve_workdir(workdir.path());
    let graph = build_graph(&corpus);

    assert_eq!(graph.node_count(), 9);
    assert_eq!(graph.edge_count(), 7);
    assert_eq!(graph.node("policy x").unwrap().side, Side::Target);
    assert_eq!(graph.node("Call A").unwrap().side, Side::Source);

    let top = GraphAnalytics::top_targets(&graph, 1);
    assert_eq!(top[0].title, "policy x");
    assert_eq!(top[0].degree, 4);

    assert_eq!(graph.edge("Call B", "guide-2016").unwrap().provenance_label(), "stem");
    assert_eq!(graph.edge("Policy X", "annex").unwrap().provenance_label(), "stem");
    assert!(graph.contains("report-annex"));
    assert_eq!(graph.edge("Call A", "policy x").unwrap().provenance_label(), "alias,mention");
}

#[test]
fn test_graph_invariants() {
    let workdir = scratch_workdir();
    let (corpus, _) = resolve_workdir(workdir.path());
    let graph = build_graph(&corpus);

    for (_, node) in graph.nodes() {
        assert!(node.title.chars().count() > 1, "short node '{}'", node.title);
    }

    let sizes: Vec<usize> = graph.components().iter().map(CitationGraph::node_count).collect();
    assert_eq!(sizes, [7, 2]);
    for pair in sizes.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

// ============================================================================
// Analysis runs
// ============================================================================

fn analysis_options(workdir: &Path, store: &CorpusStore) -> AnalysisOptions {
    AnalysisOptions {
        corpus_path: store.corpus_path(),
        output_dir: workdir.join("results"),
        name: "fixture".to_string(),
        cached_snapshot: None,
        skip_cache: false,
        profile: false,
    }
}

#[test]
fn test_analysis_writes_artifacts() {
    let workdir = scratch_workdir();
    let (store, aliases) = extract_workdir(workdir.path());
    let options = analysis_options(workdir.path(), &store);

    let report = AnalysisProcessor::new_uncached(AnalysisConfig::default())
        .analyse(&options, &aliases)
        .unwrap();

    assert!(!report.cache_hit);
    assert_eq!(report.records, 5);
    assert_eq!(report.summary.component_sizes, [7, 2]);
    assert_eq!(report.rendered.len(), 2);

    let results = workdir.path().join("results");
    for name in ["fixture.graphml", "fixture.snapshot.json", "summary.json", "0.svg", "1.svg"] {
        assert!(results.join(name).exists(), "missing {}", name);
    }

    let pdfs = std::fs::read_to_string(results.join("additional_pdfs.txt")).unwrap();
    assert_eq!(
        pdfs.lines().collect::<Vec<_>>(),
        [
            "http://eu.example/docs/annex.pdf",
            "http://eu.example/docs/policy-x.pdf",
            "http://eu.example/docs/report-annex.pdf",
            "http://eu.example/docs/guide-2016.pdf",
        ]
    );
    assert!(std::fs::read_to_string(results.join("additional_htmls.txt")).unwrap().is_empty());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(results.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["graph"]["node_count"], 9);
    assert_eq!(summary["records"], 5);
    assert!(summary["run_id"].is_string());

    let snapshot = ResolvedCorpus::load_from_json(&report.snapshot).unwrap();
    assert_eq!(snapshot.len(), 5);
}

#[test]
fn test_snapshot_cache_and_explicit_snapshot() {
    let workdir = scratch_workdir();
    let cache_dir = workdir.path().join("cache");
    let (store, aliases) = extract_workdir(workdir.path());
    let processor =
        AnalysisProcessor::new_cli_with_cache(AnalysisConfig::default(), cache_dir.to_str().unwrap()).unwrap();
    let mut options = analysis_options(workdir.path(), &store);

    let first = processor.analyse(&options, &aliases).unwrap();
    assert!(!first.cache_hit);
    let second = processor.analyse(&options, &aliases).unwrap();
    assert!(second.cache_hit);
    assert_eq!(first.summary, second.summary);

    options.skip_cache = true;
    assert!(!processor.analyse(&options, &aliases).unwrap().cache_hit);

    // A different alias table is a different cache entry
    options.skip_cache = false;
    assert!(!processor.analyse(&options, &AliasTable::new()).unwrap().cache_hit);

    let snapshot_copy = workdir.path().join("saved.snapshot.json");
    std::fs::copy(&first.snapshot, &snapshot_copy).unwrap();
    options.cached_snapshot = Some(snapshot_copy);
    options.output_dir = workdir.path().join("from-snapshot");
    let from_snapshot = processor.analyse(&options, &AliasTable::new()).unwrap();
    assert!(from_snapshot.cache_hit);
    assert_eq!(from_snapshot.summary, first.summary);
}
