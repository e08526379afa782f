use crate::alias::{AliasFragment, AliasTable};
use crate::cache::{SnapshotCacheKey, SnapshotCacheValue};
use crate::config::AnalysisConfig;
use crate::corpus::{read_corpus, CorpusStore};
use crate::graphs::{CitationGraphBuilder, GraphAnalytics, GraphSummary, SvgRenderer};
use crate::normalizer::RecordNormalizer;
use crate::preprocessors::{MarkupPreprocessor, Preprocessor};
use crate::resolver::Resolver;
use crate::storage::{
    calculate_alias_hash, calculate_config_hash, calculate_corpus_hash, FileStorage, NoOpStorage,
    SnapshotStorage,
};
use crate::stylesheet::Stylesheet;
use crate::types::*;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;
use walkdir::WalkDir;

/// Number of targets listed in the run summary
const TOP_TARGETS: usize = 20;
pub const ADDITIONAL_PDFS_FILE: &str = "additional_pdfs.txt";
pub const ADDITIONAL_HTMLS_FILE: &str = "additional_htmls.txt";
pub const SUMMARY_FILE: &str = "summary.json";

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Outcome of one extraction batch.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub written: Vec<PathBuf>,
    pub dropped: usize,
    /// Alias pairs observed in this batch, to be merged after all batches
    pub aliases: AliasFragment,
}

/// Raw documents of one directory → records in a corpus store.
pub struct ExtractionProcessor {
    preprocessor: Box<dyn Preprocessor>,
    normalizer: RecordNormalizer,
    store: CorpusStore,
}

impl ExtractionProcessor {
    /// Create ExtractionProcessor with full dependency injection
    pub fn new_with_dependencies(preprocessor: Box<dyn Preprocessor>, store: CorpusStore) -> Self {
        Self {
            preprocessor,
            normalizer: RecordNormalizer::new(),
            store,
        }
    }

    /// Processor for one source format. Markup formats need a stylesheet.
    pub fn for_format(
        format: SourceFormat,
        stylesheet: Option<Stylesheet>,
        store: CorpusStore,
    ) -> Result<Self> {
        let preprocessor: Box<dyn Preprocessor> = match format {
            SourceFormat::Pdf => Self::pdf_preprocessor()?,
            SourceFormat::Xml | SourceFormat::Html => {
                let Some(stylesheet) = stylesheet else {
                    bail!("a stylesheet is required to extract {} documents", format);
                };
                Box::new(MarkupPreprocessor::new(stylesheet, format)?)
            }
        };
        Ok(Self::new_with_dependencies(preprocessor, store))
    }

    #[cfg(feature = "pdf-extract-backend")]
    fn pdf_preprocessor() -> Result<Box<dyn Preprocessor>> {
        Ok(Box::new(crate::preprocessors::PdfPreprocessor::new_with_pdf_extract()))
    }

    #[cfg(not(feature = "pdf-extract-backend"))]
    fn pdf_preprocessor() -> Result<Box<dyn Preprocessor>> {
        bail!("no PDF backend compiled in (enable the pdf-extract-backend feature)")
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    /// Extract every supported file directly inside `input_dir`, in file
    /// name order. Per-document failures are logged and counted; only
    /// corpus store I/O aborts the batch.
    pub fn extract_directory(
        &self,
        input_dir: &Path,
        classification: Classification,
    ) -> Result<ExtractionReport> {
        if !input_dir.is_dir() {
            bail!("input directory does not exist: {}", input_dir.display());
        }

        let mut report = ExtractionReport::default();
        let entries = WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", input_dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.preprocessor.supports_file_type(path) {
                continue;
            }

            match self.extract_file(path, classification, &mut report.aliases)? {
                Some(written) => report.written.push(written),
                None => report.dropped += 1,
            }
        }

        tracing::info!(
            "{}: {} records written, {} dropped, {} alias pairs from {}",
            self.preprocessor.name(),
            report.written.len(),
            report.dropped,
            report.aliases.len(),
            input_dir.display()
        );
        Ok(report)
    }

    /// Extract, normalize and store one file. `Ok(None)` means the document
    /// produced no record.
    pub fn extract_file(
        &self,
        path: &Path,
        classification: Classification,
        aliases: &mut AliasFragment,
    ) -> Result<Option<PathBuf>> {
        let extraction = match self.preprocessor.process_file(path, classification) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::error!("Extraction failed for {}: {:#}", path.display(), e);
                return Ok(None);
            }
        };
        aliases.extend(extraction.aliases);

        let local_source = path.display().to_string();
        let normalized = match self.normalizer.normalize(extraction.fields, &local_source) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!("Dropping {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let written = self
            .store
            .append(&normalized)
            .with_context(|| format!("failed to store record for {}", path.display()))?;
        tracing::debug!("Stored '{}' as {}", normalized.key, written.display());
        Ok(Some(written))
    }
}

/// Inputs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Corpus log to analyse
    pub corpus_path: PathBuf,
    pub output_dir: PathBuf,
    /// Stem of `<name>.graphml` and `<name>.snapshot.json`
    pub name: String,
    /// Resolved snapshot to load instead of resolving
    pub cached_snapshot: Option<PathBuf>,
    pub skip_cache: bool,
    pub profile: bool,
}

/// Files and figures produced by one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub records: usize,
    pub cache_hit: bool,
    pub summary: GraphSummary,
    pub graphml: PathBuf,
    pub snapshot: PathBuf,
    pub rendered: Vec<PathBuf>,
    pub additional_pdfs: Vec<String>,
    pub additional_htmls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    name: &'a str,
    corpus: String,
    records: usize,
    cache_hit: bool,
    recognizer: &'a str,
    graph: &'a GraphSummary,
}

/// Corpus → resolved corpus → citation graph and its artifacts.
pub struct AnalysisProcessor {
    resolver: Resolver,
    storage: Box<dyn SnapshotStorage>,
    config: AnalysisConfig,
}

impl AnalysisProcessor {
    /// Create AnalysisProcessor with full dependency injection
    pub fn new_with_dependencies(
        resolver: Resolver,
        storage: Box<dyn SnapshotStorage>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            resolver,
            storage,
            config,
        }
    }

    /// Convenience constructor for CLI usage: heuristic recognizer and a
    /// file-backed snapshot cache.
    pub fn new_cli_with_cache(config: AnalysisConfig, cache_dir: &str) -> Result<Self> {
        let resolver = Resolver::with_heuristics(config.resolution.clone());
        let storage = Box::new(FileStorage::new(cache_dir)?);
        Ok(Self::new_with_dependencies(resolver, storage, config))
    }

    /// Heuristic recognizer, no snapshot cache.
    pub fn new_uncached(config: AnalysisConfig) -> Self {
        let resolver = Resolver::with_heuristics(config.resolution.clone());
        Self::new_with_dependencies(resolver, Box::new(NoOpStorage::new()), config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyse(&self, options: &AnalysisOptions, aliases: &AliasTable) -> Result<AnalysisReport> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(options.profile);
        std::fs::create_dir_all(&options.output_dir).with_context(|| {
            format!("failed to create output directory {}", options.output_dir.display())
        })?;

        let (corpus, cache_hit) = self.load_or_resolve(options, aliases, &mut profiler)?;

        let graph = profiler.time_step("Graph Construction", || {
            CitationGraphBuilder::with_config(&self.config.graph).build(&corpus)
        });
        let components = profiler.time_step("Connected Components", || {
            graph.largest_components(self.config.rendering.max_components)
        });
        let summary = profiler.time_step("Graph Analytics", || {
            GraphAnalytics::summarize(&graph, TOP_TARGETS)
        });

        let rendered = profiler.time_step("SVG Rendering", || {
            SvgRenderer::new(self.config.rendering.clone())
                .render_components(&components, &options.output_dir)
        })?;

        let graphml = options.output_dir.join(format!("{}.graphml", options.name));
        let snapshot = options.output_dir.join(format!("{}.snapshot.json", options.name));
        let (additional_pdfs, additional_htmls) = additional_urls(&corpus);
        let run_id = Uuid::new_v4();

        profiler.time_step("Write Outputs", || -> Result<()> {
            graph
                .save_graphml(&graphml)
                .with_context(|| format!("failed to write {}", graphml.display()))?;
            corpus
                .save_to_json(&snapshot)
                .with_context(|| format!("failed to write {}", snapshot.display()))?;
            write_lines(&options.output_dir.join(ADDITIONAL_PDFS_FILE), &additional_pdfs)?;
            write_lines(&options.output_dir.join(ADDITIONAL_HTMLS_FILE), &additional_htmls)?;

            let run_summary = RunSummary {
                run_id,
                created_at: Utc::now(),
                name: &options.name,
                corpus: options.corpus_path.display().to_string(),
                records: corpus.len(),
                cache_hit,
                recognizer: self.resolver.recognizer_name(),
                graph: &summary,
            };
            let summary_path = options.output_dir.join(SUMMARY_FILE);
            std::fs::write(&summary_path, serde_json::to_string_pretty(&run_summary)?)
                .with_context(|| format!("failed to write {}", summary_path.display()))?;
            Ok(())
        })?;

        profiler.print_summary();
        tracing::info!(
            "Analysis '{}' finished in {:.0}ms: {} records, {} nodes, {} edges, {} components ({} rendered)",
            options.name,
            start_time.elapsed().as_millis(),
            corpus.len(),
            summary.node_count,
            summary.edge_count,
            summary.component_count,
            rendered.len()
        );

        Ok(AnalysisReport {
            run_id,
            records: corpus.len(),
            cache_hit,
            summary,
            graphml,
            snapshot,
            rendered,
            additional_pdfs,
            additional_htmls,
        })
    }

    /// Resolved corpus from, in order: an explicit snapshot, the snapshot
    /// cache, or a fresh resolution (stored back unless caching is off).
    fn load_or_resolve(
        &self,
        options: &AnalysisOptions,
        aliases: &AliasTable,
        profiler: &mut StepProfiler,
    ) -> Result<(ResolvedCorpus, bool)> {
        if let Some(path) = &options.cached_snapshot {
            let corpus = profiler.time_step("Snapshot Load", || ResolvedCorpus::load_from_json(path))
                .with_context(|| format!("failed to load snapshot {}", path.display()))?;
            println!("📦 Loaded resolved snapshot: {} ({} records)", path.display(), corpus.len());
            return Ok((corpus, true));
        }

        let corpus_bytes = std::fs::read(&options.corpus_path)
            .with_context(|| format!("failed to read corpus {}", options.corpus_path.display()))?;
        let cache_key = profiler.time_step("Cache Key Generation", || {
            Ok::<SnapshotCacheKey, anyhow::Error>(SnapshotCacheKey::new(
                calculate_corpus_hash(&corpus_bytes),
                calculate_alias_hash(aliases),
                calculate_config_hash(&self.config)?,
                self.resolver.recognizer_name(),
            ))
        })?;

        let cached = if options.skip_cache {
            println!("🚫 Skipping cache lookup (--skip-cache enabled)");
            None
        } else {
            profiler.time_step("Cache Lookup", || self.storage.get_snapshot(&cache_key))?
        };
        if let Some(cached) = cached {
            println!(
                "🎯 Cache hit: resolved corpus from {} ({} records)",
                cached.created_at.to_rfc3339(),
                cached.corpus.len()
            );
            return Ok((cached.corpus, true));
        }

        let records = profiler.time_step("Corpus Load", || read_corpus(&options.corpus_path))?;
        let start = Instant::now();
        let corpus = profiler.time_step("Resolution", || self.resolver.resolve(&records, aliases));

        if options.skip_cache {
            println!("🚫 Skipping cache storage (--skip-cache enabled)");
        } else {
            profiler.time_step("Cache Storage", || {
                let cache_value = SnapshotCacheValue::new(corpus.clone(), start.elapsed().as_millis() as u64);
                self.storage.store_snapshot(&cache_key, &cache_value)
            })?;
        }
        Ok((corpus, false))
    }
}

/// Distinct links across the corpus that point at further PDF or HTML
/// documents, in first-seen order.
pub fn additional_urls(corpus: &ResolvedCorpus) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut pdfs = Vec::new();
    let mut htmls = Vec::new();
    for link in corpus.records.iter().flat_map(|r| r.links.iter()) {
        if !seen.insert(link.as_str()) {
            continue;
        }
        let lower = link.to_lowercase();
        if lower.ends_with(".pdf") {
            pdfs.push(link.clone());
        } else if lower.ends_with(".html") {
            htmls.push(link.clone());
        }
    }
    (pdfs, htmls)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
