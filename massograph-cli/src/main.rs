use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use massograph_cli::fetcher::{
    read_url_list, FetchTargets, ScraperSet, DOWNLOAD_LOG_FILE, FETCH_REPORT_FILE, VISITED_FILE,
};
use massograph_cli::{default_cache_dir, Fetcher};
use massograph_core::corpus::{resolve_corpus_path, CorpusStore};
use massograph_core::processor::ExtractionReport;
use massograph_core::{
    AliasFragment, AliasTable, AnalysisConfig, AnalysisOptions, AnalysisProcessor, Classification,
    ExtractionProcessor, SourceFormat, Stylesheet,
};

#[derive(Parser)]
#[command(name = "massograph")]
#[command(about = "Extract records from institutional documents and graph their citations")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long, global = true)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract records from one directory of documents into a corpus store
    Extract(ExtractArgs),
    /// Resolve a corpus and build the citation graph
    Analyse(AnalyseArgs),
    /// Download the documents listed in a URL file
    Fetch(FetchArgs),
    /// Extract pdfs/, press/ and calls/ of a working directory, then analyse
    Run(RunArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Directory holding the raw documents
    #[arg(short, long)]
    input: PathBuf,

    /// Corpus store directory
    #[arg(short, long, default_value = "corpus")]
    output: PathBuf,

    /// Stylesheet file (JSON, or YAML by extension); required for xml/html
    #[arg(short, long)]
    stylesheet: Option<PathBuf>,

    /// press, call or pdf
    #[arg(short = 'k', long)]
    classification: String,

    /// xml, html or pdf (default: derived from the classification)
    #[arg(short, long)]
    format: Option<String>,

    /// Alias table the observed (url, title) pairs are appended to
    #[arg(long, default_value = "url_map.csv")]
    alias_table: PathBuf,
}

#[derive(Args)]
struct AnalyseArgs {
    /// Corpus file, or a corpus store directory
    #[arg(short, long, default_value = "corpus")]
    input: PathBuf,

    /// Directory for the graph, snapshot, summary and drawings
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// Load this resolved snapshot instead of resolving the corpus
    #[arg(long)]
    cached_df: Option<PathBuf>,

    /// Skip cache and force fresh resolution
    #[arg(long)]
    skip_cache: bool,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Base name of the graph and snapshot files
    #[arg(short, long, default_value = "citations")]
    name: String,

    #[arg(long, default_value = "url_map.csv")]
    alias_table: PathBuf,

    /// Snapshot cache directory (default: platform cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Args)]
struct FetchArgs {
    /// File with one URL per line
    #[arg(short, long)]
    urls: PathBuf,

    #[arg(short, long, default_value = "downloads")]
    output: PathBuf,

    /// Scraper definitions (JSON): netloc → {"xml"|"pdf": {"selector": ...}}
    #[arg(short, long)]
    scrapers: Option<PathBuf>,

    /// Follow each page's XML link
    #[arg(long)]
    xml: bool,

    /// Follow each page's PDF link
    #[arg(long)]
    pdf: bool,

    /// Save the landing page itself (the default when no target is given)
    #[arg(long)]
    html: bool,

    /// Alias table used to name directly fetched PDFs after their title
    #[arg(long, default_value = "url_map.csv")]
    alias_table: PathBuf,

    /// List of URLs fetched by earlier runs
    #[arg(long, default_value = VISITED_FILE)]
    visited: PathBuf,

    /// Append-only log of saved files and their source URLs
    #[arg(long, default_value = DOWNLOAD_LOG_FILE)]
    download_log: PathBuf,

    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    #[arg(short, long, default_value = "citations")]
    name: String,

    /// Stylesheet file (default: <workdir>/stylesheet.json)
    #[arg(short, long)]
    stylesheet: Option<PathBuf>,

    #[arg(short, long)]
    config: Option<String>,

    /// Truncate the corpus log and the visited list before extracting
    #[arg(long)]
    cleanup: bool,

    #[arg(long)]
    skip_cache: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    println!("🦀 Massograph");

    match cli.command {
        Command::Extract(args) => extract(args),
        Command::Analyse(args) => analyse(args, cli.profile),
        Command::Fetch(args) => fetch(args),
        Command::Run(args) => run(args, cli.profile),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Format implied by a classification when none is given.
fn default_format(classification: Classification) -> SourceFormat {
    match classification {
        Classification::Press => SourceFormat::Xml,
        Classification::Call => SourceFormat::Html,
        Classification::Pdf => SourceFormat::Pdf,
    }
}

fn load_stylesheet(path: &Path) -> Result<Stylesheet> {
    let stylesheet = Stylesheet::load_from_file(path)
        .with_context(|| format!("Failed to load stylesheet {}", path.display()))?;
    println!("📋 Loaded stylesheet from: {}", path.display());
    Ok(stylesheet)
}

fn extract(args: ExtractArgs) -> Result<()> {
    let classification: Classification = args.classification.parse()?;
    let format = match &args.format {
        Some(format) => format.parse()?,
        None => default_format(classification),
    };
    let stylesheet = args.stylesheet.as_deref().map(load_stylesheet).transpose()?;

    let store = CorpusStore::open(&args.output)?;
    let processor = ExtractionProcessor::for_format(format, stylesheet, store)?;
    println!("📄 Extracting {} {} documents from {}", classification, format, args.input.display());

    let report = processor.extract_directory(&args.input, classification)?;
    print_extraction(&report);
    save_aliases(&report.aliases, &args.alias_table)?;
    Ok(())
}

fn print_extraction(report: &ExtractionReport) {
    println!(
        "✅ {} records written, {} documents dropped, {} alias pairs",
        report.written.len(),
        report.dropped,
        report.aliases.len()
    );
}

fn save_aliases(fragment: &AliasFragment, alias_table: &Path) -> Result<()> {
    if fragment.is_empty() {
        return Ok(());
    }
    fragment
        .append_to_csv(alias_table)
        .with_context(|| format!("Failed to update alias table {}", alias_table.display()))?;
    println!("💾 Appended {} alias pairs to {}", fragment.len(), alias_table.display());
    Ok(())
}

fn analyse(args: AnalyseArgs, profile: bool) -> Result<()> {
    let config = load_config(args.config.as_deref());
    let aliases = AliasTable::load_csv(&args.alias_table)
        .with_context(|| format!("Failed to load alias table {}", args.alias_table.display()))?;
    let cache_dir = args.cache_dir.unwrap_or_else(default_cache_dir);

    let options = AnalysisOptions {
        corpus_path: resolve_corpus_path(&args.input),
        output_dir: args.output,
        name: args.name,
        cached_snapshot: args.cached_df,
        skip_cache: args.skip_cache,
        profile,
    };
    run_analysis(config, &cache_dir, &options, &aliases)
}

fn load_config(path: Option<&str>) -> AnalysisConfig {
    let config = AnalysisConfig::load_with_fallback(path);
    match path {
        Some(path) => println!("📋 Loaded config from: {}", path),
        None => println!("📋 Using default config"),
    }
    config
}

fn run_analysis(
    config: AnalysisConfig,
    cache_dir: &Path,
    options: &AnalysisOptions,
    aliases: &AliasTable,
) -> Result<()> {
    let cache_dir = cache_dir.to_string_lossy();
    let processor = AnalysisProcessor::new_cli_with_cache(config, &cache_dir)?;
    println!("🔗 Analysing {}", options.corpus_path.display());

    let report = processor.analyse(options, aliases)?;
    println!("✅ Analysis complete (run {})", report.run_id);
    println!("📊 Graph metrics:");
    println!("   - Records: {}", report.records);
    println!("   - Nodes: {}", report.summary.node_count);
    println!("   - Edges: {}", report.summary.edge_count);
    println!("   - Components: {}", report.summary.component_count);
    println!("💾 Graph saved to: {}", report.graphml.display());
    println!("💾 Snapshot saved to: {}", report.snapshot.display());
    println!(
        "🖼️  {} components drawn, {} further PDFs and {} HTML pages linked",
        report.rendered.len(),
        report.additional_pdfs.len(),
        report.additional_htmls.len()
    );
    Ok(())
}

fn fetch(args: FetchArgs) -> Result<()> {
    let config = load_config(args.config.as_deref());
    let urls = read_url_list(&args.urls)?;
    println!("🌐 Fetching {} URLs into {}", urls.len(), args.output.display());

    let scrapers = match &args.scrapers {
        Some(path) => {
            let scrapers = ScraperSet::load(path)?;
            println!("📋 Loaded {} scraper definitions from: {}", scrapers.len(), path.display());
            scrapers
        }
        None => ScraperSet::default(),
    };
    let aliases = AliasTable::load_csv(&args.alias_table)
        .with_context(|| format!("Failed to load alias table {}", args.alias_table.display()))?;

    let fetcher = Fetcher::new(&args.output, &args.visited, config.fetch)?
        .with_scrapers(scrapers)
        .with_targets(FetchTargets::from_flags(args.xml, args.pdf, args.html))
        .with_aliases(aliases)
        .with_download_log(&args.download_log);
    let report = fetcher.fetch_all(&urls)?;
    println!(
        "✅ {} fetched, {} already visited, {} failed",
        report.fetched.len(),
        report.skipped,
        report.failed
    );
    let report_path = args.output.join(FETCH_REPORT_FILE);
    report.save(&report_path)?;
    println!("💾 Fetch report saved to: {}", report_path.display());
    Ok(())
}

fn run(args: RunArgs, profile: bool) -> Result<()> {
    let workdir = args.workdir;
    let store = CorpusStore::open(&workdir.join("corpus"))?;
    let alias_table = workdir.join("url_map.csv");

    if args.cleanup {
        store.truncate()?;
        let visited = workdir.join(VISITED_FILE);
        if visited.exists() {
            std::fs::write(&visited, "")
                .with_context(|| format!("Failed to truncate {}", visited.display()))?;
        }
        println!("🧹 Cleared corpus log and visited list");
    }

    let stylesheet_path = args
        .stylesheet
        .unwrap_or_else(|| workdir.join("stylesheet.json"));
    let batches = [
        ("pdfs", Classification::Pdf, SourceFormat::Pdf),
        ("press", Classification::Press, SourceFormat::Xml),
        ("calls", Classification::Call, SourceFormat::Html),
    ];

    let mut fragment = AliasFragment::new();
    for (dir, classification, format) in batches {
        let input = workdir.join(dir);
        if !input.is_dir() {
            println!("⚠️  No {}/ directory, skipping {} documents", dir, classification);
            continue;
        }
        let stylesheet = match format {
            SourceFormat::Pdf => None,
            _ => Some(load_stylesheet(&stylesheet_path)?),
        };
        println!("📄 Extracting {} from {}", classification, input.display());
        let processor = ExtractionProcessor::for_format(format, stylesheet, store.clone())?;
        let report = processor.extract_directory(&input, classification)?;
        print_extraction(&report);
        fragment.extend(report.aliases);
    }
    save_aliases(&fragment, &alias_table)?;

    let config = load_config(args.config.as_deref());
    let aliases = AliasTable::load_csv(&alias_table)
        .with_context(|| format!("Failed to load alias table {}", alias_table.display()))?;
    let options = AnalysisOptions {
        corpus_path: store.corpus_path(),
        output_dir: workdir.join("results"),
        name: args.name,
        cached_snapshot: None,
        skip_cache: args.skip_cache,
        profile,
    };
    run_analysis(config, &workdir.join("cache"), &options, &aliases)
}
