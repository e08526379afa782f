//! Fetcher - download the documents listed in a URL file
//!
//! Requests are made one URL at a time with a fixed pause in between.
//! Every handled URL is appended to a visited list so later runs skip it.
//!
//! - URLs ending in `.pdf` are downloaded directly. When the alias table
//!   knows the URL, the file is named after its title so the extracted
//!   PDF record lands on the same graph node as the citations to it.
//! - Any other URL is a landing page. The page itself is saved when HTML
//!   output is enabled. For XML and PDF output the scraper definition of
//!   the page's host names a selector; the first link it matches is
//!   resolved against the page URL and downloaded.
//!
//! Every saved file is recorded in an append-only download log
//! (`file;source url`).

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use massograph_core::alias::AliasTable;
use massograph_core::config::FetchConfig;
use massograph_core::normalizer::sanitize_file_stem;
use massograph_core::preprocessors::markup::select_links;
use massograph_core::preprocessors::ParsedMarkup;
use massograph_core::SourceFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const VISITED_FILE: &str = "visited_links.txt";
pub const DOWNLOAD_LOG_FILE: &str = "download_log.csv";
pub const FETCH_REPORT_FILE: &str = "fetch_report.json";

/// Selector locating one kind of linked document on a landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSelector {
    pub selector: String,
}

/// How to find the XML and PDF versions of a page on one host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScraperDefinition {
    #[serde(default)]
    pub xml: Option<LinkSelector>,
    #[serde(default)]
    pub pdf: Option<LinkSelector>,
}

impl ScraperDefinition {
    fn selector_for(&self, kind: LinkedDocument) -> Option<&str> {
        let selector = match kind {
            LinkedDocument::Xml => self.xml.as_ref(),
            LinkedDocument::Pdf => self.pdf.as_ref(),
        };
        selector.map(|s| s.selector.as_str())
    }
}

/// Scraper definitions keyed by netloc (`host` or `host:port`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScraperSet {
    scrapers: HashMap<String, ScraperDefinition>,
}

impl ScraperSet {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scraper definitions: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid scraper definitions: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }

    /// Definition for the URL's netloc; `host:port` takes precedence over
    /// the bare host.
    pub fn for_url(&self, url: &Url) -> Option<&ScraperDefinition> {
        let host = url.host_str()?;
        url.port()
            .and_then(|port| self.scrapers.get(&format!("{}:{}", host, port)))
            .or_else(|| self.scrapers.get(host))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkedDocument {
    Xml,
    Pdf,
}

impl LinkedDocument {
    fn as_str(&self) -> &'static str {
        match self {
            LinkedDocument::Xml => "xml",
            LinkedDocument::Pdf => "pdf",
        }
    }
}

/// Which documents to save for a landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTargets {
    pub xml: bool,
    pub pdf: bool,
    pub html: bool,
}

impl FetchTargets {
    /// With no target selected, only the page itself is saved.
    pub fn from_flags(xml: bool, pdf: bool, html: bool) -> Self {
        if !(xml || pdf || html) {
            return Self::default();
        }
        Self { xml, pdf, html }
    }

    fn linked(&self) -> Vec<LinkedDocument> {
        let mut kinds = Vec::new();
        if self.xml {
            kinds.push(LinkedDocument::Xml);
        }
        if self.pdf {
            kinds.push(LinkedDocument::Pdf);
        }
        kinds
    }
}

impl Default for FetchTargets {
    fn default() -> Self {
        Self {
            xml: false,
            pdf: false,
            html: true,
        }
    }
}

/// Append-only `file;source url` log of saved documents.
pub struct DownloadLog {
    path: PathBuf,
}

impl DownloadLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn append(&self, file_name: &str, source_url: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .quote(b'"')
            .has_headers(false)
            .from_writer(file);
        writer.write_record([file_name, source_url])?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchedDocument {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize)]
pub struct FetchReport {
    pub fetched: Vec<FetchedDocument>,
    pub skipped: usize,
    pub failed: usize,
}

impl FetchReport {
    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

pub struct Fetcher {
    output_dir: PathBuf,
    visited_path: PathBuf,
    download_log: DownloadLog,
    config: FetchConfig,
    agent: ureq::Agent,
    scrapers: ScraperSet,
    targets: FetchTargets,
    aliases: AliasTable,
}

impl Fetcher {
    pub fn new(output_dir: &Path, visited_path: &Path, config: FetchConfig) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
        let agent = ureq::AgentBuilder::new()
            .user_agent(&config.user_agent)
            .build();
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            visited_path: visited_path.to_path_buf(),
            download_log: DownloadLog::new(Path::new(DOWNLOAD_LOG_FILE)),
            config,
            agent,
            scrapers: ScraperSet::default(),
            targets: FetchTargets::default(),
            aliases: AliasTable::new(),
        })
    }

    pub fn with_scrapers(mut self, scrapers: ScraperSet) -> Self {
        self.scrapers = scrapers;
        self
    }

    pub fn with_targets(mut self, targets: FetchTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Alias table used to name directly fetched PDFs after their title
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_download_log(mut self, path: &Path) -> Self {
        self.download_log = DownloadLog::new(path);
        self
    }

    /// URLs already fetched by earlier runs
    pub fn load_visited(&self) -> Result<HashSet<String>> {
        if !self.visited_path.exists() {
            return Ok(HashSet::new());
        }
        let content = fs::read_to_string(&self.visited_path)
            .with_context(|| format!("Failed to read {}", self.visited_path.display()))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Fetch every URL not yet visited. Failures are logged and skipped;
    /// only bookkeeping I/O (visited list, download log) is fatal.
    pub fn fetch_all(&self, urls: &[String]) -> Result<FetchReport> {
        let mut visited = self.load_visited()?;
        let mut report = FetchReport::default();
        let delay = Duration::from_millis(self.config.delay_ms);
        let mut first_request = true;

        let pending = urls.iter().filter(|u| !visited.contains(*u)).count();
        tracing::info!("{} new URLs to fetch", pending);

        for url in urls {
            if visited.contains(url) {
                report.skipped += 1;
                continue;
            }
            if !first_request {
                std::thread::sleep(delay);
            }
            first_request = false;

            match self.fetch_one(url) {
                Ok(documents) => {
                    self.mark_visited(url)?;
                    visited.insert(url.clone());
                    for document in &documents {
                        println!("📥 {} → {}", document.url, document.path.display());
                    }
                    report.fetched.extend(documents);
                }
                Err(e) => {
                    tracing::error!("Failed to fetch {}: {:#}", url, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Fetched {} documents ({} URLs already visited, {} failed)",
            report.fetched.len(),
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    fn fetch_one(&self, url: &str) -> Result<Vec<FetchedDocument>> {
        let parsed = Url::parse(url).with_context(|| format!("Malformed URL {}", url))?;
        if is_pdf_url(&parsed) {
            tracing::info!("Directly getting PDF {}", url);
            let name = pdf_file_name(url, &self.aliases);
            return Ok(vec![self.save(url, url, &name)?]);
        }
        self.fetch_page(&parsed)
    }

    /// Landing page: save it and/or follow its scraper selectors.
    fn fetch_page(&self, page: &Url) -> Result<Vec<FetchedDocument>> {
        let kinds = self.targets.linked();
        let scraper = self.scrapers.for_url(page);
        if !kinds.is_empty() && scraper.is_none() {
            bail!("No scraper for {}, cannot crawl {}", netloc(page), page);
        }

        let contents = self.get_bytes(page.as_str())?;
        let mut documents = Vec::new();

        if self.targets.html {
            let name = html_file_name(page.as_str());
            documents.push(self.write(page.as_str(), page.as_str(), &name, &contents)?);
        }

        if let Some(scraper) = scraper {
            let markup = ParsedMarkup::parse(&contents, SourceFormat::Html)
                .with_context(|| format!("Failed to parse {}", page))?;
            for kind in kinds {
                let Some(selector) = scraper.selector_for(kind) else {
                    tracing::warn!("Scraper for {} has no {} selector", netloc(page), kind.as_str());
                    continue;
                };
                match follow_link(&markup, page, selector) {
                    Ok(Some(target)) => {
                        let name = file_name_for(target.as_str());
                        match self.save(target.as_str(), page.as_str(), &name) {
                            Ok(document) => documents.push(document),
                            Err(e) => tracing::error!("Could not download {}: {:#}", target, e),
                        }
                    }
                    Ok(None) => tracing::warn!("No {} link on {}", kind.as_str(), page),
                    Err(e) => tracing::error!("Bad {} selector for {}: {:#}", kind.as_str(), page, e),
                }
            }
        }
        Ok(documents)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("Failed to download from {}", url))?;
        let mut contents = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut contents)
            .with_context(|| format!("Failed to read response from {}", url))?;
        Ok(contents)
    }

    /// Download `url` into `<output>/<name>`, logging it against `source`.
    fn save(&self, url: &str, source: &str, name: &str) -> Result<FetchedDocument> {
        let contents = self.get_bytes(url)?;
        self.write(url, source, name, &contents)
    }

    fn write(&self, url: &str, source: &str, name: &str, contents: &[u8]) -> Result<FetchedDocument> {
        let dest = self.output_dir.join(name);
        fs::write(&dest, contents).with_context(|| format!("Failed to create file: {}", dest.display()))?;
        self.download_log.append(name, source)?;
        Ok(FetchedDocument {
            url: url.to_string(),
            path: dest,
            bytes: contents.len() as u64,
            fetched_at: Utc::now(),
        })
    }

    fn mark_visited(&self, url: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.visited_path)
            .with_context(|| format!("Failed to open {}", self.visited_path.display()))?;
        writeln!(file, "{}", url)?;
        Ok(())
    }
}

fn netloc(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn is_pdf_url(url: &Url) -> bool {
    url.path().to_lowercase().ends_with(".pdf")
}

/// First link matched by `selector` on a landing page, resolved against
/// the page URL.
pub fn follow_link(markup: &ParsedMarkup, page: &Url, selector: &str) -> Result<Option<Url>> {
    let links = select_links(markup, selector).map_err(|e| anyhow!("{}", e))?;
    let Some(href) = links.first() else {
        return Ok(None);
    };
    let target = page
        .join(href.trim())
        .with_context(|| format!("Cannot resolve {} against {}", href, page))?;
    Ok(Some(target))
}

/// Non-empty, non-comment lines of a URL list file
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Local file name for a URL: its last path segment, or a hash of the URL
/// when the path ends in `/`.
pub fn file_name_for(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split_once('/')
        .map(|(_, path)| path.rsplit('/').next().unwrap_or(""))
        .unwrap_or("");
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '\\' | ':' | '*' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
        return format!("{}.html", &digest[..16]);
    }
    cleaned
}

/// `<title>.pdf` when the alias table knows the URL, else the URL's own
/// file name.
pub fn pdf_file_name(url: &str, aliases: &AliasTable) -> String {
    let titled = aliases
        .title_of(url)
        .map(sanitize_file_stem)
        .filter(|stem| !stem.is_empty());
    match titled {
        Some(stem) => format!("{}.pdf", stem),
        None => {
            let name = file_name_for(url);
            if name.to_lowercase().ends_with(".pdf") {
                name
            } else {
                format!("{}.pdf", name.trim_end_matches(".html"))
            }
        }
    }
}

/// A saved landing page is named after its whole URL.
pub fn html_file_name(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures").join(name)
    }

    /// Serve `routes` over HTTP on localhost for exactly `requests` requests.
    fn serve(routes: Vec<(String, Vec<u8>)>, requests: usize) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = match routes.iter().find(|(p, _)| *p == path) {
                    Some((_, body)) => ("200 OK", body.clone()),
                    None => ("404 Not Found", Vec::new()),
                };
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                )
                .unwrap();
                stream.write_all(&body).unwrap();
                seen.push(path);
            }
            seen
        });
        (base, handle)
    }

    fn quick_config() -> FetchConfig {
        FetchConfig {
            delay_ms: 0,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name_for("http://eu.example/docs/policy-x.pdf"), "policy-x.pdf");
        assert_eq!(file_name_for("https://eu.example/call.html?lang=en#top"), "call.html");

        let hashed = file_name_for("https://eu.example/news/");
        assert_eq!(hashed.len(), 16 + ".html".len());
        assert_eq!(hashed, file_name_for("https://eu.example/news/"));
        assert_ne!(hashed, file_name_for("https://eu.example/other/"));
        assert!(file_name_for("https://eu.example").ends_with(".html"));

        assert_eq!(html_file_name("http://eu.example/press/IP-16-001"), "http___eu.example_press_IP-16-001");
    }

    #[test]
    fn test_pdfs_are_named_by_alias_title() {
        let mut aliases = AliasTable::new();
        aliases.insert("http://eu.example/docs/policy-x.pdf", "Policy  X");
        aliases.insert("http://eu.example/docs/a.pdf", "Work programme 2016/17");

        assert_eq!(pdf_file_name("http://eu.example/docs/policy-x.pdf", &aliases), "policy x.pdf");
        assert_eq!(pdf_file_name("http://eu.example/docs/a.pdf", &aliases), "work programme 2016_17.pdf");
        assert_eq!(pdf_file_name("http://eu.example/docs/guide-2016.pdf", &aliases), "guide-2016.pdf");
    }

    #[test]
    fn test_scraper_lookup_by_netloc() {
        let scrapers = ScraperSet::load(&fixture("scrapers.json")).unwrap();
        assert_eq!(scrapers.len(), 2);

        let press = Url::parse("https://europa.example/rapid/press-release_IP-16-001_en.htm").unwrap();
        let definition = scrapers.for_url(&press).unwrap();
        assert_eq!(definition.selector_for(LinkedDocument::Pdf), Some("//a[@class='pdf']"));
        assert!(scrapers.for_url(&Url::parse("https://unknown.example/x").unwrap()).is_none());

        let local = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(netloc(&local), "127.0.0.1:8080");
        assert!(scrapers.for_url(&local).is_some());
    }

    #[test]
    fn test_follow_link_resolves_relative_hrefs() {
        let page_bytes = fs::read(fixture("landing.html")).unwrap();
        let markup = ParsedMarkup::parse(&page_bytes, SourceFormat::Html).unwrap();
        let page = Url::parse("https://europa.example/rapid/press/IP-16-001").unwrap();

        let pdf = follow_link(&markup, &page, "//a[@class='pdf']").unwrap().unwrap();
        assert_eq!(pdf.as_str(), "https://europa.example/rapid/docs/IP-16-001.pdf");
        let xml = follow_link(&markup, &page, "//a[@class='xml']/@href").unwrap().unwrap();
        assert_eq!(xml.as_str(), "https://europa.example/xml/IP-16-001.xml");

        assert!(follow_link(&markup, &page, "//a[@class='doc']").unwrap().is_none());
        assert!(follow_link(&markup, &page, "//a[").is_err());
    }

    #[test]
    fn test_download_log_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOWNLOAD_LOG_FILE);
        let log = DownloadLog::new(&path);
        log.append("IP-16-001.xml", "http://eu.example/press/IP-16-001").unwrap();
        log.append("policy x.pdf", "http://eu.example/docs/policy-x.pdf").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "IP-16-001.xml;http://eu.example/press/IP-16-001\npolicy x.pdf;http://eu.example/docs/policy-x.pdf\n"
        );
    }

    #[test]
    fn test_url_list_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        fs::write(&path, "# seed\nhttp://eu.example/a.pdf\n\n  http://eu.example/b.html  \n").unwrap();
        assert_eq!(
            read_url_list(&path).unwrap(),
            ["http://eu.example/a.pdf", "http://eu.example/b.html"]
        );
    }

    #[test]
    fn test_visited_urls_are_not_requested() {
        let dir = tempfile::tempdir().unwrap();
        let visited = dir.path().join(VISITED_FILE);
        fs::write(&visited, "http://eu.example/a.pdf\n").unwrap();

        let fetcher = Fetcher::new(&dir.path().join("out"), &visited, FetchConfig::default()).unwrap();
        let report = fetcher.fetch_all(&["http://eu.example/a.pdf".to_string()]).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(report.fetched.is_empty());
        assert_eq!(report.failed, 0);

        let report_path = dir.path().join(FETCH_REPORT_FILE);
        report.save(&report_path).unwrap();
        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(saved["skipped"], 1);
        assert!(saved["fetched"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_pages_without_scraper_fail_and_stay_unvisited() {
        let dir = tempfile::tempdir().unwrap();
        let visited = dir.path().join(VISITED_FILE);
        let fetcher = Fetcher::new(&dir.path().join("out"), &visited, quick_config())
            .unwrap()
            .with_targets(FetchTargets::from_flags(true, false, false))
            .with_download_log(&dir.path().join(DOWNLOAD_LOG_FILE));

        // Rejected before any request is made
        let report = fetcher.fetch_all(&["http://unknown.example/page".to_string()]).unwrap();
        assert_eq!(report.failed, 1);
        assert!(fetcher.load_visited().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_follows_scraper_selectors() {
        let landing = fs::read(fixture("landing.html")).unwrap();
        let routes = vec![
            ("/rapid/press/IP-16-001".to_string(), landing),
            ("/rapid/docs/IP-16-001.pdf".to_string(), b"%PDF-1.4 release".to_vec()),
            ("/xml/IP-16-001.xml".to_string(), b"<PRESS/>".to_vec()),
            ("/docs/policy-x.pdf".to_string(), b"%PDF-1.4 policy".to_vec()),
        ];
        let (base, server) = serve(routes, 4);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let log_path = dir.path().join(DOWNLOAD_LOG_FILE);
        let host = base.trim_start_matches("http://");
        let scrapers = ScraperSet::from_json(&format!(
            r#"{{"{}": {{"xml": {{"selector": "//a[@class='xml']/@href"}},
                         "pdf": {{"selector": "//a[@class='pdf']"}}}}}}"#,
            host
        ))
        .unwrap();
        let pdf_url = format!("{}/docs/policy-x.pdf", base);
        let mut aliases = AliasTable::new();
        aliases.insert(&pdf_url, "Policy X");

        let fetcher = Fetcher::new(&out, &dir.path().join(VISITED_FILE), quick_config())
            .unwrap()
            .with_scrapers(scrapers)
            .with_targets(FetchTargets::from_flags(true, true, true))
            .with_aliases(aliases)
            .with_download_log(&log_path);

        let page_url = format!("{}/rapid/press/IP-16-001", base);
        let report = fetcher.fetch_all(&[page_url.clone(), pdf_url.clone()]).unwrap();
        let requested = server.join().unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(report.fetched.len(), 4);
        assert_eq!(requested.len(), 4);
        assert_eq!(fs::read(out.join("IP-16-001.pdf")).unwrap(), b"%PDF-1.4 release");
        assert_eq!(fs::read(out.join("IP-16-001.xml")).unwrap(), b"<PRESS/>");
        assert_eq!(fs::read(out.join("policy x.pdf")).unwrap(), b"%PDF-1.4 policy");
        assert!(out.join(html_file_name(&page_url)).exists());

        let log = fs::read_to_string(&log_path).unwrap();
        assert_eq!(log.lines().count(), 4);
        assert!(log.contains(&format!("IP-16-001.xml;{}", page_url)));
        assert!(log.contains(&format!("policy x.pdf;{}", pdf_url)));

        let visited = fetcher.load_visited().unwrap();
        assert!(visited.contains(&page_url) && visited.contains(&pdf_url));
    }
}
