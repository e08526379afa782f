//! Markup (XML / HTML) preprocessing.
//!
//! ```text
//! bytes ──[xml_parser | html_parser]──▶ MarkupNode tree
//!       ──[stylesheet entry: xpath | css]──▶ ExtractedFields + AliasFragment
//! ```

pub mod html_parser;
pub mod selector;
pub mod tree;
pub mod xml_parser;
pub mod xpath;

use crate::preprocessors::preprocessor::{Extraction, Preprocessor};
use crate::stylesheet::Stylesheet;
use crate::types::{RawDocument, SourceFormat};
use anyhow::{bail, Context, Result};
use std::path::Path;
use thiserror::Error;

pub use selector::{apply_mapping, select_links};
pub use tree::{MarkupChild, MarkupNode};
pub use xpath::{Selected, XPath};

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("invalid XPath '{selector}': {reason}")]
    InvalidXPath { selector: String, reason: String },
    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidCss { selector: String, reason: String },
    #[error("CSS selectors only apply to HTML documents: '{0}'")]
    CssOnXml(String),
    #[error("'{selector}' did not yield an integer: '{text}'")]
    NotAnInteger { selector: String, text: String },
    #[error("{0} documents are not markup")]
    NotMarkup(SourceFormat),
}

impl SelectorError {
    /// Errors caused by the stylesheet rather than by the document.
    pub fn is_selector_error(&self) -> bool {
        matches!(
            self,
            SelectorError::InvalidXPath { .. } | SelectorError::InvalidCss { .. } | SelectorError::CssOnXml(_)
        )
    }
}

/// A parsed markup document ready for selector evaluation.
#[derive(Debug)]
pub enum ParsedMarkup {
    Xml(MarkupNode),
    Html {
        tree: MarkupNode,
        document: scraper::Html,
    },
}

impl ParsedMarkup {
    pub fn parse(bytes: &[u8], format: SourceFormat) -> Result<Self, SelectorError> {
        match format {
            SourceFormat::Xml => Ok(ParsedMarkup::Xml(xml_parser::parse_xml(bytes)?)),
            SourceFormat::Html => {
                let (tree, document) = html_parser::parse_html(bytes);
                Ok(ParsedMarkup::Html { tree, document })
            }
            SourceFormat::Pdf => Err(SelectorError::NotMarkup(format)),
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            ParsedMarkup::Xml(_) => SourceFormat::Xml,
            ParsedMarkup::Html { .. } => SourceFormat::Html,
        }
    }

    /// The document node of the owned tree.
    pub fn tree(&self) -> &MarkupNode {
        match self {
            ParsedMarkup::Xml(tree) | ParsedMarkup::Html { tree, .. } => tree,
        }
    }

    /// Run a CSS selector against the HTML DOM; matches are copied out as
    /// owned subtrees.
    pub fn select_css(&self, css: &str) -> Result<Vec<MarkupNode>, SelectorError> {
        let ParsedMarkup::Html { document, .. } = self else {
            return Err(SelectorError::CssOnXml(css.to_string()));
        };
        let selector = scraper::Selector::parse(css).map_err(|e| SelectorError::InvalidCss {
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(document
            .select(&selector)
            .map(html_parser::element_to_node)
            .collect())
    }
}

/// Stylesheet-driven preprocessor for one markup format.
pub struct MarkupPreprocessor {
    stylesheet: Stylesheet,
    format: SourceFormat,
}

impl MarkupPreprocessor {
    pub fn new(stylesheet: Stylesheet, format: SourceFormat) -> Result<Self> {
        if format == SourceFormat::Pdf {
            bail!("MarkupPreprocessor handles xml or html, not {}", format);
        }
        Ok(Self { stylesheet, format })
    }
}

impl Preprocessor for MarkupPreprocessor {
    fn extract(&self, document: &RawDocument) -> Result<Extraction> {
        let mapping = self
            .stylesheet
            .require_entry(document.classification, document.format)?;
        let parsed = ParsedMarkup::parse(&document.bytes, document.format)
            .with_context(|| format!("failed to parse {}", document.origin.display()))?;
        let (fields, aliases) = apply_mapping(&parsed, mapping, document.classification);
        Ok(Extraction { fields, aliases })
    }

    fn name(&self) -> &str {
        match self.format {
            SourceFormat::Xml => "XmlPreprocessor",
            _ => "HtmlPreprocessor",
        }
    }

    fn format(&self) -> SourceFormat {
        self.format
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        match self.format {
            SourceFormat::Xml => extension.eq_ignore_ascii_case("xml"),
            _ => matches!(extension.to_lowercase().as_str(), "html" | "htm" | "xhtml"),
        }
    }
}
