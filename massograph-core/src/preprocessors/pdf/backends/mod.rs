//! PDF Backend trait
//!
//! Defines the interface that all PDF text extraction backends implement.

use anyhow::Result;

/// Backend trait for PDF extraction
///
/// A backend turns PDF bytes into the document's plain text. Layout is not
/// preserved; the text becomes a single fulltext paragraph.
pub trait PdfBackend: Send + Sync {
    /// Extract the text layer of a PDF
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;

    /// Check if backend is healthy/ready
    fn is_healthy(&self) -> bool;
}

#[cfg(feature = "pdf-extract-backend")]
pub mod pdf_extract;

#[cfg(feature = "pdf-extract-backend")]
pub use self::pdf_extract::PdfExtractBackend;
