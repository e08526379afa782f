//! PDF Preprocessor
//!
//! PDFs carry no markup to select from: the whole text layer becomes the
//! record's fulltext and the file stem becomes its title.

pub mod backends;

use crate::alias::AliasFragment;
use crate::preprocessors::preprocessor::{Extraction, Preprocessor};
use crate::types::*;
use anyhow::{bail, Context, Result};
use std::path::Path;

pub use backends::PdfBackend;

#[cfg(feature = "pdf-extract-backend")]
pub use backends::PdfExtractBackend;

/// Backend enum for runtime backend selection
pub enum PdfBackendImpl {
    #[cfg(feature = "pdf-extract-backend")]
    PdfExtract(PdfExtractBackend),
}

impl PdfBackend for PdfBackendImpl {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String> {
        match self {
            #[cfg(feature = "pdf-extract-backend")]
            PdfBackendImpl::PdfExtract(backend) => backend.extract_text(pdf_bytes),
        }
    }

    fn name(&self) -> &str {
        match self {
            #[cfg(feature = "pdf-extract-backend")]
            PdfBackendImpl::PdfExtract(backend) => backend.name(),
        }
    }

    fn is_healthy(&self) -> bool {
        match self {
            #[cfg(feature = "pdf-extract-backend")]
            PdfBackendImpl::PdfExtract(backend) => backend.is_healthy(),
        }
    }
}

/// PDF Preprocessor with pluggable backend
pub struct PdfPreprocessor {
    backend: PdfBackendImpl,
}

impl PdfPreprocessor {
    /// Create PdfPreprocessor with the in-process `pdf-extract` backend
    #[cfg(feature = "pdf-extract-backend")]
    pub fn new_with_pdf_extract() -> Self {
        Self {
            backend: PdfBackendImpl::PdfExtract(PdfExtractBackend::new()),
        }
    }

    pub fn with_backend(backend: PdfBackendImpl) -> Self {
        Self { backend }
    }

    /// Get the backend name for logging
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Check if the backend is healthy
    pub fn is_healthy(&self) -> bool {
        self.backend.is_healthy()
    }
}

/// Fields of a PDF: `title` = file stem, `fulltext` = one paragraph.
/// PDF input is always classified `pdf`, whatever the caller asked for.
pub fn pdf_fields(document: &RawDocument, text: String) -> Result<ExtractedFields> {
    let title = document.file_stem();
    if title.trim().is_empty() {
        bail!("cannot derive a title from {}", document.origin.display());
    }
    if document.classification != Classification::Pdf {
        tracing::warn!(
            "{} is a PDF; classifying it as pdf instead of {}",
            document.origin.display(),
            document.classification
        );
    }
    let mut fields = ExtractedFields::new(Classification::Pdf);
    fields.insert("title", vec![title]);
    fields.insert("fulltext", vec![text]);
    Ok(fields)
}

impl Preprocessor for PdfPreprocessor {
    fn extract(&self, document: &RawDocument) -> Result<Extraction> {
        let text = self
            .backend
            .extract_text(&document.bytes)
            .with_context(|| format!("text extraction failed for {}", document.origin.display()))?;
        Ok(Extraction {
            fields: pdf_fields(document, text)?,
            aliases: AliasFragment::new(),
        })
    }

    fn name(&self) -> &str {
        "PdfPreprocessor"
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Pdf
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            matches!(
                extension.to_str().unwrap_or("").to_lowercase().as_str(),
                "pdf"
            )
        } else {
            false
        }
    }
}
