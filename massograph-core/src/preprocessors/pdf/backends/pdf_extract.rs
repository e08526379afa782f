//! Pure-Rust backend built on the `pdf-extract` crate.

use super::PdfBackend;
use anyhow::{anyhow, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// In-process text extraction. `pdf-extract` panics on some malformed
/// files, so every call is isolated with `catch_unwind`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for PdfExtractBackend {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String> {
        let result = catch_unwind(AssertUnwindSafe(|| {
            ::pdf_extract::extract_text_from_mem(pdf_bytes)
        }));
        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(anyhow!("pdf-extract failed: {}", e)),
            Err(_) => Err(anyhow!("pdf-extract panicked while reading the document")),
        }
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
