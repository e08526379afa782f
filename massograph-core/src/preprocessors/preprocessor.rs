// Preprocessor abstraction for document extraction
//
// This module defines the boundary between raw documents (bytes on disk) and
// the record layer. A preprocessor turns one document into flat extracted
// fields plus the alias pairs it observed; it never writes anything itself.

use crate::alias::AliasFragment;
use crate::types::*;
use anyhow::{Context, Result};
use std::path::Path;

/// What one document yields: its fields and the `(href, text)` pairs seen
/// while extracting them.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub fields: ExtractedFields,
    pub aliases: AliasFragment,
}

/// Preprocessor trait - converts raw documents to extracted fields
///
/// Implementations handle one source format each:
/// - Markup (XML, HTML): stylesheet-driven selector evaluation
/// - PDF: whole-document text extraction through a backend
///
/// Everything after this point works with `ExtractedFields` and is
/// format-agnostic.
pub trait Preprocessor {
    /// Extract fields from an in-memory document
    fn extract(&self, document: &RawDocument) -> Result<Extraction>;

    /// Convenience method: read a file and extract it
    fn process_file(&self, input: &Path, classification: Classification) -> Result<Extraction> {
        let bytes = std::fs::read(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        let document = RawDocument::new(bytes, classification, self.format(), input.to_path_buf());
        self.extract(&document)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Source format handled by this preprocessor
    fn format(&self) -> SourceFormat;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
