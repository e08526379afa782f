//! Document Preprocessors
//!
//! This module provides the extraction layer: raw documents in, flat field
//! maps (plus alias pairs) out.
//!
//! ## Architecture
//!
//! ```text
//! RawDocument (XML, HTML, PDF)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! Extraction { ExtractedFields, AliasFragment }
//!     ↓
//! [Record Normalizer]
//!     ↓
//! Record
//! ```
//!
//! ## Available Preprocessors
//!
//! - `MarkupPreprocessor` - XML and HTML via stylesheet selectors
//! - `PdfPreprocessor` - PDF text via a pluggable backend (`pdf-extract`)

pub mod markup;
pub mod pdf;
pub mod preprocessor;

// Re-export main types
pub use markup::{MarkupPreprocessor, ParsedMarkup, SelectorError};
pub use pdf::{PdfBackend, PdfBackendImpl, PdfPreprocessor};
pub use preprocessor::{Extraction, Preprocessor};

#[cfg(feature = "pdf-extract-backend")]
pub use pdf::PdfExtractBackend;
