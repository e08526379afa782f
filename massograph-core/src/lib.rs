// Massograph Core Library
//
// Extracts records from institutional documents with declarative
// stylesheets, resolves their cross-references and builds a bipartite
// citation graph. Main interface: ExtractionProcessor and AnalysisProcessor.

pub mod alias;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod graphs;
pub mod normalizer;
pub mod preprocessors;
pub mod processor;
pub mod resolver;
pub mod storage;
pub mod stylesheet;
pub mod types;

// Re-export main types and functions for easy use
pub use alias::{AliasFragment, AliasTable};
pub use config::AnalysisConfig;
pub use corpus::CorpusStore;
pub use graphs::{CitationGraph, CitationGraphBuilder, GraphAnalytics};
pub use preprocessors::{MarkupPreprocessor, PdfPreprocessor, Preprocessor};
pub use processor::{AnalysisOptions, AnalysisProcessor, ExtractionProcessor, StepProfiler};
pub use resolver::Resolver;
pub use stylesheet::Stylesheet;
pub use types::*;

// Re-export backends for direct use
#[cfg(feature = "pdf-extract-backend")]
pub use preprocessors::PdfExtractBackend;
