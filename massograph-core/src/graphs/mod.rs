pub mod analytics;
pub mod builder;
pub mod graph;
pub mod render;
pub mod serialization;

pub use analytics::{GraphAnalytics, GraphSummary, RankedNode};
pub use builder::CitationGraphBuilder;
pub use graph::{CitationEdge, CitationGraph, CitationNode, Side};
pub use render::SvgRenderer;
