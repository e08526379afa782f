use super::graph::{CitationGraph, Side};
use serde::{Deserialize, Serialize};

/// Node ranked by degree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedNode {
    pub title: String,
    pub degree: usize,
    pub centrality: f64,
}

/// Whole-graph figures written to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub source_nodes: usize,
    pub target_nodes: usize,
    pub self_loops: usize,
    pub component_count: usize,
    /// Largest first
    pub component_sizes: Vec<usize>,
    pub top_targets: Vec<RankedNode>,
}

/// Analytics computer for citation graphs and their components
pub struct GraphAnalytics;

impl GraphAnalytics {
    /// Degree centrality per node index: degree / (n - 1). A single-node
    /// graph gets 1.0.
    pub fn degree_centrality(graph: &CitationGraph) -> Vec<f64> {
        let n = graph.node_count();
        if n == 1 {
            return vec![1.0];
        }
        let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
        graph
            .degrees()
            .into_iter()
            .map(|degree| degree as f64 * scale)
            .collect()
    }

    pub fn count_side(graph: &CitationGraph, side: Side) -> usize {
        graph.nodes().filter(|(_, node)| node.side == side).count()
    }

    /// Target nodes with the highest degree, ties broken by insertion order.
    pub fn top_targets(graph: &CitationGraph, limit: usize) -> Vec<RankedNode> {
        let degrees = graph.degrees();
        let centrality = Self::degree_centrality(graph);
        let mut ranked: Vec<RankedNode> = graph
            .nodes()
            .filter(|(_, node)| node.side == Side::Target)
            .map(|(index, node)| RankedNode {
                title: node.title.clone(),
                degree: degrees[index.index()],
                centrality: centrality[index.index()],
            })
            .collect();
        ranked.sort_by(|a, b| b.degree.cmp(&a.degree));
        ranked.truncate(limit);
        ranked
    }

    pub fn summarize(graph: &CitationGraph, top_n: usize) -> GraphSummary {
        let component_sizes: Vec<usize> = graph
            .connected_components()
            .iter()
            .map(Vec::len)
            .collect();

        GraphSummary {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            source_nodes: Self::count_side(graph, Side::Source),
            target_nodes: Self::count_side(graph, Side::Target),
            self_loops: graph.self_loop_count(),
            component_count: component_sizes.len(),
            component_sizes,
            top_targets: Self::top_targets(graph, top_n),
        }
    }
}
