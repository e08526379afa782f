use super::graph::{CitationGraph, Side};
use crate::config::GraphConfig;
use crate::types::ResolvedCorpus;

/// Builds the bipartite citation graph from a resolved corpus.
pub struct CitationGraphBuilder {
    min_target_chars: usize,
}

impl Default for CitationGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationGraphBuilder {
    pub fn new() -> Self {
        Self::with_config(&GraphConfig::default())
    }

    pub fn with_config(config: &GraphConfig) -> Self {
        Self {
            min_target_chars: config.min_target_chars,
        }
    }

    /// One source node per record, one target node per distinct target name,
    /// one edge per (record, target) pair. Records are walked in corpus order
    /// so a title keeps the side it was first seen on.
    pub fn build(&self, corpus: &ResolvedCorpus) -> CitationGraph {
        let mut graph = CitationGraph::new();
        let mut skipped = 0usize;

        for resolved in &corpus.records {
            let source = graph.ensure_node(&resolved.record.node_key(), Side::Source);
            for target in &resolved.targets {
                if target.name.chars().count() < self.min_target_chars {
                    skipped += 1;
                    continue;
                }
                let node = graph.ensure_node(&target.name, Side::Target);
                graph.add_edge(source, node, &target.provenance);
            }
        }

        tracing::info!(
            "Built citation graph: {} nodes, {} edges ({} short targets skipped)",
            graph.node_count(),
            graph.edge_count(),
            skipped
        );
        graph
    }
}
