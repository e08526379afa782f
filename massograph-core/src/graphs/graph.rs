use crate::types::Provenance;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Bipartite side of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A corpus record
    Source,
    /// Something a record cites or mentions
    Target,
}

impl Side {
    /// The `bipartite` attribute value (0 / 1).
    pub fn bipartite(&self) -> u8 {
        match self {
            Side::Source => 0,
            Side::Target => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationNode {
    pub title: String,
    pub side: Side,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationEdge {
    pub provenance: BTreeSet<Provenance>,
}

impl CitationEdge {
    /// Provenance tags joined with commas, e.g. `alias,mention`.
    pub fn provenance_label(&self) -> String {
        self.provenance
            .iter()
            .map(Provenance::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Undirected bipartite citation graph. Node identity is the title string.
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    graph: UnGraph<CitationNode, CitationEdge>,
    index: HashMap<String, NodeIndex>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the node for `title`, creating it on `side` if absent. An
    /// existing node keeps the side it was first created with.
    pub fn ensure_node(&mut self, title: &str, side: Side) -> NodeIndex {
        if let Some(&index) = self.index.get(title) {
            return index;
        }
        let index = self.graph.add_node(CitationNode {
            title: title.to_string(),
            side,
        });
        self.index.insert(title.to_string(), index);
        index
    }

    /// Add an undirected edge, or merge provenance into the existing one.
    /// Returns `true` when a new edge was created.
    pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, provenance: &BTreeSet<Provenance>) -> bool {
        if let Some(edge) = self.graph.find_edge(a, b) {
            if let Some(weight) = self.graph.edge_weight_mut(edge) {
                weight.provenance.extend(provenance.iter().copied());
            }
            return false;
        }
        self.graph.add_edge(
            a,
            b,
            CitationEdge {
                provenance: provenance.clone(),
            },
        );
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    pub fn node(&self, title: &str) -> Option<&CitationNode> {
        self.index.get(title).and_then(|&i| self.graph.node_weight(i))
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&CitationEdge> {
        let a = *self.index.get(a)?;
        let b = *self.index.get(b)?;
        self.graph.find_edge(a, b).and_then(|e| self.graph.edge_weight(e))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &CitationNode)> {
        self.graph
            .node_indices()
            .filter_map(move |i| self.graph.node_weight(i).map(|n| (i, n)))
    }

    /// Edges in insertion order as (endpoint, endpoint, weight).
    pub fn edges(&self) -> impl Iterator<Item = (&CitationNode, &CitationNode, &CitationEdge)> {
        self.graph.edge_references().map(move |e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                e.weight(),
            )
        })
    }

    /// Degree per node index. A self-loop counts twice.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.graph.node_count()];
        for edge in self.graph.edge_references() {
            degrees[edge.source().index()] += 1;
            degrees[edge.target().index()] += 1;
        }
        degrees
    }

    pub fn self_loop_count(&self) -> usize {
        self.graph
            .edge_references()
            .filter(|e| e.source() == e.target())
            .count()
    }

    /// Connected components as node index lists, largest first. Components
    /// of equal size keep the order in which their first node was added.
    pub fn connected_components(&self) -> Vec<Vec<NodeIndex>> {
        let mut sets = UnionFind::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<NodeIndex>> = Vec::new();
        for node in self.graph.node_indices() {
            let root = sets.find(node.index());
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(node);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()));
        components
    }

    /// Induced subgraph over `nodes`, preserving their order.
    pub fn subgraph(&self, nodes: &[NodeIndex]) -> CitationGraph {
        let mut sub = CitationGraph::new();
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for &node in nodes {
            if let Some(weight) = self.graph.node_weight(node) {
                mapping.insert(node, sub.ensure_node(&weight.title, weight.side));
            }
        }
        for edge in self.graph.edge_references() {
            if let (Some(&a), Some(&b)) = (mapping.get(&edge.source()), mapping.get(&edge.target())) {
                sub.add_edge(a, b, &edge.weight().provenance);
            }
        }
        sub
    }

    /// Connected components as standalone graphs, largest first.
    pub fn components(&self) -> Vec<CitationGraph> {
        self.largest_components(usize::MAX)
    }

    /// The `limit` largest components as standalone graphs. Nodes outside
    /// them are never copied; edges are routed to their component in a
    /// single pass.
    pub fn largest_components(&self, limit: usize) -> Vec<CitationGraph> {
        let components = self.connected_components();
        let mut placed: Vec<Option<(usize, NodeIndex)>> = vec![None; self.graph.node_count()];
        let mut graphs: Vec<CitationGraph> = Vec::with_capacity(components.len().min(limit));

        for (slot, nodes) in components.iter().take(limit).enumerate() {
            let mut sub = CitationGraph::new();
            for &node in nodes {
                let weight = &self.graph[node];
                placed[node.index()] = Some((slot, sub.ensure_node(&weight.title, weight.side)));
            }
            graphs.push(sub);
        }

        for edge in self.graph.edge_references() {
            // Both endpoints share a component, so they share a slot
            if let (Some((slot, a)), Some((_, b))) = (placed[edge.source().index()], placed[edge.target().index()]) {
                graphs[slot].add_edge(a, b, &edge.weight().provenance);
            }
        }
        graphs
    }

    /// The underlying petgraph graph.
    pub fn inner(&self) -> &UnGraph<CitationNode, CitationEdge> {
        &self.graph
    }
}
