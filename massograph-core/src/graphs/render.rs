//! SVG drawings of citation graph components.
//!
//! Layout is a Fruchterman–Reingold spring embedding started from a
//! golden-angle spiral. The same graph always gives the same picture.

use super::analytics::GraphAnalytics;
use super::graph::CitationGraph;
use crate::config::RenderingConfig;
use anyhow::{Context, Result};
use petgraph::visit::EdgeRef;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::{Path, PathBuf};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const NODE_COLOR: &str = "steelblue";
const NODE_OPACITY: &str = "0.8";
const EDGE_COLOR: &str = "grey";
/// Marker area (pt²) of a node with centrality 1.0
const NODE_AREA: f64 = 250.0;
const POINTS_PER_INCH: f64 = 72.0;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const MIN_DISTANCE: f64 = 0.01;

pub struct SvgRenderer {
    config: RenderingConfig,
}

impl SvgRenderer {
    pub fn new(config: RenderingConfig) -> Self {
        Self { config }
    }

    /// Node positions in the unit square, indexed like the graph's nodes.
    pub fn layout(&self, graph: &CitationGraph) -> Vec<(f64, f64)> {
        let n = graph.node_count();
        match n {
            0 => return Vec::new(),
            1 => return vec![(0.5, 0.5)],
            _ => {}
        }

        let mut positions: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let radius = ((i as f64 + 0.5) / n as f64).sqrt() * 0.5;
                let angle = i as f64 * GOLDEN_ANGLE;
                (0.5 + radius * angle.cos(), 0.5 + radius * angle.sin())
            })
            .collect();

        let edges: Vec<(usize, usize)> = graph
            .inner()
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .filter(|(a, b)| a != b)
            .collect();

        let k = (1.0 / n as f64).sqrt();
        let iterations = self.config.layout_iterations.max(1);
        let mut temperature = 0.1;
        let cooling = temperature / (iterations as f64 + 1.0);

        for _ in 0..iterations {
            let mut displacement = vec![(0.0f64, 0.0f64); n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = positions[i].0 - positions[j].0;
                    let dy = positions[i].1 - positions[j].1;
                    let distance = dx.hypot(dy).max(MIN_DISTANCE);
                    let force = k * k / distance;
                    let (fx, fy) = (dx / distance * force, dy / distance * force);
                    displacement[i].0 += fx;
                    displacement[i].1 += fy;
                    displacement[j].0 -= fx;
                    displacement[j].1 -= fy;
                }
            }

            for &(a, b) in &edges {
                let dx = positions[a].0 - positions[b].0;
                let dy = positions[a].1 - positions[b].1;
                let distance = dx.hypot(dy).max(MIN_DISTANCE);
                let force = distance * distance / k;
                let (fx, fy) = (dx / distance * force, dy / distance * force);
                displacement[a].0 -= fx;
                displacement[a].1 -= fy;
                displacement[b].0 += fx;
                displacement[b].1 += fy;
            }

            for (position, (dx, dy)) in positions.iter_mut().zip(displacement) {
                let length = dx.hypot(dy);
                if length > 0.0 {
                    let step = length.min(temperature) / length;
                    position.0 += dx * step;
                    position.1 += dy * step;
                }
            }
            temperature -= cooling;
        }

        rescale(positions)
    }

    /// One SVG document for `graph` on a square canvas of `canvas_inches`.
    pub fn render(&self, graph: &CitationGraph, canvas_inches: f32) -> Result<String> {
        let pixels_per_inch = self.config.pixels_per_inch as f64;
        let size = canvas_inches as f64 * pixels_per_inch;
        let margin = size * 0.05;
        let span = size - 2.0 * margin;

        let points: Vec<(f64, f64)> = self
            .layout(graph)
            .into_iter()
            .map(|(x, y)| (margin + x * span, margin + y * span))
            .collect();
        let radii: Vec<f64> = GraphAnalytics::degree_centrality(graph)
            .into_iter()
            .map(|c| ((c * NODE_AREA / std::f64::consts::PI).sqrt() * pixels_per_inch / POINTS_PER_INCH).max(1.0))
            .collect();
        let draw_labels = graph.node_count() < self.config.label_node_limit;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
        let mut svg = BytesStart::new("svg");
        let size_attr = fmt(size);
        svg.push_attribute(("xmlns", SVG_NS));
        svg.push_attribute(("width", size_attr.as_str()));
        svg.push_attribute(("height", size_attr.as_str()));
        svg.push_attribute(("viewBox", format!("0 0 {} {}", size_attr, size_attr).as_str()));
        writer.write_event(Event::Start(svg))?;

        let mut background = BytesStart::new("rect");
        background.push_attribute(("width", "100%"));
        background.push_attribute(("height", "100%"));
        background.push_attribute(("fill", "white"));
        writer.write_event(Event::Empty(background))?;

        let mut edges = BytesStart::new("g");
        edges.push_attribute(("stroke", EDGE_COLOR));
        edges.push_attribute(("stroke-width", "1"));
        writer.write_event(Event::Start(edges))?;
        for edge in graph.inner().edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            if a == b {
                continue;
            }
            let mut line = BytesStart::new("line");
            line.push_attribute(("x1", fmt(points[a].0).as_str()));
            line.push_attribute(("y1", fmt(points[a].1).as_str()));
            line.push_attribute(("x2", fmt(points[b].0).as_str()));
            line.push_attribute(("y2", fmt(points[b].1).as_str()));
            writer.write_event(Event::Empty(line))?;
        }
        writer.write_event(Event::End(BytesEnd::new("g")))?;

        let mut nodes = BytesStart::new("g");
        nodes.push_attribute(("fill", NODE_COLOR));
        nodes.push_attribute(("fill-opacity", NODE_OPACITY));
        writer.write_event(Event::Start(nodes))?;
        for (index, node) in graph.nodes() {
            let (x, y) = points[index.index()];
            let mut circle = BytesStart::new("circle");
            circle.push_attribute(("cx", fmt(x).as_str()));
            circle.push_attribute(("cy", fmt(y).as_str()));
            circle.push_attribute(("r", fmt(radii[index.index()]).as_str()));
            writer.write_event(Event::Start(circle))?;
            writer.write_event(Event::Start(BytesStart::new("title")))?;
            writer.write_event(Event::Text(BytesText::new(&node.title)))?;
            writer.write_event(Event::End(BytesEnd::new("title")))?;
            writer.write_event(Event::End(BytesEnd::new("circle")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("g")))?;

        if draw_labels {
            let mut labels = BytesStart::new("g");
            labels.push_attribute(("font-family", "sans-serif"));
            labels.push_attribute(("font-size", fmt(pixels_per_inch * 8.0 / POINTS_PER_INCH).as_str()));
            labels.push_attribute(("text-anchor", "middle"));
            writer.write_event(Event::Start(labels))?;
            for (index, node) in graph.nodes() {
                let (x, y) = points[index.index()];
                let mut text = BytesStart::new("text");
                text.push_attribute(("x", fmt(x).as_str()));
                text.push_attribute(("y", fmt(y).as_str()));
                writer.write_event(Event::Start(text))?;
                writer.write_event(Event::Text(BytesText::new(&node.title)))?;
                writer.write_event(Event::End(BytesEnd::new("text")))?;
            }
            writer.write_event(Event::End(BytesEnd::new("g")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("svg")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Write `<rank>.svg` for the largest components: rank 0 on the primary
    /// canvas, the rest on the secondary one, at most `max_components`.
    pub fn render_components(&self, components: &[CitationGraph], dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (rank, component) in components.iter().take(self.config.max_components).enumerate() {
            let canvas = if rank == 0 {
                self.config.primary_canvas_inches
            } else {
                self.config.secondary_canvas_inches
            };
            let path = dir.join(format!("{}.svg", rank));
            let svg = self.render(component, canvas)?;
            std::fs::write(&path, svg)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!(
                "Rendered component {} ({} nodes) to {}",
                rank,
                component.node_count(),
                path.display()
            );
            written.push(path);
        }
        Ok(written)
    }
}

/// Fit positions into the unit square keeping the aspect ratio.
fn rescale(positions: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for &(x, y) in &positions {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y);
    if span < f64::EPSILON {
        return positions.iter().map(|_| (0.5, 0.5)).collect();
    }
    let (offset_x, offset_y) = ((span - (max_x - min_x)) / 2.0, (span - (max_y - min_y)) / 2.0);
    positions
        .into_iter()
        .map(|(x, y)| ((x - min_x + offset_x) / span, (y - min_y + offset_y) / span))
        .collect()
}

fn fmt(value: f64) -> String {
    format!("{:.2}", value)
}
