use super::graph::CitationGraph;
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::Path;

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";

const BIPARTITE_KEY: &str = "d0";
const PROVENANCE_KEY: &str = "d1";

impl CitationGraph {
    /// GraphML document: node attribute `bipartite` (int), edge attribute
    /// `provenance` (comma-separated string).
    pub fn to_graphml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("graphml");
        root.push_attribute(("xmlns", GRAPHML_NS));
        root.push_attribute(("xmlns:xsi", XSI_NS));
        root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        writer.write_event(Event::Start(root))?;

        write_key(&mut writer, BIPARTITE_KEY, "node", "bipartite", "int")?;
        write_key(&mut writer, PROVENANCE_KEY, "edge", "provenance", "string")?;

        let mut graph = BytesStart::new("graph");
        graph.push_attribute(("edgedefault", "undirected"));
        writer.write_event(Event::Start(graph))?;

        for (_, node) in self.nodes() {
            let mut element = BytesStart::new("node");
            element.push_attribute(("id", node.title.as_str()));
            writer.write_event(Event::Start(element))?;
            write_data(&mut writer, BIPARTITE_KEY, &node.side.bipartite().to_string())?;
            writer.write_event(Event::End(BytesEnd::new("node")))?;
        }

        for (a, b, edge) in self.edges() {
            let mut element = BytesStart::new("edge");
            element.push_attribute(("source", a.title.as_str()));
            element.push_attribute(("target", b.title.as_str()));
            writer.write_event(Event::Start(element))?;
            write_data(&mut writer, PROVENANCE_KEY, &edge.provenance_label())?;
            writer.write_event(Event::End(BytesEnd::new("edge")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("graph")))?;
        writer.write_event(Event::End(BytesEnd::new("graphml")))?;

        Ok(String::from_utf8(writer.into_inner())?)
    }

    pub fn save_graphml(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_graphml()?)?;
        Ok(())
    }
}

fn write_key(
    writer: &mut Writer<Vec<u8>>,
    id: &str,
    domain: &str,
    name: &str,
    kind: &str,
) -> Result<()> {
    let mut key = BytesStart::new("key");
    key.push_attribute(("id", id));
    key.push_attribute(("for", domain));
    key.push_attribute(("attr.name", name));
    key.push_attribute(("attr.type", kind));
    writer.write_event(Event::Empty(key))?;
    Ok(())
}

fn write_data(writer: &mut Writer<Vec<u8>>, key: &str, value: &str) -> Result<()> {
    let mut data = BytesStart::new("data");
    data.push_attribute(("key", key));
    writer.write_event(Event::Start(data))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new("data")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::graphs::graph::{CitationGraph, Side};
    use crate::preprocessors::markup::xml_parser::parse_xml;
    use crate::preprocessors::markup::xpath::{Selected, XPath};
    use crate::types::Provenance;
    use std::collections::BTreeSet;

    fn values(document: &crate::preprocessors::markup::tree::MarkupNode, expr: &str) -> Vec<String> {
        XPath::parse(expr)
            .unwrap()
            .select(document)
            .into_iter()
            .map(|s| match s {
                Selected::Value(v) => v.to_string(),
                Selected::Node(n) => n.inner_text(),
            })
            .collect()
    }

    #[test]
    fn graphml_carries_sides_and_provenance() {
        let mut graph = CitationGraph::new();
        let a = graph.ensure_node("Call A & partners", Side::Source);
        let x = graph.ensure_node("policy x", Side::Target);
        graph.add_edge(a, x, &BTreeSet::from([Provenance::Mention, Provenance::Alias]));

        let xml = graph.to_graphml().unwrap();
        assert!(xml.contains(r#"<graph edgedefault="undirected">"#));
        assert!(xml.contains("&amp;"));

        let document = parse_xml(xml.as_bytes()).unwrap();
        assert_eq!(values(&document, "/graphml/graph/node/@id"), ["Call A & partners", "policy x"]);
        assert_eq!(values(&document, "/graphml/graph/node/data"), ["0", "1"]);
        assert_eq!(values(&document, "/graphml/graph/edge/@target"), ["policy x"]);
        assert_eq!(values(&document, "/graphml/graph/edge/data"), ["alias,mention"]);
        assert_eq!(values(&document, "/graphml/key/@attr.name"), ["bipartite", "provenance"]);
    }
}
