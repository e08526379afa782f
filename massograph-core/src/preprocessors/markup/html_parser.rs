//! HTML → [`MarkupNode`] via scraper (html5ever).
//!
//! HTML parsing never fails: html5ever repairs whatever it is given, so a
//! malformed page still yields a tree (possibly just `html/head/body`).

use super::tree::{MarkupChild, MarkupNode};
use scraper::{ElementRef, Html, Node};

/// Parse an HTML page. Returns the owned tree together with the scraper
/// document so `css:` selectors can run against the original DOM.
pub fn parse_html(bytes: &[u8]) -> (MarkupNode, Html) {
    let content = String::from_utf8_lossy(bytes);
    let html = Html::parse_document(&content);

    let mut document = MarkupNode::document();
    document
        .children
        .push(MarkupChild::Element(element_to_node(html.root_element())));
    (document, html)
}

/// Copy a scraper element subtree into an owned node.
pub fn element_to_node(element: ElementRef<'_>) -> MarkupNode {
    let mut node = MarkupNode::new(element.value().name());
    node.attributes = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    node.children.push(MarkupChild::Element(element_to_node(child_element)));
                }
            }
            Node::Text(text) => node.children.push(MarkupChild::Text(String::from(&**text))),
            _ => {}
        }
    }
    node
}
