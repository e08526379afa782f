//! Owned element tree shared by the XML and HTML parsers.
//!
//! Both parsers produce a synthetic document node (name `#document`) whose
//! children are the top-level nodes of the input. Selectors run against
//! this tree regardless of where it came from.

pub const DOCUMENT_NODE: &str = "#document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupChild {
    Element(MarkupNode),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupNode {
    /// Local name; namespace prefixes are stripped by the parsers
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupChild>,
}

impl MarkupNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::new(DOCUMENT_NODE)
    }

    pub fn is_document(&self) -> bool {
        self.name == DOCUMENT_NODE
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &MarkupNode> {
        self.children.iter().filter_map(|c| match c {
            MarkupChild::Element(e) => Some(e),
            MarkupChild::Text(_) => None,
        })
    }

    /// First element child of the document node.
    pub fn root_element(&self) -> Option<&MarkupNode> {
        if self.is_document() {
            self.child_elements().next()
        } else {
            Some(self)
        }
    }

    /// Direct text children only.
    pub fn direct_text(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter_map(|c| match c {
                MarkupChild::Text(t) => Some(t.as_str()),
                MarkupChild::Element(_) => None,
            })
            .collect()
    }

    /// All descendant text nodes in document order.
    pub fn text_nodes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                MarkupChild::Text(t) => out.push(t),
                MarkupChild::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Descendant text concatenated.
    pub fn inner_text(&self) -> String {
        self.text_nodes().concat()
    }

    /// Self followed by every descendant element, in document order.
    pub fn descendants_or_self(&self) -> Vec<&MarkupNode> {
        let mut out = vec![self];
        // Depth-first pre-order without recursion
        let mut stack: Vec<std::slice::Iter<'_, MarkupChild>> = vec![self.children.iter()];
        while let Some(iter) = stack.last_mut() {
            match iter.next() {
                Some(MarkupChild::Element(e)) => {
                    out.push(e);
                    stack.push(e.children.iter());
                }
                Some(MarkupChild::Text(_)) => {}
                None => {
                    stack.pop();
                }
            }
        }
        out
    }
}
