//! XML → [`MarkupNode`] via quick-xml.

use super::tree::{MarkupChild, MarkupNode};
use super::SelectorError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse an XML document into an owned tree rooted at a `#document` node.
///
/// Comments, processing instructions and the doctype are dropped. Element
/// and attribute names keep only their local part.
pub fn parse_xml(bytes: &[u8]) -> Result<MarkupNode, SelectorError> {
    let content = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(&content);
    reader.trim_text(false);
    reader.check_end_names(true);

    let mut stack: Vec<MarkupNode> = vec![MarkupNode::document()];

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(open_element(&start)?);
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, MarkupChild::Element(element));
            }
            Event::End(_) => {
                // check_end_names guarantees a matching open element
                if stack.len() < 2 {
                    return Err(SelectorError::Malformed("unbalanced end tag".to_string()));
                }
                if let Some(element) = stack.pop() {
                    attach(&mut stack, MarkupChild::Element(element));
                }
            }
            Event::Text(text) => {
                let value = match text.unescape() {
                    Ok(value) => value.into_owned(),
                    // Undeclared entities (e.g. HTML's &nbsp;) are kept raw
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                push_text(&mut stack, value);
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, value);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if stack.len() != 1 {
        return Err(SelectorError::Malformed(format!(
            "unclosed element <{}>",
            stack.last().map(|n| n.name.as_str()).unwrap_or_default()
        )));
    }
    let document = stack.pop().unwrap_or_else(MarkupNode::document);
    if document.child_elements().next().is_none() {
        return Err(SelectorError::Malformed("document has no root element".to_string()));
    }
    Ok(document)
}

fn open_element(start: &BytesStart<'_>) -> Result<MarkupNode, SelectorError> {
    let mut node = MarkupNode::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
        };
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [MarkupNode], child: MarkupChild) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(child);
    }
}

/// Adjacent text events (text, CDATA) collapse into one text node.
fn push_text(stack: &mut [MarkupNode], value: String) {
    if value.is_empty() {
        return;
    }
    let Some(parent) = stack.last_mut() else {
        return;
    };
    // Whitespace outside the root element carries nothing
    if parent.is_document() {
        return;
    }
    if let Some(MarkupChild::Text(previous)) = parent.children.last_mut() {
        previous.push_str(&value);
    } else {
        parent.children.push(MarkupChild::Text(value));
    }
}
