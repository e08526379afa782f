//! Applying one stylesheet entry to one parsed document.
//!
//! Miss policy differs per format. XML: an invalid selector or no match
//! omits the field. HTML: an invalid selector omits the field, no match
//! keeps it as an empty list; both are logged as errors.
//!
//! `href` fields of HTML documents also yield `(href, anchor text)` pairs
//! for the alias table. XML `href` fields are plain attribute lookups.

use super::tree::MarkupNode;
use super::xpath::{Selected, XPath};
use super::{ParsedMarkup, SelectorError};
use crate::alias::AliasFragment;
use crate::stylesheet::{AttributeMode, FieldMapping, FieldSpec};
use crate::types::{Classification, ExtractedFields, SourceFormat};

const CSS_PREFIX: &str = "css:";

/// Evaluate every field of `mapping` against `markup`.
pub fn apply_mapping(
    markup: &ParsedMarkup,
    mapping: &FieldMapping,
    classification: Classification,
) -> (ExtractedFields, AliasFragment) {
    let mut fields = ExtractedFields::new(classification);
    let mut aliases = AliasFragment::new();
    let format = markup.format();

    for (field, spec) in mapping {
        let mut pairs = AliasFragment::new();
        match evaluate(markup, spec, &mut pairs) {
            Ok(values) if values.is_empty() => match (format, &spec.attribute) {
                (_, AttributeMode::Int) => {
                    tracing::error!("No integer for field '{}' ({})", field, spec.selector);
                }
                (SourceFormat::Html, _) => {
                    tracing::error!("Selector for '{}' matched nothing: {}", field, spec.selector);
                    fields.insert(field, Vec::new());
                }
                _ => {
                    tracing::debug!("Selector for '{}' matched nothing: {}", field, spec.selector);
                }
            },
            Ok(values) => {
                fields.insert(field, values);
                aliases.extend(pairs);
            }
            Err(e) if format == SourceFormat::Xml && e.is_selector_error() => {
                tracing::debug!("Skipping field '{}': {}", field, e);
            }
            Err(e) => {
                tracing::error!("Skipping field '{}': {}", field, e);
            }
        }
    }

    (fields, aliases)
}

/// Link targets matched by one selector: the `href` of matched elements, or
/// the matched attribute/text values themselves. No alias pairs.
pub fn select_links(markup: &ParsedMarkup, selector: &str) -> Result<Vec<String>, SelectorError> {
    let spec = FieldSpec::new(selector, "href");
    let mut ignored = AliasFragment::new();
    let links = evaluate(markup, &spec, &mut ignored)?;
    Ok(links.into_iter().filter(|l| !l.is_empty()).collect())
}

fn evaluate(
    markup: &ParsedMarkup,
    spec: &FieldSpec,
    aliases: &mut AliasFragment,
) -> Result<Vec<String>, SelectorError> {
    let format = markup.format();
    match spec.selector.strip_prefix(CSS_PREFIX) {
        Some(css) => {
            let nodes = markup.select_css(css.trim())?;
            let selected: Vec<Selected<'_>> = nodes.iter().map(Selected::Node).collect();
            project(&selected, spec, format, aliases)
        }
        None => {
            let xpath = XPath::parse(&spec.selector)?;
            let selected = xpath.select(markup.tree());
            project(&selected, spec, format, aliases)
        }
    }
}

/// Turn matches into strings according to the attribute mode.
fn project(
    selected: &[Selected<'_>],
    spec: &FieldSpec,
    format: SourceFormat,
    aliases: &mut AliasFragment,
) -> Result<Vec<String>, SelectorError> {
    let mut values = Vec::new();
    match &spec.attribute {
        AttributeMode::Text => {
            values.extend(selected.iter().map(|s| text_of(s, format)));
        }
        AttributeMode::Int => {
            if let Some(first) = selected.first() {
                let text = text_of(first, format);
                let number: i64 = text.parse().map_err(|_| SelectorError::NotAnInteger {
                    selector: spec.selector.clone(),
                    text: text.clone(),
                })?;
                values.push(number.to_string());
            }
        }
        AttributeMode::Href => {
            for s in selected {
                match s {
                    Selected::Node(node) => {
                        let Some(href) = node.attr("href") else {
                            continue;
                        };
                        let href = href.trim();
                        values.push(href.to_string());
                        // Only HTML anchors feed the alias table
                        if format != SourceFormat::Html {
                            continue;
                        }
                        let visible = text_of(s, format)
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" ");
                        if !visible.is_empty() {
                            aliases.push(href, visible);
                        }
                    }
                    Selected::Value(value) => values.push(value.trim().to_string()),
                }
            }
        }
        AttributeMode::Attribute(name) => {
            for s in selected {
                match s {
                    Selected::Node(node) => values.extend(node.attr(name).map(|v| v.trim().to_string())),
                    Selected::Value(value) => values.push(value.trim().to_string()),
                }
            }
        }
    }
    Ok(values)
}

fn text_of(selected: &Selected<'_>, format: SourceFormat) -> String {
    match selected {
        Selected::Node(node) => element_text(node, format),
        Selected::Value(value) => value.trim().to_string(),
    }
}

/// XML concatenates descendant text; HTML joins text nodes with spaces.
fn element_text(node: &MarkupNode, format: SourceFormat) -> String {
    match format {
        SourceFormat::Html => node
            .text_nodes()
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => node.inner_text().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::FieldSpec;

    fn mapping(entries: &[(&str, &str, &str)]) -> FieldMapping {
        entries
            .iter()
            .map(|(field, selector, attribute)| (field.to_string(), FieldSpec::new(selector, attribute)))
            .collect()
    }

    fn xml(content: &str) -> ParsedMarkup {
        ParsedMarkup::parse(content.as_bytes(), SourceFormat::Xml).unwrap()
    }

    fn html(content: &str) -> ParsedMarkup {
        ParsedMarkup::parse(content.as_bytes(), SourceFormat::Html).unwrap()
    }

    #[test]
    fn xml_text_concatenates_descendants() {
        let doc = xml("<doc><title>Policy <em>X</em></title><p>one</p><p>two</p></doc>");
        let (fields, _) = apply_mapping(
            &doc,
            &mapping(&[("title", "//title", "text"), ("fulltext", "//p", "text")]),
            Classification::Press,
        );
        assert_eq!(fields.get("title"), Some(&["Policy X".to_string()][..]));
        assert_eq!(fields.get("fulltext").unwrap(), ["one", "two"]);
        assert_eq!(fields.classification, Classification::Press);
    }

    #[test]
    fn xml_misses_and_bad_selectors_omit_field() {
        let doc = xml("<doc><title>A</title></doc>");
        let (fields, _) = apply_mapping(
            &doc,
            &mapping(&[("subject", "//subject", "text"), ("broken", "//a[", "text")]),
            Classification::Press,
        );
        assert!(fields.get("subject").is_none());
        assert!(fields.get("broken").is_none());
    }

    #[test]
    fn html_miss_keeps_empty_field_but_bad_selector_omits() {
        let doc = html("<html><body><h1>Call</h1></body></html>");
        let (fields, _) = apply_mapping(
            &doc,
            &mapping(&[("subject", "//h2", "text"), ("broken", "//a[", "text")]),
            Classification::Call,
        );
        assert_eq!(fields.get("subject"), Some(&[][..]));
        assert!(fields.get("broken").is_none());
    }

    #[test]
    fn html_text_joins_text_nodes_with_spaces() {
        let doc = html("<div class='body'><p>Open<b>call</b>  now</p></div>");
        let (fields, _) = apply_mapping(
            &doc,
            &mapping(&[("fulltext", "css:div.body p", "text")]),
            Classification::Call,
        );
        assert_eq!(fields.get("fulltext").unwrap(), ["Open call now"]);
    }

    #[test]
    fn int_mode_takes_first_match() {
        let doc = xml("<doc><id> 1234 </id><id>5</id><bad>x</bad></doc>");
        let (fields, _) = apply_mapping(
            &doc,
            &mapping(&[("identifier", "//id", "int"), ("other", "//bad", "int"), ("none", "//nope", "int")]),
            Classification::Press,
        );
        assert_eq!(fields.get("identifier").unwrap(), ["1234"]);
        assert!(fields.get("other").is_none());
        assert!(fields.get("none").is_none());
    }

    #[test]
    fn href_mode_collects_links_and_aliases() {
        let doc = html(
            r#"<body>
                <a href="http://eu.example/policy-x.pdf"> Policy
                   X </a>
                <a href="http://eu.example/logo.png"><img src="logo.png"></a>
                <a name="anchor">no link</a>
            </body>"#,
        );
        let (fields, aliases) = apply_mapping(
            &doc,
            &mapping(&[("links", "//a", "href")]),
            Classification::Call,
        );
        assert_eq!(
            fields.get("links").unwrap(),
            ["http://eu.example/policy-x.pdf", "http://eu.example/logo.png"]
        );
        let pairs: Vec<(&str, &str)> = aliases.iter().collect();
        assert_eq!(pairs, [("http://eu.example/policy-x.pdf", "Policy X")]);
    }

    #[test]
    fn later_href_fields_win_for_the_same_link() {
        let doc = html(
            r#"<body><nav><a href="http://eu.example/p.pdf">here</a></nav>
               <main><a href="http://eu.example/p.pdf">Policy X</a></main></body>"#,
        );
        // Declared out of alphabetical order: "nav" is evaluated first
        let (_, aliases) = apply_mapping(
            &doc,
            &mapping(&[("nav", "//nav/a", "href"), ("links", "//main/a", "href")]),
            Classification::Call,
        );
        let table = crate::alias::AliasTable::from_fragments([aliases]);
        assert_eq!(table.title_of("http://eu.example/p.pdf"), Some("policy x"));
    }

    #[test]
    fn xml_href_mode_yields_links_only() {
        let doc = xml(
            r#"<PRESS><P>See the <A href="http://eu.example/annex.pdf">annex</A>.</P>
               <P><A href="http://eu.example/here.pdf">here</A></P></PRESS>"#,
        );
        let (fields, aliases) = apply_mapping(
            &doc,
            &mapping(&[("links", "//A", "href")]),
            Classification::Press,
        );
        assert_eq!(
            fields.get("links").unwrap(),
            ["http://eu.example/annex.pdf", "http://eu.example/here.pdf"]
        );
        assert!(aliases.is_empty());
    }

    #[test]
    fn select_links_accepts_elements_attributes_and_css() {
        let doc = html(
            r#"<body><a class="pdf" href="../docs/annex.pdf">PDF</a>
               <a class="xml" href="/xml/IP-16-001.xml">XML</a></body>"#,
        );
        assert_eq!(select_links(&doc, "//a[@class='pdf']").unwrap(), ["../docs/annex.pdf"]);
        assert_eq!(select_links(&doc, "//a[@class='xml']/@href").unwrap(), ["/xml/IP-16-001.xml"]);
        assert_eq!(select_links(&doc, "css:a.xml").unwrap(), ["/xml/IP-16-001.xml"]);
        assert!(select_links(&doc, "//a[@class='html']").unwrap().is_empty());
        assert!(select_links(&doc, "//a[").is_err());
    }

    #[test]
    fn raw_attribute_mode_and_attribute_steps() {
        let doc = xml(r#"<doc lang="en"><a href="/x">x</a><date value="2016-02-01"/></doc>"#);
        let (fields, aliases) = apply_mapping(
            &doc,
            &mapping(&[
                ("lang", "/doc", "lang"),
                ("date", "//date", "value"),
                ("missing", "//date", "nope"),
                ("hrefs", "//a/@href", "text"),
            ]),
            Classification::Press,
        );
        assert_eq!(fields.get("lang").unwrap(), ["en"]);
        assert_eq!(fields.get("date").unwrap(), ["2016-02-01"]);
        assert!(fields.get("missing").is_none());
        assert_eq!(fields.get("hrefs").unwrap(), ["/x"]);
        assert!(aliases.is_empty());
    }
}
