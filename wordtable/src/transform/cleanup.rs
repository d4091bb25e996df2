//! Import pass 2: XHTML normalisation
//!
//! Word splits text into many runs, so pass 1 output is full of adjacent
//! `<b>` siblings, empty formatting elements and blank paragraphs. This pass
//! tidies that up so the question recogniser sees one element per
//! formatting change.

use super::support::require_child;
use super::{Stylesheet, StylesheetError};
use crate::params::ConversionParameters;
use crate::xml::{Element, Node};
use itertools::Itertools;

const INLINE: &[&str] = &["b", "i", "u", "sub", "sup", "span", "strong", "em"];

/// The import pass 2 stylesheet
pub struct XhtmlCleanup;

impl Stylesheet for XhtmlCleanup {
    fn apply(
        &self,
        input: &roxmltree::Document,
        _params: &ConversionParameters,
    ) -> Result<String, StylesheetError> {
        let html = require_child(input, "html")?;
        let mut html = Element::from_node(html);
        normalize(&mut html, false);
        Ok(html.to_xml())
    }
}

fn is_inline(element: &Element) -> bool {
    INLINE.contains(&element.name.as_str())
}

fn normalize(element: &mut Element, in_table: bool) {
    let in_table = in_table || element.name == "table";
    if let Some(class) = element.get_attr("class") {
        let collapsed = class.split_whitespace().join(" ");
        element.set_attr("class", collapsed);
    }

    let mut children = Vec::with_capacity(element.children.len());
    for child in std::mem::take(&mut element.children) {
        match child {
            Node::Element(mut el) => {
                normalize(&mut el, in_table);
                if is_inline(&el) {
                    if el.children.is_empty() {
                        continue;
                    }
                    if el.is_blank() || (el.name == "span" && el.attrs.is_empty()) {
                        children.extend(el.children);
                        continue;
                    }
                } else if el.name == "p" && !in_table && el.is_blank() {
                    continue;
                }
                children.push(Node::Element(el));
            }
            Node::Comment(_) => {}
            other => children.push(other),
        }
    }
    element.children = merge_siblings(children);
}

/// Join adjacent text nodes and adjacent identical inline elements
fn merge_siblings(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let merged = match (out.last_mut(), &node) {
            (Some(Node::Text(prev)), Node::Text(text)) => {
                prev.push_str(text);
                true
            }
            (Some(Node::Element(prev)), Node::Element(el))
                if is_inline(el) && prev.name == el.name && prev.attrs == el.attrs =>
            {
                let mut joined = std::mem::take(&mut prev.children);
                joined.extend(el.children.iter().cloned());
                prev.children = merge_siblings(joined);
                true
            }
            _ => false,
        };
        if !merged {
            out.push(node);
        }
    }
    out
}
