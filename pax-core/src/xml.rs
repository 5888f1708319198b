use crate::{PaxError, Result};
use roxmltree::Document;
use std::collections::BTreeMap;

/// An opening (or self-closing) element with its unescaped attributes.
pub(crate) struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn required(&self, key: &str, origin: &str) -> Result<&str> {
        self.attr(key).ok_or_else(|| PaxError::ParseXml {
            origin: origin.to_string(),
            reason: format!("<{}> is missing the {key} attribute", self.name),
        })
    }
}

pub(crate) enum Node {
    Open(Element),
    Text(String),
    Close(String),
}

/// Walks `xml` and hands every element boundary and non-blank text run to
/// `visit`, in document order.
pub(crate) fn walk<F>(xml: &str, origin: &str, mut visit: F) -> Result<()>
where
    F: FnMut(Node) -> Result<()>,
{
    let document = Document::parse(xml).map_err(|err| PaxError::ParseXml {
        origin: origin.to_string(),
        reason: err.to_string(),
    })?;

    visit_element(document.root_element(), &mut visit)
}

fn visit_element<F>(node: roxmltree::Node<'_, '_>, visit: &mut F) -> Result<()>
where
    F: FnMut(Node) -> Result<()>,
{
    visit(Node::Open(element(&node)))?;

    for child in node.children() {
        if child.is_element() {
            visit_element(child, visit)?;
        } else if child.is_text() {
            let text = child.text().unwrap_or("").trim();
            if !text.is_empty() {
                visit(Node::Text(text.to_string()))?;
            }
        }
    }

    visit(Node::Close(node.tag_name().name().to_string()))
}

fn element(node: &roxmltree::Node<'_, '_>) -> Element {
    let attributes = node
        .attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect();

    Element {
        name: node.tag_name().name().to_string(),
        attributes,
    }
}
