//! Best-effort parsing of response bodies into an owned document tree.

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;
use std::collections::BTreeMap;

/// A parsed response document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => out.push_str(&element.text()),
            }
        }
        out
    }

    /// First descendant element named `name`, searched depth-first.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| match child {
            XmlNode::Element(element) if element.name == name => Some(element),
            XmlNode::Element(element) => element.find(name),
            XmlNode::Text(_) => None,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn from_dom(element: Element<'_>) -> Self {
        let attributes = element
            .attributes()
            .into_iter()
            .map(|attr| (attr.name().local_part().to_string(), attr.value().to_string()))
            .collect();

        let children = element
            .children()
            .into_iter()
            .filter_map(|child| match child {
                ChildOfElement::Element(e) => Some(XmlNode::Element(XmlElement::from_dom(e))),
                ChildOfElement::Text(t) => Some(XmlNode::Text(t.text().to_string())),
                _ => None,
            })
            .collect();

        Self {
            name: element.name().local_part().to_string(),
            namespace: element.name().namespace_uri().map(str::to_string),
            attributes,
            children,
        }
    }
}

/// Whether a response with this content type should be parsed as a document.
///
/// A missing content type counts as XML.
pub(crate) fn is_xml_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            value.contains("text/xml")
                || value.contains("application/xml")
                || value.contains("+xml")
        }
    }
}

/// Parse `text`, returning `None` when it is not well-formed.
pub(crate) fn parse(text: &str) -> Option<XmlDocument> {
    let package = parser::parse(text).ok()?;
    let document = package.as_document();

    let root = document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(XmlElement::from_dom(element)),
        _ => None,
    })?;

    Some(XmlDocument { root })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc = parse(r#"<users count="1"><user><name>Ada</name></user></users>"#).unwrap();
        assert_eq!(doc.root.name, "users");
        assert_eq!(doc.root.attribute("count"), Some("1"));
        assert_eq!(doc.root.find("name").unwrap().text(), "Ada");
    }

    #[test]
    fn test_parse_failure_is_none() {
        assert!(parse(r#"{"ok":true}"#).is_none());
        assert!(parse("<open>").is_none());
    }

    #[test]
    fn test_xml_content_types() {
        assert!(is_xml_content_type(None));
        assert!(is_xml_content_type(Some("application/xml")));
        assert!(is_xml_content_type(Some("application/atom+xml; charset=utf-8")));
        assert!(!is_xml_content_type(Some("application/json")));
    }
}
