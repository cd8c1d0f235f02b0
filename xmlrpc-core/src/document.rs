//! Owned XML element tree
//!
//! `roxmltree` documents borrow the text they were parsed from, so a message
//! that must own its document converts the parsed tree once into plain
//! [`Element`] values. Namespaces are dropped; elements are matched by local
//! name, which is all the XML-RPC grammar needs.

use crate::error::ValueError;
use roxmltree::Node;
use std::str::FromStr;

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parses XML text into an owned tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_core::Document;
    ///
    /// let doc = Document::parse("<methodCall><methodName>ping</methodName></methodCall>").unwrap();
    /// assert_eq!(doc.root().name(), "methodCall");
    /// assert_eq!(doc.root().child("methodName").and_then(|e| e.text()), Some("ping"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        let doc =
            roxmltree::Document::parse(text).map_err(|e| ValueError::Malformed(e.to_string()))?;
        Ok(Self {
            root: Element::from_node(doc.root_element()),
        })
    }

    /// Wraps an already built element tree.
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// The document element
    pub fn root(&self) -> &Element {
        &self.root
    }
}

impl FromStr for Document {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::parse(s)
    }
}

/// An XML element with its direct text and child elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn from_node(node: Node<'_, '_>) -> Self {
        let mut element = Element::new(node.tag_name().name());
        for child in node.children() {
            if child.is_element() {
                element.children.push(Element::from_node(child));
            } else if child.is_text()
                && let Some(text) = child.text()
            {
                element
                    .text
                    .get_or_insert_with(String::new)
                    .push_str(text);
            }
        }
        element
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concatenated text nodes directly under this element, `None` when there are none.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The first child element, whatever its name
    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }

    /// The first child element called `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child element called `name`, in document order
    pub fn children<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element reached by a `/`-separated path of child names.
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    /// All elements reached by a `/`-separated path of child names, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children(segment))
                .collect();
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_all_follows_every_branch() {
        let doc = Document::parse(
            "<methodCall><params>\
             <param><value>a</value></param>\
             <param><value>b</value></param>\
             </params></methodCall>",
        )
        .unwrap();
        let values: Vec<_> = doc
            .root()
            .find_all("params/param/value")
            .into_iter()
            .filter_map(Element::text)
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_found_elements_outlive_the_path() {
        let doc = Document::parse(
            "<struct><member><name>a</name></member><member><name>b</name></member></struct>",
        )
        .unwrap();
        let found = {
            let path = format!("{}/{}", "member", "name");
            doc.root().find_all(&path)
        };
        let names: Vec<_> = found.into_iter().filter_map(Element::text).collect();
        assert_eq!(names, vec!["a", "b"]);

        let members = {
            let name = String::from("member");
            doc.root().children(&name).collect::<Vec<_>>()
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_whitespace_text_is_kept_beside_children() {
        let doc = Document::parse("<value>\n  <int>1</int>\n</value>").unwrap();
        assert_eq!(doc.root().first_child().map(Element::name), Some("int"));
        assert!(doc.root().text().is_some());
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = Document::parse("<string>a &amp; b &lt;c&gt;</string>").unwrap();
        assert_eq!(doc.root().text(), Some("a & b <c>"));
    }

    #[test]
    fn test_malformed_document() {
        let err = Document::parse("<methodCall><methodName>").unwrap_err();
        assert!(matches!(err, ValueError::Malformed(_)));
    }

    #[test]
    fn test_missing_path() {
        let doc = Document::parse("<methodResponse/>").unwrap();
        assert!(doc.root().find("params/param/value").is_none());
    }
}
