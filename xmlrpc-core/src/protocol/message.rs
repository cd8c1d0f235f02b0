//! State shared by requests and responses

use crate::codec::parse_value;
use crate::document::{Document, Element};
use crate::error::ValueError;
use crate::value::Value;

/// A parsed XML-RPC document together with the text it came from.
///
/// Text is parsed exactly once, when the message is created. Messages built
/// from an already parsed [`Document`] have no text.
#[derive(Debug, Clone)]
pub struct Message {
    xml: Option<String>,
    document: Document,
}

impl Message {
    pub fn from_xml(xml: impl Into<String>) -> Result<Self, ValueError> {
        let xml = xml.into();
        let document = Document::parse(&xml)?;
        Ok(Self {
            xml: Some(xml),
            document,
        })
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            xml: None,
            document,
        }
    }

    pub fn xml(&self) -> Option<&str> {
        self.xml.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn root(&self) -> &Element {
        self.document.root()
    }

    /// Reads the first `<value>` reached by `path` from the document root.
    pub fn value_at(&self, path: &str) -> Result<Value, ValueError> {
        parse_value(self.root().find(path))
    }
}
