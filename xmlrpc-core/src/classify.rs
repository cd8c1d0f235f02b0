//! Inbound payload classification
//!
//! Decides whether an XML body is an XML-RPC call before handing it to the
//! dispatcher, so that a server can route other XML elsewhere.

use crate::error::ValueError;
use roxmltree::Document;

/// What an inbound body turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Well-formed XML with a `<methodCall>` root
    XmlRpc,
    /// Well-formed XML with another root element, named here
    Xml(String),
    /// Not UTF-8, or not well-formed XML
    Unknown,
}

/// Classifies a request body by its root element.
///
/// # Examples
///
/// ```
/// use xmlrpc_core::{Payload, classify_payload};
///
/// let body = br#"<?xml version="1.0"?>
/// <methodCall>
///   <methodName>examples.getStateName</methodName>
/// </methodCall>"#;
/// assert_eq!(classify_payload(body), Payload::XmlRpc);
/// assert_eq!(classify_payload(b"<data/>"), Payload::Xml("data".to_string()));
/// ```
pub fn classify_payload(body: &[u8]) -> Payload {
    let Ok(text) = std::str::from_utf8(body) else {
        return Payload::Unknown;
    };
    match Document::parse(text) {
        Ok(doc) => match doc.root_element().tag_name().name() {
            "methodCall" => Payload::XmlRpc,
            other => Payload::Xml(other.to_string()),
        },
        Err(_) => Payload::Unknown,
    }
}

/// Returns `true` if the body is an XML-RPC `<methodCall>`.
pub fn detect_xmlrpc(body: &[u8]) -> bool {
    classify_payload(body) == Payload::XmlRpc
}

/// Reads the `<methodName>` of a call without decoding its parameters.
pub fn extract_method(body: &[u8]) -> Result<String, ValueError> {
    let text = std::str::from_utf8(body).map_err(|e| ValueError::Malformed(e.to_string()))?;
    let doc = Document::parse(text).map_err(|e| ValueError::Malformed(e.to_string()))?;

    doc.root_element()
        .children()
        .find(|node| node.has_tag_name("methodName"))
        .and_then(|node| node.text())
        .map(|name| name.trim().to_string())
        .ok_or_else(|| ValueError::Malformed("No methodName found".to_string()))
}
