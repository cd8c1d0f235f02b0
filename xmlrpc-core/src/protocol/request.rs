//! `<methodCall>` envelopes

use super::message::Message;
use crate::codec::{close, finish, new_writer, open, write_text_element, write_value};
use crate::document::Document;
use crate::error::{RequestError, ValueError};
use crate::value::Value;
use std::sync::OnceLock;

/// Ways to create a [`Request`]: either an existing document (`xml` or
/// `document`) or a call to build (`method` and `params`), never both.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub xml: Option<String>,
    pub document: Option<Document>,
    pub method: Option<String>,
    pub params: Option<Vec<Value>>,
    /// Spaces per nesting level when building; 0 writes everything on one line
    pub indent: usize,
}

/// An XML-RPC method call.
///
/// The method name and parameters are read from the document on first
/// access and cached. A request never changes after construction, so the
/// caches need no further synchronization and a request can be shared
/// between threads.
#[derive(Debug)]
pub struct Request {
    message: Message,
    method_name: OnceLock<Result<String, ValueError>>,
    params: OnceLock<Result<Vec<Value>, ValueError>>,
}

impl Request {
    pub fn from_options(options: RequestOptions) -> Result<Self, RequestError> {
        let RequestOptions {
            xml,
            document,
            method,
            params,
            indent,
        } = options;

        let message = match (xml, document, method, params) {
            (Some(_), Some(_), _, _) => {
                return Err(RequestError::InvalidOptions(
                    "You cannot include both xml and document options".to_string(),
                ));
            }
            (Some(_), None, Some(_), _)
            | (None, Some(_), Some(_), _)
            | (Some(_), None, None, Some(_))
            | (None, Some(_), None, Some(_)) => {
                return Err(RequestError::InvalidOptions(
                    "You cannot include both xml and method parameters".to_string(),
                ));
            }
            (Some(xml), None, None, None) => Message::from_xml(xml)?,
            (None, Some(document), None, None) => Message::from_document(document),
            (None, None, Some(method), Some(params)) => {
                Message::from_xml(build_call(&method, &params, indent)?)?
            }
            (None, None, _, _) => {
                return Err(RequestError::InvalidOptions(
                    "You must include either xml or document or method and params options"
                        .to_string(),
                ));
            }
        };

        Ok(Self::from_message(message))
    }

    /// Reads a request received as text.
    pub fn parse(xml: impl Into<String>) -> Result<Self, RequestError> {
        Self::from_options(RequestOptions {
            xml: Some(xml.into()),
            ..Default::default()
        })
    }

    pub fn from_document(document: Document) -> Self {
        Self::from_message(Message::from_document(document))
    }

    /// Builds a call on a single line.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_core::{Request, Value};
    ///
    /// let request = Request::new("add", vec![Value::Int(1), Value::Int(2)]).unwrap();
    /// assert_eq!(
    ///     request.xml().unwrap(),
    ///     "<methodCall><methodName>add</methodName><params>\
    ///      <param><value><int>1</int></value></param>\
    ///      <param><value><int>2</int></value></param>\
    ///      </params></methodCall>"
    /// );
    /// ```
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Result<Self, RequestError> {
        Self::with_indent(method, params, 0)
    }

    /// Builds a call, indenting nested elements by `indent` spaces.
    pub fn with_indent(
        method: impl Into<String>,
        params: Vec<Value>,
        indent: usize,
    ) -> Result<Self, RequestError> {
        Self::from_options(RequestOptions {
            method: Some(method.into()),
            params: Some(params),
            indent,
            ..Default::default()
        })
    }

    fn from_message(message: Message) -> Self {
        Self {
            message,
            method_name: OnceLock::new(),
            params: OnceLock::new(),
        }
    }

    pub fn xml(&self) -> Option<&str> {
        self.message.xml()
    }

    pub fn document(&self) -> &Document {
        self.message.document()
    }

    /// The `<methodName>` text. A request without one has an empty name.
    pub fn method_name(&self) -> Result<&str, ValueError> {
        self.method_name
            .get_or_init(|| match self.message.value_at("methodName")? {
                Value::String(name) => Ok(name),
                Value::Nil => Ok(String::new()),
                other => Err(ValueError::TypeMismatch {
                    expected: "string",
                    found: other.type_name(),
                }),
            })
            .as_deref()
            .map_err(Clone::clone)
    }

    /// Values of every `params/param/value`, in order.
    pub fn params(&self) -> Result<&[Value], ValueError> {
        self.params
            .get_or_init(|| {
                self.message
                    .root()
                    .find_all("params/param")
                    .into_iter()
                    .map(|param| crate::codec::parse_value(param.child("value")))
                    .collect()
            })
            .as_deref()
            .map_err(Clone::clone)
    }
}

fn build_call(method: &str, params: &[Value], indent: usize) -> Result<String, ValueError> {
    let mut writer = new_writer(indent);
    open(&mut writer, "methodCall")?;
    write_text_element(&mut writer, "methodName", method)?;
    open(&mut writer, "params")?;
    for param in params.iter().filter(|p| !p.is_nil()) {
        open(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodCall")?;
    finish(writer, indent)
}
