//! `<methodResponse>` envelopes

use super::message::Message;
use crate::codec::{close, finish, new_writer, open, parse_value, write_value};
use crate::document::{Document, Element};
use crate::error::{RequestError, ValueError};
use crate::fault::Fault;
use crate::value::Value;
use std::sync::OnceLock;

/// Ways to create a [`Response`]: an existing document (`xml` or
/// `document`), a return `value`, or a `fault`. Exactly one must be given.
///
/// `value: Some(Value::Nil)` is a response without a return value.
#[derive(Debug, Default)]
pub struct ResponseOptions {
    pub xml: Option<String>,
    pub document: Option<Document>,
    pub value: Option<Value>,
    pub fault: Option<Fault>,
    pub indent: usize,
}

/// The outcome of an XML-RPC call: a return value or a [`Fault`].
///
/// Like [`Request`](crate::Request), the fault and value are read lazily and
/// cached, and the response is immutable once built.
#[derive(Debug)]
pub struct Response {
    message: Message,
    fault: OnceLock<Result<Option<Fault>, ValueError>>,
    value: OnceLock<Result<Value, ValueError>>,
}

impl Response {
    pub fn from_options(options: ResponseOptions) -> Result<Self, RequestError> {
        let ResponseOptions {
            xml,
            document,
            value,
            fault,
            indent,
        } = options;

        let message = match (xml, document, value, fault) {
            (Some(_), Some(_), _, _) => {
                return Err(RequestError::InvalidOptions(
                    "You cannot include both xml and document options".to_string(),
                ));
            }
            (Some(_), None, Some(_), _)
            | (Some(_), None, None, Some(_))
            | (None, Some(_), Some(_), _)
            | (None, Some(_), None, Some(_)) => {
                return Err(RequestError::InvalidOptions(
                    "You cannot include both xml and value or fault options".to_string(),
                ));
            }
            (None, None, Some(_), Some(_)) => {
                return Err(RequestError::InvalidOptions(
                    "You cannot include both value and fault options".to_string(),
                ));
            }
            (Some(xml), None, None, None) => Message::from_xml(xml)?,
            (None, Some(document), None, None) => Message::from_document(document),
            (None, None, Some(value), None) => Message::from_xml(build_success(&value, indent)?)?,
            (None, None, None, Some(fault)) => Message::from_xml(build_fault(&fault, indent)?)?,
            (None, None, None, None) => {
                return Err(RequestError::InvalidOptions(
                    "You must include either xml or document or value or fault option".to_string(),
                ));
            }
        };

        Ok(Self {
            message,
            fault: OnceLock::new(),
            value: OnceLock::new(),
        })
    }

    /// Reads a response received as text.
    pub fn parse(xml: impl Into<String>) -> Result<Self, RequestError> {
        Self::from_options(ResponseOptions {
            xml: Some(xml.into()),
            ..Default::default()
        })
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            message: Message::from_document(document),
            fault: OnceLock::new(),
            value: OnceLock::new(),
        }
    }

    /// A successful response carrying `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_core::{Response, Value};
    ///
    /// let response = Response::success(Value::Int(3)).unwrap();
    /// assert_eq!(
    ///     response.xml().unwrap(),
    ///     "<methodResponse><params><param><value><int>3</int></value></param></params></methodResponse>"
    /// );
    /// assert!(response.is_valid());
    /// ```
    pub fn success(value: Value) -> Result<Self, RequestError> {
        Self::success_indented(value, 0)
    }

    pub fn success_indented(value: Value, indent: usize) -> Result<Self, RequestError> {
        Self::from_options(ResponseOptions {
            value: Some(value),
            indent,
            ..Default::default()
        })
    }

    pub fn from_fault(fault: Fault) -> Result<Self, RequestError> {
        Self::from_fault_indented(fault, 0)
    }

    pub fn from_fault_indented(fault: Fault, indent: usize) -> Result<Self, RequestError> {
        Self::from_options(ResponseOptions {
            fault: Some(fault),
            indent,
            ..Default::default()
        })
    }

    pub fn xml(&self) -> Option<&str> {
        self.message.xml()
    }

    pub fn document(&self) -> &Document {
        self.message.document()
    }

    /// The fault carried by the response, if any.
    pub fn fault(&self) -> Result<Option<&Fault>, ValueError> {
        self.fault
            .get_or_init(|| read_fault(self.message.root()))
            .as_ref()
            .map(Option::as_ref)
            .map_err(Clone::clone)
    }

    pub fn fault_code(&self) -> Option<i64> {
        self.fault().ok().flatten().map(Fault::code)
    }

    pub fn fault_string(&self) -> Option<&str> {
        self.fault().ok().flatten().map(Fault::message)
    }

    /// True when the response carries no fault.
    pub fn is_valid(&self) -> bool {
        matches!(self.fault(), Ok(None))
    }

    /// `"{fault string} ({fault code})"` for a fault response.
    pub fn error(&self) -> Option<String> {
        self.fault()
            .ok()
            .flatten()
            .map(|fault| format!("{} ({})", fault.message(), fault.code()))
    }

    /// The return value; [`Value::Nil`] when there is none.
    pub fn value(&self) -> Result<&Value, ValueError> {
        self.value
            .get_or_init(|| self.message.value_at("params/param/value"))
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn build_success(value: &Value, indent: usize) -> Result<String, ValueError> {
    let mut writer = new_writer(indent);
    open(&mut writer, "methodResponse")?;
    open(&mut writer, "params")?;
    if !value.is_nil() {
        open(&mut writer, "param")?;
        write_value(&mut writer, value)?;
        close(&mut writer, "param")?;
    }
    close(&mut writer, "params")?;
    close(&mut writer, "methodResponse")?;
    finish(writer, indent)
}

fn build_fault(fault: &Fault, indent: usize) -> Result<String, ValueError> {
    let mut writer = new_writer(indent);
    open(&mut writer, "methodResponse")?;
    fault.build_xml(&mut writer)?;
    close(&mut writer, "methodResponse")?;
    finish(writer, indent)
}

fn fault_member<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    root.find_all("fault/value/struct/member")
        .into_iter()
        .find(|member| member.child("name").and_then(Element::text).map(str::trim) == Some(name))
}

fn read_fault(root: &Element) -> Result<Option<Fault>, ValueError> {
    let code = fault_member(root, "faultCode")
        .map(|member| parse_value(member.child("value")))
        .transpose()?;
    let string = fault_member(root, "faultString")
        .map(|member| parse_value(member.child("value")))
        .transpose()?;
    if code.is_none() && string.is_none() {
        return Ok(None);
    }

    let code = match code.unwrap_or_default() {
        Value::Nil => 0,
        Value::Int(code) => code,
        Value::String(text) => text.trim().parse().map_err(|_| ValueError::InvalidScalar {
            kind: "int",
            text,
        })?,
        other => {
            return Err(ValueError::TypeMismatch {
                expected: "int",
                found: other.type_name(),
            });
        }
    };
    let message = match string.unwrap_or_default() {
        Value::Nil => String::new(),
        Value::String(text) => text,
        other => {
            return Err(ValueError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            });
        }
    };
    Ok(Some(Fault::new(code, message)))
}
