//! Routing inbound calls to handlers
//!
//! [`Dispatcher::handle_request`] always produces a [`Response`]: unknown
//! methods, unreadable values and failing handlers all become faults.

use crate::document::{Document, Element};
use crate::error::ValueError;
use crate::fault::{Fault, INTERNAL_ERROR_CODE, VALUE_ERROR_CODE};
use crate::metrics::DispatchMetrics;
use crate::protocol::{Request, Response};
use crate::value::Value;
use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Why a handler did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// Sent back unchanged
    Fault(Fault),
    /// Sent back with code -1
    Value(ValueError),
    /// Sent back with code 0
    Other(String),
}

impl HandlerError {
    pub fn into_fault(self) -> Fault {
        match self {
            HandlerError::Fault(fault) => fault,
            HandlerError::Value(err) => Fault::new(VALUE_ERROR_CODE, err.to_string()),
            HandlerError::Other(message) => Fault::new(INTERNAL_ERROR_CODE, message),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Fault(fault) => write!(f, "{}", fault),
            HandlerError::Value(err) => write!(f, "{}", err),
            HandlerError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl Error for HandlerError {}

impl From<Fault> for HandlerError {
    fn from(fault: Fault) -> Self {
        HandlerError::Fault(fault)
    }
}

impl From<ValueError> for HandlerError {
    fn from(err: ValueError) -> Self {
        HandlerError::Value(err)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Other(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Other(message.to_string())
    }
}

impl From<Box<dyn Error + Send + Sync>> for HandlerError {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        HandlerError::Other(err.to_string())
    }
}

/// Business logic behind one method name. Parameters arrive positionally.
pub trait Handler: Send + Sync {
    fn call(&self, params: &[Value]) -> Result<Value, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&[Value]) -> Result<Value, HandlerError> + Send + Sync,
{
    fn call(&self, params: &[Value]) -> Result<Value, HandlerError> {
        self(params)
    }
}

/// A whitelist of method names and the handlers they map to.
///
/// Method names are matched exactly, so names containing `.` such as
/// `examples.getStateName` need no escaping.
///
/// # Examples
///
/// ```
/// use xmlrpc_core::{Dispatcher, Value};
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.register("add", |params: &[Value]| {
///     Ok(Value::Int(params[0].expect_i64()? + params[1].expect_i64()?))
/// });
///
/// let response = dispatcher.handle_request(
///     "<methodCall><methodName>add</methodName><params>\
///      <param><value><int>1</int></value></param>\
///      <param><value><int>2</int></value></param>\
///      </params></methodCall>",
/// );
/// assert_eq!(
///     response.xml().unwrap(),
///     "<methodResponse><params><param><value><int>3</int></value></param></params></methodResponse>"
/// );
/// ```
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
    metrics: Option<DispatchMetrics>,
    indent: usize,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `name` to a closure. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register_handler(name, handler)
    }

    pub fn register_handler<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Indentation used for the responses this dispatcher builds.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Decodes `xml`, runs the mapped handler and encodes its outcome.
    pub fn handle_request(&self, xml: &str) -> Response {
        let started = Instant::now();
        let (method, outcome) = self.dispatch(xml);

        match &outcome {
            Ok(_) => debug!("Call to {} succeeded", method.unwrap_or_default()),
            Err(fault) => warn!(
                "Call to {} failed with fault {}: {}",
                method.unwrap_or("<unknown>"),
                fault.code(),
                fault.message()
            ),
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe(method, outcome.as_ref().err(), started.elapsed());
        }

        self.respond(outcome)
    }

    /// Returns the registered method name, if any, and the call outcome.
    fn dispatch(&self, xml: &str) -> (Option<&str>, Result<Value, Fault>) {
        let request = match Request::parse(xml) {
            Ok(request) => request,
            Err(err) => return (None, Err(Fault::new(VALUE_ERROR_CODE, err.to_string()))),
        };
        let name = match request.method_name() {
            Ok(name) => name,
            Err(err) => return (None, Err(err.into())),
        };
        let Some((method, handler)) = self.handlers.get_key_value(name) else {
            debug!("Rejecting call to unknown method {:?}", name);
            return (None, Err(Fault::unknown_method()));
        };
        let method = Some(method.as_str());
        let params = match request.params() {
            Ok(params) => params,
            Err(err) => return (method, Err(err.into())),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler.call(params))) {
            Ok(Ok(value)) => (method, Ok(value)),
            Ok(Err(err)) => (method, Err(err.into_fault())),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Handler for {} panicked: {}", method.unwrap_or_default(), message);
                (method, Err(Fault::new(INTERNAL_ERROR_CODE, message)))
            }
        }
    }

    fn respond(&self, outcome: Result<Value, Fault>) -> Response {
        let (built, declared) = match outcome {
            Ok(value) => (Response::success_indented(value, self.indent), None),
            Err(fault) => (
                Response::from_fault_indented(fault.clone(), self.indent),
                Some(fault),
            ),
        };
        built.unwrap_or_else(|err| {
            error!("Failed to encode response: {}", err);
            // A declared fault keeps its code; only its text is cleaned up.
            let fault = match declared {
                Some(fault) => Fault::new(fault.code(), xml_chars_only(fault.message())),
                None => Fault::new(INTERNAL_ERROR_CODE, err.to_string()),
            };
            Response::from_fault_indented(fault.clone(), self.indent)
                .unwrap_or_else(|_| fallback_response(&fault))
        })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.methods())
            .field("metrics", &self.metrics.is_some())
            .field("indent", &self.indent)
            .finish()
    }
}

/// Runs `xml` through `dispatcher`.
pub fn handle_request(xml: &str, dispatcher: &Dispatcher) -> Response {
    dispatcher.handle_request(xml)
}

/// Drops characters that XML 1.0 documents cannot carry.
fn xml_chars_only(text: &str) -> String {
    text.chars()
        .filter(|c| {
            matches!(c,
                '\t' | '\n' | '\r'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}')
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

// Built without the writer so that it cannot fail.
fn fallback_response(fault: &Fault) -> Response {
    let member = |name: &str, kind: &str, text: String| {
        Element::new("member")
            .with_child(Element::new("name").with_text(name))
            .with_child(Element::new("value").with_child(Element::new(kind).with_text(text)))
    };
    let root = Element::new("methodResponse").with_child(
        Element::new("fault").with_child(
            Element::new("value").with_child(
                Element::new("struct")
                    .with_child(member("faultString", "string", fault.message().to_string()))
                    .with_child(member("faultCode", "int", fault.code().to_string())),
            ),
        ),
    );
    Response::from_document(Document::new(root))
}
