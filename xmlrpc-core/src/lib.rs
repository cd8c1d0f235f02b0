//! XML-RPC values, messages, dispatch and client calls.
//!
//! Values map onto the XML-RPC data types through [`Value`]. A [`Request`]
//! or [`Response`] wraps one `<methodCall>` or `<methodResponse>` document,
//! either built from Rust values or read from received text. A
//! [`Dispatcher`] maps method names to handlers and turns request text into
//! response text, and [`send_request`] calls a remote service over HTTP.

mod binary;
mod classify;
mod client;
mod codec;
mod datetime;
mod dispatcher;
mod document;
mod error;
mod fault;
mod metrics;
pub mod protocol;
mod value;

pub use binary::Base64;
pub use classify::{Payload, classify_payload, detect_xmlrpc, extract_method};
pub use client::{
    Client, HttpReply, HttpTransport, Transport, XML_CONTENT_TYPE, execute, send_request,
};
pub use codec::{build_value, parse_value};
pub use datetime::DateTime;
pub use dispatcher::{Dispatcher, Handler, HandlerError, handle_request};
pub use document::{Document, Element};
pub use error::{RequestError, ValueError};
pub use fault::{Fault, INTERNAL_ERROR_CODE, UNKNOWN_METHOD_CODE, VALUE_ERROR_CODE};
pub use metrics::DispatchMetrics;
pub use protocol::{Message, Request, RequestOptions, Response, ResponseOptions};
pub use value::{Struct, Value};
