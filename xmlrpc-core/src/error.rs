//! Error types shared by the codec, the message layer and the client.

use std::error::Error;
use std::fmt;

/// Raised while reading or writing `<value>` fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The typed child of a `<value>` is not one of the eight known tags
    UnknownType(String),
    /// A scalar tag whose text cannot be read as its declared type
    InvalidScalar { kind: &'static str, text: String },
    /// The payload of a `<base64>` value does not decode
    InvalidBase64(String),
    /// The document is not well-formed XML
    Malformed(String),
    /// A value of one type was found where another was required
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The XML writer failed
    Write(String),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::UnknownType(name) => write!(f, "Unknown data type in value: {}", name),
            ValueError::InvalidScalar { kind, text } => {
                write!(f, "Invalid {} value: {:?}", kind, text)
            }
            ValueError::InvalidBase64(e) => write!(f, "Invalid base64 value: {}", e),
            ValueError::Malformed(e) => write!(f, "Malformed XML: {}", e),
            ValueError::TypeMismatch { expected, found } => {
                write!(f, "Expected {} value, found {}", expected, found)
            }
            ValueError::Write(e) => write!(f, "XML write error: {}", e),
        }
    }
}

impl Error for ValueError {}

/// Raised when a message cannot be constructed or a remote call fails at
/// the HTTP level. XML-RPC faults are reported through
/// [`Response::fault`](crate::Response::fault) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Conflicting or missing construction options
    InvalidOptions(String),
    /// The server answered with a non-success status
    Http { status: u16, reason: String },
    /// The URL cannot be used by the transport
    InvalidUrl(String),
    /// Connection or protocol failure below the XML-RPC layer
    Transport(String),
    /// The message XML could not be read or written
    Value(ValueError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidOptions(msg) => write!(f, "{}", msg),
            RequestError::Http { status, reason } => {
                write!(f, "HTTP Response: {} {}", status, reason)
            }
            RequestError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            RequestError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RequestError::Value(e) => write!(f, "{}", e),
        }
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RequestError::Value(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValueError> for RequestError {
    fn from(err: ValueError) -> Self {
        RequestError::Value(err)
    }
}
