//! XML-RPC faults

use crate::codec::{build_value, close, open};
use crate::error::ValueError;
use crate::value::{Struct, Value};
use quick_xml::Writer;
use std::error::Error;
use std::fmt;
use std::io::Write;

/// Code used when a value in the request cannot be read
pub const VALUE_ERROR_CODE: i64 = -1;
/// Code used when the requested method is not registered
pub const UNKNOWN_METHOD_CODE: i64 = -2;
/// Code used for any other handler failure
pub const INTERNAL_ERROR_CODE: i64 = 0;

/// An RPC-level failure with a machine-readable code.
///
/// Handlers return a `Fault` to send a specific code back to the caller; the
/// dispatcher passes it through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    code: i64,
    message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unknown_method() -> Self {
        Self::new(UNKNOWN_METHOD_CODE, "Unknown method")
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    /// The fault string
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `<struct>` carried inside `<fault><value>`: `faultString`, then `faultCode`.
    pub fn to_value(&self) -> Value {
        let mut members = Struct::with_capacity(2);
        members.insert("faultString".to_string(), Value::String(self.message.clone()));
        members.insert("faultCode".to_string(), Value::Int(self.code));
        Value::Struct(members)
    }

    /// Writes `<fault><value><struct>…</struct></value></fault>`.
    pub fn build_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), ValueError> {
        open(writer, "fault")?;
        open(writer, "value")?;
        build_value(writer, &self.to_value())?;
        close(writer, "value")?;
        close(writer, "fault")
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl Error for Fault {}

impl From<ValueError> for Fault {
    fn from(err: ValueError) -> Self {
        Fault::new(VALUE_ERROR_CODE, err.to_string())
    }
}
