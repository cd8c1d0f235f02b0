//! The XML-RPC value model

use crate::binary::Base64;
use crate::datetime::DateTime;
use crate::error::ValueError;
use indexmap::IndexMap;

/// Members of a `<struct>`, in insertion order. Inserting an existing key
/// replaces its value in place.
pub type Struct = IndexMap<String, Value>;

/// Any value that can travel inside a `<value>` element.
///
/// `Nil` stands for an absent value: it is never written to the wire, and
/// array items, struct members and parameters holding it are left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
    DateTime(DateTime),
    Base64(Base64),
    Array(Vec<Value>),
    Struct(Struct),
}

impl Value {
    /// Name of the wire tag this value is written as.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Doubles, and ints widened to doubles
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_base64(&self) -> Option<&Base64> {
        match self {
            Value::Base64(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Like [`Value::as_i64`], but reports what was found instead.
    ///
    /// Handlers use the `expect_*` family with `?` so that a wrongly typed
    /// parameter becomes a value fault.
    pub fn expect_i64(&self) -> Result<i64, ValueError> {
        self.as_i64().ok_or_else(|| self.mismatch("int"))
    }

    pub fn expect_str(&self) -> Result<&str, ValueError> {
        self.as_str().ok_or_else(|| self.mismatch("string"))
    }

    pub fn expect_f64(&self) -> Result<f64, ValueError> {
        self.as_f64().ok_or_else(|| self.mismatch("double"))
    }

    pub fn expect_bool(&self) -> Result<bool, ValueError> {
        self.as_bool().ok_or_else(|| self.mismatch("boolean"))
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Base64> for Value {
    fn from(v: Base64) -> Self {
        Value::Base64(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Self {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Struct(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
