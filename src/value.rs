// ABOUTME: Dynamic BSON value type covering every supported element type.
// ABOUTME: Also provides the bson! and doc! construction macros.

use crate::document::{Array, Document};
use crate::error::Error;
use crate::oid::ObjectId;
use crate::raw::{RawArray, RawDocument};
use crate::timestamp::Timestamp;
use crate::types::{Binary, DateTime, ElementType, Regex};
use std::fmt;

/// A BSON value.
///
/// The variants are the closed set of element types this codec supports,
/// plus raw variants that carry pre-encoded documents and arrays through
/// unchanged.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// 64-bit IEEE-754 floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Embedded document
    Document(Document),
    /// Embedded array
    Array(Array),
    Binary(Binary),
    ObjectId(ObjectId),
    Boolean(bool),
    /// UTC milliseconds since the Unix epoch
    DateTime(DateTime),
    #[default]
    Null,
    Regex(Regex),
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    /// Pre-encoded document, copied verbatim when encoding
    RawDocument(RawDocument),
    /// Pre-encoded array, copied verbatim when encoding
    RawArray(RawArray),
}

impl Value {
    /// The wire type tag this value encodes as.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Double(_) => ElementType::Double,
            Value::String(_) => ElementType::String,
            Value::Document(_) | Value::RawDocument(_) => ElementType::Document,
            Value::Array(_) | Value::RawArray(_) => ElementType::Array,
            Value::Binary(_) => ElementType::Binary,
            Value::ObjectId(_) => ElementType::ObjectId,
            Value::Boolean(_) => ElementType::Boolean,
            Value::DateTime(_) => ElementType::DateTime,
            Value::Null => ElementType::Null,
            Value::Regex(_) => ElementType::Regex,
            Value::Int32(_) => ElementType::Int32,
            Value::Timestamp(_) => ElementType::Timestamp,
            Value::Int64(_) => ElementType::Int64,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Value::DateTime(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Value::Regex(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw_document(&self) -> Option<&RawDocument> {
        match self {
            Value::RawDocument(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw_array(&self) -> Option<&RawArray> {
        match self {
            Value::RawArray(r) => Some(r),
            _ => None,
        }
    }
}

/// Doubles compare by bit pattern, so `-0.0 != 0.0` and a NaN equals itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::ObjectId(a), Value::ObjectId(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::RawDocument(a), Value::RawDocument(b)) => a == b,
            (Value::RawArray(a), Value::RawArray(b)) => a == b,
            _ => false,
        }
    }
}

// JSON-like rendering for humans; extended types use constructor notation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(n) => {
                if n.is_finite() {
                    write!(f, "{n:?}")
                } else if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_sign_positive() {
                    write!(f, "Infinity")
                } else {
                    write!(f, "-Infinity")
                }
            }
            Value::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Document(d) => write!(f, "{d}"),
            Value::Array(a) => write!(f, "{a}"),
            Value::Binary(b) => write!(
                f,
                "Binary(0x{:02x}, {})",
                u8::from(b.subtype),
                hex::encode(&b.bytes)
            ),
            Value::ObjectId(id) => write!(f, "{id}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(d) => write!(f, "DateTime(\"{d}\")"),
            Value::Null => write!(f, "null"),
            Value::Regex(r) => write!(f, "{r}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::Int64(n) => write!(f, "NumberLong({n})"),
            Value::RawDocument(r) => match r.to_document() {
                Ok(d) => write!(f, "{d}"),
                Err(_) => write!(f, "RawDocument({} bytes)", r.as_bytes().len()),
            },
            Value::RawArray(r) => match r.to_array() {
                Ok(a) => write!(f, "{a}"),
                Err(_) => write!(f, "RawArray({} bytes)", r.as_bytes().len()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int32(i32::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

/// Fails for values above `i32::MAX`.
impl TryFrom<u32> for Value {
    type Error = Error;

    fn try_from(n: u32) -> Result<Self, Error> {
        i32::try_from(n)
            .map(Value::Int32)
            .map_err(|_| Error::UnsupportedType(format!("u32 value {n} does not fit in int32")))
    }
}

/// Fails for values above `i64::MAX`.
impl TryFrom<u64> for Value {
    type Error = Error;

    fn try_from(n: u64) -> Result<Self, Error> {
        i64::try_from(n)
            .map(Value::Int64)
            .map_err(|_| Error::UnsupportedType(format!("u64 value {n} does not fit in int64")))
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Double(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Binary(Binary::generic(b))
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl From<DateTime> for Value {
    fn from(d: DateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<Regex> for Value {
    fn from(r: Regex) -> Self {
        Value::Regex(r)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<RawDocument> for Value {
    fn from(r: RawDocument) -> Self {
        Value::RawDocument(r)
    }
}

impl From<RawArray> for Value {
    fn from(r: RawArray) -> Self {
        Value::RawArray(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().collect())
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

/// Build a [`Value`] with JSON-like syntax.
///
/// Objects become documents with fields in the order written.
///
/// ```rust
/// use serde_bson::bson;
///
/// let value = bson!({
///     "name": "test",
///     "values": [1, 2, 3],
///     "active": true
/// });
/// let keys: Vec<_> = value.as_document().unwrap().keys().collect();
/// assert_eq!(keys, ["name", "values", "active"]);
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Boolean(true)
    };
    (false) => {
        $crate::Value::Boolean(false)
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(
            <$crate::Array as ::std::iter::FromIterator<$crate::Value>>::from_iter(
                vec![ $( $crate::bson!($elem) ),* ]
            )
        )
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::Value::Document($crate::doc! { $($key : $value),* })
    };

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

/// Build a [`Document`] with JSON-like syntax.
///
/// ```rust
/// use serde_bson::doc;
///
/// let d = doc! { "a": 10, "c": true };
/// assert_eq!(d.get_i32("a"), Some(10));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };

    ( $($key:tt : $value:tt),* $(,)? ) => {{
        let mut doc = $crate::Document::new();
        $(
            doc.insert($key, $crate::bson!($value));
        )*
        doc
    }};
}
