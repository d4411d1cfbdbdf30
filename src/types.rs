// ABOUTME: Defines BSON element type tags, binary subtypes and the small scalar value types.
// ABOUTME: Tag values match the BSON specification byte values exactly.

use crate::error::{Error, Result};
use chrono::{SecondsFormat, TimeZone, Utc};
use std::fmt;

/// Limits from the BSON specification and decoder defaults.
pub mod limits {
    /// Maximum encoded size of a single document (16 MiB).
    pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

    /// Smallest possible document: 4-byte length plus the trailing NUL.
    pub const MIN_DOCUMENT_SIZE: usize = 5;

    /// Default maximum nesting depth accepted by the decoder.
    pub const MAX_DEPTH: usize = 256;
}

/// The element types this codec encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0a,
    Regex = 0x0b,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
}

impl ElementType {
    /// Map a wire tag to a supported element type.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0x01 => ElementType::Double,
            0x02 => ElementType::String,
            0x03 => ElementType::Document,
            0x04 => ElementType::Array,
            0x05 => ElementType::Binary,
            0x07 => ElementType::ObjectId,
            0x08 => ElementType::Boolean,
            0x09 => ElementType::DateTime,
            0x0a => ElementType::Null,
            0x0b => ElementType::Regex,
            0x10 => ElementType::Int32,
            0x11 => ElementType::Timestamp,
            0x12 => ElementType::Int64,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Resolve a wire tag, distinguishing tags the BSON specification defines
    /// but this codec rejects from tags that are not BSON at all.
    pub(crate) fn resolve(tag: u8) -> Result<Self> {
        if let Some(t) = Self::from_u8(tag) {
            return Ok(t);
        }
        match unsupported_name(tag) {
            Some(name) => Err(Error::UnsupportedElementType {
                tag,
                name,
                offset: 0,
            }),
            None => Err(Error::UnknownElementType { tag, offset: 0 }),
        }
    }

    /// Payload size for fixed-width types.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            ElementType::Double
            | ElementType::DateTime
            | ElementType::Timestamp
            | ElementType::Int64 => Some(8),
            ElementType::Int32 => Some(4),
            ElementType::ObjectId => Some(12),
            ElementType::Boolean => Some(1),
            ElementType::Null => Some(0),
            ElementType::String
            | ElementType::Document
            | ElementType::Array
            | ElementType::Binary
            | ElementType::Regex => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::Document => "document",
            ElementType::Array => "array",
            ElementType::Binary => "binary",
            ElementType::ObjectId => "objectId",
            ElementType::Boolean => "bool",
            ElementType::DateTime => "date",
            ElementType::Null => "null",
            ElementType::Regex => "regex",
            ElementType::Int32 => "int",
            ElementType::Timestamp => "timestamp",
            ElementType::Int64 => "long",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of the deprecated or otherwise unsupported tags of the BSON specification.
#[must_use]
pub const fn unsupported_name(tag: u8) -> Option<&'static str> {
    match tag {
        0x06 => Some("undefined"),
        0x0c => Some("dbPointer"),
        0x0d => Some("javascript"),
        0x0e => Some("symbol"),
        0x0f => Some("javascriptWithScope"),
        0x13 => Some("decimal128"),
        0x7f => Some("maxKey"),
        0xff => Some("minKey"),
        _ => None,
    }
}

/// Subtype byte of a BSON binary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BinarySubtype {
    #[default]
    Generic,
    Function,
    BinaryOld,
    UuidOld,
    Uuid,
    Md5,
    Encrypted,
    Compressed,
    /// User defined subtypes, 0x80 and above.
    UserDefined(u8),
    /// Any other value in the reserved range.
    Reserved(u8),
}

impl From<u8> for BinarySubtype {
    fn from(b: u8) -> Self {
        match b {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            0x07 => BinarySubtype::Compressed,
            0x80..=0xff => BinarySubtype::UserDefined(b),
            _ => BinarySubtype::Reserved(b),
        }
    }
}

impl From<BinarySubtype> for u8 {
    fn from(s: BinarySubtype) -> u8 {
        match s {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::Encrypted => 0x06,
            BinarySubtype::Compressed => 0x07,
            BinarySubtype::UserDefined(b) | BinarySubtype::Reserved(b) => b,
        }
    }
}

/// BSON binary data: a subtype tag and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    #[must_use]
    pub fn new(subtype: BinarySubtype, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype,
            bytes: bytes.into(),
        }
    }

    /// Binary data with the generic subtype.
    #[must_use]
    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(BinarySubtype::Generic, bytes)
    }
}

/// BSON regular expression: pattern and options, both NUL-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    #[must_use]
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            options: options.into(),
        }
    }

    /// Build a [`regex::Regex`] from this pattern.
    ///
    /// Only the `i`, `m` and `s` options have an equivalent inline flag;
    /// other options are ignored.
    pub fn compile(&self) -> std::result::Result<regex::Regex, regex::Error> {
        let flags: String = self
            .options
            .chars()
            .filter(|c| matches!(c, 'i' | 'm' | 's'))
            .collect();
        if flags.is_empty() {
            regex::Regex::new(&self.pattern)
        } else {
            regex::Regex::new(&format!("(?{flags}){}", self.pattern))
        }
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Regex('{}', '{}')", self.pattern, self.options)
    }
}

/// UTC datetime in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DateTime(i64);

impl DateTime {
    pub const UNIX_EPOCH: DateTime = DateTime(0);

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_chrono(Utc::now())
    }

    /// Convert from a chrono datetime, truncating to millisecond precision.
    #[must_use]
    pub fn from_chrono<Tz: TimeZone>(dt: chrono::DateTime<Tz>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// Convert to a chrono datetime, or `None` if out of chrono's range.
    #[must_use]
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_chrono() {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "DateTime({})", self.0),
        }
    }
}

impl<Tz: TimeZone> From<chrono::DateTime<Tz>> for DateTime {
    fn from(dt: chrono::DateTime<Tz>) -> Self {
        Self::from_chrono(dt)
    }
}
