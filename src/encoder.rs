// ABOUTME: BSON tree encoder that appends documents to a caller-owned byte buffer.
// ABOUTME: Length prefixes are back-patched once each document's body has been written.

use crate::document::{Array, Document};
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::scalar;
use crate::timestamp::Timestamp;
use crate::types::{limits, BinarySubtype, DateTime, ElementType};
use crate::value::Value;

/// A BSON encoder that appends to a byte buffer.
///
/// Recursive writes return the number of bytes they appended. When a write
/// fails, bytes appended before the failure stay in the buffer and do not
/// form a valid document.
pub struct Encoder<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> Encoder<'a> {
    /// Create an encoder that appends to `buf`.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    /// The bytes written so far, including any that were in the buffer before.
    #[must_use]
    pub fn get_ref(&self) -> &[u8] {
        self.buf
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn put(&mut self, size: usize, encode: impl FnOnce(&mut [u8])) -> usize {
        let start = self.buf.len();
        self.buf.resize(start + size, 0);
        encode(&mut self.buf[start..]);
        size
    }

    // =========================================================================
    // Document framing
    // =========================================================================

    /// Reserve the length prefix of a new document and return its position.
    pub fn begin_document(&mut self) -> usize {
        let start = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        start
    }

    /// Write the terminator and patch the length prefix reserved at `start`.
    /// Returns the document length.
    pub fn end_document(&mut self, start: usize) -> Result<usize> {
        self.buf.push(0);
        let len = self.buf.len() - start;
        if len > limits::MAX_DOCUMENT_SIZE {
            tracing::debug!(
                size = len,
                max = limits::MAX_DOCUMENT_SIZE,
                "document too large to encode"
            );
            return Err(Error::SizeExceeded {
                size: len,
                max: limits::MAX_DOCUMENT_SIZE,
            });
        }
        self.buf[start..start + 4].copy_from_slice(&(len as u32).to_le_bytes());
        Ok(len)
    }

    /// Write a placeholder type tag and the element name, returning the
    /// position of the tag for [`set_element_type`](Self::set_element_type).
    pub fn begin_element(&mut self, name: &str) -> Result<usize> {
        if memchr::memchr(0, name.as_bytes()).is_some() {
            return Err(Error::invalid("element name", format!("{name:?} contains NUL")));
        }
        let index = self.buf.len();
        self.buf.push(0);
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        Ok(index)
    }

    pub fn set_element_type(&mut self, index: usize, element_type: ElementType) {
        self.buf[index] = element_type.as_u8();
    }

    // =========================================================================
    // Trees
    // =========================================================================

    /// Encode a whole document.
    pub fn write_document(&mut self, doc: &Document) -> Result<usize> {
        let start = self.begin_document();
        for (name, value) in doc {
            self.write_element(name, value)?;
        }
        self.end_document(start)
    }

    /// Encode an array as a document keyed "0", "1", ...
    pub fn write_array(&mut self, array: &Array) -> Result<usize> {
        let start = self.begin_document();
        let mut key = itoa::Buffer::new();
        for (i, value) in array.iter().enumerate() {
            self.write_element(key.format(i), value)?;
        }
        self.end_document(start)
    }

    /// Encode one element: tag, name and payload.
    pub fn write_element(&mut self, name: &str, value: &Value) -> Result<usize> {
        let start = self.buf.len();
        let index = self.begin_element(name)?;
        self.set_element_type(index, value.element_type());
        self.write_payload(value)?;
        Ok(self.buf.len() - start)
    }

    /// Encode the payload of `value` without tag or name.
    pub fn write_payload(&mut self, value: &Value) -> Result<usize> {
        Ok(match value {
            Value::Double(v) => self.write_f64(*v),
            Value::String(v) => self.write_str(v),
            Value::Document(v) => self.write_document(v)?,
            Value::Array(v) => self.write_array(v)?,
            Value::Binary(v) => self.write_binary(v.subtype, &v.bytes),
            Value::ObjectId(v) => self.write_object_id(v),
            Value::Boolean(v) => self.write_bool(*v),
            Value::DateTime(v) => self.write_datetime(*v),
            Value::Null => 0,
            Value::Regex(v) => self.write_regex(&v.pattern, &v.options)?,
            Value::Int32(v) => self.write_i32(*v),
            Value::Timestamp(v) => self.write_timestamp(*v),
            Value::Int64(v) => self.write_i64(*v),
            Value::RawDocument(v) => self.write_raw(v.as_bytes()),
            Value::RawArray(v) => self.write_raw(v.as_bytes()),
        })
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    pub fn write_f64(&mut self, v: f64) -> usize {
        self.put(scalar::size_f64(v), |dst| scalar::encode_f64(dst, v))
    }

    pub fn write_str(&mut self, v: &str) -> usize {
        self.put(scalar::size_str(v), |dst| scalar::encode_str(dst, v))
    }

    pub fn write_binary(&mut self, subtype: BinarySubtype, bytes: &[u8]) -> usize {
        self.put(scalar::size_binary(bytes), |dst| {
            scalar::encode_binary(dst, subtype, bytes);
        })
    }

    pub fn write_object_id(&mut self, v: &ObjectId) -> usize {
        self.put(scalar::size_object_id(v), |dst| scalar::encode_object_id(dst, v))
    }

    pub fn write_bool(&mut self, v: bool) -> usize {
        self.put(scalar::size_bool(v), |dst| scalar::encode_bool(dst, v))
    }

    pub fn write_datetime(&mut self, v: DateTime) -> usize {
        self.put(scalar::size_datetime(v), |dst| scalar::encode_datetime(dst, v))
    }

    /// Neither part may contain a NUL byte.
    pub fn write_regex(&mut self, pattern: &str, options: &str) -> Result<usize> {
        if memchr::memchr(0, pattern.as_bytes()).is_some()
            || memchr::memchr(0, options.as_bytes()).is_some()
        {
            return Err(Error::invalid("regex", "pattern and options must not contain NUL"));
        }
        Ok(self.put(scalar::size_regex(pattern, options), |dst| {
            scalar::encode_regex(dst, pattern, options);
        }))
    }

    pub fn write_i32(&mut self, v: i32) -> usize {
        self.put(scalar::size_i32(v), |dst| scalar::encode_i32(dst, v))
    }

    pub fn write_timestamp(&mut self, v: Timestamp) -> usize {
        self.put(scalar::size_timestamp(v), |dst| scalar::encode_timestamp(dst, v))
    }

    pub fn write_i64(&mut self, v: i64) -> usize {
        self.put(scalar::size_i64(v), |dst| scalar::encode_i64(dst, v))
    }

    /// Copy pre-encoded bytes verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) -> usize {
        self.buf.extend_from_slice(bytes);
        bytes.len()
    }
}
