// ABOUTME: BSON (Binary JSON) encoder/decoder for Rust.
// ABOUTME: Provides a document model, a streaming element reader and serde integration.

//! # serde_bson
//!
//! An encoder and decoder for the BSON wire format, the little-endian binary
//! document format used by document databases.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_bson::{to_vec, from_slice};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let person = Person {
//!     name: "Alice".to_string(),
//!     age: 30,
//! };
//!
//! // Serialize to BSON
//! let bytes = to_vec(&person).unwrap();
//! assert_eq!(&bytes[..4], &(bytes.len() as u32).to_le_bytes());
//!
//! // Deserialize from BSON
//! let decoded: Person = from_slice(&bytes).unwrap();
//! assert_eq!(person, decoded);
//! ```
//!
//! ## Working with Documents
//!
//! ```rust
//! use serde_bson::{doc, decode_document, encode_document};
//!
//! let d = doc! {
//!     "name": "test",
//!     "values": [1, 2, 3],
//!     "active": true
//! };
//!
//! let bytes = encode_document(&d).unwrap();
//! let back = decode_document(&bytes).unwrap();
//! assert_eq!(back.get_str("name"), Some("test"));
//! assert_eq!(back, d);
//! ```
//!
//! ## Reading Without Decoding
//!
//! ```rust
//! use serde_bson::{doc, encode_document, RawDocument};
//!
//! let bytes = encode_document(&doc! { "a": 1, "b": "two" }).unwrap();
//! let raw = RawDocument::new(bytes).unwrap();
//! for element in &raw {
//!     let element = element.unwrap();
//!     println!("{} is {}", element.name, element.element_type);
//! }
//! ```
//!
//! ## Wire Mapping
//!
//! - Structs and maps encode as documents; sequences as arrays.
//!   Maps are written in ascending key order, so equal maps encode to equal bytes.
//! - `i8`, `i16`, `i32`, `u8`, `u16` encode as int32; `i64` as int64.
//!   `u32`, `u64`, `i128` and `u128` use the narrowest of the two that holds
//!   the value and are rejected otherwise.
//! - Byte slices encode as generic binary data.
//! - `None` and `()` encode as null.
//!
//! ## Resource Limits
//!
//! - Maximum document size: 16 MiB
//! - Maximum nesting depth: 256

pub mod de;
pub mod decoder;
pub mod document;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod oid;
pub mod raw;
pub mod reader;
pub mod scalar;
pub mod ser;
pub mod timestamp;
pub mod types;
pub mod value;
mod value_serde;

// Re-export commonly used items at the crate root
pub use de::{from_slice, from_slice_with_config, Deserializer};
pub use decoder::{Decoder, DecoderConfig};
pub use document::{Array, Document};
pub use encoder::Encoder;
pub use error::{Error, ErrorKind, Result};
pub use generator::{IdGenerator, Seed};
pub use oid::ObjectId;
pub use raw::{RawArray, RawDocument};
pub use reader::{ElementReader, RawElement};
pub use scalar::Scalar;
pub use ser::{is_default, Serializer};
pub use timestamp::Timestamp;
pub use types::{limits, Binary, BinarySubtype, DateTime, ElementType, Regex};
pub use value::Value;

// The bson! and doc! macros are exported at the crate root via #[macro_export]

use serde::Serialize;
use std::io::Write;

/// Serialize a value to a BSON document.
///
/// The value must be document-shaped: a struct, map, sequence, `Document`
/// or `Array`.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
///
/// let bytes = serde_bson::to_vec(&BTreeMap::from([("a", 1)])).unwrap();
/// assert_eq!(bytes, [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
/// ```
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] for values with no wire mapping and
/// [`Error::SizeExceeded`] for documents over 16 MiB.
pub fn to_vec<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    to_vec_into(&mut buf, value)?;
    Ok(buf)
}

/// Serialize a value, appending the document to `buf`. Returns the number
/// of bytes appended.
///
/// On error `buf` is truncated back to its original length.
///
/// # Errors
///
/// Same as [`to_vec`].
pub fn to_vec_into<T: ?Sized + Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<usize> {
    let start = buf.len();
    let result = {
        let mut encoder = Encoder::new(buf);
        value.serialize(Serializer::new(&mut encoder))
    };
    match result {
        Ok(()) => Ok(buf.len() - start),
        Err(err) => {
            buf.truncate(start);
            Err(err)
        }
    }
}

/// Serialize a value to a writer.
///
/// The document is encoded in full before anything is written, so a failed
/// encode leaves the writer untouched.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
///
/// let mut out = Vec::new();
/// serde_bson::to_writer(&mut out, &BTreeMap::from([("a", 1)])).unwrap();
/// assert_eq!(out.len(), 12);
/// ```
///
/// # Errors
///
/// Same as [`to_vec`], plus [`Error::Io`] if the writer fails.
pub fn to_writer<W: Write, T: ?Sized + Serialize>(mut writer: W, value: &T) -> Result<()> {
    let bytes = to_vec(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Encode a [`Document`] to bytes.
///
/// # Errors
///
/// Returns an error if a name or regex contains NUL, or if a document
/// exceeds 16 MiB.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_document_into(&mut buf, doc)?;
    Ok(buf)
}

/// Encode a [`Document`], appending to `buf`. Returns the number of bytes
/// appended; on error `buf` is truncated back to its original length.
///
/// # Errors
///
/// Same as [`encode_document`].
pub fn encode_document_into(buf: &mut Vec<u8>, doc: &Document) -> Result<usize> {
    let start = buf.len();
    let result = Encoder::new(buf).write_document(doc);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

/// Encode a [`Document`] to a writer. Nothing is written if encoding fails.
///
/// # Errors
///
/// Same as [`encode_document`], plus [`Error::Io`] if the writer fails.
pub fn encode_document_to_writer<W: Write>(mut writer: W, doc: &Document) -> Result<()> {
    let bytes = encode_document(doc)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Encode an [`Array`] as a document keyed "0", "1", ...
///
/// # Errors
///
/// Same as [`encode_document`].
pub fn encode_array(array: &Array) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Encoder::new(&mut buf).write_array(array)?;
    Ok(buf)
}

/// Decode one BSON document.
///
/// # Example
///
/// ```rust
/// let bytes = [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];
/// let doc = serde_bson::decode_document(&bytes).unwrap();
/// assert_eq!(doc.get_i32("a"), Some(1));
/// ```
///
/// # Errors
///
/// Returns an error if the input is truncated, malformed, too large or too
/// deeply nested, or has trailing bytes.
pub fn decode_document(data: &[u8]) -> Result<Document> {
    Decoder::new().decode_document(data)
}

/// Decode one BSON document with custom configuration.
///
/// # Errors
///
/// Same as [`decode_document`], under the configured limits.
pub fn decode_document_with_config(data: &[u8], config: DecoderConfig) -> Result<Document> {
    Decoder::with_config(config).decode_document(data)
}

/// Decode one BSON document as an [`Array`], ignoring element names.
///
/// # Errors
///
/// Same as [`decode_document`].
pub fn decode_array(data: &[u8]) -> Result<Array> {
    Decoder::new().decode_array(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_scenario_int32_scalar() {
        assert_eq!(scalar::to_bytes(&123_456_789i32), [0x15, 0xcd, 0x5b, 0x07]);
    }

    #[test]
    fn test_scenario_string_scalar() {
        assert_eq!(
            scalar::to_bytes(&"foo".to_string()),
            [0x04, 0x00, 0x00, 0x00, 0x66, 0x6f, 0x6f, 0x00]
        );
    }

    #[test]
    fn test_scenario_empty_array() {
        assert_eq!(encode_array(&Array::new()).unwrap(), [0x05, 0, 0, 0, 0]);
        assert_eq!(to_vec(&Vec::<i32>::new()).unwrap(), [0x05, 0, 0, 0, 0]);
    }

    #[test]
    fn test_scenario_ordered_pairs() {
        let expected = [
            0x10, 0x00, 0x00, 0x00, 0x10, 0x61, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x08, 0x63, 0x00,
            0x01, 0x00,
        ];
        let d: Document = [("a", Value::Int32(10)), ("c", Value::Boolean(true))]
            .into_iter()
            .collect();
        assert_eq!(encode_document(&d).unwrap(), expected);

        #[derive(Serialize)]
        struct Pair {
            a: i32,
            c: bool,
        }
        assert_eq!(to_vec(&Pair { a: 10, c: true }).unwrap(), expected);
    }

    #[test]
    fn test_scenario_short_buffer() {
        for len in 0..4 {
            let bytes = vec![0x05; len];
            let err = decode_document(&bytes).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ShortInput);
            let err = from_slice::<Document>(&bytes).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ShortInput);
        }
    }

    #[test]
    fn test_scenario_object_id_counter_within_second() {
        let generator = IdGenerator::new(Seed {
            process_unique: [1, 2, 3, 4, 5],
            object_id_counter: 41,
            timestamp_counter: 0,
        });
        let t = DateTime::from_millis(1_700_000_000_000)
            .to_chrono()
            .unwrap();
        let first = generator.object_id_at(t);
        let second = generator.object_id_at(t);
        assert_eq!(first.timestamp(), second.timestamp());
        assert!(second.counter() > first.counter());
        assert_eq!(first.process_unique(), second.process_unique());
    }

    #[test]
    fn test_to_vec_into_appends() {
        let mut buf = vec![0xee];
        let n = to_vec_into(&mut buf, &BTreeMap::from([("a", 1)])).unwrap();
        assert_eq!(n, 12);
        assert_eq!(buf.len(), 13);
        assert_eq!(buf[0], 0xee);
        assert_eq!(decode_document(&buf[1..]).unwrap().get_i32("a"), Some(1));
    }

    #[test]
    fn test_to_vec_into_truncates_on_error() {
        #[derive(Serialize)]
        struct Bad {
            ok: i32,
            big: u64,
        }
        let mut buf = vec![1, 2, 3];
        let err = to_vec_into(&mut buf, &Bad { ok: 1, big: u64::MAX }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert_eq!(buf, [1, 2, 3]);

        let mut buf = vec![9];
        let err = encode_document_into(&mut buf, &doc! { "a\0": 1 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(buf, [9]);
    }

    #[test]
    fn test_oversized_document_through_serde() {
        let mut d = Document::new();
        d.insert("big", Binary::generic(vec![0u8; limits::MAX_DOCUMENT_SIZE + 1024]));
        let direct = encode_document(&d).unwrap_err();
        assert_eq!(direct.kind(), ErrorKind::SizeExceeded);

        let err = to_vec(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeExceeded);
        assert_eq!(err, direct);

        #[derive(Serialize)]
        struct Wrapper {
            inner: Document,
        }
        let err = to_vec(&Wrapper { inner: d }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeExceeded);
    }

    #[test]
    fn test_to_writer() {
        let mut out = Vec::new();
        to_writer(&mut out, &BTreeMap::from([("a", 1)])).unwrap();
        assert_eq!(out, to_vec(&BTreeMap::from([("a", 1)])).unwrap());

        let d = doc! { "x": "y", "n": [1, 2] };
        let mut out = Vec::new();
        encode_document_to_writer(&mut out, &d).unwrap();
        assert_eq!(decode_document(&out).unwrap(), d);
    }

    #[test]
    fn test_to_writer_writes_nothing_on_encode_error() {
        #[derive(Serialize)]
        struct Bad {
            ok: i32,
            big: u128,
        }
        let mut out = Vec::new();
        let err = to_writer(&mut out, &Bad { ok: 1, big: u128::MAX }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert!(out.is_empty());

        let err = encode_document_to_writer(&mut out, &doc! { "ok": 1, "a\0": 2 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(out.is_empty());
    }

    #[test]
    fn test_to_writer_reports_io_failure() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = to_writer(Closed, &BTreeMap::from([("a", 1)])).unwrap_err();
        assert_eq!(err, Error::Io("closed".into()));
        assert_eq!(err.kind(), ErrorKind::Io);
        let err = encode_document_to_writer(Closed, &doc! { "a": 1 }).unwrap_err();
        assert_eq!(err.error_type(), "io_error");
    }

    #[test]
    fn test_struct_roundtrip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Account {
            user_name: String,
            balance: f64,
            tags: Vec<String>,
            limits: HashMap<String, i64>,
            #[serde(skip_serializing_if = "is_default", default)]
            note: String,
            owner: Option<ObjectId>,
        }
        let account = Account {
            user_name: "x".into(),
            balance: -0.0,
            tags: vec!["a".into(), "b".into()],
            limits: HashMap::from([("daily".to_string(), 10), ("monthly".to_string(), 300)]),
            note: String::new(),
            owner: Some(ObjectId::from_bytes([3; 12])),
        };
        let bytes = to_vec(&account).unwrap();
        let doc = decode_document(&bytes).unwrap();
        assert!(doc.contains_key("userName"));
        assert!(!doc.contains_key("note"));
        assert_eq!(
            doc.get_document("limits").unwrap().keys().collect::<Vec<_>>(),
            ["daily", "monthly"]
        );
        let back: Account = from_slice(&bytes).unwrap();
        assert!(back.balance.is_sign_negative());
        assert_eq!(back, account);
    }

    #[test]
    fn test_document_and_serde_agree() {
        let d = doc! { "n": 1, "arr": [1.5, "x", null], "sub": { "b": false } };
        assert_eq!(to_vec(&d).unwrap(), encode_document(&d).unwrap());
        let back: Document = from_slice(&encode_document(&d).unwrap()).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_decode_with_config() {
        let mut bytes = encode_document(&doc! { "a": 1 }).unwrap();
        bytes.push(0);
        assert_eq!(decode_document(&bytes).unwrap_err(), Error::TrailingBytes(1));
        let config = DecoderConfig {
            allow_trailing_bytes: true,
            ..DecoderConfig::default()
        };
        assert_eq!(
            decode_document_with_config(&bytes, config).unwrap().get_i32("a"),
            Some(1)
        );
        assert_eq!(
            from_slice_with_config::<BTreeMap<String, i32>>(&bytes, config).unwrap()["a"],
            1
        );
    }

    #[test]
    fn test_decode_array() {
        let bytes = encode_document(&doc! { "x": 1, "y": 2 }).unwrap();
        let array = decode_array(&bytes).unwrap();
        assert_eq!(array.as_slice(), [Value::Int32(1), Value::Int32(2)]);
    }
}
