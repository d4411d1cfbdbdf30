// ABOUTME: Tree decoder that materializes BSON bytes into Document and Array values.
// ABOUTME: Validates document headers and enforces the configured depth and size limits.

#![allow(clippy::missing_errors_doc)]

use crate::document::{Array, Document};
use crate::error::{Error, Result};
use crate::raw::{RawArray, RawDocument};
use crate::reader::{ElementReader, RawElement};
use crate::scalar::{
    decode_binary, decode_bool, decode_datetime, decode_f64, decode_i32, decode_i64,
    decode_object_id, decode_regex, decode_str, decode_timestamp, read_length,
};
use crate::types::{limits, Binary, ElementType, Regex};
use crate::value::Value;

/// Configuration options for the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum document nesting depth; the top-level document is depth 1.
    pub max_depth: usize,
    /// Maximum declared length of the top-level document.
    pub max_document_size: usize,
    /// Allow bytes after the top-level document (default: false).
    pub allow_trailing_bytes: bool,
    /// Keep nested documents and arrays as raw bytes instead of decoding them.
    pub keep_raw: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_DEPTH,
            max_document_size: limits::MAX_DOCUMENT_SIZE,
            allow_trailing_bytes: false,
            keep_raw: false,
        }
    }
}

/// Validate a document header and terminator, returning the document length
/// and the body between them. `src` may extend past the document.
pub(crate) fn split_document<'a>(src: &'a [u8], what: &'static str) -> Result<(usize, &'a [u8])> {
    let len = read_length(src, what)?;
    if len < limits::MIN_DOCUMENT_SIZE {
        return Err(Error::invalid(
            what,
            format!("length prefix {len} is below the minimum of 5"),
        ));
    }
    if src.len() < len {
        return Err(Error::short(what, len, src.len()));
    }
    if src[len - 1] != 0 {
        return Err(Error::InvalidInput {
            what,
            offset: len - 1,
            reason: "missing document terminator".into(),
        });
    }
    Ok((len, &src[4..len - 1]))
}

/// Decodes complete documents into the in-memory model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one top-level document.
    pub fn decode_document(&self, src: &[u8]) -> Result<Document> {
        let body = self.check_top_level(src, "document")?;
        self.read_document(body, 4, 1)
    }

    /// Decode one top-level document as an array. Element names are ignored.
    pub fn decode_array(&self, src: &[u8]) -> Result<Array> {
        let body = self.check_top_level(src, "array")?;
        self.read_array(body, 4, 1)
    }

    /// Decode the payload of a single element.
    pub fn decode_element(&self, element: &RawElement<'_>) -> Result<Value> {
        self.decode_payload(
            element.element_type,
            element.payload,
            element.payload_offset(),
            1,
        )
    }

    /// Validate the top-level header and return the document body.
    pub(crate) fn check_top_level<'a>(
        &self,
        src: &'a [u8],
        what: &'static str,
    ) -> Result<&'a [u8]> {
        let declared = read_length(src, what)?;
        if declared > self.config.max_document_size {
            tracing::debug!(
                size = declared,
                max = self.config.max_document_size,
                "rejected oversized document"
            );
            return Err(Error::SizeExceeded {
                size: declared,
                max: self.config.max_document_size,
            });
        }
        let (len, body) = split_document(src, what)?;
        if src.len() > len && !self.config.allow_trailing_bytes {
            return Err(Error::TrailingBytes(src.len() - len));
        }
        Ok(body)
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            tracing::debug!(max_depth = self.config.max_depth, "rejected deeply nested document");
            return Err(Error::MaxDepthExceeded(self.config.max_depth));
        }
        Ok(())
    }

    /// `body` starts at absolute offset `base`.
    fn read_document(&self, body: &[u8], base: usize, depth: usize) -> Result<Document> {
        self.check_depth(depth)?;
        let mut doc = Document::new();
        let mut reader = ElementReader::new(body, base);
        while reader.advance() {
            if let Some(e) = reader.peek() {
                let value =
                    self.decode_payload(e.element_type, e.payload, e.payload_offset(), depth)?;
                doc.insert(e.name, value);
            }
        }
        reader.finish()?;
        Ok(doc)
    }

    fn read_array(&self, body: &[u8], base: usize, depth: usize) -> Result<Array> {
        self.check_depth(depth)?;
        let mut array = Array::new();
        let mut reader = ElementReader::new(body, base);
        while reader.advance() {
            if let Some(e) = reader.peek() {
                array.push(self.decode_payload(
                    e.element_type,
                    e.payload,
                    e.payload_offset(),
                    depth,
                )?);
            }
        }
        reader.finish()?;
        Ok(array)
    }

    /// Decode a payload found inside a document at `depth`. Nested documents
    /// are one level deeper.
    fn decode_payload(
        &self,
        element_type: ElementType,
        payload: &[u8],
        offset: usize,
        depth: usize,
    ) -> Result<Value> {
        match element_type {
            ElementType::Document | ElementType::Array if self.config.keep_raw => {
                self.check_depth(depth + 1)?;
                let bytes = payload.to_vec();
                let raw = if element_type == ElementType::Document {
                    RawDocument::new(bytes).map(Value::RawDocument)
                } else {
                    RawArray::new(bytes).map(Value::RawArray)
                };
                raw.map_err(|e| e.offset_by(offset))
            }
            ElementType::Document => {
                let (_, body) =
                    split_document(payload, "document").map_err(|e| e.offset_by(offset))?;
                self.read_document(body, offset + 4, depth + 1)
                    .map(Value::Document)
            }
            ElementType::Array => {
                let (_, body) =
                    split_document(payload, "array").map_err(|e| e.offset_by(offset))?;
                self.read_array(body, offset + 4, depth + 1).map(Value::Array)
            }
            _ => decode_scalar(element_type, payload).map_err(|e| e.offset_by(offset)),
        }
    }
}

impl Decoder {
    /// Check a payload as decoding would, without building any values.
    /// `depth` is the depth of the document containing the payload.
    pub(crate) fn validate_payload(
        &self,
        element_type: ElementType,
        payload: &[u8],
        offset: usize,
        depth: usize,
    ) -> Result<()> {
        match element_type {
            ElementType::Document | ElementType::Array => {
                self.check_depth(depth + 1)?;
                let (_, body) = split_document(payload, element_type.name())
                    .map_err(|e| e.offset_by(offset))?;
                let mut reader = ElementReader::new(body, offset + 4);
                while reader.advance() {
                    if let Some(e) = reader.peek() {
                        self.validate_payload(
                            e.element_type,
                            e.payload,
                            e.payload_offset(),
                            depth + 1,
                        )?;
                    }
                }
                reader.finish()
            }
            _ => validate_scalar(element_type, payload).map_err(|e| e.offset_by(offset)),
        }
    }
}

fn validate_scalar(element_type: ElementType, payload: &[u8]) -> Result<()> {
    match element_type {
        ElementType::String => decode_str(payload).map(drop),
        ElementType::Binary => decode_binary(payload).map(drop),
        ElementType::Boolean => decode_bool(payload).map(drop),
        ElementType::Regex => decode_regex(payload).map(drop),
        // Remaining scalars are fixed-width and sized by the reader.
        _ => Ok(()),
    }
}

/// Decode a non-container payload.
pub(crate) fn decode_scalar(element_type: ElementType, payload: &[u8]) -> Result<Value> {
    Ok(match element_type {
        ElementType::Double => Value::Double(decode_f64(payload)?),
        ElementType::String => Value::String(decode_str(payload)?.to_owned()),
        ElementType::Binary => {
            let (subtype, bytes) = decode_binary(payload)?;
            Value::Binary(Binary::new(subtype, bytes))
        }
        ElementType::ObjectId => Value::ObjectId(decode_object_id(payload)?),
        ElementType::Boolean => Value::Boolean(decode_bool(payload)?),
        ElementType::DateTime => Value::DateTime(decode_datetime(payload)?),
        ElementType::Null => Value::Null,
        ElementType::Regex => {
            let (pattern, options) = decode_regex(payload)?;
            Value::Regex(Regex::new(pattern, options))
        }
        ElementType::Int32 => Value::Int32(decode_i32(payload)?),
        ElementType::Timestamp => Value::Timestamp(decode_timestamp(payload)?),
        ElementType::Int64 => Value::Int64(decode_i64(payload)?),
        ElementType::Document | ElementType::Array => {
            return Err(Error::invalid(
                element_type.name(),
                "container payload is not a scalar",
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SIMPLE: &[u8] = &[
        0x10, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x0a, 0x00, 0x00, 0x00, 0x08, b'c', 0x00,
        0x01, 0x00,
    ];

    #[test]
    fn test_decode_simple() {
        let doc = Decoder::new().decode_document(SIMPLE).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("a"), Some(&Value::Int32(10)));
        assert_eq!(doc.get("c"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_header_errors() {
        let d = Decoder::new();
        assert_eq!(d.decode_document(&[]).unwrap_err().kind(), ErrorKind::ShortInput);
        assert_eq!(d.decode_document(&[5, 0, 0]).unwrap_err().kind(), ErrorKind::ShortInput);
        assert_eq!(
            d.decode_document(&[6, 0, 0, 0, 0]).unwrap_err().kind(),
            ErrorKind::ShortInput
        );
        assert_eq!(
            d.decode_document(&[4, 0, 0, 0, 0]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(matches!(
            d.decode_document(&[5, 0, 0, 0, 1]),
            Err(Error::InvalidInput { offset: 4, .. })
        ));
        assert_eq!(
            d.decode_document(&[5, 0, 0, 0, 0, 0xaa]),
            Err(Error::TrailingBytes(1))
        );
    }

    #[test]
    fn test_every_truncation_is_short() {
        for n in 0..SIMPLE.len() {
            let err = Decoder::new().decode_document(&SIMPLE[..n]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ShortInput, "prefix of {n} bytes");
        }
    }

    #[test]
    fn test_allow_trailing_bytes() {
        let mut src = SIMPLE.to_vec();
        src.extend_from_slice(&[1, 2, 3]);
        let d = Decoder::with_config(DecoderConfig {
            allow_trailing_bytes: true,
            ..DecoderConfig::default()
        });
        assert_eq!(d.decode_document(&src).unwrap().len(), 2);
    }

    #[test]
    fn test_size_limit() {
        let d = Decoder::with_config(DecoderConfig {
            max_document_size: 8,
            ..DecoderConfig::default()
        });
        assert_eq!(
            d.decode_document(SIMPLE),
            Err(Error::SizeExceeded { size: 16, max: 8 })
        );
    }

    fn nested(levels: usize) -> Vec<u8> {
        let mut doc = vec![5, 0, 0, 0, 0];
        for _ in 0..levels {
            let len = (doc.len() + 8) as u32;
            let mut outer = len.to_le_bytes().to_vec();
            outer.extend_from_slice(&[0x03, b'x', 0x00]);
            outer.extend_from_slice(&doc);
            outer.push(0);
            doc = outer;
        }
        doc
    }

    #[test]
    fn test_depth_limit() {
        let d = Decoder::with_config(DecoderConfig {
            max_depth: 3,
            ..DecoderConfig::default()
        });
        assert!(d.decode_document(&nested(2)).is_ok());
        assert_eq!(
            d.decode_document(&nested(3)),
            Err(Error::MaxDepthExceeded(3))
        );
    }

    #[test]
    fn test_nested_error_offsets_are_absolute() {
        // {"d": {"b": <bad bool byte at offset 14>}}
        let src = [
            0x11, 0, 0, 0, 0x03, b'd', 0x00, 0x09, 0, 0, 0, 0x08, b'b', 0x00, 0x02, 0x00, 0x00,
        ];
        assert!(matches!(
            Decoder::new().decode_document(&src),
            Err(Error::InvalidInput { what: "bool", offset: 14, .. })
        ));
    }

    #[test]
    fn test_unknown_and_unsupported_tags() {
        let src = [0x0a, 0, 0, 0, 0x13, b'x', 0x00, 0x00, 0x00, 0x00];
        let err = Decoder::new().decode_document(&src).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedElementType { tag: 0x13, offset: 4, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);

        let src = [0x08, 0, 0, 0, 0x20, b'x', 0x00, 0x00];
        let err = Decoder::new().decode_document(&src).unwrap_err();
        assert!(matches!(err, Error::UnknownElementType { tag: 0x20, .. }));
    }

    #[test]
    fn test_keep_raw() {
        let src = nested(2);
        let d = Decoder::with_config(DecoderConfig {
            keep_raw: true,
            ..DecoderConfig::default()
        });
        let doc = d.decode_document(&src).unwrap();
        match doc.get("x") {
            Some(Value::RawDocument(raw)) => {
                assert_eq!(raw.as_bytes(), &src[7..src.len() - 1]);
                let inner = raw.to_document().unwrap();
                assert!(matches!(inner.get("x"), Some(Value::Document(_))));
            }
            other => panic!("expected raw document, got {other:?}"),
        }
    }

    #[test]
    fn test_array_names_not_validated() {
        // Elements named "7", "x" and "y".
        let src = [
            0x12, 0, 0, 0, 0x10, b'7', 0x00, 1, 0, 0, 0, 0x0a, b'x', 0x00, 0x0a, b'y', 0x00, 0x00,
        ];
        let array = Decoder::new().decode_array(&src).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(0), Some(&Value::Int32(1)));
        assert_eq!(array.get(2), Some(&Value::Null));
    }
}
