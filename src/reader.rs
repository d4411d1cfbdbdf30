// ABOUTME: Forward-only cursor over the elements of one encoded document body.
// ABOUTME: Sizes each element by its type tag and latches the first structural error.

use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::scalar::{read_length, validate_utf8};
use crate::types::ElementType;
use crate::value::Value;

/// One element as it appears on the wire, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawElement<'a> {
    pub element_type: ElementType,
    pub name: &'a str,
    /// The value bytes, exactly as long as the element type requires.
    pub payload: &'a [u8],
    /// Absolute offset of the type tag.
    pub offset: usize,
}

impl<'a> RawElement<'a> {
    /// Absolute offset of the first payload byte.
    #[must_use]
    pub fn payload_offset(&self) -> usize {
        self.offset + self.name.len() + 2
    }

    /// Decode the payload with the default decoder configuration.
    pub fn value(&self) -> Result<Value> {
        Decoder::default().decode_element(self)
    }
}

/// A single-pass cursor over a document body.
///
/// The body is the span between the 4-byte length prefix and the trailing
/// NUL. Once an error occurs it is kept, and [`advance`](Self::advance)
/// returns false from then on.
#[derive(Debug, Clone)]
pub struct ElementReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    current: Option<RawElement<'a>>,
    error: Option<Error>,
    error_reported: bool,
}

impl<'a> ElementReader<'a> {
    /// A reader over `body`, whose first byte sits at absolute offset `base`.
    #[must_use]
    pub fn new(body: &'a [u8], base: usize) -> Self {
        Self {
            data: body,
            pos: 0,
            base,
            current: None,
            error: None,
            error_reported: false,
        }
    }

    /// Parse the next element. Returns false at the end of the body or on error;
    /// check [`error`](Self::error) to tell the two apart.
    pub fn advance(&mut self) -> bool {
        if self.error.is_some() || self.pos >= self.data.len() {
            self.current = None;
            return false;
        }
        match self.parse_element() {
            Ok((element, consumed)) => {
                self.current = Some(element);
                self.pos += consumed;
                true
            }
            Err(err) => {
                let err = err.offset_by(self.base + self.pos);
                tracing::debug!(error = %err, "element reader stopped");
                self.current = None;
                self.error = Some(err);
                false
            }
        }
    }

    /// The element parsed by the last successful [`advance`](Self::advance).
    #[must_use]
    pub fn peek(&self) -> Option<RawElement<'a>> {
        self.current
    }

    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Absolute offset of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Ok once every element has been consumed without error.
    pub fn finish(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Parse the element at `pos`. Offsets in errors are relative to `pos`.
    fn parse_element(&self) -> Result<(RawElement<'a>, usize)> {
        let rest = &self.data[self.pos..];
        if rest.len() < 2 {
            return Err(Error::short("element", 2, rest.len()));
        }
        let tag = rest[0];
        let name_len = memchr::memchr(0, &rest[1..])
            .ok_or_else(|| Error::short("element name", rest.len() + 1, rest.len()))?;
        let name = validate_utf8(&rest[1..1 + name_len], "element name")?;
        let element_type = ElementType::resolve(tag)?;

        let start = name_len + 2;
        let body = &rest[start..];
        let size = payload_size(element_type, body).map_err(|e| e.offset_by(start))?;
        if body.len() < size {
            return Err(Error::short(element_type.name(), size, body.len()).offset_by(start));
        }

        tracing::trace!(
            offset = self.base + self.pos,
            %element_type,
            name,
            size,
            "element"
        );
        Ok((
            RawElement {
                element_type,
                name,
                payload: &body[..size],
                offset: self.base + self.pos,
            },
            start + size,
        ))
    }
}

/// Number of payload bytes the element occupies, read from `body`.
fn payload_size(element_type: ElementType, body: &[u8]) -> Result<usize> {
    if let Some(n) = element_type.fixed_size() {
        return Ok(n);
    }
    match element_type {
        ElementType::String => {
            let l = read_length(body, "string")?;
            if l == 0 {
                return Err(Error::invalid("string", "length prefix must be at least 1"));
            }
            Ok(l + 4)
        }
        ElementType::Document | ElementType::Array => {
            let l = read_length(body, element_type.name())?;
            if l < 5 {
                return Err(Error::invalid(
                    element_type.name(),
                    format!("length prefix {l} is below the minimum of 5"),
                ));
            }
            Ok(l)
        }
        ElementType::Binary => {
            let l = read_length(body, "binary")?;
            Ok(l + 5)
        }
        ElementType::Regex => {
            let p = memchr::memchr(0, body).ok_or_else(|| {
                Error::invalid("regex", "malformed regex: pattern is not terminated")
            })?;
            let o = memchr::memchr(0, &body[p + 1..]).ok_or_else(|| {
                Error::invalid("regex", "malformed regex: options are not terminated")
            })?;
            Ok(p + o + 2)
        }
        _ => Ok(0),
    }
}

impl<'a> Iterator for ElementReader<'a> {
    type Item = Result<RawElement<'a>>;

    /// Yields each element, then the latched error once if parsing failed.
    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.map(Ok);
        }
        match &self.error {
            Some(err) if !self.error_reported => {
                self.error_reported = true;
                Some(Err(err.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // Body of {"a": int32 10, "c": true}
    const BODY: &[u8] = &[
        0x10, b'a', 0x00, 0x0a, 0x00, 0x00, 0x00, 0x08, b'c', 0x00, 0x01,
    ];

    #[test]
    fn test_walk_elements() {
        let mut r = ElementReader::new(BODY, 4);
        assert!(r.advance());
        let e = r.peek().unwrap();
        assert_eq!(e.element_type, ElementType::Int32);
        assert_eq!(e.name, "a");
        assert_eq!(e.payload, &[0x0a, 0, 0, 0]);
        assert_eq!(e.offset, 4);
        assert_eq!(e.payload_offset(), 7);

        assert!(r.advance());
        let e = r.peek().unwrap();
        assert_eq!(e.element_type, ElementType::Boolean);
        assert_eq!(e.name, "c");
        assert_eq!(e.offset, 11);

        assert!(!r.advance());
        assert!(r.error().is_none());
        assert!(r.finish().is_ok());
        assert_eq!(r.position(), 4 + BODY.len());
    }

    #[test]
    fn test_empty_body() {
        let mut r = ElementReader::new(&[], 0);
        assert!(!r.advance());
        assert!(r.finish().is_ok());
        assert!(r.peek().is_none());
    }

    #[test]
    fn test_every_truncation_is_short() {
        for n in 1..BODY.len() {
            // Cutting exactly at an element boundary leaves a valid shorter body.
            if n == 7 {
                continue;
            }
            let mut r = ElementReader::new(&BODY[..n], 0);
            while r.advance() {}
            let err = r.error().expect("truncated body must fail");
            assert_eq!(err.kind(), ErrorKind::ShortInput, "prefix of {n} bytes: {err}");
        }
    }

    #[test]
    fn test_error_latches() {
        let body = [0x42, b'x', 0x00, 0x10, b'a', 0x00, 1, 0, 0, 0];
        let mut r = ElementReader::new(&body, 4);
        assert!(!r.advance());
        assert!(matches!(
            r.error(),
            Some(Error::UnknownElementType { tag: 0x42, offset: 4 })
        ));
        assert!(!r.advance());
        assert!(r.finish().is_err());
    }

    #[test]
    fn test_iterator_yields_error_once() {
        let body = [0x10, b'a', 0x00, 1, 0, 0, 0, 0x13, b'd', 0x00];
        let items: Vec<_> = ElementReader::new(&body, 0).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(Error::UnsupportedElementType { tag: 0x13, offset: 7, .. })
        ));
    }

    #[test]
    fn test_variable_sizes() {
        let body = [
            0x02, b's', 0x00, 0x02, 0, 0, 0, b'x', 0x00, // string "x"
            0x05, b'b', 0x00, 0x01, 0, 0, 0, 0x00, 0xff, // binary [ff]
            0x0b, b'r', 0x00, b'a', 0x00, b'i', 0x00, // regex /a/i
            0x03, b'd', 0x00, 0x05, 0, 0, 0, 0x00, // empty document
            0x0a, b'n', 0x00, // null
        ];
        let elements: Vec<_> = ElementReader::new(&body, 0)
            .map(|e| e.unwrap())
            .collect();
        let sizes: Vec<_> = elements.iter().map(|e| e.payload.len()).collect();
        assert_eq!(sizes, vec![6, 6, 4, 5, 0]);
    }

    #[test]
    fn test_invalid_lengths() {
        let body = [0x03, b'd', 0x00, 0x04, 0, 0, 0, 0x00];
        let mut r = ElementReader::new(&body, 0);
        assert!(!r.advance());
        assert!(matches!(r.error(), Some(Error::InvalidInput { offset: 3, .. })));

        let body = [0x02, b's', 0x00, 0x00, 0, 0, 0, 0x00];
        let mut r = ElementReader::new(&body, 0);
        assert!(!r.advance());
        assert_eq!(r.error().unwrap().kind(), ErrorKind::InvalidInput);

        let body = [0x05, b'b', 0x00, 0xff, 0xff, 0xff, 0xff, 0x00];
        let mut r = ElementReader::new(&body, 0);
        assert!(!r.advance());
        assert_eq!(r.error().unwrap().kind(), ErrorKind::InvalidInput);

        let body = [0x0b, b'r', 0x00, b'a', 0x00, b'i'];
        let mut r = ElementReader::new(&body, 0);
        assert!(!r.advance());
        assert!(r.error().unwrap().to_string().contains("malformed regex"));
    }

    #[test]
    fn test_element_value() {
        let mut r = ElementReader::new(BODY, 0);
        assert!(r.advance());
        assert_eq!(r.peek().unwrap().value().unwrap(), Value::Int32(10));
    }
}
