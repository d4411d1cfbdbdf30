// ABOUTME: Pre-encoded BSON documents and arrays held as owned bytes.
// ABOUTME: Copied verbatim by the encoder and walkable without a full decode.

use crate::decoder::{split_document, Decoder};
use crate::document::{Array, Document};
use crate::error::{Error, Result};
use crate::reader::{ElementReader, RawElement};

fn check_exact(bytes: &[u8], what: &'static str) -> Result<()> {
    let (len, _) = split_document(bytes, what)?;
    if len != bytes.len() {
        return Err(Error::TrailingBytes(bytes.len() - len));
    }
    Ok(())
}

/// The element body of possibly unchecked document bytes; empty when the
/// bytes are too short to have one.
fn body(bytes: &[u8]) -> &[u8] {
    bytes.get(4..bytes.len().saturating_sub(1)).unwrap_or(&[])
}

/// An encoded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDocument {
    bytes: Vec<u8>,
}

impl RawDocument {
    /// Wrap encoded bytes after checking the length prefix and terminator.
    /// Elements are not inspected.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        check_exact(&bytes, "document")?;
        Ok(Self { bytes })
    }

    /// Wrap bytes without any checks. Encoding copies them as they are.
    #[must_use]
    pub fn from_bytes_unchecked(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Encode `doc` and keep the bytes.
    pub fn from_document(doc: &Document) -> Result<Self> {
        crate::encode_document(doc).map(|bytes| Self { bytes })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Walk the elements without decoding their payloads.
    #[must_use]
    pub fn iter(&self) -> ElementReader<'_> {
        ElementReader::new(body(&self.bytes), 4)
    }

    /// The first element named `name`.
    pub fn get(&self, name: &str) -> Result<Option<RawElement<'_>>> {
        for element in self.iter() {
            let element = element?;
            if element.name == name {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// Fully decode into a [`Document`].
    pub fn to_document(&self) -> Result<Document> {
        Decoder::new().decode_document(&self.bytes)
    }
}

impl<'a> IntoIterator for &'a RawDocument {
    type Item = Result<RawElement<'a>>;
    type IntoIter = ElementReader<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<&Document> for RawDocument {
    type Error = Error;

    fn try_from(doc: &Document) -> Result<Self> {
        Self::from_document(doc)
    }
}

/// An encoded array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawArray {
    bytes: Vec<u8>,
}

impl RawArray {
    /// Wrap encoded bytes after checking the length prefix and terminator.
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        check_exact(&bytes, "array")?;
        Ok(Self { bytes })
    }

    #[must_use]
    pub fn from_bytes_unchecked(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Encode `array` and keep the bytes.
    pub fn from_array(array: &Array) -> Result<Self> {
        crate::encode_array(array).map(|bytes| Self { bytes })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn iter(&self) -> ElementReader<'_> {
        ElementReader::new(body(&self.bytes), 4)
    }

    pub fn to_array(&self) -> Result<Array> {
        Decoder::new().decode_array(&self.bytes)
    }
}

impl<'a> IntoIterator for &'a RawArray {
    type Item = Result<RawElement<'a>>;
    type IntoIter = ElementReader<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
