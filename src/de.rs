// ABOUTME: Serde Deserializer implementation for BSON decoding.
// ABOUTME: Allows BSON documents to be decoded into any serde-deserializable Rust type.

use crate::decoder::{split_document, Decoder, DecoderConfig};
use crate::error::{Error, Result};
use crate::reader::{ElementReader, RawElement};
use crate::scalar::{
    decode_binary, decode_bool, decode_datetime, decode_f64, decode_i32, decode_i64,
    decode_regex, decode_str, decode_timestamp,
};
use crate::ser::RAW_ELEMENT_TOKEN;
use crate::types::ElementType;
use serde::de::value::{BorrowedStrDeserializer, MapDeserializer};
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// A serde Deserializer over one BSON value.
///
/// The top-level deserializer wraps a whole document. Elements inside it are
/// deserialized by borrowing their payloads, so strings and binary data can
/// be decoded without copying.
#[derive(Debug, Clone, Copy)]
pub struct Deserializer<'de> {
    element_type: ElementType,
    payload: &'de [u8],
    /// Absolute offset of `payload` in the input.
    offset: usize,
    /// Depth of the document containing this value; 0 at the top level.
    depth: usize,
    decoder: Decoder,
    top_level: bool,
}

impl<'de> Deserializer<'de> {
    /// Create a Deserializer over a top-level document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document header, terminator or size limit
    /// check fails, or if there are trailing bytes.
    pub fn from_slice(data: &'de [u8]) -> Result<Self> {
        Self::from_slice_with_config(data, DecoderConfig::default())
    }

    /// Create a Deserializer with custom configuration.
    ///
    /// # Errors
    ///
    /// Same as [`from_slice`](Self::from_slice), under the configured limits.
    pub fn from_slice_with_config(data: &'de [u8], config: DecoderConfig) -> Result<Self> {
        let decoder = Decoder::with_config(config);
        let body = decoder.check_top_level(data, "document")?;
        Ok(Self {
            element_type: ElementType::Document,
            payload: &data[..body.len() + 5],
            offset: 0,
            depth: 0,
            decoder,
            top_level: true,
        })
    }

    fn element(element: RawElement<'de>, depth: usize, decoder: Decoder) -> Self {
        Self {
            element_type: element.element_type,
            payload: element.payload,
            offset: element.payload_offset(),
            depth,
            decoder,
            top_level: false,
        }
    }

    fn scalar<T>(&self, decoded: Result<T>) -> Result<T> {
        decoded.map_err(|e| e.offset_by(self.offset))
    }

    fn reject_top_level(&self, target: &str) -> Result<()> {
        if self.top_level {
            return Err(Error::InvalidTarget(format!(
                "a top-level document cannot be decoded into {target}"
            )));
        }
        Ok(())
    }

    /// Open this document or array for reading its elements.
    fn elements(&self) -> Result<ElementReader<'de>> {
        self.decoder.check_depth(self.depth + 1)?;
        let (_, body) = split_document(self.payload, self.element_type.name())
            .map_err(|e| e.offset_by(self.offset))?;
        Ok(ElementReader::new(body, self.offset + 4))
    }

    fn visit_document<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let mut access = DocumentAccess {
            reader: self.elements()?,
            depth: self.depth + 1,
            decoder: self.decoder,
            pending: None,
        };
        visitor.visit_map(&mut access)
    }

    fn visit_array<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let mut access = ArrayAccess {
            reader: self.elements()?,
            depth: self.depth + 1,
            decoder: self.decoder,
        };
        visitor.visit_seq(&mut access)
    }

    /// Hand the element over as its tag byte followed by its payload.
    fn visit_raw_element<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.decoder
            .validate_payload(self.element_type, self.payload, self.offset, self.depth)?;
        let mut bytes = Vec::with_capacity(self.payload.len() + 1);
        bytes.push(self.element_type.as_u8());
        bytes.extend_from_slice(self.payload);
        visitor.visit_byte_buf(bytes)
    }
}

/// Deserialize a value from a BSON document.
///
/// # Errors
///
/// Returns an error if:
/// - The document exceeds the size limit or nests too deeply
/// - The data is malformed or truncated
/// - The data doesn't match the expected type `T`
/// - There are trailing bytes after the document
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    from_slice_with_config(data, DecoderConfig::default())
}

/// Deserialize a value from a BSON document with custom configuration.
///
/// # Errors
///
/// Same as [`from_slice`], under the configured limits.
pub fn from_slice_with_config<'de, T: Deserialize<'de>>(
    data: &'de [u8],
    config: DecoderConfig,
) -> Result<T> {
    T::deserialize(Deserializer::from_slice_with_config(data, config)?)
}

/// Scalar targets reject the top-level document and otherwise let the
/// visitor decide whether the element's natural value fits.
macro_rules! scalar_targets {
    ($($method:ident => $target:literal),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                self.reject_top_level($target)?;
                self.deserialize_any(visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let payload = self.payload;
        match self.element_type {
            ElementType::Double => visitor.visit_f64(self.scalar(decode_f64(payload))?),
            ElementType::String => visitor.visit_borrowed_str(self.scalar(decode_str(payload))?),
            ElementType::Document => self.visit_document(visitor),
            ElementType::Array => self.visit_array(visitor),
            ElementType::Binary => {
                let (_, bytes) = self.scalar(decode_binary(payload))?;
                visitor.visit_borrowed_bytes(bytes)
            }
            ElementType::ObjectId => visitor.visit_borrowed_bytes(payload),
            ElementType::Boolean => visitor.visit_bool(self.scalar(decode_bool(payload))?),
            ElementType::DateTime => {
                visitor.visit_i64(self.scalar(decode_datetime(payload))?.timestamp_millis())
            }
            ElementType::Null => visitor.visit_unit(),
            ElementType::Regex => {
                let (pattern, options) = self.scalar(decode_regex(payload))?;
                let fields = [("pattern", pattern), ("options", options)];
                visitor.visit_map(MapDeserializer::new(fields.into_iter()))
            }
            ElementType::Int32 => visitor.visit_i32(self.scalar(decode_i32(payload))?),
            ElementType::Timestamp => {
                visitor.visit_u64(self.scalar(decode_timestamp(payload))?.as_u64())
            }
            ElementType::Int64 => visitor.visit_i64(self.scalar(decode_i64(payload))?),
        }
    }

    scalar_targets! {
        deserialize_bool => "a bool",
        deserialize_i8 => "an integer",
        deserialize_i16 => "an integer",
        deserialize_i32 => "an integer",
        deserialize_i64 => "an integer",
        deserialize_i128 => "an integer",
        deserialize_u8 => "an integer",
        deserialize_u16 => "an integer",
        deserialize_u32 => "an integer",
        deserialize_u64 => "an integer",
        deserialize_u128 => "an integer",
        deserialize_f32 => "a float",
        deserialize_f64 => "a float",
        deserialize_str => "a string",
        deserialize_string => "a string",
        deserialize_identifier => "an identifier",
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reject_top_level("a char")?;
        if self.element_type != ElementType::String {
            return self.deserialize_any(visitor);
        }
        let s = self.scalar(decode_str(self.payload))?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::InvalidTarget(format!(
                "expected a single character, found {s:?}"
            ))),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reject_top_level("bytes")?;
        self.deserialize_any(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.element_type == ElementType::Null {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.reject_top_level("unit")?;
        self.deserialize_any(visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == RAW_ELEMENT_TOKEN {
            return self.visit_raw_element(visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element_type {
            ElementType::Document | ElementType::Array => self.visit_array(visitor),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.element_type {
            ElementType::Document | ElementType::Array => self.visit_document(visitor),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.element_type {
            ElementType::String => {
                let variant = self.scalar(decode_str(self.payload))?;
                visitor.visit_enum(variant.into_deserializer())
            }
            ElementType::Document => {
                let mut reader = self.elements()?;
                let first = if reader.advance() { reader.peek() } else { None };
                reader.finish()?;
                let Some(first) = first else {
                    return Err(Error::InvalidTarget(
                        "an enum document must hold exactly one field, found none".into(),
                    ));
                };
                if reader.advance() {
                    return Err(Error::InvalidTarget(
                        "an enum document must hold exactly one field".into(),
                    ));
                }
                reader.finish()?;
                visitor.visit_enum(EnumDeserializer {
                    variant: first.name,
                    value: Self::element(first, self.depth + 1, self.decoder),
                })
            }
            other => Err(Error::InvalidTarget(format!("cannot decode {other} into an enum"))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.decoder
            .validate_payload(self.element_type, self.payload, self.offset, self.depth)?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Map access over the elements of a document.
struct DocumentAccess<'de> {
    reader: ElementReader<'de>,
    depth: usize,
    decoder: Decoder,
    pending: Option<RawElement<'de>>,
}

impl<'de> MapAccess<'de> for DocumentAccess<'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if !self.reader.advance() {
            self.reader.finish()?;
            return Ok(None);
        }
        let Some(element) = self.reader.peek() else {
            return Ok(None);
        };
        self.pending = Some(element);
        seed.deserialize(KeyDeserializer(element.name)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let element = self
            .pending
            .take()
            .ok_or_else(|| Error::Custom("value requested before its key".into()))?;
        seed.deserialize(Deserializer::element(element, self.depth, self.decoder))
    }
}

/// Sequence access over the elements of an array. Names are ignored.
struct ArrayAccess<'de> {
    reader: ElementReader<'de>,
    depth: usize,
    decoder: Decoder,
}

impl<'de> SeqAccess<'de> for ArrayAccess<'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if !self.reader.advance() {
            self.reader.finish()?;
            return Ok(None);
        }
        match self.reader.peek() {
            Some(element) => seed
                .deserialize(Deserializer::element(element, self.depth, self.decoder))
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Deserializes element names. Integer targets parse the name, so maps
/// keyed by integers round-trip.
struct KeyDeserializer<'de>(&'de str);

macro_rules! parse_key {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                match self.0.parse::<$ty>() {
                    Ok(n) => visitor.$visit(n),
                    Err(_) => visitor.visit_borrowed_str(self.0),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.0)
    }

    parse_key! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(BorrowedStrDeserializer::new(self.0))
    }

    serde::forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// Enum access for a document holding a single field named after the variant.
struct EnumDeserializer<'de> {
    variant: &'de str,
    value: Deserializer<'de>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = Error;
    type Variant = Deserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(self.variant))?;
        Ok((variant, self.value))
    }
}

impl<'de> de::VariantAccess<'de> for Deserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::{to_vec, Document, ObjectId, Value};
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    const SIMPLE: &[u8] = &[
        0x10, 0x00, 0x00, 0x00, 0x10, b'a', 0x00, 0x0a, 0x00, 0x00, 0x00, 0x08, b'c', 0x00,
        0x01, 0x00,
    ];

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Simple {
        a: i32,
        c: bool,
    }

    #[test]
    fn test_struct_from_bytes() {
        let s: Simple = from_slice(SIMPLE).unwrap();
        assert_eq!(s, Simple { a: 10, c: true });
    }

    #[test]
    fn test_field_order_does_not_matter() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Reversed {
            c: bool,
            a: i64,
        }
        let s: Reversed = from_slice(SIMPLE).unwrap();
        assert_eq!(s, Reversed { c: true, a: 10 });
    }

    #[test]
    fn test_unknown_fields_skipped() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct OnlyC {
            c: bool,
        }
        let s: OnlyC = from_slice(SIMPLE).unwrap();
        assert!(s.c);
    }

    #[test]
    fn test_skipped_fields_are_still_validated() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct OnlyC {
            c: bool,
        }

        // {"x": <bool byte 0x02>, "c": true}
        let bad_bool = [
            0x0d, 0x00, 0x00, 0x00, 0x08, b'x', 0x00, 0x02, 0x08, b'c', 0x00, 0x01, 0x00,
        ];
        let expected = crate::decode_document(&bad_bool).unwrap_err();
        assert!(matches!(
            expected,
            Error::InvalidInput {
                what: "bool",
                offset: 7,
                ..
            }
        ));
        assert_eq!(from_slice::<OnlyC>(&bad_bool).unwrap_err(), expected);

        // {"x": <string with invalid UTF-8>, "c": true}
        let bad_utf8 = [
            0x12, 0x00, 0x00, 0x00, 0x02, b'x', 0x00, 0x02, 0x00, 0x00, 0x00, 0xff, 0x00, 0x08,
            b'c', 0x00, 0x01, 0x00,
        ];
        let err = from_slice::<OnlyC>(&bad_utf8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err, crate::decode_document(&bad_utf8).unwrap_err());

        // {"x": {<nested document missing its terminator>}, "c": true}
        let bad_nested = [
            0x11, 0x00, 0x00, 0x00, 0x03, b'x', 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, 0x08, b'c',
            0x00, 0x01, 0x00,
        ];
        let err = from_slice::<OnlyC>(&bad_nested).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err, crate::decode_document(&bad_nested).unwrap_err());
    }

    #[test]
    fn test_missing_field_is_target_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Needs {
            zzz: String,
        }
        let err = from_slice::<Needs>(SIMPLE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Target);
    }

    #[test]
    fn test_type_mismatch_is_target_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            a: String,
        }
        let err = from_slice::<Wrong>(SIMPLE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Target);
    }

    #[test]
    fn test_top_level_scalar_target() {
        let err = from_slice::<i32>(SIMPLE).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
        let err = from_slice::<String>(SIMPLE).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
    }

    #[test]
    fn test_integer_widening_and_range() {
        #[derive(Debug, Deserialize)]
        struct Wide {
            a: i64,
        }
        #[derive(Debug, Deserialize)]
        struct Narrow {
            a: i8,
        }
        #[derive(Debug, Deserialize)]
        struct Float {
            a: f64,
        }
        assert_eq!(from_slice::<Wide>(SIMPLE).unwrap().a, 10);
        assert_eq!(from_slice::<Narrow>(SIMPLE).unwrap().a, 10);
        assert_eq!(from_slice::<Float>(SIMPLE).unwrap().a, 10.0);

        let bytes = to_vec(&BTreeMap::from([("a", 1000i32)])).unwrap();
        assert_eq!(
            from_slice::<Narrow>(&bytes).unwrap_err().kind(),
            ErrorKind::Target
        );
    }

    #[test]
    fn test_maps_and_sequences() {
        let bytes = to_vec(&BTreeMap::from([("x", 1), ("y", 2)])).unwrap();
        let m: BTreeMap<String, i32> = from_slice(&bytes).unwrap();
        assert_eq!(m.get("y"), Some(&2));

        let v: Vec<i32> = from_slice(&to_vec(&vec![3, 4, 5]).unwrap()).unwrap();
        assert_eq!(v, vec![3, 4, 5]);

        // A document read as a sequence yields its values in order.
        let v: Vec<Value> = from_slice(SIMPLE).unwrap();
        assert_eq!(v, vec![Value::Int32(10), Value::Boolean(true)]);
    }

    #[test]
    fn test_integer_keys() {
        let m = HashMap::from([(3u32, "x".to_string()), (10, "y".to_string())]);
        let back: HashMap<u32, String> = from_slice(&to_vec(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_borrowed_strings() {
        #[derive(Deserialize)]
        struct Borrowed<'a> {
            s: &'a str,
            b: &'a [u8],
        }
        let mut doc = Document::new();
        doc.insert("s", "hello");
        doc.insert("b", crate::Binary::generic(b"xyz".to_vec()));
        let bytes = crate::encode_document(&doc).unwrap();
        let v: Borrowed<'_> = from_slice(&bytes).unwrap();
        assert_eq!(v.s, "hello");
        assert_eq!(v.b, b"xyz");
    }

    #[test]
    fn test_option_and_unit() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Opt {
            a: Option<i32>,
            b: Option<i32>,
            #[serde(default)]
            c: Option<String>,
        }
        let v = Opt { a: Some(1), b: None, c: None };
        let bytes = to_vec(&v).unwrap();
        assert_eq!(from_slice::<Opt>(&bytes).unwrap(), v);
    }

    #[test]
    fn test_enums() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum E {
            Unit,
            New(i32),
            Tuple(i32, bool),
            Struct { a: i32 },
        }
        let all = vec![E::Unit, E::New(1), E::Tuple(2, true), E::Struct { a: 3 }];
        let back: Vec<E> = from_slice(&to_vec(&all).unwrap()).unwrap();
        assert_eq!(back, all);

        let err = from_slice::<Vec<E>>(&to_vec(&vec![5]).unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget(_)));
    }

    #[test]
    fn test_char() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct C {
            c: char,
        }
        let bytes = to_vec(&C { c: 'é' }).unwrap();
        assert_eq!(from_slice::<C>(&bytes).unwrap(), C { c: 'é' });
        let bytes = to_vec(&BTreeMap::from([("c", "ab")])).unwrap();
        assert!(matches!(from_slice::<C>(&bytes), Err(Error::InvalidTarget(_))));
    }

    #[test]
    fn test_model_types_in_structs() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Rec {
            id: ObjectId,
            at: crate::DateTime,
            ts: crate::Timestamp,
            extra: Document,
            any: Value,
        }
        let rec = Rec {
            id: ObjectId::from_bytes([7; 12]),
            at: crate::DateTime::from_millis(1_700_000_000_123),
            ts: crate::Timestamp::from_parts(5, 6),
            extra: crate::doc! { "k": [1, "two"] },
            any: Value::Regex(crate::Regex::new("^a", "i")),
        };
        let bytes = to_vec(&rec).unwrap();
        let doc = crate::decode_document(&bytes).unwrap();
        assert_eq!(doc.get_object_id("id"), Some(rec.id));
        assert_eq!(doc.get("at"), Some(&Value::DateTime(rec.at)));
        assert_eq!(from_slice::<Rec>(&bytes).unwrap(), rec);
    }

    #[test]
    fn test_decode_errors_keep_their_kind() {
        let mut bad_bool = SIMPLE.to_vec();
        bad_bool[14] = 0x02;
        let err = from_slice::<Simple>(&bad_bool).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = from_slice::<Simple>(&SIMPLE[..12]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShortInput);

        // Errors inside a nested model value are found before it is visited.
        let nested = [
            0x11, 0, 0, 0, 0x03, b'd', 0x00, 0x09, 0, 0, 0, 0x08, b'x', 0x00, 0x07, 0x00, 0x00,
        ];
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Holder {
            d: Document,
        }
        let err = from_slice::<Holder>(&nested).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_depth_limit() {
        let config = DecoderConfig {
            max_depth: 1,
            ..DecoderConfig::default()
        };
        let bytes = to_vec(&BTreeMap::from([("a", BTreeMap::from([("b", 1)]))])).unwrap();
        let err = from_slice_with_config::<Value>(&bytes, config).unwrap_err();
        assert_eq!(err, Error::MaxDepthExceeded(1));
        let err =
            from_slice_with_config::<BTreeMap<String, BTreeMap<String, i32>>>(&bytes, config)
                .unwrap_err();
        assert_eq!(err, Error::MaxDepthExceeded(1));
    }
}
