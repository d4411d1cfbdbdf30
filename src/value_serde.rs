// ABOUTME: Serialize and Deserialize for Value, Document, Array and the BSON scalar types.
// ABOUTME: Binary formats carry exact element bytes; human-readable formats get plain forms.

use crate::decoder::Decoder;
use crate::document::{Array, Document};
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::raw::{RawArray, RawDocument};
use crate::reader::RawElement;
use crate::scalar::{
    decode_binary, decode_datetime, decode_object_id, decode_regex, decode_timestamp,
};
use crate::ser::RAW_ELEMENT_TOKEN;
use crate::timestamp::Timestamp;
use crate::types::{Binary, DateTime, ElementType, Regex};
use crate::value::Value;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

// =============================================================================
// Element bytes
// =============================================================================

/// One element as its tag byte followed by its payload.
struct TaggedBytes<'a>(&'a [u8]);

impl Serialize for TaggedBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

fn serialize_element<S: Serializer>(
    serializer: S,
    element_type: ElementType,
    write: impl FnOnce(&mut Encoder<'_>) -> Result<usize>,
) -> std::result::Result<S::Ok, S::Error> {
    let mut buf = vec![element_type.as_u8()];
    write(&mut Encoder::new(&mut buf)).map_err(|e| ser::Error::custom(e.carry()))?;
    serializer.serialize_newtype_struct(RAW_ELEMENT_TOKEN, &TaggedBytes(&buf))
}

/// A model type that can be rebuilt from one element.
trait FromElement: Sized {
    const EXPECTING: &'static str;

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self>;
}

fn mismatch<T>(expected: &str, found: ElementType) -> Result<T> {
    Err(Error::InvalidTarget(format!("expected {expected}, found {found}")))
}

struct ElementVisitor<T>(PhantomData<T>);

impl<'de, T: FromElement> Visitor<'de> for ElementVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(T::EXPECTING)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<T, E> {
        let (&tag, payload) = v
            .split_first()
            .ok_or_else(|| E::custom("empty element bytes"))?;
        let element_type = ElementType::resolve(tag).map_err(|e| E::custom(e.carry()))?;
        T::from_element(element_type, payload).map_err(|e| E::custom(e.carry()))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<T, D::Error> {
        deserializer.deserialize_byte_buf(self)
    }
}

fn deserialize_element<'de, D: Deserializer<'de>, T: FromElement>(
    deserializer: D,
) -> std::result::Result<T, D::Error> {
    deserializer.deserialize_newtype_struct(RAW_ELEMENT_TOKEN, ElementVisitor(PhantomData))
}

fn decode_value(element_type: ElementType, payload: &[u8]) -> Result<Value> {
    Decoder::new().decode_element(&RawElement {
        element_type,
        name: "",
        payload,
        offset: 0,
    })
}

// =============================================================================
// Value
// =============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serialize_element(serializer, self.element_type(), |enc| {
                enc.write_payload(self)
            });
        }
        match self {
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Document(v) => v.serialize(serializer),
            Value::Array(v) => v.serialize(serializer),
            Value::Binary(v) => v.serialize(serializer),
            Value::ObjectId(v) => v.serialize(serializer),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::DateTime(v) => v.serialize(serializer),
            Value::Null => serializer.serialize_unit(),
            Value::Regex(v) => v.serialize(serializer),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Timestamp(v) => v.serialize(serializer),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::RawDocument(v) => v.serialize(serializer),
            Value::RawArray(v) => v.serialize(serializer),
        }
    }
}

impl FromElement for Value {
    const EXPECTING: &'static str = "any BSON value";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        decode_value(element_type, payload)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(ValueVisitor)
        } else {
            deserialize_element(deserializer)
        }
    }
}

/// Builds a Value from a self-describing format's natural data model.
struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any BSON value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i32<E>(self, v: i32) -> std::result::Result<Value, E> {
        Ok(Value::Int32(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(i32::try_from(v).map_or(Value::Int64(v), Value::Int32))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        match i64::try_from(v) {
            Ok(n) => self.visit_i64(n),
            Err(_) => Err(E::custom(format!("u64 value {v} does not fit in int64"))),
        }
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Binary(Binary::generic(v)))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Binary(Binary::generic(v)))
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<Value, A::Error> {
        ArrayVisitor.visit_seq(seq).map(Value::Array)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<Value, A::Error> {
        DocumentVisitor.visit_map(map).map(Value::Document)
    }
}

// =============================================================================
// Document and Array
// =============================================================================

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return serialize_element(serializer, ElementType::Document, |enc| {
                enc.write_document(self)
            });
        }
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl FromElement for Document {
    const EXPECTING: &'static str = "a BSON document";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match decode_value(element_type, payload)? {
            Value::Document(doc) => Ok(doc),
            Value::Array(array) => Ok(array.to_document()),
            _ => mismatch("a document", element_type),
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_map(DocumentVisitor)
        } else {
            deserialize_element(deserializer)
        }
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Document, A::Error> {
        let mut doc = Document::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            doc.insert(key, value);
        }
        Ok(doc)
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_seq(self.iter())
        } else {
            serialize_element(serializer, ElementType::Array, |enc| enc.write_array(self))
        }
    }
}

impl FromElement for Array {
    const EXPECTING: &'static str = "a BSON array";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match decode_value(element_type, payload)? {
            Value::Array(array) => Ok(array),
            Value::Document(doc) => Ok(doc.into_iter().map(|(_, v)| v).collect()),
            _ => mismatch("an array", element_type),
        }
    }
}

impl<'de> Deserialize<'de> for Array {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_seq(ArrayVisitor)
        } else {
            deserialize_element(deserializer)
        }
    }
}

struct ArrayVisitor;

impl<'de> Visitor<'de> for ArrayVisitor {
    type Value = Array;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Array, A::Error> {
        let mut array = Array::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element::<Value>()? {
            array.push(value);
        }
        Ok(array)
    }
}

// =============================================================================
// Scalars
// =============================================================================

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serialize_element(serializer, ElementType::ObjectId, |enc| {
                Ok(enc.write_object_id(self))
            })
        }
    }
}

impl FromElement for ObjectId {
    const EXPECTING: &'static str = "an ObjectId";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::ObjectId => decode_object_id(payload),
            other => mismatch("an ObjectId", other),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            return deserialize_element(deserializer);
        }

        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = ObjectId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 24-digit hex string or 12 bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ObjectId, E> {
                ObjectId::parse_str(v).map_err(E::custom)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<ObjectId, E> {
                <[u8; ObjectId::LEN]>::try_from(v)
                    .map(ObjectId::from_bytes)
                    .map_err(|_| E::invalid_length(v.len(), &self))
            }
        }

        deserializer.deserialize_any(HexVisitor)
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_i64(self.timestamp_millis())
        } else {
            serialize_element(serializer, ElementType::DateTime, |enc| {
                Ok(enc.write_datetime(*self))
            })
        }
    }
}

impl FromElement for DateTime {
    const EXPECTING: &'static str = "a UTC datetime";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::DateTime => decode_datetime(payload),
            other => mismatch("a datetime", other),
        }
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            return deserialize_element(deserializer);
        }

        struct MillisVisitor;

        impl<'de> Visitor<'de> for MillisVisitor {
            type Value = DateTime;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("milliseconds since the epoch or an RFC 3339 string")
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<DateTime, E> {
                Ok(DateTime::from_millis(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<DateTime, E> {
                i64::try_from(v)
                    .map(DateTime::from_millis)
                    .map_err(|_| E::custom(format!("{v} milliseconds is out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<DateTime, E> {
                chrono::DateTime::parse_from_rfc3339(v)
                    .map(DateTime::from_chrono)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MillisVisitor)
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_bytes(&self.bytes)
        } else {
            serialize_element(serializer, ElementType::Binary, |enc| {
                Ok(enc.write_binary(self.subtype, &self.bytes))
            })
        }
    }
}

impl FromElement for Binary {
    const EXPECTING: &'static str = "BSON binary data";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::Binary => {
                let (subtype, bytes) = decode_binary(payload)?;
                Ok(Binary::new(subtype, bytes))
            }
            other => mismatch("binary data", other),
        }
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            return deserialize_element(deserializer);
        }

        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Binary;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Binary, E> {
                Ok(Binary::generic(v))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Binary, E> {
                Ok(Binary::generic(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Binary, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    bytes.push(b);
                }
                Ok(Binary::generic(bytes))
            }
        }

        deserializer.deserialize_byte_buf(BytesVisitor)
    }
}

/// Natural form of a regular expression.
#[derive(Serialize, Deserialize)]
struct RegexFields<'a> {
    #[serde(borrow)]
    pattern: std::borrow::Cow<'a, str>,
    #[serde(borrow)]
    options: std::borrow::Cow<'a, str>,
}

impl Serialize for Regex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            RegexFields {
                pattern: self.pattern.as_str().into(),
                options: self.options.as_str().into(),
            }
            .serialize(serializer)
        } else {
            serialize_element(serializer, ElementType::Regex, |enc| {
                enc.write_regex(&self.pattern, &self.options)
            })
        }
    }
}

impl FromElement for Regex {
    const EXPECTING: &'static str = "a BSON regular expression";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::Regex => {
                let (pattern, options) = decode_regex(payload)?;
                Ok(Regex::new(pattern, options))
            }
            other => mismatch("a regular expression", other),
        }
    }
}

impl<'de> Deserialize<'de> for Regex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let fields = RegexFields::deserialize(deserializer)?;
            Ok(Regex::new(fields.pattern, fields.options))
        } else {
            deserialize_element(deserializer)
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_u64(self.as_u64())
        } else {
            serialize_element(serializer, ElementType::Timestamp, |enc| {
                Ok(enc.write_timestamp(*self))
            })
        }
    }
}

impl FromElement for Timestamp {
    const EXPECTING: &'static str = "a BSON timestamp";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::Timestamp => decode_timestamp(payload),
            other => mismatch("a timestamp", other),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            u64::deserialize(deserializer).map(Timestamp::from_u64)
        } else {
            deserialize_element(deserializer)
        }
    }
}

// =============================================================================
// Raw documents
// =============================================================================

impl Serialize for RawDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            self.to_document()
                .map_err(ser::Error::custom)?
                .serialize(serializer)
        } else {
            serialize_element(serializer, ElementType::Document, |enc| {
                Ok(enc.write_raw(self.as_bytes()))
            })
        }
    }
}

impl FromElement for RawDocument {
    const EXPECTING: &'static str = "an encoded BSON document";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::Document => RawDocument::new(payload.to_vec()),
            other => mismatch("a document", other),
        }
    }
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let doc = Document::deserialize(deserializer)?;
            RawDocument::from_document(&doc).map_err(de::Error::custom)
        } else {
            deserialize_element(deserializer)
        }
    }
}

impl Serialize for RawArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            self.to_array()
                .map_err(ser::Error::custom)?
                .serialize(serializer)
        } else {
            serialize_element(serializer, ElementType::Array, |enc| {
                Ok(enc.write_raw(self.as_bytes()))
            })
        }
    }
}

impl FromElement for RawArray {
    const EXPECTING: &'static str = "an encoded BSON array";

    fn from_element(element_type: ElementType, payload: &[u8]) -> Result<Self> {
        match element_type {
            ElementType::Array => RawArray::new(payload.to_vec()),
            other => mismatch("an array", other),
        }
    }
}

impl<'de> Deserialize<'de> for RawArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let array = Array::deserialize(deserializer)?;
            RawArray::from_array(&array).map_err(de::Error::custom)
        } else {
            deserialize_element(deserializer)
        }
    }
}
