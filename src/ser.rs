// ABOUTME: Serde Serializer implementation for BSON encoding.
// ABOUTME: Allows any serde-serializable Rust type with a document shape to be encoded to BSON.

use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::types::{BinarySubtype, ElementType};
use serde::ser::{self, Serialize};

/// Newtype name that carries one pre-encoded element (tag byte followed by
/// payload) from the model types' `Serialize` impls to this serializer.
pub(crate) const RAW_ELEMENT_TOKEN: &str = "$__serde_bson_private_raw_element";

/// Returns true if `value` equals its type's default.
///
/// Use it to omit empty fields:
///
/// ```rust
/// #[derive(serde::Serialize)]
/// struct User {
///     name: String,
///     #[serde(skip_serializing_if = "serde_bson::is_default")]
///     nickname: String,
/// }
///
/// let bytes = serde_bson::to_vec(&User { name: "a".into(), nickname: String::new() }).unwrap();
/// let doc = serde_bson::decode_document(&bytes).unwrap();
/// assert!(!doc.contains_key("nickname"));
/// ```
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// A serde Serializer that writes one BSON value.
///
/// Inside a document the serializer knows the position of the element's
/// type tag, which it fills in once the value's shape is known. At the top
/// level only document-shaped values (structs, maps, sequences) are accepted.
pub struct Serializer<'a, 'b> {
    encoder: &'a mut Encoder<'b>,
    type_index: Option<usize>,
    raw_element: bool,
}

impl<'a, 'b> Serializer<'a, 'b> {
    /// Create a top-level Serializer wrapping an Encoder.
    pub fn new(encoder: &'a mut Encoder<'b>) -> Self {
        Self {
            encoder,
            type_index: None,
            raw_element: false,
        }
    }

    fn element(encoder: &'a mut Encoder<'b>, type_index: usize) -> Self {
        Self {
            encoder,
            type_index: Some(type_index),
            raw_element: false,
        }
    }

    /// Record the element type, or reject a non-document at the top level.
    fn tag(&mut self, element_type: ElementType) -> Result<()> {
        match self.type_index {
            Some(index) => {
                self.encoder.set_element_type(index, element_type);
                Ok(())
            }
            None if matches!(element_type, ElementType::Document | ElementType::Array) => Ok(()),
            None => Err(Error::UnsupportedType(format!(
                "{element_type} at the top level; expected a document or sequence"
            ))),
        }
    }

    fn write_i32(mut self, v: i32) -> Result<()> {
        self.tag(ElementType::Int32)?;
        self.encoder.write_i32(v);
        Ok(())
    }

    fn write_i64(mut self, v: i64) -> Result<()> {
        self.tag(ElementType::Int64)?;
        self.encoder.write_i64(v);
        Ok(())
    }

    fn write_str(mut self, v: &str) -> Result<()> {
        self.tag(ElementType::String)?;
        self.encoder.write_str(v);
        Ok(())
    }

    fn write_null(mut self) -> Result<()> {
        self.tag(ElementType::Null)
    }

    fn write_raw_element(mut self, bytes: &[u8]) -> Result<()> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| Error::UnsupportedType("empty raw element".into()))?;
        let element_type = ElementType::resolve(tag)?;
        self.tag(element_type)?;
        self.encoder.write_raw(payload);
        Ok(())
    }

    /// Start a document, optionally wrapped as the single field of an outer
    /// document named `variant`.
    fn begin(
        mut self,
        element_type: ElementType,
        variant: Option<&str>,
    ) -> Result<Compound<'a, 'b>> {
        let outer = match variant {
            Some(name) => {
                self.tag(ElementType::Document)?;
                let outer = self.encoder.begin_document();
                let index = self.encoder.begin_element(name)?;
                self.encoder.set_element_type(index, element_type);
                Some(outer)
            }
            None => {
                self.tag(element_type)?;
                None
            }
        };
        let start = self.encoder.begin_document();
        Ok(Compound {
            encoder: self.encoder,
            start,
            outer,
            next_index: 0,
        })
    }
}

fn out_of_range(ty: &str, v: impl std::fmt::Display, wire: &str) -> Error {
    Error::UnsupportedType(format!("{ty} value {v} does not fit in {wire}"))
}

impl<'a, 'b> ser::Serializer for Serializer<'a, 'b> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Compound<'a, 'b>;
    type SerializeTuple = Compound<'a, 'b>;
    type SerializeTupleStruct = Compound<'a, 'b>;
    type SerializeTupleVariant = Compound<'a, 'b>;
    type SerializeMap = MapSerializer<'a, 'b>;
    type SerializeStruct = Compound<'a, 'b>;
    type SerializeStructVariant = Compound<'a, 'b>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(mut self, v: bool) -> Result<()> {
        self.tag(ElementType::Boolean)?;
        self.encoder.write_bool(v);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.write_i32(i32::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.write_i32(i32::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.write_i32(v)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.write_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        let v = i64::try_from(v).map_err(|_| out_of_range("i128", v, "int64"))?;
        self.write_i64(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_i32(i32::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_i32(i32::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        let v = i32::try_from(v).map_err(|_| out_of_range("u32", v, "int32"))?;
        self.write_i32(v)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        let v = i64::try_from(v).map_err(|_| out_of_range("u64", v, "int64"))?;
        self.write_i64(v)
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        let v = i64::try_from(v).map_err(|_| out_of_range("u128", v, "int64"))?;
        self.write_i64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(mut self, v: f64) -> Result<()> {
        self.tag(ElementType::Double)?;
        self.encoder.write_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        let s = v.encode_utf8(&mut buf);
        self.write_str(s)
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.write_str(v)
    }

    fn serialize_bytes(mut self, v: &[u8]) -> Result<()> {
        if self.raw_element {
            return self.write_raw_element(v);
        }
        self.tag(ElementType::Binary)?;
        self.encoder.write_binary(BinarySubtype::Generic, v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.write_null()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.write_null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.write_null()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.write_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        mut self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        if name == RAW_ELEMENT_TOKEN {
            self.raw_element = true;
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.tag(ElementType::Document)?;
        let start = self.encoder.begin_document();
        let index = self.encoder.begin_element(variant)?;
        value.serialize(Serializer::element(&mut *self.encoder, index))?;
        self.encoder.end_document(start)?;
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.begin(ElementType::Array, None)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.begin(ElementType::Array, None)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.begin(ElementType::Array, None)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.begin(ElementType::Array, Some(variant))
    }

    fn serialize_map(mut self, len: Option<usize>) -> Result<Self::SerializeMap> {
        self.tag(ElementType::Document)?;
        let start = self.encoder.begin_document();
        Ok(MapSerializer {
            encoder: self.encoder,
            start,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.begin(ElementType::Document, None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.begin(ElementType::Document, Some(variant))
    }
}

/// Serializes sequences, tuples and structs, whose element order is fixed.
pub struct Compound<'a, 'b> {
    encoder: &'a mut Encoder<'b>,
    start: usize,
    outer: Option<usize>,
    next_index: usize,
}

impl Compound<'_, '_> {
    fn field<T: ?Sized + Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        let index = self.encoder.begin_element(name)?;
        value.serialize(Serializer::element(&mut *self.encoder, index))
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let mut key = itoa::Buffer::new();
        let name = key.format(self.next_index);
        self.next_index += 1;
        self.field(name, value)
    }

    fn finish(self) -> Result<()> {
        self.encoder.end_document(self.start)?;
        if let Some(outer) = self.outer {
            self.encoder.end_document(outer)?;
        }
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Serializes maps. Entries are buffered and written in ascending key order
/// so that equal maps encode identically whatever their iteration order.
pub struct MapSerializer<'a, 'b> {
    encoder: &'a mut Encoder<'b>,
    start: usize,
    entries: Vec<(String, Vec<u8>)>,
    key: Option<String>,
}

impl ser::SerializeMap for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::Custom("serialize_value called before serialize_key".into()))?;
        let mut element = Vec::new();
        let mut encoder = Encoder::new(&mut element);
        let index = encoder.begin_element(&key)?;
        value.serialize(Serializer::element(&mut encoder, index))?;
        self.entries.push((key, element));
        Ok(())
    }

    fn end(mut self) -> Result<()> {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, element) in &self.entries {
            self.encoder.write_raw(element);
        }
        self.encoder.end_document(self.start)?;
        Ok(())
    }
}

/// A helper serializer for map keys that ensures they are strings.
struct MapKeySerializer;

fn key_must_be_string() -> Error {
    Error::UnsupportedType("map key must be a string or integer".into())
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = ser::Impossible<String, Error>;
    type SerializeTuple = ser::Impossible<String, Error>;
    type SerializeTupleStruct = ser::Impossible<String, Error>;
    type SerializeTupleVariant = ser::Impossible<String, Error>;
    type SerializeMap = ser::Impossible<String, Error>;
    type SerializeStruct = ser::Impossible<String, Error>;
    type SerializeStructVariant = ser::Impossible<String, Error>;

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_owned())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }
    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(itoa::Buffer::new().format(v).to_owned())
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_none(self) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_unit(self) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_owned())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(key_must_be_string())
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_must_be_string())
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_must_be_string())
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_must_be_string())
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_must_be_string())
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_must_be_string())
    }
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_must_be_string())
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_must_be_string())
    }
}
