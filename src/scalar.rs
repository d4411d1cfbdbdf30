// ABOUTME: Fixed-position codecs for every BSON scalar type.
// ABOUTME: Encoders write exactly size() bytes; decoders distinguish short from invalid input.

//! Scalar primitives.
//!
//! Each scalar type has a `size_*`, an `encode_*` and a `decode_*` function.
//! Encoders write exactly `size_*` bytes at the start of the destination and
//! panic if it is shorter; callers pre-size the destination. Decoders read
//! from the start of the source and return [`Error::ShortInput`] when it is
//! too small, or [`Error::InvalidInput`] when the bytes violate the format.
//!
//! All multi-byte integers are little-endian. Doubles are copied bit for bit,
//! so signed zeros, infinities and NaN payloads survive a round trip.

use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::timestamp::Timestamp;
use crate::types::{Binary, BinarySubtype, DateTime, ElementType, Regex};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
pub(crate) fn validate_utf8<'a>(bytes: &'a [u8], what: &'static str) -> Result<&'a str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::invalid(what, "invalid UTF-8"))
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
pub(crate) fn validate_utf8<'a>(bytes: &'a [u8], what: &'static str) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|_| Error::invalid(what, "invalid UTF-8"))
}

#[inline]
fn fixed<const N: usize>(src: &[u8], what: &'static str) -> Result<[u8; N]> {
    if src.len() < N {
        return Err(Error::short(what, N, src.len()));
    }
    let mut b = [0u8; N];
    b.copy_from_slice(&src[..N]);
    Ok(b)
}

/// Read a little-endian length prefix, rejecting negative values.
#[inline]
pub(crate) fn read_length(src: &[u8], what: &'static str) -> Result<usize> {
    let l = i32::from_le_bytes(fixed::<4>(src, what)?);
    usize::try_from(l).map_err(|_| Error::invalid(what, format!("negative length prefix {l}")))
}

// =============================================================================
// Double
// =============================================================================

#[must_use]
pub const fn size_f64(_: f64) -> usize {
    8
}

pub fn encode_f64(dst: &mut [u8], v: f64) {
    dst[..8].copy_from_slice(&v.to_bits().to_le_bytes());
}

pub fn decode_f64(src: &[u8]) -> Result<f64> {
    Ok(f64::from_bits(u64::from_le_bytes(fixed::<8>(src, "double")?)))
}

// =============================================================================
// String
// =============================================================================

/// Length prefix, payload and NUL terminator.
#[must_use]
pub const fn size_str(v: &str) -> usize {
    v.len() + 5
}

pub fn encode_str(dst: &mut [u8], v: &str) {
    let len = v.len();
    dst[..4].copy_from_slice(&((len + 1) as u32).to_le_bytes());
    dst[4..4 + len].copy_from_slice(v.as_bytes());
    dst[4 + len] = 0;
}

/// Decode a length-prefixed string. The payload may contain NUL bytes; the
/// length prefix is authoritative.
pub fn decode_str(src: &[u8]) -> Result<&str> {
    if src.len() < 5 {
        return Err(Error::short("string", 5, src.len()));
    }
    let l = read_length(src, "string")?;
    if l == 0 {
        return Err(Error::invalid("string", "length prefix must be at least 1"));
    }
    let total = l + 4;
    if src.len() < total {
        return Err(Error::short("string", total, src.len()));
    }
    if src[total - 1] != 0 {
        return Err(Error::InvalidInput {
            what: "string",
            offset: total - 1,
            reason: "missing NUL terminator".into(),
        });
    }
    validate_utf8(&src[4..total - 1], "string")
}

// =============================================================================
// Binary
// =============================================================================

#[must_use]
pub const fn size_binary(bytes: &[u8]) -> usize {
    bytes.len() + 5
}

pub fn encode_binary(dst: &mut [u8], subtype: BinarySubtype, bytes: &[u8]) {
    let len = bytes.len();
    dst[..4].copy_from_slice(&(len as u32).to_le_bytes());
    dst[4] = subtype.into();
    dst[5..5 + len].copy_from_slice(bytes);
}

pub fn decode_binary(src: &[u8]) -> Result<(BinarySubtype, &[u8])> {
    if src.len() < 5 {
        return Err(Error::short("binary", 5, src.len()));
    }
    let l = read_length(src, "binary")?;
    let total = l + 5;
    if src.len() < total {
        return Err(Error::short("binary", total, src.len()));
    }
    Ok((BinarySubtype::from(src[4]), &src[5..total]))
}

// =============================================================================
// ObjectId
// =============================================================================

#[must_use]
pub const fn size_object_id(_: &ObjectId) -> usize {
    ObjectId::LEN
}

pub fn encode_object_id(dst: &mut [u8], v: &ObjectId) {
    dst[..ObjectId::LEN].copy_from_slice(&v.bytes());
}

pub fn decode_object_id(src: &[u8]) -> Result<ObjectId> {
    Ok(ObjectId::from_bytes(fixed::<12>(src, "objectId")?))
}

// =============================================================================
// Boolean
// =============================================================================

#[must_use]
pub const fn size_bool(_: bool) -> usize {
    1
}

pub fn encode_bool(dst: &mut [u8], v: bool) {
    dst[0] = u8::from(v);
}

pub fn decode_bool(src: &[u8]) -> Result<bool> {
    match fixed::<1>(src, "bool")?[0] {
        0x00 => Ok(false),
        0x01 => Ok(true),
        b => Err(Error::invalid("bool", format!("byte 0x{b:02x} is neither 0 nor 1"))),
    }
}

// =============================================================================
// DateTime
// =============================================================================

#[must_use]
pub const fn size_datetime(_: DateTime) -> usize {
    8
}

pub fn encode_datetime(dst: &mut [u8], v: DateTime) {
    encode_i64(dst, v.timestamp_millis());
}

pub fn decode_datetime(src: &[u8]) -> Result<DateTime> {
    Ok(DateTime::from_millis(i64::from_le_bytes(fixed::<8>(src, "datetime")?)))
}

// =============================================================================
// Null
// =============================================================================

#[must_use]
pub const fn size_null() -> usize {
    0
}

// =============================================================================
// Regex
// =============================================================================

#[must_use]
pub const fn size_regex(pattern: &str, options: &str) -> usize {
    pattern.len() + options.len() + 2
}

/// The caller guarantees neither part contains a NUL byte.
pub fn encode_regex(dst: &mut [u8], pattern: &str, options: &str) {
    let p = pattern.len();
    let o = options.len();
    dst[..p].copy_from_slice(pattern.as_bytes());
    dst[p] = 0;
    dst[p + 1..p + 1 + o].copy_from_slice(options.as_bytes());
    dst[p + 1 + o] = 0;
}

/// Decode pattern and options. A missing terminator is a malformed regex.
pub fn decode_regex(src: &[u8]) -> Result<(&str, &str)> {
    let p = memchr::memchr(0, src)
        .ok_or_else(|| Error::invalid("regex", "malformed regex: pattern is not terminated"))?;
    let rest = &src[p + 1..];
    let o = memchr::memchr(0, rest)
        .ok_or_else(|| Error::invalid("regex", "malformed regex: options are not terminated"))?;
    Ok((
        validate_utf8(&src[..p], "regex")?,
        validate_utf8(&rest[..o], "regex")?,
    ))
}

// =============================================================================
// Int32 / Timestamp / Int64
// =============================================================================

#[must_use]
pub const fn size_i32(_: i32) -> usize {
    4
}

pub fn encode_i32(dst: &mut [u8], v: i32) {
    dst[..4].copy_from_slice(&v.to_le_bytes());
}

pub fn decode_i32(src: &[u8]) -> Result<i32> {
    Ok(i32::from_le_bytes(fixed::<4>(src, "int32")?))
}

#[must_use]
pub const fn size_timestamp(_: Timestamp) -> usize {
    8
}

pub fn encode_timestamp(dst: &mut [u8], v: Timestamp) {
    dst[..8].copy_from_slice(&v.as_u64().to_le_bytes());
}

pub fn decode_timestamp(src: &[u8]) -> Result<Timestamp> {
    Ok(Timestamp::from_u64(u64::from_le_bytes(fixed::<8>(src, "timestamp")?)))
}

#[must_use]
pub const fn size_i64(_: i64) -> usize {
    8
}

pub fn encode_i64(dst: &mut [u8], v: i64) {
    dst[..8].copy_from_slice(&v.to_le_bytes());
}

pub fn decode_i64(src: &[u8]) -> Result<i64> {
    Ok(i64::from_le_bytes(fixed::<8>(src, "int64")?))
}

// =============================================================================
// Generic interface
// =============================================================================

/// A BSON scalar with a fixed-position encoding.
pub trait Scalar: Sized {
    /// The element type tag written before this scalar inside a document.
    const ELEMENT_TYPE: ElementType;

    /// Number of bytes `encode` writes.
    fn size(&self) -> usize;

    /// Write exactly `size()` bytes at the start of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `size()`.
    fn encode(&self, dst: &mut [u8]);

    /// Decode a value from the start of `src`.
    fn decode(src: &[u8]) -> Result<Self>;
}

/// Encode a scalar into a freshly allocated buffer.
#[must_use]
pub fn to_bytes<T: Scalar>(v: &T) -> Vec<u8> {
    let mut buf = vec![0u8; v.size()];
    v.encode(&mut buf);
    buf
}

impl Scalar for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::Double;
    fn size(&self) -> usize {
        size_f64(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_f64(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_f64(src)
    }
}

impl Scalar for String {
    const ELEMENT_TYPE: ElementType = ElementType::String;
    fn size(&self) -> usize {
        size_str(self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_str(dst, self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_str(src).map(str::to_owned)
    }
}

impl Scalar for Binary {
    const ELEMENT_TYPE: ElementType = ElementType::Binary;
    fn size(&self) -> usize {
        size_binary(&self.bytes)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_binary(dst, self.subtype, &self.bytes);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        let (subtype, bytes) = decode_binary(src)?;
        Ok(Binary::new(subtype, bytes))
    }
}

impl Scalar for ObjectId {
    const ELEMENT_TYPE: ElementType = ElementType::ObjectId;
    fn size(&self) -> usize {
        size_object_id(self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_object_id(dst, self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_object_id(src)
    }
}

impl Scalar for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Boolean;
    fn size(&self) -> usize {
        size_bool(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_bool(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_bool(src)
    }
}

impl Scalar for DateTime {
    const ELEMENT_TYPE: ElementType = ElementType::DateTime;
    fn size(&self) -> usize {
        size_datetime(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_datetime(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_datetime(src)
    }
}

/// Null is zero-width.
impl Scalar for () {
    const ELEMENT_TYPE: ElementType = ElementType::Null;
    fn size(&self) -> usize {
        size_null()
    }
    fn encode(&self, _dst: &mut [u8]) {}
    fn decode(_src: &[u8]) -> Result<Self> {
        Ok(())
    }
}

impl Scalar for Regex {
    const ELEMENT_TYPE: ElementType = ElementType::Regex;
    fn size(&self) -> usize {
        size_regex(&self.pattern, &self.options)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_regex(dst, &self.pattern, &self.options);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        let (pattern, options) = decode_regex(src)?;
        Ok(Regex::new(pattern, options))
    }
}

impl Scalar for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::Int32;
    fn size(&self) -> usize {
        size_i32(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_i32(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_i32(src)
    }
}

impl Scalar for Timestamp {
    const ELEMENT_TYPE: ElementType = ElementType::Timestamp;
    fn size(&self) -> usize {
        size_timestamp(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_timestamp(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_timestamp(src)
    }
}

impl Scalar for i64 {
    const ELEMENT_TYPE: ElementType = ElementType::Int64;
    fn size(&self) -> usize {
        size_i64(*self)
    }
    fn encode(&self, dst: &mut [u8]) {
        encode_i64(dst, *self);
    }
    fn decode(src: &[u8]) -> Result<Self> {
        decode_i64(src)
    }
}
