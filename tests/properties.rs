// ABOUTME: Property-based tests for round-trips, framing, determinism and truncation.
// ABOUTME: Generates random documents and scalars with proptest.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

use serde_bson::{
    decode_document, encode_document, from_slice, scalar, to_vec, Array, Binary, BinarySubtype,
    DateTime, Document, ErrorKind, ObjectId, RawDocument, Regex, Timestamp, Value,
};

/// Strategy for element names: any string without NUL.
fn name_strategy() -> impl Strategy<Value = String> {
    "[^\\x00]{0,12}"
}

/// Strategy for cstring content (regex parts).
fn cstring_strategy() -> impl Strategy<Value = String> {
    "[a-z.*+^$]{0,8}"
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u64>().prop_map(|bits| Value::Double(f64::from_bits(bits))),
        any::<String>().prop_map(Value::String),
        (any::<u8>(), prop::collection::vec(any::<u8>(), 0..32)).prop_map(|(subtype, bytes)| {
            Value::Binary(Binary::new(BinarySubtype::from(subtype), bytes))
        }),
        any::<[u8; 12]>().prop_map(|b| Value::ObjectId(ObjectId::from_bytes(b))),
        any::<bool>().prop_map(Value::Boolean),
        any::<i64>().prop_map(|ms| Value::DateTime(DateTime::from_millis(ms))),
        Just(Value::Null),
        (cstring_strategy(), cstring_strategy()).prop_map(|(p, o)| Value::Regex(Regex::new(p, o))),
        any::<i32>().prop_map(Value::Int32),
        any::<u64>().prop_map(|v| Value::Timestamp(Timestamp::from_u64(v))),
        any::<i64>().prop_map(Value::Int64),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8)
                .prop_map(|items| Value::Array(items.into_iter().collect::<Array>())),
            prop::collection::vec((name_strategy(), inner), 0..8)
                .prop_map(|entries| Value::Document(entries.into_iter().collect())),
        ]
    })
}

fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec((name_strategy(), value_strategy()), 0..10)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    /// Every scalar survives an encode/decode round trip, doubles bit for bit.
    #[test]
    fn scalar_round_trip(value in scalar_strategy()) {
        let mut doc = Document::new();
        doc.insert("v", value.clone());
        let bytes = encode_document(&doc).unwrap();
        let back = decode_document(&bytes).unwrap();
        prop_assert_eq!(back.get("v"), Some(&value));
        if let (Some(Value::Double(a)), Value::Double(b)) = (back.get("v"), &value) {
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    /// Whole documents round-trip through both the tree decoder and serde.
    #[test]
    fn document_round_trip(doc in document_strategy()) {
        let bytes = encode_document(&doc).unwrap();
        prop_assert_eq!(&decode_document(&bytes).unwrap(), &doc);
        prop_assert_eq!(&from_slice::<Document>(&bytes).unwrap(), &doc);
        prop_assert_eq!(to_vec(&doc).unwrap(), bytes);
    }

    /// The length prefix always equals the encoded length.
    #[test]
    fn length_prefix_matches(doc in document_strategy()) {
        let bytes = encode_document(&doc).unwrap();
        let prefix = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        prop_assert_eq!(prefix, bytes.len());
        prop_assert_eq!(*bytes.last().unwrap(), 0u8);
    }

    /// Equal maps encode identically whatever their iteration order.
    #[test]
    fn map_encoding_is_deterministic(
        entries in prop::collection::vec((name_strategy(), any::<i64>()), 0..16)
    ) {
        let hashed: HashMap<String, i64> = entries.iter().cloned().collect();
        let sorted: BTreeMap<String, i64> = entries.into_iter().collect();
        let a = to_vec(&hashed).unwrap();
        let b = to_vec(&sorted).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a, to_vec(&hashed).unwrap());
    }

    /// Every proper prefix of a valid encoding is reported as short input.
    #[test]
    fn truncation_is_short_input(doc in document_strategy()) {
        let bytes = encode_document(&doc).unwrap();
        for len in 0..bytes.len() {
            let err = decode_document(&bytes[..len]).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::ShortInput, "prefix {}", len);
            let err = from_slice::<Document>(&bytes[..len]).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::ShortInput, "prefix {}", len);
        }
    }

    /// Wrapping encoded bytes as raw and encoding again reproduces them.
    #[test]
    fn raw_passthrough_is_idempotent(doc in document_strategy()) {
        let bytes = encode_document(&doc).unwrap();
        let raw = RawDocument::new(bytes.clone()).unwrap();
        prop_assert_eq!(raw.as_bytes(), &bytes[..]);

        let mut outer = Document::new();
        outer.insert("raw", raw);
        let mut expected = Document::new();
        expected.insert("raw", doc);
        prop_assert_eq!(encode_document(&outer).unwrap(), encode_document(&expected).unwrap());
    }

    /// Scalar encoders write exactly the bytes their size function reports.
    #[test]
    fn scalar_sizes_match(s in any::<String>(), n in any::<i64>()) {
        prop_assert_eq!(scalar::to_bytes(&s).len(), scalar::size_str(&s));
        prop_assert_eq!(scalar::to_bytes(&n).len(), scalar::size_i64(n));
        let encoded = scalar::to_bytes(&s);
        prop_assert_eq!(scalar::decode_str(&encoded).unwrap(), s.as_str());
    }

    /// Decoding arbitrary bytes returns an error or a document, never panics.
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_document(&bytes);
        let _ = from_slice::<Document>(&bytes);
        let _ = from_slice::<BTreeMap<String, Value>>(&bytes);
    }
}
