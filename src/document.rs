// ABOUTME: Ordered BSON document and array containers.
// ABOUTME: Documents keep insertion order and allow duplicate names, as the wire format does.

use crate::oid::ObjectId;
use crate::value::Value;
use std::fmt;

/// An ordered sequence of named values.
///
/// Names are not required to be unique. Lookups return the first match;
/// encoding writes every entry in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Build a document from a key-unique mapping, ordered by ascending key.
    ///
    /// Hash maps have no stable iteration order; sorting makes the encoding
    /// deterministic.
    pub fn from_map<K, V, I>(map: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries: Vec<(String, Value)> = map
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// Append an entry. Existing entries with the same name are kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    /// The first value named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Every value named `name`, in document order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Remove and return the first value named `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Value::as_i32)
    }

    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn get_document(&self, name: &str) -> Option<&Document> {
        self.get(name).and_then(Value::as_document)
    }

    #[must_use]
    pub fn get_array(&self, name: &str) -> Option<&Array> {
        self.get(name).and_then(Value::as_array)
    }

    #[must_use]
    pub fn get_object_id(&self, name: &str) -> Option<ObjectId> {
        self.get(name).and_then(Value::as_object_id)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{}\": {v}", k.escape_default())?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(entry_ref as fn(&'a (String, Value)) -> (&'a str, &'a Value))
    }
}

fn entry_ref((k, v): &(String, Value)) -> (&str, &Value) {
    (k.as_str(), v)
}

/// An ordered list of values. On the wire an array is a document whose
/// names are the decimal indices "0", "1", ...
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    items: Vec<Value>,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }

    /// The equivalent document with synthetic index names.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut buf = itoa::Buffer::new();
        self.items
            .iter()
            .enumerate()
            .map(|(i, v)| (buf.format(i).to_owned(), v.clone()))
            .collect()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self { items }
    }
}

impl<T: Into<Value>> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<T: Into<Value>> Extend<T> for Array {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_duplicates_preserved() {
        let mut d = Document::new();
        d.insert("a", 1);
        d.insert("b", "x");
        d.insert("a", 2);
        assert_eq!(d.len(), 3);
        assert_eq!(d.get_i32("a"), Some(1));
        let all: Vec<_> = d.get_all("a").cloned().collect();
        assert_eq!(all, vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b", "a"]);

        assert_eq!(d.remove("a"), Some(Value::Int32(1)));
        assert_eq!(d.get_i32("a"), Some(2));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_typed_getters() {
        let mut inner = Document::new();
        inner.insert("x", true);
        let d: Document = vec![
            ("s", Value::from("hi")),
            ("i", Value::Int64(7)),
            ("f", Value::Double(1.5)),
            ("d", Value::Document(inner.clone())),
        ]
        .into_iter()
        .collect();
        assert_eq!(d.get_str("s"), Some("hi"));
        assert_eq!(d.get_i64("i"), Some(7));
        assert_eq!(d.get_i32("i"), None);
        assert_eq!(d.get_f64("f"), Some(1.5));
        assert_eq!(d.get_document("d"), Some(&inner));
        assert_eq!(d.get_bool("s"), None);
        assert!(d.contains_key("f"));
        assert!(!d.contains_key("zz"));
    }

    #[test]
    fn test_from_map_sorted() {
        let mut m = HashMap::new();
        m.insert("zeta", 1);
        m.insert("alpha", 2);
        m.insert("mid", 3);
        let d = Document::from_map(m);
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_get_mut() {
        let mut d = Document::new();
        d.insert("n", 1);
        *d.get_mut("n").unwrap() = Value::Int32(5);
        assert_eq!(d.get_i32("n"), Some(5));
    }

    #[test]
    fn test_array_to_document() {
        let a: Array = vec![Value::Int32(1), Value::from("two"), Value::Null]
            .into_iter()
            .collect();
        let d = a.to_document();
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["0", "1", "2"]);
        assert_eq!(d.get_str("1"), Some("two"));
    }

    #[test]
    fn test_display() {
        let mut d = Document::new();
        d.insert("a", 10);
        d.insert("b", Value::Array(vec![Value::Boolean(true)].into()));
        assert_eq!(d.to_string(), r#"{"a": 10, "b": [true]}"#);
    }
}
