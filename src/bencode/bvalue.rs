use std::collections::HashMap;
use std::ops::Range;

use bytes::Bytes;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq)]
pub enum BValue {
    ByteString(Vec<u8>), // raw bytes, not necessarily UTF-8
    Integer(i64),
    List(Vec<BValue>),
    Dict(Dictionary),
}

impl BValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BValue::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the byte string as `&str` when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[BValue]> {
        match self {
            BValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            BValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Short name of the variant, used in logs and dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            BValue::ByteString(_) => "string",
            BValue::Integer(_) => "integer",
            BValue::List(_) => "list",
            BValue::Dict(_) => "dict",
        }
    }
}

impl From<i64> for BValue {
    fn from(i: i64) -> Self {
        BValue::Integer(i)
    }
}

impl From<&str> for BValue {
    fn from(s: &str) -> Self {
        BValue::ByteString(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for BValue {
    fn from(b: Vec<u8>) -> Self {
        BValue::ByteString(b)
    }
}

impl From<Vec<BValue>> for BValue {
    fn from(items: Vec<BValue>) -> Self {
        BValue::List(items)
    }
}

impl From<Dictionary> for BValue {
    fn from(d: Dictionary) -> Self {
        BValue::Dict(d)
    }
}

/// A bencode dictionary.
///
/// Entries are kept in the order they appeared in the input; the hash index is
/// only used for lookup. When a key repeats, the first occurrence wins.
///
/// A dictionary produced by the decoder also remembers where it sat in the
/// input and holds a shared handle to that input, so [`Dictionary::raw`] can
/// hand back its exact original encoding. The handle is reference counted:
/// the buffer lives as long as any dictionary (or slice of it) does.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, BValue)>,
    index: HashMap<Vec<u8>, usize>,
    source: Bytes,
    span: Range<usize>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_source(source: Bytes, start: usize) -> Self {
        Self {
            source,
            span: start..start,
            ..Self::default()
        }
    }

    pub(crate) fn set_end(&mut self, end: usize) {
        self.span.end = end;
    }

    /// Inserts `value` under `key` unless the key is already present.
    ///
    /// Returns `false` if the key existed; the stored value is left untouched.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: BValue) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    pub fn get(&self, key: &[u8]) -> Option<&BValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    pub fn get_integer(&self, key: &[u8]) -> Option<i64> {
        self.get(key).and_then(BValue::as_integer)
    }

    pub fn get_bytes(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).and_then(BValue::as_bytes)
    }

    pub fn get_list(&self, key: &[u8]) -> Option<&[BValue]> {
        self.get(key).and_then(BValue::as_list)
    }

    pub fn get_dict(&self, key: &[u8]) -> Option<&Dictionary> {
        self.get(key).and_then(BValue::as_dict)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &BValue)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(k, _)| k.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte range this dictionary occupied in the decoded input.
    ///
    /// Empty for dictionaries that were built by hand.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// The verbatim input bytes this dictionary was decoded from.
    pub fn raw(&self) -> Bytes {
        if self.span.is_empty() {
            return Bytes::new();
        }
        self.source.slice(self.span.clone())
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl IntoIterator for Dictionary {
    type Item = (Vec<u8>, BValue);
    type IntoIter = std::vec::IntoIter<(Vec<u8>, BValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, BValue)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, BValue)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_duplicate() {
        let mut dict = Dictionary::new();
        assert!(dict.insert("a", BValue::Integer(1)));
        assert!(!dict.insert("a", BValue::Integer(2)));
        assert_eq!(dict.get_integer(b"a"), Some(1));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let dict: Dictionary = vec![
            ("zeta", BValue::Integer(1)),
            ("alpha", BValue::Integer(2)),
            ("mid", BValue::Integer(3)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<&[u8]> = dict.keys().collect();
        assert_eq!(keys, vec![&b"zeta"[..], &b"alpha"[..], &b"mid"[..]]);
    }

    #[test]
    fn test_typed_accessors() {
        let value = BValue::from("hello");
        assert_eq!(value.as_str(), Some("hello"));
        assert_eq!(value.as_integer(), None);
        assert_eq!(value.kind(), "string");

        let invalid = BValue::ByteString(vec![0xff, 0xfe]);
        assert_eq!(invalid.as_str(), None);
        assert_eq!(invalid.as_bytes(), Some(&[0xff, 0xfe][..]));
    }

    #[test]
    fn test_hand_built_dict_has_no_raw_bytes() {
        let mut dict = Dictionary::new();
        dict.insert("k", BValue::Integer(0));
        assert!(dict.raw().is_empty());
        assert_eq!(dict.span(), 0..0);
    }
}
