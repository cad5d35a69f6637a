//! Entry keys and key sets.
//!
//! A [`Key`] is any host-comparable structured value: a number, a piece of
//! text, or an ordered sequence of keys. Keys carry the host engine's total
//! order (numbers sort before text, text before sequences, and values of the
//! same kind compare naturally), so cursor iteration is always ascending.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A structured entry key.
///
/// Keys compare with a total order: `Number < Text < Sequence`, numbers by
/// [`f64::total_cmp`], text lexicographically, sequences element-wise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// A numeric key. Positional indices from bulk writes land here.
    Number(f64),
    /// A text key. Field names from bulk writes land here.
    Text(String),
    /// An ordered sequence of keys.
    Sequence(Vec<Key>),
}

impl Key {
    /// Cross-kind ordering rank.
    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Text(_) => 1,
            Key::Sequence(_) => 2,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::Text(a), Key::Text(b)) => a.cmp(b),
            (Key::Sequence(a), Key::Sequence(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Key::Text(s) => write!(f, "{}", s),
            Key::Sequence(keys) => {
                write!(f, "[")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", key)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key::Number(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Number(value as f64)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Number(value as f64)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Number(value as f64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Number(value as f64)
    }
}

impl From<Vec<Key>> for Key {
    fn from(value: Vec<Key>) -> Self {
        Key::Sequence(value)
    }
}

/// A set of keys, normalized from "a single key or a sequence of keys".
///
/// Bulk reads and deletes accept anything convertible into a `KeySet`, so a
/// caller can pass one key, a vector, or a slice without ceremony.
#[derive(Debug, Clone, Default)]
pub struct KeySet(Vec<Key>);

impl KeySet {
    /// Create an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set contains the given key.
    pub fn contains(&self, key: &Key) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The keys in the set, in the order given.
    pub fn keys(&self) -> &[Key] {
        &self.0
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        KeySet(vec![key])
    }
}

impl From<Vec<Key>> for KeySet {
    fn from(keys: Vec<Key>) -> Self {
        KeySet(keys)
    }
}

impl From<&[Key]> for KeySet {
    fn from(keys: &[Key]) -> Self {
        KeySet(keys.to_vec())
    }
}

impl From<&str> for KeySet {
    fn from(key: &str) -> Self {
        KeySet(vec![Key::from(key)])
    }
}

impl From<Vec<&str>> for KeySet {
    fn from(keys: Vec<&str>) -> Self {
        KeySet(keys.into_iter().map(Key::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeySet {
    fn from(keys: [&str; N]) -> Self {
        KeySet(keys.into_iter().map(Key::from).collect())
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        KeySet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn test_numbers_sort_before_text() {
        assert!(Key::from(99) < Key::from("a"));
        assert!(Key::from("zzz") < Key::Sequence(vec![Key::from(0)]));
    }

    #[test]
    fn test_number_ordering() {
        assert!(Key::from(1) < Key::from(2));
        assert!(Key::from(-1.5) < Key::from(0));
        assert_eq!(Key::from(3), Key::Number(3.0));
    }

    #[test]
    fn test_text_ordering_is_lexicographic() {
        assert!(Key::from("apple") < Key::from("banana"));
        assert!(Key::from("a") < Key::from("ab"));
    }

    #[test]
    fn test_sequence_ordering_is_elementwise() {
        let a = Key::Sequence(vec![Key::from(1), Key::from("x")]);
        let b = Key::Sequence(vec![Key::from(1), Key::from("y")]);
        let c = Key::Sequence(vec![Key::from(2)]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::from(3).to_string(), "3");
        assert_eq!(Key::from(2.5).to_string(), "2.5");
        assert_eq!(Key::from("id").to_string(), "id");
        assert_eq!(
            Key::Sequence(vec![Key::from(1), Key::from("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_serde_untagged_roundtrip() {
        let key = Key::Sequence(vec![Key::from(7), Key::from("seven")]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"[7.0,"seven"]"#);
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_keyset_from_single_key() {
        let set = KeySet::from(Key::from("only"));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&Key::from("only")));
        assert!(!set.contains(&Key::from("other")));
    }

    #[test]
    fn test_keyset_from_sequence() {
        let set = KeySet::from(vec!["a", "c"]);
        assert!(set.contains(&Key::from("a")));
        assert!(!set.contains(&Key::from("b")));
        assert!(set.contains(&Key::from("c")));
    }

    fn arb_key() -> impl Strategy<Value = Key> {
        let leaf = prop_oneof![
            (-1.0e12..1.0e12f64).prop_map(Key::Number),
            "[a-z]{0,8}".prop_map(Key::Text),
        ];
        leaf.prop_recursive(2, 16, 4, |inner| {
            vec(inner, 0..4).prop_map(Key::Sequence)
        })
    }

    proptest! {
        #[test]
        fn prop_ordering_is_total_and_consistent(a in arb_key(), b in arb_key()) {
            match a.cmp(&b) {
                Ordering::Less => {
                    prop_assert_eq!(b.cmp(&a), Ordering::Greater);
                    prop_assert!(a != b);
                }
                Ordering::Greater => {
                    prop_assert_eq!(b.cmp(&a), Ordering::Less);
                    prop_assert!(a != b);
                }
                Ordering::Equal => prop_assert!(a == b),
            }
        }

        #[test]
        fn prop_equality_is_reflexive(a in arb_key()) {
            prop_assert!(a == a.clone());
        }

        #[test]
        fn prop_serde_roundtrip(a in arb_key()) {
            let json = serde_json::to_string(&a).unwrap();
            let back: Key = serde_json::from_str(&json).unwrap();
            prop_assert!(back == a);
        }
    }
}
