//! Map from a key to one or more values
//!
//! [`MultiMap`] keeps every value inserted under a key, in insertion order. A key is
//! present exactly as long as it has at least one value: removing the last value
//! removes the key.
//!
//! Values are stored inline for the common one-value-per-key case (`SmallVec`), so
//! a `MultiMap` used mostly as a plain map costs no extra allocation per key.

use smallvec::SmallVec;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map;
use std::hash::Hash;

/// Values of one key; one value lives inline
type Bucket<V> = SmallVec<[V; 1]>;

/// Multi-valued hash map
#[derive(Debug, Clone)]
pub struct MultiMap<K, V> {
    map: HashMap<K, Bucket<V>>,
    len: usize,
}

impl<K, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            len: 0,
        }
    }
}

impl<K: Eq + Hash, V> MultiMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            len: 0,
        }
    }

    /// Append `value` to the values of `key`
    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().push(value);
        self.len += 1;
    }

    /// All values of `key` in insertion order; empty if the key is absent
    pub fn get<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).map_or(&[][..], |bucket| bucket.as_slice())
    }

    /// First value inserted under `key`
    pub fn get_first<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).first()
    }

    /// Whether `key` has at least one value
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Whether `value` is among the values of `key`
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        self.get(key).contains(value)
    }

    /// Remove the first value of `key` equal to `value`
    ///
    /// Returns `false` if there was no such value. Removing the last value of a key
    /// removes the key.
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let Some(bucket) = self.map.get_mut(key) else {
            return false;
        };
        let Some(index) = bucket.iter().position(|v| v == value) else {
            return false;
        };

        bucket.remove(index);
        self.len -= 1;
        if bucket.is_empty() {
            self.map.remove(key);
        }
        true
    }

    /// Remove `key` and return all of its values (empty if absent)
    pub fn remove_all<Q>(&mut self, key: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let values = self
            .map
            .remove(key)
            .map(SmallVec::into_vec)
            .unwrap_or_default();
        self.len -= values.len();
        values
    }

    /// Keep only the pairs for which `keep` returns `true`
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut len = 0;
        self.map.retain(|key, bucket| {
            bucket.retain(|value| keep(key, value));
            len += bucket.len();
            !bucket.is_empty()
        });
        self.len = len;
    }

    /// Total number of values across all keys
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Whether the map holds no values
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.map.clear();
        self.len = 0;
    }

    /// Distinct keys in arbitrary order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// Every key with all of its values
    pub fn groups(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.map.iter().map(|(key, bucket)| (key, bucket.as_slice()))
    }

    /// Every `(key, value)` pair; values of one key are yielded in insertion order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            groups: self.map.iter(),
            current: None,
        }
    }
}

impl<K: Eq + Hash, V: PartialEq> PartialEq for MultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.map == other.map
    }
}

impl<K: Eq + Hash, V: Eq> Eq for MultiMap<K, V> {}

impl<K: Eq + Hash, V> Extend<(K, V)> for MultiMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for MultiMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

/// Iterator over the `(key, value)` pairs of a [`MultiMap`]
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    groups: hash_map::Iter<'a, K, Bucket<V>>,
    current: Option<(&'a K, std::slice::Iter<'a, V>)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = &mut self.current
                && let Some(value) = values.next()
            {
                return Some((*key, value));
            }
            let (key, bucket) = self.groups.next()?;
            self.current = Some((key, bucket.iter()));
        }
    }
}

impl<'a, K: Eq + Hash, V> IntoIterator for &'a MultiMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::MultiMap;
    use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, Serializer};
    use std::fmt;
    use std::hash::Hash;
    use std::marker::PhantomData;

    /// Serialized as a map from key to the list of its values
    impl<K, V> Serialize for MultiMap<K, V>
    where
        K: Serialize + Eq + Hash,
        V: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_map(self.groups())
        }
    }

    struct MultiMapVisitor<K, V>(PhantomData<fn() -> MultiMap<K, V>>);

    impl<'de, K, V> Visitor<'de> for MultiMapVisitor<K, V>
    where
        K: Deserialize<'de> + Eq + Hash,
        V: Deserialize<'de>,
    {
        type Value = MultiMap<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from keys to lists of values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = MultiMap::with_capacity(access.size_hint().unwrap_or(0).min(4096));
            // A key listed twice keeps both lists, in document order; empty lists
            // add nothing, so no key ends up with an empty bucket
            while let Some((key, values)) = access.next_entry::<K, Vec<V>>()? {
                if values.is_empty() {
                    continue;
                }
                map.len += values.len();
                map.map.entry(key).or_default().extend(values);
            }
            Ok(map)
        }
    }

    /// Values arrive grouped by key
    impl<'de, K, V> Deserialize<'de> for MultiMap<K, V>
    where
        K: Deserialize<'de> + Eq + Hash,
        V: Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(MultiMapVisitor(PhantomData))
        }
    }
}
