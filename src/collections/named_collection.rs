//! Ordered collection of uniquely named items

use crate::error::{CommonError, Result};
use std::collections::HashMap;

/// Item that carries its own name
pub trait Named {
    /// Name that identifies the item within a [`NamedCollection`]
    fn name(&self) -> &str;
}

/// Ordered list in which every item's name is unique (case-sensitive)
///
/// Lookups by name go through an index kept in sync with positions. Items are only
/// handed out by shared reference, since renaming one in place would desync the
/// index; use [`replace`](Self::replace) to swap an item for an updated copy.
#[derive(Debug, Clone)]
pub struct NamedCollection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for NamedCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Named> NamedCollection<T> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item`; fails if its name is already taken
    pub fn push(&mut self, item: T) -> Result<()> {
        let position = self.items.len();
        self.insert(position, item)
    }

    /// Insert `item` at `position`, shifting later items
    ///
    /// # Panics
    ///
    /// Panics if `position > len`, like `Vec::insert`.
    pub fn insert(&mut self, position: usize, item: T) -> Result<()> {
        if self.index.contains_key(item.name()) {
            return Err(CommonError::DuplicateName(item.name().to_string()));
        }
        self.items.insert(position, item);
        self.reindex_from(position);
        Ok(())
    }

    /// Swap in `item` for the item with the same name, keeping its position
    ///
    /// Returns the previous item, or `None` (and appends) if the name was free.
    pub fn replace(&mut self, item: T) -> Option<T> {
        match self.index.get(item.name()) {
            // Same name, so the index entry is still correct
            Some(&position) => Some(std::mem::replace(&mut self.items[position], item)),
            None => {
                self.index.insert(item.name().to_string(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    /// Item called `name`
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index_of(name).map(|position| &self.items[position])
    }

    /// Item at `position`
    pub fn get_index(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    /// Position of the item called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether an item called `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove and return the item called `name`
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let position = self.index.remove(name)?;
        let item = self.items.remove(position);
        self.reindex_from(position);
        Some(item)
    }

    /// Names in collection order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Named::name)
    }

    /// Items in collection order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Items in collection order, consuming the collection
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Rewrite index entries for every item at or after `start`
    fn reindex_from(&mut self, start: usize) {
        for (position, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.name().to_string(), position);
        }
    }
}

impl<T: Named> TryFrom<Vec<T>> for NamedCollection<T> {
    type Error = CommonError;

    fn try_from(items: Vec<T>) -> Result<Self> {
        let mut collection = Self::new();
        for item in items {
            collection.push(item)?;
        }
        Ok(collection)
    }
}

impl<'a, T: Named> IntoIterator for &'a NamedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Named> IntoIterator for NamedCollection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for NamedCollection<T> {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

/// Deserialized from a list; duplicate names are rejected
#[cfg(feature = "serde")]
impl<'de, T: Named + serde::Deserialize<'de>> serde::Deserialize<'de> for NamedCollection<T> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from(items).map_err(serde::de::Error::custom)
    }
}
