// Copyright (C) 2020-2025  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{collections::HashMap, fmt};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap as _,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// An insertion-ordered mapping from parameter name to parameter value.
///
/// Keys are unique. Inserting a key which is already present replaces its value but keeps its
/// position, so the emission order of a set only depends on the order in which keys were first
/// added.
///
/// The order is irrelevant to signing, which always works over the keys sorted in ascending
/// byte-wise order (see [`canonical_payload`][crate::canonical_payload]).
#[derive(Clone, Default)]
pub struct ParameterSet {
    entries: Vec<(String, String)>,
    // Position of each key in `entries`.
    index: HashMap<String, usize>,
}

impl ParameterSet {
    /// Create an empty [`ParameterSet`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty [`ParameterSet`] with room for `capacity` parameters.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a parameter, returning the previous value if the key was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();

        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert a parameter only if its value is not empty.
    ///
    /// Returns `true` if the parameter was inserted.
    pub fn insert_non_empty(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }

        self.insert(key, value);
        true
    }

    /// Returns the value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        let index = self.position(key)?;
        Some(self.entries[index].1.as_str())
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Remove `key` from the set, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.index.remove(key)?;
        let (_, value) = self.entries.remove(index);
        for (key, _) in &self.entries[index..] {
            if let Some(position) = self.index.get_mut(key) {
                *position -= 1;
            }
        }
        Some(value)
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set has no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterate over the parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Returns the parameters sorted by key in ascending byte-wise order.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_unstable_by_key(|&(key, _)| key);
        sorted
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ParameterSet {}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ParameterSet::new();
        params.extend(iter);
        params
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParameterSetVisitor;

        impl<'de> Visitor<'de> for ParameterSetVisitor {
            type Value = ParameterSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map of string parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params = ParameterSet::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    params.insert(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParameterSetVisitor)
    }
}
