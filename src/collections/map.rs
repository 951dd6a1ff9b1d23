//! Immutable hash map.

use super::set::Set;
use crate::core::mergeable::{merge_branches, merge_values, Mergeable};
use crate::core::trie::{self, hash_of, Trie};
use crate::error::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable map with structural sharing.
pub struct Map<K, V> {
    trie: Trie<K, V>,
}

/// One key whose value differs between two maps: `(key, (left, right))`.
pub type DiffEntry<K, V> = (K, (Option<V>, Option<V>));

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map {
            trie: self.trie.clone(),
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Map { trie: Trie::new() }
    }
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn iter(&self) -> trie::Iter<'_, K, V> {
        self.trie.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.trie.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.trie.values()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.trie.ptr_eq(&other.trie)
    }

    pub fn clear(&self) -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> Map<K, V> {
    pub fn of<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        entries.into_iter().collect()
    }

    fn with(&self, trie: Trie<K, V>) -> Self {
        Map { trie }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.trie.get(key)
    }

    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    pub fn get_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.trie.get_key_value(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.trie.contains_key(key)
    }

    pub fn put(&self, key: K, value: V) -> Self {
        self.with(self.trie.insert(key, value))
    }

    pub fn put_if_absent(&self, key: K, value: V) -> Self {
        if self.contains_key(&key) {
            return self.clone();
        }
        self.put(key, value)
    }

    /// Every entry of `other`, overriding bindings of `self`.
    pub fn put_all(&self, other: &Map<K, V>) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        let mut next = self.clone();
        next.extend(other.iter().map(|(k, v)| (k.clone(), v.clone())));
        next
    }

    pub fn remove_key<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.with(self.trie.remove(key))
    }

    pub fn remove_all_keys<'a, I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut next = self.clone();
        for k in keys {
            next.trie.remove_mut(k);
        }
        next
    }

    /// Rebind `key` from its current value; `None` removes it.
    pub fn compute<F>(&self, key: K, f: F) -> Self
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        match f(&key, self.get(&key)) {
            Some(v) => self.put(key, v),
            None => self.remove_key(&key),
        }
    }

    pub fn compute_if_absent<F>(&self, key: K, f: F) -> Self
    where
        F: FnOnce(&K) -> Option<V>,
    {
        if self.contains_key(&key) {
            return self.clone();
        }
        match f(&key) {
            Some(v) => self.put(key, v),
            None => self.clone(),
        }
    }

    pub fn compute_if_present<F>(&self, key: K, f: F) -> Self
    where
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let Some(old) = self.get(&key) else {
            return self.clone();
        };
        match f(&key, old) {
            Some(v) => self.put(key, v),
            None => self.remove_key(&key),
        }
    }

    /// Bind `value` when absent, otherwise `f(old, value)`; `None` removes.
    pub fn merge_value<F>(&self, key: K, value: V, f: F) -> Self
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        match self.get(&key) {
            None => self.put(key, value),
            Some(old) => match f(old, value) {
                Some(v) => self.put(key, v),
                None => self.remove_key(&key),
            },
        }
    }

    /// Bind `value` when absent, otherwise `merger(old, value)`.
    pub fn add_with<F>(&self, key: K, value: V, merger: F) -> Self
    where
        F: FnOnce(&V, V) -> V,
    {
        match self.get(&key) {
            None => self.put(key, value),
            Some(old) => {
                let merged = merger(old, value);
                self.put(key, merged)
            }
        }
    }

    /// When present, rebind to `merger(old, value)`; `None` removes.
    pub fn remove_with<F>(&self, key: K, value: V, merger: F) -> Self
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        match self.get(&key) {
            None => self.clone(),
            Some(old) => match merger(old, value) {
                Some(v) => self.put(key, v),
                None => self.remove_key(&key),
            },
        }
    }

    pub fn add_all_with<F>(&self, other: &Map<K, V>, merger: F) -> Self
    where
        F: Fn(&V, &V) -> V,
    {
        let mut next = self.clone();
        for (k, v) in other.iter() {
            let merged = match next.get(k) {
                None => v.clone(),
                Some(old) => merger(old, v),
            };
            next.trie.insert_mut(k.clone(), merged);
        }
        next
    }

    pub fn remove_all_with<F>(&self, other: &Map<K, V>, merger: F) -> Self
    where
        F: Fn(&V, &V) -> Option<V>,
    {
        let mut next = self.clone();
        for (k, v) in other.iter() {
            let Some(old) = next.get(k) else {
                continue;
            };
            match merger(old, v) {
                Some(merged) => next.trie.insert_mut(k.clone(), merged),
                None => next.trie.remove_mut(k),
            };
        }
        next
    }

    pub fn filter<KP, VP>(&self, mut key_pred: KP, mut value_pred: VP) -> Self
    where
        KP: FnMut(&K) -> bool,
        VP: FnMut(&V) -> bool,
    {
        self.with(self.trie.retain(|k, v| key_pred(k) && value_pred(v)))
    }

    /// Values bound to the keys in `keys`.
    pub fn get_all<'a>(&'a self, keys: &'a Set<K>) -> impl Iterator<Item = &'a V> + 'a {
        keys.iter().filter_map(move |k| self.get(k))
    }

    /// Keys bound differently in `self` and `other`, with both sides' values.
    pub fn diff(&self, other: &Map<K, V>) -> Vec<DiffEntry<K, V>> {
        let mut seen = FxHashSet::default();
        self.trie
            .changed_keys(&other.trie)
            .into_iter()
            .filter(|k| seen.insert(*k))
            .filter_map(|k| {
                let (l, r) = (self.get(k), other.get(k));
                (l != r).then(|| (k.clone(), (l.cloned(), r.cloned())))
            })
            .collect()
    }

    /// Adopt `other`'s structure when both hold the same entries.
    pub fn deduplicate(&mut self, other: &Map<K, V>) {
        if !self.ptr_eq(other) && *self == *other {
            *self = other.clone();
        }
    }

    /// Three-way merge with a caller-supplied resolver, invoked only for keys
    /// whose binding diverged in at least one branch. The resolver receives
    /// the base value and one entry per branch; `None` means absent.
    pub fn merge_with<F>(&self, branches: &[Self], mut resolve: F) -> Result<Self>
    where
        F: FnMut(&K, Option<&V>, &[Option<&V>]) -> Result<Option<V>>,
    {
        merge_branches(self, branches, |base, branches| {
            let mut result = base.clone();
            let mut seen = FxHashSet::default();
            for branch in branches {
                for k in base.trie.changed_keys(&branch.trie) {
                    if !seen.insert(k) {
                        continue;
                    }
                    let base_value = base.get(k);
                    let values: Vec<Option<&V>> = branches.iter().map(|b| b.get(k)).collect();
                    if values.iter().all(|v| *v == base_value) {
                        continue;
                    }
                    match resolve(k, base_value, &values)? {
                        Some(v) => result.trie.insert_mut(k.clone(), v),
                        None => result.trie.remove_mut(k),
                    };
                }
            }
            Ok(result)
        })
    }
}

impl<K, V> Map<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq + fmt::Debug,
{
    /// Three-way merge for plain values: a key may diverge in one branch only.
    pub fn merge_plain(&self, branches: &[Self]) -> Result<Self> {
        self.merge_with(branches, |_, base, values| {
            let values: Vec<Option<V>> = values.iter().map(|v| v.cloned()).collect();
            merge_values(&base.cloned(), &values)
        })
    }
}

/// Merge optional mergeable values; an absent side counts as the neutral value.
pub(crate) fn merge_optional<V: Mergeable>(
    base: Option<&V>,
    values: &[Option<&V>],
) -> Result<Option<V>> {
    let base: Option<V> = base.cloned();
    let values: Vec<Option<V>> = values.iter().map(|v| v.cloned()).collect();
    merge_branches(&base, &values, |base, values| {
        let seed = base
            .as_ref()
            .or_else(|| values.iter().flatten().next())
            .ok_or_else(|| Error::NotMergeable("no value on any side".to_string()))?;
        let neutral = seed.merger();
        let base = base.clone().unwrap_or_else(|| neutral.clone());
        let filled: Vec<V> = values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| neutral.clone()))
            .collect();
        base.merge(&filled).map(Some)
    })
}

impl<K: Hash + Eq + Clone, V: Mergeable> Mergeable for Map<K, V> {
    fn merger(&self) -> Self {
        Map::new()
    }

    fn merge(&self, branches: &[Self]) -> Result<Self> {
        self.merge_with(branches, |_, base, values| merge_optional(base, values))
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Map {
            trie: iter.into_iter().collect(),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> Extend<(K, V)> for Map<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.trie.insert_mut(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = trie::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.trie == other.trie
    }
}

impl<K: Hash + Eq + Clone, V: Clone + Eq> Eq for Map<K, V> {}

impl<K: Hash, V: Hash> Hash for Map<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        state.write_u64(
            self.iter()
                .fold(0u64, |acc, entry| acc.wrapping_add(hash_of(&entry))),
        );
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Serialize, V: Serialize> Serialize for Map<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de, K, V> Deserialize<'de> for Map<K, V>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        HashMap::<K, V>::deserialize(deserializer).map(Map::from_iter)
    }
}
