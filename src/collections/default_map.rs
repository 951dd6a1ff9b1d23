//! Immutable map with a default function for absent keys.

use crate::core::mergeable::{merge_branches, merge_values, Mergeable};
use crate::core::trie::{self, Trie};
use crate::error::Result;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Shared default function of a [`DefaultMap`].
pub type DefaultFn<K, V> = Arc<dyn Fn(&K) -> V + Send + Sync>;

/// A map whose lookups fall back to a default function.
///
/// A binding equal to its key's default is never stored: putting the default
/// value removes the key, so `len` counts only the non-default keys.
pub struct DefaultMap<K, V> {
    trie: Trie<K, V>,
    default: DefaultFn<K, V>,
}

impl<K, V> Clone for DefaultMap<K, V> {
    fn clone(&self) -> Self {
        DefaultMap {
            trie: self.trie.clone(),
            default: Arc::clone(&self.default),
        }
    }
}

impl<K, V> DefaultMap<K, V> {
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

    pub fn default_fn(&self) -> &DefaultFn<K, V> {
        &self.default
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.trie.ptr_eq(&other.trie) && Arc::ptr_eq(&self.default, &other.default)
    }

    /// Empty map with the same default function.
    pub fn clear(&self) -> Self {
        DefaultMap {
            trie: Trie::new(),
            default: Arc::clone(&self.default),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> DefaultMap<K, V> {
    pub fn new<F>(default: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self::with_default(Arc::new(default))
    }

    pub fn with_default(default: DefaultFn<K, V>) -> Self {
        DefaultMap {
            trie: Trie::new(),
            default,
        }
    }

    fn with(&self, trie: Trie<K, V>) -> Self {
        DefaultMap {
            trie,
            default: Arc::clone(&self.default),
        }
    }

    pub fn default_of(&self, key: &K) -> V {
        (self.default)(key)
    }

    /// The stored value, or the key's default.
    pub fn get(&self, key: &K) -> V {
        match self.trie.get(key) {
            Some(v) => v.clone(),
            None => self.default_of(key),
        }
    }

    /// The stored binding only.
    pub fn get_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.trie.get_key_value(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.trie.contains_key(key)
    }

    pub fn put(&self, key: K, value: V) -> Self {
        if value == self.default_of(&key) {
            return self.remove_key(&key);
        }
        self.with(self.trie.insert(key, value))
    }

    pub fn put_all(&self, other: &DefaultMap<K, V>) -> Self {
        let mut next = self.clone();
        for (k, v) in other.iter() {
            next.put_mut(k.clone(), v.clone());
        }
        next
    }

    fn put_mut(&mut self, key: K, value: V) {
        if value == self.default_of(&key) {
            self.trie.remove_mut(&key);
        } else {
            self.trie.insert_mut(key, value);
        }
    }

    pub fn remove_key(&self, key: &K) -> Self {
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

    /// Bind `value` when no value is stored, otherwise `merger(old, value)`.
    pub fn add_with<F>(&self, key: K, value: V, merger: F) -> Self
    where
        F: FnOnce(&V, V) -> V,
    {
        match self.trie.get(&key) {
            None => self.put(key, value),
            Some(old) => {
                let merged = merger(old, value);
                self.put(key, merged)
            }
        }
    }

    /// When a value is stored, rebind to `merger(old, value)`; `None` removes.
    pub fn remove_with<F>(&self, key: K, value: V, merger: F) -> Self
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        match self.trie.get(&key) {
            None => self.clone(),
            Some(old) => match merger(old, value) {
                Some(v) => self.put(key, v),
                None => self.remove_key(&key),
            },
        }
    }

    pub fn filter<KP, VP>(&self, mut key_pred: KP, mut value_pred: VP) -> Self
    where
        KP: FnMut(&K) -> bool,
        VP: FnMut(&V) -> bool,
    {
        self.with(self.trie.retain(|k, v| key_pred(k) && value_pred(v)))
    }

    /// Keys looked up differently in `self` and `other`, with both lookups.
    pub fn diff(&self, other: &DefaultMap<K, V>) -> Vec<(K, (V, V))> {
        let mut seen = FxHashSet::default();
        self.trie
            .changed_keys(&other.trie)
            .into_iter()
            .filter(|k| seen.insert(*k))
            .filter_map(|k| {
                let (l, r) = (self.get(k), other.get(k));
                (l != r).then(|| (k.clone(), (l, r)))
            })
            .collect()
    }

    /// Three-way merge; absent bindings enter the resolver as the key's
    /// default, and a result equal to the default drops the key.
    pub fn merge_by<F>(&self, branches: &[Self], mut resolve: F) -> Result<Self>
    where
        F: FnMut(&V, &[V]) -> Result<V>,
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
                    let values: Vec<V> = branches.iter().map(|b| b.get(k)).collect();
                    let merged = merge_branches(&base_value, &values, &mut resolve)?;
                    result.put_mut(k.clone(), merged);
                }
            }
            Ok(result)
        })
    }
}

impl<K, V> DefaultMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq + fmt::Debug,
{
    pub fn merge_plain(&self, branches: &[Self]) -> Result<Self> {
        self.merge_by(branches, |base, values| merge_values(base, values))
    }
}

impl<K: Hash + Eq + Clone, V: Mergeable> Mergeable for DefaultMap<K, V> {
    fn merger(&self) -> Self {
        self.clear()
    }

    fn merge(&self, branches: &[Self]) -> Result<Self> {
        self.merge_by(branches, |base, values| base.merge(values))
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> PartialEq for DefaultMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.default, &other.default) && self.trie == other.trie
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> Extend<(K, V)> for DefaultMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put_mut(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a DefaultMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = trie::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DefaultMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
