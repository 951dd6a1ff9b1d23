//! Immutable set of values identified by a qualifier.

use crate::core::mergeable::{merge_branches, merge_values, Mergeable};
use crate::core::trie::Trie;
use crate::error::Result;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Shared qualifier function of a [`QualifiedSet`].
pub type Qualifier<K, V> = Arc<dyn Fn(&V) -> K + Send + Sync>;

/// A set in which each value is identified by `qualifier(value)`; adding a
/// value replaces any member with the same qualifier.
pub struct QualifiedSet<K, V> {
    trie: Trie<K, V>,
    qualifier: Qualifier<K, V>,
}

impl<K, V> Clone for QualifiedSet<K, V> {
    fn clone(&self) -> Self {
        QualifiedSet {
            trie: self.trie.clone(),
            qualifier: Arc::clone(&self.qualifier),
        }
    }
}

impl<K, V> QualifiedSet<K, V> {
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.trie.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.trie.keys()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.trie.ptr_eq(&other.trie)
    }

    pub fn clear(&self) -> Self {
        QualifiedSet {
            trie: Trie::new(),
            qualifier: Arc::clone(&self.qualifier),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> QualifiedSet<K, V> {
    pub fn new<F>(qualifier: F) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
    {
        QualifiedSet {
            trie: Trie::new(),
            qualifier: Arc::new(qualifier),
        }
    }

    pub fn of<F, I>(qualifier: F, values: I) -> Self
    where
        F: Fn(&V) -> K + Send + Sync + 'static,
        I: IntoIterator<Item = V>,
    {
        let mut set = Self::new(qualifier);
        set.extend(values);
        set
    }

    pub fn qualify(&self, value: &V) -> K {
        (self.qualifier)(value)
    }

    fn with(&self, trie: Trie<K, V>) -> Self {
        QualifiedSet {
            trie,
            qualifier: Arc::clone(&self.qualifier),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.trie.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.trie.contains_key(key)
    }

    /// True when the member qualified like `value` equals `value`.
    pub fn contains(&self, value: &V) -> bool {
        self.get(&self.qualify(value)) == Some(value)
    }

    pub fn contains_all(&self, other: &QualifiedSet<K, V>) -> bool {
        other.iter().all(|v| self.contains(v))
    }

    pub fn add(&self, value: V) -> Self {
        let key = self.qualify(&value);
        self.with(self.trie.insert(key, value))
    }

    pub fn add_all(&self, other: &QualifiedSet<K, V>) -> Self {
        let mut next = self.clone();
        next.extend(other.iter().cloned());
        next
    }

    /// Remove the member qualified like `value`.
    pub fn remove(&self, value: &V) -> Self {
        self.remove_key(&self.qualify(value))
    }

    pub fn remove_key(&self, key: &K) -> Self {
        self.with(self.trie.remove(key))
    }

    pub fn remove_all<'a, I>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = &'a V>,
        V: 'a,
    {
        let mut next = self.clone();
        for v in values {
            let key = next.qualify(v);
            next.trie.remove_mut(&key);
        }
        next
    }

    pub fn filter(&self, mut pred: impl FnMut(&V) -> bool) -> Self {
        self.with(self.trie.retain(|_, v| pred(v)))
    }
}

impl<K, V> Mergeable for QualifiedSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq + fmt::Debug,
{
    fn merger(&self) -> Self {
        self.clear()
    }

    fn merge(&self, branches: &[Self]) -> Result<Self> {
        merge_branches(self, branches, |base, branches| {
            let mut result = base.clone();
            let mut seen = FxHashSet::default();
            for branch in branches {
                for k in base.trie.changed_keys(&branch.trie) {
                    if !seen.insert(k) {
                        continue;
                    }
                    let values: Vec<Option<V>> =
                        branches.iter().map(|b| b.get(k).cloned()).collect();
                    match merge_values(&base.get(k).cloned(), &values)? {
                        Some(v) => result.trie.insert_mut(k.clone(), v),
                        None => result.trie.remove_mut(k),
                    };
                }
            }
            Ok(result)
        })
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> PartialEq for QualifiedSet<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.trie == other.trie
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> Extend<V> for QualifiedSet<K, V> {
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for v in iter {
            let key = self.qualify(&v);
            self.trie.insert_mut(key, v);
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for QualifiedSet<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Set;

    #[derive(Debug, Clone, PartialEq)]
    struct O {
        k: String,
        v: String,
    }

    fn o(s: &str) -> O {
        O {
            k: format!("k{s}"),
            v: s.to_string(),
        }
    }

    fn qset(names: &[&str]) -> QualifiedSet<String, O> {
        QualifiedSet::of(|o: &O| o.k.clone(), names.iter().map(|n| o(n)))
    }

    #[test]
    fn test_duplicates_collapse_by_qualifier() {
        let q1 = qset(&["aap", "aap", "noot", "mies", "teun", "jet"]);
        let q2 = qset(&["aap", "aap", "noot", "mies", "teun", "jet", "jet", "jet"]);
        assert_eq!(q1.len(), 5);
        assert_eq!(q2.len(), 5);
        assert!(q1.contains_all(&q2));
        assert!(q2.contains_all(&q1));
        let values: Set<String> = q1.iter().map(|o| o.v.clone()).collect();
        assert_eq!(values.len(), 5);
        for obj in q2.iter() {
            assert!(values.contains(&obj.v));
        }
    }

    #[test]
    fn test_add_replaces_same_qualifier() {
        let q = qset(&["aap"]);
        let replaced = q.add(O {
            k: "kaap".to_string(),
            v: "other".to_string(),
        });
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced.get(&"kaap".to_string()).map(|o| o.v.as_str()), Some("other"));
        assert!(!replaced.contains(&o("aap")));
        assert!(replaced.contains_key(&"kaap".to_string()));
    }

    #[test]
    fn test_remove_by_value_and_key() {
        let q = qset(&["aap", "noot", "mies"]);
        assert_eq!(q.remove(&o("aap")).len(), 2);
        assert_eq!(q.remove_key(&"knoot".to_string()).len(), 2);
        assert_eq!(q.remove_all([o("aap"), o("mies")].iter()).len(), 1);
        assert!(q.remove_key(&"kzzz".to_string()).ptr_eq(&q));
    }

    #[test]
    fn test_add_all() {
        let q = qset(&["aap", "noot"]);
        let joined = q.add_all(&qset(&["noot", "mies"]));
        assert_eq!(joined.len(), 3);
        assert!(joined.contains(&o("mies")));
        assert!(q.add_all(&qset(&["aap"])).ptr_eq(&q));

        let other = QualifiedSet::of(
            |o: &O| o.k.clone(),
            [O {
                k: "kaap".to_string(),
                v: "replaced".to_string(),
            }],
        );
        let replaced = q.add_all(&other);
        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced.get(&"kaap".to_string()).map(|o| o.v.as_str()), Some("replaced"));
    }

    #[test]
    fn test_filter() {
        let q = qset(&["aap", "noot", "mies", "teun", "jet"]);
        let four = q.filter(|o| o.v.len() == 4);
        assert_eq!(four.len(), 3);
        assert!(four.contains_key(&"knoot".to_string()));
        assert!(!four.contains(&o("aap")));
        assert!(q.filter(|_| true).ptr_eq(&q));
        assert!(q.filter(|_| false).is_empty());
    }

    #[test]
    fn test_merge() {
        let base = qset(&["aap", "noot"]);
        let left = base.add(o("mies"));
        let right = base.remove(&o("noot"));
        let merged = base.merge2(&left, &right).unwrap();
        let mut keys: Vec<&String> = merged.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["kaap", "kmies"]);
    }
}
