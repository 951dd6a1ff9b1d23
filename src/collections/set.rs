//! Immutable hash set.

use crate::core::mergeable::{merge_branches, Mergeable};
use crate::core::trie::{self, hash_of, Trie};
use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable set. Every update returns a new version sharing structure
/// with the old one; an update that changes nothing returns the receiver's
/// own structure (`ptr_eq`).
pub struct Set<T> {
    trie: Trie<T, ()>,
}

impl<T> Clone for Set<T> {
    fn clone(&self) -> Self {
        Set {
            trie: self.trie.clone(),
        }
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Set { trie: Trie::new() }
    }
}

impl<T> Set<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter(self.trie.iter())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.trie.ptr_eq(&other.trie)
    }

    pub fn clear(&self) -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> Set<T> {
    pub fn of<I: IntoIterator<Item = T>>(elements: I) -> Self {
        elements.into_iter().collect()
    }

    pub fn contains<Q>(&self, e: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.trie.contains_key(e)
    }

    pub fn contains_all(&self, other: &Set<T>) -> bool {
        other.len() <= self.len() && other.iter().all(|e| self.contains(e))
    }

    pub fn add(&self, e: T) -> Self {
        Set {
            trie: self.trie.insert(e, ()),
        }
    }

    pub fn remove<Q>(&self, e: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Set {
            trie: self.trie.remove(e),
        }
    }

    /// Union.
    pub fn add_all(&self, other: &Set<T>) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        let mut next = self.clone();
        next.extend(other.iter().cloned());
        next
    }

    /// Difference.
    pub fn remove_all(&self, other: &Set<T>) -> Self {
        let mut next = self.clone();
        for e in other.iter() {
            next.trie.remove_mut(e);
        }
        next
    }

    /// Intersection.
    pub fn retain_all(&self, other: &Set<T>) -> Self {
        self.filter(|e| other.contains(e))
    }

    /// Symmetric difference.
    pub fn exclusive_all(&self, other: &Set<T>) -> Self {
        let mut next = self.clone();
        for e in other.iter() {
            if !next.trie.remove_mut(e) {
                next.trie.insert_mut(e.clone(), ());
            }
        }
        next
    }

    /// Swap `pre` for `post` when `pre` is a member.
    pub fn replace<Q>(&self, pre: &Q, post: T) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.contains(pre) || Borrow::<Q>::borrow(&post) == pre {
            return self.clone();
        }
        self.remove(pre).add(post)
    }

    pub fn filter(&self, mut pred: impl FnMut(&T) -> bool) -> Self {
        Set {
            trie: self.trie.retain(|e, _| pred(e)),
        }
    }

    /// Split the difference with `other`: `(only in self, only in other)`.
    pub fn compare(&self, other: &Set<T>) -> (Set<T>, Set<T>) {
        let mut left = Set::new();
        let mut right = Set::new();
        for e in self.trie.changed_keys(&other.trie) {
            match (self.contains(e), other.contains(e)) {
                (true, false) => {
                    left.trie.insert_mut(e.clone(), ());
                }
                (false, true) => {
                    right.trie.insert_mut(e.clone(), ());
                }
                _ => {}
            }
        }
        (left, right)
    }

    /// Adopt `other`'s structure when both hold the same elements.
    pub fn deduplicate(&mut self, other: &Set<T>) {
        if !self.ptr_eq(other) && *self == *other {
            *self = other.clone();
        }
    }
}

impl<T: Hash + Eq + Clone> Mergeable for Set<T> {
    fn merger(&self) -> Self {
        Set::new()
    }

    fn merge(&self, branches: &[Self]) -> Result<Self> {
        merge_branches(self, branches, |base, branches| {
            let mut result = base.clone();
            for branch in branches {
                for e in base.trie.changed_keys(&branch.trie) {
                    match (base.contains(e), branch.contains(e)) {
                        (false, true) => {
                            result.trie.insert_mut(e.clone(), ());
                        }
                        (true, false) => {
                            result.trie.remove_mut(e);
                        }
                        _ => {}
                    }
                }
            }
            Ok(result)
        })
    }
}

pub struct Iter<'a, T>(trie::Iter<'a, T, ()>);

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Set {
            trie: iter.into_iter().map(|e| (e, ())).collect(),
        }
    }
}

impl<T: Hash + Eq + Clone> Extend<T> for Set<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for e in iter {
            self.trie.insert_mut(e, ());
        }
    }
}

impl<T: Hash + Eq + Clone> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.trie == other.trie
    }
}

impl<T: Hash + Eq + Clone> Eq for Set<T> {}

impl<T: Hash> Hash for Set<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        state.write_u64(self.iter().fold(0u64, |acc, e| acc.wrapping_add(hash_of(e))));
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Serialize> Serialize for Set<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T> Deserialize<'de> for Set<T>
where
    T: Deserialize<'de> + Hash + Eq + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Set::from_iter)
    }
}
