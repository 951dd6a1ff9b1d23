//! Persistent hash array mapped trie.
//!
//! Every level consumes 5 bits of a 64-bit `FxHasher` hash. Nodes are shared
//! through `Arc`; an update copies only the root-to-slot path (`Arc::make_mut`
//! clones a node only when another version still holds it). Keys whose full
//! hashes collide end up in a collision bucket below the last level.
//!
//! Shape is canonical: a non-root branch never holds a lone leaf, so two tries
//! with the same contents have the same structure regardless of history.

use rustc_hash::FxHasher;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const BITS: u32 = 5;
const MASK: u64 = (1 << BITS) - 1;
const HASH_BITS: u32 = 64;

/// Hash a key the way the trie does.
pub fn hash_of<Q: Hash + ?Sized>(key: &Q) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

fn bit_for(hash: u64, shift: u32) -> u32 {
    1u32 << ((hash >> shift) & MASK)
}

fn index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

#[derive(Clone)]
enum Slot<K, V> {
    Leaf { hash: u64, key: K, value: V },
    Sub(Arc<Node<K, V>>),
}

#[derive(Clone)]
enum Node<K, V> {
    Branch { bitmap: u32, slots: Vec<Slot<K, V>> },
    Collision { hash: u64, pairs: Vec<(K, V)> },
}

/// Result of removing a key from a subtree.
enum Shrink<K, V> {
    Keep,
    Empty,
    Leaf(u64, K, V),
}

impl<K, V> Node<K, V> {
    fn single(hash: u64, key: K, value: V) -> Self {
        Node::Branch {
            bitmap: bit_for(hash, 0),
            slots: vec![Slot::Leaf { hash, key, value }],
        }
    }

    fn pair(shift: u32, a: (u64, K, V), b: (u64, K, V)) -> Self {
        if shift >= HASH_BITS {
            return Node::Collision {
                hash: a.0,
                pairs: vec![(a.1, a.2), (b.1, b.2)],
            };
        }
        let fa = bit_for(a.0, shift);
        let fb = bit_for(b.0, shift);
        if fa == fb {
            return Node::Branch {
                bitmap: fa,
                slots: vec![Slot::Sub(Arc::new(Node::pair(shift + BITS, a, b)))],
            };
        }
        let (first, second) = if fa < fb { (a, b) } else { (b, a) };
        Node::Branch {
            bitmap: fa | fb,
            slots: vec![
                Slot::Leaf {
                    hash: first.0,
                    key: first.1,
                    value: first.2,
                },
                Slot::Leaf {
                    hash: second.0,
                    key: second.1,
                    value: second.2,
                },
            ],
        }
    }
}

/// An immutable hash map from `K` to `V` with structural sharing.
pub struct Trie<K, V> {
    root: Option<Arc<Node<K, V>>>,
    len: usize,
}

impl<K, V> Clone for Trie<K, V> {
    fn clone(&self) -> Self {
        Trie {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<K, V> Default for Trie<K, V> {
    fn default() -> Self {
        Trie { root: None, len: 0 }
    }
}

impl<K, V> Trie<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when both tries are the very same version (shared root).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut stack = Vec::new();
        let mut pairs: &[(K, V)] = &[];
        match self.root.as_deref() {
            Some(Node::Branch { slots, .. }) => stack.push(slots.iter()),
            Some(Node::Collision { pairs: p, .. }) => pairs = p,
            None => {}
        }
        Iter {
            stack,
            pairs: pairs.iter(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> Trie<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_of(key);
        let mut node = self.root.as_deref()?;
        let mut shift = 0;
        loop {
            match node {
                Node::Branch { bitmap, slots } => {
                    let bit = bit_for(hash, shift);
                    if bitmap & bit == 0 {
                        return None;
                    }
                    match &slots[index(*bitmap, bit)] {
                        Slot::Leaf {
                            hash: h,
                            key: k,
                            value: v,
                        } => {
                            return (*h == hash && k.borrow() == key).then_some((k, v));
                        }
                        Slot::Sub(child) => {
                            node = child;
                            shift += BITS;
                        }
                    }
                }
                Node::Collision { pairs, .. } => {
                    return pairs
                        .iter()
                        .find(|(k, _)| k.borrow() == key)
                        .map(|(k, v)| (k, v));
                }
            }
        }
    }

    /// Return a version with `key` bound to `value`. Shares the receiver when
    /// the binding already exists with an equal value.
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut next = self.clone();
        next.insert_mut(key, value);
        next
    }

    /// Return a version without `key`. Shares the receiver when the key is absent.
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut next = self.clone();
        next.remove_mut(key);
        next
    }

    /// In-place insert; copies only nodes shared with other versions.
    /// Returns whether anything changed.
    pub fn insert_mut(&mut self, key: K, value: V) -> bool {
        if self.get(&key) == Some(&value) {
            return false;
        }
        let hash = hash_of(&key);
        let added = match &mut self.root {
            Some(root) => insert_into(root, 0, hash, key, value),
            None => {
                self.root = Some(Arc::new(Node::single(hash, key, value)));
                true
            }
        };
        if added {
            self.len += 1;
        }
        true
    }

    /// In-place remove. Returns whether the key was present.
    pub fn remove_mut<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.contains_key(key) {
            return false;
        }
        let hash = hash_of(key);
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        match remove_from(root, 0, hash, key) {
            Shrink::Keep => {}
            Shrink::Empty => self.root = None,
            Shrink::Leaf(h, k, v) => self.root = Some(Arc::new(Node::single(h, k, v))),
        }
        self.len -= 1;
        true
    }

    /// Keep only the entries matching `pred`. Shares the receiver when all match.
    pub fn retain(&self, mut pred: impl FnMut(&K, &V) -> bool) -> Self {
        let mut next = self.clone();
        for (k, v) in self.iter() {
            if !pred(k, v) {
                next.remove_mut(k);
            }
        }
        next
    }

    /// Keys whose binding may differ between the two versions.
    ///
    /// Subtrees shared by both sides are skipped without being visited, so the
    /// cost is proportional to the size of the change. The result is a
    /// superset: callers compare the bindings of each returned key.
    pub fn changed_keys<'a>(&'a self, other: &'a Self) -> Vec<&'a K> {
        let mut out = Vec::new();
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => diff_nodes(a, b, &mut out),
            (Some(a), None) => collect_node(a, &mut out),
            (None, Some(b)) => collect_node(b, &mut out),
            (None, None) => {}
        }
        out
    }
}

fn insert_into<K: Eq + Clone, V: Clone>(
    node: &mut Arc<Node<K, V>>,
    shift: u32,
    hash: u64,
    key: K,
    value: V,
) -> bool {
    match Arc::make_mut(node) {
        Node::Branch { bitmap, slots } => {
            let bit = bit_for(hash, shift);
            let idx = index(*bitmap, bit);
            if *bitmap & bit == 0 {
                slots.insert(idx, Slot::Leaf { hash, key, value });
                *bitmap |= bit;
                return true;
            }
            let slot = &mut slots[idx];
            match slot {
                Slot::Sub(child) => insert_into(child, shift + BITS, hash, key, value),
                Slot::Leaf { key: k, value: v, .. } if *k == key => {
                    *v = value;
                    false
                }
                Slot::Leaf {
                    hash: h,
                    key: k,
                    value: v,
                } => {
                    let existing = (*h, k.clone(), v.clone());
                    let sub = Node::pair(shift + BITS, existing, (hash, key, value));
                    *slot = Slot::Sub(Arc::new(sub));
                    true
                }
            }
        }
        Node::Collision { pairs, .. } => match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => {
                *v = value;
                false
            }
            None => {
                pairs.push((key, value));
                true
            }
        },
    }
}

fn remove_from<K, V, Q>(node: &mut Arc<Node<K, V>>, shift: u32, hash: u64, key: &Q) -> Shrink<K, V>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: Eq + ?Sized,
{
    match Arc::make_mut(node) {
        Node::Branch { bitmap, slots } => {
            let bit = bit_for(hash, shift);
            let idx = index(*bitmap, bit);
            let outcome = match &mut slots[idx] {
                Slot::Leaf { .. } => Shrink::Empty,
                Slot::Sub(child) => remove_from(child, shift + BITS, hash, key),
            };
            match outcome {
                Shrink::Keep => return Shrink::Keep,
                Shrink::Empty => {
                    slots.remove(idx);
                    *bitmap &= !bit;
                }
                Shrink::Leaf(h, k, v) => {
                    slots[idx] = Slot::Leaf {
                        hash: h,
                        key: k,
                        value: v,
                    }
                }
            }
            if slots.is_empty() {
                Shrink::Empty
            } else if slots.len() == 1 && matches!(slots[0], Slot::Leaf { .. }) {
                match slots.pop() {
                    Some(Slot::Leaf { hash, key, value }) => Shrink::Leaf(hash, key, value),
                    _ => Shrink::Keep,
                }
            } else {
                Shrink::Keep
            }
        }
        Node::Collision { hash, pairs } => {
            pairs.retain(|(k, _)| k.borrow() != key);
            if pairs.len() == 1 {
                match pairs.pop() {
                    Some((k, v)) => Shrink::Leaf(*hash, k, v),
                    None => Shrink::Empty,
                }
            } else if pairs.is_empty() {
                Shrink::Empty
            } else {
                Shrink::Keep
            }
        }
    }
}

fn collect_slot<'a, K, V>(slot: &'a Slot<K, V>, out: &mut Vec<&'a K>) {
    match slot {
        Slot::Leaf { key, .. } => out.push(key),
        Slot::Sub(child) => collect_node(child, out),
    }
}

fn collect_node<'a, K, V>(node: &'a Node<K, V>, out: &mut Vec<&'a K>) {
    match node {
        Node::Branch { slots, .. } => slots.iter().for_each(|s| collect_slot(s, out)),
        Node::Collision { pairs, .. } => out.extend(pairs.iter().map(|(k, _)| k)),
    }
}

fn diff_nodes<'a, K: Eq, V: PartialEq>(
    a: &'a Arc<Node<K, V>>,
    b: &'a Arc<Node<K, V>>,
    out: &mut Vec<&'a K>,
) {
    if Arc::ptr_eq(a, b) {
        return;
    }
    match (a.as_ref(), b.as_ref()) {
        (
            Node::Branch {
                bitmap: bm_a,
                slots: slots_a,
            },
            Node::Branch {
                bitmap: bm_b,
                slots: slots_b,
            },
        ) => {
            let mut bits = bm_a | bm_b;
            while bits != 0 {
                let bit = bits & bits.wrapping_neg();
                bits &= !bit;
                let sa = (bm_a & bit != 0).then(|| &slots_a[index(*bm_a, bit)]);
                let sb = (bm_b & bit != 0).then(|| &slots_b[index(*bm_b, bit)]);
                match (sa, sb) {
                    (Some(Slot::Sub(ca)), Some(Slot::Sub(cb))) => diff_nodes(ca, cb, out),
                    (
                        Some(Slot::Leaf {
                            key: ka, value: va, ..
                        }),
                        Some(Slot::Leaf {
                            key: kb, value: vb, ..
                        }),
                    ) => {
                        if ka != kb {
                            out.push(ka);
                            out.push(kb);
                        } else if va != vb {
                            out.push(ka);
                        }
                    }
                    (sa, sb) => {
                        if let Some(s) = sa {
                            collect_slot(s, out);
                        }
                        if let Some(s) = sb {
                            collect_slot(s, out);
                        }
                    }
                }
            }
        }
        (a, b) => {
            collect_node(a, out);
            collect_node(b, out);
        }
    }
}

/// Borrowing iterator over a trie's entries.
pub struct Iter<'a, K, V> {
    stack: Vec<std::slice::Iter<'a, Slot<K, V>>>,
    pairs: std::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((k, v)) = self.pairs.next() {
                self.remaining -= 1;
                return Some((k, v));
            }
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Slot::Leaf { key, value, .. }) => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Some(Slot::Sub(child)) => match child.as_ref() {
                    Node::Branch { slots, .. } => self.stack.push(slots.iter()),
                    Node::Collision { pairs, .. } => self.pairs = pairs.iter(),
                },
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a Trie<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> PartialEq for Trie<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.len == other.len
            && self
                .changed_keys(other)
                .into_iter()
                .all(|k| self.get(k) == other.get(k))
    }
}

impl<K: Hash + Eq + Clone, V: Clone + Eq> Eq for Trie<K, V> {}

impl<K: Hash + Eq + Clone, V: Clone + PartialEq> FromIterator<(K, V)> for Trie<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut trie = Trie::new();
        for (k, v) in iter {
            trie.insert_mut(k, v);
        }
        trie
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Trie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
