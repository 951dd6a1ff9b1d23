//! Immutable indexed sequence: a 32-way persistent vector trie with a tail
//! buffer. `append`, `get`, `set` and `pop_last` touch one root-to-leaf path;
//! the positional edits rebuild.

use crate::core::mergeable::{merge_values, Mergeable};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::sync::Arc;

const BITS: usize = 5;
const WIDTH: usize = 1 << BITS;
const MASK: usize = WIDTH - 1;

#[derive(Clone)]
enum Node<T> {
    Branch(Vec<Arc<Node<T>>>),
    Leaf(Vec<T>),
}

/// An immutable list. Versions share every untouched leaf.
pub struct List<T> {
    len: usize,
    shift: usize,
    root: Arc<Node<T>>,
    tail: Arc<Vec<T>>,
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        List {
            len: self.len,
            shift: self.shift,
            root: Arc::clone(&self.root),
            tail: Arc::clone(&self.tail),
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List {
            len: 0,
            shift: BITS,
            root: Arc::new(Node::Branch(Vec::new())),
            tail: Arc::new(Vec::new()),
        }
    }
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&self) -> Self {
        Self::new()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.len == other.len
            && Arc::ptr_eq(&self.root, &other.root)
            && Arc::ptr_eq(&self.tail, &other.tail)
    }

    fn tail_offset(&self) -> usize {
        if self.len < WIDTH {
            0
        } else {
            ((self.len - 1) >> BITS) << BITS
        }
    }

    /// The 32-element chunk holding index `i`.
    fn leaf_for(&self, i: usize) -> &[T] {
        if i >= self.tail_offset() {
            return self.tail.as_slice();
        }
        let mut node = &*self.root;
        let mut level = self.shift;
        while level > 0 {
            match node {
                Node::Branch(children) => match children.get((i >> level) & MASK) {
                    Some(child) => node = child,
                    None => return &[],
                },
                Node::Leaf(_) => return &[],
            }
            level -= BITS;
        }
        match node {
            Node::Leaf(items) => items.as_slice(),
            Node::Branch(_) => &[],
        }
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.leaf_for(i).get(i & MASK)
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: 0,
            back: self.len,
            front_leaf: &[],
            back_leaf: &[],
        }
    }
}

impl<T: Clone> List<T> {
    fn new_path(level: usize, node: Arc<Node<T>>) -> Arc<Node<T>> {
        if level == 0 {
            node
        } else {
            Arc::new(Node::Branch(vec![Self::new_path(level - BITS, node)]))
        }
    }

    fn push_tail(size: usize, level: usize, node: &mut Arc<Node<T>>, leaf: Arc<Node<T>>) {
        if let Node::Branch(children) = Arc::make_mut(node) {
            let sub = ((size - 1) >> level) & MASK;
            if level == BITS {
                children.push(leaf);
            } else if let Some(child) = children.get_mut(sub) {
                Self::push_tail(size, level - BITS, child, leaf);
            } else {
                children.push(Self::new_path(level - BITS, leaf));
            }
        }
    }

    /// Drop the rightmost leaf below `node`; true when `node` became empty.
    fn pop_tail(size: usize, level: usize, node: &mut Arc<Node<T>>) -> bool {
        match Arc::make_mut(node) {
            Node::Branch(children) => {
                let sub = ((size - 2) >> level) & MASK;
                if level > BITS {
                    let emptied = children
                        .get_mut(sub)
                        .is_some_and(|child| Self::pop_tail(size, level - BITS, child));
                    if emptied {
                        children.truncate(sub);
                    }
                } else {
                    children.truncate(sub);
                }
                children.is_empty()
            }
            Node::Leaf(_) => false,
        }
    }

    fn assoc(level: usize, node: &mut Arc<Node<T>>, i: usize, value: T) {
        match Arc::make_mut(node) {
            Node::Branch(children) => {
                if let Some(child) = children.get_mut((i >> level) & MASK) {
                    Self::assoc(level - BITS, child, i, value);
                }
            }
            Node::Leaf(items) => {
                if let Some(slot) = items.get_mut(i & MASK) {
                    *slot = value;
                }
            }
        }
    }

    fn push_mut(&mut self, value: T) {
        if self.len - self.tail_offset() < WIDTH {
            Arc::make_mut(&mut self.tail).push(value);
            self.len += 1;
            return;
        }
        let full = std::mem::replace(&mut self.tail, Arc::new(vec![value]));
        let leaf = Arc::new(Node::Leaf(Arc::unwrap_or_clone(full)));
        if (self.len >> BITS) > (1 << self.shift) {
            let old = Arc::clone(&self.root);
            let path = Self::new_path(self.shift, leaf);
            self.root = Arc::new(Node::Branch(vec![old, path]));
            self.shift += BITS;
        } else {
            Self::push_tail(self.len, self.shift, &mut self.root, leaf);
        }
        self.len += 1;
    }

    /// Push `value` at the end.
    pub fn append(&self, value: T) -> Self {
        let mut next = self.clone();
        next.push_mut(value);
        next
    }

    pub fn append_list(&self, other: &List<T>) -> Self {
        let mut next = self.clone();
        next.extend(other.iter().cloned());
        next
    }

    pub fn prepend(&self, value: T) -> Self {
        std::iter::once(value).chain(self.iter().cloned()).collect()
    }

    /// The list without its last element, and that element.
    pub fn pop_last(&self) -> Option<(Self, T)> {
        let last = self.last()?.clone();
        if self.len == 1 {
            return Some((Self::new(), last));
        }
        let mut next = self.clone();
        if self.len - self.tail_offset() > 1 {
            Arc::make_mut(&mut next.tail).pop();
            next.len -= 1;
            return Some((next, last));
        }
        next.tail = Arc::new(self.leaf_for(self.len - 2).to_vec());
        Self::pop_tail(self.len, self.shift, &mut next.root);
        if next.shift > BITS {
            let only = match &*next.root {
                Node::Branch(children) if children.len() == 1 => Some(Arc::clone(&children[0])),
                _ => None,
            };
            if let Some(child) = only {
                next.root = child;
                next.shift -= BITS;
            }
        }
        next.len -= 1;
        Some((next, last))
    }

    pub fn sublist(&self, from: usize, to: usize) -> Result<Self> {
        if to > self.len {
            return Err(Error::IndexOutOfBounds { index: to, len: self.len });
        }
        if from > to {
            return Err(Error::IndexOutOfBounds { index: from, len: self.len });
        }
        if from == 0 && to == self.len {
            return Ok(self.clone());
        }
        Ok(self.iter().skip(from).take(to - from).cloned().collect())
    }

    pub fn insert(&self, i: usize, value: T) -> Result<Self> {
        if i > self.len {
            return Err(Error::IndexOutOfBounds { index: i, len: self.len });
        }
        if i == self.len {
            return Ok(self.append(value));
        }
        Ok(self
            .iter()
            .take(i)
            .cloned()
            .chain(std::iter::once(value))
            .chain(self.iter().skip(i).cloned())
            .collect())
    }

    pub fn remove_at(&self, i: usize) -> Result<Self> {
        if i >= self.len {
            return Err(Error::IndexOutOfBounds { index: i, len: self.len });
        }
        if i + 1 == self.len {
            return Ok(self.pop_last().map(|(l, _)| l).unwrap_or_default());
        }
        Ok(self
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, v)| v.clone())
            .collect())
    }

    pub fn reverse(&self) -> Self {
        self.iter().rev().cloned().collect()
    }
}

impl<T: Clone + PartialEq> List<T> {
    pub fn of<I: IntoIterator<Item = T>>(elements: I) -> Self {
        elements.into_iter().collect()
    }

    pub fn set(&self, i: usize, value: T) -> Result<Self> {
        let current = self.get(i).ok_or(Error::IndexOutOfBounds { index: i, len: self.len })?;
        if *current == value {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        let offset = self.tail_offset();
        if i >= offset {
            Arc::make_mut(&mut next.tail)[i - offset] = value;
        } else {
            Self::assoc(next.shift, &mut next.root, i, value);
        }
        Ok(next)
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.iter().position(|v| v == value)
    }

    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        self.iter().rposition(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.index_of(value).is_some()
    }

    /// Remove the first occurrence of `value`.
    pub fn remove(&self, value: &T) -> Self {
        match self.index_of(value) {
            Some(i) => self.remove_at(i).unwrap_or_else(|_| self.clone()),
            None => self.clone(),
        }
    }

    /// Remove every element contained in `other`.
    pub fn remove_all(&self, other: &List<T>) -> Self {
        if !self.iter().any(|v| other.contains(v)) {
            return self.clone();
        }
        self.iter().filter(|v| !other.contains(v)).cloned().collect()
    }

    /// Swap the first occurrence of `pre` for `post`.
    pub fn replace(&self, pre: &T, post: T) -> Self {
        match self.index_of(pre) {
            Some(i) => self.set(i, post).unwrap_or_else(|_| self.clone()),
            None => self.clone(),
        }
    }
}

impl<T: Clone + PartialEq + fmt::Debug> Mergeable for List<T> {
    fn merger(&self) -> Self {
        Self::new()
    }

    /// Lists merge only when at most one branch diverged.
    fn merge(&self, branches: &[Self]) -> Result<Self> {
        merge_values(self, branches)
    }
}

pub struct Iter<'a, T> {
    list: &'a List<T>,
    front: usize,
    back: usize,
    front_leaf: &'a [T],
    back_leaf: &'a [T],
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front >= self.back {
            return None;
        }
        if self.front_leaf.is_empty() {
            let leaf = self.list.leaf_for(self.front);
            self.front_leaf = leaf.get(self.front & MASK..).unwrap_or(&[]);
        }
        let (item, rest) = self.front_leaf.split_first()?;
        self.front_leaf = rest;
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        if self.back_leaf.is_empty() {
            let i = self.back - 1;
            let leaf = self.list.leaf_for(i);
            self.back_leaf = leaf.get(..=(i & MASK)).unwrap_or(&[]);
        }
        let (item, rest) = self.back_leaf.split_last()?;
        self.back_leaf = rest;
        self.back -= 1;
        Some(item)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        list.extend(iter);
        list
    }
}

impl<T: Clone> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.push_mut(v);
        }
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len == other.len && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for List<T> {}

impl<T: Hash> Hash for List<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for v in self.iter() {
            v.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Serialize> Serialize for List<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de> + Clone> Deserialize<'de> for List<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(List::from_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(n: usize) -> List<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_append_and_get_across_levels() {
        let n = WIDTH * WIDTH * 2 + 7;
        let list = range(n);
        assert_eq!(list.len(), n);
        for i in [0, 31, 32, 33, 1023, 1024, 1025, 1056, n - 1] {
            assert_eq!(list.get(i), Some(&i));
        }
        assert_eq!(list.get(n), None);
        assert_eq!(list.first(), Some(&0));
        assert_eq!(list.last(), Some(&(n - 1)));
    }

    #[test]
    fn test_old_versions_are_untouched() {
        let a = range(100);
        let b = a.set(50, 999).unwrap();
        let c = b.append(100);
        assert_eq!(a.get(50), Some(&50));
        assert_eq!(b.get(50), Some(&999));
        assert_eq!(a.len(), 100);
        assert_eq!(c.len(), 101);
    }

    #[test]
    fn test_set_same_value_shares_structure() {
        let a = range(40);
        assert!(a.set(3, 3).unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_pop_last_shrinks_through_levels() {
        let n = WIDTH * WIDTH + WIDTH + 1;
        let mut list = range(n);
        for expected in (0..n).rev() {
            let (rest, last) = list.pop_last().unwrap();
            assert_eq!(last, expected);
            assert_eq!(rest.len(), expected);
            list = rest;
        }
        assert!(list.is_empty());
        assert!(list.pop_last().is_none());
    }

    #[test]
    fn test_index_errors() {
        let list = range(3);
        assert!(matches!(list.set(3, 0), Err(Error::IndexOutOfBounds { index: 3, len: 3 })));
        assert!(list.insert(4, 0).is_err());
        assert!(list.remove_at(3).is_err());
        assert!(list.sublist(2, 4).is_err());
        assert!(list.sublist(2, 1).is_err());
    }

    #[test]
    fn test_positional_edits() {
        let list = List::of(["a", "b", "c"]);
        assert_eq!(list.prepend("z"), List::of(["z", "a", "b", "c"]));
        assert_eq!(list.insert(1, "x").unwrap(), List::of(["a", "x", "b", "c"]));
        assert_eq!(list.remove_at(0).unwrap(), List::of(["b", "c"]));
        assert_eq!(list.sublist(1, 3).unwrap(), List::of(["b", "c"]));
        assert_eq!(list.reverse(), List::of(["c", "b", "a"]));
        assert_eq!(list.replace(&"b", "y"), List::of(["a", "y", "c"]));
    }

    #[test]
    fn test_search_and_removal() {
        let list = List::of([1, 2, 3, 2, 1]);
        assert_eq!(list.index_of(&2), Some(1));
        assert_eq!(list.last_index_of(&2), Some(3));
        assert!(!list.contains(&7));
        assert_eq!(list.remove(&2), List::of([1, 3, 2, 1]));
        assert_eq!(list.remove_all(&List::of([1, 2])), List::of([3]));
        assert!(list.remove(&7).ptr_eq(&list));
    }

    #[test]
    fn test_double_ended_iteration() {
        let list = range(70);
        let mut it = list.iter();
        assert_eq!(it.next(), Some(&0));
        assert_eq!(it.next_back(), Some(&69));
        assert_eq!(it.len(), 68);
        let rest: Vec<usize> = it.copied().collect();
        assert_eq!(rest, (1..69).collect::<Vec<_>>());
    }

    #[test]
    fn test_merge_is_conservative() {
        let base = List::of([1, 2]);
        let left = base.append(3);
        assert_eq!(base.merge2(&left, &base).unwrap(), left);
        let right = base.append(4);
        assert!(matches!(base.merge2(&left, &right), Err(Error::NotMergeable(_))));
    }

    #[test]
    fn test_serde_json() {
        let list = List::of([3, 1, 2]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "[3,1,2]");
        let back: List<i32> = serde_json::from_str("[3,1,2]").unwrap();
        assert_eq!(back, list);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(u16),
        Set(usize, u16),
        Pop,
        Insert(usize, u16),
        RemoveAt(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u16>().prop_map(Op::Append),
            1 => (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Op::Set(i, v)),
            1 => Just(Op::Pop),
            1 => (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Op::Insert(i, v)),
            1 => any::<usize>().prop_map(Op::RemoveAt),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_vec(ops in prop::collection::vec(op(), 0..400)) {
            let mut list: List<u16> = List::new();
            let mut model: Vec<u16> = Vec::new();
            for op in ops {
                match op {
                    Op::Append(v) => {
                        list = list.append(v);
                        model.push(v);
                    }
                    Op::Set(i, v) if !model.is_empty() => {
                        let i = i % model.len();
                        list = list.set(i, v).unwrap();
                        model[i] = v;
                    }
                    Op::Pop => {
                        if let Some((rest, last)) = list.pop_last() {
                            prop_assert_eq!(Some(last), model.pop());
                            list = rest;
                        }
                    }
                    Op::Insert(i, v) => {
                        let i = i % (model.len() + 1);
                        list = list.insert(i, v).unwrap();
                        model.insert(i, v);
                    }
                    Op::RemoveAt(i) if !model.is_empty() => {
                        let i = i % model.len();
                        list = list.remove_at(i).unwrap();
                        model.remove(i);
                    }
                    _ => {}
                }
                prop_assert_eq!(list.len(), model.len());
            }
            prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), model.clone());
            prop_assert_eq!(
                list.iter().rev().copied().collect::<Vec<_>>(),
                model.iter().rev().copied().collect::<Vec<_>>()
            );
        }
    }
}
