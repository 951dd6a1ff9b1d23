//! Iterator adapters that collect into the immutable collections.

use super::{DefaultMap, List, Map, QualifiedSet, Set};
use std::hash::Hash;

/// Collecting and mapping helpers for any iterator.
pub trait CollectionExt: Iterator + Sized {
    fn to_set(self) -> Set<Self::Item>
    where
        Self::Item: Hash + Eq + Clone,
    {
        self.collect()
    }

    fn to_list(self) -> List<Self::Item>
    where
        Self::Item: Clone,
    {
        self.collect()
    }

    fn to_map<K, V>(self) -> Map<K, V>
    where
        Self: Iterator<Item = (K, V)>,
        K: Hash + Eq + Clone,
        V: Clone + PartialEq,
    {
        self.collect()
    }

    /// Collect pairs into a [`DefaultMap`]; pairs equal to the default vanish.
    fn to_default_map<K, V, F>(self, default: F) -> DefaultMap<K, V>
    where
        Self: Iterator<Item = (K, V)>,
        K: Hash + Eq + Clone,
        V: Clone + PartialEq,
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        let mut map = DefaultMap::new(default);
        map.extend(self);
        map
    }

    fn to_qualified_set<K, F>(self, qualifier: F) -> QualifiedSet<K, Self::Item>
    where
        K: Hash + Eq + Clone,
        Self::Item: Clone + PartialEq,
        F: Fn(&Self::Item) -> K + Send + Sync + 'static,
    {
        QualifiedSet::of(qualifier, self)
    }

    /// Map each element together with its predecessor and successor.
    fn linked<R, F>(self, mut f: F) -> impl Iterator<Item = R>
    where
        F: FnMut(Option<&Self::Item>, &Self::Item, Option<&Self::Item>) -> R,
    {
        let items: Vec<Self::Item> = self.collect();
        let mapped: Vec<R> = items
            .iter()
            .enumerate()
            .map(|(i, cur)| f(i.checked_sub(1).and_then(|p| items.get(p)), cur, items.get(i + 1)))
            .collect();
        mapped.into_iter()
    }

    /// Map each element together with its position.
    fn indexed<R, F>(self, mut f: F) -> impl Iterator<Item = R>
    where
        F: FnMut(Self::Item, usize) -> R,
    {
        self.enumerate().map(move |(i, e)| f(e, i))
    }

    fn sorted_by_key_desc<K, F>(self, mut key: F) -> std::vec::IntoIter<Self::Item>
    where
        K: Ord,
        F: FnMut(&Self::Item) -> K,
    {
        let mut items: Vec<Self::Item> = self.collect();
        items.sort_by(|a, b| key(b).cmp(&key(a)));
        items.into_iter()
    }
}

impl<I: Iterator> CollectionExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors() {
        let set = [1, 2, 2, 3].into_iter().to_set();
        assert_eq!(set.len(), 3);
        let list = [3, 1, 3].into_iter().to_list();
        assert_eq!(list, List::of([3, 1, 3]));
        let map = [("a", 1), ("b", 2)].into_iter().to_map();
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn test_to_default_map_drops_defaults() {
        let dm = [(1u32, 0u32), (2, 5)].into_iter().to_default_map(|_| 0);
        assert_eq!(dm.len(), 1);
        assert_eq!(dm.get(&1), 0);
        assert_eq!(dm.get(&2), 5);
    }

    #[test]
    fn test_to_qualified_set() {
        let qs = ["apple", "avocado", "banana"]
            .into_iter()
            .to_qualified_set(|s: &&str| s.chars().next());
        assert_eq!(qs.len(), 2);
        assert_eq!(qs.get(&Some('a')), Some(&"avocado"));
    }

    #[test]
    fn test_linked() {
        let pairs: Vec<String> = ["a", "b", "c"]
            .into_iter()
            .linked(|p, c, n| format!("{}{}{}", p.unwrap_or(&"<"), c, n.unwrap_or(&">")))
            .collect();
        assert_eq!(pairs, vec!["<ab", "abc", "bc>"]);
    }

    #[test]
    fn test_indexed_and_sorted_desc() {
        let indexed: Vec<(char, usize)> = "xyz".chars().indexed(|c, i| (c, i)).collect();
        assert_eq!(indexed, vec![('x', 0), ('y', 1), ('z', 2)]);
        let sorted: Vec<&str> =
            ["bb", "a", "ccc"].into_iter().sorted_by_key_desc(|s| s.len()).collect();
        assert_eq!(sorted, vec!["ccc", "bb", "a"]);
    }
}
