//! Immutable directed graph with edge values.
//!
//! Each node maps to its incoming and outgoing edge maps, so both directions
//! are answered without scanning. Topological order uses Kahn's algorithm
//! with ascending tie-breaking for determinism.

use super::map::Map;
use super::set::Set;
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

/// Incoming and outgoing edges of one node.
type Adjacency<V, E> = (Map<V, E>, Map<V, E>);

pub struct Graph<V, E> {
    nodes: Map<V, Adjacency<V, E>>,
}

impl<V, E> Clone for Graph<V, E> {
    fn clone(&self) -> Self {
        Graph {
            nodes: self.nodes.clone(),
        }
    }
}

impl<V, E> Default for Graph<V, E> {
    fn default() -> Self {
        Graph { nodes: Map::new() }
    }
}

impl<V, E> Graph<V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &V> {
        self.nodes.keys()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.nodes.ptr_eq(&other.nodes)
    }
}

impl<V: Hash + Eq + Clone, E: Clone + PartialEq> Graph<V, E> {
    pub fn add_node(&self, node: V) -> Self {
        if self.contains_node(&node) {
            return self.clone();
        }
        Graph {
            nodes: self.nodes.put(node, (Map::new(), Map::new())),
        }
    }

    /// Remove `node` together with every edge that touches it.
    pub fn remove_node(&self, node: &V) -> Self {
        let Some((incoming, outgoing)) = self.nodes.get(node) else {
            return self.clone();
        };
        let mut nodes = self.nodes.remove_key(node);
        for src in incoming.keys().filter(|n| *n != node) {
            nodes = nodes.compute_if_present(src.clone(), |_, (inc, out)| {
                Some((inc.clone(), out.remove_key(node)))
            });
        }
        for dst in outgoing.keys().filter(|n| *n != node) {
            nodes = nodes.compute_if_present(dst.clone(), |_, (inc, out)| {
                Some((inc.remove_key(node), out.clone()))
            });
        }
        Graph { nodes }
    }

    pub fn contains_node(&self, node: &V) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node_set(&self) -> Set<V> {
        self.nodes.keys().cloned().collect()
    }

    /// Bind the edge `src -> dst` to `edge`, adding both endpoints.
    pub fn put_edge(&self, src: V, dst: V, edge: E) -> Self {
        if self.edge(&src, &dst) == Some(&edge) {
            return self.clone();
        }
        let graph = self.add_node(src.clone()).add_node(dst.clone());
        let nodes = graph
            .nodes
            .compute_if_present(src.clone(), |_, (inc, out)| {
                Some((inc.clone(), out.put(dst.clone(), edge.clone())))
            })
            .compute_if_present(dst, |_, (inc, out)| Some((inc.put(src, edge), out.clone())));
        Graph { nodes }
    }

    pub fn edge(&self, src: &V, dst: &V) -> Option<&E> {
        self.nodes.get(src).and_then(|(_, out)| out.get(dst))
    }

    pub fn contains_edge(&self, src: &V, dst: &V) -> bool {
        self.edge(src, dst).is_some()
    }

    pub fn remove_edge(&self, src: &V, dst: &V) -> Self {
        if !self.contains_edge(src, dst) {
            return self.clone();
        }
        let nodes = self
            .nodes
            .compute_if_present(src.clone(), |_, (inc, out)| {
                Some((inc.clone(), out.remove_key(dst)))
            })
            .compute_if_present(dst.clone(), |_, (inc, out)| {
                Some((inc.remove_key(src), out.clone()))
            });
        Graph { nodes }
    }

    /// Edges ending at `node`, keyed by source; `None` for an unknown node.
    pub fn incoming_edges(&self, node: &V) -> Option<&Map<V, E>> {
        self.nodes.get(node).map(|(inc, _)| inc)
    }

    /// Edges leaving `node`, keyed by destination; `None` for an unknown node.
    pub fn outgoing_edges(&self, node: &V) -> Option<&Map<V, E>> {
        self.nodes.get(node).map(|(_, out)| out)
    }

    /// Kahn's algorithm; `ready` picks the order in which freed nodes are
    /// visited. Returns the nodes it could order.
    fn kahn(&self, mut ready: impl FnMut(&mut Vec<V>)) -> Vec<V> {
        let mut in_degree: FxHashMap<&V, usize> = self
            .nodes
            .iter()
            .map(|(n, (inc, _))| (n, inc.len()))
            .collect();
        let mut zero: Vec<V> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| (*n).clone())
            .collect();
        ready(&mut zero);
        let mut queue: VecDeque<V> = zero.into();

        let mut order = Vec::with_capacity(self.len());
        while let Some(current) = queue.pop_front() {
            let mut next_ready = Vec::new();
            if let Some(out) = self.outgoing_edges(&current) {
                for dst in out.keys() {
                    if let Some(degree) = in_degree.get_mut(dst) {
                        *degree -= 1;
                        if *degree == 0 {
                            next_ready.push(dst.clone());
                        }
                    }
                }
            }
            ready(&mut next_ready);
            queue.extend(next_ready);
            order.push(current);
        }
        order
    }

    /// True when the graph holds a self-loop or any directed cycle.
    pub fn has_cycles(&self) -> bool {
        self.kahn(|_| {}).len() != self.len()
    }
}

impl<V, E> Graph<V, E>
where
    V: Hash + Eq + Clone + Ord + fmt::Debug,
    E: Clone + PartialEq,
{
    /// Nodes ordered so every edge points forward; ties break ascending.
    pub fn topological_order(&self) -> Result<Vec<V>> {
        let order = self.kahn(|batch| batch.sort());
        if order.len() == self.len() {
            return Ok(order);
        }
        let ordered: Set<V> = order.into_iter().collect();
        let mut members: Vec<&V> = self.nodes().filter(|n| !ordered.contains(*n)).collect();
        members.sort();
        Err(Error::Cycle(members.iter().map(|n| format!("{:?}", n)).collect()))
    }
}

impl<V: Hash + Eq + Clone, E: Clone + PartialEq> PartialEq for Graph<V, E> {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl<V: Hash + Eq + Clone, E: Clone + PartialEq> FromIterator<(V, V, E)> for Graph<V, E> {
    fn from_iter<I: IntoIterator<Item = (V, V, E)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Graph::new(), |g, (src, dst, e)| g.put_edge(src, dst, e))
    }
}

impl<V: Hash + Eq + Clone, E: Clone + PartialEq> Extend<(V, V, E)> for Graph<V, E> {
    fn extend<I: IntoIterator<Item = (V, V, E)>>(&mut self, iter: I) {
        for (src, dst, e) in iter {
            *self = self.put_edge(src, dst, e);
        }
    }
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for Graph<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (src, (_, out)) in self.nodes.iter() {
            m.entry(src, out);
        }
        m.finish()
    }
}
