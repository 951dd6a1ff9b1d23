//! Per-worker copies of a mergeable value, folded back by three-way merge.

use crate::config::parallelism;
use super::context;
use crate::core::mergeable::Mergeable;
use crate::error::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A base value plus one working copy per slot.
///
/// Workers each own a slot and change it without contention; `merge`
/// folds every slot that diverged from the base back into a new base.
pub struct Concurrent<T> {
    pre: Option<T>,
    states: Vec<Mutex<T>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Mergeable> Concurrent<T> {
    /// One slot per worker plus one for the coordinating thread.
    pub fn new(value: T) -> Self {
        Self::with_slots(value, parallelism() + 1)
    }

    pub fn with_slots(value: T, slots: usize) -> Self {
        let slots = slots.max(1);
        Concurrent {
            states: (0..slots).map(|_| Mutex::new(value.clone())).collect(),
            pre: Some(value),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.pre.is_some()
    }

    pub fn slots(&self) -> usize {
        self.states.len()
    }

    /// Slot reserved for the thread driving the workers.
    pub fn main_slot(&self) -> usize {
        self.states.len() - 1
    }

    /// Re-seed a value consumed by `result`.
    pub fn init(&mut self, value: T) -> Result<()> {
        if self.pre.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        for state in &mut self.states {
            *state.get_mut().unwrap_or_else(PoisonError::into_inner) = value.clone();
        }
        self.pre = Some(value);
        Ok(())
    }

    /// The base the slots started from.
    pub fn pre(&self) -> Result<&T> {
        self.pre.as_ref().ok_or(Error::Uninitialized)
    }

    fn slot(&self, slot: usize) -> Result<&Mutex<T>> {
        self.pre()?;
        self.states.get(slot).ok_or(Error::IndexOutOfBounds {
            index: slot,
            len: self.states.len(),
        })
    }

    pub fn get(&self, slot: usize) -> Result<T> {
        Ok(lock(self.slot(slot)?).clone())
    }

    /// Replace the slot's value; false when it was already equal.
    pub fn set(&self, slot: usize, value: T) -> Result<bool> {
        let mut state = lock(self.slot(slot)?);
        if *state == value {
            return Ok(false);
        }
        *state = value;
        Ok(true)
    }

    /// Apply `f` to the slot's value; false when nothing changed.
    pub fn change<F>(&self, slot: usize, f: F) -> Result<bool>
    where
        F: FnOnce(&T) -> T,
    {
        let mut state = lock(self.slot(slot)?);
        let next = f(&state);
        if next == *state {
            return Ok(false);
        }
        *state = next;
        Ok(true)
    }

    fn fold(&mut self) -> Result<T> {
        let pre = self.pre.as_ref().ok_or(Error::Uninitialized)?;
        let branches: Vec<T> = self
            .states
            .iter_mut()
            .map(|m| m.get_mut().unwrap_or_else(PoisonError::into_inner).clone())
            .filter(|s| s != pre)
            .collect();
        tracing::trace!(branches = branches.len(), "merging concurrent slots");
        pre.merge(&branches)
    }

    /// Merge every slot into a new base and reset the slots to it.
    pub fn merge(&mut self) -> Result<T> {
        let result = self.fold()?;
        for state in &mut self.states {
            *state.get_mut().unwrap_or_else(PoisonError::into_inner) = result.clone();
        }
        self.pre = Some(result.clone());
        Ok(result)
    }

    /// Merge every slot and leave the value uninitialized.
    pub fn result(&mut self) -> Result<T> {
        let result = self.fold()?;
        self.pre = None;
        Ok(result)
    }
}

/// Fold `items` into `base` with `f` across `parallelism()` scoped threads,
/// each working on its own slot, then merge the slots. Workers see the
/// caller's context overrides.
pub fn parallel_update<T, I, F>(base: &T, items: &[I], f: F) -> Result<T>
where
    T: Mergeable + Send + Sync,
    I: Sync,
    F: Fn(&T, &I) -> T + Sync,
{
    if items.is_empty() {
        return Ok(base.clone());
    }
    let workers = parallelism().min(items.len());
    let chunk = items.len().div_ceil(workers);
    let mut concurrent = Concurrent::with_slots(base.clone(), workers + 1);
    tracing::debug!(workers, items = items.len(), "parallel update");

    let shared = &concurrent;
    let f = &f;
    let snapshot = &context::capture();
    let outcomes: Vec<Result<()>> = std::thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .enumerate()
            .map(|(slot, part)| {
                s.spawn(move || -> Result<()> {
                    snapshot.enter(|| -> Result<()> {
                        for item in part {
                            shared.change(slot, |t| f(t, item))?;
                        }
                        Ok(())
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    outcomes.into_iter().collect::<Result<()>>()?;
    concurrent.result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{Map, Set};

    #[test]
    fn test_slots_merge_into_base() {
        let mut c = Concurrent::with_slots(Set::of([1, 2]), 3);
        assert!(c.change(0, |s| s.add(10)).unwrap());
        assert!(c.change(1, |s| s.remove(&1)).unwrap());
        assert!(!c.change(2, |s| s.add(2)).unwrap());
        let merged = c.merge().unwrap();
        assert_eq!(merged, Set::of([2, 10]));
        assert_eq!(c.get(2).unwrap(), merged);
        assert_eq!(c.pre().unwrap(), &merged);
    }

    #[test]
    fn test_set_reports_change() {
        let c = Concurrent::with_slots(Set::of([1]), 2);
        assert!(!c.set(0, Set::of([1])).unwrap());
        assert!(c.set(0, Set::of([1, 2])).unwrap());
        assert_eq!(c.get(0).unwrap().len(), 2);
        assert_eq!(c.get(1).unwrap().len(), 1);
    }

    #[test]
    fn test_result_uninitializes() {
        let mut c = Concurrent::with_slots(Set::of([1]), 2);
        c.set(1, Set::of([1, 5])).unwrap();
        assert_eq!(c.result().unwrap(), Set::of([1, 5]));
        assert!(!c.is_initialized());
        assert!(matches!(c.get(0), Err(Error::Uninitialized)));
        assert!(matches!(c.result(), Err(Error::Uninitialized)));
        c.init(Set::new()).unwrap();
        assert!(c.get(0).unwrap().is_empty());
        assert!(matches!(c.init(Set::new()), Err(Error::AlreadyInitialized)));
    }

    #[test]
    fn test_slot_out_of_range() {
        let c = Concurrent::with_slots(Set::<u8>::new(), 2);
        assert_eq!(c.main_slot(), 1);
        assert!(matches!(c.get(2), Err(Error::IndexOutOfBounds { index: 2, len: 2 })));
    }

    #[test]
    fn test_new_sizes_slots_from_parallelism() {
        let c = Concurrent::new(Set::<u8>::new());
        assert_eq!(c.slots(), parallelism() + 1);
    }

    #[test]
    fn test_parallel_update_builds_set() {
        let items: Vec<u32> = (0..1000).collect();
        let set = parallel_update(&Set::new(), &items, |s, i| s.add(*i)).unwrap();
        assert_eq!(set.len(), 1000);
        assert!(set.contains(&999));
    }

    #[test]
    fn test_parallel_update_merges_nested_maps() {
        let items: Vec<(u8, u32)> = (0..400).map(|i| ((i % 4) as u8, i)).collect();
        let base: Map<u8, Set<u32>> = Map::new();
        let map = parallel_update(&base, &items, |m, (k, v)| {
            let current = m.get(k).cloned().unwrap_or_default();
            m.put(*k, current.add(*v))
        })
        .unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.values().map(|s| s.len()).sum::<usize>(), 400);
    }

    #[test]
    fn test_parallel_update_workers_see_context() {
        let offset = context::Context::new(0u32);
        let items: Vec<u32> = (0..64).collect();
        let set = offset.run(1000, || {
            parallel_update(&Set::new(), &items, |s, i| s.add(i + offset.get())).unwrap()
        });
        assert_eq!(set, (1000..1064).collect::<Set<u32>>());
    }

    #[test]
    fn test_parallel_update_empty_items() {
        let base = Set::of([1]);
        assert!(parallel_update(&base, &[] as &[u8], |s, _| s.clone()).unwrap().ptr_eq(&base));
    }
}
