//! Shared mutable cell holding an immutable value.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lets several owners swap an immutable value in place. Every update runs
/// under the cell's lock, so read-modify-write steps do not interleave.
#[derive(Debug, Default)]
pub struct MutationWrapper<C> {
    cell: Mutex<C>,
}

impl<C: Clone> MutationWrapper<C> {
    pub fn new(value: C) -> Self {
        MutationWrapper {
            cell: Mutex::new(value),
        }
    }

    fn guard(&self) -> MutexGuard<'_, C> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> C {
        self.guard().clone()
    }

    pub fn set(&self, value: C) {
        *self.guard() = value;
    }

    pub fn update<F: FnOnce(&C) -> C>(&self, f: F) {
        let mut guard = self.guard();
        *guard = f(&guard);
    }

    pub fn update_with<E, F: FnOnce(&C, E) -> C>(&self, f: F, e: E) {
        self.update(|c| f(c, e));
    }

    pub fn update_and_get<F: FnOnce(&C) -> C>(&self, f: F) -> C {
        let mut guard = self.guard();
        *guard = f(&guard);
        guard.clone()
    }

    pub fn into_inner(self) -> C {
        self.cell.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clone + Default> MutationWrapper<C> {
    /// Reset to the empty value.
    pub fn clear(&self) {
        self.set(C::default());
    }
}
