//! Per-thread context values with scoped overrides.
//!
//! A `Context<T>` reads as its default until a thread overrides it with
//! `run`, `scoped` or `set_on_thread`. Overrides are visible to the
//! overriding thread only; `capture` carries them into worker threads.

use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static OVERRIDES: RefCell<FxHashMap<usize, Slot>> = RefCell::new(FxHashMap::default());
}

fn swap(id: usize, value: Option<Slot>) -> Option<Slot> {
    OVERRIDES
        .try_with(|overrides| {
            let mut overrides = overrides.borrow_mut();
            match value {
                Some(v) => overrides.insert(id, v),
                None => overrides.remove(&id),
            }
        })
        .ok()
        .flatten()
}

/// A value with a default that each thread can override for a scope.
pub struct Context<T> {
    id: usize,
    default: T,
}

impl<T: Clone + Send + Sync + 'static> Context<T> {
    pub fn new(default: T) -> Self {
        Context {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            default,
        }
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The current thread's override, else the default.
    pub fn get(&self) -> T {
        OVERRIDES
            .with(|o| {
                o.borrow()
                    .get(&self.id)
                    .and_then(|v| v.downcast_ref::<T>())
                    .cloned()
            })
            .unwrap_or_else(|| self.default.clone())
    }

    /// Override until the returned guard drops; the previous value returns then.
    pub fn scoped(&self, value: T) -> ContextGuard<'_, T> {
        let previous = swap(self.id, Some(Arc::new(value)));
        ContextGuard {
            context: self,
            previous,
            _thread_bound: PhantomData,
        }
    }

    /// Run `f` with `value` in effect, restoring the previous value after,
    /// also when `f` panics.
    pub fn run<R>(&self, value: T, f: impl FnOnce() -> R) -> R {
        let _guard = self.scoped(value);
        f()
    }

    /// Override for the rest of the thread's life, or until the next override.
    pub fn set_on_thread(&self, value: T) {
        swap(self.id, Some(Arc::new(value)));
    }

    /// Drop this thread's override so `get` yields the default again.
    pub fn reset_on_thread(&self) {
        swap(self.id, None);
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("default", &self.default)
            .finish()
    }
}

/// Restores a context's previous value on drop.
#[must_use = "the override ends when the guard is dropped"]
pub struct ContextGuard<'a, T> {
    context: &'a Context<T>,
    previous: Option<Slot>,
    _thread_bound: PhantomData<*const ()>,
}

impl<T> Drop for ContextGuard<'_, T> {
    fn drop(&mut self) {
        swap(self.context.id, self.previous.take());
    }
}

/// Every override of the capturing thread, to be entered on another thread.
#[derive(Clone, Default)]
pub struct Snapshot {
    overrides: FxHashMap<usize, Slot>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Run `f` with exactly the captured overrides in effect on this thread.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let saved = OVERRIDES.with(|o| o.replace(self.overrides.clone()));
        let _restore = Restore(Some(saved));
        f()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("overrides", &self.overrides.len()).finish()
    }
}

struct Restore(Option<FxHashMap<usize, Slot>>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(saved) = self.0.take() {
            let _ = OVERRIDES.try_with(|o| o.replace(saved));
        }
    }
}

/// Capture the current thread's overrides.
pub fn capture() -> Snapshot {
    Snapshot {
        overrides: OVERRIDES.with(|o| o.borrow().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_until_overridden() {
        let ctx = Context::new("root");
        assert_eq!(ctx.get(), "root");
        assert_eq!(*ctx.default_value(), "root");
        let seen = ctx.run("inner", || ctx.get());
        assert_eq!(seen, "inner");
        assert_eq!(ctx.get(), "root");
    }

    #[test]
    fn test_nested_runs_restore_in_order() {
        let ctx = Context::new(0u32);
        ctx.run(1, || {
            assert_eq!(ctx.get(), 1);
            ctx.run(2, || assert_eq!(ctx.get(), 2));
            assert_eq!(ctx.get(), 1);
        });
        assert_eq!(ctx.get(), 0);
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = Context::new(1u8);
        let b = Context::new(1u8);
        a.run(5, || {
            assert_eq!(a.get(), 5);
            assert_eq!(b.get(), 1);
        });
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let ctx = Context::new(String::from("base"));
        {
            let _guard = ctx.scoped("scoped".to_string());
            assert_eq!(ctx.get(), "scoped");
        }
        assert_eq!(ctx.get(), "base");
    }

    #[test]
    fn test_run_restores_after_panic() {
        let ctx = Context::new(0i32);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.run(7, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(ctx.get(), 0);
    }

    #[test]
    fn test_set_on_thread_stays_until_reset() {
        let ctx = Context::new(0i32);
        ctx.set_on_thread(3);
        assert_eq!(ctx.get(), 3);
        ctx.run(4, || assert_eq!(ctx.get(), 4));
        assert_eq!(ctx.get(), 3);
        ctx.reset_on_thread();
        assert_eq!(ctx.get(), 0);
    }

    #[test]
    fn test_overrides_are_per_thread() {
        let ctx = Context::new(0i32);
        ctx.run(9, || {
            std::thread::scope(|s| {
                s.spawn(|| assert_eq!(ctx.get(), 0));
            });
        });
    }

    #[test]
    fn test_snapshot_carries_overrides_to_other_threads() {
        let ctx = Context::new(0i32);
        let snapshot = ctx.run(9, capture);
        assert!(!snapshot.is_empty());
        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(snapshot.enter(|| ctx.get()), 9);
                assert_eq!(ctx.get(), 0);
            });
        });
        assert_eq!(ctx.get(), 0);
    }
}
