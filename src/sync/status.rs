//! Monotone status chain that observers can follow and wait on.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A status in a [`StatusProvider`] chain.
pub trait Status: Clone + PartialEq + fmt::Debug + Send {
    /// A stopped status ends the chain: iteration finishes after it.
    fn is_stopped(&self) -> bool;
}

struct Chain<S> {
    history: Mutex<Vec<S>>,
    advanced: Condvar,
}

impl<S> Chain<S> {
    fn history(&self) -> MutexGuard<'_, Vec<S>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the current status and wakes observers on every transition.
pub struct StatusProvider<S> {
    chain: Arc<Chain<S>>,
}

impl<S> Clone for StatusProvider<S> {
    fn clone(&self) -> Self {
        StatusProvider {
            chain: Arc::clone(&self.chain),
        }
    }
}

impl<S: Status> StatusProvider<S> {
    pub fn new(start: S) -> Self {
        StatusProvider {
            chain: Arc::new(Chain {
                history: Mutex::new(vec![start]),
                advanced: Condvar::new(),
            }),
        }
    }

    pub fn status(&self) -> S {
        let history = self.chain.history();
        history[history.len() - 1].clone()
    }

    /// Move to `f(current)` unless that equals the current status.
    /// Returns whether the chain advanced.
    pub fn set_next<F: FnOnce(&S) -> S>(&self, f: F) -> bool {
        let mut history = self.chain.history();
        let pre = &history[history.len() - 1];
        let post = f(pre);
        if post == *pre {
            return false;
        }
        tracing::debug!(from = ?pre, to = ?post, "status changed");
        history.push(post);
        drop(history);
        self.chain.advanced.notify_all();
        true
    }

    /// Follow the chain from the current status; blocks for each later
    /// status and ends after a stopped one.
    pub fn iter(&self) -> StatusIter<S> {
        let index = self.chain.history().len() - 1;
        StatusIter {
            chain: Arc::clone(&self.chain),
            index,
            first_done: false,
        }
    }

    /// Block until a status matching `pred` appears, starting from the
    /// current one.
    pub fn wait_for<P: FnMut(&S) -> bool>(&self, pred: P) -> Result<S> {
        self.iter().wait_for(pred)
    }
}

pub struct StatusIter<S> {
    chain: Arc<Chain<S>>,
    index: usize,
    first_done: bool,
}

impl<S: Status> StatusIter<S> {
    pub fn wait_for<P: FnMut(&S) -> bool>(&mut self, mut pred: P) -> Result<S> {
        self.find(|s| pred(s)).ok_or(Error::StatusStopped)
    }
}

impl<S: Status> Iterator for StatusIter<S> {
    type Item = S;

    fn next(&mut self) -> Option<S> {
        let history = self.chain.history();
        if !self.first_done {
            self.first_done = true;
            return history.get(self.index).cloned();
        }
        if history.get(self.index).map_or(true, |s| s.is_stopped()) {
            return None;
        }
        let wanted = self.index + 1;
        let history = self
            .chain
            .advanced
            .wait_while(history, |h| h.len() <= wanted)
            .unwrap_or_else(PoisonError::into_inner);
        self.index = wanted;
        history.get(wanted).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Phase {
        Idle,
        Running(u32),
        Stopped,
    }

    impl Status for Phase {
        fn is_stopped(&self) -> bool {
            *self == Phase::Stopped
        }
    }

    #[test]
    fn test_set_next_ignores_equal_status() {
        let p = StatusProvider::new(Phase::Idle);
        assert!(!p.set_next(|_| Phase::Idle));
        assert!(p.set_next(|_| Phase::Running(1)));
        assert_eq!(p.status(), Phase::Running(1));
    }

    #[test]
    fn test_iter_yields_current_then_later_statuses() {
        let p = StatusProvider::new(Phase::Idle);
        p.set_next(|_| Phase::Running(1));
        let it = p.iter();
        p.set_next(|_| Phase::Running(2));
        p.set_next(|_| Phase::Stopped);
        p.set_next(|_| Phase::Idle);
        let seen: Vec<Phase> = it.collect();
        assert_eq!(seen, vec![Phase::Running(1), Phase::Running(2), Phase::Stopped]);
    }

    #[test]
    fn test_wait_for_blocks_until_status_arrives() {
        let p = StatusProvider::new(Phase::Idle);
        let producer = p.clone();
        let handle = std::thread::spawn(move || {
            for n in 1..=3 {
                std::thread::sleep(Duration::from_millis(5));
                producer.set_next(|_| Phase::Running(n));
            }
            producer.set_next(|_| Phase::Stopped);
        });
        let found = p.wait_for(|s| *s == Phase::Running(3)).unwrap();
        assert_eq!(found, Phase::Running(3));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_for_fails_once_stopped() {
        let p = StatusProvider::new(Phase::Idle);
        p.set_next(|_| Phase::Stopped);
        assert!(matches!(p.wait_for(|s| *s == Phase::Running(9)), Err(Error::StatusStopped)));
    }
}
