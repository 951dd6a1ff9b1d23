//! Three-way merge of values that diverged from a common base.

use crate::error::{Error, Result};
use std::fmt::Debug;

/// A value that can fold concurrent branches back into one.
pub trait Mergeable: Clone + PartialEq {
    /// The neutral value of the same kind, standing in for a branch that has
    /// no value at all.
    fn merger(&self) -> Self;

    /// Merge `branches`, which all started from `self`.
    fn merge(&self, branches: &[Self]) -> Result<Self>;

    fn merge2(&self, a: &Self, b: &Self) -> Result<Self> {
        self.merge(&[a.clone(), b.clone()])
    }
}

/// Drop branches equal to the base or to an earlier branch, then resolve.
///
/// With no branch left the base wins, with one left that branch wins;
/// only genuinely divergent branches reach `merger`.
pub fn merge_branches<T, F>(base: &T, branches: &[T], merger: F) -> Result<T>
where
    T: Clone + PartialEq,
    F: FnOnce(&T, &[T]) -> Result<T>,
{
    let mut distinct: Vec<T> = Vec::with_capacity(branches.len());
    for branch in branches {
        if branch != base && !distinct.contains(branch) {
            distinct.push(branch.clone());
        }
    }
    match distinct.as_slice() {
        [] => Ok(base.clone()),
        [only] => Ok(only.clone()),
        _ => merger(base, &distinct),
    }
}

/// Merge plain values: succeeds only when at most one branch diverged.
pub fn merge_values<T: Clone + PartialEq + Debug>(base: &T, branches: &[T]) -> Result<T> {
    merge_branches(base, branches, |b, bs| {
        tracing::debug!(base = ?b, branches = ?bs, "conflicting branches");
        Err(Error::NotMergeable(format!("{:?} -> {:?}", b, bs)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_branches_returns_base() {
        assert_eq!(merge_values(&1, &[]).unwrap(), 1);
        assert_eq!(merge_values(&1, &[1, 1]).unwrap(), 1);
    }

    #[test]
    fn test_single_divergent_branch_wins() {
        assert_eq!(merge_values(&1, &[1, 2, 2]).unwrap(), 2);
    }

    #[test]
    fn test_conflict_is_not_mergeable() {
        let err = merge_values(&1, &[2, 3]).unwrap_err();
        assert!(matches!(err, Error::NotMergeable(_)));
        assert!(err.to_string().contains("1 -> [2, 3]"));
    }

    #[test]
    fn test_merger_sees_distinct_branches_only() {
        let r = merge_branches(&0, &[0, 4, 5, 4], |b, bs| {
            assert_eq!(bs, &[4, 5]);
            Ok(b + bs.iter().sum::<i32>())
        });
        assert_eq!(r.unwrap(), 9);
    }
}
