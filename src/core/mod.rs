//! Shared hash trie and the merge protocol.

pub mod mergeable;
pub mod trie;
