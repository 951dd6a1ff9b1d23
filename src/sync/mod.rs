//! Concurrency helpers built on the merge protocol.

pub mod concurrent;
pub mod context;
pub mod mutation;
pub mod status;

pub use concurrent::{parallel_update, Concurrent};
pub use context::{Context, ContextGuard};
pub use mutation::MutationWrapper;
pub use status::{Status, StatusIter, StatusProvider};
