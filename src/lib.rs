//! Immutable collections with structural sharing.
//!
//! Hash sets, maps, default maps, qualified sets, lists and graphs that share
//! structure between versions and fold concurrent branches back together by
//! three-way merge. Ships fixed-arity record types generated at build time.

pub mod cli;
pub mod codegen;
pub mod collections;
pub mod config;
pub mod core;
pub mod error;
pub mod structs;
pub mod sync;

pub use collections::{CollectionExt, DefaultMap, Graph, List, Map, QualifiedSet, Set};
pub use crate::core::mergeable::Mergeable;
pub use error::{Error, Result};
