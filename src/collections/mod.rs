//! Immutable collections with structural sharing.

pub mod default_map;
pub mod ext;
pub mod graph;
pub mod list;
pub mod map;
pub mod qualified_set;
pub mod set;

pub use default_map::DefaultMap;
pub use ext::CollectionExt;
pub use graph::Graph;
pub use list::List;
pub use map::Map;
pub use qualified_set::QualifiedSet;
pub use set::Set;
