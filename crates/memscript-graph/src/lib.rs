//! Memscript graph store — entities, relations, and the nine data operations
//!
//! The store is deliberately permissive: mutations against missing targets
//! skip rather than fail, so batch scripts can loop over names without
//! existence checks. That contract is load-bearing; see the doc comments on
//! the individual operations.

pub mod loader;
pub mod memory;
pub mod store;

pub use loader::{load_graph, save_graph};
pub use memory::{GraphStore, MemoryStore};
pub use store::Store;
