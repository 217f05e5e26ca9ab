//! Memscript tool binding layer
//!
//! Exposes the nine graph capabilities to the execution engine under one
//! namespace, and nothing else. Dispatch is a closed enum, one variant per
//! operation; an unknown name never reaches the store.

pub mod binding;

pub use binding::{ToolBinding, ToolOp};
