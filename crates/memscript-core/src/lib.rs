//! Memscript core — shared types and errors
//!
//! Everything the other crates agree on lives here: the graph data model,
//! the execution outcome record, the wire structs, and the workspace error.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    Entity, ExecuteRequest, ExecuteResponse, ExecutionOutcome, Graph, ObservationAddition,
    ObservationDeletion, ObservationResult, Relation,
};
