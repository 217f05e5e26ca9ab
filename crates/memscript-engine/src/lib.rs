//! Memscript execution engine
//!
//! Runs one agent-supplied script per request inside an allow-listed
//! environment. The callable surface is exactly: the `graph` tool namespace,
//! `log`, `sleep`, and a fixed table of data builtins. The language has no
//! file, process, or network primitive, so there is nothing to subtract; the
//! sandbox is the language.
//!
//! Pipeline: lexer (logos) -> recursive-descent parser -> async tree-walking
//! evaluator, raced against a wall-clock budget.

pub mod ast;
pub mod capture;
pub mod engine;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod report;

pub use capture::OutputSink;
pub use engine::{Engine, EngineConfig, ExecuteOptions};
pub use parser::parse;
pub use report::{normalize, RawOutcome};
