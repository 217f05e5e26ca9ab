//! Memscript gateway — HTTP transport in front of the engine
//!
//! Deliberately thin: it frames requests and relays outcomes. Even the
//! read-only stats endpoint goes through the engine with a fixed script;
//! there is no side channel into the store.

pub mod server;

pub use server::{start_gateway, AppState};
