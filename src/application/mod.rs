//! # Application Module
//!
//! Core query handling for the client.
//!
//! ## Submodules
//!
//! - [`tooling`] - Tool-server session, catalogue and invocation
//! - [`gateway`] - Decision and summarization calls to the chat backend
//! - [`orchestrator`] - Per-query tool-calling state machine
//! - [`stdio`] - Interactive prompt on stdin/stdout

pub mod gateway;
pub mod orchestrator;
pub mod stdio;
pub mod tooling;
