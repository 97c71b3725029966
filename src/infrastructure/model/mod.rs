//! Model infrastructure module
//!
//! Provides the chat backend used for decision and summarization calls.
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - ChatBackend trait
//! - `adapter` - Message format adapter
//! - `stream` - NDJSON stream decoding
//! - `clients` - Client implementations

pub mod adapter;
pub mod clients;
pub mod stream;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use clients::OllamaClient;
pub use traits::ChatBackend;
pub use types::{
    ChatBackendError, ChunkStream, ModelRequest, ModelResponse, RawFunctionCall, RawToolCall,
};
