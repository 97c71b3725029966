//! Model traits

use super::types::{ChatBackendError, ChunkStream, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// Chat completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Identifier used in logs and error messages.
    fn id(&self) -> &str;

    /// One buffered completion call.
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ChatBackendError>;

    /// One streamed completion call. Errors before the first byte are
    /// returned directly; later failures arrive as stream items.
    async fn chat_stream(&self, request: ModelRequest) -> Result<ChunkStream, ChatBackendError>;
}
