use super::error::{ConnectError, ToolServerError};
use crate::types::{ToolDescriptor, ToolResult};
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};

/// Typed session with one tool server.
#[async_trait]
pub trait ToolServerSession: Send + Sync {
    /// Launches (if needed) and performs the protocol handshake.
    async fn initialize(&self) -> Result<(), ConnectError>;

    /// Fetches the tools the server currently advertises, in server order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolResult, ToolServerError>;

    /// Releases the session. Safe to call more than once.
    async fn shutdown(&self);
}
