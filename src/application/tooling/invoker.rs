use super::catalog::ToolCatalog;
use super::error::ToolServerError;
use super::interface::ToolServerSession;
use crate::types::{ToolCallRequest, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatches tool calls through the session.
pub struct ToolInvoker {
    session: Arc<dyn ToolServerSession>,
    catalog: Arc<ToolCatalog>,
}

impl ToolInvoker {
    pub fn new(session: Arc<dyn ToolServerSession>, catalog: Arc<ToolCatalog>) -> Self {
        Self { session, catalog }
    }

    /// Calls the named tool. Names missing from the last catalogue snapshot
    /// are still forwarded; the server decides whether they exist.
    pub async fn invoke(&self, request: &ToolCallRequest) -> Result<ToolResult, ToolServerError> {
        if !self.catalog.contains(&request.name).await {
            warn!(
                tool = %request.name,
                call_id = %request.id,
                "Model requested a tool the server did not advertise"
            );
        }

        debug!(
            tool = %request.name,
            call_id = %request.id,
            arguments = %request.arguments_literal(),
            "Invoking tool"
        );
        let result = self
            .session
            .call_tool(&request.name, request.arguments.clone())
            .await?;
        debug!(
            tool = %request.name,
            is_error = result.is_error,
            blocks = result.content.len(),
            "Tool returned"
        );
        Ok(result)
    }
}
