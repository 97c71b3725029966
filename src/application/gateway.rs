use crate::infrastructure::model::{
    ChatBackend, ChatBackendError, ChunkStream, ModelRequest, RawToolCall,
};
use crate::types::{ChatMessage, FunctionSpec, ToolCallRequest, new_call_id};
use serde_json::{Map as JsonMap, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name given to a backend tool call that arrived without one. The tool
/// server rejects it through the normal `isError` path.
pub const MISSING_TOOL_NAME: &str = "no tool found";

/// What the model answered to a decision call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDecision {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatDecision {
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Stateless wrapper over the chat backend for one model.
#[derive(Clone)]
pub struct ChatGateway {
    backend: Arc<dyn ChatBackend>,
    model: String,
    context_window: u32,
}

impl ChatGateway {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        context_window: u32,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            context_window,
        }
    }

    /// One buffered call with the tool catalogue attached. An empty
    /// catalogue is still sent, as an empty list.
    pub async fn decide(
        &self,
        history: &[ChatMessage],
        tools: &[FunctionSpec],
    ) -> Result<ChatDecision, ChatBackendError> {
        let request = ModelRequest {
            model: self.model.clone(),
            messages: history.to_vec(),
            tools: Some(tools.to_vec()),
            context_window: None,
        };
        debug!(
            provider = self.backend.id(),
            model = %self.model,
            messages = history.len(),
            tools = tools.len(),
            "Sending decision call"
        );
        let response = self.backend.chat(request).await?;
        let tool_calls = response
            .tool_calls
            .into_iter()
            .map(decode_tool_call)
            .collect();
        Ok(ChatDecision {
            content: response.content,
            tool_calls,
        })
    }

    /// One streamed call without tools and with the bounded context window.
    pub async fn summarize(
        &self,
        history: &[ChatMessage],
    ) -> Result<ChunkStream, ChatBackendError> {
        let request = ModelRequest {
            model: self.model.clone(),
            messages: history.to_vec(),
            tools: None,
            context_window: Some(self.context_window),
        };
        debug!(
            provider = self.backend.id(),
            model = %self.model,
            messages = history.len(),
            num_ctx = self.context_window,
            "Sending summarization call"
        );
        self.backend.chat_stream(request).await
    }
}

/// Normalizes one backend tool call. Arguments may arrive as an object or as
/// a JSON-encoded string; anything else becomes an empty map.
pub fn decode_tool_call(raw: RawToolCall) -> ToolCallRequest {
    let name = raw
        .function
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| MISSING_TOOL_NAME.to_string());
    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_call_id);
    let arguments = decode_arguments(&name, raw.function.arguments);
    ToolCallRequest::with_id(id, name, arguments)
}

fn decode_arguments(tool: &str, arguments: Value) -> JsonMap<String, Value> {
    match arguments {
        Value::Object(map) => map,
        Value::Null => JsonMap::new(),
        Value::String(text) if text.trim().is_empty() => JsonMap::new(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!(tool, arguments = %other, "Tool arguments were not an object");
                JsonMap::new()
            }
            Err(err) => {
                warn!(tool, %err, "Tool arguments were not valid JSON");
                JsonMap::new()
            }
        },
        other => {
            warn!(tool, arguments = %other, "Tool arguments were not an object");
            JsonMap::new()
        }
    }
}
