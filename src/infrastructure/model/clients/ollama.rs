//! Ollama client implementation

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::stream::decode_chunks;
use crate::infrastructure::model::traits::ChatBackend;
use crate::infrastructure::model::types::{
    ChatBackendError, ChunkStream, ModelRequest, ModelResponse, RawToolCall,
};
use crate::types::FunctionSpec;

const CHAT_PATH: &str = "/api/chat";

/// Ollama client for local LLM
#[derive(Clone)]
pub struct OllamaClient {
    base: HttpClientBase,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            base: HttpClientBase::new("ollama", endpoint),
        }
    }

    fn payload(request: &ModelRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            messages: MessageAdapter::to_ollama_format(&request.messages),
            stream,
            tools: request.tools.clone(),
            options: request
                .context_window
                .map(|num_ctx| OllamaOptions { num_ctx }),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ChatBackendError> {
        let url = self.base.build_url(CHAT_PATH);
        let payload = Self::payload(&request, false);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(Vec::len),
            "Sending request to Ollama"
        );

        let response: OllamaResponse = self.base.post_no_auth(&url, &payload).await?;
        debug!("Received response from Ollama");

        if let Some(message) = response.error {
            return Err(ChatBackendError::backend(&self.base.id, message));
        }
        let message = response
            .message
            .ok_or_else(|| ChatBackendError::invalid_response(&self.base.id, "missing message"))?;

        Ok(ModelResponse {
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
        })
    }

    async fn chat_stream(&self, request: ModelRequest) -> Result<ChunkStream, ChatBackendError> {
        let url = self.base.build_url(CHAT_PATH);
        let payload = Self::payload(&request, true);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            context_window = request.context_window,
            "Sending streaming request to Ollama"
        );

        let response = self.base.post_streaming(&url, &payload).await?;
        let provider = self.base.id.clone();
        let bytes = response.bytes_stream().map(move |item| {
            item.map_err(|source| ChatBackendError::network(provider.clone(), source))
        });

        Ok(decode_chunks(Box::pin(bytes), self.base.id.clone()))
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<FunctionSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<RawToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, FunctionDefinition};
    use serde_json::json;

    fn request(tools: Option<Vec<FunctionSpec>>, context_window: Option<u32>) -> ModelRequest {
        ModelRequest {
            model: "llama3.2:3b-instruct-fp16".into(),
            messages: vec![ChatMessage::user("hi")],
            tools,
            context_window,
        }
    }

    #[test]
    fn empty_catalog_is_sent_as_empty_list() {
        let payload = OllamaClient::payload(&request(Some(Vec::new()), None), false);
        let body = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(body["tools"], json!([]));
        assert!(body.get("options").is_none());
        assert_eq!(body["stream"], json!(false));
    }

    #[test]
    fn streaming_payload_carries_context_window_and_no_tools() {
        let payload = OllamaClient::payload(&request(None, Some(1024)), true);
        let body = serde_json::to_value(&payload).expect("serialize");

        assert!(body.get("tools").is_none());
        assert_eq!(body["options"], json!({"num_ctx": 1024}));
        assert_eq!(body["stream"], json!(true));
    }

    #[test]
    fn function_specs_serialize_in_chat_schema() {
        let spec = FunctionSpec {
            kind: "function".into(),
            function: FunctionDefinition {
                name: "get_forecast".into(),
                description: String::new(),
                parameters: json!({}),
            },
        };
        let payload = OllamaClient::payload(&request(Some(vec![spec]), None), false);
        let body = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(
            body["tools"],
            json!([{"type": "function", "function": {"name": "get_forecast", "description": "", "parameters": {}}}])
        );
    }

    #[test]
    fn parses_tool_call_response() {
        let response: OllamaResponse = serde_json::from_value(json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "get_forecast", "arguments": {"state": "WA"}}}
                ]
            },
            "done": true
        }))
        .expect("deserialize");

        let message = response.message.expect("message");
        let calls = message.tool_calls.expect("tool calls");
        assert_eq!(calls, vec![RawToolCall::new("get_forecast", json!({"state": "WA"}))]);
    }
}
