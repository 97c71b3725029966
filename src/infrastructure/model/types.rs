//! Model types - Request, Response, and Error types

use crate::types::{ChatMessage, FunctionSpec};
use futures::stream::BoxStream;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Model request for LLM chat
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// `None` sends no catalog at all; `Some(vec![])` sends an empty one.
    pub tools: Option<Vec<FunctionSpec>>,
    pub context_window: Option<u32>,
}

/// Buffered model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

impl ModelResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// Tool call exactly as the backend reported it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: RawFunctionCall,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    /// Either an object or a JSON-encoded string, depending on the backend.
    #[serde(default)]
    pub arguments: Value,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            function: RawFunctionCall {
                name: Some(name.into()),
                arguments,
            },
        }
    }
}

/// Ordered text fragments of a streamed completion.
pub type ChunkStream = BoxStream<'static, Result<String, ChatBackendError>>;

/// Chat backend errors
#[derive(Debug, Error)]
pub enum ChatBackendError {
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
    #[error("provider '{provider}' reported an error: {message}")]
    Backend { provider: String, message: String },
}

impl ChatBackendError {
    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ChatBackendError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Cannot reach model provider '{provider}'. Is it running?")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else if let Some(status) = source.status() {
                    match status {
                        StatusCode::NOT_FOUND => {
                            format!("Provider '{provider}' does not know the requested model.")
                        }
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            format!("Provider '{provider}' is currently unavailable.")
                        }
                        _ => format!("Request to '{provider}' failed: {}", status.as_u16()),
                    }
                } else {
                    format!("Network error talking to '{provider}'.")
                }
            }
            ChatBackendError::InvalidResponse { provider, .. } => {
                format!("Provider '{provider}' returned a response that could not be read.")
            }
            ChatBackendError::Backend { provider, message } => {
                format!("Provider '{provider}' failed: {message}")
            }
        }
    }
}
