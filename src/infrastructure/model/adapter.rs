//! Message adapters - convert history into the Ollama wire format

use crate::types::ChatMessage;
use serde_json::{Value, json};

/// Adapter for converting messages to the backend's API format
pub struct MessageAdapter;

impl MessageAdapter {
    /// Convert messages to Ollama format
    /// Returns: [{"role": "...", "content": "...", "tool_calls": [...]}]
    ///
    /// Ollama requires `content` to be a string, so a null content is sent
    /// as `""`.
    pub fn to_ollama_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let mut entry = json!({
                    "role": msg.role.as_str(),
                    "content": msg.content_str(),
                });
                if let Some(calls) = msg.tool_calls.as_ref().filter(|calls| !calls.is_empty()) {
                    entry["tool_calls"] = calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                }
                            })
                        })
                        .collect();
                }
                entry
            })
            .collect()
    }
}
