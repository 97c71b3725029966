use super::error::ToolServerError;
use super::interface::ToolServerSession;
use crate::types::{FunctionDefinition, FunctionSpec, ToolDescriptor};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Live view of the tools a server advertises.
pub struct ToolCatalog {
    session: Arc<dyn ToolServerSession>,
    last_snapshot: Mutex<Vec<String>>,
}

impl ToolCatalog {
    pub fn new(session: Arc<dyn ToolServerSession>) -> Self {
        Self {
            session,
            last_snapshot: Mutex::new(Vec::new()),
        }
    }

    /// Fetches a fresh snapshot from the server. Nothing is cached between
    /// calls except the names, which [`ToolCatalog::contains`] consults.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        let tools = self.session.list_tools().await?;
        let names: Vec<String> = tools.iter().map(|tool| tool.name.clone()).collect();
        debug!(tools = ?names, "Tool catalogue snapshot");
        *self.last_snapshot.lock().await = names;
        Ok(tools)
    }

    /// Whether the most recent snapshot advertised `name` (exact match).
    pub async fn contains(&self, name: &str) -> bool {
        self.last_snapshot
            .lock()
            .await
            .iter()
            .any(|known| known == name)
    }

    pub async fn snapshot_names(&self) -> Vec<String> {
        self.last_snapshot.lock().await.clone()
    }
}

/// Converts descriptors into the chat API's function-call schema, one entry
/// per descriptor and in the same order. Missing descriptions become `""`
/// and missing schemas become `{}`.
pub fn to_chat_schema(descriptors: &[ToolDescriptor]) -> Vec<FunctionSpec> {
    descriptors
        .iter()
        .map(|tool| FunctionSpec {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                parameters: tool.input_schema.clone().unwrap_or_else(|| json!({})),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tooling::error::ConnectError;
    use crate::types::ToolResult;
    use async_trait::async_trait;
    use serde_json::{Map as JsonMap, Value};

    fn weather_tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("get_alerts")
                .with_description("Get weather alerts for a US state.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {"state": {"type": "string"}},
                    "required": ["state"]
                })),
            ToolDescriptor::new("get_forecast"),
        ]
    }

    #[test]
    fn converts_every_descriptor_in_order() {
        let tools = weather_tools();
        let specs = to_chat_schema(&tools);

        assert_eq!(specs.len(), tools.len());
        for (spec, tool) in specs.iter().zip(&tools) {
            assert_eq!(spec.kind, "function");
            assert_eq!(spec.function.name, tool.name);
        }
        assert_eq!(specs[0].function.parameters["required"], json!(["state"]));
    }

    #[test]
    fn fills_missing_description_and_schema() {
        let specs = to_chat_schema(&[ToolDescriptor::new("get_forecast")]);

        assert_eq!(specs[0].function.description, "");
        assert_eq!(specs[0].function.parameters, json!({}));
    }

    #[test]
    fn conversion_is_deterministic() {
        let tools = weather_tools();
        assert_eq!(to_chat_schema(&tools), to_chat_schema(&tools));
        assert!(to_chat_schema(&[]).is_empty());
    }

    #[test]
    fn serializes_in_chat_api_shape() {
        let value = serde_json::to_value(to_chat_schema(&weather_tools())).expect("serialize");
        assert_eq!(value[1]["type"], "function");
        assert_eq!(value[1]["function"]["name"], "get_forecast");
        assert_eq!(value[1]["function"]["parameters"], json!({}));
    }

    struct FixedSession(Vec<ToolDescriptor>);

    #[async_trait]
    impl ToolServerSession for FixedSession {
        async fn initialize(&self) -> Result<(), ConnectError> {
            Ok(())
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
            Ok(self.0.clone())
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: JsonMap<String, Value>,
        ) -> Result<ToolResult, ToolServerError> {
            Ok(ToolResult::default())
        }

        async fn shutdown(&self) {}
    }

    #[tokio::test]
    async fn remembers_names_of_last_snapshot() {
        let catalog = ToolCatalog::new(Arc::new(FixedSession(weather_tools())));
        assert!(!catalog.contains("get_alerts").await);

        let tools = catalog.list_tools().await.expect("list");

        assert_eq!(tools.len(), 2);
        assert!(catalog.contains("get_alerts").await);
        assert!(!catalog.contains("get_alert").await);
        assert_eq!(
            catalog.snapshot_names().await,
            vec!["get_alerts".to_string(), "get_forecast".to_string()]
        );
    }
}
