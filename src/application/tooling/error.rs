use std::path::PathBuf;
use thiserror::Error;

/// Transport-level failure of a tool-server call. A tool that reports
/// `isError` is not one of these.
#[derive(Debug, Error)]
pub enum ToolServerError {
    #[error("tool server '{server}' has not been initialised")]
    NotInitialized { server: String },
    #[error("could not start tool server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("tool server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("tool server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("tool server '{server}' request cancelled")]
    Cancelled { server: String },
}

impl ToolServerError {
    pub fn user_message(&self) -> String {
        match self {
            ToolServerError::NotInitialized { .. } => {
                "The tool server is not connected yet.".to_string()
            }
            ToolServerError::Spawn { server, source } => {
                format!("Could not start tool server '{server}': {source}")
            }
            ToolServerError::Rpc { message, .. } => format!("Tool server error: {message}"),
            ToolServerError::Terminated { server } => {
                format!("Tool server '{server}' exited. Restart the client to reconnect.")
            }
            other => other.to_string(),
        }
    }
}

/// Failure to bring the tool server up. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Server script must be a .py or .js file (got {path:?})")]
    UnsupportedTarget { path: PathBuf },
    #[error("could not launch tool server: {0}")]
    Launch(#[source] ToolServerError),
    #[error("tool server did not complete the MCP handshake: {0}")]
    Initialize(#[source] ToolServerError),
}
