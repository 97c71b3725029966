use super::error::{ConnectError, ToolServerError};
use super::interface::ToolServerSession;
use crate::config::ServerConfig;
use crate::types::{ToolDescriptor, ToolResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2025-06-18";
const METHOD_NOT_FOUND: i64 = -32601;

type RpcOutcome = Result<Value, ToolServerError>;

/// MCP session with a child process speaking newline-delimited JSON-RPC 2.0
/// on its stdin/stdout. The child is killed when the last handle drops.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<Session>,
}

struct Session {
    server: ServerConfig,
    child: AsyncMutex<Option<Child>>,
    stdin: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    waiting: AsyncMutex<HashMap<String, oneshot::Sender<RpcOutcome>>>,
    next_id: AtomicU64,
}

impl McpProcess {
    pub fn new(server: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Session {
                server,
                child: AsyncMutex::new(None),
                stdin: AsyncMutex::new(None),
                waiting: AsyncMutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

#[async_trait]
impl ToolServerSession for McpProcess {
    async fn initialize(&self) -> Result<(), ConnectError> {
        self.inner.launch().await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        self.inner.require_running().await?;
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match cursor.take() {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let page = self.inner.request("tools/list", params).await?;
            let (batch, next) = parse_tool_page(&page);
            tools.extend(batch);
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(server = %self.inner.server.name, count = tools.len(), "Listed tools");
        Ok(tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolResult, ToolServerError> {
        self.inner.require_running().await?;
        let params = json!({
            "name": name,
            "arguments": Value::Object(arguments),
        });
        let result = self.inner.request("tools/call", params).await?;
        Ok(ToolResult::from_value(&result))
    }

    async fn shutdown(&self) {
        self.inner.stop().await;
    }
}

impl Session {
    async fn require_running(&self) -> Result<(), ToolServerError> {
        match self.child.lock().await.as_ref() {
            Some(_) => Ok(()),
            None => Err(ToolServerError::NotInitialized {
                server: self.server.name.clone(),
            }),
        }
    }

    async fn launch(self: &Arc<Self>) -> Result<(), ConnectError> {
        if self.child.lock().await.is_some() {
            return Ok(());
        }

        let mut command = Command::new(&self.server.command);
        command
            .args(&self.server.args)
            .envs(&self.server.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }

        info!(
            server = %self.server.name,
            command = %self.server.command.display(),
            args = ?self.server.args,
            "Starting tool server"
        );
        let mut child = command.spawn().map_err(|source| {
            ConnectError::Launch(ToolServerError::Spawn {
                server: self.server.name.clone(),
                source,
            })
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill().await;
            return Err(ConnectError::Launch(
                self.transport_error("child process has no stdio pipes"),
            ));
        };
        *self.stdin.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);

        let pump = Arc::clone(self);
        tokio::spawn(async move { pump.pump(stdout).await });

        if let Err(err) = self.handshake().await {
            self.stop().await;
            return Err(ConnectError::Initialize(err));
        }
        Ok(())
    }

    async fn handshake(&self) -> Result<(), ToolServerError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let accepted = self.request("initialize", params).await?;
        let protocol = accepted.get("protocolVersion").and_then(Value::as_str);
        let peer = accepted.get("serverInfo").cloned().unwrap_or(Value::Null);
        info!(
            server = %self.server.name,
            protocol,
            peer = %peer,
            "Tool server accepted handshake"
        );
        if let Some(text) = accepted.get("instructions").and_then(Value::as_str) {
            debug!(server = %self.server.name, instructions = text, "Tool server instructions");
        }
        self.write_frame(&Frame::notification("notifications/initialized", json!({})))
            .await
    }

    /// Reads stdout until the child closes it, then tears the session down.
    async fn pump(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            // Some servers print coloured log lines on stdout.
            if line.is_empty() || line.starts_with('\u{1b}') {
                continue;
            }
            let value = match serde_json::from_str::<Value>(line) {
                Ok(value) => value,
                Err(err) => {
                    warn!(server = %self.server.name, line, %err, "Ignoring non-JSON line");
                    continue;
                }
            };
            if let Err(err) = self.dispatch(classify(value)).await {
                warn!(server = %self.server.name, %err, "Failed to handle tool server message");
            }
        }
        debug!(server = %self.server.name, "Tool server closed stdout");
        self.stop().await;
    }

    async fn dispatch(&self, inbound: Inbound) -> Result<(), ToolServerError> {
        match inbound {
            Inbound::Reply { key, outcome } => {
                let Some(waiter) = self.waiting.lock().await.remove(&key) else {
                    debug!(server = %self.server.name, id = %key, "Reply for unknown request");
                    return Ok(());
                };
                let outcome = outcome.map_err(|(code, message)| ToolServerError::Rpc {
                    server: self.server.name.clone(),
                    code,
                    message,
                });
                let _ = waiter.send(outcome);
                Ok(())
            }
            Inbound::ServerRequest { id, method } if method == "ping" => {
                self.write_frame(&Frame::reply(id, json!({}))).await
            }
            Inbound::ServerRequest { id, method } => {
                warn!(server = %self.server.name, method = %method, "Rejecting server request");
                let message = format!("client does not implement method '{method}'");
                self.write_frame(&Frame::reject(id, METHOD_NOT_FOUND, &message))
                    .await
            }
            Inbound::Notification { method } if method == "notifications/tools/list_changed" => {
                info!(
                    server = %self.server.name,
                    "Tool list changed; the next query picks it up"
                );
                Ok(())
            }
            Inbound::Notification { method } => {
                debug!(server = %self.server.name, method = %method, "Tool server notification");
                Ok(())
            }
            Inbound::Unrecognized => {
                debug!(server = %self.server.name, "Ignoring message without id or method");
                Ok(())
            }
        }
    }

    async fn request(&self, method: &str, params: Value) -> RpcOutcome {
        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(id.clone(), tx);

        if let Err(err) = self.write_frame(&Frame::request(&id, method, params)).await {
            self.waiting.lock().await.remove(&id);
            return Err(err);
        }

        rx.await.unwrap_or_else(|_| {
            Err(ToolServerError::Cancelled {
                server: self.server.name.clone(),
            })
        })
    }

    async fn write_frame(&self, frame: &Frame<'_>) -> Result<(), ToolServerError> {
        let mut line = serde_json::to_vec(frame).map_err(|source| ToolServerError::InvalidJson {
            server: self.server.name.clone(),
            source,
        })?;
        line.push(b'\n');

        let mut stdin = self.stdin.lock().await;
        let Some(pipe) = stdin.as_mut() else {
            return Err(ToolServerError::Terminated {
                server: self.server.name.clone(),
            });
        };
        pipe.write_all(&line)
            .await
            .map_err(|err| self.transport_error(err.to_string()))?;
        pipe.flush()
            .await
            .map_err(|err| self.transport_error(err.to_string()))
    }

    /// Closes stdin, kills the child and fails every outstanding request.
    async fn stop(&self) {
        self.stdin.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(server = %self.server.name, %err, "Tool server already exited");
            }
            let _ = child.wait().await;
            info!(server = %self.server.name, "Tool server stopped");
        }

        let waiting: Vec<_> = self.waiting.lock().await.drain().collect();
        for (_, waiter) in waiting {
            let _ = waiter.send(Err(ToolServerError::Terminated {
                server: self.server.name.clone(),
            }));
        }
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolServerError {
        ToolServerError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

/// One outbound JSON-RPC line.
#[derive(Debug, Serialize)]
struct Frame<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl<'a> Frame<'a> {
    fn empty() -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    fn request(id: &str, method: &'a str, params: Value) -> Self {
        Self {
            id: Some(Value::String(id.to_string())),
            method: Some(method),
            params: Some(params),
            ..Self::empty()
        }
    }

    fn notification(method: &'a str, params: Value) -> Self {
        Self {
            method: Some(method),
            params: Some(params),
            ..Self::empty()
        }
    }

    fn reply(id: Value, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    fn reject(id: Value, code: i64, message: &str) -> Self {
        Self {
            id: Some(id),
            error: Some(json!({ "code": code, "message": message })),
            ..Self::empty()
        }
    }
}

/// One inbound JSON-RPC message, sorted by kind.
#[derive(Debug, PartialEq)]
enum Inbound {
    Reply {
        key: String,
        outcome: Result<Value, (i64, String)>,
    },
    ServerRequest {
        id: Value,
        method: String,
    },
    Notification {
        method: String,
    },
    Unrecognized,
}

fn classify(mut value: Value) -> Inbound {
    let method = value
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_string);
    let id = value.get_mut("id").map(Value::take).filter(|id| !id.is_null());

    match (id, method) {
        (Some(id), Some(method)) => Inbound::ServerRequest { id, method },
        (None, Some(method)) => Inbound::Notification { method },
        (Some(id), None) => {
            let key = match id {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                _ => return Inbound::Unrecognized,
            };
            let result = value.get_mut("result").map(Value::take);
            let outcome = match value.get("error") {
                Some(error) => Err((
                    error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                )),
                None => Ok(result.unwrap_or(Value::Null)),
            };
            Inbound::Reply { key, outcome }
        }
        (None, None) => Inbound::Unrecognized,
    }
}

/// Reads one `tools/list` page. Entries without a name are skipped.
fn parse_tool_page(page: &Value) -> (Vec<ToolDescriptor>, Option<String>) {
    let tools = page
        .get("tools")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let name = entry.get("name").and_then(Value::as_str)?;
                    Some(ToolDescriptor {
                        name: name.to_string(),
                        description: entry
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        input_schema: entry.get("inputSchema").cloned(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let next = page
        .get("nextCursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string);
    (tools, next)
}
