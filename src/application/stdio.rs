use crate::application::orchestrator::{ConversationOrchestrator, QueryOutcome};
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const QUIT_COMMAND: &str = "quit";

/// Runs the interactive loop on the process's stdin/stdout.
pub async fn run(orchestrator: &ConversationOrchestrator) -> Result<(), StdioError> {
    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    run_with_io(orchestrator, stdin, &mut stdout).await
}

/// Reads one query per line until `quit` or end of input. Query failures
/// are printed and the loop keeps going.
pub async fn run_with_io<R, W>(
    orchestrator: &ConversationOrchestrator,
    input: R,
    output: &mut W,
) -> Result<(), StdioError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    write_line(output, "\nMCP Client Started!").await?;
    write_line(output, "Type your queries or 'quit' to exit.").await?;

    loop {
        prompt(output).await?;
        let Some(line) = lines.next_line().await? else {
            debug!("stdin closed; leaving interactive loop");
            write_line(output, "").await?;
            break;
        };

        let query = line.trim();
        if query.eq_ignore_ascii_case(QUIT_COMMAND) {
            info!("Quit requested");
            break;
        }

        match orchestrator.process_query(query).await {
            Ok(outcome) => {
                write_line(output, &format!("\n{}", render_outcome(&outcome))).await?;
            }
            Err(err) => {
                error!(%err, "Query failed");
                write_line(output, &format!("\nError: {}", err.user_message())).await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}

/// Prints the tools advertised right after connecting.
pub async fn print_connected<W>(output: &mut W, tools: &[String]) -> Result<(), StdioError>
where
    W: AsyncWrite + Unpin,
{
    let names: Vec<String> = tools.iter().map(|name| format!("'{name}'")).collect();
    write_line(
        output,
        &format!("\nConnected to server with tools: [{}]", names.join(", ")),
    )
    .await
}

fn render_outcome(outcome: &QueryOutcome) -> String {
    let mut parts: Vec<&str> = outcome.trace.iter().map(String::as_str).collect();
    parts.push(&outcome.answer);
    parts.join("\n")
}

async fn prompt<W: AsyncWrite + Unpin>(output: &mut W) -> Result<(), StdioError> {
    output.write_all(b"\nQuery: ").await?;
    output.flush().await?;
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<(), StdioError> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gateway::ChatGateway;
    use crate::application::orchestrator::OrchestratorOptions;
    use crate::application::tooling::{ConnectError, ToolServerError, ToolServerSession};
    use crate::infrastructure::model::{
        ChatBackend, ChatBackendError, ChunkStream, ModelRequest, ModelResponse, RawToolCall,
    };
    use crate::types::{ContentBlock, ToolDescriptor, ToolResult};
    use async_trait::async_trait;
    use serde_json::{Map as JsonMap, Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the user query back, fails on `break` and asks for the
    /// forecast tool on `forecast`.
    #[derive(Default)]
    struct EchoBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for EchoBackend {
        fn id(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ChatBackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let query = request
                .messages
                .last()
                .map(|message| message.content_str().to_string())
                .unwrap_or_default();
            if query == "break" {
                return Err(ChatBackendError::backend("echo", "model not found"));
            }
            if query == "forecast" {
                return Ok(ModelResponse {
                    content: None,
                    tool_calls: vec![RawToolCall::new(
                        "get_forecast",
                        json!({"latitude": 47.6, "longitude": -122.3}),
                    )],
                });
            }
            Ok(ModelResponse::text(format!("echo: {query}")))
        }

        async fn chat_stream(
            &self,
            _request: ModelRequest,
        ) -> Result<ChunkStream, ChatBackendError> {
            Err(ChatBackendError::backend("echo", "not scripted"))
        }
    }

    /// Advertises nothing and fails every call.
    struct NoTools;

    #[async_trait]
    impl ToolServerSession for NoTools {
        async fn initialize(&self) -> Result<(), ConnectError> {
            Ok(())
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolServerError> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: JsonMap<String, Value>,
        ) -> Result<ToolResult, ToolServerError> {
            Ok(ToolResult::failure(vec![ContentBlock::text(
                "Unable to fetch forecast data for this location.",
            )]))
        }

        async fn shutdown(&self) {}
    }

    async fn drive(input: &str) -> (String, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend::default());
        let gateway = ChatGateway::new(backend.clone(), "test-model", 1024);
        let orchestrator = ConversationOrchestrator::new(
            Arc::new(NoTools),
            gateway,
            OrchestratorOptions::default(),
        );
        let mut output = Vec::new();
        run_with_io(&orchestrator, input.as_bytes(), &mut output)
            .await
            .expect("loop runs");
        (String::from_utf8(output).expect("utf8 output"), backend)
    }

    #[tokio::test]
    async fn answers_queries_until_quit() {
        let (output, backend) = drive("hello\nQUIT\nnever sent\n").await;

        assert!(output.starts_with(
            "\nMCP Client Started!\nType your queries or 'quit' to exit.\n"
        ));
        assert!(output.contains("\nQuery: \necho: hello\n"));
        assert!(!output.contains("never sent"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_lines_are_sent_as_empty_queries() {
        let (output, backend) = drive("  \nquit\n").await;

        assert!(output.contains("\nQuery: \necho: \n"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_tool_call_prints_only_the_template() {
        let (output, backend) = drive("forecast\nquit\n").await;

        assert_eq!(
            output,
            "\nMCP Client Started!\nType your queries or 'quit' to exit.\n\
             \nQuery: \nfunction call for get_forecast failed with arguments \
             {'latitude': 47.6, 'longitude': -122.3}\n\
             \nQuery: "
        );
        assert!(!output.contains("[Calling tool"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_printed_and_the_loop_continues() {
        let (output, backend) = drive("break\nhello again\n").await;

        assert!(output.contains("\nError: Provider 'echo' failed: model not found\n"));
        assert!(output.contains("echo: hello again"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn end_of_input_exits_cleanly() {
        let (output, backend) = drive("").await;

        assert!(output.ends_with("\nQuery: \n"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connected_banner_lists_tools() {
        let mut output = Vec::new();
        print_connected(
            &mut output,
            &["get_alerts".to_string(), "get_forecast".to_string()],
        )
        .await
        .expect("banner");

        assert_eq!(
            String::from_utf8(output).expect("utf8"),
            "\nConnected to server with tools: ['get_alerts', 'get_forecast']\n"
        );
    }

    #[test]
    fn trace_lines_precede_the_answer() {
        let outcome = QueryOutcome {
            answer: "No alerts.".into(),
            trace: vec!["[Calling tool get_alerts with args {'state': 'WA'}]".into()],
            phases: Vec::new(),
            tool_call: None,
        };
        assert_eq!(
            render_outcome(&outcome),
            "[Calling tool get_alerts with args {'state': 'WA'}]\nNo alerts."
        );
    }
}
