//! Per-query tool-calling loop.
//!
//! A query runs one decision call, at most one tool invocation and at most
//! one streamed summarization call:
//!
//! ```text
//! Start -> AwaitingDecision -> NoToolCall -> Done
//!                           -> ToolCallPending -> Invoking -> Failed -> Done
//!                                                          -> ResultFolded -> AwaitingSummary -> Done
//! ```

mod error;


pub use error::{QueryError, QueryStage};

use crate::application::gateway::ChatGateway;
use crate::application::tooling::{ToolCatalog, ToolInvoker, ToolServerSession, to_chat_schema};
use crate::infrastructure::model::ChatBackendError;
use crate::types::{ChatMessage, ToolCallRequest};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tool calls acted on per decision. Any further calls the model requests
/// in the same response are logged and dropped.
pub const MAX_TOOL_CALLS_PER_ROUND: usize = 1;

/// Answer used when the model produced no text.
pub const EMPTY_ANSWER: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Start,
    AwaitingDecision,
    NoToolCall,
    ToolCallPending,
    Invoking,
    Failed,
    ResultFolded,
    AwaitingSummary,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Seeds the decision call only.
    pub system_prompt: Option<String>,
    pub chat_timeout: Option<Duration>,
    pub tool_timeout: Option<Duration>,
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub answer: String,
    /// Progress lines shown above the answer, e.g. the tool call made.
    pub trace: Vec<String>,
    pub phases: Vec<QueryPhase>,
    pub tool_call: Option<ToolCallRequest>,
}

pub struct ConversationOrchestrator {
    catalog: Arc<ToolCatalog>,
    invoker: ToolInvoker,
    gateway: ChatGateway,
    options: OrchestratorOptions,
}

impl ConversationOrchestrator {
    pub fn new(
        session: Arc<dyn ToolServerSession>,
        gateway: ChatGateway,
        options: OrchestratorOptions,
    ) -> Self {
        let catalog = Arc::new(ToolCatalog::new(Arc::clone(&session)));
        let invoker = ToolInvoker::new(session, Arc::clone(&catalog));
        Self {
            catalog,
            invoker,
            gateway,
            options,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub async fn process_query(&self, query: &str) -> Result<QueryOutcome, QueryError> {
        let mut run = QueryRun::default();
        run.enter(QueryPhase::Start);

        let user = ChatMessage::user(query);
        let mut history = Vec::with_capacity(2);
        if let Some(system) = &self.options.system_prompt {
            history.push(ChatMessage::system(system.as_str()));
        }
        history.push(user.clone());

        let tools = bounded(
            QueryStage::ToolList,
            self.options.tool_timeout,
            self.catalog.list_tools(),
        )
        .await?;
        let schema = to_chat_schema(&tools);

        run.enter(QueryPhase::AwaitingDecision);
        let decision = bounded(
            QueryStage::Decision,
            self.options.chat_timeout,
            self.gateway.decide(&history, &schema),
        )
        .await?;

        let mut calls = decision.tool_calls;
        if calls.len() > MAX_TOOL_CALLS_PER_ROUND {
            let dropped: Vec<String> = calls
                .split_off(MAX_TOOL_CALLS_PER_ROUND)
                .into_iter()
                .map(|call| call.name)
                .collect();
            warn!(?dropped, "Model requested more tool calls than one round allows");
        }

        let Some(request) = calls.into_iter().next() else {
            run.enter(QueryPhase::NoToolCall);
            let answer = decision.content.unwrap_or_else(|| EMPTY_ANSWER.to_string());
            return Ok(run.finish(answer, None));
        };

        run.enter(QueryPhase::ToolCallPending);
        let arguments = request.arguments_literal();
        run.trace(format!("[Calling tool {} with args {}]", request.name, arguments));
        info!(tool = %request.name, call_id = %request.id, "Model requested tool call");

        // The system message only seeds the decision call.
        history = vec![user];
        history.push(ChatMessage::assistant_tool_calls(vec![request.clone()]));

        run.enter(QueryPhase::Invoking);
        let result = bounded(
            QueryStage::ToolCall,
            self.options.tool_timeout,
            self.invoker.invoke(&request),
        )
        .await?;

        if result.is_error {
            run.enter(QueryPhase::Failed);
            // A failed call is reported by the template alone.
            run.trace.clear();
            let answer = format!(
                "function call for {} failed with arguments {}",
                request.name, arguments
            );
            return Ok(run.finish(answer, Some(request)));
        }

        let folded_from = history.len();
        history.extend(result.text_blocks().map(ChatMessage::tool));
        run.enter(QueryPhase::ResultFolded);
        if history.len() == folded_from {
            debug!(tool = %request.name, "Tool returned no text; skipping summarization");
            return Ok(run.finish(EMPTY_ANSWER.to_string(), Some(request)));
        }

        run.enter(QueryPhase::AwaitingSummary);
        let answer = bounded(
            QueryStage::Summary,
            self.options.chat_timeout,
            self.collect_summary(&history),
        )
        .await?;
        Ok(run.finish(answer, Some(request)))
    }

    async fn collect_summary(
        &self,
        history: &[ChatMessage],
    ) -> Result<String, ChatBackendError> {
        let mut stream = self.gateway.summarize(history).await?;
        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            answer.push_str(&chunk?);
        }
        Ok(answer)
    }
}

#[derive(Default)]
struct QueryRun {
    phases: Vec<QueryPhase>,
    trace: Vec<String>,
}

impl QueryRun {
    fn enter(&mut self, phase: QueryPhase) {
        debug!(?phase, "Query phase");
        self.phases.push(phase);
    }

    fn trace(&mut self, line: String) {
        self.trace.push(line);
    }

    fn finish(mut self, answer: String, tool_call: Option<ToolCallRequest>) -> QueryOutcome {
        self.enter(QueryPhase::Done);
        QueryOutcome {
            answer,
            trace: self.trace,
            phases: self.phases,
            tool_call,
        }
    }
}

async fn bounded<T, E, F>(
    stage: QueryStage,
    limit: Option<Duration>,
    future: F,
) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, E>>,
    QueryError: From<E>,
{
    match limit {
        Some(after) => match tokio::time::timeout(after, future).await {
            Ok(result) => result.map_err(QueryError::from),
            Err(_) => Err(QueryError::Timeout { stage, after }),
        },
        None => future.await.map_err(QueryError::from),
    }
}
