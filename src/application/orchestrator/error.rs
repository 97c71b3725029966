use crate::application::tooling::ToolServerError;
use crate::infrastructure::model::ChatBackendError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which external call a query was waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    ToolList,
    Decision,
    ToolCall,
    Summary,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueryStage::ToolList => "listing tools",
            QueryStage::Decision => "decision call",
            QueryStage::ToolCall => "tool call",
            QueryStage::Summary => "summarization call",
        };
        f.write_str(label)
    }
}

/// Failure of one query. The interactive loop reports it and keeps going.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),
    #[error(transparent)]
    ChatBackend(#[from] ChatBackendError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: QueryStage, after: Duration },
}

impl QueryError {
    pub fn user_message(&self) -> String {
        match self {
            QueryError::ToolServer(err) => err.user_message(),
            QueryError::ChatBackend(err) => err.user_message(),
            QueryError::Timeout { stage, after } => {
                format!("The {stage} took longer than {}s.", after.as_secs())
            }
        }
    }
}
