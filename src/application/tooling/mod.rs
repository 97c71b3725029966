pub mod catalog;
pub mod error;
pub mod interface;
pub mod invoker;
pub mod launcher;
pub mod process;

pub use catalog::{ToolCatalog, to_chat_schema};
pub use error::{ConnectError, ToolServerError};
pub use interface::ToolServerSession;
pub use invoker::ToolInvoker;
pub use launcher::resolve_server;
pub use process::McpProcess;
