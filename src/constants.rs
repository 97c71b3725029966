//! Application constants
//!
//! Single source of truth for paths and other constants.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/client.toml";

/// Environment file loaded once at startup
pub const ENV_PATH: &str = ".env";

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default chat model (must support function calling)
pub const DEFAULT_MODEL: &str = "llama3.2:3b-instruct-fp16";

/// Context window for the summarization call; the smallest window the
/// default model supports.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 1024;

/// Interpreter used for `.py` server scripts
pub const DEFAULT_PYTHON: &str = "python";

/// Interpreter used for `.js` server scripts
pub const DEFAULT_NODE: &str = "node";
