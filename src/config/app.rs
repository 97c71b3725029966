use super::error::ConfigError;
use super::server::LauncherConfig;
use crate::constants::{DEFAULT_CONTEXT_WINDOW, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from client.toml
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model: String,
    pub ollama_url: String,
    pub context_window: u32,
    pub system_prompt: Option<String>,
    /// `None` waits for the chat backend indefinitely.
    pub chat_timeout: Option<Duration>,
    /// `None` waits for the tool server indefinitely.
    pub tool_timeout: Option<Duration>,
    pub launcher: LauncherConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            system_prompt: None,
            chat_timeout: None,
            tool_timeout: None,
            launcher: LauncherConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None).
    ///
    /// A missing file at the default path yields the built-in defaults; a
    /// missing file at an explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Re-run validation after CLI overrides have been applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.ollama_url.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.context_window == 0 {
            return Err(ConfigError::InvalidContextWindow);
        }
        Ok(())
    }
}
