use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;

#[derive(Parser, Debug, Default)]
#[command(
    name = "mcp-client",
    version,
    about = "Interactive MCP client that lets an Ollama model call tools"
)]
pub struct Cli {
    /// Path to the MCP server script (.py or .js).
    pub server: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub ollama_url: Option<String>,
    #[arg(long)]
    pub context_window: Option<u32>,
    #[arg(long)]
    pub system: Option<String>,
    /// Debug logging unless RUST_LOG is set.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Flags given on the command line win over the configuration file.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama_url = url.clone();
        }
        if let Some(window) = self.context_window {
            config.context_window = window;
        }
        if let Some(system) = &self.system {
            config.system_prompt = Some(system.clone()).filter(|prompt| !prompt.trim().is_empty());
        }
    }
}
