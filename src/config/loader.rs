use super::app::AppConfig;
use super::error::ConfigError;
use super::server::{LauncherConfig, RawLauncher};
use crate::constants::{CONFIG_PATH, ENV_PATH};
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, info};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct RawConfig {
    pub model: Option<String>,
    pub ollama_url: Option<String>,
    pub context_window: Option<u32>,
    pub system_prompt: Option<String>,
    pub chat_timeout_secs: Option<u64>,
    pub tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub launcher: RawLauncher,
}

/// Ensures environment variables are loaded from `.env`
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    match path {
        Some(path) => read_config(path),
        None => match read_config(Path::new(CONFIG_PATH)) {
            Err(ConfigError::NotFound { .. }) => {
                info!("Configuration file not found; using defaults");
                Ok(AppConfig::default())
            }
            other => other,
        },
    }
}

/// Parse configuration from TOML text
pub fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_and_build(parsed)
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

fn validate_and_build(parsed: RawConfig) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let config = AppConfig {
        model: parsed.model.unwrap_or(defaults.model),
        ollama_url: parsed.ollama_url.unwrap_or(defaults.ollama_url),
        context_window: parsed.context_window.unwrap_or(defaults.context_window),
        system_prompt: parsed
            .system_prompt
            .filter(|prompt| !prompt.trim().is_empty()),
        chat_timeout: timeout("chat_timeout_secs", parsed.chat_timeout_secs)?,
        tool_timeout: timeout("tool_timeout_secs", parsed.tool_timeout_secs)?,
        launcher: LauncherConfig::from(parsed.launcher),
    };
    config.validate()?;
    Ok(config)
}

fn timeout(field: &'static str, secs: Option<u64>) -> Result<Option<Duration>, ConfigError> {
    match secs {
        Some(0) => Err(ConfigError::InvalidTimeout { field }),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
