// Config loading tests - AppConfig::load parsing, defaults and validation errors.

use ollama_mcp_client::config::{AppConfig, ConfigError};
use ollama_mcp_client::constants::{DEFAULT_CONTEXT_WINDOW, DEFAULT_MODEL};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("client.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn returns_error_when_file_not_found() {
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/client.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn empty_file_yields_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "");

    let config = AppConfig::load(Some(&path)).expect("defaults");

    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.context_window, DEFAULT_CONTEXT_WINDOW);
    assert!(config.system_prompt.is_none());
    assert!(config.chat_timeout.is_none());
    assert!(config.tool_timeout.is_none());
}

#[test]
fn reads_all_keys() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
model = "qwen2.5:7b"
ollama_url = "http://gpu-box:11434"
context_window = 4096
system_prompt = "You are a helpful weather assistant."
chat_timeout_secs = 120
tool_timeout_secs = 30

[launcher]
python = "/opt/venv/bin/python"
node = "/usr/bin/node"
args = ["-u"]
workdir = "/srv/servers"

[launcher.env]
NWS_USER_AGENT = "weather-app/1.0"
"#,
    );

    let config = AppConfig::load(Some(&path)).expect("valid config");

    assert_eq!(config.model, "qwen2.5:7b");
    assert_eq!(config.ollama_url, "http://gpu-box:11434");
    assert_eq!(config.context_window, 4096);
    assert_eq!(
        config.system_prompt.as_deref(),
        Some("You are a helpful weather assistant.")
    );
    assert_eq!(config.chat_timeout, Some(Duration::from_secs(120)));
    assert_eq!(config.tool_timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.launcher.python, PathBuf::from("/opt/venv/bin/python"));
    assert_eq!(config.launcher.args, vec!["-u".to_string()]);
    assert_eq!(config.launcher.workdir, Some(PathBuf::from("/srv/servers")));
    assert_eq!(
        config.launcher.env.get("NWS_USER_AGENT").map(String::as_str),
        Some("weather-app/1.0")
    );
}

#[test]
fn blank_system_prompt_is_ignored() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "system_prompt = \"   \"\n");

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert!(config.system_prompt.is_none());
}

#[test]
fn returns_error_when_model_empty() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "model = \"\"\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::EmptyModel)));
}

#[test]
fn returns_error_when_context_window_zero() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "context_window = 0\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::InvalidContextWindow)));
}

#[test]
fn returns_error_when_timeout_zero() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "tool_timeout_secs = 0\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidTimeout {
            field: "tool_timeout_secs"
        })
    ));
}

#[test]
fn returns_parse_error_for_unknown_keys() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "default_provider = \"ollama\"\n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn returns_parse_error_for_invalid_toml() {
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "model = \n");

    let result = AppConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
#[serial]
fn expands_environment_in_launcher_paths() {
    unsafe {
        std::env::set_var("MCP_TEST_VENV", "/home/tester/.venv");
    }
    let dir = tempdir().expect("tempdir");
    let path = write_config(
        dir.path(),
        r#"
[launcher]
python = "${MCP_TEST_VENV}/bin/python"
"#,
    );

    let config = AppConfig::load(Some(&path)).expect("valid config");
    assert_eq!(
        config.launcher.python,
        PathBuf::from("/home/tester/.venv/bin/python")
    );

    unsafe {
        std::env::remove_var("MCP_TEST_VENV");
    }
}
