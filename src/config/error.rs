use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("'model' must not be empty")]
    EmptyModel,

    #[error("'ollama_url' must not be empty")]
    EmptyEndpoint,

    #[error("'context_window' must be greater than zero")]
    InvalidContextWindow,

    #[error("'{field}' must be greater than zero seconds")]
    InvalidTimeout { field: &'static str },
}
