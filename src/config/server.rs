use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::{DEFAULT_NODE, DEFAULT_PYTHON};

/// Fully resolved command line for one tool-server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

/// How server scripts are launched, from the `[launcher]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub python: PathBuf,
    pub node: PathBuf,
    /// Extra interpreter arguments placed before the script path.
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from(DEFAULT_PYTHON),
            node: PathBuf::from(DEFAULT_NODE),
            args: Vec::new(),
            env: HashMap::new(),
            workdir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct RawLauncher {
    #[serde(default)]
    python: Option<String>,
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    workdir: Option<String>,
}

pub(crate) fn expand(s: &str) -> String {
    shellexpand::full(s)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

impl From<RawLauncher> for LauncherConfig {
    fn from(raw: RawLauncher) -> Self {
        let defaults = LauncherConfig::default();
        Self {
            python: raw
                .python
                .map(|p| PathBuf::from(expand(&p)))
                .unwrap_or(defaults.python),
            node: raw
                .node
                .map(|p| PathBuf::from(expand(&p)))
                .unwrap_or(defaults.node),
            args: raw.args.into_iter().map(|arg| expand(&arg)).collect(),
            env: raw
                .env
                .into_iter()
                .map(|(key, value)| (key, expand(&value)))
                .collect(),
            workdir: raw.workdir.map(|d| PathBuf::from(expand(&d))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn expands_env_vars_in_launcher_fields() {
        unsafe {
            env::set_var("TEST_LAUNCH_ROOT", "/opt/venv");
            env::set_var("TEST_LAUNCH_TOKEN", "secret");
        }

        let raw = RawLauncher {
            python: Some("${TEST_LAUNCH_ROOT}/bin/python".to_string()),
            node: None,
            args: vec!["-u".to_string()],
            env: HashMap::from([("API_TOKEN".to_string(), "${TEST_LAUNCH_TOKEN}".to_string())]),
            workdir: Some("${TEST_LAUNCH_ROOT}/work".to_string()),
        };

        let config = LauncherConfig::from(raw);

        let python = config.python.to_str().expect("valid utf8");
        assert!(
            python.contains("/opt/venv/bin/python")
                || python.contains("\\opt\\venv\\bin\\python")
        );
        assert_eq!(config.node, PathBuf::from(DEFAULT_NODE));
        assert_eq!(config.args, vec!["-u".to_string()]);
        assert_eq!(config.env.get("API_TOKEN").map(String::as_str), Some("secret"));
        assert!(config.workdir.is_some());

        unsafe {
            env::remove_var("TEST_LAUNCH_ROOT");
            env::remove_var("TEST_LAUNCH_TOKEN");
        }
    }

    #[test]
    fn unknown_variables_are_left_verbatim() {
        assert_eq!(expand("${SURELY_NOT_SET_ANYWHERE_42}/x"), "${SURELY_NOT_SET_ANYWHERE_42}/x");
    }
}
