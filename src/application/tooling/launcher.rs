use super::error::ConnectError;
use crate::config::{LauncherConfig, ServerConfig};
use std::path::Path;

/// Builds the command line for a server script. `.py` runs under the
/// configured Python interpreter, `.js` under Node; anything else is refused.
pub fn resolve_server(
    target: &Path,
    launcher: &LauncherConfig,
) -> Result<ServerConfig, ConnectError> {
    let extension = target
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let command = match extension.as_deref() {
        Some("py") => launcher.python.clone(),
        Some("js") => launcher.node.clone(),
        _ => {
            return Err(ConnectError::UnsupportedTarget {
                path: target.to_path_buf(),
            });
        }
    };

    let name = target
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("server")
        .to_string();

    let mut args = launcher.args.clone();
    args.push(target.to_string_lossy().into_owned());

    Ok(ServerConfig {
        name,
        command,
        args,
        env: launcher.env.clone(),
        workdir: launcher.workdir.clone(),
    })
}
