//! Server startup and teardown.
//!
//! Each configured server is connected independently: resolve the launch
//! command, open a channel, run the initialize handshake and tool query under
//! the handshake deadline. A server that fails any step is logged and skipped
//! — partial startup is a supported terminal state, never an abort.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::channel::ChannelFactory;
use crate::errors::McpError;
use crate::session::ServiceSession;
use crate::types::ServerConfig;

/// Deadline for the initialize handshake and the follow-up tool query.
pub const INIT_TIMEOUT: Duration = Duration::from_secs(20);

// ─── Launch Command Resolution ───────────────────────────────────────────────

/// Platform-correct Python command.
///
/// macOS 12.3+ removed the `python` symlink; only `python3` exists. Windows
/// installs Python as `python.exe` via the official installer.
fn default_python_command() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

/// Whether `command` can be launched: an existing path, or a name found on
/// `PATH`.
fn command_available(command: &str) -> bool {
    let as_path = std::path::Path::new(command);
    if as_path.components().count() > 1 {
        return as_path.is_file();
    }

    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(command).is_file())
}

/// Strip the leading `run` subcommand when converting `uv run script.py`
/// into a direct interpreter invocation.
fn strip_uv_run(args: &[String]) -> Vec<String> {
    match args.first().map(String::as_str) {
        Some("run") => args[1..].to_vec(),
        _ => args.to_vec(),
    }
}

/// Resolve the effective launch command for a server.
///
/// Hosts without `uv` installed fall back to invoking the script with the
/// platform Python interpreter directly. This is a substitution, not an
/// error: the configured entry stays launchable either way.
pub fn resolve_launch(config: &ServerConfig) -> (String, Vec<String>) {
    if config.command == "uv" && !command_available("uv") {
        let fallback = default_python_command();
        tracing::warn!(
            requested = %config.command,
            fallback = %fallback,
            "launch command not on PATH, substituting interpreter"
        );
        return (fallback.to_string(), strip_uv_run(&config.args));
    }

    (config.command.clone(), config.args.clone())
}

// ─── Connect / Teardown ──────────────────────────────────────────────────────

/// Connect one server: open a channel, initialize, and query tools, each
/// under the handshake deadline. The channel is released before returning an
/// error, so a failed connect never leaks a half-open process.
pub async fn connect_server(
    factory: &dyn ChannelFactory,
    name: &str,
    config: &ServerConfig,
    init_timeout: Duration,
) -> Result<ServiceSession, McpError> {
    let (command, args) = resolve_launch(config);
    let mut channel = factory.open(name, &command, &args, &config.env).await?;

    match tokio::time::timeout(init_timeout, channel.initialize()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            let _ = channel.close().await;
            return Err(e);
        }
        Err(_) => {
            let _ = channel.close().await;
            return Err(McpError::InitTimeout {
                name: name.to_string(),
                secs: init_timeout.as_secs(),
            });
        }
    }

    // The tool query is an RPC like any other; same deadline applies
    let tools = match tokio::time::timeout(init_timeout, channel.list_tools()).await {
        Ok(Ok(tools)) => tools,
        Ok(Err(e)) => {
            let _ = channel.close().await;
            return Err(e);
        }
        Err(_) => {
            let _ = channel.close().await;
            return Err(McpError::InitTimeout {
                name: name.to_string(),
                secs: init_timeout.as_secs(),
            });
        }
    };

    tracing::info!(server = %name, tools = tools.len(), "server connected");
    Ok(ServiceSession::new(name, channel, tools))
}

/// Connect all configured servers concurrently.
///
/// Sessions come back in config order; servers that failed are returned as
/// `(name, error)` pairs instead (partial startup is acceptable).
pub async fn connect_all(
    factory: Arc<dyn ChannelFactory>,
    configs: &IndexMap<String, ServerConfig>,
    init_timeout: Duration,
) -> (Vec<ServiceSession>, Vec<(String, McpError)>) {
    let mut handles = Vec::new();
    for (name, config) in configs {
        let factory = Arc::clone(&factory);
        let name = name.clone();
        let config = config.clone();
        handles.push((
            name.clone(),
            tokio::spawn(async move {
                connect_server(factory.as_ref(), &name, &config, init_timeout).await
            }),
        ));
    }

    let mut sessions = Vec::new();
    let mut errors = Vec::new();

    // Joining in spawn order keeps sessions in config order
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(session)) => sessions.push(session),
            Ok(Err(e)) => {
                tracing::warn!(server = %name, error = %e, "server failed to start, skipping");
                errors.push((name, e));
            }
            Err(e) => {
                tracing::warn!(server = %name, error = %e, "server startup task panicked");
                errors.push((
                    name.clone(),
                    McpError::SpawnFailed {
                        name,
                        reason: format!("join error: {e}"),
                    },
                ));
            }
        }
    }

    (sessions, errors)
}

/// Release every session's channel, best-effort. Teardown errors are logged
/// and swallowed; a wedged server must not block the rest of shutdown.
pub async fn shutdown_all(sessions: &mut Vec<ServiceSession>) {
    for session in sessions.iter_mut() {
        if let Err(e) = session.close().await {
            tracing::warn!(server = %session.name(), error = %e, "error closing channel");
        }
    }
    sessions.clear();
}

// ─── Tests ───────────────────────────────────────────────────────────────────
