//! The channel seam: how the router talks to one server process.
//!
//! `Channel`/`ChannelFactory` are the ports the router is written against;
//! production uses `StdioChannelFactory`, which spawns the server as a child
//! process and drives JSON-RPC over its stdio. Tests substitute in-memory
//! fakes, which is why the router takes the factory by injection rather than
//! constructing transports itself.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::errors::McpError;
use crate::transport::{extract_result, StdioTransport};
use crate::types::{InitializeResult, ListToolsResult, ToolDescriptor};

/// Timeout for graceful child exit before force-killing.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol version sent in the initialize handshake.
const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── Ports ───────────────────────────────────────────────────────────────────

/// Request/response channel to one running server.
///
/// Deadlines are applied by the caller (`lifecycle`/`router` wrap each call
/// in `tokio::time::timeout`), so implementations only need to perform the
/// raw exchange.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Run the initialization handshake.
    async fn initialize(&self) -> Result<InitializeResult, McpError>;

    /// Query the server's declared tools.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError>;

    /// Invoke a named tool with keyword arguments, returning the raw result.
    async fn call(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError>;

    /// Release the channel. Called exactly once per channel.
    async fn close(&mut self) -> Result<(), McpError>;
}

/// Produces a channel to a freshly spawned server process.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    async fn open(
        &self,
        server_name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Box<dyn Channel>, McpError>;
}

// ─── Stdio Implementation ────────────────────────────────────────────────────

/// A spawned server process with a JSON-RPC stdio transport.
pub struct StdioChannel {
    server_name: String,
    process: Mutex<Child>,
    transport: StdioTransport,
    stderr: Mutex<Option<tokio::process::ChildStderr>>,
}

impl StdioChannel {
    /// Read any stderr the process has produced, for failure diagnostics.
    ///
    /// Short timeout so an empty pipe doesn't block; truncated to keep error
    /// messages readable.
    async fn drain_stderr(&self) -> String {
        use tokio::io::AsyncReadExt;

        let Some(mut stderr) = self.stderr.lock().await.take() else {
            return String::new();
        };

        let mut buf = String::new();
        match tokio::time::timeout(Duration::from_millis(500), stderr.read_to_string(&mut buf))
            .await
        {
            Ok(Ok(_)) => {
                if buf.len() > 2000 {
                    buf.truncate(2000);
                    buf.push_str("...(truncated)");
                }
                buf
            }
            _ => String::new(),
        }
    }
}

#[async_trait]
impl Channel for StdioChannel {
    async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let init = async {
            let response = self.transport.request("initialize", Some(params)).await?;
            let result = extract_result(response)?;
            self.transport
                .notify("notifications/initialized", None)
                .await?;
            serde_json::from_value::<InitializeResult>(result).map_err(|e| {
                McpError::InitFailed {
                    name: self.server_name.clone(),
                    reason: format!("failed to parse initialize response: {e}"),
                }
            })
        };

        match init.await {
            Ok(result) => Ok(result),
            Err(e) => {
                let stderr = self.drain_stderr().await;
                if stderr.is_empty() {
                    Err(e)
                } else {
                    tracing::warn!(
                        server = %self.server_name,
                        stderr = %stderr,
                        "server stderr captured on initialize failure"
                    );
                    Err(McpError::InitFailed {
                        name: self.server_name.clone(),
                        reason: format!("{e} | stderr: {}", stderr.trim()),
                    })
                }
            }
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let response = self.transport.request("tools/list", None).await?;
        let result = extract_result(response)?;
        let listed: ListToolsResult =
            serde_json::from_value(result).map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to parse tools/list response: {e}"),
            })?;
        Ok(listed.tools)
    }

    async fn call(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let params = serde_json::json!({
            "name": tool,
            "arguments": arguments,
        });
        let response = self.transport.request("tools/call", Some(params)).await?;
        extract_result(response)
    }

    async fn close(&mut self) -> Result<(), McpError> {
        // Best-effort shutdown notification, then wait briefly before killing
        let _ = self.transport.notify("shutdown", None).await;

        let mut process = self.process.lock().await;
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, process.wait()).await {
            Ok(Ok(_)) => Ok(()),
            _ => {
                let _ = process.kill().await;
                Ok(())
            }
        }
    }
}

/// Spawns server child processes and wires their stdio into channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioChannelFactory;

#[async_trait]
impl ChannelFactory for StdioChannelFactory {
    async fn open(
        &self,
        server_name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Box<dyn Channel>, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }

        // Wire stdio for JSON-RPC; stderr captured for failure diagnostics
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: server_name.to_string(),
            reason: format!("{e}"),
        })?;

        let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
            name: server_name.to_string(),
            reason: "failed to capture stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
            name: server_name.to_string(),
            reason: "failed to capture stdout".into(),
        })?;
        let stderr = child.stderr.take();

        Ok(Box::new(StdioChannel {
            server_name: server_name.to_string(),
            transport: StdioTransport::new(server_name, stdin, stdout),
            process: Mutex::new(child),
            stderr: Mutex::new(stderr),
        }))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
