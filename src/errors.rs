//! Router error types.

use thiserror::Error;

/// Errors that can occur while managing servers or routing tool calls.
///
/// Startup-phase variants (`SpawnFailed`, `InitFailed`, `InitTimeout`) are
/// recorded per server and never abort the orchestrator — the affected server
/// is simply absent from the live set. Serving-phase variants propagate to the
/// caller as typed failures.
#[derive(Debug, Error)]
pub enum McpError {
    /// A server process failed to launch.
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake did not complete within the deadline.
    #[error("server '{name}' initialization timed out after {secs}s")]
    InitTimeout {
        name: String,
        secs: u64,
    },

    /// JSON-RPC communication error (malformed message, I/O error).
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server error [{code}]: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Tool not found in any live server's registry.
    #[error("unknown tool: '{name}'")]
    UnknownTool {
        name: String,
    },

    /// The named server has no live session.
    #[error("server '{server}' is not connected")]
    NotConnected {
        server: String,
    },

    /// A tool call did not complete within the deadline.
    #[error("tool '{tool}' on server '{server}' timed out after {secs}s")]
    CallTimeout {
        server: String,
        tool: String,
        secs: u64,
    },

    /// Configuration problem (diagnostic only — config errors recover to
    /// defaults or an empty server set, they never abort startup).
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}
