//! Line-delimited JSON-RPC over a child process's stdio.
//!
//! One JSON object per line. Requests carry a monotonically increasing `id`;
//! the reader skips any line that is not the matching response. Skipping
//! covers two real cases: server log noise on stdout, and the late response
//! of a call whose deadline already expired — stale ids are discarded so a
//! timed-out call does not wedge the channel for subsequent requests.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::errors::McpError;
use crate::types::{error_codes, JsonRpcRequest, JsonRpcResponse};

/// Bi-directional JSON-RPC transport over a child process's stdio.
pub struct StdioTransport {
    server_name: String,
    next_id: AtomicU64,
    writer: Mutex<ChildStdin>,
    reader: Mutex<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Create a new transport from a child process's stdin/stdout.
    pub fn new(server_name: &str, stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            server_name: server_name.to_string(),
            next_id: AtomicU64::new(1),
            writer: Mutex::new(stdin),
            reader: Mutex::new(BufReader::new(stdout)),
        }
    }

    fn transport_err(&self, reason: String) -> McpError {
        McpError::TransportError {
            server: self.server_name.clone(),
            reason,
        }
    }

    /// Write one serialized JSON value as a single line, then flush.
    async fn write_line(&self, value: &serde_json::Value) -> Result<(), McpError> {
        let mut line = serde_json::to_string(value)
            .map_err(|e| self.transport_err(format!("failed to serialize message: {e}")))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.transport_err(format!("failed to write to stdin: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| self.transport_err(format!("failed to flush stdin: {e}")))
    }

    /// Send a JSON-RPC request and wait for the matching response.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);
        let encoded = serde_json::to_value(&req)
            .map_err(|e| self.transport_err(format!("failed to serialize request: {e}")))?;
        self.write_line(&encoded).await?;

        // Read lines until a response with the matching id arrives
        let mut reader = self.reader.lock().await;
        let mut line_buf = String::new();

        loop {
            line_buf.clear();
            let bytes_read = reader
                .read_line(&mut line_buf)
                .await
                .map_err(|e| self.transport_err(format!("failed to read from stdout: {e}")))?;

            if bytes_read == 0 {
                return Err(
                    self.transport_err("server stdout closed (process may have exited)".into())
                );
            }

            let trimmed = line_buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(resp) if resp.id == id => return Ok(resp),
                // Stale id (likely a response whose caller already timed out)
                Ok(_) => continue,
                // Not a JSON-RPC response — server log output, skip
                Err(_) => continue,
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write_line(&notification).await
    }
}

/// Extract the result from a JSON-RPC response, converting the error object
/// into `McpError::ServerError`.
pub fn extract_result(response: JsonRpcResponse) -> Result<serde_json::Value, McpError> {
    if let Some(err) = response.error {
        return Err(McpError::ServerError {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    response.result.ok_or(McpError::ServerError {
        code: error_codes::INTERNAL_ERROR,
        message: "response missing both result and error".into(),
        data: None,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
