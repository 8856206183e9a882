//! One live server session.
//!
//! A `ServiceSession` pairs a server name with its exclusively-owned channel
//! and the tools the server declared at startup. Sessions are created during
//! router start and never recreated — a server that fails stays out of the
//! live set rather than being retried.

use crate::channel::Channel;
use crate::errors::McpError;
use crate::types::ToolDescriptor;

/// A connected server: name, channel, and declared tools.
pub struct ServiceSession {
    name: String,
    channel: Box<dyn Channel>,
    tools: Vec<ToolDescriptor>,
    closed: bool,
}

impl ServiceSession {
    /// Wrap an initialized channel and its discovered tools.
    pub fn new(name: &str, channel: Box<dyn Channel>, tools: Vec<ToolDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            channel,
            tools,
            closed: false,
        }
    }

    /// The server's configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tools the server declared during startup.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Whether this session declares a tool with the given name.
    pub fn declares(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }

    /// The descriptor for a declared tool, if any.
    pub fn descriptor(&self, tool_name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == tool_name)
    }

    /// Issue a raw tool call over the channel. The caller applies the
    /// deadline.
    pub async fn call(
        &self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        self.channel.call(tool, arguments).await
    }

    /// Release the channel. Safe to call more than once; only the first call
    /// reaches the channel.
    pub async fn close(&mut self) -> Result<(), McpError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.channel.close().await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
