//! The capability router — the crate's primary API.
//!
//! Owns the live sessions and the aggregated tool registry, resolves a tool
//! name to its first-registered owner, and issues deadline-guarded calls.
//! Explicitly constructed and owned by the caller; the channel factory is
//! injected so tests can run against fake channels.

use std::sync::Arc;
use std::time::Duration;

use crate::args::zip_positional;
use crate::channel::{ChannelFactory, StdioChannelFactory};
use crate::errors::McpError;
use crate::lifecycle;
use crate::registry::CapabilityRegistry;
use crate::session::ServiceSession;
use crate::types::{McpServersConfig, ToolDescriptor};

/// Default deadline for a single tool call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Multi-server router: spawns configured servers, aggregates their tools,
/// and dispatches named invocations to whichever server owns them.
pub struct McpRouter {
    config: McpServersConfig,
    factory: Arc<dyn ChannelFactory>,
    /// Live sessions, in config order. Mutated only by `start`/`stop`.
    sessions: Vec<ServiceSession>,
    /// Derived name index, rebuilt alongside `sessions`.
    registry: CapabilityRegistry,
    init_timeout: Duration,
    call_timeout: Duration,
}

impl McpRouter {
    /// Create a router that spawns real server processes over stdio.
    pub fn new(config: McpServersConfig) -> Self {
        Self::with_factory(config, Arc::new(StdioChannelFactory))
    }

    /// Create a router with an injected channel factory (used by tests to
    /// substitute fake channels).
    pub fn with_factory(config: McpServersConfig, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            config,
            factory,
            sessions: Vec::new(),
            registry: CapabilityRegistry::new(),
            init_timeout: lifecycle::INIT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the per-call deadline (tests use short deadlines).
    pub fn set_call_timeout(&mut self, timeout: Duration) {
        self.call_timeout = timeout;
    }

    /// Override the handshake deadline (tests use short deadlines).
    pub fn set_init_timeout(&mut self, timeout: Duration) {
        self.init_timeout = timeout;
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Start all configured servers and build the tool registry.
    ///
    /// Servers fail independently; the returned list names the ones that
    /// could not be started. Operating on the surviving subset is supported.
    pub async fn start(&mut self) -> Vec<(String, McpError)> {
        // A second start replaces the previous live set cleanly
        self.stop().await;

        let (sessions, errors) = lifecycle::connect_all(
            Arc::clone(&self.factory),
            &self.config.servers,
            self.init_timeout,
        )
        .await;

        for session in &sessions {
            self.registry
                .register_server_tools(session.name(), session.tools().to_vec());
        }
        self.sessions = sessions;

        tracing::info!(
            live = self.sessions.len(),
            configured = self.config.servers.len(),
            tools = self.registry.len(),
            "router started"
        );
        errors
    }

    /// Release every open channel, best-effort. Idempotent; safe to call
    /// before `start`.
    pub async fn stop(&mut self) {
        lifecycle::shutdown_all(&mut self.sessions).await;
        self.registry.clear();
    }

    // ─── Aggregation ─────────────────────────────────────────────────────

    /// All tools declared by live servers, in registration then declaration
    /// order. Duplicate names are listed once per declaring server.
    pub fn list_all_tools(&self) -> Vec<&ToolDescriptor> {
        self.registry.all_tools()
    }

    /// Tools restricted to the requested servers; unknown names are silently
    /// ignored.
    pub fn list_tools_for(&self, server_names: &[&str]) -> Vec<&ToolDescriptor> {
        self.registry.tools_for(server_names)
    }

    // ─── Invocation ──────────────────────────────────────────────────────

    /// Invoke a tool by name with keyword arguments.
    ///
    /// Live sessions are scanned in registration order and the first one
    /// declaring the name wins (shadowed declarations stay unreachable by
    /// name).
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let owner = self
            .sessions
            .iter()
            .find(|s| s.declares(tool_name))
            .map(|s| s.name().to_string())
            .ok_or(McpError::UnknownTool {
                name: tool_name.to_string(),
            })?;

        self.call_on(&owner, tool_name, arguments).await
    }

    /// Invoke a tool on a specific server, under the call deadline.
    pub async fn call_on(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, McpError> {
        let session = self
            .sessions
            .iter()
            .find(|s| s.name() == server_name)
            .ok_or(McpError::NotConnected {
                server: server_name.to_string(),
            })?;

        match tokio::time::timeout(self.call_timeout, session.call(tool_name, arguments)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::CallTimeout {
                server: server_name.to_string(),
                tool: tool_name.to_string(),
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    /// Invoke a tool with positional values, mapped to keyword arguments via
    /// the owning descriptor's declared parameter order.
    ///
    /// This convenience path never propagates errors — every failure comes
    /// back as a descriptive string, so scripted callers stay failure-
    /// tolerant. A result carrying a `content` sequence is unwrapped to its
    /// first text payload; anything else is returned in JSON string form.
    pub async fn invoke_positional(
        &self,
        tool_name: &str,
        values: &[serde_json::Value],
    ) -> String {
        let Some((owner, descriptor)) = self.registry.resolve(tool_name) else {
            return format!("Error: Tool {tool_name} not found");
        };

        let arguments = serde_json::Value::Object(zip_positional(descriptor, values));
        let owner = owner.to_string();

        match self.call_on(&owner, tool_name, arguments).await {
            Ok(result) => unwrap_text_content(&result),
            Err(e) => format!("Error executing {tool_name}: {e}"),
        }
    }

    // ─── Status ──────────────────────────────────────────────────────────

    /// Number of live servers.
    pub fn live_server_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of registered tool declarations.
    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the named server has a live session.
    pub fn is_live(&self, server_name: &str) -> bool {
        self.sessions.iter().any(|s| s.name() == server_name)
    }

    /// Names of live servers, in registration order.
    pub fn live_servers(&self) -> Vec<&str> {
        self.sessions.iter().map(ServiceSession::name).collect()
    }

    /// Names of all configured servers, in config order (including any that
    /// failed to start).
    pub fn configured_servers(&self) -> Vec<&str> {
        self.config.servers.keys().map(String::as_str).collect()
    }
}

/// Unwrap an MCP call result: first text payload of the `content` sequence
/// if present, otherwise the raw JSON string form.
fn unwrap_text_content(result: &serde_json::Value) -> String {
    result
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|items| items.first())
        .and_then(|item| item.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| result.to_string())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_router() -> McpRouter {
        McpRouter::new(McpServersConfig::default())
    }

    #[test]
    fn test_new_router_is_empty() {
        let router = empty_router();
        assert_eq!(router.live_server_count(), 0);
        assert_eq!(router.tool_count(), 0);
        assert!(router.list_all_tools().is_empty());
        assert!(!router.is_live("browser"));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_a_no_op() {
        let mut router = empty_router();
        router.stop().await;
        router.stop().await;
        assert_eq!(router.live_server_count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_with_no_sessions_is_unknown_tool() {
        let router = empty_router();
        let err = router.invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::UnknownTool { name } if name == "echo"));
    }

    #[tokio::test]
    async fn test_call_on_unknown_server_is_not_connected() {
        let router = empty_router();
        let err = router.call_on("ghost", "echo", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected { server } if server == "ghost"));
    }

    #[tokio::test]
    async fn test_invoke_positional_unknown_tool_returns_error_string() {
        let router = empty_router();
        let result = router.invoke_positional("missing_tool", &[]).await;
        assert!(result.contains("missing_tool"));
        assert!(result.starts_with("Error"));
    }

    #[test]
    fn test_unwrap_text_content_with_content_sequence() {
        let result = json!({"content": [{"type": "text", "text": "hi"}]});
        assert_eq!(unwrap_text_content(&result), "hi");
    }

    #[test]
    fn test_unwrap_text_content_falls_back_to_json_form() {
        let result = json!({"value": 5});
        assert_eq!(unwrap_text_content(&result), "{\"value\":5}");
    }

    #[test]
    fn test_configured_servers_in_config_order() {
        let config: McpServersConfig = serde_json::from_str(
            r#"{"mcpServers": {
                "zeta": {"command": "uv", "args": []},
                "alpha": {"command": "uv", "args": []}
            }}"#,
        )
        .unwrap();
        let router = McpRouter::new(config);
        assert_eq!(router.configured_servers(), vec!["zeta", "alpha"]);
    }
}
