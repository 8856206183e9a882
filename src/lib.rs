//! Multi-server MCP capability router.
//!
//! Launches several independent MCP server subprocesses, speaks JSON-RPC 2.0
//! to each over its stdio, aggregates the tools every server declares, and
//! dispatches named tool invocations to whichever server owns them. Every
//! blocking step runs under a hard deadline, so one unresponsive server
//! cannot stall the caller.
//!
//! Startup is best-effort: servers fail independently, and the router keeps
//! operating with whatever subset came up. `stop` tears every channel down
//! exactly once, swallowing per-channel errors.
//!
//! ```no_run
//! use mcp_router::{config, McpRouter};
//! use std::path::Path;
//!
//! # async fn run() {
//! let servers = config::load_config(Path::new("mcp_servers.json"));
//! let mut router = McpRouter::new(servers);
//! let failed = router.start().await;
//! for (name, err) in &failed {
//!     eprintln!("{name} unavailable: {err}");
//! }
//!
//! let result = router
//!     .invoke_positional("echo", &[serde_json::json!("hi")])
//!     .await;
//! println!("{result}");
//! router.stop().await;
//! # }
//! ```

pub mod args;
pub mod channel;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use channel::{Channel, ChannelFactory, StdioChannelFactory};
pub use errors::McpError;
pub use registry::CapabilityRegistry;
pub use router::McpRouter;
pub use session::ServiceSession;
pub use types::{McpServersConfig, ServerConfig, ToolDescriptor};
