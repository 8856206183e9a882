//! Server configuration loading.
//!
//! Reads `mcp_servers.json` (an ordered `mcpServers` mapping of server name →
//! launch entry). Both failure modes are recoverable: a missing file falls
//! back to the hardcoded default server set, a malformed file degrades to an
//! empty set. Neither aborts startup.

use std::path::Path;

use indexmap::IndexMap;

use crate::errors::McpError;
use crate::types::{McpServersConfig, ServerConfig};

/// Default configuration file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "mcp_servers.json";

/// The hardcoded fallback server set used when no config file exists.
///
/// Keeps development environments working without a checked-in config.
pub fn default_servers() -> IndexMap<String, ServerConfig> {
    let mut servers = IndexMap::new();
    servers.insert(
        "browser".to_string(),
        ServerConfig::new("uv", &["run", "mcp_servers/server_browser.py"]),
    );
    servers.insert(
        "rag".to_string(),
        ServerConfig::new("uv", &["run", "mcp_servers/server_rag.py"]),
    );
    servers.insert(
        "sandbox".to_string(),
        ServerConfig::new("uv", &["run", "mcp_servers/server_sandbox.py"]),
    );
    servers
}

/// Load the servers configuration from `path`.
///
/// - File missing → the hardcoded default set.
/// - File unreadable or malformed → an empty set.
pub fn load_config(path: &Path) -> McpServersConfig {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "config file not found, using default servers"
        );
        return McpServersConfig {
            servers: default_servers(),
        };
    }

    match read_config(path) {
        Ok(config) => {
            tracing::info!(
                path = %path.display(),
                count = config.servers.len(),
                "loaded server config"
            );
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "malformed config, using empty server set"
            );
            McpServersConfig::default()
        }
    }
}

/// Read and parse a config file, without the recovery policy of
/// [`load_config`].
pub fn read_config(path: &Path) -> Result<McpServersConfig, McpError> {
    let content = std::fs::read_to_string(path).map_err(|e| McpError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    serde_json::from_str(&content).map_err(|e| McpError::ConfigError {
        reason: format!("failed to parse {}: {e}", path.display()),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
