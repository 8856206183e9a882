//! Capability registry — aggregates tool descriptors across all live servers.
//!
//! Entries are kept in registration order (config order). Tool names are NOT
//! deduplicated across servers: the flattened view lists every declaration,
//! and name resolution returns the first-registered owner. Shadowing is a
//! policy, not an error — downstream callers rely on first-match-wins.

use crate::types::ToolDescriptor;

/// Per-server tool lists, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: Vec<(String, Vec<ToolDescriptor>)>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a server's declared tools. Order of calls defines resolution
    /// precedence.
    pub fn register_server_tools(&mut self, server_name: &str, tools: Vec<ToolDescriptor>) {
        self.entries.push((server_name.to_string(), tools));
    }

    /// Remove a server's entry (e.g. after its session is torn down).
    pub fn unregister_server(&mut self, server_name: &str) {
        self.entries.retain(|(name, _)| name != server_name);
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The flattened union of every server's tools, in registration then
    /// per-server declaration order. Duplicate names appear once per
    /// declaring server.
    pub fn all_tools(&self) -> Vec<&ToolDescriptor> {
        self.entries
            .iter()
            .flat_map(|(_, tools)| tools.iter())
            .collect()
    }

    /// Same flattening restricted to the requested servers. Unknown names
    /// contribute nothing.
    pub fn tools_for(&self, server_names: &[&str]) -> Vec<&ToolDescriptor> {
        server_names
            .iter()
            .filter_map(|requested| {
                self.entries
                    .iter()
                    .find(|(name, _)| name == requested)
                    .map(|(_, tools)| tools.iter())
            })
            .flatten()
            .collect()
    }

    /// The first-registered server declaring `tool_name`, with its
    /// descriptor.
    pub fn resolve(&self, tool_name: &str) -> Option<(&str, &ToolDescriptor)> {
        self.entries.iter().find_map(|(server, tools)| {
            tools
                .iter()
                .find(|t| t.name == tool_name)
                .map(|t| (server.as_str(), t))
        })
    }

    /// The first-registered owner of `tool_name`.
    pub fn owner_of(&self, tool_name: &str) -> Option<&str> {
        self.resolve(tool_name).map(|(server, _)| server)
    }

    /// Total number of tool declarations (duplicates counted).
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, tools)| tools.len()).sum()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered server names, in registration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::Value::Null,
        }
    }

    fn sample_registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register_server_tools("browser", vec![descriptor("open"), descriptor("click")]);
        registry.register_server_tools("rag", vec![descriptor("search")]);
        registry
    }

    #[test]
    fn test_all_tools_flattened_in_registration_order() {
        let registry = sample_registry();
        let names: Vec<&str> = registry.all_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["open", "click", "search"]);
    }

    #[test]
    fn test_zero_tool_server_contributes_nothing() {
        let mut registry = sample_registry();
        registry.register_server_tools("sandbox", Vec::new());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.server_names(), vec!["browser", "rag", "sandbox"]);
    }

    #[test]
    fn test_duplicate_names_are_not_deduplicated() {
        let mut registry = sample_registry();
        registry.register_server_tools("mirror", vec![descriptor("search")]);
        let names: Vec<&str> = registry.all_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["open", "click", "search", "search"]);
    }

    #[test]
    fn test_resolve_returns_first_registered_owner() {
        let mut registry = sample_registry();
        registry.register_server_tools("mirror", vec![descriptor("search")]);
        // Deterministic across repeated lookups
        for _ in 0..3 {
            assert_eq!(registry.owner_of("search"), Some("rag"));
        }
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let registry = sample_registry();
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_tools_for_ignores_unknown_servers() {
        let registry = sample_registry();
        let names: Vec<&str> = registry
            .tools_for(&["rag", "no_such_server", "browser"])
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["search", "open", "click"]);
    }

    #[test]
    fn test_unregister_server() {
        let mut registry = sample_registry();
        registry.unregister_server("browser");
        assert_eq!(registry.server_names(), vec!["rag"]);
        assert!(registry.owner_of("open").is_none());
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = sample_registry();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.all_tools().is_empty());
    }
}
