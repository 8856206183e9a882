//! Positional-to-named argument mapping.
//!
//! MCP tool calls take keyword arguments, but scripted callers often supply
//! values positionally. The adapter zips positional values against the tool
//! schema's declared parameter order.

use crate::types::ToolDescriptor;

/// Zip positional values to the descriptor's parameter names, pairwise.
///
/// Deliberately permissive, matching the router's first-match-wins routing
/// policy: extra positional values are silently dropped, missing trailing
/// parameters are simply absent from the mapping (no defaults, no arity
/// error). A schema with no describable parameters yields an empty mapping
/// regardless of how many values were supplied.
pub fn zip_positional(
    descriptor: &ToolDescriptor,
    values: &[serde_json::Value],
) -> serde_json::Map<String, serde_json::Value> {
    descriptor
        .param_names()
        .into_iter()
        .zip(values.iter())
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
