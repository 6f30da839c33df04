//! Tool app identities and call results
//!
//! A "tool app" is a project-scoped tool exposed by a connected server.
//! Listings fetched before a server handshake completes carry placeholder
//! identities prefixed with [`SYNTHETIC_PREFIX`]; routing later substitutes
//! the real identity by matching `(server_name, tool_name)`.

use serde::{Deserialize, Serialize};

/// Prefix marking a placeholder tool app id that has no backend identity yet
pub const SYNTHETIC_PREFIX: &str = "_synthetic_";

/// A tool exposed to a project, addressable for direct or fallback calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolApp {
    /// Stable identity, or a `_synthetic_`-prefixed placeholder
    pub id: String,
    /// Name of the server hosting the tool
    pub server_name: String,
    /// Tool name as exported by the server
    pub tool_name: String,
    /// Optional human-facing label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ToolApp {
    pub fn new(
        id: impl Into<String>,
        server_name: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            server_name: server_name.into(),
            tool_name: tool_name.into(),
            display_name: None,
        }
    }

    /// Build a placeholder identity for a tool whose backend id is unknown
    pub fn synthetic(server_name: impl Into<String>, tool_name: impl Into<String>) -> Self {
        let server_name = server_name.into();
        let tool_name = tool_name.into();
        Self {
            id: format!("{SYNTHETIC_PREFIX}{server_name}_{tool_name}"),
            server_name,
            tool_name,
            display_name: None,
        }
    }

    /// Whether this id is a placeholder rather than a backend identity
    pub fn is_synthetic(&self) -> bool {
        is_synthetic_id(&self.id)
    }
}

/// Check whether a raw app id is a synthetic placeholder
pub fn is_synthetic_id(id: &str) -> bool {
    id.starts_with(SYNTHETIC_PREFIX)
}

/// Result of a tool invocation, regardless of transport
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Content blocks returned by the tool
    pub content: Vec<serde_json::Value>,
    /// Whether the tool itself reported failure
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({ "type": "text", "text": message.into() })],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({ "type": "text", "text": message.into() })],
            is_error: true,
        }
    }
}

/// Metadata for a resource exposed by a connected server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}
