//! Domain Events - Unified event system for Memdeck
//!
//! All connection-layer state changes are represented as events here.
//! Events are emitted by the connection manager and transport dispatcher
//! and consumed by UI bridges and audit logging.
//!
//! # Serialization
//!
//! Events serialize with a `type` field containing the snake_case variant name:
//! ```json
//! { "type": "connection_status_changed", "project_id": "...", "status": "connected" }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CONNECTION STATUS
// ============================================================================

/// Connection status of a project's tool server link
///
/// Unified status enum for both runtime state and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Successfully connected and responding
    Connected,
    /// Not connected (idle state) - this is the default
    #[default]
    Disconnected,
    /// Connection failed with error
    Error,
    /// Attempting to connect
    Connecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Connecting => "connecting",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "connected" => Self::Connected,
            "error" => Self::Error,
            "connecting" => Self::Connecting,
            _ => Self::Disconnected,
        }
    }

    /// Check if the link is currently usable for direct calls
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if this status indicates an error condition
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Check if this is a terminal state (not transitioning)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Disconnected | Self::Error)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DOMAIN EVENT ENUM
// ============================================================================

/// Unified domain events for the Memdeck connection layer
///
/// The connection manager emits these after state transitions.
/// Consumers subscribe through the [`crate::EventBus`] and react.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Connection status for a project changed
    ConnectionStatusChanged {
        project_id: Uuid,
        server_name: String,
        status: ConnectionStatus,
        /// Monotonic flow_id for race condition prevention
        flow_id: u64,
        /// Error or status message
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Grace period entered or exited after a transient session drop
    GracePeriodChanged {
        project_id: Uuid,
        server_name: String,
        active: bool,
    },

    /// A synthetic tool app identity was substituted by a real one
    ToolAppSubstituted {
        project_id: Uuid,
        requested_app_id: String,
        resolved_app_id: String,
        server_name: String,
        tool_name: String,
    },
}

impl DomainEvent {
    /// Get the event type name (snake_case, matches serialization)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ConnectionStatusChanged { .. } => "connection_status_changed",
            Self::GracePeriodChanged { .. } => "grace_period_changed",
            Self::ToolAppSubstituted { .. } => "tool_app_substituted",
        }
    }

    /// Get the project this event belongs to
    pub fn project_id(&self) -> Uuid {
        match self {
            Self::ConnectionStatusChanged { project_id, .. }
            | Self::GracePeriodChanged { project_id, .. }
            | Self::ToolAppSubstituted { project_id, .. } => *project_id,
        }
    }
}
