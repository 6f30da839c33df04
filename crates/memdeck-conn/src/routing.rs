//! Fallback route resolution
//!
//! Listings fetched before a handshake completes carry synthetic app ids
//! (see [`memdeck_core::SYNTHETIC_PREFIX`]). When such a call has to go
//! through the proxy, the real backend identity is recovered best-effort
//! by matching `(server_name, tool_name)` against the project's full
//! listing. Failing that, the call routes by server name alone. A dead
//! end is a displayable value, never an error.

use tracing::{debug, warn};
use uuid::Uuid;

use memdeck_core::{ProjectStore, ToolApp};

/// Where a fallback call should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackRoute {
    /// Route by backend app identity
    ByApp {
        app_id: String,
        /// True when a synthetic id was replaced by a real one
        substituted: bool,
    },
    /// Route by server name; the backend resolves the rest
    ByServer { server_name: String },
    /// Nothing to route to; carries a user-facing explanation
    NoRoute { reason: String },
}

impl std::fmt::Display for FallbackRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByApp { app_id, .. } => write!(f, "app {}", app_id),
            Self::ByServer { server_name } => write!(f, "server {}", server_name),
            Self::NoRoute { reason } => f.write_str(reason),
        }
    }
}

/// Resolve the fallback route for one tool app
pub async fn resolve_route(
    store: &dyn ProjectStore,
    project_id: Uuid,
    app: &ToolApp,
) -> FallbackRoute {
    // Real identities route directly, no lookup needed
    if !app.is_synthetic() {
        return FallbackRoute::ByApp {
            app_id: app.id.clone(),
            substituted: false,
        };
    }

    // Best-effort: find the real identity behind the placeholder. An exact
    // (server, tool) match wins; a tool-name match on another server is
    // still better than no identity at all.
    match store.list_tool_apps(project_id).await {
        Ok(apps) => {
            let exact = apps.iter().find(|a| {
                !a.is_synthetic()
                    && a.server_name == app.server_name
                    && a.tool_name == app.tool_name
            });
            let by_tool = || {
                apps.iter()
                    .find(|a| !a.is_synthetic() && a.tool_name == app.tool_name)
            };
            if let Some(real) = exact.or_else(by_tool) {
                debug!(
                    project_id = %project_id,
                    requested = %app.id,
                    resolved = %real.id,
                    "[Routing] Substituted synthetic app id"
                );
                return FallbackRoute::ByApp {
                    app_id: real.id.clone(),
                    substituted: true,
                };
            }
        }
        Err(e) => {
            warn!(
                project_id = %project_id,
                error = %format!("{:#}", e),
                "[Routing] Tool app listing failed, falling through to server route"
            );
        }
    }

    if !app.server_name.is_empty() {
        return FallbackRoute::ByServer {
            server_name: app.server_name.clone(),
        };
    }

    FallbackRoute::NoRoute {
        reason: format!("No fallback route available for tool '{}'", app.tool_name),
    }
}
