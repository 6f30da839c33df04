//! Live session handles
//!
//! A [`ToolSession`] is an open link to a tool server. The connection
//! manager owns at most one per project link; callers get cheap clones
//! of the [`SessionHandle`] and never outlive the manager's teardown.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation,
    ReadResourceRequestParams,
};
use rmcp::service::Peer;
use rmcp::RoleClient;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use memdeck_core::{ResourceInfo, ToolOutcome};

/// Shared handle to a live session
pub type SessionHandle = Arc<dyn ToolSession>;

/// Operations available on an open tool server session
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Unique identity of this session instance
    ///
    /// Used to discard callbacks from sessions that have already been
    /// replaced.
    fn id(&self) -> Uuid;

    /// Invoke a tool and collect its content blocks
    async fn call_tool(&self, tool_name: &str, arguments: Value) -> anyhow::Result<ToolOutcome>;

    /// List resources exposed by the server
    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceInfo>>;

    /// Read a resource's contents by URI
    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<Value>>;

    /// Close the session, releasing the underlying service
    ///
    /// Idempotent; never fails.
    async fn close(&self);
}

/// Client handler presented to backend servers during the MCP handshake
#[derive(Clone)]
pub struct ToolClientHandler {
    info: ClientInfo,
}

impl ToolClientHandler {
    pub fn new(server_name: &str) -> Self {
        Self {
            info: ClientInfo {
                protocol_version: Default::default(),
                capabilities: ClientCapabilities::default(),
                client_info: Implementation {
                    name: format!("memdeck-{}", server_name),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    title: Some("Memdeck".to_string()),
                    icons: None,
                    website_url: None,
                    ..Default::default()
                },
                meta: None,
            },
        }
    }
}

impl rmcp::ClientHandler for ToolClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }
}

/// Session backed by an rmcp client service
///
/// Calls go through a cloned [`Peer`]; the owning `RunningService` lives
/// in a watcher task spawned by the transport, which exits (dropping the
/// service) once `close_token` fires or the remote ends the session.
pub struct RmcpToolSession {
    id: Uuid,
    peer: Peer<RoleClient>,
    close_token: CancellationToken,
}

impl RmcpToolSession {
    pub fn new(peer: Peer<RoleClient>, close_token: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            close_token,
        }
    }
}

#[async_trait]
impl ToolSession for RmcpToolSession {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> anyhow::Result<ToolOutcome> {
        let params = CallToolRequestParams {
            name: tool_name.to_string().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
            meta: None,
        };

        let res = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| anyhow::anyhow!("MCP call failed: {}", e))?;

        let content: Vec<Value> = res
            .content
            .into_iter()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
            .collect();

        Ok(ToolOutcome {
            content,
            is_error: res.is_error.unwrap_or(false),
        })
    }

    async fn list_resources(&self) -> anyhow::Result<Vec<ResourceInfo>> {
        let resources = self
            .peer
            .list_all_resources()
            .await
            .map_err(|e| anyhow::anyhow!("MCP list_resources failed: {}", e))?;

        Ok(resources
            .into_iter()
            .map(|r| ResourceInfo {
                uri: r.raw.uri.clone(),
                name: r.raw.name.clone(),
                description: r.raw.description.clone(),
                mime_type: r.raw.mime_type.clone(),
                size: r.raw.size,
            })
            .collect())
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<Value>> {
        let params = ReadResourceRequestParams {
            uri: uri.into(),
            meta: None,
        };

        let res = self
            .peer
            .read_resource(params)
            .await
            .map_err(|e| anyhow::anyhow!("MCP read_resource failed: {}", e))?;

        Ok(res
            .contents
            .into_iter()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null))
            .collect())
    }

    async fn close(&self) {
        self.close_token.cancel();
    }
}
