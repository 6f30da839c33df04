//! Data access traits for the connection layer
//!
//! These traits define the interface the connection and routing code
//! needs from storage without specifying the implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ToolApp;

/// Result type for store operations
pub type StoreResult<T> = anyhow::Result<T>;

/// Access tokens used to authenticate transports and proxy calls
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Get the access token for a project, if one is provisioned
    async fn access_token(&self, project_id: Uuid) -> StoreResult<Option<String>>;
}

/// Project-scoped tool app listings
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// List every tool app visible to a project
    async fn list_tool_apps(&self, project_id: Uuid) -> StoreResult<Vec<ToolApp>>;
}

/// In-memory token store, for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<Uuid, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_token(&self, project_id: Uuid, token: impl Into<String>) {
        self.tokens.write().await.insert(project_id, token.into());
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn access_token(&self, project_id: Uuid) -> StoreResult<Option<String>> {
        Ok(self.tokens.read().await.get(&project_id).cloned())
    }
}

/// In-memory project store, for tests and single-process embedding
#[derive(Default)]
pub struct InMemoryProjectStore {
    apps: RwLock<HashMap<Uuid, Vec<ToolApp>>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_tool_apps(&self, project_id: Uuid, apps: Vec<ToolApp>) {
        self.apps.write().await.insert(project_id, apps);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn list_tool_apps(&self, project_id: Uuid) -> StoreResult<Vec<ToolApp>> {
        Ok(self
            .apps
            .read()
            .await
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }
}
