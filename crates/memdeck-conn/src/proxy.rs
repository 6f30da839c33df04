//! Server-side proxy API client
//!
//! The fallback path for tool calls: instead of the live session, calls
//! go to the Memdeck backend, which relays them to the tool server. The
//! backend wraps every payload in a `{ "data": ..., "meta": ... }`
//! envelope.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use memdeck_core::{ResourceInfo, TokenStore, ToolOutcome};

/// Response wrapper from the proxy API
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
    #[allow(dead_code)]
    meta: Option<Value>,
}

/// Fallback tool invocation through the backend
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// Call a tool by backend app identity
    async fn call_tool_by_app(
        &self,
        project_id: Uuid,
        app_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutcome>;

    /// Call a tool by server name when no app identity is known
    async fn call_tool_by_server(
        &self,
        project_id: Uuid,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutcome>;

    /// List a server's resources through the backend
    async fn list_resources(&self, project_id: Uuid, server_name: &str)
        -> Result<Vec<ResourceInfo>>;

    /// Read a resource's contents through the backend
    async fn read_resource(
        &self,
        project_id: Uuid,
        server_name: &str,
        uri: &str,
    ) -> Result<Vec<Value>>;
}

/// HTTP implementation of the proxy API
pub struct HttpProxyApi {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl HttpProxyApi {
    pub fn new(base_url: String, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Memdeck/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            client,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn authorize(
        &self,
        project_id: Uuid,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        Ok(match self.tokens.access_token(project_id).await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .context("Failed to send request to proxy API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Proxy API returned status {}: {}", status, body);
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .context("Failed to parse proxy API response")?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ProxyApi for HttpProxyApi {
    async fn call_tool_by_app(
        &self,
        project_id: Uuid,
        app_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutcome> {
        let url = format!(
            "{}/v1/projects/{}/apps/{}/tools/{}/call",
            self.base_url, project_id, app_id, tool_name
        );
        let request = self
            .authorize(project_id, self.client.post(&url))
            .await?
            .json(&serde_json::json!({ "arguments": arguments }));
        self.execute(request).await
    }

    async fn call_tool_by_server(
        &self,
        project_id: Uuid,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolOutcome> {
        let url = format!(
            "{}/v1/projects/{}/servers/{}/tools/{}/call",
            self.base_url, project_id, server_name, tool_name
        );
        let request = self
            .authorize(project_id, self.client.post(&url))
            .await?
            .json(&serde_json::json!({ "arguments": arguments }));
        self.execute(request).await
    }

    async fn list_resources(
        &self,
        project_id: Uuid,
        server_name: &str,
    ) -> Result<Vec<ResourceInfo>> {
        let url = format!(
            "{}/v1/projects/{}/servers/{}/resources",
            self.base_url, project_id, server_name
        );
        let request = self.authorize(project_id, self.client.get(&url)).await?;
        self.execute(request).await
    }

    async fn read_resource(
        &self,
        project_id: Uuid,
        server_name: &str,
        uri: &str,
    ) -> Result<Vec<Value>> {
        let url = format!(
            "{}/v1/projects/{}/servers/{}/resources/read",
            self.base_url, project_id, server_name
        );
        let request = self
            .authorize(project_id, self.client.post(&url))
            .await?
            .json(&serde_json::json!({ "uri": uri }));
        self.execute(request).await
    }
}
