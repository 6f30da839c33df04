//! Session opening over Streamable HTTP
//!
//! The [`ToolTransport`] trait hides how sessions come to life so the
//! connection manager can be driven by mocks in tests. The production
//! implementation speaks Streamable HTTP through rmcp with a bearer
//! token injected from the token store.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use memdeck_core::TokenStore;

use crate::session::{RmcpToolSession, SessionHandle, ToolClientHandler};

/// A freshly opened session plus a signal for unexpected drops
pub struct OpenedSession {
    pub session: SessionHandle,
    /// Resolves when the session ends without `close()` having been called
    pub closed: oneshot::Receiver<()>,
}

/// Opens sessions to a project's tool server
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Open a new session, completing the MCP handshake
    ///
    /// The caller is responsible for enforcing a handshake timeout.
    async fn open(&self, project_id: Uuid) -> anyhow::Result<OpenedSession>;
}

/// Streamable HTTP transport with bearer-token authentication
pub struct HttpToolTransport {
    url: Url,
    server_name: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpToolTransport {
    pub fn new(url: Url, server_name: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            url,
            server_name: server_name.into(),
            tokens,
        }
    }

    fn build_http_client(
        &self,
        header_map: reqwest::header::HeaderMap,
    ) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .context("Failed to build HTTP client")
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn open(&self, project_id: Uuid) -> anyhow::Result<OpenedSession> {
        let mut header_map = reqwest::header::HeaderMap::new();
        if let Some(token) = self.tokens.access_token(project_id).await? {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                .context("Invalid token format")?;
            header_map.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = self.build_http_client(header_map)?;
        let transport_config = StreamableHttpClientTransportConfig::with_uri(self.url.as_str());
        let transport = StreamableHttpClientTransport::with_client(client, transport_config);

        let handler = ToolClientHandler::new(&self.server_name);
        let client = handler
            .serve(transport)
            .await
            .with_context(|| format!("Handshake with '{}' failed", self.server_name))?;

        let peer = client.peer().clone();
        let close_token = CancellationToken::new();
        let session = Arc::new(RmcpToolSession::new(peer, close_token.clone()));
        let (closed_tx, closed_rx) = oneshot::channel();

        // Watcher owns the running service. It exits when the session is
        // closed locally or the remote side ends it; dropping the service
        // shuts down its background task.
        let server_name = self.server_name.clone();
        tokio::spawn(async move {
            let waited = client.waiting();
            tokio::pin!(waited);
            tokio::select! {
                _ = close_token.cancelled() => {
                    debug!(
                        server = %server_name,
                        "[HttpToolTransport] Session closed locally"
                    );
                }
                quit = &mut waited => {
                    debug!(
                        server = %server_name,
                        reason = ?quit,
                        "[HttpToolTransport] Session ended by remote"
                    );
                    let _ = closed_tx.send(());
                }
            }
        });

        Ok(OpenedSession {
            session,
            closed: closed_rx,
        })
    }
}
