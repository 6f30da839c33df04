//! Tool call dispatcher
//!
//! Glues the pieces together: snapshots the link, selects a transport,
//! and either calls over the live session or resolves a fallback route
//! and goes through the proxy. Remembers the mode of the previous call
//! so the selector can apply grace-period hysteresis.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use memdeck_core::{ConnError, DomainEvent, EventSender, ProjectStore, ResourceInfo, ToolApp, ToolOutcome};

use crate::manager::ConnectionManager;
use crate::proxy::ProxyApi;
use crate::routing::{resolve_route, FallbackRoute};
use crate::selector::{select_transport, TransportMode};

/// Routes tool calls for one project link
pub struct ToolDispatcher {
    manager: ConnectionManager,
    proxy: Arc<dyn ProxyApi>,
    project_store: Arc<dyn ProjectStore>,
    events: EventSender,
    call_timeout: Duration,
    /// Mode used for the previous call, feeds selector hysteresis
    last_mode: Mutex<TransportMode>,
}

impl ToolDispatcher {
    pub fn new(
        manager: ConnectionManager,
        proxy: Arc<dyn ProxyApi>,
        project_store: Arc<dyn ProjectStore>,
        events: EventSender,
        call_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            proxy,
            project_store,
            events,
            call_timeout,
            last_mode: Mutex::new(TransportMode::Fallback),
        }
    }

    /// Decide the transport for the next call and record it
    fn pick_mode(&self) -> TransportMode {
        let snapshot = self.manager.snapshot();
        let mut last = self.last_mode.lock();
        let mode = select_transport(&snapshot, *last);
        *last = mode;
        mode
    }

    /// The mode used by the most recent call
    pub fn last_mode(&self) -> TransportMode {
        *self.last_mode.lock()
    }

    /// Invoke a tool over whichever transport the selector picks
    pub async fn call_tool(&self, app: &ToolApp, arguments: Value) -> Result<ToolOutcome> {
        let mode = self.pick_mode();
        debug!(
            project_id = %self.manager.project_id(),
            app_id = %app.id,
            tool = %app.tool_name,
            mode = %mode,
            "[ToolDispatcher] Dispatching tool call"
        );

        match mode {
            TransportMode::Direct => self.call_direct(app, arguments).await,
            TransportMode::Fallback => self.call_fallback(app, arguments).await,
        }
    }

    async fn call_direct(&self, app: &ToolApp, arguments: Value) -> Result<ToolOutcome> {
        let session = self.manager.session().ok_or(ConnError::NotConnected)?;

        let outcome = tokio::time::timeout(
            self.call_timeout,
            session.call_tool(&app.tool_name, arguments),
        )
        .await
        .map_err(|_| ConnError::CallTimeout(self.call_timeout.as_millis() as u64))??;

        Ok(outcome)
    }

    /// Keep proxy failures inside the result envelope so the caller's
    /// error handling stays uniform across both transports
    fn proxy_outcome(&self, result: Result<ToolOutcome>, tool_name: &str) -> ToolOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    project_id = %self.manager.project_id(),
                    tool = %tool_name,
                    error = %format!("{:#}", e),
                    "[ToolDispatcher] Proxy call failed"
                );
                ToolOutcome::error(format!("Tool call failed: {:#}", e))
            }
        }
    }

    async fn call_fallback(&self, app: &ToolApp, arguments: Value) -> Result<ToolOutcome> {
        let project_id = self.manager.project_id();
        match resolve_route(self.project_store.as_ref(), project_id, app).await {
            FallbackRoute::ByApp {
                app_id,
                substituted,
            } => {
                if substituted {
                    info!(
                        project_id = %project_id,
                        requested = %app.id,
                        resolved = %app_id,
                        "[ToolDispatcher] Calling through substituted app identity"
                    );
                    self.events.emit(DomainEvent::ToolAppSubstituted {
                        project_id,
                        requested_app_id: app.id.clone(),
                        resolved_app_id: app_id.clone(),
                        server_name: app.server_name.clone(),
                        tool_name: app.tool_name.clone(),
                    });
                }
                let result = self
                    .proxy
                    .call_tool_by_app(project_id, &app_id, &app.tool_name, arguments)
                    .await;
                Ok(self.proxy_outcome(result, &app.tool_name))
            }
            FallbackRoute::ByServer { server_name } => {
                let result = self
                    .proxy
                    .call_tool_by_server(project_id, &server_name, &app.tool_name, arguments)
                    .await;
                Ok(self.proxy_outcome(result, &app.tool_name))
            }
            route @ FallbackRoute::NoRoute { .. } => {
                warn!(
                    project_id = %project_id,
                    app_id = %app.id,
                    tool = %app.tool_name,
                    "[ToolDispatcher] No fallback route"
                );
                // Dead ends surface as a displayable outcome, not an error
                Ok(ToolOutcome::error(route.to_string()))
            }
        }
    }

    /// List resources over whichever transport the selector picks
    pub async fn list_resources(&self, server_name: &str) -> Result<Vec<ResourceInfo>> {
        match self.pick_mode() {
            TransportMode::Direct => {
                let session = self.manager.session().ok_or(ConnError::NotConnected)?;
                tokio::time::timeout(self.call_timeout, session.list_resources())
                    .await
                    .map_err(|_| ConnError::CallTimeout(self.call_timeout.as_millis() as u64))?
            }
            TransportMode::Fallback => {
                self.proxy
                    .list_resources(self.manager.project_id(), server_name)
                    .await
            }
        }
    }

    /// Read a resource over whichever transport the selector picks
    pub async fn read_resource(&self, server_name: &str, uri: &str) -> Result<Vec<Value>> {
        match self.pick_mode() {
            TransportMode::Direct => {
                let session = self.manager.session().ok_or(ConnError::NotConnected)?;
                tokio::time::timeout(self.call_timeout, session.read_resource(uri))
                    .await
                    .map_err(|_| ConnError::CallTimeout(self.call_timeout.as_millis() as u64))?
            }
            TransportMode::Fallback => {
                self.proxy
                    .read_resource(self.manager.project_id(), server_name, uri)
                    .await
            }
        }
    }
}
