//! Connection manager - state machine for a project's tool server link
//!
//! One manager exists per `(project_id, enabled)` key. It owns the link's
//! lifecycle end to end:
//!
//! - Automatic reconnection with exponential backoff, bounded by a
//!   configurable attempt budget
//! - A grace period that suppresses negative status on transient drops,
//!   so short blips never flicker the UI
//! - Race condition prevention: a monotonic `flow_id` invalidates stale
//!   handshake results, and a reentrancy flag collapses concurrent
//!   connect requests into one
//! - Single pending timer per concern (one reconnect, one grace)

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use memdeck_core::{ConnError, ConnectionConfig, ConnectionStatus, DomainEvent, EventSender};

use crate::session::SessionHandle;
use crate::transport::{OpenedSession, ToolTransport};

/// Point-in-time view of a link, consumed by the transport selector
#[derive(Clone)]
pub struct LinkSnapshot {
    pub status: ConnectionStatus,
    pub grace_active: bool,
    pub session: Option<SessionHandle>,
}

/// Mutable link state, guarded by the manager's mutex
struct ConnState {
    status: ConnectionStatus,
    session: Option<SessionHandle>,
    last_error: Option<String>,
    reconnect_attempts: u32,
    grace_active: bool,
    /// Monotonic counter; stale callbacks are validated against it
    flow_id: u64,
    /// Reentrancy guard for connect()
    connect_in_flight: bool,
    reconnect_timer: Option<JoinHandle<()>>,
    grace_timer: Option<JoinHandle<()>>,
}

impl Default for ConnState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            session: None,
            last_error: None,
            reconnect_attempts: 0,
            grace_active: false,
            flow_id: 0,
            connect_in_flight: false,
            reconnect_timer: None,
            grace_timer: None,
        }
    }
}

struct ManagerInner {
    project_id: Uuid,
    server_name: String,
    enabled: bool,
    config: ConnectionConfig,
    transport: Arc<dyn ToolTransport>,
    events: EventSender,
    state: Mutex<ConnState>,
}

/// Handle to a link's state machine
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    pub fn new(
        project_id: Uuid,
        server_name: impl Into<String>,
        enabled: bool,
        config: ConnectionConfig,
        transport: Arc<dyn ToolTransport>,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                project_id,
                server_name: server_name.into(),
                enabled,
                config,
                transport,
                events,
                state: Mutex::new(ConnState::default()),
            }),
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.inner.project_id
    }

    pub fn server_name(&self) -> &str {
        &self.inner.server_name
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }

    pub fn in_grace_period(&self) -> bool {
        self.inner.state.lock().grace_active
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect_attempts
    }

    /// The live session handle, if any
    ///
    /// The handle stays set during a grace period even though the link
    /// dropped, so callers that were on it can keep trying.
    pub fn session(&self) -> Option<SessionHandle> {
        self.inner.state.lock().session.clone()
    }

    /// Snapshot for the transport selector
    pub fn snapshot(&self) -> LinkSnapshot {
        let state = self.inner.state.lock();
        LinkSnapshot {
            status: state.status,
            grace_active: state.grace_active,
            session: state.session.clone(),
        }
    }

    /// Open a session, closing any prior one first
    ///
    /// During a grace period the prior session is kept and only replaced
    /// on success. No-op while another connect is in flight or the link
    /// is disabled.
    pub async fn connect(&self) {
        ManagerInner::connect(&self.inner).await;
    }

    /// User-initiated reconnect: resets the attempt budget and connects now
    pub async fn reconnect(&self) {
        ManagerInner::reconnect(&self.inner).await;
    }

    /// Tear the link down: cancel timers, close the session, go quiet
    pub async fn teardown(&self) {
        ManagerInner::teardown(&self.inner).await;
    }

    /// Report that a session dropped unexpectedly
    ///
    /// Ignored unless `session_id` matches the current session. Wired to
    /// the transport's drop signal by [`ConnectionManager::connect`].
    pub async fn handle_session_drop(&self, session_id: Uuid) {
        ManagerInner::handle_session_drop(&self.inner, session_id).await;
    }
}

impl ManagerInner {
    fn emit_status_locked(inner: &Arc<Self>, state: &ConnState, message: Option<String>) {
        inner.events.emit(DomainEvent::ConnectionStatusChanged {
            project_id: inner.project_id,
            server_name: inner.server_name.clone(),
            status: state.status,
            flow_id: state.flow_id,
            message,
        });
    }

    fn emit_grace(inner: &Arc<Self>, active: bool) {
        inner.events.emit(DomainEvent::GracePeriodChanged {
            project_id: inner.project_id,
            server_name: inner.server_name.clone(),
            active,
        });
    }

    async fn connect(inner: &Arc<Self>) {
        let (flow_id, prior) = {
            let mut state = inner.state.lock();
            if !inner.enabled {
                debug!(
                    project_id = %inner.project_id,
                    server = %inner.server_name,
                    "[ConnectionManager] Connect skipped, link is disabled"
                );
                return;
            }
            if state.connect_in_flight {
                debug!(
                    project_id = %inner.project_id,
                    server = %inner.server_name,
                    "[ConnectionManager] Connect already in flight"
                );
                return;
            }
            state.flow_id += 1;
            state.connect_in_flight = true;
            // During a grace period callers may still be on the old session,
            // so it stays until a successful handshake replaces it. Outside
            // grace it is dead weight and gets evicted up front.
            let prior = if state.grace_active {
                None
            } else {
                state.session.take()
            };
            if !state.grace_active {
                state.status = ConnectionStatus::Connecting;
                state.last_error = None;
                Self::emit_status_locked(inner, &state, None);
            }
            (state.flow_id, prior)
        };

        if let Some(session) = prior {
            session.close().await;
        }

        info!(
            project_id = %inner.project_id,
            server = %inner.server_name,
            flow_id = flow_id,
            "[ConnectionManager] Opening session"
        );

        let opened = tokio::time::timeout(
            inner.config.handshake_timeout(),
            inner.transport.open(inner.project_id),
        )
        .await;

        match opened {
            Ok(Ok(opened)) => Self::on_connected(inner, flow_id, opened).await,
            Ok(Err(e)) => Self::on_connect_failed(
                inner,
                flow_id,
                ConnError::transport(format!("{:#}", e)).to_string(),
            ),
            Err(_) => Self::on_connect_failed(
                inner,
                flow_id,
                ConnError::HandshakeTimeout(inner.config.handshake_timeout_ms).to_string(),
            ),
        }
    }

    async fn on_connected(inner: &Arc<Self>, flow_id: u64, opened: OpenedSession) {
        let OpenedSession { session, closed } = opened;

        let replaced = {
            let mut state = inner.state.lock();
            state.connect_in_flight = false;

            if state.flow_id != flow_id {
                warn!(
                    project_id = %inner.project_id,
                    server = %inner.server_name,
                    expected_flow_id = state.flow_id,
                    actual_flow_id = flow_id,
                    "[ConnectionManager] Dropping stale connect result"
                );
                // The new session is already live; close it instead of leaking
                Some(session)
            } else {
                if let Some(timer) = state.grace_timer.take() {
                    timer.abort();
                }
                if let Some(timer) = state.reconnect_timer.take() {
                    timer.abort();
                }
                let grace_was_active = state.grace_active;
                state.grace_active = false;
                state.reconnect_attempts = 0;
                state.status = ConnectionStatus::Connected;
                state.last_error = None;

                let session_id = session.id();
                let old = state.session.replace(session);

                info!(
                    project_id = %inner.project_id,
                    server = %inner.server_name,
                    flow_id = flow_id,
                    "[ConnectionManager] Connected"
                );
                Self::emit_status_locked(inner, &state, None);
                if grace_was_active {
                    Self::emit_grace(inner, false);
                }

                // Watch for unexpected drops of this particular session
                let weak = Arc::downgrade(inner);
                tokio::spawn(async move {
                    if closed.await.is_ok() {
                        if let Some(inner) = weak.upgrade() {
                            Self::handle_session_drop(&inner, session_id).await;
                        }
                    }
                });

                old
            }
        };

        if let Some(session) = replaced {
            session.close().await;
        }
    }

    fn on_connect_failed(inner: &Arc<Self>, flow_id: u64, message: String) {
        let mut state = inner.state.lock();
        state.connect_in_flight = false;

        if state.flow_id != flow_id {
            debug!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                "[ConnectionManager] Ignoring stale connect failure"
            );
            return;
        }

        warn!(
            project_id = %inner.project_id,
            server = %inner.server_name,
            flow_id = flow_id,
            error = %message,
            "[ConnectionManager] Connect failed"
        );

        state.last_error = Some(message.clone());
        if !state.grace_active {
            state.status = ConnectionStatus::Error;
            Self::emit_status_locked(inner, &state, Some(message));
        }

        Self::schedule_reconnect_locked(inner, &mut state);
    }

    /// Arm the reconnect timer; no-op when one is already pending
    fn schedule_reconnect_locked(inner: &Arc<Self>, state: &mut ConnState) {
        if state.reconnect_timer.is_some() {
            debug!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                "[ConnectionManager] Reconnect already scheduled"
            );
            return;
        }

        if state.reconnect_attempts >= inner.config.max_reconnect_attempts {
            let message = ConnError::ReconnectExhausted {
                attempts: state.reconnect_attempts,
                message: state.last_error.clone().unwrap_or_default(),
            }
            .to_string();
            warn!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                attempts = state.reconnect_attempts,
                "[ConnectionManager] Reconnect budget exhausted"
            );
            state.last_error = Some(message.clone());
            if !state.grace_active {
                state.status = ConnectionStatus::Error;
                Self::emit_status_locked(inner, state, Some(message));
            }
            return;
        }

        let attempt = state.reconnect_attempts;
        let delay = inner.config.backoff_delay(attempt);
        state.reconnect_attempts += 1;

        info!(
            project_id = %inner.project_id,
            server = %inner.server_name,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "[ConnectionManager] Scheduling reconnect"
        );

        let weak = Arc::downgrade(inner);
        state.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.state.lock().reconnect_timer = None;
                Self::connect(&inner).await;
            }
        }));
    }

    async fn handle_session_drop(inner: &Arc<Self>, session_id: Uuid) {
        let mut state = inner.state.lock();

        let current = state.session.as_ref().map(|s| s.id());
        if current != Some(session_id) {
            debug!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                "[ConnectionManager] Ignoring drop from a replaced session"
            );
            return;
        }

        warn!(
            project_id = %inner.project_id,
            server = %inner.server_name,
            "[ConnectionManager] Session dropped, entering grace period"
        );

        if state.grace_active {
            // A grace window is already running; its deadline stands
            debug!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                "[ConnectionManager] Grace period already active"
            );
        } else {
            state.grace_active = true;
            Self::emit_grace(inner, true);

            let grace = inner.config.grace_period();
            let weak = Arc::downgrade(inner);
            state.grace_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                if let Some(inner) = weak.upgrade() {
                    Self::on_grace_expired(&inner).await;
                }
            }));
        }

        Self::schedule_reconnect_locked(inner, &mut state);
    }

    async fn on_grace_expired(inner: &Arc<Self>) {
        let session = {
            let mut state = inner.state.lock();
            state.grace_timer = None;
            if !state.grace_active {
                return;
            }
            state.grace_active = false;

            // Reveal the state the grace window was hiding
            let message = state.last_error.clone();
            state.status = if message.is_some() {
                ConnectionStatus::Error
            } else {
                ConnectionStatus::Disconnected
            };

            info!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                status = %state.status,
                "[ConnectionManager] Grace period expired"
            );

            Self::emit_status_locked(inner, &state, message);
            Self::emit_grace(inner, false);

            state.session.take()
        };

        if let Some(session) = session {
            session.close().await;
        }
    }

    async fn reconnect(inner: &Arc<Self>) {
        {
            let mut state = inner.state.lock();
            state.reconnect_attempts = 0;
            if let Some(timer) = state.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(timer) = state.grace_timer.take() {
                timer.abort();
            }
            if state.grace_active {
                state.grace_active = false;
                Self::emit_grace(inner, false);
            }
            info!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                "[ConnectionManager] Manual reconnect requested"
            );
        }
        Self::connect(inner).await;
    }

    async fn teardown(inner: &Arc<Self>) {
        let session = {
            let mut state = inner.state.lock();
            // Invalidate every pending callback and timeout
            state.flow_id += 1;
            state.connect_in_flight = false;
            if let Some(timer) = state.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(timer) = state.grace_timer.take() {
                timer.abort();
            }
            let grace_was_active = state.grace_active;
            state.grace_active = false;
            state.reconnect_attempts = 0;
            state.status = ConnectionStatus::Disconnected;
            state.last_error = None;
            let session = state.session.take();

            info!(
                project_id = %inner.project_id,
                server = %inner.server_name,
                flow_id = state.flow_id,
                "[ConnectionManager] Torn down"
            );
            Self::emit_status_locked(inner, &state, None);
            if grace_was_active {
                Self::emit_grace(inner, false);
            }
            session
        };

        if let Some(session) = session {
            session.close().await;
        }
    }
}
