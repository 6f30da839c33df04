//! Connection manager test harness

use std::sync::Arc;

use uuid::Uuid;

use memdeck_conn::ConnectionManager;
use memdeck_core::{ConnectionConfig, EventBus, EventReceiver};

use crate::mocks::MockTransport;

/// Manager wired to a scripted transport and a fresh event bus
pub struct LinkHarness {
    pub project_id: Uuid,
    pub manager: ConnectionManager,
    pub transport: Arc<MockTransport>,
    pub bus: EventBus,
}

impl LinkHarness {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        let project_id = Uuid::new_v4();
        let transport = MockTransport::new();
        let bus = EventBus::new();
        let manager = ConnectionManager::new(
            project_id,
            "memory",
            true,
            config,
            transport.clone(),
            bus.sender(),
        );
        Self {
            project_id,
            manager,
            transport,
            bus,
        }
    }

    /// Harness for a disabled link
    pub fn disabled() -> Self {
        let project_id = Uuid::new_v4();
        let transport = MockTransport::new();
        let bus = EventBus::new();
        let manager = ConnectionManager::new(
            project_id,
            "memory",
            false,
            ConnectionConfig::default(),
            transport.clone(),
            bus.sender(),
        );
        Self {
            project_id,
            manager,
            transport,
            bus,
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }
}

impl Default for LinkHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Let background tasks (timers, drop watchers) run without moving time
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
