//! # Memdeck Core Library
//!
//! Domain logic, entities, and connection policy for Memdeck.
//!
//! ## Modules
//!
//! - `domain` - Core entities (ToolApp, ConnectionStatus, connection config)
//! - `error` - Connection error taxonomy
//! - `event_bus` - Central event distribution system
//! - `store` - Data access traits (tokens, project tool listings)

pub mod domain;
pub mod error;
pub mod event_bus;
pub mod store;

// Re-export commonly used types
pub use domain::*;
pub use error::ConnError;
pub use store::*;

// Event-driven architecture exports
pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
