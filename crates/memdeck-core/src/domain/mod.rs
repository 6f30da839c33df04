//! Domain entities, value objects, and events
//!
//! This module contains all domain-level types for Memdeck:
//! - Entities (ToolApp, ToolOutcome, ResourceInfo)
//! - Value Objects (ConnectionStatus, ConnectionConfig)
//! - Domain Events (DomainEvent enum for event-driven architecture)

pub mod config;
mod event;
mod tool_app;

pub use config::ConnectionConfig;
pub use event::{ConnectionStatus, DomainEvent};
pub use tool_app::{ResourceInfo, ToolApp, ToolOutcome, SYNTHETIC_PREFIX};
