//! # Memdeck Connection Layer
//!
//! Session lifecycle, transport selection, and fallback routing for
//! project tool server links.
//!
//! ## Modules
//!
//! - `session` - Live session handles and the rmcp-backed implementation
//! - `transport` - Session opening (Streamable HTTP with bearer auth)
//! - `manager` - Connection state machine with reconnection and grace period
//! - `selector` - Per-call Direct vs Fallback decision
//! - `routing` - Fallback route resolution (synthetic id substitution)
//! - `proxy` - Server-side proxy API client for fallback calls
//! - `dispatch` - Tool call dispatcher combining all of the above

pub mod dispatch;
pub mod manager;
pub mod proxy;
pub mod routing;
pub mod selector;
pub mod session;
pub mod transport;

pub use dispatch::ToolDispatcher;
pub use manager::{ConnectionManager, LinkSnapshot};
pub use proxy::{HttpProxyApi, ProxyApi};
pub use routing::{resolve_route, FallbackRoute};
pub use selector::{select_transport, TransportMode};
pub use session::{SessionHandle, ToolSession};
pub use transport::{HttpToolTransport, OpenedSession, ToolTransport};
