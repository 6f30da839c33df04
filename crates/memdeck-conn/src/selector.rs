//! Per-call transport selection
//!
//! Every tool call decides fresh between the direct session and the
//! server-side proxy. The decision is a pure function of the link
//! snapshot plus the mode used for the previous call, which gives the
//! grace period its hysteresis: a caller that was on the direct path
//! stays on it while the link is in grace, instead of bouncing to the
//! proxy and back within a few seconds.

use serde::{Deserialize, Serialize};

use crate::manager::LinkSnapshot;

/// How a tool call reaches its server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Over the live session
    Direct,
    /// Through the server-side proxy
    Fallback,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the transport for one call
///
/// Direct requires a live session handle; a link in Error always falls
/// back; during a grace period the previous mode wins if it was Direct.
pub fn select_transport(snapshot: &LinkSnapshot, prior: TransportMode) -> TransportMode {
    let has_session = snapshot.session.is_some();

    if snapshot.status.is_error() {
        return TransportMode::Fallback;
    }
    if snapshot.status.is_connected() && has_session {
        return TransportMode::Direct;
    }
    if snapshot.grace_active && prior == TransportMode::Direct && has_session {
        return TransportMode::Direct;
    }
    TransportMode::Fallback
}
