//! Session connection lifecycle.
//!
//! ```text
//!                connect()              open ok
//! Disconnected ────────────► Connecting ────────► Connected
//!      ▲                        │                    │
//!      │      open failed /     │                    │ disconnect()
//!      │      timed out         │                    ▼
//!      ├────────────────────────┘              Disconnecting
//!      │                                             │
//!      ├─────────────────────────────────────────────┘ close finished
//!      │
//!      └──────────── link dropped (transport notification) ── Connected
//! ```
//!
//! The only transition not caused by a local call is `Connected →
//! Disconnected`, raised when the transport reports that the link dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of one device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No link.  The initial state.
    #[default]
    Disconnected,
    /// `connect()` is opening the transport.
    Connecting,
    /// The transport is open; commands may be sent.
    Connected,
    /// `disconnect()` is closing the transport.
    Disconnecting,
}

impl ConnectionState {
    /// Returns `true` when `self → next` is an edge of the lifecycle graph.
    ///
    /// Self-loops are not edges: callers treat them as no-ops before asking.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connecting, Disconnecting)
                | (Connected, Disconnecting)
                | (Connected, Disconnected)
                | (Disconnecting, Disconnected)
        )
    }

    /// Returns `true` only for [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Returns `true` while an open or close is in flight.
    pub fn is_transitional(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Disconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(s)
    }
}
