//! Transport seam.
//!
//! The transport owns the socket (or serial-over-IP adapter) to one
//! processor and the processor's line-protocol codec.  The session treats it
//! as a black box:
//!
//! ```text
//!            open / close / send / query_identity
//!  Session ─────────────────────────────────────────► Transport ──► device
//!     ▲                                                   │
//!     └────────── TransportEvent (single channel) ────────┘
//! ```
//!
//! # Notification channel (for beginners)
//!
//! Notifications are delivered on a Tokio *unbounded* MPSC channel.  The
//! transport keeps the sending half and pushes every event onto it without
//! ever waiting, so the code that raised a notification is never blocked by
//! a slow consumer.  The receiving half is handed out exactly once by
//! [`Transport::take_events`]; the session that takes it becomes the only
//! consumer, and a second call returns `None`.

pub mod mock;

use async_trait::async_trait;
use lumagen_core::{DeviceIdentity, Operation, TransportEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Receiving half of a transport's notification channel.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket-level failure.
    #[error("I/O error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The device did not answer in time.
    #[error("timed out waiting for the device")]
    Timeout,

    /// The link is not open.
    #[error("connection closed")]
    Closed,

    /// The device or codec refused the operation.
    #[error("device rejected {0}")]
    Rejected(String),
}

/// Connection to one processor.
///
/// Infrastructure implementations speak the processor's line protocol; the
/// in-tree [`mock::MockTransport`] records calls and can simulate a device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the link to `host:port`.
    ///
    /// On success the transport emits `Link(Connected)` before any field
    /// notification of the new link, and `Link(Disconnected)` whenever an
    /// open link goes down.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the link cannot be established.
    async fn open(&self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Closes the link.  Closing an already closed link is not an error.
    async fn close(&self) -> Result<(), TransportError>;

    /// Encodes and sends one operation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the operation could not be delivered.
    async fn send(&self, operation: &Operation) -> Result<(), TransportError>;

    /// Asks the processor for its identity.
    async fn query_identity(&self) -> Result<DeviceIdentity, TransportError>;

    /// Names of the operations this transport can encode.
    fn capabilities(&self) -> Vec<String>;

    /// Hands out the notification receiver.  Returns `None` after the first call.
    fn take_events(&self) -> Option<EventReceiver>;
}
