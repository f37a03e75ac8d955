//! # lumagen-core
//!
//! Shared vocabulary for controlling a Lumagen video processor: domain state
//! enums, the attribute model published to remote-control UIs, the static
//! catalog of remote commands, and the operation model handed to a transport.
//!
//! This crate has no dependencies on sockets, async runtimes, or UI
//! frameworks.  Everything in it can be unit-tested in isolation.
//!
//! # Architecture overview
//!
//! A driver process keeps one *session* per physical processor.  The session
//! receives per-field notifications from a transport (power status, input
//! labels, detected aspect ratio, ...) and sends protocol operations back.
//! This crate defines the types that flow across those seams:
//!
//! - **`domain`** – Power, device and connection state, device identity, and
//!   the attribute model (`AttributeDelta`) that describes what changed for
//!   which published entity.
//!
//! - **`command`** – The statically enumerated remote commands
//!   (`SimpleCommand`), their display names, and the explicit
//!   `CommandRegistry` that maps each canonical identifier to a typed
//!   operation descriptor.
//!
//! - **`protocol`** – Operations and their arguments (`Operation`,
//!   `OperationArgs`), transport notifications (`TransportEvent`), and the
//!   `StatusCode` returned by the command intake.

pub mod command;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `lumagen_core::PowerState` instead of `lumagen_core::domain::power::PowerState`.
pub use command::registry::{
    CommandError, CommandRegistry, ControlCommand, OperationDescriptor, ResolvedCommand,
};
pub use command::simple::{Applicability, CommandDescriptor, SimpleCommand};
pub use domain::attributes::{
    AttributeChange, AttributeDelta, AttributeKey, AttributeValue, EntityKind,
};
pub use domain::connection::ConnectionState;
pub use domain::device::{DeviceIdentity, DeviceInfo, DEFAULT_PORT};
pub use domain::power::{DeviceState, PowerState, RemoteState, UnknownPowerState};
pub use protocol::notification::{LinkState, NotificationField, RawValue, TransportEvent};
pub use protocol::operation::{ArgShape, Operation, OperationArgs, Param};
pub use protocol::status::StatusCode;
