//! Operation, notification and status vocabulary shared with the transport.
//!
//! The device's line protocol itself lives in the transport; this module only
//! names what crosses the boundary.

pub mod notification;
pub mod operation;
pub mod status;

pub use notification::{LinkState, NotificationField, RawValue, TransportEvent};
pub use operation::{ArgShape, Operation, OperationArgs, Param};
pub use status::StatusCode;
