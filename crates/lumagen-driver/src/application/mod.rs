//! Application layer for the driver.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The *application* layer sits between `lumagen_core` (pure types and the
//! command catalog) and the infrastructure (transport, attribute sink,
//! configuration).  Code here:
//!
//! - **Orchestrates** one device session: connection lifecycle, command
//!   translation, notification handling.
//! - **Depends on abstractions** ([`Transport`], [`AttributeSink`]) so tests
//!   can swap in recording implementations.
//! - **Contains no socket or file-system code.**
//!
//! # Sub-modules
//!
//! - **`session`**    – One device: the connection state machine, the event
//!   pump, and the power / source / command operations.
//! - **`normalizer`** – Turns raw notifications into attribute deltas.
//! - **`translator`** – Turns abstract commands into checked protocol
//!   operations through the command registry.
//! - **`registry`**   – Every live session, keyed by device id.
//! - **`intake`**     – Entity-level command requests → status codes.
//!
//! [`Transport`]: crate::infrastructure::transport::Transport
//! [`AttributeSink`]: crate::infrastructure::publish::AttributeSink

pub mod intake;
pub mod normalizer;
pub mod registry;
pub mod session;
pub mod translator;
