//! Infrastructure layer for the driver.
//!
//! Contains the adapters around the session core: the transport seam (and
//! its in-tree simulated processor), the published-attribute sink, and
//! file-system configuration.
//!
//! **Dependency rule**: this layer may depend on `lumagen_core`, but MUST NOT
//! depend on the `application` layer.

pub mod publish;
pub mod storage;
pub mod transport;
