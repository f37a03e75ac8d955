//! Domain entities for Lumagen control.
//!
//! Pure data types with no infrastructure dependencies.  Outer layers (the
//! session, the normalizer, the attribute sink) depend on these types; they
//! never depend on the outer layers.

/// Published-attribute model: entity kinds, keys, values and deltas.
pub mod attributes;

/// Session connection lifecycle states.
pub mod connection;

/// Device identity as reported by the processor and as configured by the user.
pub mod device;

/// Power, device and remote-entity state enums.
pub mod power;
