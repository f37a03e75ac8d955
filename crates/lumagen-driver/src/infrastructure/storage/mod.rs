//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML file listing the driver settings
//! and the processors to control.  The file is read-only from the driver's
//! point of view; a missing file means "defaults, no devices".

pub mod config;
