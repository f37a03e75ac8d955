//! Command catalog and registry.

pub mod registry;
pub mod simple;

pub use registry::{CommandError, CommandRegistry, ControlCommand, OperationDescriptor, ResolvedCommand};
pub use simple::{Applicability, CommandDescriptor, SimpleCommand};
