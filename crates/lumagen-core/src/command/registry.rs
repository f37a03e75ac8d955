//! Explicit command registry.
//!
//! Maps every command the driver can issue to a typed [`OperationDescriptor`]
//! (executor operation name + declared argument shape).  The registry is
//! built once at startup with [`CommandRegistry::standard`] and shared; each
//! session checks it against its transport's declared capabilities with
//! [`CommandRegistry::missing_from`].
//!
//! # Resolution
//!
//! [`CommandRegistry::resolve`] accepts a free-form identifier and tries, in
//! order:
//!
//! 1. the canonical identifiers: protocol token (`source_aspect_1_85`) or
//!    enumerated name (`ASPECT_1_85`);
//! 2. the display name (`1.85`);
//!
//! and fails with [`CommandError::NotFound`] otherwise.
//!
//! # Numeric keys
//!
//! The keypad tokens `0`..`10` are not valid operation names, so their
//! operations are registered as `num_0`..`num_10`.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::command::simple::{CommandDescriptor, SimpleCommand};
use crate::protocol::operation::{ArgShape, Operation};

/// Errors raised while resolving or validating a command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The identifier matches no known command.
    #[error("unknown command: {0}")]
    NotFound(String),

    /// A parameter is missing or invalid.
    #[error("invalid argument for {command}: {reason}")]
    InvalidArgument { command: String, reason: String },

    /// The transport does not declare the operation.
    #[error("operation not supported by transport: {0}")]
    Unsupported(String),
}

impl CommandError {
    pub fn invalid(command: impl Into<String>, reason: impl Into<String>) -> Self {
        CommandError::InvalidArgument {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Structured commands that are not remote buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlCommand {
    /// Select an input by 0-based index.
    SelectSource,
    /// Ask the processor to report its input labels.
    RefreshLabels,
}

impl ControlCommand {
    pub const ALL: [ControlCommand; 2] = [ControlCommand::SelectSource, ControlCommand::RefreshLabels];
}

/// Executor operation a command maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub shape: ArgShape,
}

impl OperationDescriptor {
    fn new(name: impl Into<String>, shape: ArgShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Checks an operation built for this descriptor before it is sent.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidArgument`] when the name differs or the arguments
    /// do not fit the declared shape.
    pub fn check(&self, op: &Operation) -> Result<(), CommandError> {
        if op.name != self.name {
            return Err(CommandError::invalid(&self.name, format!("built as {}", op.name)));
        }
        if !self.shape.accepts(&op.args) {
            return Err(CommandError::invalid(
                &self.name,
                format!("arguments do not match {:?}", self.shape),
            ));
        }
        Ok(())
    }
}

/// A command identifier resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand<'a> {
    pub descriptor: CommandDescriptor,
    pub operation: &'a OperationDescriptor,
}

/// Canonical command → operation mapping.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    simple: BTreeMap<SimpleCommand, OperationDescriptor>,
    control: BTreeMap<ControlCommand, OperationDescriptor>,
}

impl CommandRegistry {
    /// Builds the registry for the full command catalog.
    pub fn standard() -> Self {
        let simple = SimpleCommand::ALL
            .into_iter()
            .map(|cmd| {
                let op = match (cmd, cmd.numeric_index()) {
                    (_, Some(n)) => OperationDescriptor::new(format!("num_{n}"), ArgShape::None),
                    // message text, seconds on screen
                    (SimpleCommand::MessageOn, None) => {
                        OperationDescriptor::new(cmd.token(), ArgShape::Positional(2))
                    }
                    _ => OperationDescriptor::new(cmd.token(), ArgShape::None),
                };
                (cmd, op)
            })
            .collect();

        let control = BTreeMap::from([
            (
                ControlCommand::SelectSource,
                OperationDescriptor::new("select_input", ArgShape::Single),
            ),
            (
                ControlCommand::RefreshLabels,
                OperationDescriptor::new("get_labels", ArgShape::Keyword(&["get_all"])),
            ),
        ]);

        Self { simple, control }
    }

    /// Resolves a free-form command identifier.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotFound`] when no command matches.
    pub fn resolve(&self, id: &str) -> Result<ResolvedCommand<'_>, CommandError> {
        let cmd = SimpleCommand::from_token(id)
            .or_else(|| SimpleCommand::from_name(id))
            .or_else(|| SimpleCommand::from_display_name(id))
            .ok_or_else(|| CommandError::NotFound(id.to_string()))?;
        let operation = self.operation(cmd).ok_or_else(|| CommandError::NotFound(id.to_string()))?;
        Ok(ResolvedCommand {
            descriptor: cmd.descriptor(),
            operation,
        })
    }

    pub fn operation(&self, cmd: SimpleCommand) -> Option<&OperationDescriptor> {
        self.simple.get(&cmd)
    }

    pub fn control(&self, cmd: ControlCommand) -> Option<&OperationDescriptor> {
        self.control.get(&cmd)
    }

    /// Every operation name the registry can emit.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.simple
            .values()
            .chain(self.control.values())
            .map(|op| op.name.as_str())
    }

    /// Operation names absent from a transport's declared capabilities.
    pub fn missing_from<S: AsRef<str>>(&self, capabilities: &[S]) -> Vec<String> {
        let declared: HashSet<&str> = capabilities.iter().map(AsRef::as_ref).collect();
        self.operation_names()
            .filter(|name| !declared.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Display names of all remote buttons, in catalog order.
    pub fn display_names(&self) -> Vec<String> {
        self.simple.keys().map(|cmd| cmd.display_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.simple.len() + self.control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::operation::Param;

    #[test]
    fn test_standard_registers_every_command() {
        let registry = CommandRegistry::standard();
        assert_eq!(registry.len(), SimpleCommand::ALL.len() + ControlCommand::ALL.len());
        for cmd in SimpleCommand::ALL {
            assert!(registry.operation(cmd).is_some(), "{cmd} missing");
        }
    }

    #[test]
    fn test_numeric_commands_map_to_prefixed_operations() {
        let registry = CommandRegistry::standard();
        let resolved = registry.resolve("7").unwrap();
        assert_eq!(resolved.descriptor.command, SimpleCommand::Num7);
        assert_eq!(resolved.descriptor.token, "7");
        assert_eq!(resolved.operation.name, "num_7");
    }

    #[test]
    fn test_resolve_tries_token_then_name_then_display() {
        let registry = CommandRegistry::standard();
        let by_token = registry.resolve("source_aspect_1_85").unwrap();
        let by_name = registry.resolve("ASPECT_1_85").unwrap();
        let by_display = registry.resolve("1.85").unwrap();
        assert_eq!(by_token, by_name);
        assert_eq!(by_name, by_display);
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let registry = CommandRegistry::standard();
        assert_eq!(
            registry.resolve("warp_drive"),
            Err(CommandError::NotFound("warp_drive".to_string()))
        );
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        // "menu" is a token and "MENU" a name; "Menu" is neither
        let registry = CommandRegistry::standard();
        assert!(registry.resolve("menu").is_ok());
        assert!(registry.resolve("MENU").is_ok());
        assert!(registry.resolve("Menu").is_err());
    }

    #[test]
    fn test_missing_from_lists_undeclared_operations() {
        // Arrange
        let registry = CommandRegistry::standard();
        let mut caps: Vec<String> = registry.operation_names().map(str::to_string).collect();
        caps.retain(|c| c != "zone" && c != "get_labels");

        // Act
        let mut missing = registry.missing_from(&caps);
        missing.sort();

        // Assert
        assert_eq!(missing, vec!["get_labels".to_string(), "zone".to_string()]);
    }

    #[test]
    fn test_missing_from_full_set_is_empty() {
        let registry = CommandRegistry::standard();
        let caps: Vec<&str> = registry.operation_names().collect();
        assert!(registry.missing_from(&caps).is_empty());
    }

    #[test]
    fn test_check_rejects_wrong_shape() {
        let registry = CommandRegistry::standard();
        let select = registry.control(ControlCommand::SelectSource).unwrap();
        assert!(select.check(&Operation::single("select_input", 2i64)).is_ok());
        assert!(matches!(
            select.check(&Operation::bare("select_input")),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_display_message_takes_text_and_duration() {
        let registry = CommandRegistry::standard();
        let op = registry.operation(SimpleCommand::MessageOn).unwrap();
        let built = Operation::positional("display_message", vec![Param::from("Hello"), Param::Int(3)]);
        assert!(op.check(&built).is_ok());
    }
}
