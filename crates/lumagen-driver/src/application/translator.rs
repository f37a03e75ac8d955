//! CommandTranslator: abstract commands → protocol operations.
//!
//! The translator never talks to the transport.  It resolves a
//! [`CommandRequest`] against the shared [`CommandRegistry`], fills in
//! parameters (from the request or, where allowed, from session state),
//! checks the result against the operation's declared shape, and hands the
//! finished [`Operation`] back to the session for sending.
//!
//! Operations the transport did not declare are refused with
//! [`CommandError::Unsupported`] before anything is sent.

use std::collections::HashSet;
use std::sync::Arc;

use lumagen_core::{
    Applicability, CommandError, CommandRegistry, ControlCommand, Operation, OperationDescriptor,
    Param, SimpleCommand,
};
use tracing::{debug, info};

use crate::application::normalizer::SessionState;

/// Seconds an on-screen message stays up.
pub const MESSAGE_SECONDS: i64 = 3;

/// Something the session has been asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    PowerOn,
    Standby,
    /// Select an input by label; `None` re-selects the active source.
    SelectSource(Option<String>),
    /// A catalog command by token, enumerated name, or display name.
    Simple { id: String, param: Option<String> },
    RefreshLabels,
}

impl CommandRequest {
    pub fn simple(id: impl Into<String>) -> Self {
        CommandRequest::Simple {
            id: id.into(),
            param: None,
        }
    }
}

/// Registry-backed translator bound to one transport's capabilities.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    registry: Arc<CommandRegistry>,
    unsupported: HashSet<String>,
}

impl CommandTranslator {
    /// Builds a translator and logs the registry operations the transport lacks.
    pub fn new<S: AsRef<str>>(registry: Arc<CommandRegistry>, capabilities: &[S], device_id: &str) -> Self {
        let missing = registry.missing_from(capabilities);
        if !missing.is_empty() {
            info!(
                device = %device_id,
                "transport lacks {} operation(s): {}",
                missing.len(),
                missing.join(", ")
            );
        }
        Self {
            registry,
            unsupported: missing.into_iter().collect(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Returns `true` if the transport declared the operation.
    pub fn supports(&self, operation: &str) -> bool {
        !self.unsupported.contains(operation)
    }

    /// Translates `request` into a checked operation.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NotFound`] for unknown command identifiers.
    /// - [`CommandError::InvalidArgument`] when a needed parameter is missing
    ///   and cannot be synthesized, or a source is not in the source list.
    /// - [`CommandError::Unsupported`] when the transport lacks the operation.
    pub fn translate(&self, request: &CommandRequest, state: &SessionState) -> Result<Operation, CommandError> {
        let (descriptor, op) = match request {
            CommandRequest::PowerOn => self.bare(SimpleCommand::PowerOn)?,
            CommandRequest::Standby => self.bare(SimpleCommand::Standby)?,
            CommandRequest::SelectSource(source) => self.select_source(source.as_deref(), state)?,
            CommandRequest::Simple { id, param } => self.simple(id, param.as_deref(), state)?,
            CommandRequest::RefreshLabels => {
                let descriptor = self.control(ControlCommand::RefreshLabels)?;
                let op = Operation::keyword(descriptor.name.clone(), [("get_all", Param::Bool(false))]);
                (descriptor, op)
            }
        };

        descriptor.check(&op)?;
        if !self.supports(&op.name) {
            return Err(CommandError::Unsupported(op.name));
        }
        debug!("translated {request:?} -> {op}");
        Ok(op)
    }

    fn operation(&self, cmd: SimpleCommand) -> Result<&OperationDescriptor, CommandError> {
        self.registry
            .operation(cmd)
            .ok_or_else(|| CommandError::NotFound(cmd.name().to_string()))
    }

    fn control(&self, cmd: ControlCommand) -> Result<&OperationDescriptor, CommandError> {
        self.registry
            .control(cmd)
            .ok_or_else(|| CommandError::NotFound(format!("{cmd:?}")))
    }

    fn bare(&self, cmd: SimpleCommand) -> Result<(&OperationDescriptor, Operation), CommandError> {
        let descriptor = self.operation(cmd)?;
        Ok((descriptor, Operation::bare(descriptor.name.clone())))
    }

    fn select_source(
        &self,
        source: Option<&str>,
        state: &SessionState,
    ) -> Result<(&OperationDescriptor, Operation), CommandError> {
        let source = match source {
            Some("") => return Err(CommandError::invalid("select_source", "empty source name")),
            Some(source) => source,
            None => state
                .active_source
                .as_deref()
                .ok_or_else(|| CommandError::invalid("select_source", "no source given and none active"))?,
        };
        let index = state
            .source_index(source)
            .ok_or_else(|| CommandError::invalid("select_source", format!("{source:?} is not in the source list")))?;

        let descriptor = self.control(ControlCommand::SelectSource)?;
        Ok((descriptor, Operation::single(descriptor.name.clone(), index as i64)))
    }

    fn simple(
        &self,
        id: &str,
        param: Option<&str>,
        state: &SessionState,
    ) -> Result<(&OperationDescriptor, Operation), CommandError> {
        let resolved = self.registry.resolve(id)?;
        let descriptor = resolved.operation;
        let name = descriptor.name.clone();

        let op = match resolved.descriptor.applicability {
            Applicability::Always => Operation::bare(name),
            Applicability::RequiresParameter => {
                let text = param
                    .filter(|p| !p.is_empty())
                    .or(state.active_source.as_deref())
                    .ok_or_else(|| CommandError::invalid(id, "needs a parameter and no source is active"))?;
                Operation::positional(name, vec![Param::from(text), Param::Int(MESSAGE_SECONDS)])
            }
        };
        Ok((descriptor, op))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
