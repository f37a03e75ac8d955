//! CommandIntake: entity-level command requests → status codes.
//!
//! Requests arrive as `(entity_id, cmd_id, params)` from whatever exposes
//! the entities.  The entity id picks the session and the command set:
//!
//! | entity            | commands                                                        |
//! |-------------------|-----------------------------------------------------------------|
//! | `media_player.*`  | on, off, toggle, select_source, cursor_*, back, menu,           |
//! |                   | context_menu, info, next, previous, play_pause, and any         |
//! |                   | catalog command                                                 |
//! | `remote.*`        | on, off, toggle, send_cmd                                       |
//! | sensors           | none (read-only)                                                |
//!
//! Every outcome is reduced to a [`StatusCode`]; nothing here panics or
//! returns an error.

use std::sync::Arc;

use lumagen_core::{EntityKind, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::application::registry::SessionRegistry;
use crate::application::session::{Session, SessionError};

/// Routes entity commands to the owning session.
#[derive(Clone)]
pub struct CommandIntake {
    registry: Arc<RwLock<SessionRegistry>>,
}

impl CommandIntake {
    pub fn new(registry: Arc<RwLock<SessionRegistry>>) -> Self {
        Self { registry }
    }

    /// Handles one command request.
    ///
    /// `params` is the JSON object sent with the command, if any.
    pub async fn handle(&self, entity_id: &str, cmd_id: &str, params: Option<&Value>) -> StatusCode {
        let Some((kind, device_id)) = EntityKind::split_entity_id(entity_id) else {
            warn!("malformed entity id: {entity_id}");
            return StatusCode::BadRequest;
        };
        let Some(session) = self.registry.read().await.get(device_id) else {
            warn!("no session for device {device_id}");
            return StatusCode::NotFound;
        };

        debug!(entity = %entity_id, "command {cmd_id} params={params:?}");
        let status = match kind {
            EntityKind::MediaPlayer => media_player(&session, cmd_id, params).await,
            EntityKind::Remote => remote(&session, cmd_id, params).await,
            _ => StatusCode::NotImplemented,
        };
        if !status.is_ok() {
            debug!(entity = %entity_id, "command {cmd_id} -> {status}");
        }
        status
    }
}

fn param<'a>(params: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    params.and_then(|p| p.get(key))
}

fn status(cmd_id: &str, result: Result<(), SessionError>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::Ok,
        Err(e) => {
            warn!("command {cmd_id} failed: {e}");
            e.status_code()
        }
    }
}

async fn media_player(session: &Session, cmd_id: &str, params: Option<&Value>) -> StatusCode {
    let navigation = match cmd_id {
        "cursor_up" => Some("up"),
        "cursor_down" => Some("down"),
        "cursor_left" => Some("left"),
        "cursor_right" => Some("right"),
        "cursor_enter" => Some("ok"),
        "back" => Some("exit"),
        "menu" => Some("menu"),
        "context_menu" => Some("alt"),
        "info" => Some("help"),
        _ => None,
    };
    if let Some(token) = navigation {
        return status(cmd_id, session.send_command(token, None).await);
    }

    match cmd_id {
        "on" => status(cmd_id, session.power_on().await),
        "off" => status(cmd_id, session.power_off().await),
        "toggle" => status(cmd_id, session.power_toggle().await),
        "play_pause" => StatusCode::Ok,
        "select_source" => match param(params, "source") {
            None => status(cmd_id, session.select_source(None).await),
            Some(Value::String(source)) => status(cmd_id, session.select_source(Some(source.as_str())).await),
            Some(other) => {
                warn!("select_source: source must be a string, got {other}");
                StatusCode::BadRequest
            }
        },
        "next" => step_source(session, cmd_id, 1).await,
        "previous" => step_source(session, cmd_id, -1).await,
        _ if session.knows_command(cmd_id) => {
            let text = param(params, "text").and_then(Value::as_str).map(str::to_string);
            status(cmd_id, session.send_command(cmd_id, text).await)
        }
        _ => {
            debug!("media player command not implemented: {cmd_id}");
            StatusCode::NotImplemented
        }
    }
}

/// Selects the source `step` positions from the active one, wrapping around.
async fn step_source(session: &Session, cmd_id: &str, step: isize) -> StatusCode {
    let snapshot = session.snapshot().await;
    if !snapshot.connection.is_connected() {
        return status(cmd_id, Err(SessionError::NotConnected));
    }
    let sources = &snapshot.state.source_list;
    if sources.is_empty() {
        warn!("{cmd_id}: source list is empty");
        return StatusCode::BadRequest;
    }

    let len = sources.len() as isize;
    let next = match snapshot.state.active_source.as_deref().and_then(|s| snapshot.state.source_index(s)) {
        Some(current) => (current as isize + step).rem_euclid(len),
        None if step > 0 => 0,
        None => len - 1,
    };
    let source = &sources[next as usize];
    status(cmd_id, session.select_source(Some(source.as_str())).await)
}

async fn remote(session: &Session, cmd_id: &str, params: Option<&Value>) -> StatusCode {
    match cmd_id {
        "on" => status(cmd_id, session.power_on().await),
        "off" => status(cmd_id, session.power_off().await),
        "toggle" => status(cmd_id, session.power_toggle().await),
        "send_cmd" => {
            let Some(command) = param(params, "command").and_then(Value::as_str) else {
                warn!("send_cmd without a command parameter");
                return StatusCode::BadRequest;
            };
            let text = param(params, "text").and_then(Value::as_str).map(str::to_string);
            status(cmd_id, session.send_command(command, text).await)
        }
        _ => {
            debug!("remote command not implemented: {cmd_id}");
            StatusCode::NotImplemented
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
