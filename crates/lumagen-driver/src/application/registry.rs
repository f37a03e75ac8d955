//! SessionRegistry: every live session, keyed by device id.
//!
//! The registry is created once at startup and passed to whoever needs a
//! lookup (the command intake, the binary's shutdown path).  It is a plain
//! value; callers that share it put it behind a lock.
//!
//! Registration is first-wins: a second session for the same device id is
//! refused and dropped, so a device never has two transports open.

use std::collections::HashMap;
use std::sync::Arc;

use lumagen_core::EntityKind;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::application::session::{Session, SessionError};

/// Owner of all device sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `session`.  Returns `false` (and drops `session`) if its device
    /// id is already registered.
    pub fn register(&mut self, session: Session) -> bool {
        let id = session.device_id().to_string();
        if self.sessions.contains_key(&id) {
            warn!(device = %id, "session already registered; keeping the first");
            return false;
        }
        info!(device = %id, "session registered");
        self.sessions.insert(id, Arc::new(session));
        true
    }

    /// Removes a session and hands it back so the caller can disconnect it.
    pub fn unregister(&mut self, device_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(device_id);
        if removed.is_some() {
            info!(device = %device_id, "session unregistered");
        }
        removed
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(device_id).cloned()
    }

    /// Registered device ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes every session and returns them.
    pub fn clear(&mut self) -> Vec<Arc<Session>> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// Connects every session concurrently.  Results are sorted by device id.
    pub async fn connect_all(&self) -> Vec<(String, Result<(), SessionError>)> {
        let mut tasks = JoinSet::new();
        for session in self.sessions.values() {
            let session = Arc::clone(session);
            tasks.spawn(async move {
                let result = session.connect().await;
                (session.device_id().to_string(), result)
            });
        }

        let mut results = Vec::with_capacity(self.sessions.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => results.push(outcome),
                Err(e) => warn!("connect task failed: {e}"),
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Disconnects every session concurrently.
    pub async fn disconnect_all(&self) {
        let mut tasks = JoinSet::new();
        for session in self.sessions.values() {
            let session = Arc::clone(session);
            tasks.spawn(async move { session.disconnect().await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("disconnect task failed: {e}");
            }
        }
    }

    /// Device id of an entity id such as `media_player.1018009022`.
    pub fn device_id_from_entity(entity_id: &str) -> Option<&str> {
        EntityKind::split_entity_id(entity_id).map(|(_, device_id)| device_id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
