//! Published-attribute sink.
//!
//! Sessions hand every [`AttributeDelta`] to an [`AttributeSink`].  The
//! in-tree sink, [`PublishedAttributes`], keeps the last published value of
//! every `(entity, key)` pair and forwards only what actually changed, the
//! way a remote-control UI expects to be updated.
//!
//! Two entity-specific rules are applied on the way in:
//!
//! - `remote.*` entities have no standby: a device state is reduced with
//!   [`RemoteState::from`] (Standby and Off both become Off).
//! - When a sensor's state becomes Unknown its value is forced to `"none"`.
//!
//! The store also remembers the most recent forwarded changes, up to
//! [`DEFAULT_HISTORY_LIMIT`], for inspection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lumagen_core::{
    AttributeChange, AttributeDelta, AttributeKey, AttributeValue, DeviceState, EntityKind,
    RemoteState,
};
use tracing::debug;

/// Value a sensor shows once its state is unknown.
pub const SENSOR_NONE: &str = "none";

/// Number of recent changes kept by [`PublishedAttributes::new`].
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Receiver of attribute deltas.
///
/// Called from the session's event pump, one delta at a time and in
/// notification order.  Implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait AttributeSink: Send + Sync {
    fn publish(&self, delta: &AttributeDelta);
}

type EntityAttributes = BTreeMap<AttributeKey, AttributeValue>;

/// Last-published attribute store that diffs incoming deltas.
pub struct PublishedAttributes {
    entities: Mutex<HashMap<String, EntityAttributes>>,
    history: Mutex<VecDeque<AttributeChange>>,
    history_limit: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PublishedAttributes {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// A store that keeps at most `limit` recent changes.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            entities: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT))),
            history_limit: limit,
        }
    }

    /// Applies `delta` and returns the changes that differed from the
    /// last published values, after the entity rules.
    pub fn apply(&self, delta: &AttributeDelta) -> Vec<AttributeChange> {
        let mut entities = lock(&self.entities);
        let mut changed = Vec::new();

        for change in &delta.changes {
            let kind = EntityKind::split_entity_id(&change.entity_id).map(|(kind, _)| kind);
            let value = match (kind, &change.value) {
                (Some(EntityKind::Remote), AttributeValue::State(state)) => {
                    AttributeValue::RemoteState(RemoteState::from(*state))
                }
                _ => change.value.clone(),
            };

            let attrs = entities.entry(change.entity_id.clone()).or_default();
            if !store(attrs, change.key, value.clone()) {
                continue;
            }
            changed.push(AttributeChange {
                entity_id: change.entity_id.clone(),
                key: change.key,
                value: value.clone(),
            });

            let sensor_went_unknown = kind.is_some_and(EntityKind::is_sensor)
                && change.key == AttributeKey::State
                && value == AttributeValue::State(DeviceState::Unknown);
            if sensor_went_unknown {
                let none = AttributeValue::text(SENSOR_NONE);
                if store(attrs, AttributeKey::Value, none.clone()) {
                    changed.push(AttributeChange {
                        entity_id: change.entity_id.clone(),
                        key: AttributeKey::Value,
                        value: none,
                    });
                }
            }
        }

        let mut history = lock(&self.history);
        history.extend(changed.iter().cloned());
        let excess = history.len().saturating_sub(self.history_limit);
        history.drain(..excess);
        drop(history);
        changed
    }

    /// Current value of one attribute.
    pub fn get(&self, entity_id: &str, key: AttributeKey) -> Option<AttributeValue> {
        lock(&self.entities).get(entity_id).and_then(|attrs| attrs.get(&key)).cloned()
    }

    /// All current attributes of one entity.
    pub fn entity(&self, entity_id: &str) -> EntityAttributes {
        lock(&self.entities).get(entity_id).cloned().unwrap_or_default()
    }

    /// The most recent forwarded changes, oldest first.
    pub fn history(&self) -> Vec<AttributeChange> {
        lock(&self.history).iter().cloned().collect()
    }

    /// How many times `entity_id.key` was published with `value` within
    /// the retained history.
    pub fn publish_count(&self, entity_id: &str, key: AttributeKey, value: &AttributeValue) -> usize {
        lock(&self.history)
            .iter()
            .filter(|c| c.entity_id == entity_id && c.key == key && &c.value == value)
            .count()
    }

    /// Forgets everything published for one device's entities.
    pub fn remove_device(&self, device_id: &str) {
        lock(&self.entities).retain(|entity_id, _| {
            EntityKind::split_entity_id(entity_id).map_or(true, |(_, id)| id != device_id)
        });
    }
}

impl Default for PublishedAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Stores `value` under `key`; returns `true` if it differed.
fn store(attrs: &mut EntityAttributes, key: AttributeKey, value: AttributeValue) -> bool {
    if attrs.get(&key) == Some(&value) {
        return false;
    }
    attrs.insert(key, value);
    true
}

impl AttributeSink for PublishedAttributes {
    fn publish(&self, delta: &AttributeDelta) {
        let changed = self.apply(delta);
        if changed.is_empty() {
            debug!("attributes not changed");
        }
        for change in changed {
            debug!(entity = %change.entity_id, "{} = {:?}", change.key, change.value);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
