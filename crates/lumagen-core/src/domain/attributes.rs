//! Published-attribute model.
//!
//! Every device exposes several *entities* to the remote-control UI: a media
//! player, a remote, and one read-only sensor per telemetry field.  An entity
//! id is `"<kind prefix>.<device id>"`, e.g. `media_player.1018009022`.
//!
//! The event normalizer turns each device notification into at most one
//! [`AttributeDelta`]: an ordered list of `(entity, key, value)` changes that
//! the attribute sink applies in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::power::{DeviceState, RemoteState};

/// Kind of published entity; the prefix of its entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    MediaPlayer,
    Remote,
    CurrentSourceContentAspect,
    DetectedSourceAspect,
    InputFormat,
    InputMode,
    InputRate,
    OutputFormat,
    OutputMode,
    OutputRate,
    PhysicalInputSelected,
}

impl EntityKind {
    /// Every sensor entity registered for a device, in display order.
    pub const SENSORS: [EntityKind; 9] = [
        EntityKind::CurrentSourceContentAspect,
        EntityKind::DetectedSourceAspect,
        EntityKind::InputFormat,
        EntityKind::InputMode,
        EntityKind::InputRate,
        EntityKind::OutputFormat,
        EntityKind::OutputMode,
        EntityKind::OutputRate,
        EntityKind::PhysicalInputSelected,
    ];

    /// Returns the entity id prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::MediaPlayer => "media_player",
            EntityKind::Remote => "remote",
            EntityKind::CurrentSourceContentAspect => "current_source_content_aspect",
            EntityKind::DetectedSourceAspect => "detected_source_aspect",
            EntityKind::InputFormat => "input_format",
            EntityKind::InputMode => "input_mode",
            EntityKind::InputRate => "input_rate",
            EntityKind::OutputFormat => "output_format",
            EntityKind::OutputMode => "output_mode",
            EntityKind::OutputRate => "output_rate",
            EntityKind::PhysicalInputSelected => "physical_input_selected",
        }
    }

    /// Returns `true` for the read-only sensor kinds.
    pub fn is_sensor(self) -> bool {
        !matches!(self, EntityKind::MediaPlayer | EntityKind::Remote)
    }

    /// Builds the entity id for this kind on `device_id`.
    pub fn entity_id(self, device_id: &str) -> String {
        format!("{}.{}", self.prefix(), device_id)
    }

    /// Splits an entity id into its kind and device id.
    ///
    /// Returns `None` when the id has no `.` separator, an empty device part,
    /// or an unknown prefix.
    pub fn split_entity_id(entity_id: &str) -> Option<(EntityKind, &str)> {
        let (prefix, device_id) = entity_id.split_once('.')?;
        if device_id.is_empty() {
            return None;
        }
        let kind = prefix.parse().ok()?;
        Some((kind, device_id))
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [EntityKind::MediaPlayer, EntityKind::Remote]
            .into_iter()
            .chain(EntityKind::SENSORS)
            .find(|k| k.prefix() == s)
            .ok_or(())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Attribute name on a published entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKey {
    State,
    Source,
    SourceList,
    Value,
    Unit,
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeKey::State => "state",
            AttributeKey::Source => "source",
            AttributeKey::SourceList => "source_list",
            AttributeKey::Value => "value",
            AttributeKey::Unit => "unit",
        };
        f.write_str(s)
    }
}

/// Attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    State(DeviceState),
    RemoteState(RemoteState),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn text(s: impl Into<String>) -> Self {
        AttributeValue::Text(s.into())
    }
}

/// One `(entity, key, value)` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub entity_id: String,
    pub key: AttributeKey,
    pub value: AttributeValue,
}

/// A batch of attribute changes produced from a single notification.
///
/// Never persisted; consumed immediately by the attribute sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDelta {
    pub changes: Vec<AttributeChange>,
}

impl AttributeDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change for `kind` on `device_id`; builder style.
    pub fn with(mut self, kind: EntityKind, device_id: &str, key: AttributeKey, value: AttributeValue) -> Self {
        self.push(kind, device_id, key, value);
        self
    }

    /// Appends a change for `kind` on `device_id`.
    pub fn push(&mut self, kind: EntityKind, device_id: &str, key: AttributeKey, value: AttributeValue) {
        self.changes.push(AttributeChange {
            entity_id: kind.entity_id(device_id),
            key,
            value,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns the first value recorded for `entity_id` / `key`, if any.
    pub fn get(&self, entity_id: &str, key: AttributeKey) -> Option<&AttributeValue> {
        self.changes
            .iter()
            .find(|c| c.entity_id == entity_id && c.key == key)
            .map(|c| &c.value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_joins_prefix_and_device() {
        assert_eq!(EntityKind::MediaPlayer.entity_id("1018009022"), "media_player.1018009022");
        assert_eq!(EntityKind::InputRate.entity_id("x"), "input_rate.x");
    }

    #[test]
    fn test_split_entity_id_round_trips_every_kind() {
        for kind in [EntityKind::MediaPlayer, EntityKind::Remote].into_iter().chain(EntityKind::SENSORS) {
            let id = kind.entity_id("dev1");
            assert_eq!(EntityKind::split_entity_id(&id), Some((kind, "dev1")));
        }
    }

    #[test]
    fn test_split_entity_id_keeps_dots_in_device_id() {
        assert_eq!(
            EntityKind::split_entity_id("remote.a.b"),
            Some((EntityKind::Remote, "a.b"))
        );
    }

    #[test]
    fn test_split_entity_id_rejects_malformed_ids() {
        assert_eq!(EntityKind::split_entity_id("remote"), None);
        assert_eq!(EntityKind::split_entity_id("remote."), None);
        assert_eq!(EntityKind::split_entity_id("light.dev1"), None);
    }

    #[test]
    fn test_only_media_player_and_remote_are_not_sensors() {
        assert!(!EntityKind::MediaPlayer.is_sensor());
        assert!(!EntityKind::Remote.is_sensor());
        assert!(EntityKind::SENSORS.iter().all(|k| k.is_sensor()));
    }

    #[test]
    fn test_delta_builder_preserves_order() {
        // Arrange / Act
        let delta = AttributeDelta::new()
            .with(EntityKind::MediaPlayer, "d", AttributeKey::State, AttributeValue::State(DeviceState::On))
            .with(EntityKind::Remote, "d", AttributeKey::State, AttributeValue::State(DeviceState::On));

        // Assert
        assert_eq!(delta.len(), 2);
        assert_eq!(delta.changes[0].entity_id, "media_player.d");
        assert_eq!(delta.changes[1].entity_id, "remote.d");
    }

    #[test]
    fn test_delta_get_finds_value() {
        let delta = AttributeDelta::new().with(
            EntityKind::MediaPlayer,
            "d",
            AttributeKey::Source,
            AttributeValue::text("Blu-ray"),
        );
        assert_eq!(
            delta.get("media_player.d", AttributeKey::Source),
            Some(&AttributeValue::text("Blu-ray"))
        );
        assert_eq!(delta.get("media_player.d", AttributeKey::State), None);
    }
}
