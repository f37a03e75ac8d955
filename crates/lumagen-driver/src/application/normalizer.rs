//! EventNormalizer: device notifications → attribute deltas.
//!
//! Each raw `(field, value)` notification is applied to the session's
//! [`SessionState`] and turned into at most one [`AttributeDelta`]:
//!
//! | field                           | state update              | delta                                   |
//! |---------------------------------|---------------------------|-----------------------------------------|
//! | `device_status`                 | power                     | media_player + remote `state`           |
//! | `is_alive`                      | liveness = true           | none                                    |
//! | `input_labels`                  | source list (whole)       | media_player `source_list` (+ `source`) |
//! | `physical_input_selected`       | active source             | media_player `source` + input sensor    |
//! | telemetry (aspect, mode, ...)   | last telemetry value      | sensor `state` + `value`                |
//!
//! Unparseable values are tolerated: a bad `device_status` becomes Unknown,
//! a bad or out-of-range input index is logged and dropped.  Nothing here
//! returns an error.

use std::collections::BTreeMap;

use lumagen_core::{
    AttributeDelta, AttributeKey, AttributeValue, DeviceState, EntityKind, NotificationField,
    PowerState, RawValue,
};
use tracing::{debug, warn};

/// Mutable per-device state derived from notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub power: PowerState,
    pub alive: bool,
    pub active_source: Option<String>,
    pub source_list: Vec<String>,
    /// Last value published per sensor.
    pub telemetry: BTreeMap<EntityKind, String>,
}

impl SessionState {
    /// Overall device state as published for the media player.
    pub fn device_state(&self) -> DeviceState {
        DeviceState::from(self.power)
    }

    /// 0-based position of `source` in the source list.
    pub fn source_index(&self, source: &str) -> Option<usize> {
        self.source_list.iter().position(|s| s == source)
    }
}

/// Turns notifications for one device into attribute deltas.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    device_id: String,
}

impl EventNormalizer {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Applies one field notification.
    pub fn apply(&self, state: &mut SessionState, name: &str, value: &RawValue) -> Option<AttributeDelta> {
        debug!(device = %self.device_id, "state changed: {name} -> {value:?}");
        let Some(field) = NotificationField::from_name(name) else {
            debug!(device = %self.device_id, "no handler for field {name}");
            return None;
        };

        match field {
            NotificationField::DeviceStatus => Some(self.device_status(state, value)),
            NotificationField::IsAlive => {
                state.alive = true;
                None
            }
            NotificationField::InputLabels => self.input_labels(state, value),
            NotificationField::PhysicalInputSelected => self.physical_input_selected(state, value),
            _ => {
                let sensor = field.telemetry_sensor()?;
                Some(self.telemetry(state, sensor, value.to_string()))
            }
        }
    }

    /// Resets liveness and power after the link dropped and marks every
    /// entity of the device unavailable.
    pub fn link_lost(&self, state: &mut SessionState) -> AttributeDelta {
        state.alive = false;
        state.power = PowerState::Unknown;

        let unavailable = AttributeValue::State(DeviceState::Unavailable);
        let mut delta = AttributeDelta::new()
            .with(EntityKind::MediaPlayer, &self.device_id, AttributeKey::State, unavailable.clone())
            .with(EntityKind::Remote, &self.device_id, AttributeKey::State, unavailable);
        for sensor in std::mem::take(&mut state.telemetry).into_keys() {
            delta.push(sensor, &self.device_id, AttributeKey::State, AttributeValue::State(DeviceState::Unknown));
        }
        delta
    }

    /// Full attribute set for entities that subscribe after the fact.
    pub fn initial_attributes(&self, state: &SessionState, connected: bool) -> AttributeDelta {
        let device_state = if connected {
            state.device_state()
        } else {
            DeviceState::Unavailable
        };
        let mut delta = AttributeDelta::new()
            .with(EntityKind::MediaPlayer, &self.device_id, AttributeKey::State, AttributeValue::State(device_state))
            .with(EntityKind::Remote, &self.device_id, AttributeKey::State, AttributeValue::State(device_state));
        if !state.source_list.is_empty() {
            delta.push(
                EntityKind::MediaPlayer,
                &self.device_id,
                AttributeKey::SourceList,
                AttributeValue::List(state.source_list.clone()),
            );
        }
        if let Some(source) = &state.active_source {
            delta.push(EntityKind::MediaPlayer, &self.device_id, AttributeKey::Source, AttributeValue::text(source));
        }
        for (sensor, value) in &state.telemetry {
            delta.push(*sensor, &self.device_id, AttributeKey::State, AttributeValue::State(DeviceState::On));
            delta.push(*sensor, &self.device_id, AttributeKey::Value, AttributeValue::text(value));
        }
        delta
    }

    fn device_status(&self, state: &mut SessionState, value: &RawValue) -> AttributeDelta {
        state.power = match value.as_text() {
            Some(text) => PowerState::parse_lenient(&text),
            None => {
                warn!(device = %self.device_id, "unknown power state received: {value:?}");
                PowerState::Unknown
            }
        };
        let device_state = AttributeValue::State(state.device_state());
        AttributeDelta::new()
            .with(EntityKind::MediaPlayer, &self.device_id, AttributeKey::State, device_state.clone())
            .with(EntityKind::Remote, &self.device_id, AttributeKey::State, device_state)
    }

    fn input_labels(&self, state: &mut SessionState, value: &RawValue) -> Option<AttributeDelta> {
        let labels = match value {
            RawValue::List(items) => items.clone(),
            RawValue::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            RawValue::Null => Vec::new(),
            RawValue::Integer(_) => {
                warn!(device = %self.device_id, "ignoring non-list input_labels: {value:?}");
                return None;
            }
        };
        debug!(device = %self.device_id, "source list: {labels:?}");
        state.source_list = labels;

        let mut delta = AttributeDelta::new().with(
            EntityKind::MediaPlayer,
            &self.device_id,
            AttributeKey::SourceList,
            AttributeValue::List(state.source_list.clone()),
        );
        let stale = state
            .active_source
            .as_deref()
            .is_some_and(|source| state.source_index(source).is_none());
        if stale {
            state.active_source = None;
            delta.push(EntityKind::MediaPlayer, &self.device_id, AttributeKey::Source, AttributeValue::text(""));
        }
        Some(delta)
    }

    fn physical_input_selected(&self, state: &mut SessionState, value: &RawValue) -> Option<AttributeDelta> {
        let Some(number) = value.as_integer() else {
            warn!(device = %self.device_id, "unable to process physical_input_selected value: {value:?}");
            return None;
        };
        let index = number
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < state.source_list.len());
        let Some(index) = index else {
            warn!(
                device = %self.device_id,
                "invalid physical_input_selected index: {number} (have {} sources)",
                state.source_list.len()
            );
            return None;
        };

        let source = state.source_list[index].clone();
        state.active_source = Some(source.clone());
        let mut delta = AttributeDelta::new().with(
            EntityKind::MediaPlayer,
            &self.device_id,
            AttributeKey::Source,
            AttributeValue::text(source),
        );
        delta.changes.extend(
            self.telemetry(state, EntityKind::PhysicalInputSelected, format!("Input: {number}"))
                .changes,
        );
        Some(delta)
    }

    fn telemetry(&self, state: &mut SessionState, sensor: EntityKind, text: String) -> AttributeDelta {
        state.telemetry.insert(sensor, text.clone());
        AttributeDelta::new()
            .with(sensor, &self.device_id, AttributeKey::State, AttributeValue::State(DeviceState::On))
            .with(sensor, &self.device_id, AttributeKey::Value, AttributeValue::Text(text))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: &str = "1018009022";

    fn five_sources() -> SessionState {
        SessionState {
            source_list: ["Apple TV", "Blu-ray", "Kaleidescape", "Xbox", "Cable"]
                .map(String::from)
                .to_vec(),
            ..SessionState::default()
        }
    }

    fn normalizer() -> EventNormalizer {
        EventNormalizer::new(DEV)
    }

    #[test]
    fn test_device_status_active_publishes_on_to_media_player_and_remote() {
        // Arrange
        let mut state = SessionState::default();

        // Act
        let delta = normalizer()
            .apply(&mut state, "device_status", &RawValue::from("Active"))
            .expect("delta");

        // Assert
        assert_eq!(state.power, PowerState::Active);
        let on = AttributeValue::State(DeviceState::On);
        assert_eq!(delta.get("media_player.1018009022", AttributeKey::State), Some(&on));
        assert_eq!(delta.get("remote.1018009022", AttributeKey::State), Some(&on));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_device_status_standby() {
        let mut state = SessionState::default();
        let delta = normalizer()
            .apply(&mut state, "device_status", &RawValue::from("Standby"))
            .unwrap();
        assert_eq!(state.power, PowerState::Standby);
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::State),
            Some(&AttributeValue::State(DeviceState::Standby))
        );
    }

    #[test]
    fn test_unparseable_device_status_becomes_unknown() {
        // Arrange
        let mut state = SessionState {
            power: PowerState::Active,
            ..SessionState::default()
        };

        // Act
        let delta = normalizer()
            .apply(&mut state, "device_status", &RawValue::from("Warming"))
            .unwrap();

        // Assert
        assert_eq!(state.power, PowerState::Unknown);
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::State),
            Some(&AttributeValue::State(DeviceState::Unknown))
        );
    }

    #[test]
    fn test_is_alive_sets_flag_without_delta() {
        let mut state = SessionState::default();
        assert!(normalizer().apply(&mut state, "is_alive", &RawValue::Integer(1)).is_none());
        assert!(state.alive);
    }

    #[test]
    fn test_input_labels_replace_list_wholesale() {
        // Arrange
        let mut state = five_sources();
        let labels = vec!["HDMI 1".to_string(), "HDMI 2".to_string()];

        // Act
        let delta = normalizer()
            .apply(&mut state, "input_labels", &RawValue::List(labels.clone()))
            .unwrap();

        // Assert
        assert_eq!(state.source_list, labels);
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::SourceList),
            Some(&AttributeValue::List(labels))
        );
        assert_eq!(delta.len(), 1);
    }

    #[test]
    fn test_input_labels_clear_active_source_no_longer_listed() {
        let mut state = five_sources();
        state.active_source = Some("Xbox".to_string());

        let delta = normalizer()
            .apply(&mut state, "input_labels", &RawValue::List(vec!["HDMI 1".to_string()]))
            .unwrap();

        assert_eq!(state.active_source, None);
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::Source),
            Some(&AttributeValue::text(""))
        );
    }

    #[test]
    fn test_input_labels_keep_active_source_still_listed() {
        let mut state = five_sources();
        state.active_source = Some("Xbox".to_string());
        normalizer().apply(&mut state, "input_labels", &RawValue::from("Xbox, Cable"));
        assert_eq!(state.active_source.as_deref(), Some("Xbox"));
        assert_eq!(state.source_list, vec!["Xbox".to_string(), "Cable".to_string()]);
    }

    #[test]
    fn test_physical_input_three_of_five_selects_index_two() {
        // Arrange
        let mut state = five_sources();

        // Act
        let delta = normalizer()
            .apply(&mut state, "physical_input_selected", &RawValue::from("3"))
            .expect("delta");

        // Assert
        assert_eq!(state.active_source.as_deref(), Some("Kaleidescape"));
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::Source),
            Some(&AttributeValue::text("Kaleidescape"))
        );
        assert_eq!(
            delta.get("physical_input_selected.1018009022", AttributeKey::Value),
            Some(&AttributeValue::text("Input: 3"))
        );
    }

    #[test]
    fn test_physical_input_out_of_range_emits_nothing() {
        let mut state = five_sources();
        for raw in [RawValue::from("9"), RawValue::from("0"), RawValue::Integer(-4)] {
            assert!(normalizer().apply(&mut state, "physical_input_selected", &raw).is_none());
        }
        assert_eq!(state.active_source, None);
    }

    #[test]
    fn test_physical_input_non_numeric_emits_nothing() {
        let mut state = five_sources();
        let delta = normalizer().apply(&mut state, "physical_input_selected", &RawValue::from("three"));
        assert!(delta.is_none());
    }

    #[test]
    fn test_physical_input_with_empty_list_emits_nothing() {
        let mut state = SessionState::default();
        assert!(normalizer()
            .apply(&mut state, "physical_input_selected", &RawValue::Integer(1))
            .is_none());
    }

    #[test]
    fn test_telemetry_passes_through_to_sensor() {
        // Arrange
        let mut state = SessionState::default();

        // Act
        let delta = normalizer()
            .apply(&mut state, "source_vertical_rate", &RawValue::from("23.976"))
            .unwrap();

        // Assert
        assert_eq!(
            delta.get("input_rate.1018009022", AttributeKey::Value),
            Some(&AttributeValue::text("23.976"))
        );
        assert_eq!(state.telemetry.get(&EntityKind::InputRate).map(String::as_str), Some("23.976"));
    }

    #[test]
    fn test_numeric_telemetry_is_stringified() {
        let mut state = SessionState::default();
        let delta = normalizer()
            .apply(&mut state, "detected_source_aspect", &RawValue::Integer(240))
            .unwrap();
        assert_eq!(
            delta.get("detected_source_aspect.1018009022", AttributeKey::Value),
            Some(&AttributeValue::text("240"))
        );
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let mut state = SessionState::default();
        assert!(normalizer().apply(&mut state, "output_mode", &RawValue::from("x")).is_none());
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_link_lost_resets_liveness_and_power() {
        // Arrange
        let mut state = five_sources();
        state.alive = true;
        state.power = PowerState::Active;
        state.telemetry.insert(EntityKind::InputMode, "Interlaced".to_string());

        // Act
        let delta = normalizer().link_lost(&mut state);

        // Assert
        assert!(!state.alive);
        assert_eq!(state.power, PowerState::Unknown);
        assert!(state.telemetry.is_empty());
        assert_eq!(
            delta.get("remote.1018009022", AttributeKey::State),
            Some(&AttributeValue::State(DeviceState::Unavailable))
        );
        assert_eq!(
            delta.get("input_mode.1018009022", AttributeKey::State),
            Some(&AttributeValue::State(DeviceState::Unknown))
        );
        assert_eq!(state.source_list.len(), 5);
    }

    #[test]
    fn test_initial_attributes_when_disconnected_are_unavailable() {
        let state = five_sources();
        let delta = normalizer().initial_attributes(&state, false);
        assert_eq!(
            delta.get("media_player.1018009022", AttributeKey::State),
            Some(&AttributeValue::State(DeviceState::Unavailable))
        );
        assert!(delta.get("media_player.1018009022", AttributeKey::SourceList).is_some());
        assert!(delta.get("media_player.1018009022", AttributeKey::Source).is_none());
    }
}
