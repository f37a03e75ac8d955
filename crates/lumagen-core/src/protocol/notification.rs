//! Transport notifications.
//!
//! The transport raises two kinds of notification, delivered in emission
//! order on a single channel:
//!
//! - [`TransportEvent::Link`] when the connection opens or drops.
//! - [`TransportEvent::Field`] when the processor reports a new value for a
//!   named status field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::attributes::EntityKind;

/// Link state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Connected,
    Disconnected,
}

/// Raw field value as decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    /// Interprets the value as an integer, accepting numeric text.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as text.  Integers are formatted; lists and null are not text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Text(s) => f.write_str(s),
            RawValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items)
    }
}

/// One notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Link(LinkState),
    Field { name: String, value: RawValue },
}

impl TransportEvent {
    /// Convenience constructor for a field notification.
    pub fn field(name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        TransportEvent::Field {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The status fields the session understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationField {
    DeviceStatus,
    IsAlive,
    InputLabels,
    PhysicalInputSelected,
    CurrentSourceContentAspect,
    DetectedSourceAspect,
    SourceMode,
    SourceVerticalRate,
    SourceDynamicRange,
}

impl NotificationField {
    pub const ALL: [NotificationField; 9] = [
        NotificationField::DeviceStatus,
        NotificationField::IsAlive,
        NotificationField::InputLabels,
        NotificationField::PhysicalInputSelected,
        NotificationField::CurrentSourceContentAspect,
        NotificationField::DetectedSourceAspect,
        NotificationField::SourceMode,
        NotificationField::SourceVerticalRate,
        NotificationField::SourceDynamicRange,
    ];

    /// Field name as emitted by the transport.
    pub fn name(self) -> &'static str {
        match self {
            NotificationField::DeviceStatus => "device_status",
            NotificationField::IsAlive => "is_alive",
            NotificationField::InputLabels => "input_labels",
            NotificationField::PhysicalInputSelected => "physical_input_selected",
            NotificationField::CurrentSourceContentAspect => "current_source_content_aspect",
            NotificationField::DetectedSourceAspect => "detected_source_aspect",
            NotificationField::SourceMode => "source_mode",
            NotificationField::SourceVerticalRate => "source_vertical_rate",
            NotificationField::SourceDynamicRange => "source_dynamic_range",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Read-only sensor that mirrors this field, for the pass-through
    /// telemetry fields.
    pub fn telemetry_sensor(self) -> Option<EntityKind> {
        match self {
            NotificationField::CurrentSourceContentAspect => Some(EntityKind::CurrentSourceContentAspect),
            NotificationField::DetectedSourceAspect => Some(EntityKind::DetectedSourceAspect),
            NotificationField::SourceMode => Some(EntityKind::InputMode),
            NotificationField::SourceVerticalRate => Some(EntityKind::InputRate),
            NotificationField::SourceDynamicRange => Some(EntityKind::InputFormat),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips_every_field() {
        for field in NotificationField::ALL {
            assert_eq!(NotificationField::from_name(field.name()), Some(field));
        }
    }

    #[test]
    fn test_from_name_unknown_is_none() {
        assert_eq!(NotificationField::from_name("output_mode"), None);
    }

    #[test]
    fn test_telemetry_fields_map_to_input_sensors() {
        assert_eq!(NotificationField::SourceMode.telemetry_sensor(), Some(EntityKind::InputMode));
        assert_eq!(NotificationField::SourceVerticalRate.telemetry_sensor(), Some(EntityKind::InputRate));
        assert_eq!(NotificationField::SourceDynamicRange.telemetry_sensor(), Some(EntityKind::InputFormat));
        assert_eq!(NotificationField::DeviceStatus.telemetry_sensor(), None);
        assert_eq!(NotificationField::PhysicalInputSelected.telemetry_sensor(), None);
    }

    #[test]
    fn test_as_integer_accepts_numeric_text() {
        assert_eq!(RawValue::from("3").as_integer(), Some(3));
        assert_eq!(RawValue::from(" 12 ").as_integer(), Some(12));
        assert_eq!(RawValue::Integer(7).as_integer(), Some(7));
    }

    #[test]
    fn test_as_integer_rejects_non_numeric() {
        assert_eq!(RawValue::from("three").as_integer(), None);
        assert_eq!(RawValue::Null.as_integer(), None);
        assert_eq!(RawValue::List(vec!["1".into()]).as_integer(), None);
    }

    #[test]
    fn test_display_joins_lists() {
        let v = RawValue::List(vec!["HDMI 1".into(), "HDMI 2".into()]);
        assert_eq!(v.to_string(), "HDMI 1, HDMI 2");
        assert_eq!(RawValue::Null.to_string(), "");
    }
}
