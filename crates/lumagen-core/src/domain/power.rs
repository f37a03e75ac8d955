//! Power and device state.
//!
//! The processor reports its power status as a free-form string on the
//! `device_status` field.  [`PowerState`] is the parsed form; [`DeviceState`]
//! is the overall state published for the media-player entity, and
//! [`RemoteState`] is the reduced state published for the remote entity.
//!
//! ```text
//! device_status   PowerState   DeviceState   RemoteState
//! ─────────────   ──────────   ───────────   ───────────
//! "Active"        Active       On            On
//! "Standby"       Standby      Standby       Off
//! anything else   Unknown      Unknown       Unknown
//! (link lost)     Unknown      Unavailable   Unavailable
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a `device_status` value is not a known power state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown power state: {0:?}")]
pub struct UnknownPowerState(pub String);

/// Power state derived from the last `device_status` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// No status received yet, the status was unparseable, or the link dropped.
    #[default]
    Unknown,
    /// The processor is on and passing video.
    Active,
    /// The processor is in standby.
    Standby,
}

impl PowerState {
    /// Returns the spelling the processor uses on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PowerState::Unknown => "unknown",
            PowerState::Active => "Active",
            PowerState::Standby => "Standby",
        }
    }

    /// Returns `true` only for [`PowerState::Active`].
    pub fn is_on(self) -> bool {
        self == PowerState::Active
    }

    /// Parses a `device_status` value, mapping anything unrecognised to
    /// [`PowerState::Unknown`].
    pub fn parse_lenient(value: &str) -> Self {
        match value.parse() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("{e}; treating as unknown");
                PowerState::Unknown
            }
        }
    }
}

impl FromStr for PowerState {
    type Err = UnknownPowerState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Active" => Ok(PowerState::Active),
            "Standby" => Ok(PowerState::Standby),
            "unknown" => Ok(PowerState::Unknown),
            other => Err(UnknownPowerState(other.to_string())),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall device state published for entities keyed on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    #[default]
    Unknown,
    On,
    Off,
    Standby,
    /// The session is not connected.
    Unavailable,
}

impl From<PowerState> for DeviceState {
    fn from(power: PowerState) -> Self {
        match power {
            PowerState::Active => DeviceState::On,
            PowerState::Standby => DeviceState::Standby,
            PowerState::Unknown => DeviceState::Unknown,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Unknown => "UNKNOWN",
            DeviceState::On => "ON",
            DeviceState::Off => "OFF",
            DeviceState::Standby => "STANDBY",
            DeviceState::Unavailable => "UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// State published for the remote entity, which has no separate standby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteState {
    #[default]
    Unknown,
    On,
    Off,
    Unavailable,
}

impl From<DeviceState> for RemoteState {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::On => RemoteState::On,
            DeviceState::Off | DeviceState::Standby => RemoteState::Off,
            DeviceState::Unavailable => RemoteState::Unavailable,
            DeviceState::Unknown => RemoteState::Unknown,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_active_and_standby() {
        assert_eq!("Active".parse::<PowerState>(), Ok(PowerState::Active));
        assert_eq!("Standby".parse::<PowerState>(), Ok(PowerState::Standby));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(" Active\r\n".parse::<PowerState>(), Ok(PowerState::Active));
    }

    #[test]
    fn test_parse_unrecognised_value_is_error() {
        let result = "Warming".parse::<PowerState>();
        assert_eq!(result, Err(UnknownPowerState("Warming".to_string())));
    }

    #[test]
    fn test_parse_lenient_maps_garbage_to_unknown() {
        assert_eq!(PowerState::parse_lenient("garbage"), PowerState::Unknown);
        assert_eq!(PowerState::parse_lenient(""), PowerState::Unknown);
    }

    #[test]
    fn test_power_state_round_trips_through_display() {
        for state in [PowerState::Unknown, PowerState::Active, PowerState::Standby] {
            assert_eq!(state.to_string().parse::<PowerState>(), Ok(state));
        }
    }

    #[test]
    fn test_device_state_from_power_state() {
        assert_eq!(DeviceState::from(PowerState::Active), DeviceState::On);
        assert_eq!(DeviceState::from(PowerState::Standby), DeviceState::Standby);
        assert_eq!(DeviceState::from(PowerState::Unknown), DeviceState::Unknown);
    }

    #[test]
    fn test_remote_state_collapses_standby_to_off() {
        assert_eq!(RemoteState::from(DeviceState::Standby), RemoteState::Off);
        assert_eq!(RemoteState::from(DeviceState::Off), RemoteState::Off);
        assert_eq!(RemoteState::from(DeviceState::On), RemoteState::On);
        assert_eq!(
            RemoteState::from(DeviceState::Unavailable),
            RemoteState::Unavailable
        );
    }

    #[test]
    fn test_is_on_only_for_active() {
        assert!(PowerState::Active.is_on());
        assert!(!PowerState::Standby.is_on());
        assert!(!PowerState::Unknown.is_on());
    }
}
