//! Device identity.
//!
//! The processor answers an identity query with its model name, model
//! number, serial number and software revision (for example
//! `RadiancePro,090524,1018,009022`).  The stable device identifier used to
//! key sessions and published entities is the model number followed by the
//! serial number zero-padded to six digits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default TCP port of the IP-to-serial adapter in front of the processor.
pub const DEFAULT_PORT: u16 = 4999;

/// Identity fields reported by the processor itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub model_name: String,
    pub model_number: String,
    pub serial_number: u32,
    pub software_revision: String,
}

impl DeviceIdentity {
    /// Returns the stable device identifier: model number + 6-digit serial.
    pub fn device_id(&self) -> String {
        format!("{}{:06}", self.model_number, self.serial_number)
    }
}

/// A registered device: identity plus where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
}

impl DeviceInfo {
    /// Builds a `DeviceInfo` from a user-configured address with no identity yet.
    pub fn configured(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            port,
            model_name: None,
            software_version: None,
            model_number: None,
        }
    }

    /// Builds a `DeviceInfo` from an identity answer received at `address:port`.
    pub fn from_identity(identity: &DeviceIdentity, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: identity.device_id(),
            name: identity.model_name.clone(),
            address: address.into(),
            port,
            model_name: Some(identity.model_name.clone()),
            software_version: Some(identity.software_revision.clone()),
            model_number: Some(identity.model_number.clone()),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<LumagenDevice id='{}' name='{}' address='{}:{}'>",
            self.id, self.name, self.address, self.port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radiance_pro() -> DeviceIdentity {
        DeviceIdentity {
            model_name: "RadiancePro".to_string(),
            model_number: "1018".to_string(),
            serial_number: 9022,
            software_revision: "090524".to_string(),
        }
    }

    #[test]
    fn test_device_id_pads_serial_to_six_digits() {
        assert_eq!(radiance_pro().device_id(), "1018009022");
    }

    #[test]
    fn test_from_identity_copies_metadata() {
        // Arrange
        let identity = radiance_pro();

        // Act
        let info = DeviceInfo::from_identity(&identity, "192.168.1.50", DEFAULT_PORT);

        // Assert
        assert_eq!(info.id, "1018009022");
        assert_eq!(info.name, "RadiancePro");
        assert_eq!(info.port, 4999);
        assert_eq!(info.software_version.as_deref(), Some("090524"));
        assert_eq!(info.model_number.as_deref(), Some("1018"));
    }

    #[test]
    fn test_configured_has_no_identity_metadata() {
        let info = DeviceInfo::configured("abc", "Theater", "10.0.0.9", 23);
        assert!(info.model_name.is_none());
        assert_eq!(info.to_string(), "<LumagenDevice id='abc' name='Theater' address='10.0.0.9:23'>");
    }
}
