//! Connected device records

use serde::{Deserialize, Serialize};

/// Placeholder shown when a device property cannot be read
pub const UNKNOWN_PROPERTY: &str = "unknown";

/// A device reported by the backend's `get_devices` enumeration.
///
/// `serial` is the primary key for the duration of a connection session
/// and joins the device list with the cached detail record. The summary
/// rows returned by enumeration carry only `serial` and `status`; the
/// remaining fields are filled in for the selected device by the
/// property fetches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    /// Unique device identifier (USB serial or `ip:port` for network devices)
    pub serial: String,

    /// Connection state as reported by adb: "device", "offline", "unauthorized", ...
    pub status: String,

    /// Marketing model name (`ro.product.model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vendor brand (`ro.product.brand`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Android release version (`ro.build.version.release`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<String>,
}

impl Device {
    /// Summary row as produced by device enumeration
    pub fn summary(serial: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            status: status.into(),
            model: None,
            brand: None,
            android: None,
        }
    }

    /// Whether the device is usable for adb operations
    pub fn is_ready(&self) -> bool {
        self.status == "device"
    }

    /// Get a display string for the device
    pub fn display_name(&self) -> String {
        match &self.model {
            Some(model) if !model.is_empty() => format!("{} ({})", model, self.serial),
            _ => self.serial.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let json = r#"[
            {"serial": "R5CT10XYZ", "status": "device"},
            {"serial": "192.168.1.23:5555", "status": "offline"}
        ]"#;

        let devices: Vec<Device> = serde_json::from_str(json).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "R5CT10XYZ");
        assert!(devices[0].is_ready());
        assert_eq!(devices[1].status, "offline");
        assert!(!devices[1].is_ready());
        assert!(devices[0].model.is_none());
    }

    #[test]
    fn test_parse_device_with_detail_fields() {
        let json = r#"{"serial": "emulator-5554", "status": "device",
                       "model": "Pixel 8", "brand": "google", "android": "15"}"#;

        let device: Device = serde_json::from_str(json).unwrap();

        assert_eq!(device.model.as_deref(), Some("Pixel 8"));
        assert_eq!(device.brand.as_deref(), Some("google"));
        assert_eq!(device.android.as_deref(), Some("15"));
    }

    #[test]
    fn test_display_name() {
        let summary = Device::summary("R5CT10XYZ", "device");
        assert_eq!(summary.display_name(), "R5CT10XYZ");

        let mut detailed = Device::summary("R5CT10XYZ", "device");
        detailed.model = Some("SM-S918B".to_string());
        assert_eq!(detailed.display_name(), "SM-S918B (R5CT10XYZ)");
    }

    #[test]
    fn test_unauthorized_is_not_ready() {
        let device = Device::summary("R5CT10XYZ", "unauthorized");
        assert!(!device.is_ready());
    }
}
