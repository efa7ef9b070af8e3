//! Device record types.
//!
//! A [`Device`] is one normalized entry of the portal's device list: a
//! sensor, an actuator, a camera or the synthetic alarm panel.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::status::FetchSource;

// ============================================================================
// Constants
// ============================================================================

/// Identifier of the synthetic alarm panel record.
pub const PANEL_ID: &str = "panel";

/// Device type of the synthetic alarm panel record.
pub const ALARM_PANEL: &str = "ALARM_PANEL";

/// Device type of Wi-Fi cameras (compared case-insensitively).
pub const CAMERA_WIFI: &str = "CAMERA_WIFI";

/// Battery/signal level reserved for records where the value does not apply.
pub const LEVEL_NOT_APPLICABLE: &str = "-2";

/// Keys that are always present on a serialized [`Device`].
///
/// Extra XML attributes with one of these names are mapped onto the typed
/// fields instead of the flattened attribute map.
pub const KNOWN_KEYS: &[&str] = &[
    "id",
    "deviceType",
    "deviceModel",
    "deviceVersion",
    "name",
    "long_name",
    "status",
    "batteryLevel",
    "deviceMac",
    "signalLevel",
    "categories",
    "brand",
    "sensorValues",
    "video_url",
];

// ============================================================================
// Sensor Value
// ============================================================================

/// A single reading attached to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SensorValue {
    /// Reading, as text.
    pub value: String,
    /// Attributes of the source element (without `value`).
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
}

impl SensorValue {
    /// Creates a sensor value with no attributes.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attrs: IndexMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Device
// ============================================================================

/// A normalized device record.
///
/// Every known key is serialized, with `null` for missing data, except
/// `brand` which is omitted when the source carried no brand at all.
/// Unrecognized XML attributes are flattened into the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Device {
    /// Vendor-assigned identifier (`panel` for the alarm panel).
    pub id: Option<String>,

    /// Open type tag such as `MAGNETIC` or `CAMERA_WIFI`.
    #[serde(rename = "deviceType")]
    pub device_type: Option<String>,

    /// Hardware model.
    #[serde(rename = "deviceModel")]
    pub device_model: Option<String>,

    /// Firmware version.
    #[serde(rename = "deviceVersion")]
    pub device_version: Option<String>,

    /// Short display name.
    pub name: Option<String>,

    /// Long display name.
    pub long_name: Option<String>,

    /// Status string as reported by the portal.
    pub status: Option<String>,

    /// Battery level, as text.
    #[serde(rename = "batteryLevel")]
    pub battery_level: Option<String>,

    /// MAC address.
    #[serde(rename = "deviceMac")]
    pub device_mac: Option<String>,

    /// Radio signal level, as text.
    #[serde(rename = "signalLevel")]
    pub signal_level: Option<String>,

    /// Category list, as text.
    pub categories: Option<String>,

    /// Normalized brand label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Readings keyed by value name, in document order.
    #[serde(rename = "sensorValues", default)]
    pub sensor_values: IndexMap<String, SensorValue>,

    /// Live stream URL (Wi-Fi cameras only).
    pub video_url: Option<String>,

    /// Every other attribute of the source element.
    #[serde(flatten)]
    pub attributes: IndexMap<String, String>,
}

impl Device {
    /// Returns true if this is the synthetic alarm panel.
    pub fn is_panel(&self) -> bool {
        self.id.as_deref() == Some(PANEL_ID)
            && self.device_type.as_deref() == Some(ALARM_PANEL)
    }

    /// Returns true if this device is a Wi-Fi camera.
    pub fn is_camera(&self) -> bool {
        self.device_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(CAMERA_WIFI))
    }

    /// Best display name: `long_name`, then `name`, then `id`.
    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("?")
    }

    /// Sets a typed field by its serialized key.
    ///
    /// Returns false when `key` is not a known scalar key, in which case the
    /// caller stores it as an extra attribute.
    pub fn set_known(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "id" => &mut self.id,
            "deviceType" => &mut self.device_type,
            "deviceModel" => &mut self.device_model,
            "deviceVersion" => &mut self.device_version,
            "name" => &mut self.name,
            "long_name" => &mut self.long_name,
            "status" => &mut self.status,
            "batteryLevel" => &mut self.battery_level,
            "deviceMac" => &mut self.device_mac,
            "signalLevel" => &mut self.signal_level,
            "categories" => &mut self.categories,
            "brand" => &mut self.brand,
            "video_url" => &mut self.video_url,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Total number of readings.
    pub fn sensor_value_count(&self) -> usize {
        self.sensor_values.len()
    }
}

// ============================================================================
// Device Snapshot
// ============================================================================

/// The result of one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Normalized records, panel first.
    pub devices: Vec<Device>,
    /// When the data was obtained.
    pub fetched_at: DateTime<Utc>,
    /// How the data was obtained.
    pub source: FetchSource,
}

impl DeviceSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(devices: Vec<Device>, source: FetchSource) -> Self {
        Self {
            devices,
            fetched_at: Utc::now(),
            source,
        }
    }

    /// Returns true if the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Returns the alarm panel record, if any.
    pub fn panel(&self) -> Option<&Device> {
        self.devices.iter().find(|d| d.is_panel())
    }
}

// ============================================================================
// Tests
// ============================================================================
