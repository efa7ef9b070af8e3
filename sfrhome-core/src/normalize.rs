//! Device list normalization.
//!
//! Turns the raw `mysensors` XML into [`Device`] records. The portal has
//! shipped at least three shapes for sensor readings, and the root element
//! carries the alarm panel state under varying attribute names; all of
//! them are folded into the same record layout here.
//!
//! Normalization never fails on decodable input. Undecodable input gives an
//! empty list and a [`NormalizeOutcome::failure`] message.

use tracing::{debug, instrument, warn};

use crate::brand::{normalize_brand, BRAND_FALLBACK};
use crate::models::{
    Device, SensorValue, ALARM_PANEL, KNOWN_KEYS, LEVEL_NOT_APPLICABLE, PANEL_ID,
};
use crate::xml::{parse_tolerant, XmlNode};

// ============================================================================
// Constants
// ============================================================================

/// Root attributes naming the alarm panel, in priority order.
pub const PANEL_NAME_ALIASES: &[&str] = &["name", "panel_name", "hub_name"];

/// Root attributes carrying the panel model, in priority order.
pub const PANEL_MODEL_ALIASES: &[&str] = &["model_type", "model", "type"];

/// Root attributes carrying the alarm mode, in priority order.
pub const PANEL_MODE_ALIASES: &[&str] = &["alarm_mode", "mode"];

/// Child elements whose text overrides the attribute of the same name.
const OVERLAY_FIELDS: &[&str] = &[
    "deviceType",
    "deviceModel",
    "deviceVersion",
    "name",
    "long_name",
    "batteryLevel",
    "deviceMac",
    "signalLevel",
    "status",
    "categories",
    "brand",
];

const SENSOR_TAG: &str = "Sensor";
const SENSOR_VALUE_TAG: &str = "sensorValue";
const SENSOR_VALUES_TAG: &str = "sensorValues";

/// Base of the camera live-stream URL; the MAC address is appended.
pub const VIDEO_URL_BASE: &str = "https://home.sfr.fr/homescope/flv?localconn=0&mac=";

// ============================================================================
// Outcome
// ============================================================================

/// Result of normalizing one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    /// Records, panel first then sensors in document order.
    pub devices: Vec<Device>,
    /// Tag name of the first top-level element.
    pub root: Option<String>,
    /// Number of malformed fragments skipped while parsing.
    pub recovered_errors: usize,
    /// Set when the payload could not be decoded at all.
    pub failure: Option<String>,
}

impl NormalizeOutcome {
    /// Returns true if the payload was decodable.
    pub fn is_decodable(&self) -> bool {
        self.failure.is_none()
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Normalizes a raw device list.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn normalize_devices(bytes: &[u8]) -> NormalizeOutcome {
    let doc = match parse_tolerant(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Device list is not decodable");
            return NormalizeOutcome {
                failure: Some(e.to_string()),
                ..NormalizeOutcome::default()
            };
        }
    };

    let mut devices = Vec::new();

    if let Some(panel) = sensors_node(&doc.roots).and_then(panel_from_root) {
        devices.push(panel);
    }

    for root in &doc.roots {
        if root.name == SENSOR_TAG {
            devices.push(device_from_sensor(root));
        }
        devices.extend(root.find_all(SENSOR_TAG, &[]).into_iter().map(device_from_sensor));
    }

    debug!(
        count = devices.len(),
        recovered = doc.recovered_errors,
        "Normalized device list"
    );

    NormalizeOutcome {
        devices,
        root: doc.root().map(|r| r.name.clone()),
        recovered_errors: doc.recovered_errors,
        failure: None,
    }
}

/// Normalizes a raw device list, discarding diagnostics.
pub fn parse_devices(bytes: &[u8]) -> Vec<Device> {
    normalize_devices(bytes).devices
}

/// Returns the element holding the `Sensor` list, which also carries the
/// panel attributes. Falls back to the first top-level element, so a
/// document without sensors can still describe a panel.
fn sensors_node(roots: &[XmlNode]) -> Option<&XmlNode> {
    let holds_sensors = |n: &XmlNode| n.child(SENSOR_TAG).is_some();
    roots
        .iter()
        .find_map(|r| r.find_first(&holds_sensors))
        .or_else(|| roots.first())
}

/// Returns the first alias whose attribute is present and non-blank.
fn resolve_alias<'a>(node: &'a XmlNode, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|key| node.attr(key))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

fn panel_from_root(root: &XmlNode) -> Option<Device> {
    let name = resolve_alias(root, PANEL_NAME_ALIASES);
    let model = resolve_alias(root, PANEL_MODEL_ALIASES);
    let mode = resolve_alias(root, PANEL_MODE_ALIASES).map(str::to_uppercase);

    if name.is_none() && model.is_none() && mode.is_none() {
        return None;
    }

    let long_name = match model {
        Some(m) => format!("Centrale d'alarme ({m})"),
        None => "Centrale d'alarme".to_string(),
    };

    let mut panel = Device {
        id: Some(PANEL_ID.to_string()),
        device_type: Some(ALARM_PANEL.to_string()),
        device_model: Some(model.unwrap_or_default().to_string()),
        name: Some(name.unwrap_or("Centrale").to_string()),
        long_name: Some(long_name),
        status: Some(mode.clone().unwrap_or_else(|| "UNKNOWN".to_string())),
        battery_level: Some(LEVEL_NOT_APPLICABLE.to_string()),
        signal_level: Some(LEVEL_NOT_APPLICABLE.to_string()),
        categories: Some("alarm".to_string()),
        brand: Some(BRAND_FALLBACK.to_string()),
        ..Device::default()
    };
    panel.sensor_values.insert(
        "AlarmMode".to_string(),
        SensorValue::new(mode.unwrap_or_default()).with_attr("name", "AlarmMode"),
    );

    Some(panel)
}

fn device_from_sensor(sensor: &XmlNode) -> Device {
    let mut device = Device::default();

    for (key, value) in &sensor.attrs {
        if !device.set_known(key, value.clone()) && !KNOWN_KEYS.contains(&key.as_str()) {
            device.attributes.insert(key.clone(), value.clone());
        }
    }

    for field in OVERLAY_FIELDS {
        if let Some(text) = sensor.child_text(field) {
            device.set_known(field, text.to_string());
        }
    }

    device.brand = device.brand.as_deref().map(normalize_brand);

    collect_sensor_values(sensor, &mut device);

    device.video_url = if device.is_camera() {
        device
            .device_mac
            .as_deref()
            .map(str::trim)
            .filter(|mac| !mac.is_empty())
            .map(|mac| format!("{VIDEO_URL_BASE}{mac}"))
    } else {
        None
    };

    device
}

fn collect_sensor_values(sensor: &XmlNode, device: &mut Device) {
    let values = &mut device.sensor_values;

    for el in sensor.find_all(SENSOR_VALUE_TAG, &[SENSOR_TAG]) {
        let base = ["name", "id"]
            .iter()
            .filter_map(|k| el.attr(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map_or_else(|| format!("value_{}", values.len() + 1), str::to_string);

        let key = if values.contains_key(&base) {
            let mut n = 2;
            while values.contains_key(&format!("{base}_{n}")) {
                n += 1;
            }
            format!("{base}_{n}")
        } else {
            base
        };

        let mut attrs = el.attrs.clone();
        let value_attr = attrs.shift_remove("value");
        let value = Some(el.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or(value_attr)
            .unwrap_or_default();

        values.insert(key, SensorValue { value, attrs });
    }

    for container in sensor.find_all(SENSOR_VALUES_TAG, &[SENSOR_TAG]) {
        for child in &container.children {
            if child.name == SENSOR_VALUE_TAG || values.contains_key(&child.name) {
                continue;
            }
            let value = Some(child.text.trim())
                .filter(|t| !t.is_empty())
                .or_else(|| child.attr("value"))
                .unwrap_or_default()
                .to_string();
            values.insert(
                child.name.clone(),
                SensorValue::new(value).with_attr("name", child.name.clone()),
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Vec<Device> {
        parse_devices(xml.as_bytes())
    }

    #[test]
    fn test_panel_from_root_attributes() {
        let devices = parse(
            r#"<Sensors name="Maison" model_type="LS8000" alarm_mode="off"></Sensors>"#,
        );
        assert_eq!(devices.len(), 1);
        let panel = &devices[0];
        assert!(panel.is_panel());
        assert_eq!(panel.name.as_deref(), Some("Maison"));
        assert_eq!(panel.device_model.as_deref(), Some("LS8000"));
        assert_eq!(panel.long_name.as_deref(), Some("Centrale d'alarme (LS8000)"));
        assert_eq!(panel.status.as_deref(), Some("OFF"));
        assert_eq!(panel.battery_level.as_deref(), Some("-2"));
        assert_eq!(panel.signal_level.as_deref(), Some("-2"));
        assert_eq!(panel.categories.as_deref(), Some("alarm"));
        assert_eq!(panel.brand.as_deref(), Some("SFR HOME"));
        let mode = &panel.sensor_values["AlarmMode"];
        assert_eq!(mode.value, "OFF");
        assert_eq!(mode.attrs["name"], "AlarmMode");
    }

    #[test]
    fn test_panel_aliases_and_defaults() {
        let devices = parse(r#"<root hub_name="" model="" mode="custom"/>"#);
        let panel = &devices[0];
        assert_eq!(panel.name.as_deref(), Some("Centrale"));
        assert_eq!(panel.device_model.as_deref(), Some(""));
        assert_eq!(panel.long_name.as_deref(), Some("Centrale d'alarme"));
        assert_eq!(panel.status.as_deref(), Some("CUSTOM"));

        let devices = parse(r#"<root type="BOX"/>"#);
        assert_eq!(devices[0].status.as_deref(), Some("UNKNOWN"));
        assert_eq!(devices[0].sensor_values["AlarmMode"].value, "");
    }

    #[test]
    fn test_no_panel_without_aliases() {
        let devices = parse(r#"<Sensors foo="bar" name=" "><Sensor id="1"/></Sensors>"#);
        assert_eq!(devices.len(), 1);
        assert!(!devices[0].is_panel());
    }

    #[test]
    fn test_sensor_attributes_and_child_overlay() {
        let devices = parse(
            r#"<Sensors>
                 <Sensor id="12" deviceType="MAGNETIC" name="attr-name" zone="3">
                   <name>Porte entree</name>
                   <status>  </status>
                   <batteryLevel>95</batteryLevel>
                 </Sensor>
               </Sensors>"#,
        );
        let d = &devices[0];
        assert_eq!(d.id.as_deref(), Some("12"));
        assert_eq!(d.device_type.as_deref(), Some("MAGNETIC"));
        assert_eq!(d.name.as_deref(), Some("Porte entree"));
        assert_eq!(d.battery_level.as_deref(), Some("95"));
        assert_eq!(d.status, None);
        assert_eq!(d.attributes["zone"], "3");
        assert_eq!(d.brand, None);
    }

    #[test]
    fn test_empty_child_text_keeps_attribute() {
        let devices = parse(r#"<S><Sensor status="OK"><status></status></Sensor></S>"#);
        assert_eq!(devices[0].status.as_deref(), Some("OK"));
    }

    #[test]
    fn test_brand_normalized_when_present() {
        let devices = parse(
            r#"<S>
                 <Sensor id="1"><brand>img/logo_philips.png</brand></Sensor>
                 <Sensor id="2" brand="Bosch"/>
                 <Sensor id="3" brand=""/>
               </S>"#,
        );
        assert_eq!(devices[0].brand.as_deref(), Some("Philips"));
        assert_eq!(devices[1].brand.as_deref(), Some("Bosch"));
        assert_eq!(devices[2].brand.as_deref(), Some("SFR HOME"));
    }

    #[test]
    fn test_sensor_value_keys_and_disambiguation() {
        let devices = parse(
            r#"<S><Sensor id="1">
                 <sensorValue name="temp" unit="C">21.5</sensorValue>
                 <sensorValue name="temp" value="22"/>
                 <sensorValue id="hum">40</sensorValue>
                 <sensorValue>7</sensorValue>
               </Sensor></S>"#,
        );
        let sv = &devices[0].sensor_values;
        let keys: Vec<&str> = sv.keys().map(String::as_str).collect();
        assert_eq!(keys, ["temp", "temp_2", "hum", "value_4"]);
        assert_eq!(sv["temp"].value, "21.5");
        assert_eq!(sv["temp"].attrs["unit"], "C");
        assert_eq!(sv["temp_2"].value, "22");
        assert!(!sv["temp_2"].attrs.contains_key("value"));
        assert_eq!(sv["value_4"].value, "7");
    }

    #[test]
    fn test_sensor_values_container_shape() {
        let devices = parse(
            r#"<S><Sensor id="1">
                 <sensorValues>
                   <sensorValue name="temp">20</sensorValue>
                   <temp>99</temp>
                   <lux value="300"/>
                 </sensorValues>
               </Sensor></S>"#,
        );
        let sv = &devices[0].sensor_values;
        assert_eq!(sv.len(), 2);
        assert_eq!(sv["temp"].value, "20");
        assert_eq!(sv["lux"].value, "300");
        assert_eq!(sv["lux"].attrs["name"], "lux");
    }

    #[test]
    fn test_nested_sensor_values_not_shared() {
        let devices = parse(
            r#"<S><Sensor id="outer">
                 <sensorValue name="a">1</sensorValue>
                 <Sensor id="inner"><sensorValue name="b">2</sensorValue></Sensor>
               </Sensor></S>"#,
        );
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].sensor_values.len(), 1);
        assert!(devices[0].sensor_values.contains_key("a"));
        assert!(devices[1].sensor_values.contains_key("b"));
    }

    #[test]
    fn test_sensor_value_inside_sensor_value() {
        let devices = parse(
            r#"<S><Sensor id="1">
                 <sensorValue name="a"><sensorValue name="b">1</sensorValue></sensorValue>
               </Sensor></S>"#,
        );
        let sv = &devices[0].sensor_values;
        let keys: Vec<&str> = sv.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(sv["a"].value, "");
        assert_eq!(sv["b"].value, "1");
    }

    #[test]
    fn test_panel_survives_leading_junk() {
        for xml in [
            r#"<1bad/><Sensors mode="arm"><Sensor id="9"/></Sensors>"#,
            r#"<<<>>><Sensors mode="arm"><Sensor id="9"/></Sensors>"#,
            r#"<br><Sensors mode="arm"><Sensor id="9"/></Sensors>"#,
        ] {
            let outcome = normalize_devices(xml.as_bytes());
            assert_eq!(outcome.devices.len(), 2, "{xml}");
            assert!(outcome.devices[0].is_panel(), "{xml}");
            assert_eq!(outcome.devices[0].status.as_deref(), Some("ARM"));
            assert_eq!(outcome.devices[1].id.as_deref(), Some("9"));
        }
    }

    #[test]
    fn test_login_page_yields_no_devices() {
        let outcome = normalize_devices(
            br#"<html lang="fr"><body><form><input type="hidden" name="lt" value="LT-1"></form></body></html>"#,
        );
        assert!(outcome.is_decodable());
        assert!(outcome.devices.is_empty());
        assert_eq!(outcome.root.as_deref(), Some("html"));
    }

    #[test]
    fn test_camera_video_url() {
        let devices = parse(
            r#"<S>
                 <Sensor id="1" deviceType="camera_wifi" deviceMac="00:11:22:33:44:55"/>
                 <Sensor id="2" deviceType="CAMERA_WIFI" deviceMac=" "/>
                 <Sensor id="3" deviceType="MAGNETIC" deviceMac="AA"/>
               </S>"#,
        );
        assert_eq!(
            devices[0].video_url.as_deref(),
            Some("https://home.sfr.fr/homescope/flv?localconn=0&mac=00:11:22:33:44:55")
        );
        assert_eq!(devices[1].video_url, None);
        assert_eq!(devices[2].video_url, None);
    }

    #[test]
    fn test_unknown_device_type_passes_through() {
        let devices = parse(r#"<S><Sensor deviceType="FUTURE_GADGET"/></S>"#);
        assert_eq!(devices[0].device_type.as_deref(), Some("FUTURE_GADGET"));
    }

    #[test]
    fn test_undecodable_payload() {
        let outcome = normalize_devices(b"");
        assert!(outcome.devices.is_empty());
        assert!(!outcome.is_decodable());
    }

    #[test]
    fn test_malformed_payload_recovers() {
        let outcome = normalize_devices(
            br#"<Sensors alarm_mode="ON"><Sensor id="1"><name>A</Sensor><Sensor id="2">"#,
        );
        assert!(outcome.is_decodable());
        assert_eq!(outcome.devices.len(), 3);
        assert_eq!(outcome.devices[1].name.as_deref(), Some("A"));
        assert_eq!(outcome.devices[2].id.as_deref(), Some("2"));
    }
}
