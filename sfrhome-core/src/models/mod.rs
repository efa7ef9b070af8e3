//! Domain models for SFR Home.
//!
//! ## Submodules
//!
//! - [`device`] - Device records and snapshots
//! - [`cookie`] - Persisted session cookies
//! - [`status`] - Fetch source and SSO field style

mod cookie;
mod device;
mod status;

pub use cookie::{parse_cookie_header, Cookie, MASK_PREFIX_LEN};
pub use device::{
    Device, DeviceSnapshot, SensorValue, ALARM_PANEL, CAMERA_WIFI, KNOWN_KEYS,
    LEVEL_NOT_APPLICABLE, PANEL_ID,
};
pub use status::{FetchSource, SsoFieldStyle};
