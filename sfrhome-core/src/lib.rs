// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # SFR Home Core
//!
//! Core types and the device-list normalizer for the SFR Home portal.
//!
//! This crate has no network or filesystem access. It provides:
//!
//! - Domain models (device records, session cookies)
//! - A tolerant XML reader for the portal's `mysensors` payload
//! - Brand label normalization
//! - Error types
//!
//! ## Key Types
//!
//! - [`Device`] - One normalized device record
//! - [`SensorValue`] - A reading attached to a device
//! - [`DeviceSnapshot`] - Records plus fetch metadata
//! - [`Cookie`] - A persisted session cookie
//! - [`FetchSource`] - How data was obtained
//! - [`NormalizeOutcome`] - Records plus parse diagnostics

pub mod brand;
pub mod error;
pub mod models;
pub mod normalize;
pub mod xml;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    parse_cookie_header, Cookie, Device, DeviceSnapshot, FetchSource,
    SensorValue, SsoFieldStyle, ALARM_PANEL, CAMERA_WIFI, KNOWN_KEYS, LEVEL_NOT_APPLICABLE,
    MASK_PREFIX_LEN, PANEL_ID,
};

// Re-export the normalizer entry points
pub use brand::{normalize_brand, BRAND_FALLBACK};
pub use normalize::{normalize_devices, parse_devices, NormalizeOutcome};
