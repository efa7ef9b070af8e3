//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sfrhome_core::{Device, DeviceSnapshot, FetchSource};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for `--format json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOutput<'a> {
    pub source: FetchSource,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
    pub count: usize,
    pub devices: &'a [Device],
}

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a snapshot with its metadata.
    pub fn format_snapshot(&self, snapshot: &DeviceSnapshot) -> Result<String> {
        self.format(&SnapshotOutput {
            source: snapshot.source,
            fetched_at: snapshot.fetched_at,
            count: snapshot.devices.len(),
            devices: &snapshot.devices,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
