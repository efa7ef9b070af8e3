//! Control API stub.
//!
//! Accepts device and alarm commands and acknowledges them. Nothing is
//! forwarded to the portal yet.

use axum::body::Bytes;
use axum::extract::Path;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map, Value};
use sfrhome_core::PANEL_ID;
use tracing::info;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

const DEFAULT_ALARM_MODE: &str = "OFF";

/// Acknowledgement of a device command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceAck {
    ok: bool,
    id: String,
    on: bool,
}

/// Acknowledgement of an alarm command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmAck {
    ok: bool,
    id: String,
    mode: String,
}

/// Builds the control router.
pub fn router() -> Router {
    Router::new()
        .route("/api/device/{id}/set", post(set_device))
        .route("/api/alarm/set", post(set_alarm))
}

async fn set_device(Path(id): Path<String>, body: Bytes) -> Json<DeviceAck> {
    let body = lenient_object(&body);
    let on = body.get("on").is_some_and(truthy);

    info!(device = %id, on, "Device command accepted");
    Json(DeviceAck { ok: true, id, on })
}

async fn set_alarm(body: Bytes) -> Json<AlarmAck> {
    let body = lenient_object(&body);

    let id = body
        .get("id")
        .and_then(scalar_string)
        .unwrap_or_else(|| PANEL_ID.to_string());
    let mode = body
        .get("mode")
        .and_then(scalar_string)
        .filter(|m| !m.is_empty())
        .map_or_else(|| DEFAULT_ALARM_MODE.to_string(), |m| m.to_uppercase());

    info!(device = %id, mode = %mode, "Alarm command accepted");
    Json(AlarmAck { ok: true, id, mode })
}

/// Parses a JSON object body; anything else counts as `{}`.
fn lenient_object(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
