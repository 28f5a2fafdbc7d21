// Telemetry event entity
// One observed player action delivered by the game-server plugin

use std::collections::BTreeMap;

use clickhouse::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::utils::millis_to_utc;

/// Outer request body of a `POST /ingest` call.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestEnvelope {
    #[serde(default)]
    pub events: Vec<RawEventPayload>,
}

/// One event as delivered on the wire, before validation. Everything except
/// `player_id` and `action_type` is optional and gets defaulted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventPayload {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// A validated event. Consumed exactly once per delivery attempt; retained
/// events become immutable rows, stats-only events are discarded after the
/// accumulator has seen them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event_id: String,
    pub owner: String,
    pub player_id: String,
    pub action_type: String,
    pub session_id: Option<String>,
    pub timestamp: i64,
    pub metadata: BTreeMap<String, Value>,
}

impl TelemetryEvent {
    /// Numeric view of a metadata field. Integers and floats both qualify;
    /// strings and nested values do not.
    pub fn metadata_number(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(Value::as_f64)
    }

    pub fn metadata_number_or(&self, key: &str, default: f64) -> f64 {
        self.metadata_number(key).unwrap_or(default)
    }
}

/// Persisted shape of a retained event. The ordering key
/// (owner, player_id, timestamp, event_id) realizes the
/// `owner#playerId` / `timestamp#eventId` composite key, so a redelivered
/// event id collapses onto the same row.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct TelemetryEventRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub event_time: OffsetDateTime,
    pub event_id: String,
    pub owner: String,
    pub player_id: String,
    pub action_type: String,
    pub session_id: String,
    pub metadata_json: String,
}

impl From<&TelemetryEvent> for TelemetryEventRow {
    fn from(event: &TelemetryEvent) -> Self {
        Self {
            event_time: millis_to_utc(event.timestamp),
            event_id: event.event_id.clone(),
            owner: event.owner.clone(),
            player_id: event.player_id.clone(),
            action_type: event.action_type.clone(),
            session_id: event.session_id.clone().unwrap_or_default(),
            metadata_json: serde_json::to_string(&event.metadata).unwrap_or_else(|_| "{}".into()),
        }
    }
}
