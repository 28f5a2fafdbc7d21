use std::collections::BTreeMap;

use uuid::Uuid;

use crate::entities::{RawEventPayload, RuntimeConfig, TelemetryEvent};

/// Result of sanitizing one batch: the events that survived and the count
/// of payloads dropped for failing the required-field check.
#[derive(Debug, Default)]
pub struct ValidatedBatch {
    pub events: Vec<TelemetryEvent>,
    pub dropped: u64,
}

/// Parses and sanitizes incoming event payloads. A payload missing
/// `player_id` or `action_type` is dropped silently; it never aborts the
/// batch. Everything else is defaulted.
#[derive(Debug, Clone)]
pub struct BatchValidator {
    default_owner: String,
    max_metadata_keys: usize,
}

impl BatchValidator {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            default_owner: config.default_owner.clone(),
            max_metadata_keys: config.max_metadata_keys,
        }
    }

    pub fn sanitize(&self, payloads: Vec<RawEventPayload>, received_at: i64) -> ValidatedBatch {
        let mut batch = ValidatedBatch::default();
        for payload in payloads {
            match self.sanitize_one(payload, received_at) {
                Some(event) => batch.events.push(event),
                None => batch.dropped += 1,
            }
        }
        batch
    }

    fn sanitize_one(&self, payload: RawEventPayload, received_at: i64) -> Option<TelemetryEvent> {
        let player_id = non_empty(payload.player_id)?;
        let action_type = non_empty(payload.action_type)?;

        let mut metadata = payload.metadata.unwrap_or_default();
        if metadata.len() > self.max_metadata_keys {
            metadata = truncate_metadata(metadata, self.max_metadata_keys);
        }

        Some(TelemetryEvent {
            event_id: non_empty(payload.event_id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            owner: non_empty(payload.owner).unwrap_or_else(|| self.default_owner.clone()),
            player_id,
            action_type,
            session_id: non_empty(payload.session_id),
            timestamp: payload.timestamp.filter(|ts| *ts > 0).unwrap_or(received_at),
            metadata,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Keeps the first `limit` keys in lexicographic order, so truncation is
/// deterministic across redeliveries of the same event.
fn truncate_metadata(
    metadata: BTreeMap<String, serde_json::Value>,
    limit: usize,
) -> BTreeMap<String, serde_json::Value> {
    metadata.into_iter().take(limit).collect()
}
