// Batch result
// Response body for one ingest call; constructed fresh, never persisted

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub events_received: u64,
    pub events_stored: u64,
    pub events_skipped: u64,
    pub players_updated: u64,
    pub detections_raised: u64,
    pub processing_time_ms: f64,
    pub request_id: String,
}

impl BatchResult {
    pub fn empty(request_id: String) -> Self {
        Self {
            success: true,
            request_id,
            ..Self::default()
        }
    }
}
