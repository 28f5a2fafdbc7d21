// Detection entity
// One anomaly flag raised by the scorer; append-only, never mutated

use clickhouse::Row;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::utils::millis_to_utc;
use crate::value_objects::DetectionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub detection_id: String,
    pub owner: String,
    pub player_id: String,
    /// Metric or detector name that triggered the flag.
    pub signal: String,
    pub score: f64,
    pub threshold: f64,
    pub timestamp: i64,
    pub source_event_id: Option<String>,
    pub explanation: String,
    pub status: DetectionStatus,
}

impl Detection {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: &str,
        player_id: &str,
        signal: &str,
        score: f64,
        threshold: f64,
        timestamp: i64,
        source_event_id: Option<String>,
        explanation: String,
    ) -> Self {
        Self {
            detection_id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            player_id: player_id.to_string(),
            signal: signal.to_string(),
            score,
            threshold,
            timestamp,
            source_event_id,
            explanation,
            status: DetectionStatus::Open,
        }
    }

    /// Contribution to the decayed risk accumulation.
    pub fn severity(&self, weight: f64) -> f64 {
        self.score.abs() * weight
    }
}

/// Review-workflow filter for the detections read path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionQuery {
    pub owner: Option<String>,
    pub player: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DetectionRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub created_at: OffsetDateTime,
    pub detection_id: String,
    pub owner: String,
    pub player_id: String,
    pub signal: String,
    pub score: f64,
    pub threshold: f64,
    pub source_event_id: String,
    pub explanation: String,
    pub status: String,
}

impl From<&Detection> for DetectionRow {
    fn from(detection: &Detection) -> Self {
        Self {
            created_at: millis_to_utc(detection.timestamp),
            detection_id: detection.detection_id.clone(),
            owner: detection.owner.clone(),
            player_id: detection.player_id.clone(),
            signal: detection.signal.clone(),
            score: detection.score,
            threshold: detection.threshold,
            source_event_id: detection.source_event_id.clone().unwrap_or_default(),
            explanation: detection.explanation.clone(),
            status: detection.status.as_str().to_string(),
        }
    }
}
