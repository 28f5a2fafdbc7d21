// Entity state
// Rolling per-(owner, player) statistics accumulator

use std::collections::BTreeMap;

use clickhouse::Row;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::utils::millis_to_utc;

pub const STATUS_MONITOR: &str = "MONITOR";

/// Online moments for one tracked metric, maintained with Welford's
/// algorithm so mean and variance stay exact without retaining history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricStats {
    pub samples: u64,
    pub total: f64,
    pub mean: f64,
    pub m2: f64,
}

impl MetricStats {
    pub fn observe(&mut self, value: f64) {
        self.samples += 1;
        self.total += value;
        let delta = value - self.mean;
        self.mean += delta / self.samples as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Population variance (m2 / n). Never negative.
    pub fn variance(&self) -> f64 {
        if self.samples < 2 {
            return 0.0;
        }
        (self.m2 / self.samples as f64).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Per-player profile and feature vector. Owned by the statistics
/// accumulator, read by the anomaly scorer, persisted last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    pub owner: String,
    pub player_id: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub event_count: u64,
    pub total_shots: u64,
    pub total_hits: u64,
    pub total_headshots: u64,
    pub total_kills: u64,
    pub risk_score: f64,
    pub status: String,
    pub metrics: BTreeMap<String, MetricStats>,
}

impl EntityState {
    pub fn new(owner: &str, player_id: &str, now: i64) -> Self {
        Self {
            owner: owner.to_string(),
            player_id: player_id.to_string(),
            first_seen: now,
            last_seen: now,
            event_count: 0,
            total_shots: 0,
            total_hits: 0,
            total_headshots: 0,
            total_kills: 0,
            risk_score: 0.0,
            status: STATUS_MONITOR.to_string(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricStats> {
        self.metrics.get(name)
    }

    pub fn observe_metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().observe(value);
    }

    /// Lifetime hit ratio; zero until the first shot lands in the totals.
    pub fn accuracy(&self) -> f64 {
        if self.total_shots == 0 {
            return 0.0;
        }
        self.total_hits as f64 / self.total_shots as f64
    }

    pub fn headshot_ratio(&self) -> f64 {
        self.total_headshots as f64 / (self.total_hits.max(1)) as f64
    }

    pub fn touch(&mut self, timestamp: i64) {
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
        self.event_count += 1;
    }
}

/// Flat persisted shape; the moment map travels as JSON alongside the
/// indexed profile columns. `updated_at` drives last-write-wins collapse.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EntityStateRow {
    pub owner: String,
    pub player_id: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub event_count: u64,
    pub total_shots: u64,
    pub total_hits: u64,
    pub total_headshots: u64,
    pub total_kills: u64,
    pub risk_score: f64,
    pub status: String,
    pub metrics_json: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub updated_at: OffsetDateTime,
}

impl EntityStateRow {
    pub fn from_state(state: &EntityState, now: i64) -> Self {
        Self {
            owner: state.owner.clone(),
            player_id: state.player_id.clone(),
            first_seen: state.first_seen,
            last_seen: state.last_seen,
            event_count: state.event_count,
            total_shots: state.total_shots,
            total_hits: state.total_hits,
            total_headshots: state.total_headshots,
            total_kills: state.total_kills,
            risk_score: state.risk_score,
            status: state.status.clone(),
            metrics_json: serde_json::to_string(&state.metrics).unwrap_or_else(|_| "{}".into()),
            updated_at: millis_to_utc(now),
        }
    }

    pub fn into_state(self) -> EntityState {
        let metrics = serde_json::from_str(&self.metrics_json).unwrap_or_default();
        EntityState {
            owner: self.owner,
            player_id: self.player_id,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            event_count: self.event_count,
            total_shots: self.total_shots,
            total_hits: self.total_hits,
            total_headshots: self.total_headshots,
            total_kills: self.total_kills,
            risk_score: self.risk_score,
            status: self.status,
            metrics,
        }
    }
}
