// Runtime configuration
// Built once at startup from AppConfig and injected into the pipeline;
// never process-wide mutable state

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub default_owner: String,
    pub always_store_actions: Vec<String>,
    pub tracked_metrics: Vec<String>,
    pub accuracy_interesting_threshold: f64,
    pub headshot_interesting_threshold: f64,
    pub min_shots_for_interesting: u64,
    pub high_damage_threshold: f64,
    pub zscore_threshold: f64,
    pub min_samples_for_scoring: u64,
    pub risk_decay_factor: f64,
    pub risk_severity_weight: f64,
    pub event_ttl_days: u32,
    pub max_batch_events: usize,
    pub max_metadata_keys: usize,
    pub storage_write_attempts: u32,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub baselines_path: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3344".to_string(),
            api_key: None,
            default_owner: "default".to_string(),
            always_store_actions: crate::value_objects::default_always_store_actions(),
            tracked_metrics: crate::value_objects::default_tracked_metrics(),
            accuracy_interesting_threshold: 0.70,
            headshot_interesting_threshold: 0.50,
            min_shots_for_interesting: 1,
            high_damage_threshold: 100.0,
            zscore_threshold: 3.0,
            min_samples_for_scoring: 5,
            risk_decay_factor: 0.9,
            risk_severity_weight: 10.0,
            event_ttl_days: 90,
            max_batch_events: 50,
            max_metadata_keys: 32,
            storage_write_attempts: 3,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_seconds: 15,
            baselines_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn is_always_store(&self, action_type: &str) -> bool {
        self.always_store_actions.iter().any(|a| a == action_type)
    }

    pub fn is_tracked_metric(&self, name: &str) -> bool {
        self.tracked_metrics.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
}

/// Population baseline for one metric, used in place of the entity's own
/// history when supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BaselineStat {
    pub mean: f64,
    pub std_dev: f64,
}

pub type PopulationBaselines = HashMap<String, BaselineStat>;
