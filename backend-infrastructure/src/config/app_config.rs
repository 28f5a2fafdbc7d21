use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use backend_domain::value_objects::{default_always_store_actions, default_tracked_metrics};
use backend_domain::{DbConfig, RuntimeConfig};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub default_owner: String,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3344".to_string(),
            api_key: None,
            default_owner: "default".to_string(),
            clickhouse_url: "http://127.0.0.1:8123".to_string(),
            clickhouse_database: "vigil".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            always_store_actions: default_always_store_actions(),
            tracked_metrics: default_tracked_metrics(),
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

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("VIGIL_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        if !file_path.exists() {
            warn!("config.toml not found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.resolve_paths(base_dir);
            config.normalize();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        if let Some(api_key) = &self.api_key {
            if api_key.trim().is_empty() {
                self.api_key = None;
            }
        }
        if let Some(user) = &self.clickhouse_user {
            if user.trim().is_empty() {
                self.clickhouse_user = None;
            }
        }
        if let Some(password) = &self.clickhouse_password {
            if password.trim().is_empty() {
                self.clickhouse_password = None;
            }
        }
        if let Some(path) = &self.baselines_path {
            if path.trim().is_empty() {
                self.baselines_path = None;
            }
        }
        self.always_store_actions = normalize_list(std::mem::take(&mut self.always_store_actions));
        self.tracked_metrics = normalize_list(std::mem::take(&mut self.tracked_metrics));
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        if let Some(path) = &self.baselines_path {
            self.baselines_path = Some(resolve_path(base, path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.max_batch_events == 0 {
            return Err(anyhow!("max_batch_events must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.accuracy_interesting_threshold) {
            return Err(anyhow!("accuracy_interesting_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.headshot_interesting_threshold) {
            return Err(anyhow!("headshot_interesting_threshold must be in [0, 1]"));
        }
        if self.zscore_threshold <= 0.0 {
            return Err(anyhow!("zscore_threshold must be positive"));
        }
        if !(0.0..=1.0).contains(&self.risk_decay_factor) {
            return Err(anyhow!("risk_decay_factor must be in [0, 1]"));
        }
        if self.event_ttl_days == 0 {
            return Err(anyhow!("event_ttl_days must be greater than 0"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_key: self.api_key.clone(),
            default_owner: self.default_owner.clone(),
            always_store_actions: self.always_store_actions.clone(),
            tracked_metrics: self.tracked_metrics.clone(),
            accuracy_interesting_threshold: self.accuracy_interesting_threshold,
            headshot_interesting_threshold: self.headshot_interesting_threshold,
            min_shots_for_interesting: self.min_shots_for_interesting,
            high_damage_threshold: self.high_damage_threshold,
            zscore_threshold: self.zscore_threshold,
            min_samples_for_scoring: self.min_samples_for_scoring,
            risk_decay_factor: self.risk_decay_factor,
            risk_severity_weight: self.risk_severity_weight,
            event_ttl_days: self.event_ttl_days,
            max_batch_events: self.max_batch_events,
            max_metadata_keys: self.max_metadata_keys,
            storage_write_attempts: self.storage_write_attempts,
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
            baselines_path: self.baselines_path.clone(),
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            clickhouse_url: self.clickhouse_url.clone(),
            clickhouse_database: self.clickhouse_database.clone(),
            clickhouse_user: self.clickhouse_user.clone(),
            clickhouse_password: self.clickhouse_password.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("VIGIL_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("VIGIL_API_KEY") {
            self.api_key = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_DEFAULT_OWNER") {
            self.default_owner = value;
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_URL") {
            self.clickhouse_url = value;
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_DATABASE") {
            self.clickhouse_database = value;
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_USER") {
            self.clickhouse_user = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_PASSWORD") {
            self.clickhouse_password = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_ALWAYS_STORE_ACTIONS") {
            self.always_store_actions = parse_env_list(&value);
        }
        if let Ok(value) = env::var("VIGIL_TRACKED_METRICS") {
            self.tracked_metrics = parse_env_list(&value);
        }
        if let Ok(value) = env::var("VIGIL_ACCURACY_INTERESTING_THRESHOLD") {
            self.accuracy_interesting_threshold =
                value.parse().unwrap_or(self.accuracy_interesting_threshold);
        }
        if let Ok(value) = env::var("VIGIL_HEADSHOT_INTERESTING_THRESHOLD") {
            self.headshot_interesting_threshold =
                value.parse().unwrap_or(self.headshot_interesting_threshold);
        }
        if let Ok(value) = env::var("VIGIL_MIN_SHOTS_FOR_INTERESTING") {
            self.min_shots_for_interesting =
                value.parse().unwrap_or(self.min_shots_for_interesting);
        }
        if let Ok(value) = env::var("VIGIL_HIGH_DAMAGE_THRESHOLD") {
            self.high_damage_threshold = value.parse().unwrap_or(self.high_damage_threshold);
        }
        if let Ok(value) = env::var("VIGIL_ZSCORE_THRESHOLD") {
            self.zscore_threshold = value.parse().unwrap_or(self.zscore_threshold);
        }
        if let Ok(value) = env::var("VIGIL_MIN_SAMPLES_FOR_SCORING") {
            self.min_samples_for_scoring =
                value.parse().unwrap_or(self.min_samples_for_scoring);
        }
        if let Ok(value) = env::var("VIGIL_RISK_DECAY_FACTOR") {
            self.risk_decay_factor = value.parse().unwrap_or(self.risk_decay_factor);
        }
        if let Ok(value) = env::var("VIGIL_RISK_SEVERITY_WEIGHT") {
            self.risk_severity_weight = value.parse().unwrap_or(self.risk_severity_weight);
        }
        if let Ok(value) = env::var("VIGIL_EVENT_TTL_DAYS") {
            self.event_ttl_days = value.parse().unwrap_or(self.event_ttl_days);
        }
        if let Ok(value) = env::var("VIGIL_MAX_BATCH_EVENTS") {
            self.max_batch_events = value.parse().unwrap_or(self.max_batch_events);
        }
        if let Ok(value) = env::var("VIGIL_MAX_METADATA_KEYS") {
            self.max_metadata_keys = value.parse().unwrap_or(self.max_metadata_keys);
        }
        if let Ok(value) = env::var("VIGIL_STORAGE_WRITE_ATTEMPTS") {
            self.storage_write_attempts =
                value.parse().unwrap_or(self.storage_write_attempts);
        }
        if let Ok(value) = env::var("VIGIL_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("VIGIL_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds =
                value.parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Ok(value) = env::var("VIGIL_BASELINES_PATH") {
            self.baselines_path = Some(value);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

fn parse_env_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = values
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_detection_contract() {
        let config = AppConfig::default();
        assert_eq!(config.accuracy_interesting_threshold, 0.70);
        assert_eq!(config.headshot_interesting_threshold, 0.50);
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.min_samples_for_scoring, 5);
        assert_eq!(config.event_ttl_days, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn normalize_strips_blank_secrets_and_lists() {
        let mut config = AppConfig {
            api_key: Some("   ".to_string()),
            clickhouse_user: Some("".to_string()),
            always_store_actions: vec![" SESSION_START ".to_string(), "".to_string()],
            ..AppConfig::default()
        };
        config.normalize();
        assert!(config.api_key.is_none());
        assert!(config.clickhouse_user.is_none());
        assert_eq!(config.always_store_actions, vec!["SESSION_START".to_string()]);
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        let config = AppConfig {
            accuracy_interesting_threshold: 1.5,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            zscore_threshold: 0.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            bind_addr: "not-an-addr".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        env::set_var("VIGIL_ZSCORE_THRESHOLD", "4.5");
        env::set_var("VIGIL_TRACKED_METRICS", "shots, hits ,");
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        env::remove_var("VIGIL_ZSCORE_THRESHOLD");
        env::remove_var("VIGIL_TRACKED_METRICS");

        assert_eq!(config.zscore_threshold, 4.5);
        assert_eq!(
            config.tracked_metrics,
            vec!["shots".to_string(), "hits".to_string()]
        );
    }

    #[test]
    fn runtime_config_carries_thresholds() {
        let runtime = AppConfig::default().to_runtime_config();
        assert!(runtime.is_always_store("PLAYER_KILLED"));
        assert!(!runtime.is_always_store("PLAYER_TICK"));
        assert!(runtime.is_tracked_metric("headshots"));
        assert!(!runtime.is_tracked_metric("pos_x"));
    }
}
