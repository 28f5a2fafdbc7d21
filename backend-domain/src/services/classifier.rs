use crate::entities::{RuntimeConfig, TelemetryEvent};
use crate::value_objects::{action, RetentionTier};

/// Decides the retention tier for each event. Three terminal outcomes,
/// evaluated in order: always-store, threshold-store, stats-only.
///
/// Storage volume stays proportional to forensic value: high-volume routine
/// events (ticks, looting, input samples) still feed the statistics but are
/// never persisted as rows.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    always_store_actions: Vec<String>,
    accuracy_threshold: f64,
    headshot_threshold: f64,
    min_shots: u64,
    high_damage_threshold: f64,
}

impl EventClassifier {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            always_store_actions: config.always_store_actions.clone(),
            accuracy_threshold: config.accuracy_interesting_threshold,
            headshot_threshold: config.headshot_interesting_threshold,
            min_shots: config.min_shots_for_interesting,
            high_damage_threshold: config.high_damage_threshold,
        }
    }

    pub fn classify(&self, event: &TelemetryEvent) -> RetentionTier {
        if self.always_store_actions.iter().any(|a| a == &event.action_type) {
            return RetentionTier::AlwaysStore;
        }

        match event.action_type.as_str() {
            action::WEAPON_FIRED => self.classify_weapon_fired(event),
            action::PLAYER_ATTACK => self.classify_attack(event),
            _ => RetentionTier::StatsOnly,
        }
    }

    /// Absent or malformed metadata falls through to stats-only; a
    /// zero denominator never qualifies.
    fn classify_weapon_fired(&self, event: &TelemetryEvent) -> RetentionTier {
        let shots = event.metadata_number_or("shots", 0.0);
        if shots <= 0.0 || (shots as u64) < self.min_shots {
            return RetentionTier::StatsOnly;
        }
        let hits = event.metadata_number_or("hits", 0.0);
        let headshots = event.metadata_number_or("headshots", 0.0);

        if hits / shots >= self.accuracy_threshold {
            return RetentionTier::ThresholdStore;
        }
        if hits > 0.0 && headshots / hits >= self.headshot_threshold {
            return RetentionTier::ThresholdStore;
        }
        RetentionTier::StatsOnly
    }

    fn classify_attack(&self, event: &TelemetryEvent) -> RetentionTier {
        match event.metadata_number("damage") {
            Some(damage) if damage > self.high_damage_threshold => RetentionTier::ThresholdStore,
            _ => RetentionTier::StatsOnly,
        }
    }
}
