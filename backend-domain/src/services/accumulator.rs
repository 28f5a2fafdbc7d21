use std::collections::BTreeMap;

use crate::entities::{EntityState, RuntimeConfig, TelemetryEvent};
use crate::value_objects::action;

/// Per-entity working set for one batch: the (possibly freshly loaded)
/// state plus everything observed for it in this batch. The scorer reads
/// the observations after all events have been applied.
#[derive(Debug)]
pub struct BatchEntity {
    pub state: EntityState,
    /// Values observed this batch, per tracked metric, in arrival order.
    pub observed: BTreeMap<String, Vec<f64>>,
    pub last_event_id: Option<String>,
}

impl BatchEntity {
    pub fn new(state: EntityState) -> Self {
        Self {
            state,
            observed: BTreeMap::new(),
            last_event_id: None,
        }
    }
}

/// Updates the rolling feature vector for every validated event, whatever
/// its retention tier. Each metric update is self-contained, so a batch
/// that dies mid-flight never leaves a half-applied invariant.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    tracked_metrics: Vec<String>,
}

impl StatsAccumulator {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            tracked_metrics: config.tracked_metrics.clone(),
        }
    }

    pub fn apply(&self, entry: &mut BatchEntity, event: &TelemetryEvent) {
        entry.state.touch(event.timestamp);

        for name in &self.tracked_metrics {
            if let Some(value) = event.metadata_number(name) {
                entry.state.observe_metric(name, value);
                entry.observed.entry(name.clone()).or_default().push(value);
            }
        }

        match event.action_type.as_str() {
            action::WEAPON_FIRED => self.apply_weapon_fired(entry, event),
            action::PLAYER_KILLED => entry.state.total_kills += 1,
            _ => {}
        }

        entry.last_event_id = Some(event.event_id.clone());
    }

    fn apply_weapon_fired(&self, entry: &mut BatchEntity, event: &TelemetryEvent) {
        // A WEAPON_FIRED without an explicit count still fired one shot.
        let shots = event.metadata_number_or("shots", 1.0).max(0.0);
        let hits = event.metadata_number_or("hits", 0.0).max(0.0);
        let headshots = event.metadata_number_or("headshots", 0.0).max(0.0);

        entry.state.total_shots += shots as u64;
        entry.state.total_hits += hits as u64;
        entry.state.total_headshots += headshots as u64;

        if shots > 0.0 {
            let accuracy = hits / shots;
            entry.state.observe_metric("accuracy", accuracy);
            entry
                .observed
                .entry("accuracy".to_string())
                .or_default()
                .push(accuracy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(action_type: &str, timestamp: i64, metadata: &[(&str, f64)]) -> TelemetryEvent {
        TelemetryEvent {
            event_id: format!("evt-{timestamp}"),
            owner: "srv".to_string(),
            player_id: "p1".to_string(),
            action_type: action_type.to_string(),
            session_id: None,
            timestamp,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect(),
        }
    }

    fn accumulator() -> StatsAccumulator {
        StatsAccumulator::new(&RuntimeConfig::default())
    }

    #[test]
    fn tracked_metadata_feeds_moments() {
        let accumulator = accumulator();
        let mut entry = BatchEntity::new(EntityState::new("srv", "p1", 1_000));

        accumulator.apply(&mut entry, &event("WEAPON_FIRED", 1_000, &[("shots", 10.0), ("hits", 6.0)]));
        accumulator.apply(&mut entry, &event("WEAPON_FIRED", 2_000, &[("shots", 20.0), ("hits", 8.0)]));

        let shots = entry.state.metric("shots").expect("shots moments");
        assert_eq!(shots.samples, 2);
        assert!((shots.mean - 15.0).abs() < 1e-12);
        assert_eq!(entry.observed["shots"], vec![10.0, 20.0]);

        // derived accuracy observed per event: 0.6, then 0.4
        let accuracy = entry.state.metric("accuracy").expect("accuracy moments");
        assert_eq!(accuracy.samples, 2);
        assert!((accuracy.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn combat_totals_accumulate() {
        let accumulator = accumulator();
        let mut entry = BatchEntity::new(EntityState::new("srv", "p1", 1_000));

        accumulator.apply(
            &mut entry,
            &event("WEAPON_FIRED", 1_000, &[("shots", 10.0), ("hits", 9.0), ("headshots", 5.0)]),
        );
        accumulator.apply(&mut entry, &event("PLAYER_KILLED", 2_000, &[]));

        assert_eq!(entry.state.total_shots, 10);
        assert_eq!(entry.state.total_hits, 9);
        assert_eq!(entry.state.total_headshots, 5);
        assert_eq!(entry.state.total_kills, 1);
        assert!((entry.state.accuracy() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn untracked_fields_are_ignored() {
        let accumulator = accumulator();
        let mut entry = BatchEntity::new(EntityState::new("srv", "p1", 1_000));
        accumulator.apply(&mut entry, &event("PLAYER_TICK", 1_000, &[("pos_x", 12.5)]));
        assert!(entry.state.metrics.is_empty());
        assert!(entry.observed.is_empty());
        assert_eq!(entry.state.event_count, 1);
    }

    #[test]
    fn weapon_fired_without_count_is_one_shot() {
        let accumulator = accumulator();
        let mut entry = BatchEntity::new(EntityState::new("srv", "p1", 1_000));
        accumulator.apply(&mut entry, &event("WEAPON_FIRED", 1_000, &[]));
        assert_eq!(entry.state.total_shots, 1);
        assert_eq!(entry.state.total_hits, 0);
    }
}
