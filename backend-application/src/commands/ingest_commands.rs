use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Instant;

use tracing::{debug, error, warn};

use backend_domain::services::{AnomalyScorer, BatchEntity, BatchValidator, EventClassifier, StatsAccumulator};
use backend_domain::utils::current_millis;
use backend_domain::value_objects::EntityKey;
use backend_domain::{BatchResult, Detection, EntityState, RawEventPayload, TelemetryEvent};

use crate::{AppError, AppState};

/// Runs one ingest batch end to end: validate, classify, accumulate,
/// score, persist, respond. Per-event problems are isolated; storage
/// failures are retried with bounded attempts and logged, never surfaced
/// to the caller. Only an unparseable outer payload (handled before this
/// point) fails the call.
pub async fn process_batch(
    state: &AppState,
    payloads: Vec<RawEventPayload>,
    request_id: String,
) -> Result<BatchResult, AppError> {
    let started = Instant::now();
    let received_at = current_millis();
    let events_received = payloads.len() as u64;

    if payloads.len() > state.config.max_batch_events {
        warn!(
            "batch of {} events exceeds configured maximum {}",
            payloads.len(),
            state.config.max_batch_events
        );
    }

    let validator = BatchValidator::new(&state.config);
    let batch = validator.sanitize(payloads, received_at);
    if batch.dropped > 0 {
        warn!("dropped {} events missing playerId/actionType", batch.dropped);
    }

    if batch.events.is_empty() {
        state.metrics.record_batch(events_received, 0);
        return Ok(BatchResult {
            events_received,
            events_skipped: events_received,
            processing_time_ms: elapsed_ms(started),
            ..BatchResult::empty(request_id)
        });
    }

    let classifier = EventClassifier::new(&state.config);
    let accumulator = StatsAccumulator::new(&state.config);
    let scorer = AnomalyScorer::new(&state.config, state.baselines.as_ref().clone());

    // Accumulate statistics for every event; split the batch by tier.
    let mut entities: BTreeMap<EntityKey, BatchEntity> = BTreeMap::new();
    let mut retained: Vec<TelemetryEvent> = Vec::new();
    let mut stats_only: Vec<TelemetryEvent> = Vec::new();

    for event in batch.events {
        let key = EntityKey::new(&event.owner, &event.player_id);
        let entry = match entities.entry(key) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let loaded = load_state(state, vacant.key(), received_at).await;
                vacant.insert(BatchEntity::new(loaded))
            }
        };
        accumulator.apply(entry, &event);

        if classifier.classify(&event).is_stored() {
            retained.push(event);
        } else {
            stats_only.push(event);
        }
    }

    // Score each touched entity once, after all updates.
    let scored_at = current_millis();
    let mut detections: Vec<Detection> = Vec::new();
    let mut flagged: HashSet<EntityKey> = HashSet::new();
    for (key, entry) in entities.iter_mut() {
        let entity_detections = scorer.score_entity(entry, scored_at);
        if entity_detections.is_empty() {
            continue;
        }
        scorer.apply_risk(&mut entry.state, &entity_detections);
        flagged.insert(key.clone());
        detections.extend(entity_detections);
    }

    // A flagged entity's routine events become forensically relevant.
    for event in stats_only {
        if flagged.contains(&EntityKey::new(&event.owner, &event.player_id)) {
            retained.push(event);
        }
    }

    let events_stored = retained.len() as u64;
    let players_updated = entities.len() as u64;
    let detections_raised = detections.len() as u64;

    flush(state, &retained, &entities, &detections, received_at).await;

    state.metrics.record_batch(events_received, events_stored);
    state.metrics.record_detections(detections.len());

    debug!(
        "batch {}: {} received, {} stored, {} players, {} detections",
        request_id, events_received, events_stored, players_updated, detections_raised
    );

    Ok(BatchResult {
        success: true,
        events_received,
        events_stored,
        events_skipped: events_received - events_stored,
        players_updated,
        detections_raised,
        processing_time_ms: elapsed_ms(started),
        request_id,
    })
}

/// Read side of the entity read-modify-write. A failed read degrades to a
/// fresh accumulator rather than blocking the batch.
async fn load_state(state: &AppState, key: &EntityKey, now: i64) -> EntityState {
    match state.state_repo.fetch_state(key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => EntityState::new(&key.owner, &key.player_id, now),
        Err(err) => {
            warn!("failed to read state for {}: {}", key.storage_key(), err);
            state.metrics.record_storage_error();
            EntityState::new(&key.owner, &key.player_id, now)
        }
    }
}

/// Writes retained events, touched entity states, and detections. A failure
/// in any one group never blocks the others.
async fn flush(
    state: &AppState,
    retained: &[TelemetryEvent],
    entities: &BTreeMap<EntityKey, BatchEntity>,
    detections: &[Detection],
    now: i64,
) {
    let attempts = state.config.storage_write_attempts;

    if !retained.is_empty() {
        let ok = write_with_retry("events", attempts, || async move {
            state.event_repo.insert_events(retained).await
        })
        .await;
        if !ok {
            state.metrics.record_storage_error();
        }
    }

    for (key, entry) in entities {
        let ok = write_with_retry("entity state", attempts, || async move {
            state.state_repo.upsert_state(&entry.state, now).await
        })
        .await;
        if !ok {
            warn!("giving up on state write for {}", key.storage_key());
            state.metrics.record_storage_error();
        }
    }

    if !detections.is_empty() {
        let ok = write_with_retry("detections", attempts, || async move {
            state.detection_repo.insert_detections(detections).await
        })
        .await;
        if !ok {
            state.metrics.record_storage_error();
        }
    }
}

async fn write_with_retry<Fut>(label: &str, attempts: u32, mut op: impl FnMut() -> Fut) -> bool
where
    Fut: Future<Output = anyhow::Result<()>>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match op().await {
            Ok(()) => return true,
            Err(err) if attempt < attempts => {
                warn!("{} write failed (attempt {}/{}): {}", label, attempt, attempts, err);
            }
            Err(err) => {
                error!("{} write failed after {} attempts: {}", label, attempts, err);
            }
        }
    }
    false
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use backend_domain::ports::{DetectionRepository, EntityStateRepository, EventRepository};
    use backend_domain::{DetectionRow, RuntimeConfig, TelemetryEventRow};

    use super::*;
    use crate::Metrics;

    #[derive(Default)]
    struct MemoryEventRepo {
        // keyed (owner, player, timestamp, event_id): redelivery overwrites
        rows: Mutex<BTreeMap<(String, String, i64, String), TelemetryEvent>>,
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl EventRepository for MemoryEventRepo {
        async fn ensure_schema(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn insert_events(&self, events: &[TelemetryEvent]) -> anyhow::Result<()> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("simulated storage failure");
            }
            let mut rows = self.rows.lock().unwrap();
            for event in events {
                rows.insert(
                    (
                        event.owner.clone(),
                        event.player_id.clone(),
                        event.timestamp,
                        event.event_id.clone(),
                    ),
                    event.clone(),
                );
            }
            Ok(())
        }

        async fn fetch_player_events(
            &self,
            _key: &EntityKey,
            _limit: usize,
        ) -> anyhow::Result<Vec<TelemetryEventRow>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStateRepo {
        states: Mutex<HashMap<EntityKey, EntityState>>,
    }

    #[async_trait]
    impl EntityStateRepository for MemoryStateRepo {
        async fn fetch_state(&self, key: &EntityKey) -> anyhow::Result<Option<EntityState>> {
            Ok(self.states.lock().unwrap().get(key).cloned())
        }

        async fn upsert_state(&self, state: &EntityState, _now: i64) -> anyhow::Result<()> {
            self.states.lock().unwrap().insert(
                EntityKey::new(&state.owner, &state.player_id),
                state.clone(),
            );
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryDetectionRepo {
        detections: Mutex<Vec<Detection>>,
    }

    #[async_trait]
    impl DetectionRepository for MemoryDetectionRepo {
        async fn insert_detections(&self, detections: &[Detection]) -> anyhow::Result<()> {
            self.detections.lock().unwrap().extend_from_slice(detections);
            Ok(())
        }

        async fn fetch_detections(
            &self,
            _owner: Option<&str>,
            _player: Option<&str>,
            _status: Option<&str>,
            _limit: usize,
        ) -> anyhow::Result<Vec<DetectionRow>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        state: AppState,
        event_repo: Arc<MemoryEventRepo>,
        state_repo: Arc<MemoryStateRepo>,
        detection_repo: Arc<MemoryDetectionRepo>,
    }

    fn harness() -> Harness {
        let event_repo = Arc::new(MemoryEventRepo::default());
        let state_repo = Arc::new(MemoryStateRepo::default());
        let detection_repo = Arc::new(MemoryDetectionRepo::default());
        let state = AppState {
            config: RuntimeConfig::default(),
            event_repo: event_repo.clone(),
            state_repo: state_repo.clone(),
            detection_repo: detection_repo.clone(),
            baselines: Arc::new(Default::default()),
            metrics: Arc::new(Metrics::default()),
        };
        Harness {
            state,
            event_repo,
            state_repo,
            detection_repo,
        }
    }

    fn payload(player_id: &str, action_type: &str, metadata: &[(&str, f64)]) -> RawEventPayload {
        RawEventPayload {
            player_id: Some(player_id.to_string()),
            action_type: Some(action_type.to_string()),
            owner: Some("srv-1".to_string()),
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(
                    metadata
                        .iter()
                        .map(|(k, v)| (k.to_string(), json!(v)))
                        .collect(),
                )
            },
            ..RawEventPayload::default()
        }
    }

    fn keyed(mut payload: RawEventPayload, event_id: &str, timestamp: i64) -> RawEventPayload {
        payload.event_id = Some(event_id.to_string());
        payload.timestamp = Some(timestamp);
        payload
    }

    #[tokio::test]
    async fn empty_batch_yields_zero_counters() {
        let h = harness();
        let result = process_batch(&h.state, Vec::new(), "req-1".to_string())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.events_received, 0);
        assert_eq!(result.events_stored, 0);
        assert_eq!(result.events_skipped, 0);
        assert_eq!(result.players_updated, 0);
        assert_eq!(result.detections_raised, 0);
    }

    #[tokio::test]
    async fn session_boundaries_are_always_stored() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![
                payload("p1", "SESSION_START", &[]),
                payload("p1", "SESSION_END", &[]),
            ],
            "req-2".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(result.events_received, 2);
        assert_eq!(result.events_stored, 2);
        assert_eq!(result.events_skipped, 0);
        assert_eq!(h.event_repo.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn routine_ticks_update_stats_but_store_nothing() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![
                payload("p1", "PLAYER_TICK", &[]),
                payload("p1", "PLAYER_TICK", &[]),
                payload("p1", "PLAYER_TICK", &[]),
            ],
            "req-3".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(result.events_received, 3);
        assert_eq!(result.events_stored, 0);
        assert_eq!(result.events_skipped, 3);
        assert_eq!(result.players_updated, 1);

        let states = h.state_repo.states.lock().unwrap();
        let state = states.get(&EntityKey::new("srv-1", "p1")).expect("state saved");
        assert_eq!(state.event_count, 3);
    }

    #[tokio::test]
    async fn high_accuracy_shot_is_stored() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![payload(
                "p1",
                "WEAPON_FIRED",
                &[("shots", 10.0), ("hits", 9.0), ("headshots", 5.0)],
            )],
            "req-4".to_string(),
        )
        .await
        .unwrap();
        assert!(result.events_stored >= 1);
    }

    #[tokio::test]
    async fn mixed_batch_counts_line_up() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![
                payload("p1", "SESSION_START", &[]),
                payload("p1", "PLAYER_TICK", &[]),
                payload("p1", "PLAYER_TICK", &[]),
                payload("p1", "WEAPON_FIRED", &[("shots", 10.0), ("hits", 3.0)]),
                payload("p1", "WEAPON_FIRED", &[("shots", 10.0), ("hits", 9.0)]),
                payload("p1", "PLAYER_KILLED", &[]),
                payload("p1", "ITEM_LOOTED", &[]),
                payload("p1", "SESSION_END", &[]),
            ],
            "req-5".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(result.events_received, 8);
        assert!(result.events_stored >= 3);
        assert!(result.players_updated >= 1);
        assert_eq!(
            result.events_received,
            result.events_stored + result.events_skipped
        );
    }

    #[tokio::test]
    async fn invalid_payloads_are_skipped_not_fatal() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![
                RawEventPayload::default(),
                payload("p1", "SESSION_START", &[]),
            ],
            "req-6".to_string(),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(result.events_received, 2);
        assert_eq!(result.events_stored, 1);
        assert_eq!(result.events_skipped, 1);
    }

    #[tokio::test]
    async fn redelivered_event_id_stores_one_row() {
        let h = harness();
        let batch = vec![keyed(payload("p1", "SESSION_START", &[]), "evt-dup", 5_000)];
        process_batch(&h.state, batch.clone(), "req-7a".to_string())
            .await
            .unwrap();
        process_batch(&h.state, batch, "req-7b".to_string())
            .await
            .unwrap();
        assert_eq!(h.event_repo.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn players_updated_counts_distinct_entities_once() {
        let h = harness();
        let result = process_batch(
            &h.state,
            vec![
                payload("p1", "PLAYER_TICK", &[]),
                payload("p1", "PLAYER_TICK", &[]),
                payload("p2", "PLAYER_TICK", &[]),
            ],
            "req-8".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(result.players_updated, 2);
    }

    #[tokio::test]
    async fn scorer_stays_quiet_without_history() {
        let h = harness();
        let result = process_batch(
            &h.state,
            // a wild outlier, but the entity has no sample history yet
            vec![payload("p1", "WEAPON_FIRED", &[("shots", 50.0), ("hits", 50.0)])],
            "req-9".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(result.detections_raised, 0);
        assert!(h.detection_repo.detections.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn outlier_against_history_raises_detection_and_risk() {
        let h = harness();

        // seed thirty prior accuracy observations around 0.5
        let mut seeded = EntityState::new("srv-1", "p1", 1_000);
        for i in 0..30 {
            seeded.observe_metric("accuracy", if i % 2 == 0 { 0.45 } else { 0.55 });
        }
        h.state_repo
            .states
            .lock()
            .unwrap()
            .insert(EntityKey::new("srv-1", "p1"), seeded);

        let result = process_batch(
            &h.state,
            vec![payload("p1", "WEAPON_FIRED", &[("shots", 20.0), ("hits", 19.0)])],
            "req-10".to_string(),
        )
        .await
        .unwrap();

        assert!(result.detections_raised >= 1);
        let detections = h.detection_repo.detections.lock().unwrap();
        assert!(detections.iter().any(|d| d.signal == "accuracy" && d.score > 3.0));

        let states = h.state_repo.states.lock().unwrap();
        let updated = states.get(&EntityKey::new("srv-1", "p1")).unwrap();
        assert!(updated.risk_score > 0.0);
    }

    #[tokio::test]
    async fn stats_only_events_promote_when_entity_is_flagged() {
        let h = harness();

        let mut seeded = EntityState::new("srv-1", "p1", 1_000);
        for i in 0..30 {
            seeded.observe_metric("accuracy", if i % 2 == 0 { 0.45 } else { 0.55 });
        }
        h.state_repo
            .states
            .lock()
            .unwrap()
            .insert(EntityKey::new("srv-1", "p1"), seeded);

        // low accuracy: stats-only by classification, but a strong negative
        // z-score flags the entity and promotes the event to storage
        let result = process_batch(
            &h.state,
            vec![payload("p1", "WEAPON_FIRED", &[("shots", 20.0), ("hits", 1.0)])],
            "req-11".to_string(),
        )
        .await
        .unwrap();

        assert!(result.detections_raised >= 1);
        assert_eq!(result.events_stored, 1);
        assert_eq!(h.event_repo.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_does_not_fail_the_batch() {
        let h = harness();
        // exhaust all write attempts
        h.event_repo
            .failures_remaining
            .store(h.state.config.storage_write_attempts, Ordering::SeqCst);

        let result = process_batch(
            &h.state,
            vec![payload("p1", "SESSION_START", &[])],
            "req-12".to_string(),
        )
        .await
        .unwrap();

        assert!(result.success);
        assert_eq!(result.events_stored, 1);
        assert!(h.event_repo.rows.lock().unwrap().is_empty());
        // entity state still written despite the event-table failure
        assert!(h
            .state_repo
            .states
            .lock()
            .unwrap()
            .contains_key(&EntityKey::new("srv-1", "p1")));
    }

    #[tokio::test]
    async fn transient_storage_failure_is_retried() {
        let h = harness();
        h.event_repo.failures_remaining.store(1, Ordering::SeqCst);

        process_batch(
            &h.state,
            vec![payload("p1", "SESSION_START", &[])],
            "req-13".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(h.event_repo.rows.lock().unwrap().len(), 1);
    }
}
