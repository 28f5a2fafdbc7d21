use async_trait::async_trait;

use crate::entities::{
    Detection,
    DetectionRow,
    EntityState,
    PopulationBaselines,
    TelemetryEvent,
    TelemetryEventRow,
};
use crate::value_objects::EntityKey;

/// Retained-event writes. Keys are (owner#playerId, timestamp#eventId), so
/// redelivered event ids overwrite idempotently.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn insert_events(&self, events: &[TelemetryEvent]) -> anyhow::Result<()>;
    async fn fetch_player_events(
        &self,
        key: &EntityKey,
        limit: usize,
    ) -> anyhow::Result<Vec<TelemetryEventRow>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Entity-state read-modify-write. Concurrent batches for the same entity
/// may race; last write wins and the commutative statistics absorb it.
#[async_trait]
pub trait EntityStateRepository: Send + Sync {
    async fn fetch_state(&self, key: &EntityKey) -> anyhow::Result<Option<EntityState>>;
    async fn upsert_state(&self, state: &EntityState, now: i64) -> anyhow::Result<()>;
}

#[async_trait]
pub trait DetectionRepository: Send + Sync {
    async fn insert_detections(&self, detections: &[Detection]) -> anyhow::Result<()>;
    async fn fetch_detections(
        &self,
        owner: Option<&str>,
        player: Option<&str>,
        status: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<DetectionRow>>;
}

/// Optional population baselines used by the scorer in place of the
/// entity's own history.
#[async_trait]
pub trait BaselineRepository: Send + Sync {
    async fn load_baselines(&self, path: &str) -> anyhow::Result<PopulationBaselines>;
}
