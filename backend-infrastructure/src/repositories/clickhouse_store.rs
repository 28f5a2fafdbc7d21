use anyhow::Result;
use async_trait::async_trait;
use clickhouse::Client;

use backend_domain::ports::{DetectionRepository, EntityStateRepository, EventRepository};
use backend_domain::value_objects::EntityKey;
use backend_domain::{
    Detection,
    DetectionRow,
    EntityState,
    EntityStateRow,
    TelemetryEvent,
    TelemetryEventRow,
};

#[derive(Clone)]
pub struct ClickhouseRepo {
    client: Client,
    database: String,
    event_ttl_days: u32,
}

impl ClickhouseRepo {
    pub fn new(client: Client, database: String, event_ttl_days: u32) -> Self {
        Self {
            client,
            database,
            event_ttl_days,
        }
    }

    pub async fn create_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        // ORDER BY (owner, player_id, event_time, event_id) is the
        // (owner#playerId, timestamp#eventId) composite key; ReplacingMergeTree
        // collapses redelivered event ids to one row.
        let create_events = format!(
            r#"
CREATE TABLE IF NOT EXISTS telemetry_events (
    event_time DateTime64(3),
    event_id String,
    owner String,
    player_id String,
    action_type String,
    session_id String,
    metadata_json String
) ENGINE = ReplacingMergeTree
PARTITION BY toDate(event_time)
ORDER BY (owner, player_id, event_time, event_id)
TTL toDateTime(event_time) + INTERVAL {} DAY
"#,
            self.event_ttl_days
        );
        self.client.query(&create_events).execute().await?;

        // Latest write wins per (owner, player_id); the commutative moments
        // keep concurrent-batch races within approximation error.
        let create_state = r#"
CREATE TABLE IF NOT EXISTS entity_state (
    owner String,
    player_id String,
    first_seen Int64,
    last_seen Int64,
    event_count UInt64,
    total_shots UInt64,
    total_hits UInt64,
    total_headshots UInt64,
    total_kills UInt64,
    risk_score Float64,
    status String,
    metrics_json String,
    updated_at DateTime64(3)
) ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (owner, player_id)
"#;
        self.client.query(create_state).execute().await?;

        let create_detections = format!(
            r#"
CREATE TABLE IF NOT EXISTS detections (
    created_at DateTime64(3),
    detection_id String,
    owner String,
    player_id String,
    signal String,
    score Float64,
    threshold Float64,
    source_event_id String,
    explanation String,
    status String
) ENGINE = MergeTree
PARTITION BY toDate(created_at)
ORDER BY (owner, player_id, created_at, detection_id)
TTL toDateTime(created_at) + INTERVAL {} DAY
"#,
            self.event_ttl_days
        );
        self.client.query(&create_detections).execute().await?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for ClickhouseRepo {
    async fn ensure_schema(&self) -> Result<()> {
        self.create_schema().await
    }

    async fn insert_events(&self, events: &[TelemetryEvent]) -> Result<()> {
        let mut insert = self.client.insert("telemetry_events")?;
        for event in events {
            insert.write(&TelemetryEventRow::from(event)).await?;
        }
        insert.end().await?;
        Ok(())
    }

    async fn fetch_player_events(
        &self,
        key: &EntityKey,
        limit: usize,
    ) -> Result<Vec<TelemetryEventRow>> {
        let rows = self
            .client
            .query(
                "SELECT event_time, event_id, owner, player_id, action_type, session_id, metadata_json \
                 FROM telemetry_events FINAL \
                 WHERE owner = ? AND player_id = ? \
                 ORDER BY event_time DESC LIMIT ?",
            )
            .bind(&key.owner)
            .bind(&key.player_id)
            .bind(limit as u64)
            .fetch_all::<TelemetryEventRow>()
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStateRepository for ClickhouseRepo {
    async fn fetch_state(&self, key: &EntityKey) -> Result<Option<EntityState>> {
        let mut rows = self
            .client
            .query(
                "SELECT owner, player_id, first_seen, last_seen, event_count, \
                        total_shots, total_hits, total_headshots, total_kills, \
                        risk_score, status, metrics_json, updated_at \
                 FROM entity_state FINAL \
                 WHERE owner = ? AND player_id = ? LIMIT 1",
            )
            .bind(&key.owner)
            .bind(&key.player_id)
            .fetch_all::<EntityStateRow>()
            .await?;
        Ok(rows.pop().map(EntityStateRow::into_state))
    }

    async fn upsert_state(&self, state: &EntityState, now: i64) -> Result<()> {
        let mut insert = self.client.insert("entity_state")?;
        insert.write(&EntityStateRow::from_state(state, now)).await?;
        insert.end().await?;
        Ok(())
    }
}

#[async_trait]
impl DetectionRepository for ClickhouseRepo {
    async fn insert_detections(&self, detections: &[Detection]) -> Result<()> {
        let mut insert = self.client.insert("detections")?;
        for detection in detections {
            insert.write(&DetectionRow::from(detection)).await?;
        }
        insert.end().await?;
        Ok(())
    }

    async fn fetch_detections(
        &self,
        owner: Option<&str>,
        player: Option<&str>,
        status: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DetectionRow>> {
        let mut sql = String::from(
            "SELECT created_at, detection_id, owner, player_id, signal, score, \
                    threshold, source_event_id, explanation, status \
             FROM detections WHERE 1 = 1",
        );
        if owner.is_some() {
            sql.push_str(" AND owner = ?");
        }
        if player.is_some() {
            sql.push_str(" AND player_id = ?");
        }
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = self.client.query(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner);
        }
        if let Some(player) = player {
            query = query.bind(player);
        }
        if let Some(status) = status {
            query = query.bind(status);
        }
        let rows = query
            .bind(limit as u64)
            .fetch_all::<DetectionRow>()
            .await?;
        Ok(rows)
    }
}
