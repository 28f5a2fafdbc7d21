use tracing::error;

use backend_domain::value_objects::EntityKey;
use backend_domain::{EntityState, TelemetryEventRow};

use crate::{AppError, AppState};

pub async fn get_entity_state(
    state: &AppState,
    owner: Option<String>,
    player_id: String,
) -> Result<EntityState, AppError> {
    let owner = owner.unwrap_or_else(|| state.config.default_owner.clone());
    let key = EntityKey::new(&owner, &player_id);
    let found = state.state_repo.fetch_state(&key).await.map_err(|err| {
        error!("failed to fetch state for {}: {}", key.storage_key(), err);
        AppError::Internal(err)
    })?;
    found.ok_or(AppError::NotFound)
}

/// Retained events for one player, newest first.
pub async fn list_entity_events(
    state: &AppState,
    owner: Option<String>,
    player_id: String,
    limit: Option<usize>,
) -> Result<Vec<TelemetryEventRow>, AppError> {
    let owner = owner.unwrap_or_else(|| state.config.default_owner.clone());
    let key = EntityKey::new(&owner, &player_id);
    let limit = limit.unwrap_or(100).clamp(1, 500);
    let rows = state
        .event_repo
        .fetch_player_events(&key, limit)
        .await
        .map_err(|err| {
            error!("failed to fetch events for {}: {}", key.storage_key(), err);
            AppError::Internal(err)
        })?;
    Ok(rows)
}
