use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use backend_application::queries::entity_queries;
use backend_application::AppState;
use backend_domain::{EntityState, TelemetryEventRow};

use crate::error::HttpError;
use crate::middleware::authorize;

#[derive(serde::Deserialize)]
pub struct PlayerQuery {
    pub owner: Option<String>,
    pub limit: Option<usize>,
}

pub async fn get_player_state(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<EntityState>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Forbidden);
    }
    let found = entity_queries::get_entity_state(&state, query.owner, player_id).await?;
    Ok(Json(found))
}

pub async fn list_player_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<Vec<TelemetryEventRow>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Forbidden);
    }
    let rows =
        entity_queries::list_entity_events(&state, query.owner, player_id, query.limit).await?;
    Ok(Json(rows))
}
