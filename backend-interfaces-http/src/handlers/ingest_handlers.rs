use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;
use uuid::Uuid;

use backend_application::commands::ingest_commands;
use backend_application::AppState;
use backend_domain::BatchResult;

use crate::error::HttpError;
use crate::middleware::{authorize, parse_events};

pub async fn ingest_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<BatchResult>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Forbidden);
    }

    let payloads = parse_events(&headers, &body).map_err(|err| {
        error!("failed to parse ingest body: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    if payloads.len() > state.config.max_batch_events {
        return Err(HttpError::BadRequest(format!(
            "batch of {} events exceeds limit of {}",
            payloads.len(),
            state.config.max_batch_events
        )));
    }

    let request_id = Uuid::new_v4().to_string();
    let result = ingest_commands::process_batch(&state, payloads, request_id).await?;
    Ok(Json(result))
}
