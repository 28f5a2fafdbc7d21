use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use backend_application::queries::detection_queries;
use backend_application::AppState;
use backend_domain::{DetectionQuery, DetectionRow};

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn list_detections(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DetectionQuery>,
) -> Result<Json<Vec<DetectionRow>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Forbidden);
    }
    let rows = detection_queries::list_detections(&state, query).await?;
    Ok(Json(rows))
}
