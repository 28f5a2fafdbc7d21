use tracing::error;

use backend_domain::{DetectionQuery, DetectionRow};

use crate::{AppError, AppState};

pub async fn list_detections(
    state: &AppState,
    query: DetectionQuery,
) -> Result<Vec<DetectionRow>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let status = query.status.map(|s| s.trim().to_uppercase());
    let rows = state
        .detection_repo
        .fetch_detections(
            query.owner.as_deref(),
            query.player.as_deref(),
            status.as_deref(),
            limit,
        )
        .await
        .map_err(|err| {
            error!("failed to fetch detections: {}", err);
            AppError::Internal(err)
        })?;
    Ok(rows)
}
