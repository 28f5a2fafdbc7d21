use axum::Router;

use backend_application::AppState;

use crate::handlers::{detect_handlers, ingest_handlers, ops_handlers, query_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", axum::routing::post(ingest_handlers::ingest_events))
        .route(
            "/detections",
            axum::routing::get(detect_handlers::list_detections),
        )
        .route(
            "/players/:player_id",
            axum::routing::get(query_handlers::get_player_state),
        )
        .route(
            "/players/:player_id/events",
            axum::routing::get(query_handlers::list_player_events),
        )
        .route("/health", axum::routing::get(ops_handlers::health_live))
        .route(
            "/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/metrics",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
