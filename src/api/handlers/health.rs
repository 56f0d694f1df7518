use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// Health check endpoint that includes cache backend status
pub(crate) async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let cache = state.cache.status().await;
    let chains = state.registry.chains().await.len();

    let health_status = serde_json::json!({
        "status": "ok",
        "cache": cache,
        "chains": chains,
        "timestamp": chrono::Utc::now()
    });

    (StatusCode::OK, Json(health_status))
}
