//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
    environment: &'static str,
    connections: usize,
    users: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        environment: if state.config().is_production() {
            "production"
        } else {
            "development"
        },
        connections: state.sessions().count().await,
        users: state.auth_store().user_count().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
