use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service description and route index
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Enhancement Request Tracker",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "enhancements": "/api/enhancements[/:id] (token + MFA)",
            "import": "/api/enhancements/import-csv (token + MFA, multipart csvFile)",
            "stats": "/api/workflow/stats (token + MFA)",
            "mfa": "/api/mfa/{status,enroll,verify-enrollment,disable} (token)",
            "slack": "/api/slack/new-request (Slack signature)"
        }
    }))
}

/// GET /health - Liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable",
                    "error": e.upstream_message()
                })),
            )
        }
    }
}
