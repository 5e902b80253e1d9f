use axum::{extract::State, Json};

use crate::api::format::WorkflowStats;
use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/workflow/stats - Request counts per status
pub async fn stats(State(state): State<AppState>) -> Result<Json<WorkflowStats>, ApiError> {
    let counts = state.store.count_by_status().await?;
    Ok(Json(WorkflowStats::from_counts(&counts)))
}
