use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::format::EnhancementPayload;
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::database::models::enhancement::Enhancement;
use crate::database::store::EnhancementFilter;
use crate::error::ApiError;
use crate::services::validation::{non_blank, validate_payload};
use crate::types::Status;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Exact workflow status label, e.g. `Under Review`
    pub status: Option<String>,
    /// Substring over name, description and requestor name
    pub search: Option<String>,
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Enhancement request {} not found", id))
}

fn body(payload: Result<Json<EnhancementPayload>, JsonRejection>) -> Result<EnhancementPayload, ApiError> {
    payload
        .map(|Json(p)| p)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

/// GET /api/enhancements - List requests, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Enhancement>>, ApiError> {
    let status = non_blank(query.status.as_deref())
        .map(|s| s.parse::<Status>())
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let filter = EnhancementFilter {
        status,
        search: non_blank(query.search.as_deref()),
    };

    Ok(Json(state.store.list(&filter).await?))
}

/// GET /api/enhancements/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Enhancement>, ApiError> {
    state.store.get(id).await?.map(Json).ok_or_else(|| not_found(id))
}

/// POST /api/enhancements - Validate and store a new request
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<EnhancementPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Enhancement>), ApiError> {
    let draft = validate_payload(&body(payload)?)?;
    let created = state.store.create(draft).await?;

    info!(
        id = created.id,
        request_id = %created.request_id,
        user_id = %user.id,
        "Enhancement request created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/enhancements/:id - Replace every editable field
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<EnhancementPayload>, JsonRejection>,
) -> Result<Json<Enhancement>, ApiError> {
    let draft = validate_payload(&body(payload)?)?;
    let updated = state.store.update(id, draft).await?.ok_or_else(|| not_found(id))?;

    info!(id, user_id = %user.id, status = %updated.status, "Enhancement request updated");
    Ok(Json(updated))
}

/// DELETE /api/enhancements/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete(id).await? {
        return Err(not_found(id));
    }

    info!(id, user_id = %user.id, "Enhancement request deleted");
    Ok(Json(json!({ "deleted": true, "id": id })))
}
