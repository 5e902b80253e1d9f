use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension, Json,
};
use tracing::info;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::import::{self, ImportSummary, UPLOAD_FIELD};

/// POST /api/enhancements/import-csv - Bulk import from a multipart upload
///
/// Row failures do not fail the request; they are counted in the summary.
pub async fn import_csv(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportSummary>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Expected a multipart upload: {}", e.body_text())))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e.body_text())))?;
        upload = Some((content_type, data));
    }

    let (content_type, data) = upload.ok_or_else(|| {
        ApiError::bad_request(format!("No file uploaded (expected field '{}')", UPLOAD_FIELD))
    })?;

    import::check_upload(content_type.as_deref(), data.len(), state.max_upload_bytes)?;

    info!(user_id = %user.id, bytes = data.len(), "CSV import started");
    let summary = import::import_csv(state.store.as_ref(), &data).await?;
    Ok(Json(summary))
}
