use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::auth::{AuthUser, Factor, TotpEnrollment};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MfaStatus {
    pub enabled: bool,
    pub factors: Vec<Factor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub friendly_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEnrollmentRequest {
    pub factor_id: String,
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableRequest {
    pub factor_id: Option<String>,
}

/// GET /api/mfa/status - Enrolled factors for the caller
pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MfaStatus>, ApiError> {
    let factors = state.identity.list_factors(&user).await?;
    Ok(Json(MfaStatus {
        enabled: factors.iter().any(Factor::is_verified_totp),
        factors,
    }))
}

/// POST /api/mfa/enroll - Start TOTP enrollment, returning the QR code and secret
pub async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    request: Option<Json<EnrollRequest>>,
) -> Result<Json<TotpEnrollment>, ApiError> {
    let factors = state.identity.list_factors(&user).await?;
    if factors.iter().any(Factor::is_verified_totp) {
        return Err(ApiError::bad_request("MFA is already enabled for this account"));
    }

    let friendly_name = request.and_then(|Json(r)| r.friendly_name);
    let enrollment = state
        .identity
        .enroll_totp(&user, friendly_name.as_deref())
        .await?;

    info!(user_id = %user.id, factor_id = %enrollment.factor_id, "TOTP enrollment started");
    Ok(Json(enrollment))
}

/// POST /api/mfa/verify-enrollment - Confirm enrollment with a code from the app
pub async fn verify_enrollment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    request: Result<Json<VerifyEnrollmentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = request
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))?;
    let factor_id = request.factor_id.trim();
    let code = request.code.trim();

    if factor_id.is_empty() {
        return Err(ApiError::bad_request("factorId is required"));
    }
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request("code must be a 6-digit number"));
    }

    state.identity.verify_enrollment(&user, factor_id, code).await?;

    info!(user_id = %user.id, factor_id, "TOTP factor verified");
    Ok(Json(json!({ "verified": true, "factorId": factor_id })))
}

/// DELETE /api/mfa/disable - Remove one TOTP factor, or all of them
pub async fn disable(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    request: Option<Json<DisableRequest>>,
) -> Result<Json<Value>, ApiError> {
    let requested = request
        .and_then(|Json(r)| r.factor_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let factors = state.identity.list_factors(&user).await?;
    let targets: Vec<&Factor> = factors
        .iter()
        .filter(|f| f.factor_type == "totp")
        .filter(|f| requested.as_deref().map_or(true, |id| f.id == id))
        .collect();

    if targets.is_empty() {
        return Err(ApiError::not_found(match requested {
            Some(id) => format!("TOTP factor {} not found", id),
            None => "No TOTP factor is enrolled".to_string(),
        }));
    }

    for factor in &targets {
        state.identity.unenroll(&user, &factor.id).await?;
    }

    info!(user_id = %user.id, removed = targets.len(), "TOTP factors removed");
    Ok(Json(json!({ "disabled": true, "removed": targets.len() })))
}
