use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use crate::app::AppState;
use crate::auth::{AuthUser, Factor};
use crate::error::ApiError;

/// Credential check: verifies the bearer token with the identity provider and
/// attaches the resulting `AuthUser` to the request. Every failure is a 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).map_err(|msg| {
        debug!("Credential check failed: {}", msg);
        ApiError::unauthorized(msg)
    })?;

    let user = state.identity.verify_token(&token).await.map_err(|e| {
        warn!(error = %e, "Bearer token rejected");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    debug!(user_id = %user.id, "Credential verified");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Second-factor check: the principal must have at least one verified TOTP
/// factor. Must run after `require_auth`; a missing factor is a 403 tagged
/// `MFA_REQUIRED`, distinct from the credential failure.
pub async fn require_mfa(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before MFA check"))?;

    let factors = state.identity.list_factors(&user).await.map_err(|e| {
        error!(user_id = %user.id, error = %e, "Failed to list MFA factors");
        ApiError::internal_server_error("Failed to verify MFA status")
    })?;

    if !factors.iter().any(Factor::is_verified_totp) {
        warn!(user_id = %user.id, "Request rejected: no verified TOTP factor");
        return Err(ApiError::mfa_required(
            "Multi-factor authentication is required. Enroll an authenticator app to continue.",
        ));
    }

    debug!(user_id = %user.id, "MFA verified");
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
