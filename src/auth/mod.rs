pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub use supabase::SupabaseIdentity;

/// Authenticated principal, attached to the request by the credential check
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Bearer token presented by the client; needed for user-scoped provider calls
    pub access_token: String,
}

/// A registered second factor as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub id: String,
    #[serde(default, alias = "friendly_name")]
    pub friendly_name: Option<String>,
    #[serde(alias = "factor_type")]
    pub factor_type: String,
    pub status: String,
}

impl Factor {
    pub fn is_verified_totp(&self) -> bool {
        self.factor_type == "totp" && self.status == "verified"
    }
}

/// Material returned when a TOTP factor is enrolled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpEnrollment {
    pub factor_id: String,
    pub qr_code: String,
    pub secret: String,
    pub uri: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired token: {0}")]
    InvalidCredential(String),

    /// The provider understood the request and refused it (bad TOTP code, unknown factor)
    #[error("{0}")]
    Rejected(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredential(_) => ApiError::unauthorized("Invalid or expired token"),
            AuthError::Rejected(msg) => ApiError::bad_request(msg),
            AuthError::Provider(msg) => {
                tracing::error!("Identity provider failure: {}", msg);
                ApiError::bad_gateway("Identity provider unavailable")
            }
        }
    }
}

/// External identity provider: credential verification and second-factor management
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and resolve the principal it belongs to
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    async fn list_factors(&self, user: &AuthUser) -> Result<Vec<Factor>, AuthError>;

    async fn enroll_totp(
        &self,
        user: &AuthUser,
        friendly_name: Option<&str>,
    ) -> Result<TotpEnrollment, AuthError>;

    /// Challenge the factor and verify the code, activating the factor
    async fn verify_enrollment(
        &self,
        user: &AuthUser,
        factor_id: &str,
        code: &str,
    ) -> Result<(), AuthError>;

    async fn unenroll(&self, user: &AuthUser, factor_id: &str) -> Result<(), AuthError>;
}
