#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use enhancement_tracker::{
    app,
    auth::{AuthError, AuthUser, Factor, IdentityProvider, TotpEnrollment},
    database::{
        DatabaseError, Enhancement, EnhancementDraft, EnhancementFilter, EnhancementStore,
        MemoryStore,
    },
    types::Status,
    AppState,
};

/// Token of a user with a verified TOTP factor
pub const MFA_TOKEN: &str = "token-mfa";
/// Token of a user with no second factor
pub const NO_MFA_TOKEN: &str = "token-no-mfa";
/// Token whose factor lookup fails at the provider
pub const BROKEN_FACTORS_TOKEN: &str = "token-broken-factors";

/// Code the fake provider accepts when verifying an enrollment
pub const VALID_TOTP_CODE: &str = "123456";

pub fn user_id(token: &str) -> Option<Uuid> {
    match token {
        MFA_TOKEN => Some(Uuid::from_u128(1)),
        NO_MFA_TOKEN => Some(Uuid::from_u128(2)),
        BROKEN_FACTORS_TOKEN => Some(Uuid::from_u128(3)),
        _ => None,
    }
}

fn factor(id: &str, status: &str) -> Factor {
    Factor {
        id: id.to_string(),
        friendly_name: None,
        factor_type: "totp".to_string(),
        status: status.to_string(),
    }
}

/// In-process identity provider keyed by fixed tokens
pub struct FakeIdentity {
    factors: Mutex<HashMap<Uuid, Vec<Factor>>>,
    next_factor: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Self {
        let mut factors = HashMap::new();
        if let Some(id) = user_id(MFA_TOKEN) {
            factors.insert(id, vec![factor("factor-verified", "verified")]);
        }
        Self {
            factors: Mutex::new(factors),
            next_factor: AtomicUsize::new(1),
        }
    }

    pub fn factors_of(&self, token: &str) -> Vec<Factor> {
        let id = user_id(token).unwrap_or_default();
        self.factors.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let id = user_id(token)
            .ok_or_else(|| AuthError::InvalidCredential("unknown token".to_string()))?;
        Ok(AuthUser {
            id,
            email: Some(format!("{}@example.com", token)),
            access_token: token.to_string(),
        })
    }

    async fn list_factors(&self, user: &AuthUser) -> Result<Vec<Factor>, AuthError> {
        if user.access_token == BROKEN_FACTORS_TOKEN {
            return Err(AuthError::Provider("factor service down".to_string()));
        }
        Ok(self.factors.lock().unwrap().get(&user.id).cloned().unwrap_or_default())
    }

    async fn enroll_totp(
        &self,
        user: &AuthUser,
        friendly_name: Option<&str>,
    ) -> Result<TotpEnrollment, AuthError> {
        let n = self.next_factor.fetch_add(1, Ordering::SeqCst);
        let id = format!("factor-{}", n);
        let mut new_factor = factor(&id, "unverified");
        new_factor.friendly_name = friendly_name.map(str::to_string);
        self.factors.lock().unwrap().entry(user.id).or_default().push(new_factor);

        Ok(TotpEnrollment {
            factor_id: id,
            qr_code: "data:image/svg+xml;utf-8,<svg/>".to_string(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            uri: "otpauth://totp/tracker?secret=JBSWY3DPEHPK3PXP".to_string(),
        })
    }

    async fn verify_enrollment(
        &self,
        user: &AuthUser,
        factor_id: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let mut all = self.factors.lock().unwrap();
        let found = all
            .get_mut(&user.id)
            .and_then(|list| list.iter_mut().find(|f| f.id == factor_id))
            .ok_or_else(|| AuthError::Rejected("Factor not found".to_string()))?;
        if code != VALID_TOTP_CODE {
            return Err(AuthError::Rejected("Invalid TOTP code".to_string()));
        }
        found.status = "verified".to_string();
        Ok(())
    }

    async fn unenroll(&self, user: &AuthUser, factor_id: &str) -> Result<(), AuthError> {
        let mut all = self.factors.lock().unwrap();
        let list = all.entry(user.id).or_default();
        let before = list.len();
        list.retain(|f| f.id != factor_id);
        if list.len() == before {
            return Err(AuthError::Rejected("Factor not found".to_string()));
        }
        Ok(())
    }
}

/// Store whose every operation fails like an unreachable database
pub struct FailingStore;

fn down() -> DatabaseError {
    DatabaseError::QueryError("connection refused".to_string())
}

#[async_trait]
impl EnhancementStore for FailingStore {
    async fn list(&self, _: &EnhancementFilter) -> Result<Vec<Enhancement>, DatabaseError> {
        Err(down())
    }
    async fn get(&self, _: i64) -> Result<Option<Enhancement>, DatabaseError> {
        Err(down())
    }
    async fn create(&self, _: EnhancementDraft) -> Result<Enhancement, DatabaseError> {
        Err(down())
    }
    async fn update(&self, _: i64, _: EnhancementDraft) -> Result<Option<Enhancement>, DatabaseError> {
        Err(down())
    }
    async fn delete(&self, _: i64) -> Result<bool, DatabaseError> {
        Err(down())
    }
    async fn count_by_status(&self) -> Result<Vec<(Status, i64)>, DatabaseError> {
        Err(down())
    }
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Err(down())
    }
}

/// Route server logs through the test harness; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Router over a memory store and the fake identity provider
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentity>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(|state| state)
    }

    /// Build with a customized state (rate limits, Slack secret, upload cap)
    pub fn with(customize: impl FnOnce(AppState) -> AppState) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(FakeIdentity::new());
        let state = customize(AppState::new(store.clone(), identity.clone()));
        Self {
            router: app(state),
            store,
            identity,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        send(&self.router, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, body))
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    request(method, uri, token, Some(body))
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

/// A complete, valid create body
pub fn valid_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "description": format!("{} description", name),
        "requestorName": "Jordan Lee",
        "requestDate": "2024-12-25",
        "requestType": "Enhancement",
        "productArea": "Web Portal",
        "desireLevel": "Should Have",
        "whoBenefits": "Customers"
    })
}

/// Multipart upload with a single file part
pub fn multipart_upload(
    uri: &str,
    token: &str,
    field: &str,
    content_type: &str,
    contents: &[u8],
) -> Request<Body> {
    const BOUNDARY: &str = "----tracker-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"requests.csv\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
