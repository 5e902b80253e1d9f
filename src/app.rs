// Router assembly and shared handler state
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

use crate::auth::IdentityProvider;
use crate::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::database::store::EnhancementStore;
use crate::handlers::{protected, public};
use crate::middleware::{rate_limit, require_auth, require_mfa, RateLimiter};
use crate::services::slack::SlackVerifier;

/// Headroom for multipart framing on top of the file limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// One limiter per route tier
#[derive(Clone)]
pub struct RateLimits {
    pub general: RateLimiter,
    pub auth: RateLimiter,
    pub slack: RateLimiter,
}

impl RateLimits {
    pub fn disabled() -> Self {
        Self {
            general: RateLimiter::disabled("general"),
            auth: RateLimiter::disabled("auth"),
            slack: RateLimiter::disabled("slack"),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let enabled = config.api.enable_rate_limiting;
        Self {
            general: RateLimiter::new("general", config.api.general, enabled),
            auth: RateLimiter::new("auth", config.api.auth, enabled),
            slack: RateLimiter::new("slack", config.api.slack, enabled),
        }
    }

    pub fn retain_recent(&self) {
        for limiter in [&self.general, &self.auth, &self.slack] {
            limiter.retain_recent();
        }
    }

    /// Periodically forget idle client addresses so the keyed state stays bounded
    pub fn spawn_pruning(&self, every: Duration) -> JoinHandle<()> {
        let limits = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limits.retain_recent();
                debug!("Pruned idle rate limit state");
            }
        })
    }
}

/// Everything a handler may need, constructed once in `main`
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EnhancementStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub slack: SlackVerifier,
    pub limits: RateLimits,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn EnhancementStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            slack: SlackVerifier::default(),
            limits: RateLimits::disabled(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_slack_secret(mut self, secret: Option<String>) -> Self {
        self.slack = SlackVerifier::new(secret);
        self
    }

    pub fn with_rate_limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

/// Full API router. Static files and CORS are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(enhancement_routes(&state))
        .merge(mfa_routes(&state))
        .merge(slack_routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Data routes: rate limit, then credential, then second factor
fn enhancement_routes(state: &AppState) -> Router<AppState> {
    use protected::{enhancements, import, workflow};

    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/api/enhancements",
            get(enhancements::list).post(enhancements::create),
        )
        .route(
            "/api/enhancements/import-csv",
            post(import::import_csv).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/enhancements/:id",
            get(enhancements::get)
                .put(enhancements::update)
                .delete(enhancements::delete),
        )
        .route("/api/workflow/stats", get(workflow::stats))
        // route_layer order: last added runs first
        .route_layer(from_fn_with_state(state.clone(), require_mfa))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route_layer(from_fn_with_state(state.limits.general.clone(), rate_limit))
}

/// Second-factor management needs a credential but not a second factor
fn mfa_routes(state: &AppState) -> Router<AppState> {
    use protected::mfa;

    Router::new()
        .route("/api/mfa/status", get(mfa::status))
        .route("/api/mfa/enroll", post(mfa::enroll))
        .route("/api/mfa/verify-enrollment", post(mfa::verify_enrollment))
        .route("/api/mfa/disable", delete(mfa::disable))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route_layer(from_fn_with_state(state.limits.auth.clone(), rate_limit))
}

/// Authenticated by request signature, not bearer token
fn slack_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/slack/new-request", post(public::slack::new_request))
        .route_layer(from_fn_with_state(state.limits.slack.clone(), rate_limit))
}

/// CORS restricted to the configured origins; none configured means no
/// cross-origin access.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
