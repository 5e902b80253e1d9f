pub mod auth;
pub mod rate_limit;

pub use auth::{extract_bearer_token, require_auth, require_mfa};
pub use rate_limit::{rate_limit, RateLimiter};
