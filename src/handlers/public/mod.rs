// handlers/public/mod.rs - Handlers that take no bearer token
//
// The Slack bridge authenticates each request by its HMAC signature instead.

pub mod health;
pub mod slack;

pub use health::{health, root};
