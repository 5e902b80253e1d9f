// handlers/mod.rs - Handlers grouped by how the caller is authenticated
//
// Public    (no bearer token)       → /, /health, /api/slack/* (request signature)
// Protected (bearer token [+ TOTP]) → /api/enhancements/*, /api/workflow/*, /api/mfa/*

pub mod protected;
pub mod public;
