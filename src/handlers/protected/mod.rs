// handlers/protected/mod.rs - Handlers behind the identity gate
//
// Every route here runs after `require_auth`, so an `AuthUser` extension is
// present. Data routes additionally run after `require_mfa`; the MFA
// management routes do not, so a user can enroll a first factor.

pub mod enhancements;
pub mod import;
pub mod mfa;
pub mod workflow;
