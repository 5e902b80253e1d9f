pub mod import;
pub mod slack;
pub mod validation;

pub use import::{import_csv, ImportError, ImportSummary};
pub use slack::{SlackVerifier, SlashCommand};
pub use validation::validate_payload;
