pub mod format;

pub use format::{EnhancementPayload, WorkflowStats};
