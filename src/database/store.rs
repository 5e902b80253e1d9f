use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::enhancement::{Enhancement, EnhancementDraft};
use crate::types::Status;

/// Query options for listing enhancement requests
#[derive(Debug, Clone, Default)]
pub struct EnhancementFilter {
    pub status: Option<Status>,
    /// Case-insensitive substring over name, description and requestor name
    pub search: Option<String>,
}

impl EnhancementFilter {
    pub fn matches(&self, record: &Enhancement) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        match self.search.as_deref() {
            Some(term) => {
                let needle = term.to_lowercase();
                [&record.name, &record.description, &record.requestor_name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Access to the durable enhancement records.
///
/// `create` assigns the store key and the derived request identifier in one
/// step: a record is never observable with a placeholder identifier.
#[async_trait]
pub trait EnhancementStore: Send + Sync {
    /// Newest first
    async fn list(&self, filter: &EnhancementFilter) -> Result<Vec<Enhancement>, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<Enhancement>, DatabaseError>;

    async fn create(&self, draft: EnhancementDraft) -> Result<Enhancement, DatabaseError>;

    /// Replace every draft field of an existing record. `None` when absent.
    async fn update(
        &self,
        id: i64,
        draft: EnhancementDraft,
    ) -> Result<Option<Enhancement>, DatabaseError>;

    /// `true` when a row was removed
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Record counts per status; statuses without records may be omitted
    async fn count_by_status(&self) -> Result<Vec<(Status, i64)>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
