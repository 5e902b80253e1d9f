use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::enhancement::{Enhancement, EnhancementDraft};
use crate::database::store::{EnhancementFilter, EnhancementStore};
use crate::types::Status;

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, Enhancement>,
}

/// In-process store for local development (`STORE_BACKEND=memory`) and tests.
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnhancementStore for MemoryStore {
    async fn list(&self, filter: &EnhancementFilter) -> Result<Vec<Enhancement>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Enhancement>, DatabaseError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn create(&self, draft: EnhancementDraft) -> Result<Enhancement, DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        let record = Enhancement::from_draft(id, draft, now, now);
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: i64,
        draft: EnhancementDraft,
    ) -> Result<Option<Enhancement>, DatabaseError> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.records.get_mut(&id) else {
            return Ok(None);
        };
        let updated = Enhancement::from_draft(id, draft, existing.created_at, Utc::now());
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }

    async fn count_by_status(&self) -> Result<Vec<(Status, i64)>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut counts: BTreeMap<&'static str, (Status, i64)> = BTreeMap::new();
        for record in inner.records.values() {
            counts.entry(record.status.as_str()).or_insert((record.status, 0)).1 += 1;
        }
        Ok(counts.into_values().collect())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_draft;

    #[tokio::test]
    async fn create_assigns_sequential_keys_and_identifiers() {
        let store = MemoryStore::new();
        let first = store.create(sample_draft("first")).await.unwrap();
        let second = store.create(sample_draft("second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.request_id, "ER-000001");
        assert_eq!(second.request_id, "ER-000002");
    }

    #[tokio::test]
    async fn update_keeps_identifier_and_creation_time() {
        let store = MemoryStore::new();
        let created = store.create(sample_draft("before")).await.unwrap();

        let mut draft = sample_draft("after");
        draft.status = Status::Accepted;
        let updated = store.update(created.id, draft).await.unwrap().unwrap();

        assert_eq!(updated.request_id, created.request_id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.name, "after");
        assert_eq!(updated.status, Status::Accepted);
        assert!(store.update(999, sample_draft("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let store = MemoryStore::new();
        store.create(sample_draft("Dark mode")).await.unwrap();
        let mut draft = sample_draft("Export to PDF");
        draft.status = Status::Denied;
        store.create(draft).await.unwrap();

        let all = store.list(&EnhancementFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["Export to PDF", "Dark mode"]);

        let denied = store
            .list(&EnhancementFilter { status: Some(Status::Denied), search: None })
            .await
            .unwrap();
        assert_eq!(denied.len(), 1);

        let search = store
            .list(&EnhancementFilter { status: None, search: Some("DARK".into()) })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Dark mode");
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = MemoryStore::new();
        let created = store.create(sample_draft("gone")).await.unwrap();
        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_by_status() {
        let store = MemoryStore::new();
        store.create(sample_draft("a")).await.unwrap();
        store.create(sample_draft("b")).await.unwrap();
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts, vec![(Status::Submitted, 2)]);
    }
}
