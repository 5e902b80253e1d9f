use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::enhancement::{
    format_request_id, Enhancement, EnhancementDraft, EnhancementRow,
};
use crate::database::store::{EnhancementFilter, EnhancementStore};
use crate::types::Status;

const TABLE: &str = "enhancements";

/// Postgres-backed store over the `enhancements` table
#[derive(Clone)]
pub struct EnhancementRepository {
    pool: PgPool,
}

impl EnhancementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_record(row: EnhancementRow) -> Result<Enhancement, DatabaseError> {
        Enhancement::try_from(row).map_err(DatabaseError::CorruptRecord)
    }
}

/// Escape LIKE wildcards so user search terms match literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl EnhancementStore for EnhancementRepository {
    async fn list(&self, filter: &EnhancementFilter) -> Result<Vec<Enhancement>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {} WHERE TRUE", TABLE));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR requestor_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<EnhancementRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::into_record).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<Enhancement>, DatabaseError> {
        let row = sqlx::query_as::<_, EnhancementRow>(&format!("SELECT * FROM {} WHERE id = $1", TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::into_record).transpose()
    }

    async fn create(&self, draft: EnhancementDraft) -> Result<Enhancement, DatabaseError> {
        // Reserve the key first so the row is written once, already carrying
        // its final request identifier. A failed insert only burns a sequence
        // value.
        let id: i64 = sqlx::query_scalar(&format!(
            "SELECT nextval(pg_get_serial_sequence('{}', 'id'))",
            TABLE
        ))
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            INSERT INTO {} (
                id, request_id, name, description, rationale, requestor_name,
                request_date, stakeholder, request_type, product_area, desire_level,
                effort_score, difficulty, who_benefits, document_link, due_date,
                status, priority, justification, documentation_updated,
                demo_updated, release_notes_done
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
            TABLE
        );

        let row = sqlx::query_as::<_, EnhancementRow>(&sql)
            .bind(id)
            .bind(format_request_id(id))
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.rationale)
            .bind(&draft.requestor_name)
            .bind(draft.request_date)
            .bind(&draft.stakeholder)
            .bind(draft.request_type.as_str())
            .bind(draft.product_area.as_str())
            .bind(draft.desire_level.as_str())
            .bind(draft.effort_score)
            .bind(draft.difficulty.map(|d| d.as_str()))
            .bind(draft.who_benefits.to_string())
            .bind(&draft.document_link)
            .bind(draft.due_date)
            .bind(draft.status.as_str())
            .bind(draft.priority.as_str())
            .bind(&draft.justification)
            .bind(draft.documentation_updated)
            .bind(draft.demo_updated)
            .bind(draft.release_notes_done)
            .fetch_one(&self.pool)
            .await?;

        Self::into_record(row)
    }

    async fn update(
        &self,
        id: i64,
        draft: EnhancementDraft,
    ) -> Result<Option<Enhancement>, DatabaseError> {
        // request_id is immutable after creation
        let sql = format!(
            r#"
            UPDATE {} SET
                name = $2, description = $3, rationale = $4, requestor_name = $5,
                request_date = $6, stakeholder = $7, request_type = $8,
                product_area = $9, desire_level = $10, effort_score = $11,
                difficulty = $12, who_benefits = $13, document_link = $14,
                due_date = $15, status = $16, priority = $17, justification = $18,
                documentation_updated = $19, demo_updated = $20,
                release_notes_done = $21, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
            TABLE
        );

        let row = sqlx::query_as::<_, EnhancementRow>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.rationale)
            .bind(&draft.requestor_name)
            .bind(draft.request_date)
            .bind(&draft.stakeholder)
            .bind(draft.request_type.as_str())
            .bind(draft.product_area.as_str())
            .bind(draft.desire_level.as_str())
            .bind(draft.effort_score)
            .bind(draft.difficulty.map(|d| d.as_str()))
            .bind(draft.who_benefits.to_string())
            .bind(&draft.document_link)
            .bind(draft.due_date)
            .bind(draft.status.as_str())
            .bind(draft.priority.as_str())
            .bind(&draft.justification)
            .bind(draft.documentation_updated)
            .bind(draft.demo_updated)
            .bind(draft.release_notes_done)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::into_record).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<Vec<(Status, i64)>, DatabaseError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT status, COUNT(*) AS count FROM {} GROUP BY status",
            TABLE
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| {
                status
                    .parse::<Status>()
                    .map(|s| (s, count))
                    .map_err(|e| DatabaseError::CorruptRecord(e.to_string()))
            })
            .collect()
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dark mode"), "%dark mode%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("snake_case"), "%snake\\_case%");
    }
}
