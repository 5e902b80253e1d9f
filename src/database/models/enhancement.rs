use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{
    Beneficiaries, DesireLevel, Difficulty, Priority, ProductArea, RequestType, Status,
};

/// Prefix of the human-readable request identifier (`ER-000123`)
pub const REQUEST_ID_PREFIX: &str = "ER";

/// Stored in place of a blank rationale
pub const RATIONALE_PLACEHOLDER: &str = "Not specified";

/// Derive the human-readable identifier from a store-assigned key
pub fn format_request_id(id: i64) -> String {
    format!("{}-{:06}", REQUEST_ID_PREFIX, id)
}

/// Validated field set written by create and full update.
///
/// Produced by request validation, the CSV importer and the Slack bridge;
/// the store never sees unvalidated input.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementDraft {
    pub name: String,
    pub description: String,
    pub rationale: String,
    pub requestor_name: String,
    pub request_date: NaiveDate,
    pub stakeholder: Option<String>,
    pub request_type: RequestType,
    pub product_area: ProductArea,
    pub desire_level: DesireLevel,
    pub effort_score: Option<f64>,
    pub difficulty: Option<Difficulty>,
    pub who_benefits: Beneficiaries,
    pub document_link: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub priority: Priority,
    pub justification: Option<String>,
    pub documentation_updated: bool,
    pub demo_updated: bool,
    pub release_notes_done: bool,
}

/// An enhancement request as returned to API clients (camelCase wire schema)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    pub id: i64,
    pub request_id: String,
    pub name: String,
    pub description: String,
    pub rationale: String,
    pub requestor_name: String,
    pub request_date: NaiveDate,
    pub stakeholder: Option<String>,
    pub request_type: RequestType,
    pub product_area: ProductArea,
    pub desire_level: DesireLevel,
    pub effort_score: Option<f64>,
    pub difficulty: Option<Difficulty>,
    pub who_benefits: Beneficiaries,
    pub document_link: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub priority: Priority,
    pub justification: Option<String>,
    pub documentation_updated: bool,
    pub demo_updated: bool,
    pub release_notes_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enhancement {
    /// Combine a draft with store-owned columns
    pub fn from_draft(
        id: i64,
        draft: EnhancementDraft,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_id: format_request_id(id),
            name: draft.name,
            description: draft.description,
            rationale: draft.rationale,
            requestor_name: draft.requestor_name,
            request_date: draft.request_date,
            stakeholder: draft.stakeholder,
            request_type: draft.request_type,
            product_area: draft.product_area,
            desire_level: draft.desire_level,
            effort_score: draft.effort_score,
            difficulty: draft.difficulty,
            who_benefits: draft.who_benefits,
            document_link: draft.document_link,
            due_date: draft.due_date,
            status: draft.status,
            priority: draft.priority,
            justification: draft.justification,
            documentation_updated: draft.documentation_updated,
            demo_updated: draft.demo_updated,
            release_notes_done: draft.release_notes_done,
            created_at,
            updated_at,
        }
    }
}

/// Raw `enhancements` row (snake_case store schema)
#[derive(Debug, Clone, FromRow)]
pub struct EnhancementRow {
    pub id: i64,
    pub request_id: String,
    pub name: String,
    pub description: String,
    pub rationale: String,
    pub requestor_name: String,
    pub request_date: NaiveDate,
    pub stakeholder: Option<String>,
    pub request_type: String,
    pub product_area: String,
    pub desire_level: String,
    pub effort_score: Option<f64>,
    pub difficulty: Option<String>,
    pub who_benefits: String,
    pub document_link: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub priority: String,
    pub justification: Option<String>,
    pub documentation_updated: bool,
    pub demo_updated: bool,
    pub release_notes_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EnhancementRow> for Enhancement {
    type Error = String;

    fn try_from(row: EnhancementRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::types::UnknownValue| format!("row {}: {}", row.id, e);

        Ok(Self {
            request_type: row.request_type.parse().map_err(corrupt)?,
            product_area: row.product_area.parse().map_err(corrupt)?,
            desire_level: row.desire_level.parse().map_err(corrupt)?,
            difficulty: row.difficulty.as_deref().map(str::parse::<Difficulty>).transpose().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            priority: row.priority.parse().map_err(corrupt)?,
            who_benefits: Beneficiaries::parse(&row.who_benefits).map_err(|invalid| {
                format!("row {}: invalid who_benefits {:?}", row.id, invalid)
            })?,
            id: row.id,
            request_id: row.request_id,
            name: row.name,
            description: row.description,
            rationale: row.rationale,
            requestor_name: row.requestor_name,
            request_date: row.request_date,
            stakeholder: row.stakeholder,
            effort_score: row.effort_score,
            document_link: row.document_link,
            due_date: row.due_date,
            justification: row.justification,
            documentation_updated: row.documentation_updated,
            demo_updated: row.demo_updated,
            release_notes_done: row.release_notes_done,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
