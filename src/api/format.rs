use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::Status;

/// Create / full-update request body (camelCase wire schema).
///
/// Everything is optional at this layer so validation can name every
/// missing or malformed field at once instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rationale: Option<String>,
    pub requestor_name: Option<String>,
    pub request_date: Option<String>,
    pub stakeholder: Option<String>,
    pub request_type: Option<String>,
    pub product_area: Option<String>,
    pub desire_level: Option<String>,
    /// Number or numeric string
    pub effort_score: Option<Value>,
    pub difficulty: Option<String>,
    pub who_benefits: Option<String>,
    pub document_link: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub justification: Option<String>,
    pub documentation_updated: Option<bool>,
    pub demo_updated: Option<bool>,
    pub release_notes_done: Option<bool>,
}

/// `GET /api/workflow/stats` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub total: i64,
    pub by_status: BTreeMap<&'static str, i64>,
}

impl WorkflowStats {
    /// Every status appears, zero when the store reported no rows for it
    pub fn from_counts(counts: &[(Status, i64)]) -> Self {
        let mut by_status: BTreeMap<&'static str, i64> =
            Status::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for (status, count) in counts {
            *by_status.entry(status.as_str()).or_insert(0) += count;
        }
        Self {
            total: by_status.values().sum(),
            by_status,
        }
    }
}
