// Request validation shared by the JSON API and the CSV importer
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::api::format::EnhancementPayload;
use crate::database::models::enhancement::{EnhancementDraft, RATIONALE_PLACEHOLDER};
use crate::dates::normalize_date;
use crate::error::ApiError;
use crate::types::{
    Beneficiaries, Beneficiary, DesireLevel, Difficulty, Priority, ProductArea, RequestType,
    Status,
};

/// Fields a JSON create/update body must carry (camelCase wire names)
pub const JSON_REQUIRED_FIELDS: &[&str] = &[
    "name",
    "description",
    "requestorName",
    "requestDate",
    "requestType",
    "productArea",
    "desireLevel",
    "whoBenefits",
];

/// Trimmed, non-empty text or `None`
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse an effort estimate: a finite, non-negative decimal.
pub fn parse_effort(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// "Allowed: a, b, c" suffix for value-set errors
pub fn allowed_values<T: Copy>(all: &[T], label: fn(&T) -> &'static str) -> String {
    all.iter().map(label).collect::<Vec<_>>().join(", ")
}

/// Strip one layer of surrounding double quotes (spreadsheet exports quote
/// multi-select cells twice)
pub fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}

/// Collects per-field messages while a body is validated
#[derive(Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn required(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = non_blank(value);
        if value.is_none() {
            self.add(field, "This field is required");
        }
        value
    }

    fn choice<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        all: &[T],
        label: fn(&T) -> &'static str,
    ) -> Option<T>
    where
        T: FromStr + Copy,
    {
        let raw = non_blank(value)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.add(
                    field,
                    format!("Invalid value '{}'. Allowed: {}", raw, allowed_values(all, label)),
                );
                None
            }
        }
    }
}

/// Validate a JSON body into a draft. Every problem is reported at once in
/// the error's `details` map, keyed by wire field name.
pub fn validate_payload(payload: &EnhancementPayload) -> Result<EnhancementDraft, ApiError> {
    let mut errors = FieldErrors::default();

    let name = errors.required("name", payload.name.as_deref());
    let description = errors.required("description", payload.description.as_deref());
    let requestor_name = errors.required("requestorName", payload.requestor_name.as_deref());
    let request_date_raw = errors.required("requestDate", payload.request_date.as_deref());
    errors.required("requestType", payload.request_type.as_deref());
    errors.required("productArea", payload.product_area.as_deref());
    errors.required("desireLevel", payload.desire_level.as_deref());
    let who_benefits_raw = errors.required("whoBenefits", payload.who_benefits.as_deref());

    let request_type = errors.choice(
        "requestType",
        payload.request_type.as_deref(),
        RequestType::ALL,
        RequestType::as_str,
    );
    let product_area = errors.choice(
        "productArea",
        payload.product_area.as_deref(),
        ProductArea::ALL,
        ProductArea::as_str,
    );
    let desire_level = errors.choice(
        "desireLevel",
        payload.desire_level.as_deref(),
        DesireLevel::ALL,
        DesireLevel::as_str,
    );
    let difficulty = errors.choice(
        "difficulty",
        payload.difficulty.as_deref(),
        Difficulty::ALL,
        Difficulty::as_str,
    );
    let status = errors.choice("status", payload.status.as_deref(), Status::ALL, Status::as_str);
    let priority = errors.choice(
        "priority",
        payload.priority.as_deref(),
        Priority::ALL,
        Priority::as_str,
    );

    let who_benefits = who_benefits_raw.and_then(|raw| match Beneficiaries::parse(&raw) {
        Ok(b) => Some(b),
        Err(invalid) if invalid.is_empty() => {
            errors.add("whoBenefits", "At least one beneficiary is required");
            None
        }
        Err(invalid) => {
            errors.add(
                "whoBenefits",
                format!(
                    "Invalid value(s): {}. Allowed: {}",
                    invalid.join(", "),
                    allowed_values(Beneficiary::ALL, Beneficiary::as_str)
                ),
            );
            None
        }
    });

    let effort_score = match &payload.effort_score {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::Number(n)) => {
            let parsed = n.as_f64().filter(|v| v.is_finite() && *v >= 0.0);
            if parsed.is_none() {
                errors.add("effortScore", "Must be a non-negative number");
            }
            parsed
        }
        Some(Value::String(s)) => {
            let parsed = parse_effort(s);
            if parsed.is_none() {
                errors.add("effortScore", "Must be a non-negative number");
            }
            parsed
        }
        Some(_) => {
            errors.add("effortScore", "Must be a non-negative number");
            None
        }
    };

    let request_date = request_date_raw.and_then(|raw| match normalize_date(&raw) {
        Ok(d) => Some(d),
        Err(e) => {
            errors.add("requestDate", e.to_string());
            None
        }
    });
    let due_date = match non_blank(payload.due_date.as_deref()) {
        Some(raw) => match normalize_date(&raw) {
            Ok(d) => Some(d),
            Err(e) => {
                errors.add("dueDate", e.to_string());
                None
            }
        },
        None => None,
    };

    if !errors.0.is_empty() {
        return Err(ApiError::validation_error("Validation failed", Some(errors.0)));
    }

    match (
        name,
        description,
        requestor_name,
        request_date,
        request_type,
        product_area,
        desire_level,
        who_benefits,
    ) {
        (
            Some(name),
            Some(description),
            Some(requestor_name),
            Some(request_date),
            Some(request_type),
            Some(product_area),
            Some(desire_level),
            Some(who_benefits),
        ) => Ok(EnhancementDraft {
            name,
            description,
            rationale: non_blank(payload.rationale.as_deref())
                .unwrap_or_else(|| RATIONALE_PLACEHOLDER.to_string()),
            requestor_name,
            request_date,
            stakeholder: non_blank(payload.stakeholder.as_deref()),
            request_type,
            product_area,
            desire_level,
            effort_score,
            difficulty,
            who_benefits,
            document_link: non_blank(payload.document_link.as_deref()),
            due_date,
            status: status.unwrap_or_default(),
            priority: priority.unwrap_or_default(),
            justification: non_blank(payload.justification.as_deref()),
            documentation_updated: payload.documentation_updated.unwrap_or(false),
            demo_updated: payload.demo_updated.unwrap_or(false),
            release_notes_done: payload.release_notes_done.unwrap_or(false),
        }),
        _ => Err(ApiError::validation_error("Validation failed", None)),
    }
}
