// CSV bulk import
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::database::models::enhancement::{EnhancementDraft, RATIONALE_PLACEHOLDER};
use crate::database::store::EnhancementStore;
use crate::dates::normalize_date;
use crate::error::ApiError;
use crate::services::validation::{non_blank, parse_effort, unquote};
use crate::types::{
    Beneficiaries, DesireLevel, Difficulty, Priority, ProductArea, RequestType, Status,
};

/// Multipart field carrying the file
pub const UPLOAD_FIELD: &str = "csvFile";

pub const CSV_REQUIRED_HEADERS: &[&str] = &[
    "Name",
    "Description",
    "Requestor Name",
    "Request Date",
    "Type",
    "Product Area",
    "Desire Level",
    "Who Benefits",
];

/// Content types accepted for the upload (spreadsheet tools disagree)
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["text/csv", "application/csv", "application/vnd.ms-excel"];

/// Cap on row errors returned to the client
pub const MAX_REPORTED_ERRORS: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("Unsupported file type '{0}'. Upload a CSV file")]
    UnsupportedType(String),

    #[error("File is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Uploaded file is empty")]
    Empty,

    #[error("Could not read CSV: {0}")]
    Unreadable(String),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl ImportSummary {
    fn fail(&mut self, row: usize, message: impl std::fmt::Display) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("Row {}: {}", row, message));
        }
    }
}

/// Reject uploads by declared type and size before any parsing
pub fn check_upload(content_type: Option<&str>, size: usize, max: usize) -> Result<(), ImportError> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_CONTENT_TYPES.contains(&mime.as_str()) {
        return Err(ImportError::UnsupportedType(mime));
    }
    if size > max {
        return Err(ImportError::TooLarge { size, max });
    }
    if size == 0 {
        return Err(ImportError::Empty);
    }
    Ok(())
}

/// Validate one data row (keyed by header) into a draft.
///
/// The error is a single message naming every problem on the row.
pub fn validate_row(row: &HashMap<&str, &str>) -> Result<EnhancementDraft, String> {
    let field = |name: &str| non_blank(row.get(name).copied());

    let missing: Vec<&str> = CSV_REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| field(*h).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }

    let mut problems = Vec::new();

    fn pick<T: std::str::FromStr>(
        problems: &mut Vec<String>,
        header: &str,
        value: Option<String>,
    ) -> Option<T> {
        let raw = value?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                problems.push(format!("Invalid {}: '{}'", header, raw));
                None
            }
        }
    }

    let request_type: Option<RequestType> = pick(&mut problems, "Type", field("Type"));
    let product_area: Option<ProductArea> = pick(&mut problems, "Product Area", field("Product Area"));
    let desire_level: Option<DesireLevel> = pick(&mut problems, "Desire Level", field("Desire Level"));
    let difficulty: Option<Difficulty> = pick(&mut problems, "Difficulty", field("Difficulty"));
    let priority: Option<Priority> = pick(&mut problems, "Priority", field("Priority"));
    let status: Option<Status> = pick(&mut problems, "Status", field("Status"));

    let who_benefits = field("Who Benefits").and_then(|raw| match Beneficiaries::parse(unquote(&raw)) {
        Ok(b) => Some(b),
        Err(invalid) if invalid.is_empty() => {
            problems.push("Who Benefits has no values".to_string());
            None
        }
        Err(invalid) => {
            problems.push(format!("Invalid Who Benefits value(s): {}", invalid.join(", ")));
            None
        }
    });

    let effort_score = match field("Effort") {
        Some(raw) => {
            let parsed = parse_effort(&raw);
            if parsed.is_none() {
                problems.push(format!("Effort must be a non-negative number (got '{}')", raw));
            }
            parsed
        }
        None => None,
    };

    let mut date = |header: &str| match field(header).map(|raw| normalize_date(&raw)) {
        Some(Ok(d)) => Some(d),
        Some(Err(e)) => {
            problems.push(format!("Invalid {}: {}", header, e));
            None
        }
        None => None,
    };
    let request_date = date("Request Date");
    let due_date = date("Due Date");

    if !problems.is_empty() {
        return Err(problems.join("; "));
    }

    match (request_type, product_area, desire_level, who_benefits, request_date) {
        (Some(request_type), Some(product_area), Some(desire_level), Some(who_benefits), Some(request_date)) => {
            Ok(EnhancementDraft {
                name: field("Name").unwrap_or_default(),
                description: field("Description").unwrap_or_default(),
                rationale: field("Rationale").unwrap_or_else(|| RATIONALE_PLACEHOLDER.to_string()),
                requestor_name: field("Requestor Name").unwrap_or_default(),
                request_date,
                stakeholder: field("Stakeholder"),
                request_type,
                product_area,
                desire_level,
                effort_score,
                difficulty,
                who_benefits,
                document_link: field("Document Link"),
                due_date,
                status: status.unwrap_or_default(),
                priority: priority.unwrap_or_default(),
                justification: None,
                documentation_updated: false,
                demo_updated: false,
                release_notes_done: false,
            })
        }
        _ => Err("Row could not be validated".to_string()),
    }
}

/// Parse, validate and insert every row. Rows are independent: a failure is
/// recorded in the summary and the import moves on. Inserts run in file order.
pub async fn import_csv(store: &dyn EnhancementStore, data: &[u8]) -> Result<ImportSummary, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Unreadable(e.to_string()))?
        .clone();

    let missing: Vec<&str> = CSV_REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|have| have == *h))
        .collect();
    if !missing.is_empty() {
        debug!(missing = ?missing, "CSV header row lacks required columns");
    }

    let mut summary = ImportSummary::default();

    for (index, record) in reader.records().enumerate() {
        let row_number = index + 1;
        summary.total += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                summary.fail(row_number, format!("Could not parse row: {}", e));
                continue;
            }
        };

        let row: HashMap<&str, &str> = headers.iter().zip(record.iter()).collect();
        let draft = match validate_row(&row) {
            Ok(d) => d,
            Err(message) => {
                summary.fail(row_number, message);
                continue;
            }
        };

        match store.create(draft).await {
            Ok(created) => {
                summary.successful += 1;
                debug!(row = row_number, request_id = %created.request_id, "Imported row");
            }
            Err(e) => {
                warn!(row = row_number, error = %e, "Failed to store imported row");
                summary.fail(row_number, e.upstream_message());
            }
        }
    }

    info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "CSV import finished"
    );

    Ok(summary)
}
