use chrono::NaiveDate;

use crate::database::models::enhancement::{EnhancementDraft, RATIONALE_PLACEHOLDER};
use crate::types::{Beneficiaries, Beneficiary, DesireLevel, ProductArea, RequestType};

/// A valid draft with the given name and default workflow fields
pub fn sample_draft(name: &str) -> EnhancementDraft {
    EnhancementDraft {
        name: name.to_string(),
        description: format!("{} description", name),
        rationale: RATIONALE_PLACEHOLDER.to_string(),
        requestor_name: "Jordan Lee".to_string(),
        request_date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
        stakeholder: None,
        request_type: RequestType::Enhancement,
        product_area: ProductArea::WebPortal,
        desire_level: DesireLevel::ShouldHave,
        effort_score: None,
        difficulty: None,
        who_benefits: Beneficiaries::from(vec![Beneficiary::Customers]),
        document_link: None,
        due_date: None,
        status: Default::default(),
        priority: Default::default(),
        justification: None,
        documentation_updated: false,
        demo_updated: false,
        release_notes_done: false,
    }
}
