// Slack slash-command bridge: request signing and command-to-draft mapping
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::database::models::enhancement::{EnhancementDraft, RATIONALE_PLACEHOLDER};
use crate::types::{Beneficiaries, Beneficiary, DesireLevel, ProductArea, RequestType};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older (or newer) than this are treated as replays
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

const SIGNATURE_VERSION: &str = "v0";
const MAX_NAME_CHARS: usize = 80;

pub const USAGE: &str = "Usage: /enhancement <description of the request>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlackVerifyError {
    #[error("Slack signing secret is not configured")]
    NotConfigured,

    #[error("Missing Slack signature headers")]
    MissingHeaders,

    #[error("Malformed request timestamp")]
    InvalidTimestamp,

    #[error("Request timestamp outside the allowed window")]
    StaleTimestamp,

    #[error("Signature mismatch")]
    SignatureMismatch,
}

#[derive(Clone, Default)]
pub struct SlackVerifier {
    signing_secret: Option<String>,
}

impl SlackVerifier {
    pub fn new(signing_secret: Option<String>) -> Self {
        Self { signing_secret }
    }

    /// `v0=` + hex HMAC-SHA256 of `v0:{timestamp}:{body}`
    pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        format!("{}={}", SIGNATURE_VERSION, hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a request against the configured secret. `now` is Unix seconds.
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SlackVerifyError> {
        let secret = self
            .signing_secret
            .as_deref()
            .ok_or(SlackVerifyError::NotConfigured)?;

        let (signature, timestamp) = match (signature, timestamp) {
            (Some(s), Some(t)) => (s, t),
            _ => return Err(SlackVerifyError::MissingHeaders),
        };

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SlackVerifyError::InvalidTimestamp)?;
        if now.abs_diff(sent_at) > MAX_CLOCK_SKEW_SECS as u64 {
            return Err(SlackVerifyError::StaleTimestamp);
        }

        let expected = Self::sign(secret, timestamp, body);
        if expected.is_empty()
            || expected.len() != signature.len()
            || !bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
        {
            return Err(SlackVerifyError::SignatureMismatch);
        }
        Ok(())
    }
}

/// Fields of a slash-command form post that the bridge uses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlashCommand {
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_name: String,
}

impl SlashCommand {
    /// Parse an `application/x-www-form-urlencoded` body; unknown keys are ignored
    pub fn from_form(body: &[u8]) -> Self {
        let mut command = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "text" => command.text = value.trim().to_string(),
                "user_id" => command.user_id = value.into_owned(),
                "user_name" => command.user_name = value.into_owned(),
                "channel_name" => command.channel_name = value.into_owned(),
                _ => {}
            }
        }
        command
    }
}

/// Map a command to a draft with the bridge's fixed defaults. `None` when
/// the command carried no text.
pub fn draft_from_command(command: &SlashCommand, today: NaiveDate) -> Option<EnhancementDraft> {
    if command.text.is_empty() {
        return None;
    }

    let requestor = if command.user_name.is_empty() {
        command.user_id.clone()
    } else {
        command.user_name.clone()
    };

    Some(EnhancementDraft {
        name: command.text.chars().take(MAX_NAME_CHARS).collect(),
        description: command.text.clone(),
        rationale: RATIONALE_PLACEHOLDER.to_string(),
        requestor_name: if requestor.is_empty() { "Slack user".to_string() } else { requestor },
        request_date: today,
        stakeholder: (!command.channel_name.is_empty()).then(|| format!("#{}", command.channel_name)),
        request_type: RequestType::Enhancement,
        product_area: ProductArea::Other,
        desire_level: DesireLevel::NiceToHave,
        effort_score: None,
        difficulty: None,
        who_benefits: Beneficiaries::from(vec![Beneficiary::InternalStaff]),
        document_link: None,
        due_date: None,
        status: Default::default(),
        priority: Default::default(),
        justification: None,
        documentation_updated: false,
        demo_updated: false,
        release_notes_done: false,
    })
}

/// Reply visible only to the invoking user
pub fn ephemeral(text: impl Into<String>) -> Value {
    json!({ "response_type": "ephemeral", "text": text.into() })
}
