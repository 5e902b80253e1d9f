use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::services::slack::{
    draft_from_command, ephemeral, SlashCommand, SIGNATURE_HEADER, TIMESTAMP_HEADER, USAGE,
};

/// POST /api/slack/new-request - Slash command that files a request
///
/// Slack shows non-200 replies as a generic failure, so every outcome,
/// including a rejected signature, is a 200 with an ephemeral message.
pub async fn new_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Err(e) = state.slack.verify(
        header(SIGNATURE_HEADER),
        header(TIMESTAMP_HEADER),
        &body,
        Utc::now().timestamp(),
    ) {
        warn!(reason = %e, "Slack request rejected");
        return Json(ephemeral("Sorry, this request could not be verified."));
    }

    let command = SlashCommand::from_form(&body);
    let Some(draft) = draft_from_command(&command, Utc::now().date_naive()) else {
        return Json(ephemeral(USAGE));
    };

    match state.store.create(draft).await {
        Ok(created) => {
            info!(
                request_id = %created.request_id,
                slack_user = %command.user_id,
                "Enhancement request created from Slack"
            );
            Json(ephemeral(format!(
                "Created enhancement request {}: {}",
                created.request_id, created.name
            )))
        }
        Err(e) => {
            error!(error = %e, "Failed to store Slack request");
            Json(ephemeral(format!(
                "Sorry, the request could not be saved: {}",
                e.upstream_message()
            )))
        }
    }
}
