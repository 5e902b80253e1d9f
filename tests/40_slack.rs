mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;

use common::{get, TestApp, MFA_TOKEN};
use enhancement_tracker::services::slack::{SlackVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

const SECRET: &str = "slack-signing-secret";

fn slack_request(body: &str, timestamp: i64, secret: &str) -> Request<Body> {
    let ts = timestamp.to_string();
    let signature = SlackVerifier::sign(secret, &ts, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/api/slack/new-request")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, ts)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn app() -> TestApp {
    TestApp::with(|state| state.with_slack_secret(Some(SECRET.to_string())))
}

#[tokio::test]
async fn signed_command_creates_a_request() -> Result<()> {
    let app = app();
    let body = "command=%2Fenhancement&text=Add+SSO+login&user_id=U42&user_name=sam&channel_name=product";

    let (status, reply) = app.send(slack_request(body, Utc::now().timestamp(), SECRET)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response_type"], "ephemeral");
    assert!(reply["text"].as_str().unwrap().contains("ER-000001"), "{}", reply);

    let (_, list) = app.send(get("/api/enhancements", Some(MFA_TOKEN))).await?;
    let created = &list[0];
    assert_eq!(created["name"], "Add SSO login");
    assert_eq!(created["requestorName"], "sam");
    assert_eq!(created["stakeholder"], "#product");
    assert_eq!(created["whoBenefits"], "Internal Staff");
    assert_eq!(created["requestDate"], Utc::now().date_naive().to_string());
    Ok(())
}

#[tokio::test]
async fn bad_signatures_are_refused_with_200() -> Result<()> {
    let app = app();
    let body = "text=Sneaky&user_name=mallory";

    let (status, reply) = app.send(slack_request(body, Utc::now().timestamp(), "wrong-secret")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response_type"], "ephemeral");
    assert!(reply["text"].as_str().unwrap().contains("could not be verified"));

    // replayed request outside the five minute window
    let (status, _) = app.send(slack_request(body, Utc::now().timestamp() - 600, SECRET)).await?;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.send(get("/api/enhancements", Some(MFA_TOKEN))).await?;
    assert_eq!(list.as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn unconfigured_secret_refuses_everything() -> Result<()> {
    let app = TestApp::new();

    let (status, reply) = app
        .send(slack_request("text=hello", Utc::now().timestamp(), SECRET))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["text"].as_str().unwrap().contains("could not be verified"));
    Ok(())
}

#[tokio::test]
async fn empty_text_gets_usage_help() -> Result<()> {
    let app = app();

    let (status, reply) = app
        .send(slack_request("text=&user_name=sam", Utc::now().timestamp(), SECRET))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["text"].as_str().unwrap().starts_with("Usage:"), "{}", reply);
    Ok(())
}
