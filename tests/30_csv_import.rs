mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::{get, multipart_upload, TestApp, MFA_TOKEN, NO_MFA_TOKEN};

const IMPORT: &str = "/api/enhancements/import-csv";

const CSV: &str = "\
Name,Description,Rationale,Requestor Name,Request Date,Stakeholder,Type,Product Area,Desire Level,Effort,Difficulty,Who Benefits,Document Link,Due Date,Priority,Status
Dark mode,Theme toggle,Eye strain,Sam,2024-01-02,Design,Enhancement,Web Portal,Must Have,3,Medium,\"Customers, Internal Staff\",,2024-06-30,High,
PDF export,Export reports,,Kim,25-12-2024,,New Feature,Reporting,Nice to Have,,,Customers,,,,Accepted
Bad row,Unknown type,,Kim,2024-01-02,,Wishlist,Reporting,Nice to Have,,,Customers,,,,
";

#[tokio::test]
async fn imports_rows_and_reports_failures() -> Result<()> {
    let app = TestApp::new();

    let (status, summary) = app
        .send(multipart_upload(IMPORT, MFA_TOKEN, "csvFile", "text/csv", CSV.as_bytes()))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", summary);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["successful"], 2);
    assert_eq!(summary["failed"], 1);
    assert!(summary["errors"][0].as_str().unwrap().starts_with("Row 3: "), "{}", summary);

    let (_, list) = app.send(get("/api/enhancements", Some(MFA_TOKEN))).await?;
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let dark = rows.iter().find(|r| r["name"] == "Dark mode").unwrap();
    assert_eq!(dark["whoBenefits"], "Customers, Internal Staff");
    assert_eq!(dark["priority"], "High");
    assert_eq!(dark["status"], "Submitted");
    assert_eq!(dark["dueDate"], "2024-06-30");

    let pdf = rows.iter().find(|r| r["name"] == "PDF export").unwrap();
    assert_eq!(pdf["requestDate"], "2024-12-25");
    assert_eq!(pdf["rationale"], "Not specified");
    assert_eq!(pdf["status"], "Accepted");
    Ok(())
}

#[tokio::test]
async fn invalid_rows_are_counted_by_position() -> Result<()> {
    let app = TestApp::new();

    let header = CSV.lines().next().unwrap();
    let mut csv = format!("{}\n", header);
    for n in 1..=6 {
        let desire = if n == 2 { "Someday" } else { "Should Have" };
        let effort = if n == 5 { "-1" } else { "2" };
        csv.push_str(&format!(
            "Item {n},Row {n},,Sam,2024-02-01,,Enhancement,API,{desire},{effort},,Partners,,,,\n"
        ));
    }

    let (status, summary) = app
        .send(multipart_upload(IMPORT, MFA_TOKEN, "csvFile", "text/csv", csv.as_bytes()))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", summary);
    assert_eq!(summary["total"], 6);
    assert_eq!(summary["successful"], 4);
    assert_eq!(summary["failed"], 2);
    let errors = summary["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().starts_with("Row 2: "), "{}", summary);
    assert!(errors[1].as_str().unwrap().starts_with("Row 5: "), "{}", summary);
    Ok(())
}

#[tokio::test]
async fn rejects_non_csv_uploads() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .send(multipart_upload(IMPORT, MFA_TOKEN, "csvFile", "application/pdf", b"%PDF-1.4"))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert!(body["error"].as_str().unwrap().contains("Unsupported file type"));
    Ok(())
}

#[tokio::test]
async fn requires_the_expected_field_name() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .send(multipart_upload(IMPORT, MFA_TOKEN, "file", "text/csv", CSV.as_bytes()))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert!(body["error"].as_str().unwrap().contains("csvFile"));
    Ok(())
}

#[tokio::test]
async fn enforces_the_upload_size_limit() -> Result<()> {
    let app = TestApp::with(|state| state.with_max_upload_bytes(64));

    let (status, body) = app
        .send(multipart_upload(IMPORT, MFA_TOKEN, "csvFile", "text/csv", CSV.as_bytes()))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (_, list) = app.send(get("/api/enhancements", Some(MFA_TOKEN))).await?;
    assert_eq!(list.as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn import_is_behind_the_second_factor() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .send(multipart_upload(IMPORT, NO_MFA_TOKEN, "csvFile", "text/csv", CSV.as_bytes()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "MFA_REQUIRED");
    Ok(())
}
