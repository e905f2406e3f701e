mod common;

use anyhow::Result;
use common::TestApp;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

const CSV_HEADER: &str =
    "id,name,email,phone,company,status,source,notes,ownerId,createdAt,updatedAt\r\n";

#[tokio::test]
async fn empty_csv_export_is_header_only() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/leads/export").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()[header::CONTENT_TYPE]
        .to_str()?
        .starts_with("text/csv"));

    let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str()?.to_string();
    assert!(disposition.starts_with("attachment; filename=\"leads-"));
    assert!(disposition.ends_with(".csv\""));

    assert_eq!(res.text().await?, CSV_HEADER);
    Ok(())
}

#[tokio::test]
async fn empty_json_export_is_empty_array() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/leads/export?format=json").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(res.text().await?, "[]");
    Ok(())
}

#[tokio::test]
async fn csv_export_escapes_values() -> Result<()> {
    let app = TestApp::spawn().await?;
    let lead = app
        .create_lead(json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "company": "Acme, Inc.",
            "notes": "said \"call me\"\nnext week",
        }))
        .await?;

    let body = app.get("/leads/export?format=csv").send().await?.text().await?;
    assert!(body.starts_with(CSV_HEADER));

    let row = &body[CSV_HEADER.len()..];
    assert!(row.starts_with(lead["id"].as_str().unwrap()));
    assert!(row.contains(",\"Acme, Inc.\","));
    assert!(row.contains(",\"said \"\"call me\"\"\nnext week\","));
    assert!(row.contains(",agent-1,"));
    assert!(row.ends_with("\r\n"));
    Ok(())
}

#[tokio::test]
async fn json_export_contains_every_matching_lead() -> Result<()> {
    let app = TestApp::spawn().await?;
    for i in 0..3 {
        app.create_lead(json!({ "name": format!("Lead {}", i), "email": format!("l{}@x.com", i) }))
            .await?;
    }
    app.create_lead(json!({ "name": "Winner", "email": "w@x.com", "status": "won" }))
        .await?;

    let all: Value = app.get("/leads/export?format=json").send().await?.json().await?;
    assert_eq!(all.as_array().unwrap().len(), 4);

    let won: Value = app
        .get("/leads/export?format=json&status=won")
        .send()
        .await?
        .json()
        .await?;
    let won = won.as_array().unwrap();
    assert_eq!(won.len(), 1);
    assert_eq!(won[0]["name"], "Winner");
    Ok(())
}

#[tokio::test]
async fn export_spans_multiple_batches() -> Result<()> {
    let app = TestApp::spawn_with(|c| c.api.export_batch_size = 2).await?;
    for i in 0..5 {
        app.create_lead(json!({ "name": format!("Lead {}", i), "email": format!("l{}@x.com", i) }))
            .await?;
    }

    let body = app.get("/leads/export").send().await?.text().await?;
    assert_eq!(body.matches("\r\n").count(), 6);
    Ok(())
}

#[tokio::test]
async fn unknown_format_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/leads/export?format=xml").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}
