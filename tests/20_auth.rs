mod common;

use anyhow::Result;
use common::TestApp;
use reqwest::{header, Method, StatusCode};
use serde_json::{json, Value};

fn jane() -> Value {
    json!({ "name": "Jane Doe", "email": "jane@x.com" })
}

async fn lead_count(app: &TestApp) -> Result<u64> {
    let body: Value = app.get("/leads").send().await?.json().await?;
    Ok(body["pagination"]["total"].as_u64().unwrap_or_default())
}

async fn assert_unauthorized(res: reqwest::Response) -> Result<()> {
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized");
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn create_without_token_is_rejected_and_not_persisted() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.client.post(app.url("/leads")).json(&jane()).send().await?;
    assert_unauthorized(res).await?;
    assert_eq!(lead_count(&app).await?, 0);
    Ok(())
}

#[tokio::test]
async fn auth_runs_before_body_validation() -> Result<()> {
    let app = TestApp::spawn().await?;

    // Invalid payload without a token still yields 401, not 400
    let res = app
        .client
        .post(app.url("/leads"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn expired_and_garbage_tokens_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let expired = app.expired_token("agent-1");
    for token in [expired.as_str(), "garbage", "a.b.c"] {
        let res = app
            .client
            .post(app.url("/leads"))
            .bearer_auth(token)
            .json(&jane())
            .send()
            .await?;
        assert_unauthorized(res).await?;
    }
    assert_eq!(lead_count(&app).await?, 0);
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let other = TestApp::spawn_with(|c| c.security.jwt_secret = "another-secret".into()).await?;

    let res = app
        .client
        .post(app.url("/leads"))
        .bearer_auth(other.token("agent-1"))
        .json(&jane())
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn token_in_cookie_is_accepted() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .client
        .post(app.url("/leads"))
        .header(header::COOKIE, format!("theme=dark; token={}", app.token("agent-7")))
        .json(&jane())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = res.json().await?;
    assert_eq!(body["data"]["ownerId"], "agent-7");
    Ok(())
}

#[tokio::test]
async fn update_and_delete_require_a_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    let lead = app.create_lead(jane()).await?;
    let path = format!("/leads/{}", lead["id"].as_str().unwrap());

    let res = app
        .client
        .put(app.url(&path))
        .json(&json!({ "status": "won" }))
        .send()
        .await?;
    assert_unauthorized(res).await?;

    let res = app.client.delete(app.url(&path)).send().await?;
    assert_unauthorized(res).await?;

    // Untouched
    let body: Value = app.get(&path).send().await?.json().await?;
    assert_eq!(body["data"]["status"], "new");
    Ok(())
}

#[tokio::test]
async fn reads_are_open_by_default() -> Result<()> {
    let app = TestApp::spawn().await?;

    assert_eq!(app.get("/leads").send().await?.status(), StatusCode::OK);
    assert_eq!(app.get("/leads/export").send().await?.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn reads_can_be_protected() -> Result<()> {
    let app = TestApp::spawn_with(|c| c.security.protect_reads = true).await?;

    assert_unauthorized(app.get("/leads").send().await?).await?;
    assert_unauthorized(app.get("/leads/export").send().await?).await?;

    let res = app.authed(Method::GET, "/leads").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
