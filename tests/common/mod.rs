#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use lead_api::app::{self, AppState};
use lead_api::auth::{AuthGate, Identity};
use lead_api::config::AppConfig;
use lead_api::database::MemoryLeadStore;

pub const TEST_SECRET: &str = "integration-test-secret";

/// In-process server backed by a fresh in-memory store
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    gate: AuthGate,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let mut config = AppConfig::development();
        config.security.jwt_secret = TEST_SECRET.to_string();
        configure(&mut config);

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        let gate = AuthGate::new(&config.security);
        let state = AppState::new(config, Arc::new(MemoryLeadStore::new()));
        let router = app::router(state);

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
            gate,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token(&self, subject: &str) -> String {
        self.gate
            .issue(&Identity::new(subject))
            .expect("failed to sign test token")
    }

    pub fn expired_token(&self, subject: &str) -> String {
        self.gate
            .issue_with_expiry(&Identity::new(subject), Duration::hours(-2))
            .expect("failed to sign test token")
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// Request carrying a valid bearer token for `agent-1`
    pub fn authed(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token("agent-1"))
    }

    /// Create a lead and return its JSON representation
    pub async fn create_lead(&self, body: Value) -> Result<Value> {
        let res = self
            .authed(reqwest::Method::POST, "/leads")
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(
            res.status() == reqwest::StatusCode::CREATED,
            "create failed with {}",
            res.status()
        );
        let json: Value = res.json().await?;
        Ok(json["data"].clone())
    }
}
