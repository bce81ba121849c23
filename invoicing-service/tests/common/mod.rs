//! Test helper module for invoicing-service integration tests.
//!
//! Spawns the real application on a random port over the in-memory store.

#![allow(dead_code)]

use invoicing_service::config::InvoicingConfig;
use invoicing_service::services::Store;
use invoicing_service::startup::Application;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CLERK_ID_HEADER: &str = "x-clerk-id";

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub http_port: u16,
    pub store: Arc<dyn Store>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn with the default in-memory configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn after adjusting the configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut InvoicingConfig)) -> Self {
        let mut config = InvoicingConfig::for_memory();
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let store = app.store();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", http_port);
        let client = reqwest::Client::new();

        // Wait for the server by polling the health endpoint
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        Self {
            address,
            http_port,
            store,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Request authenticated as `user_id` via `X-User-ID`.
    pub fn request(&self, method: Method, path: &str, user_id: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(USER_ID_HEADER, user_id)
    }

    pub async fn get(&self, path: &str, user_id: &str) -> Response {
        self.request(Method::GET, path, user_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, user_id: &str, body: Value) -> Response {
        self.request(Method::POST, path, user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, user_id: &str, body: Value) -> Response {
        self.request(Method::PUT, path, user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, user_id: &str) -> Response {
        self.request(Method::DELETE, path, user_id)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a user through `/api/auth/sync-user`; returns the user id.
    pub async fn sign_up(&self, clerk_id: &str, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/api/auth/sync-user"))
            .json(&json!({
                "clerk_id": clerk_id,
                "email": email,
                "display_name": "Test User",
            }))
            .send()
            .await
            .expect("Failed to sync user");
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.expect("Invalid sync response");
        body["user"]["id"]
            .as_str()
            .expect("Missing user id")
            .to_string()
    }

    pub async fn create_client(&self, user_id: &str, name: &str) -> Value {
        let res = self
            .post("/api/clients", user_id, json!({ "name": name }))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.expect("Invalid client response")
    }

    pub async fn create_invoice(&self, user_id: &str, body: Value) -> Value {
        let res = self.post("/api/invoices", user_id, body).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.expect("Invalid invoice response")
    }

    pub async fn change_plan(&self, user_id: &str, plan_id: &str) {
        let res = self
            .post(
                "/api/subscription/change",
                user_id,
                json!({ "plan_id": plan_id }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}

pub async fn json_body(res: Response) -> Value {
    res.json().await.expect("Response body is not JSON")
}
