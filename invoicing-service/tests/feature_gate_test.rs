//! Plan feature gating on analytics routes, the feature probe and plan quotas.

mod common;

use common::{json_body, TestApp};
use invoicing_service::models::CreateUser;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn starter_plan_cannot_open_analytics() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_fg1", "fg1@example.com").await;

    let res = app.get("/api/analytics/dashboard", &user_id).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = json_body(res).await;
    assert_eq!(body["error"], "Feature not available in your plan");
    assert_eq!(body["feature"], "advanced_analytics");
    assert_eq!(body["current_plan"], "Starter");
    assert_eq!(body["upgrade_required"], true);
}

#[tokio::test]
async fn user_without_subscription_is_told_to_subscribe() {
    let app = TestApp::spawn().await;
    let user = app
        .store
        .create_user(CreateUser {
            clerk_id: None,
            email: "nosub@example.com".to_string(),
            display_name: "No Sub".to_string(),
            profile_image: String::new(),
        })
        .await
        .unwrap();

    let res = app.get("/api/analytics/usage", &user.id).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = json_body(res).await;
    assert_eq!(body["error"], "Subscription required");
    assert_eq!(body["feature"], "advanced_analytics");
}

#[tokio::test]
async fn pro_plan_opens_analytics() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_fg2", "fg2@example.com").await;
    app.change_plan(&user_id, "PLN-PRO").await;

    let res = app.get("/api/analytics/usage", &user_id).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"], "No analytics data found");

    let client = app.create_client(&user_id, "Acme").await;
    app.create_invoice(
        &user_id,
        json!({ "client_id": client["id"], "amount": 100, "currency_type": "EUR" }),
    )
    .await;

    let res = app.get("/api/analytics/usage", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let today = &body["analytics"][0];
    assert_eq!(today["invoices_created"], 1);
    assert_eq!(today["clients_added"], 1);
    assert_eq!(today["revenue_generated"], 109.0);

    let res = app.get("/api/analytics/dashboard", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let month = &json_body(res).await["dashboard"]["current_month"];
    assert_eq!(month["invoices_created"], 1);
    assert_eq!(month["clients_added"], 1);
    assert_eq!(month["messages_sent"], 0);
    assert_eq!(month["revenue_generated"], 109.0);
}

#[tokio::test]
async fn feature_probe_reports_plan_flags() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_fg3", "fg3@example.com").await;

    let body = json_body(
        app.get("/api/subscription/features/image_generation", &user_id)
            .await,
    )
    .await;
    assert_eq!(body["feature"], "image_generation");
    assert_eq!(body["allowed"], false);
    assert_eq!(body["current_plan"], "Starter");

    app.change_plan(&user_id, "PLN-PRO").await;
    let body = json_body(
        app.get("/api/subscription/features/image_generation", &user_id)
            .await,
    )
    .await;
    assert_eq!(body["allowed"], true);

    let body = json_body(
        app.get("/api/subscription/features/white_label", &user_id)
            .await,
    )
    .await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["current_plan"], "Pro");

    // Names that are not plan features are allowed
    let body = json_body(
        app.get("/api/subscription/features/dark_mode", &user_id)
            .await,
    )
    .await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn client_quota_applies_when_enabled() {
    let app = TestApp::spawn_with(|config| config.limits.plan_quotas_enabled = true).await;
    let user_id = app.sign_up("user_fg4", "fg4@example.com").await;

    for i in 0..10 {
        app.create_client(&user_id, &format!("Client {}", i)).await;
    }

    let res = app
        .post("/api/clients", &user_id, json!({ "name": "One too many" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(res).await["error"], "Plan limit reached");

    app.change_plan(&user_id, "PLN-PRO").await;
    let res = app
        .post("/api/clients", &user_id, json!({ "name": "Unlimited now" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn quotas_are_off_by_default() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_fg5", "fg5@example.com").await;

    for i in 0..11 {
        app.create_client(&user_id, &format!("Client {}", i)).await;
    }
}

#[tokio::test]
async fn invoice_quota_rejects_before_creating_named_client() {
    let app = TestApp::spawn_with(|config| {
        config.limits.plan_quotas_enabled = true;
        config.limits.rate_limit_enabled = false;
    })
    .await;
    let user_id = app.sign_up("user_fg6", "fg6@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    for _ in 0..50 {
        app.create_invoice(&user_id, json!({ "client_id": client["id"], "amount": 1 }))
            .await;
    }

    let res = app
        .post(
            "/api/invoices",
            &user_id,
            json!({ "client_name": "Brand New Co", "amount": 1 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(res).await["error"], "Plan limit reached");

    let clients = json_body(app.get("/api/clients", &user_id).await).await;
    let clients = clients.as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["name"], "Acme");

    let usage = json_body(app.get("/api/subscription/usage", &user_id).await).await;
    assert_eq!(usage["current_usage"]["clients_created"], 1);
    assert_eq!(usage["current_usage"]["invoices_created"], 50);
}
