//! User sync, identity webhooks and the header auth guard.

mod common;

use common::{json_body, TestApp, CLERK_ID_HEADER, USER_ID_HEADER};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn sync_user_creates_then_updates() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/api/auth/sync-user"))
        .json(&json!({
            "clerk_id": "user_abc",
            "email": "ada@example.com",
            "display_name": "Ada",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["is_new"], true);
    assert_eq!(body["message"], "User created successfully");
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    assert!(user_id.starts_with("USR-"));

    let res = app
        .client
        .post(app.url("/api/auth/sync-user"))
        .json(&json!({
            "clerk_id": "user_abc",
            "email": "ada@newmail.com",
            "display_name": "Ada L.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["is_new"], false);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "ada@newmail.com");
    assert_eq!(body["user"]["display_name"], "Ada L.");
}

#[tokio::test]
async fn sync_user_requires_clerk_id_and_email() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/api/auth/sync-user"))
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Clerk ID is required");

    let res = app
        .client
        .post(app.url("/api/auth/sync-user"))
        .json(&json!({ "clerk_id": "user_1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Email is required");

    let res = app
        .client
        .post(app.url("/api/auth/sync-user"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid request data");
}

#[tokio::test]
async fn new_user_gets_trial_and_default_preferences() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_trial", "trial@example.com").await;

    let res = app.get("/api/subscription/status", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["subscription"]["status"], "trialing");
    assert_eq!(body["subscription"]["plan_id"], "PLN-STARTER");
    assert_eq!(body["plan"]["name"], "Starter");
    assert!(body["subscription"]["trial_end"].is_string());

    let res = app.get("/api/settings/preferences", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let prefs = json_body(res).await;
    assert_eq!(prefs["theme"], "light");
    assert_eq!(prefs["currency"], "USD");
    assert_eq!(prefs["marketing_emails"], false);
}

#[tokio::test]
async fn protected_routes_require_known_caller() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(app.url("/api/clients"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"], "Authentication required");

    let res = app.get("/api/clients", "USR-does-not-exist").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await["error"], "User not found");
}

#[tokio::test]
async fn clerk_header_is_tried_before_user_header() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_clerk", "clerk@example.com").await;

    let res = app
        .client
        .get(app.url("/api/settings/profile"))
        .header(CLERK_ID_HEADER, "user_clerk")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["id"], user_id.as_str());

    // Unknown external id falls back to the internal id
    let res = app
        .client
        .get(app.url("/api/settings/profile"))
        .header(CLERK_ID_HEADER, "user_unknown")
        .header(USER_ID_HEADER, &user_id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_handles_user_lifecycle() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/api/auth/webhook"))
        .json(&json!({
            "type": "user.created",
            "data": {
                "id": "user_hook",
                "first_name": "Grace",
                "last_name": "Hopper",
                "image_url": "https://img.example/grace.png",
                "email_addresses": [{ "id": "idn_1", "email_address": "grace@example.com" }]
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "Webhook processed successfully");

    let user = app
        .store
        .get_user_by_clerk_id("user_hook")
        .await
        .unwrap()
        .expect("webhook user created");
    assert_eq!(user.display_name, "Grace Hopper");
    assert_eq!(user.email, "grace@example.com");
    assert!(app.store.get_subscription(&user.id).await.unwrap().is_some());

    let res = app
        .client
        .post(app.url("/api/auth/webhook"))
        .json(&json!({
            "type": "user.updated",
            "data": {
                "id": "user_hook",
                "first_name": "Rear Admiral",
                "last_name": "Hopper",
                "email_addresses": [{ "id": "idn_2", "email_address": "hopper@example.com" }]
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = app.store.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(updated.email, "hopper@example.com");
    assert_eq!(updated.display_name, "Rear Admiral Hopper");

    let res = app
        .client
        .post(app.url("/api/auth/webhook"))
        .json(&json!({ "type": "user.deleted", "data": { "id": "user_hook" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(app.store.get_user(&user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn webhook_rejects_bad_payloads() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/api/auth/webhook"))
        .header("content-type", "application/json")
        .body(r#"{"type": "user.created"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid webhook data");

    let res = app
        .client
        .post(app.url("/api/auth/webhook"))
        .json(&json!({ "type": "user.updated", "data": { "id": "user_missing" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"], "User not found");
}
