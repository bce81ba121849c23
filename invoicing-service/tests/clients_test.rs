//! Client CRUD, search, tenant isolation and revenue series.

mod common;

use common::{json_body, TestApp};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn create_and_fetch_client() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c1", "c1@example.com").await;

    let res = app
        .post(
            "/api/clients",
            &user_id,
            json!({ "name": "Acme Corp", "email": "billing@acme.test", "payment_delay": 30 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let client = json_body(res).await;
    let client_id = client["id"].as_str().unwrap().to_string();
    assert!(client_id.starts_with("CLI-"));
    assert_eq!(client["invoice_count"], 0);
    assert_eq!(client["payment_delay"], 30);

    let res = app.get(&format!("/api/clients/{}", client_id), &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["name"], "Acme Corp");
}

#[tokio::test]
async fn create_client_validates_body() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c2", "c2@example.com").await;

    let res = app.post("/api/clients", &user_id, json!({ "name": "" })).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .post("/api/clients", &user_id, json!({ "email": "x@y.z" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_newest_first_and_searchable() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c3", "c3@example.com").await;

    app.create_client(&user_id, "Globex").await;
    app.create_client(&user_id, "Initech").await;
    app.post(
        "/api/clients",
        &user_id,
        json!({ "name": "Umbrella", "email": "ops@GLOBAL.test" }),
    )
    .await;

    let res = app.get("/api/clients", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    let clients = json_body(res).await;
    let names: Vec<&str> = clients
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Umbrella", "Initech", "Globex"]);

    let res = app.get("/api/clients?search=glo", &user_id).await;
    let found = json_body(res).await;
    let mut names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Globex", "Umbrella"]);
}

#[tokio::test]
async fn clients_are_isolated_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.sign_up("user_alice", "alice@example.com").await;
    let bob = app.sign_up("user_bob", "bob@example.com").await;

    let client = app.create_client(&alice, "Alice's Client").await;
    let path = format!("/api/clients/{}", client["id"].as_str().unwrap());

    assert_eq!(app.get(&path, &bob).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.put(&path, &bob, json!({ "name": "Hijacked" })).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&path, &bob).await.status(), StatusCode::NOT_FOUND);

    let bobs = json_body(app.get("/api/clients", &bob).await).await;
    assert!(bobs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rename_propagates_to_invoices() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c4", "c4@example.com").await;

    let client = app.create_client(&user_id, "Old Name").await;
    let client_id = client["id"].as_str().unwrap();
    let invoice = app
        .create_invoice(&user_id, json!({ "client_id": client_id, "amount": 100 }))
        .await;

    let res = app
        .put(
            &format!("/api/clients/{}", client_id),
            &user_id,
            json!({ "name": "New Name" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["name"], "New Name");

    let res = app
        .get(
            &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
            &user_id,
        )
        .await;
    assert_eq!(json_body(res).await["client_name"], "New Name");
}

#[tokio::test]
async fn delete_is_refused_while_invoices_exist() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c5", "c5@example.com").await;

    let client = app.create_client(&user_id, "Busy Client").await;
    let client_id = client["id"].as_str().unwrap();
    let invoice = app
        .create_invoice(&user_id, json!({ "client_id": client_id, "amount": 10 }))
        .await;

    let path = format!("/api/clients/{}", client_id);
    let res = app.delete(&path, &user_id).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(res).await["error"],
        "Cannot delete client with existing invoices"
    );

    app.delete(
        &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
        &user_id,
    )
    .await;

    let res = app.delete(&path, &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "Client deleted successfully");
    assert_eq!(app.get(&path, &user_id).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revenue_data_lists_recent_paid_amounts() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_c6", "c6@example.com").await;

    let client = app.create_client(&user_id, "Steady Payer").await;
    let client_id = client["id"].as_str().unwrap();
    for (date, amount, status) in [
        ("2024-01-10", 100, "paid"),
        ("2024-03-10", 300, "paid"),
        ("2024-02-10", 200, "paid"),
        ("2024-04-10", 999, "unpaid"),
    ] {
        app.create_invoice(
            &user_id,
            json!({
                "client_id": client_id,
                "invoice_date": date,
                "amount": amount,
                "status": status,
            }),
        )
        .await;
    }

    let res = app
        .get(
            &format!("/api/clients/{}/revenue-data?months=5", client_id),
            &user_id,
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["months"], 5);
    assert_eq!(body["revenue_data"], json!([300.0, 200.0, 100.0, 0.0, 0.0]));

    let res = app
        .get(
            &format!("/api/clients/{}/revenue-data?months=abc", client_id),
            &user_id,
        )
        .await;
    let body = json_body(res).await;
    assert_eq!(body["months"], 7);
    assert_eq!(body["revenue_data"].as_array().unwrap().len(), 7);
}
