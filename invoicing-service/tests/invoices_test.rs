//! Invoice CRUD, client ownership and client aggregate upkeep.

mod common;

use common::{json_body, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn client_stats(app: &TestApp, user_id: &str, client_id: &str) -> Value {
    let res = app.get(&format!("/api/clients/{}", client_id), user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    json_body(res).await
}

#[tokio::test]
async fn create_invoice_for_owned_client() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i1", "i1@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    let invoice = app
        .create_invoice(
            &user_id,
            json!({
                "client_id": client["id"],
                "invoice_date": "2024-12-15",
                "due_date": "2025-01-14",
                "amount": 1250.5,
                "currency_type": "EUR",
            }),
        )
        .await;

    assert!(invoice["id"].as_str().unwrap().starts_with("INV-"));
    assert_eq!(invoice["client_name"], "Acme");
    assert_eq!(invoice["status"], "unpaid");
    assert_eq!(invoice["currency_type"], "EUR");
    assert_eq!(invoice["amount"], 1250.5);
}

#[tokio::test]
async fn foreign_client_is_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.sign_up("user_ia", "ia@example.com").await;
    let bob = app.sign_up("user_ib", "ib@example.com").await;
    let bobs_client = app.create_client(&bob, "Bob's Client").await;

    let res = app
        .post(
            "/api/invoices",
            &alice,
            json!({ "client_id": bobs_client["id"], "amount": 10 }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid client selected");

    let untouched = client_stats(&app, &bob, bobs_client["id"].as_str().unwrap()).await;
    assert_eq!(untouched["invoice_count"], 0);
}

#[tokio::test]
async fn legacy_client_name_finds_or_creates_client() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i2", "i2@example.com").await;

    let first = app
        .create_invoice(&user_id, json!({ "client_name": "Walk-in", "amount": 20 }))
        .await;
    let second = app
        .create_invoice(&user_id, json!({ "client_name": "Walk-in", "amount": 30 }))
        .await;

    assert_eq!(first["client_id"], second["client_id"]);

    let clients = json_body(app.get("/api/clients", &user_id).await).await;
    let clients = clients.as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["name"], "Walk-in");
    assert_eq!(clients[0]["invoice_count"], 2);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i3", "i3@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    let res = app.post("/api/invoices", &user_id, json!({ "amount": 10 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/invoices",
            &user_id,
            json!({ "client_id": client["id"], "amount": -1 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .post(
            "/api/invoices",
            &user_id,
            json!({ "client_id": client["id"], "amount": 5, "status": "settled" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "Invalid invoice status");

    let res = app
        .post(
            "/api/invoices",
            &user_id,
            json!({ "client_id": client["id"], "amount": 5, "invoice_date": "12/15/2024" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn client_aggregates_follow_invoice_writes() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i4", "i4@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;
    let client_id = client["id"].as_str().unwrap();

    let paid = app
        .create_invoice(
            &user_id,
            json!({ "client_id": client_id, "amount": 100, "status": "paid" }),
        )
        .await;
    let unpaid = app
        .create_invoice(&user_id, json!({ "client_id": client_id, "amount": 200 }))
        .await;

    let stats = client_stats(&app, &user_id, client_id).await;
    assert_eq!(stats["invoice_count"], 2);
    assert_eq!(stats["total_invoiced"], 300.0);
    assert_eq!(stats["total_paid"], 100.0);
    assert_eq!(stats["average_invoice"], 150.0);

    let res = app
        .put(
            &format!("/api/invoices/{}", unpaid["id"].as_str().unwrap()),
            &user_id,
            json!({ "status": "paid", "amount": 250 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let stats = client_stats(&app, &user_id, client_id).await;
    assert_eq!(stats["total_invoiced"], 350.0);
    assert_eq!(stats["total_paid"], 350.0);

    app.delete(
        &format!("/api/invoices/{}", paid["id"].as_str().unwrap()),
        &user_id,
    )
    .await;

    let stats = client_stats(&app, &user_id, client_id).await;
    assert_eq!(stats["invoice_count"], 1);
    assert_eq!(stats["total_invoiced"], 250.0);
    assert_eq!(stats["average_invoice"], 250.0);
}

#[tokio::test]
async fn reassigning_refreshes_both_clients() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i5", "i5@example.com").await;
    let from = app.create_client(&user_id, "From").await;
    let to = app.create_client(&user_id, "To").await;

    let invoice = app
        .create_invoice(&user_id, json!({ "client_id": from["id"], "amount": 80 }))
        .await;

    let res = app
        .put(
            &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
            &user_id,
            json!({ "client_id": to["id"] }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = json_body(res).await;
    assert_eq!(updated["client_name"], "To");

    let from_stats = client_stats(&app, &user_id, from["id"].as_str().unwrap()).await;
    let to_stats = client_stats(&app, &user_id, to["id"].as_str().unwrap()).await;
    assert_eq!(from_stats["invoice_count"], 0);
    assert_eq!(from_stats["total_invoiced"], 0.0);
    assert_eq!(to_stats["invoice_count"], 1);
    assert_eq!(to_stats["total_invoiced"], 80.0);
}

#[tokio::test]
async fn list_supports_filters_and_limit() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i6", "i6@example.com").await;
    let a = app.create_client(&user_id, "A").await;
    let b = app.create_client(&user_id, "B").await;

    for (client, status) in [(&a, "paid"), (&a, "unpaid"), (&b, "paid"), (&b, "overdue")] {
        app.create_invoice(
            &user_id,
            json!({ "client_id": client["id"], "amount": 10, "status": status }),
        )
        .await;
    }

    let all = json_body(app.get("/api/invoices", &user_id).await).await;
    assert_eq!(all.as_array().unwrap().len(), 4);

    let paid = json_body(app.get("/api/invoices?status=paid", &user_id).await).await;
    assert_eq!(paid.as_array().unwrap().len(), 2);

    let path = format!("/api/invoices?client_id={}", b["id"].as_str().unwrap());
    let for_b = json_body(app.get(&path, &user_id).await).await;
    assert!(for_b
        .as_array()
        .unwrap()
        .iter()
        .all(|inv| inv["client_id"] == b["id"]));
    assert_eq!(for_b.as_array().unwrap().len(), 2);

    let limited = json_body(app.get("/api/invoices?limit=3", &user_id).await).await;
    let limited = limited.as_array().unwrap();
    assert_eq!(limited.len(), 3);
    assert_eq!(limited[0]["status"], "overdue");
}

#[tokio::test]
async fn invoices_are_isolated_per_user() {
    let app = TestApp::spawn().await;
    let alice = app.sign_up("user_iso_a", "isoa@example.com").await;
    let bob = app.sign_up("user_iso_b", "isob@example.com").await;
    let client = app.create_client(&alice, "Acme").await;
    let invoice = app
        .create_invoice(&alice, json!({ "client_id": client["id"], "amount": 5 }))
        .await;
    let path = format!("/api/invoices/{}", invoice["id"].as_str().unwrap());

    let res = app.get(&path, &bob).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"], "Invoice not found");
    assert_eq!(app.delete(&path, &bob).await.status(), StatusCode::NOT_FOUND);

    let res = app.delete(&path, &alice).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "Invoice deleted successfully");
}

#[tokio::test]
async fn amounts_outside_money_range_are_rejected() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i9", "i9@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    for amount in [json!(5.0e28), json!(1_000_000_000_000_i64)] {
        let res = app
            .post(
                "/api/invoices",
                &user_id,
                json!({ "client_id": client["id"], "amount": amount }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let invoice = app
        .create_invoice(&user_id, json!({ "client_id": client["id"], "amount": 1 }))
        .await;
    let res = app
        .put(
            &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
            &user_id,
            json!({ "amount": 5.0e28 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing oversized was stored, so reads keep working
    let res = app.get("/api/dashboard/kpi", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["total_invoiced"], 1.0);
}

#[tokio::test]
async fn largest_amounts_aggregate_without_overflow() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i10", "i10@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    for _ in 0..3 {
        app.create_invoice(
            &user_id,
            json!({ "client_id": client["id"], "amount": 999_999_999_999_i64, "currency_type": "GBP" }),
        )
        .await;
    }

    let stats = client_stats(&app, &user_id, client["id"].as_str().unwrap()).await;
    assert_eq!(stats["total_invoiced"], 2_999_999_999_997.0);
    assert_eq!(stats["invoice_count"], 3);

    let res = app.get("/api/clients", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.get("/api/dashboard/reports-summary", &user_id).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["total_revenue"], 2_999_999_999_997.0);
}

#[tokio::test]
async fn amounts_are_stored_to_the_cent() {
    let app = TestApp::spawn().await;
    let user_id = app.sign_up("user_i11", "i11@example.com").await;
    let client = app.create_client(&user_id, "Acme").await;

    let invoice = app
        .create_invoice(&user_id, json!({ "client_id": client["id"], "amount": 0.125 }))
        .await;
    assert_eq!(invoice["amount"], 0.13);
}
