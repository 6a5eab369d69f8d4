//! End-to-end tests for the admin API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p shoply-server)
//! - `SHOP_ADMIN_SECRET` matching the server
//!
//! Run with: cargo test -p shoply-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use shoply_integration_tests::{
    admin_client, base_url, checkout_details, create_product, delete_product, session_client,
    unique_slug,
};

async fn create_category(admin: &Client, name: &str, parent_id: Option<i64>) -> Value {
    let resp = admin
        .post(format!("{}/admin/api/categories", base_url()))
        .json(&json!({
            "name": name,
            "slug": unique_slug(name),
            "parent_id": parent_id,
        }))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Failed to parse category")
}

async fn delete_category(admin: &Client, id: i64) -> StatusCode {
    admin
        .delete(format!("{}/admin/api/categories/{id}", base_url()))
        .send()
        .await
        .expect("Failed to delete category")
        .status()
}

async fn place_order(product_id: i64, quantity: u32) -> Value {
    let mut body = checkout_details();
    body["items"] = json!([{ "product_id": product_id, "quantity": quantity }]);

    let resp = session_client()
        .post(format!("{}/api/orders", base_url()))
        .json(&body)
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("Failed to parse order")
}

fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("id")
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_logout_cycle() {
    let admin = admin_client().await;

    let resp = admin
        .get(format!("{}/admin/api/categories", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = admin
        .post(format!("{}/admin/logout", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = admin
        .get(format!("{}/admin/api/categories", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_wrong_secret_is_rejected() {
    let client = session_client();
    let resp = client
        .post(format!("{}/admin/login", base_url()))
        .json(&json!({ "secret": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/admin/api/orders", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_category_crud_and_hierarchy() {
    let admin = admin_client().await;
    let parent = create_category(&admin, "Kitchen", None).await;
    let parent_id = id_of(&parent);
    let child = create_category(&admin, "Mugs", Some(parent_id)).await;
    let child_id = id_of(&child);
    assert_eq!(child["parent_id"], parent_id);

    // Parent with children cannot be deleted
    assert_eq!(delete_category(&admin, parent_id).await, StatusCode::CONFLICT);

    // Parent cannot move under its own child
    let resp = admin
        .put(format!("{}/admin/api/categories/{parent_id}", base_url()))
        .json(&json!({
            "name": "Kitchen",
            "slug": parent["slug"],
            "parent_id": child_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Duplicate slug is rejected
    let resp = admin
        .post(format!("{}/admin/api/categories", base_url()))
        .json(&json!({ "name": "Copy", "slug": child["slug"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(delete_category(&admin, child_id).await, StatusCode::NO_CONTENT);
    assert_eq!(delete_category(&admin, parent_id).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_category_move_and_reorder() {
    let admin = admin_client().await;
    let parent = create_category(&admin, "Move Group", None).await;
    let parent_id = id_of(&parent);

    let first = id_of(&create_category(&admin, "First", Some(parent_id)).await);
    let second = id_of(&create_category(&admin, "Second", Some(parent_id)).await);
    let third = id_of(&create_category(&admin, "Third", Some(parent_id)).await);

    let resp = admin
        .patch(format!("{}/admin/api/categories/{first}/move", base_url()))
        .json(&json!({ "order": 99 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = admin
        .patch(format!("{}/admin/api/categories/reorder", base_url()))
        .json(&json!({ "parent_id": parent_id, "ids": [third, first, second] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = admin
        .patch(format!("{}/admin/api/categories/reorder", base_url()))
        .json(&json!({ "parent_id": parent_id, "ids": [third, first] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let tree: Value = session_client()
        .get(format!("{}/api/categories/{}", base_url(), parent["slug"].as_str().unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order: Vec<i64> = tree["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(order, vec![third, first, second]);

    for id in [first, second, third, parent_id] {
        assert_eq!(delete_category(&admin, id).await, StatusCode::NO_CONTENT);
    }
}

// ============================================================================
// Orders & Invoices
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_status_flow_and_history() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Status Bowl", "350.00", 5).await;
    let placed = place_order(id_of(&product), 1).await;
    let order_id = id_of(&placed);
    let url = format!("{}/admin/api/orders/{order_id}", base_url());

    let resp = admin
        .put(&url)
        .json(&json!({ "status": "shipped", "tracking_number": "DR123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["status"], "shipped");
    assert_eq!(order["tracking_number"], "DR123");

    // Shipped orders cannot go back to pending
    let resp = admin
        .put(&url)
        .json(&json!({ "status": "pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let detail: Value = admin.get(&url).send().await.unwrap().json().await.unwrap();
    let fields: Vec<&str> = detail["history"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h["field"].as_str())
        .collect();
    assert!(fields.contains(&"status"));
    assert!(fields.contains(&"tracking_number"));

    delete_product(&admin, id_of(&product)).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_bulk_status_reports_each_order() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Bulk Plate", "120.00", 5).await;
    let placed = place_order(id_of(&product), 1).await;
    let order_id = id_of(&placed);

    let resp = admin
        .patch(format!("{}/admin/api/orders/status", base_url()))
        .json(&json!({ "ids": [order_id, 987_654], "status": "processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let results: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(results.len(), 2);

    let ok = results.iter().find(|r| r["id"] == order_id).unwrap();
    assert_eq!(ok["ok"], true);
    let missing = results.iter().find(|r| r["id"] == 987_654).unwrap();
    assert_eq!(missing["ok"], false);
    assert_eq!(missing["error"], "order not found");

    delete_product(&admin, id_of(&product)).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_invoice_issue_is_idempotent() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Invoice Jug", "605.00", 5).await;
    let placed = place_order(id_of(&product), 2).await;
    let order_id = id_of(&placed);
    let url = format!("{}/admin/api/orders/{order_id}/invoice", base_url());

    let resp = admin.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let invoice: Value = resp.json().await.unwrap();
    let number = invoice["invoice_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("FAK"));
    assert!(number.ends_with(&placed["order_number"].to_string()));

    let resp = admin.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let again: Value = resp.json().await.unwrap();
    assert_eq!(again["invoice_number"], number.as_str());

    let invoice_id = id_of(&invoice);
    let resp = admin
        .get(format!("{}/admin/api/invoices/{invoice_id}/qr", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    if let Some(pdf_url) = again["pdf_url"].as_str() {
        let resp = session_client()
            .get(format!("{}{pdf_url}", base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = admin
        .delete(format!("{}/admin/api/invoices/{invoice_id}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    delete_product(&admin, id_of(&product)).await;
}
