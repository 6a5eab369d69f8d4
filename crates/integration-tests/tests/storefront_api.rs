//! End-to-end tests for the storefront API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (cargo run -p shoply-server)
//! - `SHOP_ADMIN_SECRET` matching the server, for creating fixtures
//!
//! Run with: cargo test -p shoply-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use shoply_integration_tests::{
    admin_client, base_url, checkout_details, create_product, decimal, delete_product,
    session_client,
};

fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("id")
}

// ============================================================================
// Health & Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_readiness() {
    let resp = session_client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_product_listing_and_detail() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Listing Mug", "249.00", 5).await;
    let slug = product["slug"].as_str().unwrap().to_string();

    let client = session_client();
    let resp = client
        .get(format!("{}/api/products", base_url()))
        .query(&[("search", slug.as_str()), ("per_page", "5")])
        .send()
        .await
        .expect("Failed to list products");
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.unwrap();
    assert!(page["items"].is_array());
    assert_eq!(page["per_page"], 5);

    let resp = client
        .get(format!("{}/api/products/{slug}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(decimal(&detail["price"]), Decimal::new(249, 0));

    delete_product(&admin, id_of(&product)).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_product_is_not_found() {
    let resp = session_client()
        .get(format!("{}/api/products/no-such-product-xyz", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_inactive_product_is_hidden() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Hidden Lamp", "999.00", 3).await;
    let id = id_of(&product);
    let slug = product["slug"].as_str().unwrap().to_string();

    let resp = admin
        .patch(format!("{}/admin/api/products/{id}", base_url()))
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session_client()
        .get(format!("{}/api/products/{slug}", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    delete_product(&admin, id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_category_tree_and_content() {
    let client = session_client();
    for path in ["/api/categories", "/api/banners", "/api/feature-icons"] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert!(body.is_array(), "{path}");
    }
}

// ============================================================================
// Cart & Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_flow_and_checkout() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Cart Mug", "499.00", 10).await;
    let id = id_of(&product);

    let client = session_client();
    let resp = client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.unwrap();
    assert_eq!(cart["item_count"], 2);
    assert_eq!(decimal(&cart["subtotal"]), Decimal::new(998, 0));
    assert_eq!(decimal(&cart["shipping"]), Decimal::new(99, 0));

    let resp = client
        .patch(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.unwrap();
    assert_eq!(cart["item_count"], 3);

    let resp = client
        .post(format!("{}/api/cart/checkout", base_url()))
        .json(&checkout_details())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(decimal(&placed["subtotal"]), Decimal::new(1497, 0));
    assert!(placed["order_number"].as_i64().unwrap() > 0);
    assert!(placed["payment_qr_url"].is_string());

    // Checkout empties the cart
    let cart: Value = client
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["item_count"], 0);

    // Stock was decremented
    let detail: Value = admin
        .get(format!("{}/admin/api/products/{id}", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["stock"], 7);

    delete_product(&admin, id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_rejects_more_than_stock() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Scarce Vase", "1200.00", 1).await;
    let id = id_of(&product);

    let client = session_client();
    let resp = client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    delete_product(&admin, id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_remove_missing_line_is_not_found() {
    let resp = session_client()
        .delete(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": 987_654 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_inline_order_and_payment_qr() {
    let admin = admin_client().await;
    let product = create_product(&admin, "Inline Teapot", "1500.00", 4).await;
    let id = id_of(&product);

    let mut body = checkout_details();
    body["items"] = json!([
        { "product_id": id, "quantity": 1 },
        { "product_id": id, "quantity": 1 },
    ]);

    let client = session_client();
    let resp = client
        .post(format!("{}/api/orders", base_url()))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(decimal(&placed["subtotal"]), Decimal::new(3000, 0));
    assert_eq!(decimal(&placed["shipping_price"]), Decimal::ZERO);
    assert_eq!(decimal(&placed["total"]), Decimal::new(3000, 0));

    let number = placed["order_number"].as_i64().unwrap();
    let resp = client
        .get(format!("{}/api/orders/{number}/payment-qr", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/svg+xml"
    );

    delete_product(&admin, id).await;
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_order_for_unknown_product_is_rejected() {
    let mut body = checkout_details();
    body["items"] = json!([{ "product_id": 987_654, "quantity": 1 }]);

    let resp = session_client()
        .post(format!("{}/api/orders", base_url()))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
