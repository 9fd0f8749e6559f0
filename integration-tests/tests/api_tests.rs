use axum::http::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use test_utils::*;

/// End-to-end tests over the real API router and a loaded engine.

#[tokio::test]
async fn validate_accepts_code_found_in_two_sources() {
    let dir = TempDir::new().expect("tempdir");
    write_coupon_source(&dir, "couponbase1.gz", &["HAPPYHOURX", "AAAAAAAA"]);
    write_coupon_source(&dir, "couponbase2.gz", &["HAPPYHOURX"]);
    let server = server_with_sources(&dir, &["couponbase1.gz", "couponbase2.gz"]).await;

    let response = server
        .post("/api/v1/promo_code/validate")
        .json(&json!({ "promote_code": "HAPPYHOURX" }))
        .await;

    response.assert_status(StatusCode::OK);
    response.assert_json(&json!({
        "promo_code": "HAPPYHOURX",
        "valid": true,
        "message": "Promo code is valid."
    }));
}

#[tokio::test]
async fn validate_rejects_code_found_in_one_source() {
    let dir = TempDir::new().expect("tempdir");
    write_coupon_source(&dir, "couponbase1.gz", &["LONELYCODE"]);
    write_coupon_source(&dir, "couponbase2.gz", &[]);
    let server = server_with_sources(&dir, &["couponbase1.gz", "couponbase2.gz"]).await;

    let response = server
        .post("/api/v1/promo_code/validate")
        .json(&json!({ "promote_code": "LONELYCODE" }))
        .await;

    response.assert_status(StatusCode::OK);
    response.assert_json(&json!({
        "promo_code": "LONELYCODE",
        "valid": false,
        "message": "Promo code not found in at least two files."
    }));
}

#[tokio::test]
async fn validate_rejects_codes_outside_the_length_window() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    for code in ["SHORT", "TOOLONGCODEX"] {
        let response = server
            .post("/api/v1/promo_code/validate")
            .json(&json!({ "promote_code": code }))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["valid"], false);
        assert_eq!(
            body["message"],
            "Promo code must be between 8 and 10 characters long."
        );
    }
}

#[tokio::test]
async fn validate_rejects_malformed_json_with_400() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let response = server
        .post("/api/v1/promo_code/validate")
        .text("{ this is not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_is_created_even_with_an_invalid_coupon() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let response = server
        .post("/api/v1/orders")
        .json(&json!({
            "coupon_code": "INVALID1",
            "items": [
                { "product_id": "prod1", "quantity": 2, "price": 12.99 }
            ]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let order: Value = response.json();
    let order_id = order["id"].as_str().expect("order id");
    assert_eq!(order["items"][0]["product_id"], "prod1");
    assert_eq!(order["products"][0]["name"], "Burger Classic");
    let total = order["total"].as_f64().expect("total");
    assert!((total - 25.98).abs() < 1e-9);

    // The created order is retrievable afterwards.
    let fetched = server.get(&format!("/api/v1/orders/{order_id}")).await;
    fetched.assert_status(StatusCode::OK);
    assert_eq!(fetched.json::<Value>()["id"], order_id);
}

#[tokio::test]
async fn order_with_valid_coupon_keeps_its_total() {
    let dir = TempDir::new().expect("tempdir");
    write_coupon_source(&dir, "couponbase1.gz", &["DRINKSFREE"]);
    write_coupon_source(&dir, "couponbase2.gz", &["DRINKSFREE"]);
    let server = server_with_sources(&dir, &["couponbase1.gz", "couponbase2.gz"]).await;

    let response = server
        .post("/api/v1/orders")
        .json(&json!({
            "coupon_code": "DRINKSFREE",
            "items": [
                { "product_id": "prod3", "quantity": 1, "price": 2.50 }
            ]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    // No discount arithmetic: the coupon is only a boolean check.
    let total = response.json::<Value>()["total"].as_f64().expect("total");
    assert!((total - 2.50).abs() < 1e-9);
}

#[tokio::test]
async fn order_with_unknown_product_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let response = server
        .post("/api/v1/orders")
        .json(&json!({
            "items": [
                { "product_id": "prod99", "quantity": 1, "price": 1.0 }
            ]
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_with_zero_quantity_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let response = server
        .post("/api/v1/orders")
        .json(&json!({
            "items": [
                { "product_id": "prod1", "quantity": 0, "price": 12.99 }
            ]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_id_returns_404() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let response = server.get("/api/v1/orders/not-a-real-order").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_listing_contains_created_orders() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    server
        .post("/api/v1/orders")
        .json(&json!({
            "items": [ { "product_id": "prod2", "quantity": 1, "price": 3.49 } ]
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/api/v1/orders").await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn product_catalog_is_served() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    let listing = server.get("/api/v1/products").await;
    listing.assert_status(StatusCode::OK);
    assert_eq!(listing.json::<Value>().as_array().expect("array").len(), 5);

    let single = server.get("/api/v1/products/prod1").await;
    single.assert_status(StatusCode::OK);
    assert_eq!(single.json::<Value>()["name"], "Burger Classic");

    let missing = server.get("/api/v1/products/prod99").await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn probes_answer() {
    let dir = TempDir::new().expect("tempdir");
    let server = server_with_sources(&dir, &[]).await;

    server
        .get("/api/v1/live")
        .await
        .assert_status(StatusCode::OK);
    server
        .get("/api/v1/ready")
        .await
        .assert_status(StatusCode::OK);
}
