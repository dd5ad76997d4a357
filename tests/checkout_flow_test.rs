//! Integration tests for the checkout workflow: online and cash-on-delivery
//! orders, coupon application, idempotent retries, and failure isolation.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{checkout_payload, payment_signature, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

fn money(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.as_f64().expect("decimal number"),
        other => panic!("not a money value: {other:?}"),
    }
}

async fn create_coupon(app: &TestApp, body: Value) -> Value {
    let response = app
        .request(Method::POST, "/api/v1/coupons", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

fn percentage_coupon(code: &str) -> Value {
    let now = Utc::now();
    json!({
        "code": code,
        "discount_type": "percentage",
        "value": "10",
        "min_order": "500",
        "max_discount": "150",
        "usage_limit": 5,
        "per_user_limit": 1,
        "start_date": (now - Duration::days(1)).to_rfc3339(),
        "end_date": (now + Duration::days(30)).to_rfc3339()
    })
}

#[tokio::test]
async fn online_checkout_with_coupon_and_payment_verification() {
    let app = TestApp::new().await;
    let product = app.seed_product("TSHIRT-1", dec!(899)).await;
    create_coupon(&app, percentage_coupon("SAVE10")).await;
    app.mock_gateway_order("order_GW_A").await;
    app.mock_shipping_success(501_001).await;

    let customer_id = Uuid::new_v4();
    let mut payload = checkout_payload(customer_id, vec![(product.id, 2)], "online");
    payload["coupon_code"] = json!("SAVE10");

    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    // 2 x 899 = 1798, 10% = 179.8 floored to 179 then capped at the
    // coupon's max_discount of 150; free shipping above 999.
    assert_eq!(money(&body["subtotal"]), 1798.0);
    assert_eq!(money(&body["discount"]), 150.0);
    assert_eq!(money(&body["shipping_cost"]), 0.0);
    assert_eq!(money(&body["total_amount"]), 1648.0);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["gateway_order_id"], "order_GW_A");
    assert_eq!(body["gateway_key_id"], "test_key_id");

    // Client-side verification with a valid signature confirms the order.
    let verify = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({
                "gateway_order_id": "order_GW_A",
                "payment_id": "pay_123",
                "signature": payment_signature("order_GW_A", "pay_123")
            })),
        )
        .await;
    assert_eq!(verify.status(), StatusCode::OK);
    let verified = response_json(verify).await;
    assert_eq!(verified["payment_status"], "paid");

    // Fulfillment kicked off: the order now carries shipment details.
    let order_number = body["order_number"].as_str().unwrap();
    let detail = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_number),
            None,
        )
        .await;
    assert_eq!(detail.status(), StatusCode::OK);
    let detail = response_json(detail).await;
    assert_eq!(detail["order"]["status"], "processing");
    assert_eq!(detail["order"]["shipment_id"], "501001");
    assert_eq!(detail["order"]["awb_code"], "AWB123456");
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
    assert_eq!(detail["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn tampered_payment_signature_is_rejected_without_state_change() {
    let app = TestApp::new().await;
    let product = app.seed_product("TSHIRT-2", dec!(899)).await;
    app.mock_gateway_order("order_GW_B").await;

    let payload = checkout_payload(Uuid::new_v4(), vec![(product.id, 1)], "online");
    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let verify = app
        .request(
            Method::POST,
            "/api/v1/payments/verify",
            Some(json!({
                "gateway_order_id": "order_GW_B",
                "payment_id": "pay_123",
                "signature": payment_signature("order_GW_B", "pay_other")
            })),
        )
        .await;
    assert_eq!(verify.status(), StatusCode::BAD_REQUEST);

    let order_number = body["order_number"].as_str().unwrap();
    let detail = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_number),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(detail["order"]["payment_status"], "pending");
    assert_eq!(detail["order"]["status"], "pending");
}

#[tokio::test]
async fn cod_checkout_confirms_and_registers_shipment_immediately() {
    let app = TestApp::new().await;
    let product = app.seed_product("MUG-1", dec!(250)).await;
    app.mock_shipping_success(501_002).await;

    let payload = checkout_payload(Uuid::new_v4(), vec![(product.id, 1)], "cod");
    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    // 250 below the free-shipping threshold: flat 99 fee plus the 10 COD
    // surcharge.
    assert_eq!(money(&body["subtotal"]), 250.0);
    assert_eq!(money(&body["shipping_cost"]), 99.0);
    assert_eq!(money(&body["cod_surcharge"]), 10.0);
    assert_eq!(money(&body["total_amount"]), 359.0);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["payment_status"], "pending");
    assert!(body["gateway_order_id"].is_null());
}

#[tokio::test]
async fn shipment_failure_does_not_fail_cod_checkout() {
    let app = TestApp::new().await;
    let product = app.seed_product("MUG-2", dec!(250)).await;
    app.mock_shipping_failure().await;

    let payload = checkout_payload(Uuid::new_v4(), vec![(product.id, 1)], "cod");
    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    // The order stands, just without a shipment yet.
    assert_eq!(body["status"], "confirmed");
    assert!(body["order_number"].as_str().is_some());
}

#[tokio::test]
async fn repeated_idempotency_key_returns_the_same_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("CAP-1", dec!(499)).await;
    app.mock_gateway_order("order_GW_C").await;

    let customer_id = Uuid::new_v4();
    let mut payload = checkout_payload(customer_id, vec![(product.id, 1)], "online");
    payload["idempotency_key"] = json!("retry-key-0001");

    let first = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = response_json(first).await;
    assert_eq!(first["idempotent_replay"], false);

    let second = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = response_json(second).await;
    assert_eq!(second["idempotent_replay"], true);
    assert_eq!(second["order_number"], first["order_number"]);
    assert_eq!(second["order_id"], first["order_id"]);
}

#[tokio::test]
async fn gateway_failure_aborts_checkout_and_releases_the_coupon() {
    let app = TestApp::new().await;
    let product = app.seed_product("SHOE-1", dec!(1500)).await;
    app.mock_gateway_failure().await;
    app.mock_shipping_success(501_003).await;

    let mut coupon = percentage_coupon("ONCE");
    coupon["usage_limit"] = json!(1);
    coupon["per_user_limit"] = json!(5);
    create_coupon(&app, coupon).await;

    let customer_id = Uuid::new_v4();
    let mut payload = checkout_payload(customer_id, vec![(product.id, 1)], "online");
    payload["coupon_code"] = json!("ONCE");

    let failed = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);

    // The single use was given back: a COD checkout can still redeem it.
    let mut retry = checkout_payload(customer_id, vec![(product.id, 1)], "cod");
    retry["coupon_code"] = json!("ONCE");
    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(retry))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(money(&body["discount"]), 150.0);
}

#[tokio::test]
async fn order_numbers_are_unique_and_monotonic() {
    let app = TestApp::new().await;
    let product = app.seed_product("PEN-1", dec!(120)).await;
    app.mock_shipping_success(501_004).await;

    let mut numbers = Vec::new();
    for _ in 0..5 {
        let payload = checkout_payload(Uuid::new_v4(), vec![(product.id, 1)], "cod");
        let response = app
            .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        numbers.push(body["order_number"].as_str().unwrap().to_string());
    }

    let mut sorted = numbers.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 5);
    // Sequence part increases monotonically.
    let seqs: Vec<i64> = numbers
        .iter()
        .map(|n| n.rsplit('-').next().unwrap().parse().unwrap())
        .collect();
    for pair in seqs.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[tokio::test]
async fn concurrent_order_number_allocations_never_collide() {
    let app = TestApp::with_pool_size(8).await;
    let orders = app.state.services.orders.clone();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let orders = orders.clone();
        tasks.push(tokio::spawn(async move {
            orders.generate_order_number().await.expect("order number")
        }));
    }

    let mut numbers = Vec::new();
    for task in tasks {
        numbers.push(task.await.expect("allocation task"));
    }

    let mut unique = numbers.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), numbers.len());
}

#[tokio::test]
async fn concurrent_redemptions_cannot_exceed_the_usage_limit() {
    let app = TestApp::with_pool_size(8).await;

    let mut coupon = percentage_coupon("LASTONE");
    coupon["usage_limit"] = json!(1);
    create_coupon(&app, coupon).await;

    let coupons = app.state.services.coupons.clone();
    let coupon_id = coupons
        .find_by_code("LASTONE")
        .await
        .expect("lookup")
        .expect("coupon exists")
        .id;

    let first = {
        let coupons = coupons.clone();
        tokio::spawn(async move { coupons.redeem(coupon_id).await })
    };
    let second = {
        let coupons = coupons.clone();
        tokio::spawn(async move { coupons.redeem(coupon_id).await })
    };

    let outcomes = [
        first.await.expect("redeem task"),
        second.await.expect("redeem task"),
    ];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    let remaining = coupons
        .find_by_code("LASTONE")
        .await
        .expect("lookup")
        .expect("coupon exists");
    assert_eq!(remaining.used_count, 1);
}

#[tokio::test]
async fn unknown_product_fails_the_whole_checkout() {
    let app = TestApp::new().await;
    app.seed_product("REAL-1", dec!(300)).await;

    let payload = checkout_payload(Uuid::new_v4(), vec![(Uuid::new_v4(), 1)], "cod");
    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_coupon_degrades_to_no_discount() {
    let app = TestApp::new().await;
    let product = app.seed_product("SOCK-1", dec!(100)).await;
    create_coupon(&app, percentage_coupon("SAVE10")).await;
    app.mock_shipping_success(501_006).await;

    // Subtotal 100 is below the coupon's min_order of 500: the checkout
    // proceeds at full price rather than failing.
    let mut payload = checkout_payload(Uuid::new_v4(), vec![(product.id, 1)], "cod");
    payload["coupon_code"] = json!("SAVE10");

    let response = app
        .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(money(&body["discount"]), 0.0);
    assert_eq!(money(&body["total_amount"]), 209.0);
}

#[tokio::test]
async fn coupon_validate_endpoint_previews_discount() {
    let app = TestApp::new().await;
    create_coupon(&app, percentage_coupon("SAVE10")).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({
                "code": "save10",
                "customer_id": Uuid::new_v4(),
                "order_total": "1005"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["code"], "SAVE10");
    assert_eq!(money(&body["discount"]), 100.0);
    assert_eq!(money(&body["payable"]), 905.0);

    // Below the coupon's minimum order: still a 200, with the reason.
    let response = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({
                "code": "SAVE10",
                "customer_id": Uuid::new_v4(),
                "order_total": "400"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("at least 500"));
}

#[tokio::test]
async fn customer_order_listing_returns_their_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("HAT-1", dec!(350)).await;
    app.mock_shipping_success(501_005).await;

    let customer_id = Uuid::new_v4();
    for _ in 0..2 {
        let payload = checkout_payload(customer_id, vec![(product.id, 1)], "cod");
        let response = app
            .request(Method::POST, "/api/v1/orders/checkout", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{}/orders", customer_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let listing = app
        .request(Method::GET, "/api/v1/orders?status=processing", None)
        .await;
    assert_eq!(listing.status(), StatusCode::OK);
    let listing = response_json(listing).await;
    assert_eq!(listing["total"], 2);
}
