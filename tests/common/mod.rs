use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use sha2::Sha256;
use storefront_api::{
    config::AppConfig,
    db,
    entities::product,
    events::{self, EventSender},
    handlers::AppServices,
    services::{CheckoutService, CouponService, OrderService, PaymentGatewayClient, ShipmentClient},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const GATEWAY_KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

/// Test harness: SQLite-backed application state with wiremock servers
/// standing in for the payment gateway and the shipment provider.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: MockServer,
    pub shipping: MockServer,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Constructs a test application with a fresh database.
    pub async fn new() -> Self {
        Self::with_pool_size(1).await
    }

    /// Like [`TestApp::new`] with a larger connection pool, for tests that
    /// drive the database from concurrent tasks.
    pub async fn with_pool_size(max_connections: u32) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = db_dir.path().join("storefront_test.db");

        let gateway = MockServer::start().await;
        let shipping = MockServer::start().await;

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = max_connections;
        cfg.db_min_connections = 1;
        cfg.payment_gateway_base_url = gateway.uri();
        cfg.payment_gateway_key_id = "test_key_id".to_string();
        cfg.payment_gateway_key_secret = GATEWAY_KEY_SECRET.to_string();
        cfg.payment_webhook_secret = Some(WEBHOOK_SECRET.to_string());
        cfg.shipment_base_url = shipping.uri();
        cfg.shipment_email = "ops@test.example".to_string();
        cfg.shipment_password = "shipping_password".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let orders = Arc::new(OrderService::new(db_arc.clone(), event_sender.clone()));
        let coupons = Arc::new(CouponService::new(db_arc.clone(), event_sender.clone()));
        let gateway_client =
            Arc::new(PaymentGatewayClient::from_config(&cfg).expect("gateway client"));
        let shipping_client = Arc::new(ShipmentClient::from_config(&cfg).expect("shipping client"));
        let checkout = Arc::new(CheckoutService::new(
            db_arc.clone(),
            orders.clone(),
            coupons.clone(),
            gateway_client,
            shipping_client,
            event_sender.clone(),
            &cfg,
        ));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services: AppServices {
                orders,
                coupons,
                checkout,
            },
        };

        let router = storefront_api::build_router(state.clone());

        Self {
            router,
            state,
            gateway,
            shipping,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Sends a JSON request to the app and returns the raw response.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("request failed")
    }

    /// Sends a raw body with a signature header, as the payment gateway does.
    pub async fn post_payment_webhook(&self, body: &str, signature: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/webhooks/payment-gateway")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-webhook-signature", signature)
            .body(Body::from(body.to_string()))
            .expect("build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    /// Inserts a catalog product the checkout path can reprice against.
    pub async fn seed_product(&self, sku: &str, price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Product {sku}")),
            sku: Set(sku.to_string()),
            price: Set(price),
            image_url: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    /// Mounts a gateway mock that returns `gateway_order_id` for the next
    /// order creation call.
    pub async fn mock_gateway_order(&self, gateway_order_id: &str) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": gateway_order_id,
                "amount": 0,
                "currency": "INR",
                "status": "created"
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Mounts a gateway mock that rejects order creation.
    pub async fn mock_gateway_failure(&self) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "description": "gateway exploded" }
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Mounts shipment provider mocks: login plus successful registration.
    pub async fn mock_shipping_success(&self, shipment_id: i64) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token": "shiptoken" })),
            )
            .mount(&self.shipping)
            .await;

        Mock::given(method("POST"))
            .and(path("/orders/create/adhoc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shipment_id": shipment_id,
                "order_id": 9_000_001,
                "awb_code": "AWB123456",
                "courier_name": "Test Courier",
                "status": "NEW"
            })))
            .mount(&self.shipping)
            .await;
    }

    /// Mounts shipment provider mocks where registration always fails.
    pub async fn mock_shipping_failure(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token": "shiptoken" })),
            )
            .mount(&self.shipping)
            .await;

        Mock::given(method("POST"))
            .and(path("/orders/create/adhoc"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "provider outage"
            })))
            .mount(&self.shipping)
            .await;
    }
}

fn hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Signature the gateway attaches to client payment callbacks.
pub fn payment_signature(gateway_order_id: &str, payment_id: &str) -> String {
    hmac_hex(
        GATEWAY_KEY_SECRET,
        format!("{gateway_order_id}|{payment_id}").as_bytes(),
    )
}

/// Signature the gateway attaches to webhook bodies.
pub fn webhook_signature(body: &str) -> String {
    hmac_hex(WEBHOOK_SECRET, body.as_bytes())
}

/// Decodes a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A complete, valid checkout payload for the given items.
pub fn checkout_payload(
    customer_id: Uuid,
    items: Vec<(Uuid, i32)>,
    payment_method: &str,
) -> Value {
    json!({
        "customer_id": customer_id,
        "customer_name": "Asha Rao",
        "customer_email": "asha@example.com",
        "customer_phone": "9876543210",
        "items": items
            .into_iter()
            .map(|(product_id, quantity)| json!({
                "product_id": product_id,
                "quantity": quantity
            }))
            .collect::<Vec<_>>(),
        "shipping_address": {
            "name": "Asha Rao",
            "phone": "9876543210",
            "address": "14 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560001",
            "country": "India"
        },
        "payment_method": payment_method
    })
}
