use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront Order API

Checkout, payment, coupon, and shipment workflow for the storefront.

## Checkout

`POST /orders/checkout` places an order. Online orders return a gateway order id
for the client to pay against; cash-on-delivery orders are confirmed and
handed to the shipment provider immediately.

## Webhooks

Inbound webhooks are authenticated by signature, not by bearer token:
- `POST /webhooks/payment-gateway` carries `X-Webhook-Signature` (HMAC-SHA256 of
  the raw body, hex encoded)
- `POST /webhooks/shipment-provider` is the courier aggregator's tracking callback

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20,
max 100).
        "#
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "checkout", description = "Order placement and payment verification"),
        (name = "orders", description = "Order lookups"),
        (name = "coupons", description = "Coupon administration and validation"),
        (name = "webhooks", description = "Inbound gateway and courier callbacks")
    ),
    paths(
        // Checkout
        crate::handlers::checkout::checkout,
        crate::handlers::checkout::verify_payment,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_customer_orders,

        // Coupons
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::validate_coupon,

        // Webhooks
        crate::handlers::webhooks::payment_webhook,
        crate::handlers::webhooks::shipment_webhook,
    ),
    components(
        schemas(
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutItemRequest,
            crate::services::checkout::ShippingAddressRequest,
            crate::services::checkout::CheckoutResponse,
            crate::services::checkout::VerifyPaymentRequest,
            crate::services::checkout::VerifyPaymentResponse,
            crate::services::checkout::ShipmentWebhookRequest,
            crate::services::coupons::CreateCouponRequest,
            crate::handlers::coupons::ValidateCouponRequest,
            crate::handlers::coupons::ValidateCouponResponse,
            crate::handlers::orders::OrderDetailResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/orders/checkout"));
        assert!(json.contains("/api/v1/webhooks/payment-gateway"));
    }
}
