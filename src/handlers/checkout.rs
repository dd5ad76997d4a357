use crate::{
    errors::ServiceError,
    services::checkout::{
        CheckoutRequest, CheckoutResponse, VerifyPaymentRequest, VerifyPaymentResponse,
    },
    AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use tracing::instrument;

/// Place an order.
#[utoipa::path(
    post,
    path = "/api/v1/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 400, description = "Invalid request or coupon", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
#[instrument(skip(state, req))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ServiceError> {
    let response = state.services.checkout.checkout(req).await?;
    let status = if response.idempotent_replay {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

/// Confirm an online payment from the client callback.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Signature mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown gateway order", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
#[instrument(skip(state, req))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ServiceError> {
    let response = state.services.checkout.verify_payment(req).await?;
    Ok(Json(response))
}
