use crate::{
    entities::coupon,
    errors::ServiceError,
    services::coupons::{CouponListResponse, CreateCouponRequest},
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListCouponsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    pub customer_id: Uuid,
    pub order_total: Decimal,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payable: Option<Decimal>,
    /// Rejection reason when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Create a coupon.
#[utoipa::path(
    post,
    path = "/api/v1/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created"),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "coupons"
)]
#[instrument(skip(state, req))]
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(req): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<coupon::Model>), ServiceError> {
    let coupon = state.services.coupons.create_coupon(req).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// List coupons.
#[utoipa::path(
    get,
    path = "/api/v1/coupons",
    params(ListCouponsQuery),
    responses((status = 200, description = "Coupons page")),
    tag = "coupons"
)]
#[instrument(skip(state))]
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<ListCouponsQuery>,
) -> Result<Json<CouponListResponse>, ServiceError> {
    let response = state
        .services
        .coupons
        .list_coupons(query.page, query.per_page.min(100))
        .await?;
    Ok(Json(response))
}

/// Preview a coupon against a cart total without consuming a use. A coupon
/// that does not apply is a 200 with `valid: false` and the reason, not an
/// error.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Validation outcome", body = ValidateCouponResponse)
    ),
    tag = "coupons"
)]
#[instrument(skip(state, req))]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(req): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>, ServiceError> {
    req.validate()?;

    match state
        .services
        .coupons
        .validate(&req.code, req.customer_id, req.order_total)
        .await
    {
        Ok((coupon, discount)) => Ok(Json(ValidateCouponResponse {
            valid: true,
            code: Some(coupon.code),
            discount: Some(discount),
            payable: Some(req.order_total - discount),
            error: None,
        })),
        Err(ServiceError::ValidationError(reason)) => Ok(Json(ValidateCouponResponse {
            valid: false,
            code: None,
            discount: None,
            payable: None,
            error: Some(reason),
        })),
        Err(e) => Err(e),
    }
}
